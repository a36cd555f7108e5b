//! 红色掩膜生成 (ColorMaskGenerator)
//!
//! RGB帧 → OpenCV兼容的8位HSV → 双色相区间阈值 → 二值掩膜 (255 = 红色像素)。
//! 不做形态学去噪,保留原始噪声,由后续几何过滤决定取舍。

use image::{DynamicImage, GrayImage, Luma, RgbImage};

use super::types::{ColorThresholds, HUE_MAX};
use crate::error::InputError;

/// 掩膜中"命中"的像素值
pub const MASK_ON: u8 = 255;

/// 原始帧缓冲的通道顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// RGB转HSV (OpenCV 8位约定: H 0-180, S/V 0-255)
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = max - min;

    let s = if max > 0.0 { diff * 255.0 / max } else { 0.0 };

    let mut h = if diff == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / diff
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }
    // 先取整再回绕: 359.x° → 180 → 0
    let hue = ((h / 2.0).round() as u16 % HUE_MAX as u16) as u8;

    [hue, s.round() as u8, max as u8]
}

/// 生成红色掩膜
///
/// 阈值在使用前统一做一次归一化 (low ≤ high)。
pub fn red_mask(frame: &RgbImage, thresholds: &ColorThresholds) -> GrayImage {
    let thresholds = thresholds.normalized();
    let mut mask = GrayImage::new(frame.width(), frame.height());

    for (dst, src) in mask.pixels_mut().zip(frame.pixels()) {
        let [r, g, b] = src.0;
        if thresholds.matches(rgb_to_hsv(r, g, b)) {
            *dst = Luma([MASK_ON]);
        }
    }

    mask
}

/// 任意解码图像 → 红色掩膜,非3通道图像返回 [`InputError::ChannelLayout`]
pub fn red_mask_dynamic(
    frame: &DynamicImage,
    thresholds: &ColorThresholds,
) -> Result<GrayImage, InputError> {
    let channels = frame.color().channel_count();
    if channels != 3 {
        return Err(InputError::ChannelLayout { channels });
    }

    match frame {
        DynamicImage::ImageRgb8(rgb) => Ok(red_mask(rgb, thresholds)),
        // Rgb16 / Rgb32F: 先降到8位
        other => Ok(red_mask(&other.to_rgb8(), thresholds)),
    }
}

/// 打包的原始帧缓冲 → RgbImage
///
/// 采集端常给出BGR字节流,这里统一转成RGB。
pub fn frame_from_raw(
    width: u32,
    height: u32,
    channels: u8,
    order: ChannelOrder,
    mut data: Vec<u8>,
) -> Result<RgbImage, InputError> {
    if channels != 3 {
        return Err(InputError::ChannelLayout { channels });
    }

    let expected = width as usize * height as usize * 3;
    if data.len() != expected {
        return Err(InputError::BufferSize {
            width,
            height,
            channels,
            expected,
            actual: data.len(),
        });
    }

    if order == ChannelOrder::Bgr {
        data.chunks_exact_mut(3).for_each(|px| px.swap(0, 2));
    }

    RgbImage::from_raw(width, height, data).ok_or(InputError::BufferSize {
        width,
        height,
        channels,
        expected,
        actual: expected,
    })
}
