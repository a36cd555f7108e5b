//! 帧图片目录读取

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::DynamicImage;
use tracing::debug;

/// 支持的图片扩展名
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tif"];

/// 按文件名排序的帧序列
pub struct ImageSequence {
    paths: Vec<PathBuf>,
}

impl ImageSequence {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("无法读取帧目录 {}", dir.display()))? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if path.is_file() && is_image {
                paths.push(path);
            }
        }
        paths.sort();
        debug!("📂 {} 中找到 {} 帧", dir.display(), paths.len());
        Ok(Self { paths })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// 逐帧解码,带alpha通道的图片去掉alpha (截屏常见RGBA)
    pub fn frames(&self) -> impl Iterator<Item = (usize, &Path, Result<DynamicImage>)> + '_ {
        self.paths.iter().enumerate().map(|(i, path)| {
            let frame = load_frame(path);
            (i, path.as_path(), frame)
        })
    }
}

/// 解码一帧,RGBA → RGB
pub fn load_frame(path: &Path) -> Result<DynamicImage> {
    let img = image::open(path).with_context(|| format!("无法解码 {}", path.display()))?;
    Ok(if img.color().has_alpha() && img.color().has_color() {
        DynamicImage::ImageRgb8(img.to_rgb8())
    } else {
        img
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("redframe-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_sequence_sorted_and_filtered() {
        let dir = temp_dir("seq");
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))
            .save(dir.join("frame_002.png"))
            .unwrap();
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))
            .save(dir.join("frame_001.png"))
            .unwrap();
        fs::write(dir.join("notes.txt"), "x").unwrap();

        let seq = ImageSequence::open(&dir).unwrap();
        assert_eq!(seq.len(), 2);
        assert!(seq.paths()[0].ends_with("frame_001.png"));
        assert!(seq.paths()[1].ends_with("frame_002.png"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_rgba_frame_loses_alpha() {
        let dir = temp_dir("rgba");
        let path = dir.join("shot.png");
        RgbaImage::from_pixel(2, 2, Rgba([200, 10, 10, 128]))
            .save(&path)
            .unwrap();

        let frame = load_frame(&path).unwrap();
        assert_eq!(frame.color().channel_count(), 3);
        assert_eq!(frame.to_rgb8().get_pixel(0, 0).0, [200, 10, 10]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_dir_is_error() {
        assert!(ImageSequence::open("/definitely/not/here").is_err());
    }
}
