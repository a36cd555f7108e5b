//! 红框形状检测器 (FrameShapeDetector)
//! 职责: 二值掩膜 → 轮廓 + 一层父子关系 → 几何过滤 → FrameDetection 列表
//!
//! 轮廓层级只看一层: 每个外轮廓最多检查它的第一个内孔,不再向下递归。

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use tracing::debug;

use super::contour;
use super::types::{DetectionKind, FrameDetection, GeometryThresholds};

pub struct FrameShapeDetector {
    thresholds: GeometryThresholds,
}

impl FrameShapeDetector {
    pub fn new(thresholds: GeometryThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &GeometryThresholds {
        &self.thresholds
    }

    /// 检测掩膜中的所有红框候选 (顺序无语义)
    ///
    /// 空掩膜或没有任何轮廓时返回空列表,不是错误。
    pub fn detect(&self, mask: &GrayImage) -> Vec<FrameDetection> {
        let contours = find_contours::<i32>(mask);
        if contours.is_empty() {
            return Vec::new();
        }

        // 每个外轮廓的第一个内孔
        let mut first_hole: Vec<Option<usize>> = vec![None; contours.len()];
        for (idx, c) in contours.iter().enumerate() {
            if c.border_type != BorderType::Hole {
                continue;
            }
            if let Some(parent) = c.parent {
                if first_hole[parent].is_none() {
                    first_hole[parent] = Some(idx);
                }
            }
        }

        let detections: Vec<FrameDetection> = contours
            .iter()
            .enumerate()
            .filter(|(_, c)| c.border_type == BorderType::Outer)
            .filter_map(|(idx, outer)| {
                let hole = first_hole[idx].map(|h| &contours[h]);
                self.classify(outer, hole)
            })
            .collect();

        debug!(
            "🟥 轮廓 {} 个 → 红框 {} 个",
            contours.len(),
            detections.len()
        );
        detections
    }

    /// 单个外轮廓的过滤与分类
    fn classify(
        &self,
        outer: &Contour<i32>,
        hole: Option<&Contour<i32>>,
    ) -> Option<FrameDetection> {
        let t = &self.thresholds;

        // 面积过滤 (去噪)
        let outer_area = contour::area(&outer.points);
        if outer_area < t.min_outer_area {
            return None;
        }

        let outer_bbox = contour::bounding_rect(&outer.points);
        if outer_bbox.width == 0 || outer_bbox.height == 0 {
            return None;
        }

        // 形状过滤 (排除极端细长)
        let ar = outer_bbox.aspect_ratio();
        if ar < t.aspect_ratio_min || ar > t.aspect_ratio_max {
            return None;
        }

        // 情况1: 有合格内孔 → 完整的框,中心取内孔重心
        if let Some(hole) = hole {
            let inner_area = contour::area(&hole.points);
            let ratio = inner_area / outer_area;
            let hole_ok = inner_area >= t.min_inner_area
                && ratio >= t.hole_ratio_min
                && ratio <= t.hole_ratio_max;

            if hole_ok {
                if let Some(center) = contour::centroid(&hole.points) {
                    return Some(FrameDetection {
                        outer_bbox,
                        center,
                        kind: DetectionKind::Hole,
                        inner_contour: Some(hole.points.clone()),
                        outer_contour: outer.points.clone(),
                    });
                }
            }
        }

        // 情况2: 无孔或孔不合格 (断开的框等) → 外接矩形中心
        Some(FrameDetection {
            outer_bbox,
            center: outer_bbox.center(),
            kind: DetectionKind::BBox,
            inner_contour: None,
            outer_contour: outer.points.clone(),
        })
    }
}

/// 便捷函数: 用给定阈值检测一次
pub fn detect_red_frames(mask: &GrayImage, thresholds: &GeometryThresholds) -> Vec<FrameDetection> {
    FrameShapeDetector::new(*thresholds).detect(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::types::Rect;
    use image::Luma;
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect as PixelRect;

    const ON: Luma<u8> = Luma([255]);
    const OFF: Luma<u8> = Luma([0]);

    fn annulus(size: u32, center: (i32, i32), outer_r: i32, inner_r: i32) -> GrayImage {
        let mut mask = GrayImage::new(size, size);
        draw_filled_circle_mut(&mut mask, center, outer_r, ON);
        draw_filled_circle_mut(&mut mask, center, inner_r, OFF);
        mask
    }

    /// 外框 [x, x+outer) 的正方形环,内部挖去 [hx, hx+hole) 的正方形
    fn square_ring(size: u32, x: i32, outer: u32, hx: i32, hole: u32) -> GrayImage {
        let mut mask = GrayImage::new(size, size);
        draw_filled_rect_mut(&mut mask, PixelRect::at(x, x).of_size(outer, outer), ON);
        draw_filled_rect_mut(&mut mask, PixelRect::at(hx, hx).of_size(hole, hole), OFF);
        mask
    }

    #[test]
    fn test_empty_mask_yields_nothing() {
        let detector = FrameShapeDetector::new(GeometryThresholds::default());
        assert!(detector.detect(&GrayImage::new(64, 64)).is_empty());
        assert!(detector.detect(&GrayImage::new(0, 0)).is_empty());
    }

    #[test]
    fn test_annulus_is_hole_at_centroid() {
        // 外圆面积 ≈ 5000, 内孔 ≈ 1000
        let mask = annulus(200, (100, 100), 40, 18);
        let detections = FrameShapeDetector::new(GeometryThresholds::default()).detect(&mask);

        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert_eq!(d.kind, DetectionKind::Hole);
        assert!(d.inner_contour.is_some());
        assert!((d.center.x - 100.0).abs() <= 1.0, "cx = {}", d.center.x);
        assert!((d.center.y - 100.0).abs() <= 1.0, "cy = {}", d.center.y);
    }

    #[test]
    fn test_square_ring_hole_ratio() {
        let mask = square_ring(100, 10, 71, 30, 31);
        let detections = FrameShapeDetector::new(GeometryThresholds::default()).detect(&mask);

        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert_eq!(d.kind, DetectionKind::Hole);
        assert_eq!(d.outer_bbox, Rect::new(10, 10, 71, 71));

        let inner = contour::area(d.inner_contour.as_ref().unwrap());
        let outer = contour::area(&d.outer_contour);
        let ratio = inner / outer;
        assert!(ratio > 0.15 && ratio < 0.25, "ratio = {}", ratio);
        assert!((d.center.x - 45.0).abs() <= 1.0);
        assert!((d.center.y - 45.0).abs() <= 1.0);
    }

    #[test]
    fn test_small_ratio_hole_falls_back_to_bbox() {
        // 内外面积比 ≈ 0.05 < hole_ratio_min
        let thresholds = GeometryThresholds {
            min_inner_area: 0.0,
            ..GeometryThresholds::default()
        };
        let mask = annulus(240, (120, 120), 100, 22);
        let detections = FrameShapeDetector::new(thresholds).detect(&mask);

        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert_eq!(d.kind, DetectionKind::BBox);
        assert!(d.inner_contour.is_none());
        assert_eq!(d.center, d.outer_bbox.center());
    }

    #[test]
    fn test_undersized_hole_falls_back_to_bbox() {
        // 比例合格但内孔面积小于 min_inner_area
        let thresholds = GeometryThresholds {
            min_outer_area: 100.0,
            min_inner_area: 300.0,
            ..GeometryThresholds::default()
        };
        let mask = square_ring(60, 10, 31, 18, 15);
        let detections = FrameShapeDetector::new(thresholds).detect(&mask);

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].kind, DetectionKind::BBox);
    }

    #[test]
    fn test_broken_frame_is_bbox() {
        let mut mask = square_ring(100, 10, 71, 30, 31);
        // 上边开口,内孔与外部连通
        draw_filled_rect_mut(&mut mask, PixelRect::at(40, 10).of_size(11, 20), OFF);

        let detections = FrameShapeDetector::new(GeometryThresholds::default()).detect(&mask);
        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert_eq!(d.kind, DetectionKind::BBox);
        assert_eq!(d.outer_bbox, Rect::new(10, 10, 71, 71));
        assert_eq!(d.center.x, 45.5);
        assert_eq!(d.center.y, 45.5);
    }

    #[test]
    fn test_noise_and_slivers_are_rejected() {
        let mut mask = GrayImage::new(300, 100);
        // 小噪点
        draw_filled_rect_mut(&mut mask, PixelRect::at(5, 5).of_size(6, 6), ON);
        // 细长条: 宽高比 20
        draw_filled_rect_mut(&mut mask, PixelRect::at(50, 40).of_size(200, 10), ON);

        let detections = FrameShapeDetector::new(GeometryThresholds::default()).detect(&mask);
        assert!(detections.is_empty());
    }

    #[test]
    fn test_multiple_frames_detected_independently() {
        let mut mask = GrayImage::new(300, 120);
        draw_filled_rect_mut(&mut mask, PixelRect::at(10, 10).of_size(71, 71), ON);
        draw_filled_rect_mut(&mut mask, PixelRect::at(30, 30).of_size(31, 31), OFF);
        draw_filled_rect_mut(&mut mask, PixelRect::at(150, 20).of_size(80, 60), ON);

        let detections = detect_red_frames(&mask, &GeometryThresholds::default());
        assert_eq!(detections.len(), 2);
        assert_eq!(
            detections.iter().filter(|d| d.kind == DetectionKind::Hole).count(),
            1
        );
        assert_eq!(
            detections.iter().filter(|d| d.kind == DetectionKind::BBox).count(),
            1
        );
    }
}
