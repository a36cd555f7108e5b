//! 轮廓几何工具
//!
//! 与 cv2.moments / cv2.contourArea / cv2.boundingRect 对轮廓多边形的定义保持一致:
//! 轮廓点视为闭合多边形的顶点,矩由格林公式计算。

use imageproc::geometry::contour_area;
use imageproc::point::Point;

use super::types::{Point2, Rect};

/// 多边形的零阶和一阶矩
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    /// 重心,m00 为 0 (退化轮廓) 时返回 None
    pub fn centroid(&self) -> Option<Point2> {
        if self.m00.abs() < f64::EPSILON {
            return None;
        }
        Some(Point2::new(
            (self.m10 / self.m00) as f32,
            (self.m01 / self.m00) as f32,
        ))
    }
}

/// 计算闭合多边形的矩 (结果符号已归一为正面积方向)
///
/// imageproc 只提供面积,重心所需的一阶矩在这里由格林公式求出。
pub fn moments(points: &[Point<i32>]) -> Moments {
    if points.len() < 3 {
        return Moments::default();
    }

    let mut m00 = 0.0f64;
    let mut m10 = 0.0f64;
    let mut m01 = 0.0f64;

    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        let (xi, yi) = (p.x as f64, p.y as f64);
        let (xj, yj) = (q.x as f64, q.y as f64);

        let cross = xi * yj - xj * yi;
        m00 += cross;
        m10 += cross * (xi + xj);
        m01 += cross * (yi + yj);
    }

    // 顺/逆时针只影响符号
    let sign = if m00 < 0.0 { -1.0 } else { 1.0 };
    Moments {
        m00: sign * m00 / 2.0,
        m10: sign * m10 / 6.0,
        m01: sign * m01 / 6.0,
    }
}

/// 轮廓面积 (与方向无关)
pub fn area(points: &[Point<i32>]) -> f64 {
    contour_area(points).abs()
}

/// 填充轮廓的面积加权重心
pub fn centroid(points: &[Point<i32>]) -> Option<Point2> {
    moments(points).centroid()
}

/// 轴对齐外接矩形,宽高按像素个数计 (max - min + 1)
pub fn bounding_rect(points: &[Point<i32>]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::default();
    };

    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
}
