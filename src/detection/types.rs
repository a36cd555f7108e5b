/// 红框检测系统数据结构定义
/// Data structures for red frame detection
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use crate::error::InputError;

// ========== 公共常量 ==========

/// OpenCV 8位HSV中色相的最大值 (H: 0-180)
pub const HUE_MAX: u8 = 180;

// ========== 基础几何 ==========

/// 二维点 (浮点)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// 欧氏距离
    pub fn distance(&self, other: &Point2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 轴对齐矩形 (x, y, width, height),整数像素坐标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f32 {
        self.width as f32 * self.height as f32
    }

    /// 宽高比 (width / height)
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn center(&self) -> Point2 {
        Point2::new(
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    /// 点是否落在向内收缩后的矩形内 (边界包含)
    ///
    /// `margin_fraction` 是宽、高各自每一侧收缩的比例,0.1 即保留中间 80%。
    pub fn contains_with_margin(&self, point: &Point2, margin_fraction: f32) -> bool {
        let margin_x = self.width as f32 * margin_fraction;
        let margin_y = self.height as f32 * margin_fraction;
        let left = self.x as f32 + margin_x;
        let right = (self.x + self.width) as f32 - margin_x;
        let top = self.y as f32 + margin_y;
        let bottom = (self.y + self.height) as f32 - margin_y;

        (left..=right).contains(&point.x) && (top..=bottom).contains(&point.y)
    }
}

// ========== 外部目标 ==========

/// 外部检测器给出的目标框 (x1, y1, x2, y2)
///
/// 只能通过 [`ObjectBox::from_xyxy`] 构造,保证坐标有限且 x1 < x2, y1 < y2。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f32; 4]", into = "[f32; 4]")]
pub struct ObjectBox {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl ObjectBox {
    pub fn from_xyxy(x1: f32, y1: f32, x2: f32, y2: f32) -> Result<Self, InputError> {
        if !(x1.is_finite() && y1.is_finite() && x2.is_finite() && y2.is_finite()) {
            return Err(InputError::NonFiniteBox { x1, y1, x2, y2 });
        }
        if x1 >= x2 || y1 >= y2 {
            return Err(InputError::InvertedBox { x1, y1, x2, y2 });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn x1(&self) -> f32 {
        self.x1
    }

    pub fn y1(&self) -> f32 {
        self.y1
    }

    pub fn x2(&self) -> f32 {
        self.x2
    }

    pub fn y2(&self) -> f32 {
        self.y2
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point2 {
        Point2::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

impl TryFrom<[f32; 4]> for ObjectBox {
    type Error = InputError;

    fn try_from(xyxy: [f32; 4]) -> Result<Self, Self::Error> {
        Self::from_xyxy(xyxy[0], xyxy[1], xyxy[2], xyxy[3])
    }
}

impl From<ObjectBox> for [f32; 4] {
    fn from(b: ObjectBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// 单帧的外部目标观测 (ID由外部跟踪器分配,跨帧稳定)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectObservation {
    pub id: u32,
    pub bbox: ObjectBox,
    pub label: String,
}

// ========== 红框检测结果 ==========

/// 检测类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionKind {
    /// 找到合格的内孔,中心为内孔重心
    Hole,
    /// 没有合格内孔 (断开/遮挡的框),中心为外接矩形中心
    BBox,
}

/// 单个红框候选
#[derive(Debug, Clone, PartialEq)]
pub struct FrameDetection {
    pub outer_bbox: Rect,
    pub center: Point2,
    pub kind: DetectionKind,
    pub inner_contour: Option<Vec<Point<i32>>>,
    pub outer_contour: Vec<Point<i32>>,
}

impl FrameDetection {
    /// 点是否在中心点 `tolerance` 像素以内 (严格小于)
    pub fn is_near_center(&self, point: &Point2, tolerance: f32) -> bool {
        self.center.distance(point) < tolerance
    }
}

// ========== 阈值 ==========

/// 红色HSV阈值 (OpenCV准拠: H[0-180], S[0-255], V[0-255])
///
/// 红色跨越色相环的0点,所以用两段色相区间取并集,共用同一组S/V区间。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorThresholds {
    pub h1_low: u8,
    pub h1_high: u8,
    pub h2_low: u8,
    pub h2_high: u8,
    pub s_low: u8,
    pub s_high: u8,
    pub v_low: u8,
    pub v_high: u8,
}

impl Default for ColorThresholds {
    fn default() -> Self {
        Self {
            h1_low: 0,
            h1_high: 9,
            h2_low: 150,
            h2_high: 180,
            s_low: 160,
            s_high: 255,
            v_low: 193,
            v_high: 255,
        }
    }
}

impl ColorThresholds {
    /// 色相截断到 0..=180,每组 low > high 时交换
    pub fn normalized(&self) -> Self {
        fn ordered(a: u8, b: u8) -> (u8, u8) {
            (a.min(b), a.max(b))
        }
        let (h1_low, h1_high) = ordered(self.h1_low.min(HUE_MAX), self.h1_high.min(HUE_MAX));
        let (h2_low, h2_high) = ordered(self.h2_low.min(HUE_MAX), self.h2_high.min(HUE_MAX));
        let (s_low, s_high) = ordered(self.s_low, self.s_high);
        let (v_low, v_high) = ordered(self.v_low, self.v_high);
        Self {
            h1_low,
            h1_high,
            h2_low,
            h2_high,
            s_low,
            s_high,
            v_low,
            v_high,
        }
    }

    /// HSV像素是否命中任一色相区间 (与S/V区间取交)
    #[inline]
    pub fn matches(&self, hsv: [u8; 3]) -> bool {
        let [h, s, v] = hsv;
        if s < self.s_low || s > self.s_high || v < self.v_low || v > self.v_high {
            return false;
        }
        (self.h1_low..=self.h1_high).contains(&h) || (self.h2_low..=self.h2_high).contains(&h)
    }
}

/// 几何过滤阈值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryThresholds {
    pub min_outer_area: f64, // 外框最小面积
    pub min_inner_area: f64, // 内孔最小面积
    pub hole_ratio_min: f64, // inner/outer 下限
    pub hole_ratio_max: f64, // inner/outer 上限
    pub aspect_ratio_min: f64, // 宽高比下限 (排除细长条)
    pub aspect_ratio_max: f64, // 宽高比上限
    pub inside_margin_fraction: f32, // 判定"在框内"时每侧收缩比例
    pub crossing_tolerance: f32, // 距中心多少像素以内视为穿过开口
}

impl Default for GeometryThresholds {
    fn default() -> Self {
        Self {
            min_outer_area: 1000.0,
            min_inner_area: 300.0,
            hole_ratio_min: 0.10,
            hole_ratio_max: 0.90,
            aspect_ratio_min: 0.2,
            aspect_ratio_max: 5.0,
            inside_margin_fraction: 0.1,
            crossing_tolerance: 30.0,
        }
    }
}
