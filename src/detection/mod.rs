/// 红框检测系统 (Red Frame Detection)
///
/// 纯函数,无共享可变状态,可在任意线程调用
/// - mask:     RGB → HSV → 红色二值掩膜
/// - contour:  轮廓矩 / 面积 / 外接矩形
/// - detector: 轮廓层级分析 → 红框候选
pub mod contour;
pub mod detector;
pub mod mask;
pub mod types;

pub use detector::{detect_red_frames, FrameShapeDetector};
pub use mask::{frame_from_raw, red_mask, red_mask_dynamic, rgb_to_hsv, ChannelOrder};
pub use types::{
    ColorThresholds, DetectionKind, FrameDetection, GeometryThresholds, ObjectBox,
    ObjectObservation, Point2, Rect,
};
