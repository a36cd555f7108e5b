// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 参数配置
pub mod detection; // 红框检测系统
pub mod error; // 错误类型
pub mod input; // 离线输入
pub mod pipeline; // 单帧处理流水线
pub mod tracking; // 通过计数系统

pub use crate::config::CrossingConfig;
pub use crate::detection::{
    ColorThresholds, DetectionKind, FrameDetection, FrameShapeDetector, GeometryThresholds,
    ObjectBox, ObjectObservation,
};
pub use crate::error::{ConfigError, InputError};
pub use crate::pipeline::{Crossing, FramePipeline, FrameReport};
pub use crate::tracking::{CrossingEvent, CrossingStateTracker, EventDispatcher, EventSink};
