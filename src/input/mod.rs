/// 离线输入 (Offline Input)
///
/// 采集与目标检测都在外部完成,这里只读取它们的落盘结果
/// - ImageSequence:  按文件名排序的帧图片目录
/// - ObservationLog: 每帧一行的目标观测 JSONL
pub mod observations;
pub mod sequence;

pub use observations::{FrameObservations, ObservationLog};
pub use sequence::ImageSequence;
