//! 错误类型
//! Error types shared by the detection and configuration layers

use thiserror::Error;

/// 输入错误 (帧格式或检测框不合法)
///
/// Raised before any tracker state is touched, so a rejected frame or box never
/// leaves a half-updated tracker behind.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("expected a 3-channel color frame, got {channels} channel(s)")]
    ChannelLayout { channels: u8 },

    #[error("frame buffer holds {actual} bytes, {width}x{height}x{channels} needs {expected}")]
    BufferSize {
        width: u32,
        height: u32,
        channels: u8,
        expected: usize,
        actual: usize,
    },

    #[error("bounding box has non-finite coordinates ({x1}, {y1}, {x2}, {y2})")]
    NonFiniteBox { x1: f32, y1: f32, x2: f32, y2: f32 },

    #[error("bounding box is inverted or empty ({x1}, {y1}, {x2}, {y2})")]
    InvertedBox { x1: f32, y1: f32, x2: f32, y2: f32 },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown config option `{0}`")]
    UnknownOption(String),

    #[error("invalid value `{value}` for option `{key}`")]
    InvalidValue { key: String, value: String },

    #[error("override must look like key=value, got `{0}`")]
    MalformedOverride(String),
}
