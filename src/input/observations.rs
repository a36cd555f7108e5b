//! 外部目标观测读取
//!
//! 每行一帧: `{"frame": 3, "objects": [{"id": 7, "bbox": [x1, y1, x2, y2], "label": "person"}]}`
//! 没有出现的帧视为没有目标。

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::detection::types::ObjectObservation;

/// 单帧的观测列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameObservations {
    pub frame: u64,
    #[serde(default)]
    pub objects: Vec<ObjectObservation>,
}

/// 按帧号索引的观测
#[derive(Debug, Default)]
pub struct ObservationLog {
    frames: HashMap<u64, Vec<ObjectObservation>>,
}

impl ObservationLog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("无法读取观测文件 {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("观测文件格式错误: {}", path.display()))
    }

    /// 解析JSONL,检测框不合法的行直接报错 (带行号)
    pub fn parse(text: &str) -> Result<Self> {
        let mut frames: HashMap<u64, Vec<ObjectObservation>> = HashMap::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let entry: FrameObservations = serde_json::from_str(line)
                .with_context(|| format!("第 {} 行无法解析", lineno + 1))?;
            frames.entry(entry.frame).or_default().extend(entry.objects);
        }
        Ok(Self { frames })
    }

    /// 某帧的观测,没有记录时为空
    pub fn frame(&self, index: u64) -> &[ObjectObservation] {
        self.frames.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines() {
        let text = r#"
# 帧0没有目标
{"frame": 1, "objects": [{"id": 7, "bbox": [10, 10, 20, 20], "label": "person"}]}
{"frame": 2, "objects": [{"id": 7, "bbox": [12, 10, 22, 20], "label": "person"},
                         {"id": 8, "bbox": [50, 50, 60, 70], "label": "dog"}]}
"#;
        // 第二条记录跨行,不是合法JSONL
        assert!(ObservationLog::parse(text).is_err());

        let text = concat!(
            "{\"frame\": 1, \"objects\": [{\"id\": 7, \"bbox\": [10, 10, 20, 20], \"label\": \"person\"}]}\n",
            "{\"frame\": 2, \"objects\": [{\"id\": 8, \"bbox\": [50, 50, 60, 70], \"label\": \"dog\"}]}\n",
            "{\"frame\": 2, \"objects\": [{\"id\": 9, \"bbox\": [0, 0, 5, 5], \"label\": \"cat\"}]}\n",
        );
        let log = ObservationLog::parse(text).unwrap();
        assert!(log.frame(0).is_empty());
        assert_eq!(log.frame(1)[0].id, 7);
        let ids: Vec<u32> = log.frame(2).iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![8, 9]);
        assert_eq!(log.frame_count(), 2);
    }

    #[test]
    fn test_inverted_box_reports_line() {
        let text = "{\"frame\": 0}\n{\"frame\": 1, \"objects\": [{\"id\": 1, \"bbox\": [20, 0, 10, 5], \"label\": \"x\"}]}\n";
        let err = ObservationLog::parse(text).unwrap_err();
        assert!(format!("{:#}", err).contains("第 2 行"));
    }
}
