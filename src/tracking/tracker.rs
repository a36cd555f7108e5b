//! 红框通过状态机 (CrossingStateTracker)
//!
//! 每个目标ID两个状态: OUTSIDE / INSIDE,初始 OUTSIDE。
//! 只有 OUTSIDE → INSIDE 计一次通过; INSIDE → OUTSIDE 静默,没有超时。

use std::collections::HashMap;

use tracing::debug;

use super::events::CrossingEvent;
use crate::detection::types::{FrameDetection, GeometryThresholds, ObjectBox, ObjectObservation};

/// 单个目标的状态 (首次出现时按默认值插入: 在框外, 0次)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerState {
    pub was_inside: bool,
    pub crossing_count: u32,
}

/// 目标是否在某个红框内
///
/// 两个条件: 目标面积严格小于外接矩形面积; 目标中心落在收缩后的外接矩形内。
pub fn object_inside(bbox: &ObjectBox, detection: &FrameDetection, margin_fraction: f32) -> bool {
    if bbox.area() >= detection.outer_bbox.area() {
        return false;
    }
    detection
        .outer_bbox
        .contains_with_margin(&bbox.center(), margin_fraction)
}

/// 第一个满足"在框内"的红框下标 (按给定顺序,先到先得)
pub fn first_containing(
    bbox: &ObjectBox,
    detections: &[FrameDetection],
    margin_fraction: f32,
) -> Option<usize> {
    detections
        .iter()
        .position(|d| object_inside(bbox, d, margin_fraction))
}

/// 通过计数器
///
/// 只允许一个调用方串行调用 `update`,内部不加锁。
#[derive(Debug, Clone)]
pub struct CrossingStateTracker {
    states: HashMap<u32, TrackerState>,
    total_crossings: u64,
    inside_margin_fraction: f32,
}

impl Default for CrossingStateTracker {
    fn default() -> Self {
        Self::new(GeometryThresholds::default().inside_margin_fraction)
    }
}

impl CrossingStateTracker {
    pub fn new(inside_margin_fraction: f32) -> Self {
        Self {
            states: HashMap::new(),
            total_crossings: 0,
            inside_margin_fraction,
        }
    }

    pub fn from_thresholds(thresholds: &GeometryThresholds) -> Self {
        Self::new(thresholds.inside_margin_fraction)
    }

    pub fn inside_margin_fraction(&self) -> f32 {
        self.inside_margin_fraction
    }

    /// 更新一个目标的位置,返回这一帧是否发生通过
    pub fn update(&mut self, object_id: u32, bbox: &ObjectBox, detections: &[FrameDetection]) -> bool {
        let is_inside_now =
            first_containing(bbox, detections, self.inside_margin_fraction).is_some();

        let state = self.states.entry(object_id).or_default();
        let crossed = is_inside_now && !state.was_inside;
        if crossed {
            state.crossing_count += 1;
            self.total_crossings += 1;
            debug!(
                "🚪 ID={} 进入红框 (第{}次)",
                object_id, state.crossing_count
            );
        }
        state.was_inside = is_inside_now;

        crossed
    }

    /// 用一条外部观测更新,发生通过时生成事件
    pub fn observe(
        &mut self,
        observation: &ObjectObservation,
        detections: &[FrameDetection],
        timestamp: f64,
    ) -> Option<CrossingEvent> {
        if !self.update(observation.id, &observation.bbox, detections) {
            return None;
        }
        Some(CrossingEvent::new(
            observation.id,
            observation.label.clone(),
            self.count(observation.id),
            timestamp,
        ))
    }

    /// 预置某个ID的上一帧状态 (计数不变)
    pub fn seed(&mut self, object_id: u32, was_inside: bool) {
        self.states.entry(object_id).or_default().was_inside = was_inside;
    }

    /// 单个ID的通过次数,未见过的ID为 0
    pub fn count(&self, object_id: u32) -> u32 {
        self.states
            .get(&object_id)
            .map_or(0, |s| s.crossing_count)
    }

    /// 所有ID的累计通过次数
    pub fn total(&self) -> u64 {
        self.total_crossings
    }

    pub fn is_inside(&self, object_id: u32) -> bool {
        self.states.get(&object_id).is_some_and(|s| s.was_inside)
    }

    pub fn state(&self, object_id: u32) -> Option<TrackerState> {
        self.states.get(&object_id).copied()
    }

    pub fn tracked_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.states.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
