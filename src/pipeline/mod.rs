/// 单帧处理流水线 (Frame Pipeline)
///
/// 帧 → 红色掩膜 → 红框检测 → 逐目标状态更新 → 事件投递
/// 同一实例只应被一个帧循环串行调用。
use image::{DynamicImage, GrayImage, RgbImage};
use tracing::{debug, info};

use crate::config::CrossingConfig;
use crate::detection::types::{ColorThresholds, FrameDetection, ObjectObservation};
use crate::detection::{mask, FrameShapeDetector};
use crate::error::InputError;
use crate::tracking::{first_containing, CrossingEvent, CrossingStateTracker, EventSink};

/// 一次通过 (事件 + 是否经过开口附近)
#[derive(Clone, Debug, PartialEq)]
pub struct Crossing {
    pub event: CrossingEvent,
    pub near_opening: bool, // 目标中心距红框中心小于 crossing_tolerance
    pub queued: bool,       // 是否进入事件通道
}

/// 单帧结果 (供调用方叠加显示)
#[derive(Clone, Debug, Default)]
pub struct FrameReport {
    pub frame_index: u64,
    pub detections: Vec<FrameDetection>,
    pub crossings: Vec<Crossing>,
}

pub struct FramePipeline {
    color: ColorThresholds,
    detector: FrameShapeDetector,
    tracker: CrossingStateTracker,
    crossing_tolerance: f32,
    sink: Option<EventSink>,
    frame_count: u64,
}

impl FramePipeline {
    pub fn new(config: &CrossingConfig) -> Self {
        Self {
            color: config.color.normalized(),
            detector: FrameShapeDetector::new(config.geometry),
            tracker: CrossingStateTracker::from_thresholds(&config.geometry),
            crossing_tolerance: config.geometry.crossing_tolerance,
            sink: None,
            frame_count: 0,
        }
    }

    /// 通过事件投递到给定通道
    pub fn with_sink(mut self, sink: EventSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 帧间整体替换颜色阈值
    pub fn set_color_thresholds(&mut self, thresholds: ColorThresholds) {
        self.color = thresholds.normalized();
        debug!("🎨 颜色阈值已更新: {:?}", self.color);
    }

    pub fn color_thresholds(&self) -> &ColorThresholds {
        &self.color
    }

    pub fn detector(&self) -> &FrameShapeDetector {
        &self.detector
    }

    pub fn tracker(&self) -> &CrossingStateTracker {
        &self.tracker
    }

    pub fn sink(&self) -> Option<&EventSink> {
        self.sink.as_ref()
    }

    /// 释放事件发送端,让消费线程在取完剩余事件后退出
    pub fn close_sink(&mut self) -> Option<EventSink> {
        self.sink.take()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// 只生成掩膜 (调参/调试用)
    pub fn mask(&self, frame: &DynamicImage) -> Result<GrayImage, InputError> {
        mask::red_mask_dynamic(frame, &self.color)
    }

    /// 处理任意解码帧,非3通道帧在触碰状态前即返回错误
    pub fn process(
        &mut self,
        frame: &DynamicImage,
        observations: &[ObjectObservation],
        timestamp: f64,
    ) -> Result<FrameReport, InputError> {
        let red = self.mask(frame)?;
        Ok(self.process_mask(&red, observations, timestamp))
    }

    pub fn process_rgb(
        &mut self,
        frame: &RgbImage,
        observations: &[ObjectObservation],
        timestamp: f64,
    ) -> FrameReport {
        let red = mask::red_mask(frame, &self.color);
        self.process_mask(&red, observations, timestamp)
    }

    /// 已有掩膜时直接检测与更新
    pub fn process_mask(
        &mut self,
        red: &GrayImage,
        observations: &[ObjectObservation],
        timestamp: f64,
    ) -> FrameReport {
        let frame_index = self.frame_count;
        self.frame_count += 1;

        let detections = self.detector.detect(red);
        let margin = self.tracker.inside_margin_fraction();
        let mut crossings = Vec::new();

        for obs in observations {
            let Some(event) = self.tracker.observe(obs, &detections, timestamp) else {
                continue;
            };

            let center = obs.bbox.center();
            let near_opening = first_containing(&obs.bbox, &detections, margin)
                .is_some_and(|i| detections[i].is_near_center(&center, self.crossing_tolerance));

            info!(
                "🎯 物体 ID={} ({}) 通过红框! (累计: {}次{})",
                event.object_id,
                event.object_name,
                event.crossing_count,
                if near_opening { ", 经过开口" } else { "" }
            );

            let queued = match &self.sink {
                Some(sink) => sink.emit(event.clone()),
                None => false,
            };
            crossings.push(Crossing {
                event,
                near_opening,
                queued,
            });
        }

        debug!(
            "🖼️  帧 {}: 红框 {} 个, 目标 {} 个, 通过 {} 次",
            frame_index,
            detections.len(),
            observations.len(),
            crossings.len()
        );

        FrameReport {
            frame_index,
            detections,
            crossings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::types::{DetectionKind, ObjectBox};
    use crate::tracking::event_channel;
    use image::{Rgb, RgbaImage};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect as PixelRect;

    const RED: Rgb<u8> = Rgb([230, 20, 20]);
    const GRAY: Rgb<u8> = Rgb([90, 90, 90]);

    /// 灰背景上一个 120x120 的红色方框,开口 60x60,位于 (40..160)
    fn scene() -> RgbImage {
        let mut img = RgbImage::from_pixel(200, 200, GRAY);
        draw_filled_rect_mut(&mut img, PixelRect::at(40, 40).of_size(120, 120), RED);
        draw_filled_rect_mut(&mut img, PixelRect::at(70, 70).of_size(60, 60), GRAY);
        img
    }

    fn ball(id: u32, cx: f32, cy: f32) -> ObjectObservation {
        ObjectObservation {
            id,
            bbox: ObjectBox::from_xyxy(cx - 8.0, cy - 8.0, cx + 8.0, cy + 8.0).unwrap(),
            label: "sports ball".to_string(),
        }
    }

    #[test]
    fn test_scene_detects_hole_frame() {
        let mut pipeline = FramePipeline::new(&CrossingConfig::default());
        let report = pipeline.process_rgb(&scene(), &[], 0.0);

        assert_eq!(report.detections.len(), 1);
        let d = &report.detections[0];
        assert_eq!(d.kind, DetectionKind::Hole);
        assert!((d.center.x - 99.5).abs() <= 1.0);
        assert!((d.center.y - 99.5).abs() <= 1.0);
    }

    #[test]
    fn test_pass_through_sequence_emits_events() {
        let (sink, rx) = event_channel(8);
        let mut pipeline = FramePipeline::new(&CrossingConfig::default()).with_sink(sink);
        let frame = scene();

        let path = [(10.0, 100.0), (100.0, 100.0), (105.0, 100.0), (190.0, 100.0), (100.0, 95.0)];
        let mut crossed_frames = Vec::new();
        for (i, (x, y)) in path.iter().enumerate() {
            let report = pipeline.process_rgb(&frame, &[ball(7, *x, *y)], i as f64);
            if !report.crossings.is_empty() {
                crossed_frames.push(report.frame_index);
                assert!(report.crossings[0].near_opening);
                assert!(report.crossings[0].queued);
            }
        }

        assert_eq!(crossed_frames, vec![1, 4]);
        assert_eq!(pipeline.tracker().count(7), 2);
        assert_eq!(pipeline.frame_count(), 5);

        let events: Vec<CrossingEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].crossing_count, 1);
        assert_eq!(events[0].timestamp, 1.0);
        assert_eq!(events[1].crossing_count, 2);
        assert_eq!(events[1].timestamp, 4.0);
    }

    #[test]
    fn test_events_follow_observation_order() {
        let (sink, rx) = event_channel(8);
        let mut pipeline = FramePipeline::new(&CrossingConfig::default()).with_sink(sink);

        let obs = [ball(3, 100.0, 100.0), ball(1, 90.0, 110.0), ball(2, 5.0, 5.0)];
        let report = pipeline.process_rgb(&scene(), &obs, 0.0);

        let ids: Vec<u32> = report.crossings.iter().map(|c| c.event.object_id).collect();
        assert_eq!(ids, vec![3, 1]);
        let queued: Vec<u32> = rx.try_iter().map(|e| e.object_id).collect();
        assert_eq!(queued, vec![3, 1]);
        assert_eq!(pipeline.tracker().total(), 2);
    }

    #[test]
    fn test_full_channel_keeps_counts() {
        let (sink, rx) = event_channel(1);
        let mut pipeline = FramePipeline::new(&CrossingConfig::default()).with_sink(sink);

        let obs = [ball(1, 100.0, 100.0), ball(2, 100.0, 100.0)];
        let report = pipeline.process_rgb(&scene(), &obs, 0.0);

        assert_eq!(report.crossings.len(), 2);
        assert!(report.crossings[0].queued);
        assert!(!report.crossings[1].queued);
        assert_eq!(pipeline.sink().map(|s| s.dropped()), Some(1));
        assert_eq!(pipeline.tracker().count(2), 1);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_rgba_frame_is_rejected_without_touching_state() {
        let mut pipeline = FramePipeline::new(&CrossingConfig::default());
        let frame = DynamicImage::ImageRgba8(RgbaImage::new(10, 10));

        let err = pipeline.process(&frame, &[ball(1, 5.0, 5.0)], 0.0).unwrap_err();
        assert_eq!(err, InputError::ChannelLayout { channels: 4 });
        assert!(pipeline.tracker().is_empty());
        assert_eq!(pipeline.frame_count(), 0);
    }

    #[test]
    fn test_color_thresholds_replaced_between_frames() {
        let mut pipeline = FramePipeline::new(&CrossingConfig::default());
        let frame = DynamicImage::ImageRgb8(scene());
        assert_eq!(pipeline.process(&frame, &[], 0.0).unwrap().detections.len(), 1);

        // 把色相窗口移到绿色附近,红框消失
        pipeline.set_color_thresholds(ColorThresholds {
            h1_low: 50,
            h1_high: 70,
            h2_low: 50,
            h2_high: 70,
            ..ColorThresholds::default()
        });
        assert!(pipeline.process(&frame, &[], 1.0).unwrap().detections.is_empty());
    }
}
