/// 通过计数系统 (Crossing Tracking)
///
/// - tracker: 每个目标ID的 OUTSIDE/INSIDE 状态机与计数
/// - events:  通过事件及有界非阻塞投递
pub mod events;
pub mod tracker;

pub use events::{event_channel, CrossingEvent, EventDispatcher, EventSink, DEFAULT_EVENT_CAPACITY};
pub use tracker::{first_containing, object_inside, CrossingStateTracker, TrackerState};
