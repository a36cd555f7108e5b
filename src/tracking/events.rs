//! 通过事件与异步投递
//!
//! 帧循环通过有界通道非阻塞地投递事件,独立线程负责取出并交给外部广播方。
//! 通道满时丢弃最新事件,内存中的计数不受影响。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// 默认事件通道容量
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// 通过事件,序列化为 `{"type":"crossing", ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "crossing")]
pub struct CrossingEvent {
    pub object_id: u32,
    pub object_name: String,
    pub crossing_count: u32,
    pub timestamp: f64,
}

impl CrossingEvent {
    pub fn new(object_id: u32, object_name: String, crossing_count: u32, timestamp: f64) -> Self {
        Self {
            object_id,
            object_name,
            crossing_count,
            timestamp,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// 事件发送端 (帧循环持有)
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<CrossingEvent>,
    dropped: Arc<AtomicU64>,
}

/// 创建有界事件通道
pub fn event_channel(capacity: usize) -> (EventSink, Receiver<CrossingEvent>) {
    let (tx, rx) = bounded(capacity);
    let sink = EventSink {
        tx,
        dropped: Arc::new(AtomicU64::new(0)),
    };
    (sink, rx)
}

impl EventSink {
    /// 非阻塞投递,返回事件是否进入通道
    pub fn emit(&self, event: CrossingEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "⚠️  事件通道已满,丢弃 ID={} 第{}次通过",
                    event.object_id, event.crossing_count
                );
                false
            }
            Err(TrySendError::Disconnected(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("事件接收端已关闭,丢弃 ID={}", event.object_id);
                false
            }
        }
    }

    /// 累计丢弃的事件数
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// 事件消费线程
pub struct EventDispatcher {
    handle: JoinHandle<usize>,
}

impl EventDispatcher {
    /// 启动消费线程,按到达顺序把事件交给 `deliver`
    ///
    /// 所有 [`EventSink`] 被释放后线程退出。
    pub fn spawn<F>(rx: Receiver<CrossingEvent>, mut deliver: F) -> std::io::Result<Self>
    where
        F: FnMut(CrossingEvent) + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("crossing-events".to_string())
            .spawn(move || {
                let mut delivered = 0;
                while let Ok(event) = rx.recv() {
                    deliver(event);
                    delivered += 1;
                }
                debug!("📭 事件线程退出,共投递 {} 条", delivered);
                delivered
            })?;
        Ok(Self { handle })
    }

    /// 等待消费线程结束,返回投递的事件数
    pub fn join(self) -> thread::Result<usize> {
        self.handle.join()
    }
}
