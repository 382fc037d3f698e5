//! Per-task progress pub/sub with catch-up replay.
//!
//! Each task gets its own subscriber set guarded by its own lock; a stalled subscriber on one task
//! never blocks publication to another. Subscribers are plain unbounded
//! mpsc channels rather than a broadcast channel, because a `broadcast`
//! subscriber only sees messages sent after it joins — we need to replay
//! `latest(T)` to a brand-new subscriber without replaying it to everyone
//! else.

use dashmap::DashMap;
use holomesh_types::event::{ProgressEvent, Severity};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

pub struct Subscription {
    pub id: u64,
    pub receiver: mpsc::UnboundedReceiver<ProgressEvent>,
}

struct TaskChannel {
    subscribers: Mutex<Vec<(u64, mpsc::UnboundedSender<ProgressEvent>)>>,
    latest: Mutex<Option<ProgressEvent>>,
    seq_counter: AtomicU64,
    next_subscriber_id: AtomicU64,
}

impl TaskChannel {
    fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            latest: Mutex::new(None),
            seq_counter: AtomicU64::new(0),
            next_subscriber_id: AtomicU64::new(0),
        }
    }
}

/// Pub/sub hub keyed by `task_id`, plus a reserved `__system__` channel for
/// process-wide announcements.
#[derive(Clone, Default)]
pub struct ProgressBus {
    channels: Arc<DashMap<String, Arc<TaskChannel>>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self { channels: Arc::new(DashMap::new()) }
    }

    fn channel_for(&self, task_id: &str) -> Arc<TaskChannel> {
        self.channels.entry(task_id.to_string()).or_insert_with(|| Arc::new(TaskChannel::new())).clone()
    }

    /// Registers a new subscriber and immediately replays `latest(task_id)`
    /// as a catch-up, or a synthetic `connected` event if nothing has been
    /// published yet.
    pub fn subscribe(&self, task_id: &str) -> Subscription {
        let channel = self.channel_for(task_id);
        let (tx, rx) = mpsc::unbounded_channel();
        let id = channel.next_subscriber_id.fetch_add(1, Ordering::Relaxed);

        let catch_up = channel
            .latest
            .lock()
            .clone()
            .unwrap_or_else(|| ProgressEvent::connected(task_id, 0));
        let _ = tx.send(catch_up);

        channel.subscribers.lock().push((id, tx));
        Subscription { id, receiver: rx }
    }

    pub fn unsubscribe(&self, task_id: &str, subscriber_id: u64) {
        if let Some(channel) = self.channels.get(task_id) {
            channel.subscribers.lock().retain(|(id, _)| *id != subscriber_id);
        }
    }

    /// Stamps `event` with the next sequence number for its task, updates
    /// `latest`, and forwards it to every current subscriber. Subscribers
    /// whose channel is closed are dropped from the set.
    pub fn publish(&self, mut event: ProgressEvent) {
        let channel = self.channel_for(&event.task_id);
        let mut subscribers = channel.subscribers.lock();
        event.seq = channel.seq_counter.fetch_add(1, Ordering::Relaxed);
        *channel.latest.lock() = Some(event.clone());
        subscribers.retain(|(_, tx)| tx.send(event.clone()).is_ok());
        debug!(task_id = %event.task_id, seq = event.seq, stage = %event.stage, "published progress event");
    }

    pub fn latest(&self, task_id: &str) -> Option<ProgressEvent> {
        self.channels.get(task_id).and_then(|c| c.latest.lock().clone())
    }

    /// Publishes a process-wide event on the reserved system channel.
    pub fn broadcast_system(&self, message: impl Into<String>, severity: Severity) {
        let event = ProgressEvent {
            task_id: ProgressEvent::SYSTEM_TASK_ID.to_string(),
            tool_name: String::new(),
            project_id: String::new(),
            stage: "system".to_string(),
            progress: 0.0,
            message: message.into(),
            metrics: None,
            severity: Some(severity),
            timestamp: chrono::Utc::now(),
            seq: 0,
        };
        self.publish(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(task_id: &str, stage: &str) -> ProgressEvent {
        ProgressEvent {
            task_id: task_id.to_string(),
            tool_name: "yosys".to_string(),
            project_id: "projA".to_string(),
            stage: stage.to_string(),
            progress: 0.5,
            message: stage.to_string(),
            metrics: None,
            severity: None,
            timestamp: chrono::Utc::now(),
            seq: 0,
        }
    }

    #[tokio::test]
    async fn new_subscriber_without_prior_events_gets_connected() {
        let bus = ProgressBus::new();
        let mut sub = bus.subscribe("task1");
        let first = sub.receiver.recv().await.unwrap();
        assert_eq!(first.stage, "connected");
    }

    #[tokio::test]
    async fn new_subscriber_gets_latest_as_catch_up() {
        let bus = ProgressBus::new();
        bus.publish(event("task1", "fitting"));
        let mut sub = bus.subscribe("task1");
        let first = sub.receiver.recv().await.unwrap();
        assert_eq!(first.stage, "fitting");
    }

    #[tokio::test]
    async fn subscribers_observe_publication_order() {
        let bus = ProgressBus::new();
        let mut sub = bus.subscribe("task1");
        let _ = sub.receiver.recv().await.unwrap(); // connected
        bus.publish(event("task1", "a"));
        bus.publish(event("task1", "b"));
        bus.publish(event("task1", "c"));
        let a = sub.receiver.recv().await.unwrap();
        let b = sub.receiver.recv().await.unwrap();
        let c = sub.receiver.recv().await.unwrap();
        assert_eq!((a.stage.as_str(), a.seq), ("a", 0));
        assert_eq!((b.stage.as_str(), b.seq), ("b", 1));
        assert_eq!((c.stage.as_str(), c.seq), ("c", 2));
    }

    #[tokio::test]
    async fn unsubscribe_stops_further_delivery() {
        let bus = ProgressBus::new();
        let sub = bus.subscribe("task1");
        bus.unsubscribe("task1", sub.id);
        bus.publish(event("task1", "after-unsub"));
        // Dropped sender means publish simply finds no live subscribers; no panic.
        assert_eq!(bus.latest("task1").unwrap().stage, "after-unsub");
    }

    #[tokio::test]
    async fn cross_task_events_do_not_interfere() {
        let bus = ProgressBus::new();
        bus.publish(event("task1", "x"));
        bus.publish(event("task2", "y"));
        assert_eq!(bus.latest("task1").unwrap().stage, "x");
        assert_eq!(bus.latest("task2").unwrap().stage, "y");
    }

    #[tokio::test]
    async fn broadcast_system_uses_reserved_task_id() {
        let bus = ProgressBus::new();
        bus.broadcast_system("starting up", Severity::Info);
        assert_eq!(bus.latest(ProgressEvent::SYSTEM_TASK_ID).unwrap().stage, "system");
    }
}
