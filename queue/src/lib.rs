//! Priority task queue with a bounded worker pool.
//!
//! Ordering is `(-priority, created_at)`: higher priority first, earliest
//! enqueue time breaks ties. `BinaryHeap` is not FIFO-stable on its own, so
//! every entry additionally carries a monotonic sequence number that serves
//! as the tiebreak key instead of `created_at` directly (two tasks can share
//! a millisecond timestamp; they cannot share a sequence number).

mod task;

pub use task::{generate_task_id, Task, TaskSnapshot};

use async_trait::async_trait;
use holomesh_types::{ParamMap, TaskStatus};
use parking_lot::Mutex;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("task {0} not found")]
    NotFound(String),
    #[error("task {0} is not pending and cannot be cancelled")]
    NotCancellable(String),
}

pub type QueueResult<T> = Result<T, QueueError>;

/// Invoked by a worker once it dequeues a task. Registered once per queue at
/// construction; the orchestrator supplies an implementation that runs a
/// strategy to completion and reports its result.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &Task) -> Result<serde_json::Value, String>;
}

/// A heap entry is either a real task or a shutdown sentinel (`task_id =
/// None`). Sentinels always sort first so every idle worker wakes and
/// exits promptly.
#[derive(Debug, Clone)]
struct HeapEntry {
    priority: i64,
    seq: u64,
    task_id: Option<String>,
}

impl HeapEntry {
    fn sentinel(seq: u64) -> Self {
        Self { priority: i64::MAX, seq, task_id: None }
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // BinaryHeap is a max-heap: higher priority must compare greater.
        // Within equal priority, the earlier sequence number must compare
        // greater so it's popped first (FIFO).
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

struct Inner {
    tasks: Mutex<std::collections::HashMap<String, Task>>,
    heap: Mutex<BinaryHeap<HeapEntry>>,
    notify: Notify,
    seq_counter: AtomicU64,
    handler: Arc<dyn TaskHandler>,
    recent_completed: Mutex<VecDeque<String>>,
    recent_completed_cap: usize,
}

/// Bounded worker pool draining a shared priority heap.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Inner>,
}

impl TaskQueue {
    pub fn new(handler: Arc<dyn TaskHandler>, recent_completed_cap: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                tasks: Mutex::new(std::collections::HashMap::new()),
                heap: Mutex::new(BinaryHeap::new()),
                notify: Notify::new(),
                seq_counter: AtomicU64::new(0),
                handler,
                recent_completed: Mutex::new(VecDeque::new()),
                recent_completed_cap,
            }),
        }
    }

    /// Enqueues a task at `Pending`. Returns the generated task id.
    pub fn add(
        &self,
        tool_name: impl Into<String>,
        params: ParamMap,
        project_id: impl Into<String>,
        priority: i64,
    ) -> String {
        let task = Task::new(tool_name.into(), params, project_id.into(), priority);
        let task_id = task.task_id.clone();
        let seq = self.inner.seq_counter.fetch_add(1, Ordering::Relaxed);
        self.inner.tasks.lock().insert(task_id.clone(), task);
        self.inner.heap.lock().push(HeapEntry { priority, seq, task_id: Some(task_id.clone()) });
        self.inner.notify.notify_one();
        task_id
    }

    pub fn status(&self, task_id: &str) -> Option<TaskSnapshot> {
        self.inner.tasks.lock().get(task_id).map(Task::snapshot)
    }

    pub fn list(&self, status_filter: Option<TaskStatus>) -> Vec<TaskSnapshot> {
        self.inner
            .tasks
            .lock()
            .values()
            .filter(|t| status_filter.map_or(true, |s| t.status == s))
            .map(Task::snapshot)
            .collect()
    }

    /// Only a `Pending` task may be cancelled. Cancellation transitions the
    /// record in place rather than deleting it, so `status` keeps reporting
    /// a consistent terminal state afterward; a worker that later dequeues
    /// the same heap entry checks status and skips it.
    pub fn cancel(&self, task_id: &str) -> QueueResult<()> {
        let mut tasks = self.inner.tasks.lock();
        let task = tasks.get_mut(task_id).ok_or_else(|| QueueError::NotFound(task_id.to_string()))?;
        if task.status != TaskStatus::Pending {
            return Err(QueueError::NotCancellable(task_id.to_string()));
        }
        task.status = TaskStatus::Cancelled;
        Ok(())
    }

    /// Atomically claims a pending task for synchronous, out-of-band
    /// execution (used by callers that drive a strategy themselves rather
    /// than waiting on the worker pool, so the caller never blocks on queue
    /// dispatch). Returns `None` if the task is missing or already left
    /// `Pending`.
    pub fn claim_for_inline_execution(&self, task_id: &str) -> Option<Task> {
        let mut tasks = self.inner.tasks.lock();
        let task = tasks.get_mut(task_id)?;
        if task.status != TaskStatus::Pending {
            return None;
        }
        task.status = TaskStatus::Running;
        Some(task.clone())
    }

    pub fn complete(&self, task_id: &str, result: serde_json::Value) {
        let mut tasks = self.inner.tasks.lock();
        if let Some(task) = tasks.get_mut(task_id) {
            task.status = TaskStatus::Completed;
            task.result = Some(result);
        }
        drop(tasks);
        self.push_recent_completed(task_id);
    }

    pub fn fail(&self, task_id: &str, error: impl Into<String>) {
        let mut tasks = self.inner.tasks.lock();
        if let Some(task) = tasks.get_mut(task_id) {
            task.status = TaskStatus::Failed;
            task.error = Some(error.into());
        }
        drop(tasks);
        self.push_recent_completed(task_id);
    }

    fn push_recent_completed(&self, task_id: &str) {
        let mut recent = self.inner.recent_completed.lock();
        recent.push_back(task_id.to_string());
        while recent.len() > self.inner.recent_completed_cap {
            recent.pop_front();
        }
    }

    /// Last `n` completed-or-failed task ids, newest last. `truncated` is
    /// true when the ring buffer's retention cap was smaller than `n` would
    /// have needed to return everything ever finished.
    pub fn recent_completed(&self, n: usize) -> RecentCompleted {
        let recent = self.inner.recent_completed.lock();
        let truncated = recent.len() >= self.inner.recent_completed_cap;
        let tasks = recent.iter().rev().take(n).cloned().collect::<Vec<_>>();
        RecentCompleted { tasks, truncated }
    }

    /// Spawns `num_workers` tasks, each pulling the highest-priority pending
    /// entry from the shared heap and invoking the registered handler.
    pub fn start(&self, num_workers: usize) -> Vec<JoinHandle<()>> {
        (0..num_workers)
            .map(|worker_index| {
                let queue = self.clone();
                tokio::spawn(async move { queue.worker_loop(worker_index).await })
            })
            .collect()
    }

    /// Pushes one shutdown sentinel per worker and notifies them. Callers
    /// should `.await` the `JoinHandle`s returned by `start` afterward.
    pub fn stop(&self, num_workers: usize) {
        for _ in 0..num_workers {
            let seq = self.inner.seq_counter.fetch_add(1, Ordering::Relaxed);
            self.inner.heap.lock().push(HeapEntry::sentinel(seq));
        }
        self.inner.notify.notify_waiters();
    }

    async fn worker_loop(&self, worker_index: usize) {
        loop {
            let entry = loop {
                if let Some(entry) = self.inner.heap.lock().pop() {
                    break entry;
                }
                self.inner.notify.notified().await;
            };

            let task_id = match entry.task_id {
                Some(id) => id,
                None => {
                    debug!(worker_index, "worker received shutdown sentinel");
                    return;
                }
            };

            let task = {
                let mut tasks = self.inner.tasks.lock();
                match tasks.get_mut(&task_id) {
                    Some(task) if task.status == TaskStatus::Pending => {
                        task.status = TaskStatus::Running;
                        Some(task.clone())
                    }
                    _ => None,
                }
            };
            let Some(task) = task else {
                // Already claimed inline, cancelled, or otherwise no longer
                // pending by the time this worker reached it.
                continue;
            };

            match self.inner.handler.handle(&task).await {
                Ok(result) => self.complete(&task_id, result),
                Err(err) => {
                    warn!(task_id, error = %err, "task failed");
                    self.fail(&task_id, err);
                }
            }
            info!(task_id, worker_index, "task finished");
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecentCompleted {
    pub tasks: Vec<String>,
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct RecordingHandler {
        order: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl TaskHandler for RecordingHandler {
        async fn handle(&self, task: &Task) -> Result<serde_json::Value, String> {
            self.order.lock().push(task.task_id.clone());
            Ok(serde_json::json!({"ok": true}))
        }
    }

    #[tokio::test]
    async fn priority_then_fifo_ordering_single_worker() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let queue = TaskQueue::new(Arc::new(RecordingHandler { order: order.clone() }), 50);

        let ids: Vec<String> = [1_i64, 5, 3, 5]
            .iter()
            .map(|p| queue.add("yosys", ParamMap::new(), "projA", *p))
            .collect();

        let handles = queue.start(1);
        // Give the single worker time to drain all four tasks.
        tokio::time::sleep(Duration::from_millis(50)).await;
        queue.stop(1);
        for h in handles {
            let _ = h.await;
        }

        let executed = order.lock().clone();
        assert_eq!(executed.len(), 4);
        // priorities enqueued [1,5,3,5] -> execution order 5,5,3,1, FIFO among ties.
        assert_eq!(executed[0], ids[1]);
        assert_eq!(executed[1], ids[3]);
        assert_eq!(executed[2], ids[2]);
        assert_eq!(executed[3], ids[0]);
    }

    #[tokio::test]
    async fn cancel_only_affects_pending_tasks() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let queue = TaskQueue::new(Arc::new(RecordingHandler { order }), 50);
        let id = queue.add("yosys", ParamMap::new(), "projA", 1);
        queue.cancel(&id).unwrap();
        assert_eq!(queue.status(&id).unwrap().status, TaskStatus::Cancelled);
        assert!(queue.cancel(&id).is_err());
    }

    #[tokio::test]
    async fn worker_skips_a_task_already_claimed_inline() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let queue = TaskQueue::new(Arc::new(RecordingHandler { order: order.clone() }), 50);
        let id = queue.add("yosys", ParamMap::new(), "projA", 1);

        let claimed = queue.claim_for_inline_execution(&id).unwrap();
        assert_eq!(claimed.task_id, id);
        queue.complete(&id, serde_json::json!({"inline": true}));

        let handles = queue.start(1);
        tokio::time::sleep(Duration::from_millis(30)).await;
        queue.stop(1);
        for h in handles {
            let _ = h.await;
        }

        assert!(order.lock().is_empty());
        assert_eq!(queue.status(&id).unwrap().status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn recent_completed_reports_truncation() {
        struct CountingHandler(AtomicUsize);
        #[async_trait]
        impl TaskHandler for CountingHandler {
            async fn handle(&self, _task: &Task) -> Result<serde_json::Value, String> {
                self.0.fetch_add(1, Ordering::Relaxed);
                Ok(serde_json::json!({}))
            }
        }

        let queue = TaskQueue::new(Arc::new(CountingHandler(AtomicUsize::new(0))), 3);
        for _ in 0..5 {
            queue.add("yosys", ParamMap::new(), "projA", 1);
        }
        let handles = queue.start(1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        queue.stop(1);
        for h in handles {
            let _ = h.await;
        }

        let recent = queue.recent_completed(10);
        assert_eq!(recent.tasks.len(), 3);
        assert!(recent.truncated);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let queue = TaskQueue::new(Arc::new(RecordingHandler { order }), 50);
        queue.add("yosys", ParamMap::new(), "projA", 1);
        let pending_id = queue.add("yosys", ParamMap::new(), "projA", 2);
        queue.cancel(&pending_id).unwrap();

        let pending = queue.list(Some(TaskStatus::Pending));
        let cancelled = queue.list(Some(TaskStatus::Cancelled));
        assert_eq!(pending.len(), 1);
        assert_eq!(cancelled.len(), 1);
    }
}
