//! Per-observer outbound queue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use maestro_core::types::LogEvent;

/// Bounded queue between the fan-out and one observer's writer task.
///
/// Drop-oldest on overflow: a slow observer loses its oldest unsent
/// events and keeps receiving the most recent ones.
pub(crate) struct ObserverQueue {
    inner: Mutex<VecDeque<LogEvent>>,
    capacity: usize,
    notify: Notify,
    dropped: AtomicU64,
}

impl ObserverQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity,
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueues an event, evicting the oldest if the queue is full.
    pub(crate) fn push(&self, event: LogEvent) {
        {
            let mut queue = self.inner.lock();
            if queue.len() == self.capacity {
                queue.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            queue.push_back(event);
        }
        self.notify.notify_one();
    }

    /// Dequeues the next unsent event.
    pub(crate) fn pop(&self) -> Option<LogEvent> {
        self.inner.lock().pop_front()
    }

    /// Waits until at least one push since the last wakeup.
    pub(crate) async fn wait(&self) {
        self.notify.notified().await;
    }

    #[cfg(test)]
    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::types::LogLevel;

    fn event(message: &str) -> LogEvent {
        LogEvent::new(LogLevel::Info, message, "u1:ABC:s1", "test", "f", 1)
    }

    #[test]
    fn test_fifo_order() {
        let queue = ObserverQueue::new(8);
        queue.push(event("a"));
        queue.push(event("b"));
        assert_eq!(queue.pop().unwrap().message, "a");
        assert_eq!(queue.pop().unwrap().message, "b");
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let queue = ObserverQueue::new(3);
        for label in ["e1", "e2", "e3", "e4", "e5"] {
            queue.push(event(label));
        }
        assert_eq!(queue.dropped(), 2);
        assert_eq!(queue.len(), 3);
        // Survivors are the 3 most recent, still in order.
        assert_eq!(queue.pop().unwrap().message, "e3");
        assert_eq!(queue.pop().unwrap().message, "e4");
        assert_eq!(queue.pop().unwrap().message, "e5");
    }

    #[tokio::test]
    async fn test_push_wakes_waiter() {
        let queue = std::sync::Arc::new(ObserverQueue::new(4));
        let waiter = {
            let queue = std::sync::Arc::clone(&queue);
            tokio::spawn(async move {
                queue.wait().await;
                queue.pop()
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        queue.push(event("wake"));
        let got = waiter.await.unwrap();
        assert_eq!(got.unwrap().message, "wake");
    }
}
