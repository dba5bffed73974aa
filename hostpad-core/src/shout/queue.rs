use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::message::ShoutMessage;

/// What the consumer receives from [`ShoutQueue::dequeue_blocking`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dequeued {
    /// Next message in arrival order.
    Message(ShoutMessage),
    /// Stop was requested; the consumer must exit.
    Stop,
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<ShoutMessage>,
    stop_requested: bool,
}

/// Unbounded FIFO shared by any number of producers and one consumer.
///
/// Items and the stop flag live behind a single mutex; the consumer is woken
/// through a [`Notify`] whose permit survives a wake issued before the
/// consumer starts waiting, so neither an enqueue nor a stop can be missed.
#[derive(Debug, Default)]
pub struct ShoutQueue {
    state: Mutex<QueueState>,
    wake: Notify,
}

impl ShoutQueue {
    /// Empty queue with no stop requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail and wake the consumer. Returns the depth after
    /// insertion. Never blocks beyond the lock and never fails.
    pub fn enqueue(&self, message: ShoutMessage) -> usize {
        let depth = {
            let mut state = self.state.lock();
            state.items.push_back(message);
            state.items.len()
        };
        self.wake.notify_one();
        depth
    }

    /// Wait for the next message or a stop request. Stop wins over pending
    /// items. Only the single worker may call this.
    pub async fn dequeue_blocking(&self) -> Dequeued {
        loop {
            {
                let mut state = self.state.lock();
                if state.stop_requested {
                    return Dequeued::Stop;
                }
                if let Some(message) = state.items.pop_front() {
                    return Dequeued::Message(message);
                }
            }
            self.wake.notified().await;
        }
    }

    /// Raise the stop flag and wake a waiting consumer immediately.
    pub fn request_stop(&self) {
        self.state.lock().stop_requested = true;
        self.wake.notify_one();
    }

    /// Whether stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.state.lock().stop_requested
    }

    /// Messages waiting to be rendered.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// True when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Drop everything still queued, returning how many were discarded.
    pub(crate) fn discard_pending(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.items.len();
        state.items.clear();
        dropped
    }
}
