use super::event::LogEvent;
use crate::constants::MAX_QUEUE_CAPACITY;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::Mutex;

/// Fixed-capacity FIFO between the producers and the flusher.
///
/// Pushing never waits: when the queue is full the new event is dropped and
/// counted. Draining is done by the single flusher.
pub struct EventQueue {
    tx: Sender<LogEvent>,
    rx: Mutex<Receiver<LogEvent>>,
    dropped: AtomicU64,
}

impl EventQueue {
    /// `capacity` is clamped to `1..=MAX_QUEUE_CAPACITY`.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.clamp(1, MAX_QUEUE_CAPACITY));
        Self {
            tx,
            rx: Mutex::new(rx),
            dropped: AtomicU64::new(0),
        }
    }

    /// Returns false if the event was dropped.
    pub fn try_push(&self, event: LogEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Removes up to `max` events in FIFO order without waiting for more.
    pub async fn drain(&self, max: usize) -> Vec<LogEvent> {
        let mut rx = self.rx.lock().await;

        if rx.is_empty() || max == 0 {
            return Vec::new();
        }

        let mut buff = Vec::with_capacity(max.min(rx.len()));
        rx.recv_many(&mut buff, max).await;
        buff
    }

    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Drops counted since the last call.
    pub fn take_dropped(&self) -> u64 {
        self.dropped.swap(0, Ordering::Relaxed)
    }
}
