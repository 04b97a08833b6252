use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::application::ports::{Delivery, DeliveryReceipt, QueueError, WorkQueue};
use crate::domain::WorkUnit;

struct Entry {
    id: u64,
    unit: WorkUnit,
    visible_at: Instant,
    receive_count: u32,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    entries: Vec<Entry>,
}

/// Process-local queue with visibility timeouts on the tokio clock, so paused-time
/// tests can step through delays.
pub struct InMemoryWorkQueue {
    inner: Mutex<Inner>,
    visibility_timeout: Duration,
}

impl InMemoryWorkQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            visibility_timeout,
        }
    }

    /// Units not yet acknowledged, visible or not.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn enqueue(&self, unit: &WorkUnit, delay: Duration) -> Result<(), QueueError> {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.entries.push(Entry {
            id,
            unit: unit.clone(),
            visible_at: Instant::now() + delay,
            receive_count: 0,
        });
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Delivery>, QueueError> {
        let now = Instant::now();
        let mut inner = self.lock();
        let next = inner
            .entries
            .iter_mut()
            .filter(|e| e.visible_at <= now)
            .min_by_key(|e| (e.visible_at, e.id));

        Ok(next.map(|entry| {
            entry.visible_at = now + self.visibility_timeout;
            entry.receive_count += 1;
            Delivery {
                receipt: DeliveryReceipt(entry.id.to_string()),
                unit: entry.unit.clone(),
                receive_count: entry.receive_count,
            }
        }))
    }

    async fn ack(&self, receipt: &DeliveryReceipt) -> Result<(), QueueError> {
        let id: u64 = receipt
            .0
            .parse()
            .map_err(|_| QueueError::AckFailed(format!("invalid receipt {}", receipt.0)))?;
        self.lock().entries.retain(|e| e.id != id);
        Ok(())
    }
}
