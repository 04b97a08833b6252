use std::time::Duration;

use async_trait::async_trait;

use crate::domain::WorkUnit;

/// Opaque handle used to acknowledge one delivery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeliveryReceipt(pub String);

#[derive(Debug, Clone)]
pub struct Delivery {
    pub receipt: DeliveryReceipt,
    pub unit: WorkUnit,
    /// How many times this message has been handed out, including this delivery.
    pub receive_count: u32,
}

/// At-least-once, unordered transport for [`WorkUnit`]s.
///
/// A received unit stays invisible until acknowledged or until its visibility
/// timeout lapses, after which it is delivered again.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn enqueue(&self, unit: &WorkUnit, delay: Duration) -> Result<(), QueueError>;

    async fn receive(&self) -> Result<Option<Delivery>, QueueError>;

    async fn ack(&self, receipt: &DeliveryReceipt) -> Result<(), QueueError>;
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("enqueue failed: {0}")]
    EnqueueFailed(String),
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
    #[error("ack failed: {0}")]
    AckFailed(String),
    #[error("malformed message: {0}")]
    Malformed(String),
}
