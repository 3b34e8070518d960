use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::error::Result;
use crate::orchestration::types::PoolSummary;

/// Sink for pool completion signals, keyed by the summary's callback key.
///
/// The transport behind a callback key (HTTP, queue, channel) is up to the
/// implementation; the dispatcher only guarantees one call per closed pool.
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    async fn notify(&self, summary: &PoolSummary) -> Result<()>;
}

/// Writes completion signals to the structured log
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait]
impl CompletionNotifier for TracingNotifier {
    async fn notify(&self, summary: &PoolSummary) -> Result<()> {
        if summary.is_success() {
            info!(
                callback_key = %summary.callback_key,
                submitted = summary.submitted,
                succeeded = summary.succeeded,
                "Settlement pool completed"
            );
        } else {
            warn!(
                callback_key = %summary.callback_key,
                submitted = summary.submitted,
                succeeded = summary.succeeded,
                failed = summary.failed(),
                failures = ?summary.failures,
                "Settlement pool completed with failures"
            );
        }
        Ok(())
    }
}

/// Broadcasts completion signals to in-process subscribers
#[derive(Debug, Clone)]
pub struct CompletionPublisher {
    sender: broadcast::Sender<PoolSummary>,
}

impl CompletionPublisher {
    /// Create a new publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PoolSummary> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for CompletionPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl CompletionNotifier for CompletionPublisher {
    async fn notify(&self, summary: &PoolSummary) -> Result<()> {
        // No subscribers is acceptable; the signal is simply dropped
        let _ = self.sender.send(summary.clone());
        Ok(())
    }
}
