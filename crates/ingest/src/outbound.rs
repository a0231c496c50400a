use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use rolo_common::error::RoloResult;
use rolo_config::AppConfig;

/// Pushes locally queued changes out to the remote vault. Implemented by
/// the vault change-queue library; best-effort from this subsystem's view.
#[async_trait]
pub trait OutboundQueue: Send + Sync {
    async fn push_pending(&self) -> RoloResult<()>;
}

/// Fire-and-forget trigger for the outbound push, bounded by a timeout.
/// Failures and timeouts are logged and swallowed; the handle is returned
/// so callers that care can await or abort the task.
#[derive(Debug, Clone)]
pub struct OutboundTrigger {
    timeout: Duration,
}

impl OutboundTrigger {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_app(config: &AppConfig) -> Self {
        Self::new(Duration::from_secs(config.outbound_push_timeout_secs))
    }

    pub fn fire(&self, source: &str, queue: Arc<dyn OutboundQueue>) -> JoinHandle<()> {
        let timeout = self.timeout;
        let source = source.to_string();
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, queue.push_pending()).await {
                Ok(Ok(())) => {
                    tracing::debug!(source, "outbound push completed");
                }
                Ok(Err(e)) => {
                    tracing::warn!(source, error = %e, "outbound push failed");
                }
                Err(_) => {
                    tracing::warn!(
                        source,
                        timeout_secs = timeout.as_secs(),
                        "outbound push timed out"
                    );
                }
            }
        })
    }
}
