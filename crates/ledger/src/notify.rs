//! Notification collaborator.
//!
//! SMS receipts are best-effort side effects: callers log delivery failures
//! and never let them fail the surrounding operation.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("SMS delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_sms_receipt(&self, phone_number: &str, message: &str) -> Result<(), NotifyError>;
}

/// Notifier that only logs. Default when no SMS provider is wired up.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_sms_receipt(&self, phone_number: &str, message: &str) -> Result<(), NotifyError> {
        info!(phone_number, message, "sms receipt");
        Ok(())
    }
}

/// Notifier that records every message. Used by tests to assert on
/// fire-and-forget notification behaviour.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_sms_receipt(&self, phone_number: &str, message: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .await
            .push((phone_number.to_string(), message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_notifier_captures_messages() {
        let notifier = RecordingNotifier::new();
        notifier
            .send_sms_receipt("+254700000001", "KES 1000 received")
            .await
            .unwrap();

        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+254700000001");
    }
}
