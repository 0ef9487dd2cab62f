use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use paygate_common::error::{Result, ServiceError};

use crate::EventEnvelope;

/// Delivery side of the notification pipeline. SMTP is an external
/// collaborator; the default implementation records deliveries in the log.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}

pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> Result<()> {
        tracing::info!(to, subject, "email delivered");
        Ok(())
    }
}

/// Producer handle for notification envelopes. Enqueueing is synchronous and
/// bounded; a full or closed queue is reported to the caller, who decides
/// whether the command outcome is affected.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: mpsc::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<EventEnvelope>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub fn publish(&self, envelope: EventEnvelope) -> Result<()> {
        let topic = envelope.topic.clone();
        let key = envelope.key.clone();
        match self.tx.try_send(envelope) {
            Ok(()) => {
                tracing::debug!(topic, key, "notification enqueued");
                Ok(())
            }
            Err(e) => Err(ServiceError::internal("send_email", e)),
        }
    }
}

/// Drains the queue, rendering each envelope through the mailer. Failures
/// are logged with the envelope's correlation id; the queue keeps moving.
pub fn spawn_email_worker(
    mut rx: mpsc::Receiver<EventEnvelope>,
    mailer: Arc<dyn Mailer>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            if let Err(e) = mailer
                .send(&envelope.email, &envelope.subject, &envelope.html_body)
                .await
            {
                tracing::error!(
                    topic = %envelope.topic,
                    key = %envelope.key,
                    correlation_id = %envelope.correlation_id,
                    error = %e,
                    "email delivery failed"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NotificationKind;
    use std::sync::Mutex;

    struct RecordingMailer {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, _subject: &str, _html_body: &str) -> Result<()> {
            self.sent.lock().unwrap().push(to.to_string());
            Ok(())
        }
    }

    fn envelope(key: u64) -> EventEnvelope {
        EventEnvelope::new(
            NotificationKind::WithdrawCreate,
            key,
            "user@example.com",
            "Withdraw",
            "<p>done</p>",
            "corr",
        )
    }

    #[tokio::test]
    async fn test_worker_drains_published_envelopes() {
        let (bus, rx) = EventBus::new(8);
        let mailer = Arc::new(RecordingMailer {
            sent: Mutex::new(Vec::new()),
        });
        let handle = spawn_email_worker(rx, mailer.clone());

        bus.publish(envelope(1)).unwrap();
        bus.publish(envelope(2)).unwrap();
        drop(bus);
        handle.await.unwrap();

        assert_eq!(mailer.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_full_queue_surfaces_send_email_failure() {
        let (bus, _rx) = EventBus::new(1);
        bus.publish(envelope(1)).unwrap();
        let err = bus.publish(envelope(2)).unwrap_err();
        assert_eq!(err.reason(), "SendEmailFailed");
    }
}
