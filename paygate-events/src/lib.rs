pub mod bus;
pub mod email;

use serde::{Deserialize, Serialize};

pub use bus::{spawn_email_worker, EventBus, LogMailer, Mailer};

/// One topic per notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    WithdrawCreate,
    WithdrawUpdate,
    TopupCreate,
    TopupUpdate,
    TransactionCreate,
    TransactionUpdate,
    TransferCreate,
    TransferUpdate,
}

impl NotificationKind {
    pub fn topic(&self) -> &'static str {
        match self {
            NotificationKind::WithdrawCreate => "email-service-topic-withdraw-create",
            NotificationKind::WithdrawUpdate => "email-service-topic-withdraw-update",
            NotificationKind::TopupCreate => "email-service-topic-topup-create",
            NotificationKind::TopupUpdate => "email-service-topic-topup-update",
            NotificationKind::TransactionCreate => "email-service-topic-transaction-create",
            NotificationKind::TransactionUpdate => "email-service-topic-transaction-update",
            NotificationKind::TransferCreate => "email-service-topic-transfer-create",
            NotificationKind::TransferUpdate => "email-service-topic-transfer-update",
        }
    }
}

/// Serialised notification, keyed by the ledger row id that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub topic: String,
    pub key: String,
    pub email: String,
    pub subject: String,
    pub html_body: String,
    pub correlation_id: String,
}

impl EventEnvelope {
    pub fn new(
        kind: NotificationKind,
        key: impl ToString,
        email: impl Into<String>,
        subject: impl Into<String>,
        html_body: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            topic: kind.topic().to_string(),
            key: key.to_string(),
            email: email.into(),
            subject: subject.into(),
            html_body: html_body.into(),
            correlation_id: correlation_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names_follow_the_per_kind_convention() {
        assert_eq!(
            NotificationKind::WithdrawCreate.topic(),
            "email-service-topic-withdraw-create"
        );
        assert_eq!(
            NotificationKind::TransferUpdate.topic(),
            "email-service-topic-transfer-update"
        );
    }

    #[test]
    fn test_envelope_serialises_the_wire_fields() {
        let envelope = EventEnvelope::new(
            NotificationKind::TopupCreate,
            42u64,
            "user@example.com",
            "Top-up received",
            "<b>ok</b>",
            "corr-1",
        );
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["topic"], "email-service-topic-topup-create");
        assert_eq!(json["key"], "42");
        assert_eq!(json["email"], "user@example.com");
        assert_eq!(json["html_body"], "<b>ok</b>");
    }
}
