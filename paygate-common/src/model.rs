use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Terminal state machine of a ledger row: `pending -> success` or
/// `pending -> failed`, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    Pending,
    Success,
    Failed,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Pending => "pending",
            LedgerStatus::Success => "success",
            LedgerStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, LedgerStatus::Pending)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: LedgerStatus) -> bool {
        matches!(
            (self, next),
            (LedgerStatus::Pending, LedgerStatus::Success)
                | (LedgerStatus::Pending, LedgerStatus::Failed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: u64,
    pub user_id: u64,
    pub card_number: String,
    pub card_type: String,
    pub card_provider: String,
    pub expire_date: NaiveDate,
    pub cvv: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Card {
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Authoritative balance projection, one row per active card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Saldo {
    pub id: u64,
    pub card_number: String,
    pub total_balance: i64,
    pub withdraw_amount: Option<i64>,
    pub withdraw_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdraw {
    pub id: u64,
    pub card_number: String,
    pub withdraw_amount: i64,
    pub withdraw_time: DateTime<Utc>,
    pub status: LedgerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topup {
    pub id: u64,
    pub card_number: String,
    pub topup_no: String,
    pub topup_amount: i64,
    pub topup_method: String,
    pub topup_time: DateTime<Utc>,
    pub status: LedgerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub card_number: String,
    pub amount: i64,
    pub payment_method: String,
    pub merchant_id: u64,
    pub transaction_time: DateTime<Utc>,
    pub status: LedgerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: u64,
    pub transfer_from: String,
    pub transfer_to: String,
    pub transfer_amount: i64,
    pub transfer_time: DateTime<Utc>,
    pub status: LedgerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(LedgerStatus::Pending.can_transition_to(LedgerStatus::Success));
        assert!(LedgerStatus::Pending.can_transition_to(LedgerStatus::Failed));
        assert!(!LedgerStatus::Success.can_transition_to(LedgerStatus::Failed));
        assert!(!LedgerStatus::Failed.can_transition_to(LedgerStatus::Success));
        assert!(!LedgerStatus::Pending.can_transition_to(LedgerStatus::Pending));
    }
}
