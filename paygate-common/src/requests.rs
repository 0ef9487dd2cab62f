use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

// Command value objects. Times arrive as wire strings and are parsed inside
// the pipeline's validating step so a bad value maps to InvalidParseTime.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCardRequest {
    pub user_id: u64,
    pub card_type: String,
    pub card_provider: String,
    pub expire_date: String,
    pub cvv: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCardRequest {
    pub id: u64,
    pub card_type: String,
    pub card_provider: String,
    pub expire_date: String,
    pub cvv: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSaldoRequest {
    pub card_number: String,
    pub total_balance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSaldoRequest {
    pub id: u64,
    pub card_number: String,
    pub total_balance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWithdrawRequest {
    pub card_number: String,
    pub withdraw_amount: i64,
    pub withdraw_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateWithdrawRequest {
    pub id: u64,
    pub card_number: String,
    pub withdraw_amount: i64,
    pub withdraw_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTopupRequest {
    pub card_number: String,
    pub topup_amount: i64,
    pub topup_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTopupRequest {
    pub id: u64,
    pub card_number: String,
    pub topup_amount: i64,
    pub topup_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    pub card_number: String,
    pub amount: i64,
    pub payment_method: String,
    pub merchant_id: u64,
    pub transaction_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTransactionRequest {
    pub id: u64,
    pub card_number: String,
    pub amount: i64,
    pub payment_method: String,
    pub merchant_id: u64,
    pub transaction_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransferRequest {
    pub transfer_from: String,
    pub transfer_to: String,
    pub transfer_amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTransferRequest {
    pub id: u64,
    pub transfer_from: String,
    pub transfer_to: String,
    pub transfer_amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// Statistics. One parametric query shape serves every stats endpoint:
// (dimension x grain x scope) plus the year/month filter.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatsDimension {
    Amount,
    StatusSuccess,
    StatusFailed,
}

impl StatsDimension {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "amount" => Ok(StatsDimension::Amount),
            "status-success" => Ok(StatsDimension::StatusSuccess),
            "status-failed" => Ok(StatsDimension::StatusFailed),
            other => Err(ServiceError::invalid_field(format!(
                "unknown stats dimension: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatsGrain {
    Month,
    Year,
}

impl StatsGrain {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "month" | "monthly" => Ok(StatsGrain::Month),
            "year" | "yearly" => Ok(StatsGrain::Year),
            other => Err(ServiceError::invalid_field(format!(
                "unknown stats grain: {other}"
            ))),
        }
    }
}

/// Aggregation scope. Transfers are two-sided, so they scope by sender or
/// receiver; every other entity scopes by its single card number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatsScope {
    Global,
    ByCard(String),
    BySender(String),
    ByReceiver(String),
}

impl StatsScope {
    pub fn card_number(&self) -> Option<&str> {
        match self {
            StatsScope::Global => None,
            StatsScope::ByCard(card)
            | StatsScope::BySender(card)
            | StatsScope::ByReceiver(card) => Some(card),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsQuery {
    pub dimension: StatsDimension,
    pub grain: StatsGrain,
    pub scope: StatsScope,
    pub year: i32,
    pub month: Option<u32>,
}

/// Card-level stats span every monetary dimension plus the balance series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardStatsKind {
    Balance,
    Topup,
    Withdraw,
    Transaction,
    Transfer,
}

impl CardStatsKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "balance" => Ok(CardStatsKind::Balance),
            "topup" => Ok(CardStatsKind::Topup),
            "withdraw" => Ok(CardStatsKind::Withdraw),
            "transaction" => Ok(CardStatsKind::Transaction),
            "transfer" => Ok(CardStatsKind::Transfer),
            other => Err(ServiceError::invalid_field(format!(
                "unknown card stats kind: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardStatsQuery {
    pub kind: CardStatsKind,
    pub grain: StatsGrain,
    pub year: i32,
    pub card_number: Option<String>,
}

/// One entry of a dense time series. `period` is `"2024-03"` for the month
/// grain and `"2024"` for the year grain; absent periods appear with zeros.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsBucket {
    pub period: String,
    pub total_amount: i64,
    pub count: i64,
}

impl StatsBucket {
    pub fn zero(period: String) -> Self {
        Self {
            period,
            total_amount: 0,
            count: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub total_balance: i64,
    pub total_topup: i64,
    pub total_withdraw: i64,
    pub total_transaction: i64,
    pub total_transfer: i64,
    pub total_transfer_sent: i64,
    pub total_transfer_received: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_parsing() {
        assert_eq!(
            StatsDimension::parse("status-success").unwrap(),
            StatsDimension::StatusSuccess
        );
        assert!(StatsDimension::parse("method").is_err());
    }

    #[test]
    fn test_grain_accepts_both_spellings() {
        assert_eq!(StatsGrain::parse("month").unwrap(), StatsGrain::Month);
        assert_eq!(StatsGrain::parse("yearly").unwrap(), StatsGrain::Year);
    }

    #[test]
    fn test_scope_card_number() {
        assert_eq!(StatsScope::Global.card_number(), None);
        assert_eq!(
            StatsScope::BySender("4000".into()).card_number(),
            Some("4000")
        );
    }
}
