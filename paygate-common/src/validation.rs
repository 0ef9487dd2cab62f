use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::error::{Result, ServiceError};

/// Wire format for user-supplied timestamps.
pub const WIRE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const WIRE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Clock skew tolerated on "must not be in the future" checks.
const FUTURE_SKEW_SECS: i64 = 300;

/// Card numbers are 16 digits, no separators.
pub fn validate_card_number(card_number: &str) -> Result<()> {
    if card_number.len() != 16 || !card_number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ServiceError::validation(format!(
            "card number must be 16 digits, got {:?}",
            card_number
        )));
    }
    Ok(())
}

pub fn validate_amount(field: &str, amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(ServiceError::validation(format!(
            "{field} must be positive, got {amount}"
        )));
    }
    Ok(())
}

pub fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::invalid_field(format!("{field} is required")));
    }
    Ok(())
}

/// Parses `%Y-%m-%d %H:%M:%S` (RFC 3339 accepted as a fallback) into UTC.
pub fn parse_wire_time(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, WIRE_TIME_FORMAT) {
        return Ok(naive.and_utc());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    Err(ServiceError::parse_time(value))
}

pub fn parse_wire_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, WIRE_DATE_FORMAT)
        .map_err(|_| ServiceError::parse_time(value))
}

/// Commands may not be dated past `now + skew`.
pub fn validate_not_future(field: &str, time: DateTime<Utc>) -> Result<()> {
    if time > Utc::now() + Duration::seconds(FUTURE_SKEW_SECS) {
        return Err(ServiceError::validation(format!(
            "{field} may not be in the future"
        )));
    }
    Ok(())
}

/// Accepted top-up / payment channels.
pub const PAYMENT_METHODS: &[&str] = &[
    "bank_transfer",
    "credit_card",
    "debit_card",
    "e_wallet",
    "alfamart",
    "indomaret",
    "ovo",
    "gopay",
    "dana",
];

pub fn validate_payment_method(method: &str) -> Result<()> {
    if !PAYMENT_METHODS.contains(&method) {
        return Err(ServiceError::validation(format!(
            "unsupported payment method: {method}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_number_shape() {
        assert!(validate_card_number("4000000000000001").is_ok());
        assert!(validate_card_number("4000-0000-0000-0001").is_err());
        assert!(validate_card_number("400000000000000").is_err());
        assert!(validate_card_number("400000000000000a").is_err());
    }

    #[test]
    fn test_amount_must_be_positive() {
        assert!(validate_amount("withdraw_amount", 1).is_ok());
        assert!(validate_amount("withdraw_amount", 0).is_err());
        assert!(validate_amount("withdraw_amount", -300).is_err());
    }

    #[test]
    fn test_wire_time_formats() {
        assert!(parse_wire_time("2024-03-15 10:30:00").is_ok());
        assert!(parse_wire_time("2024-03-15T10:30:00Z").is_ok());
        let err = parse_wire_time("15/03/2024").unwrap_err();
        assert_eq!(err.reason(), "InvalidParseTime");
    }

    #[test]
    fn test_future_times_rejected() {
        let future = Utc::now() + Duration::hours(2);
        assert!(validate_not_future("withdraw_time", future).is_err());
        assert!(validate_not_future("withdraw_time", Utc::now()).is_ok());
    }

    #[test]
    fn test_payment_method_allow_list() {
        assert!(validate_payment_method("bank_transfer").is_ok());
        assert!(validate_payment_method("cash").is_err());
    }
}
