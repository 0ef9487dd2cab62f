use std::future::Future;
use std::sync::Arc;

use paygate_common::error::{Entity, ErrorKind, Result, ServiceError};
use paygate_common::model::{Card, Saldo};
use paygate_ledger::{CardRepository, SaldoRepository};

/// Re-tags an internal failure with the pipeline step it happened in, so the
/// wire reason reads `UpdateSaldoFailed` instead of a generic repository
/// failure. Domain errors (NotFound, Conflict, BadRequest) pass through
/// untouched, and the correlation id born with the failure is preserved.
pub(crate) fn step(op: &'static str) -> impl Fn(ServiceError) -> ServiceError {
    move |err| match &err.kind {
        ErrorKind::Internal { cause, .. } => ServiceError {
            kind: ErrorKind::Internal {
                op,
                cause: cause.clone(),
            },
            correlation_id: err.correlation_id,
        },
        _ => err,
    }
}

/// RESOLVING_CARD: a trashed card may not source a monetary operation and is
/// indistinguishable from a missing one.
pub(crate) async fn resolve_card(
    cards: &Arc<dyn CardRepository>,
    card_number: &str,
) -> Result<Card> {
    let card = cards.find_by_card_number(card_number).await?;
    if card.is_trashed() {
        return Err(ServiceError::not_found(Entity::Card));
    }
    Ok(card)
}

/// RESOLVING_BALANCE.
pub(crate) async fn resolve_saldo(
    saldos: &Arc<dyn SaldoRepository>,
    card_number: &str,
) -> Result<Saldo> {
    saldos.find_by_card_number(card_number).await
}

/// CHECKING_FUNDS. Exactly-equal balance passes and drains to zero.
pub(crate) fn ensure_funds(saldo: &Saldo, amount: i64, card_number: &str) -> Result<()> {
    if saldo.total_balance < amount {
        return Err(ServiceError::insufficient_balance(card_number));
    }
    Ok(())
}

/// Runs the debit -> append -> finalise window on a task that outlives the
/// caller: if the client goes away mid-command, the ledger row still reaches
/// a terminal status before the per-card lock is released.
pub(crate) async fn detached<T, F>(fut: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(result) => result,
        Err(e) => Err(ServiceError::internal(
            "repository",
            format!("finalisation task aborted: {e}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saldo(balance: i64) -> Saldo {
        Saldo {
            id: 1,
            card_number: "4000000000000001".to_string(),
            total_balance: balance,
            withdraw_amount: None,
            withdraw_time: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_exact_balance_is_sufficient() {
        assert!(ensure_funds(&saldo(300), 300, "4000000000000001").is_ok());
        let err = ensure_funds(&saldo(299), 300, "4000000000000001").unwrap_err();
        assert_eq!(err.reason(), "InsufficientBalance");
    }

    #[test]
    fn test_step_retags_internal_errors_only() {
        let repo_err = ServiceError::internal("repository", "io");
        let id = repo_err.correlation_id.clone();
        let tagged = step("update_saldo")(repo_err);
        assert_eq!(tagged.reason(), "UpdateSaldoFailed");
        assert_eq!(tagged.correlation_id, id);

        let not_found = ServiceError::not_found(Entity::Saldo);
        let passed = step("update_saldo")(not_found);
        assert_eq!(passed.reason(), "SaldoNotFound");
    }
}
