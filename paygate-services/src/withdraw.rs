use std::sync::Arc;

use paygate_cache::Cache;
use paygate_common::error::{Entity, Result, ServiceError};
use paygate_common::fingerprint::domain_prefix;
use paygate_common::model::{Card, LedgerStatus, Withdraw};
use paygate_common::observe::observed;
use paygate_common::requests::{CreateWithdrawRequest, UpdateWithdrawRequest};
use paygate_common::validation;
use paygate_events::{email, EventBus, EventEnvelope, NotificationKind};
use paygate_ledger::{CardRepository, LedgerRepository, SaldoRepository, UserRepository};

use crate::locks::CardLockRegistry;
use crate::pipeline;

const SERVICE: &str = "withdraw_command_service";

/// Monetary write pipeline for withdraws. The flow is the canonical machine:
/// validate, resolve card and balance, check funds, debit, append the ledger
/// row as pending, finalise, notify. The debit-to-terminal-status window runs
/// detached under the per-card lock so a vanished client cannot strand a
/// committed debit.
pub struct WithdrawCommandService {
    cards: Arc<dyn CardRepository>,
    saldos: Arc<dyn SaldoRepository>,
    users: Arc<dyn UserRepository>,
    withdraws: Arc<dyn LedgerRepository<Withdraw>>,
    cache: Cache,
    events: EventBus,
    locks: Arc<CardLockRegistry>,
}

impl WithdrawCommandService {
    pub fn new(
        cards: Arc<dyn CardRepository>,
        saldos: Arc<dyn SaldoRepository>,
        users: Arc<dyn UserRepository>,
        withdraws: Arc<dyn LedgerRepository<Withdraw>>,
        cache: Cache,
        events: EventBus,
        locks: Arc<CardLockRegistry>,
    ) -> Self {
        Self {
            cards,
            saldos,
            users,
            withdraws,
            cache,
            events,
            locks,
        }
    }

    pub async fn create(&self, req: CreateWithdrawRequest) -> Result<Withdraw> {
        let args = format!(
            "card_number={} amount={}",
            req.card_number, req.withdraw_amount
        );
        observed(SERVICE, "create", args, self.create_inner(req)).await
    }

    async fn create_inner(&self, req: CreateWithdrawRequest) -> Result<Withdraw> {
        validation::require("card_number", &req.card_number)?;
        validation::validate_card_number(&req.card_number)?;
        validation::validate_amount("withdraw_amount", req.withdraw_amount)?;
        let withdraw_time = validation::parse_wire_time(&req.withdraw_time)?;
        validation::validate_not_future("withdraw_time", withdraw_time)?;

        let guard = self.locks.acquire(&req.card_number).await;

        let card = pipeline::resolve_card(&self.cards, &req.card_number).await?;
        let saldo = pipeline::resolve_saldo(&self.saldos, &req.card_number).await?;
        pipeline::ensure_funds(&saldo, req.withdraw_amount, &req.card_number)?;

        let saldos = Arc::clone(&self.saldos);
        let withdraws = Arc::clone(&self.withdraws);
        let card_number = req.card_number.clone();
        let amount = req.withdraw_amount;
        let row = pipeline::detached(async move {
            let _guard = guard;
            let pre_debit = saldo.total_balance;

            saldos
                .update_balance(
                    &card_number,
                    pre_debit - amount,
                    Some((amount, withdraw_time)),
                )
                .await
                .map_err(pipeline::step("update_saldo"))?;

            let draft = Withdraw {
                id: 0,
                card_number: card_number.clone(),
                withdraw_amount: amount,
                withdraw_time,
                status: LedgerStatus::Pending,
                created_at: withdraw_time,
                updated_at: withdraw_time,
                deleted_at: None,
            };
            let row = match withdraws.create(draft).await {
                Ok(row) => row,
                Err(e) => {
                    if let Err(rollback) = saldos.update_balance(&card_number, pre_debit, None).await
                    {
                        let rollback = pipeline::step("rollback_saldo")(rollback);
                        tracing::error!(
                            card_number = %card_number,
                            correlation_id = %rollback.correlation_id,
                            reason = %rollback.reason(),
                            error = %rollback,
                            "invariant breach: balance rollback failed, manual reconciliation required"
                        );
                    }
                    return Err(pipeline::step("create_withdraw")(e));
                }
            };

            match withdraws.update_status(row.id, LedgerStatus::Success).await {
                Ok(row) => Ok(row),
                Err(e) => {
                    if let Err(mark) = withdraws.update_status(row.id, LedgerStatus::Failed).await {
                        tracing::error!(
                            withdraw_id = row.id,
                            error = %mark,
                            "could not mark withdraw as failed"
                        );
                    }
                    Err(pipeline::step("update_withdraw_status")(e))
                }
            }
        })
        .await?;

        self.notify(&card, NotificationKind::WithdrawCreate, &row).await;
        self.invalidate().await;
        Ok(row)
    }

    pub async fn update(&self, req: UpdateWithdrawRequest) -> Result<Withdraw> {
        let args = format!("id={} amount={}", req.id, req.withdraw_amount);
        observed(SERVICE, "update", args, self.update_inner(req)).await
    }

    /// Re-enters the debit step through the amount delta: raising the amount
    /// debits the difference, lowering it refunds.
    async fn update_inner(&self, req: UpdateWithdrawRequest) -> Result<Withdraw> {
        validation::require("card_number", &req.card_number)?;
        validation::validate_card_number(&req.card_number)?;
        validation::validate_amount("withdraw_amount", req.withdraw_amount)?;
        let withdraw_time = validation::parse_wire_time(&req.withdraw_time)?;
        validation::validate_not_future("withdraw_time", withdraw_time)?;

        let guard = self.locks.acquire(&req.card_number).await;

        let existing = self.withdraws.find_by_id(req.id).await?;
        if existing.deleted_at.is_some() {
            return Err(ServiceError::not_found(Entity::Withdraw));
        }
        if existing.card_number != req.card_number {
            return Err(ServiceError::validation(
                "card_number cannot change on update",
            ));
        }

        let card = pipeline::resolve_card(&self.cards, &req.card_number).await?;
        let saldo = pipeline::resolve_saldo(&self.saldos, &req.card_number).await?;
        let delta = req.withdraw_amount - existing.withdraw_amount;
        if delta > 0 {
            pipeline::ensure_funds(&saldo, delta, &req.card_number)?;
        }

        let saldos = Arc::clone(&self.saldos);
        let withdraws = Arc::clone(&self.withdraws);
        let card_number = req.card_number.clone();
        let amount = req.withdraw_amount;
        let row = pipeline::detached(async move {
            let _guard = guard;
            let pre_update = saldo.total_balance;

            if delta != 0 {
                saldos
                    .update_balance(
                        &card_number,
                        pre_update - delta,
                        Some((amount, withdraw_time)),
                    )
                    .await
                    .map_err(pipeline::step("update_saldo"))?;
            }

            let mut updated = existing;
            updated.withdraw_amount = amount;
            updated.withdraw_time = withdraw_time;
            match withdraws.update(updated).await {
                Ok(row) => Ok(row),
                Err(e) => {
                    if delta != 0 {
                        if let Err(rollback) =
                            saldos.update_balance(&card_number, pre_update, None).await
                        {
                            let rollback = pipeline::step("rollback_saldo")(rollback);
                            tracing::error!(
                                card_number = %card_number,
                                correlation_id = %rollback.correlation_id,
                                error = %rollback,
                                "invariant breach: balance rollback failed, manual reconciliation required"
                            );
                        }
                    }
                    Err(pipeline::step("update_withdraw")(e))
                }
            }
        })
        .await?;

        self.notify(&card, NotificationKind::WithdrawUpdate, &row).await;
        self.invalidate().await;
        Ok(row)
    }

    pub async fn trashed(&self, id: u64) -> Result<Withdraw> {
        observed(SERVICE, "trashed", format!("id={id}"), async {
            let row = self
                .withdraws
                .trash(id)
                .await
                .map_err(pipeline::step("trash"))?;
            self.invalidate().await;
            Ok(row)
        })
        .await
    }

    pub async fn restore(&self, id: u64) -> Result<Withdraw> {
        observed(SERVICE, "restore", format!("id={id}"), async {
            let row = self
                .withdraws
                .restore(id)
                .await
                .map_err(pipeline::step("restore"))?;
            self.invalidate().await;
            Ok(row)
        })
        .await
    }

    pub async fn delete_permanent(&self, id: u64) -> Result<()> {
        observed(SERVICE, "delete_permanent", format!("id={id}"), async {
            self.withdraws
                .delete_permanent(id)
                .await
                .map_err(pipeline::step("delete_permanent"))?;
            self.invalidate().await;
            Ok(())
        })
        .await
    }

    pub async fn restore_all(&self) -> Result<u64> {
        observed(SERVICE, "restore_all", String::new(), async {
            let restored = self
                .withdraws
                .restore_all()
                .await
                .map_err(pipeline::step("restore"))?;
            self.invalidate().await;
            Ok(restored)
        })
        .await
    }

    pub async fn delete_all_permanent(&self) -> Result<u64> {
        observed(SERVICE, "delete_all_permanent", String::new(), async {
            let removed = self
                .withdraws
                .delete_all_permanent()
                .await
                .map_err(pipeline::step("delete_permanent"))?;
            self.invalidate().await;
            Ok(removed)
        })
        .await
    }

    /// Fire-and-forget: the monetary effect is already committed, so an
    /// enqueue failure is logged as SendEmailFailed and the command still
    /// reports success.
    async fn notify(&self, card: &Card, kind: NotificationKind, row: &Withdraw) {
        let user = match self.users.find_by_id(card.user_id).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(
                    user_id = card.user_id,
                    error = %e,
                    "card owner not resolvable, skipping notification"
                );
                return;
            }
        };
        let (subject, html_body) = match kind {
            NotificationKind::WithdrawUpdate => {
                email::withdraw_updated(&row.card_number, row.withdraw_amount)
            }
            _ => email::withdraw_created(&row.card_number, row.withdraw_amount),
        };
        let envelope = EventEnvelope::new(
            kind,
            row.id,
            user.email,
            subject,
            html_body,
            uuid::Uuid::new_v4().to_string(),
        );
        if let Err(e) = self.events.publish(envelope) {
            tracing::error!(
                withdraw_id = row.id,
                correlation_id = %e.correlation_id,
                reason = %e.reason(),
                error = %e,
                "notification enqueue failed after commit"
            );
        }
    }

    async fn invalidate(&self) {
        self.cache.invalidate_prefix(&domain_prefix("withdraw")).await;
        self.cache.invalidate_prefix(&domain_prefix("saldo")).await;
        self.cache.invalidate_prefix(&domain_prefix("card")).await;
    }
}
