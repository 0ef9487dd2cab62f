use std::sync::Arc;

use paygate_cache::Cache;
use paygate_common::error::{Entity, Result, ServiceError};
use paygate_common::fingerprint::domain_prefix;
use paygate_common::model::{Card, LedgerStatus, Transfer};
use paygate_common::observe::observed;
use paygate_common::requests::{CreateTransferRequest, UpdateTransferRequest};
use paygate_common::validation;
use paygate_events::{email, EventBus, EventEnvelope, NotificationKind};
use paygate_ledger::{CardRepository, LedgerRepository, SaldoRepository, UserRepository};

use crate::locks::CardLockRegistry;
use crate::pipeline;

const SERVICE: &str = "transfer_command_service";

/// Two-sided pipeline: the sender balance is debited and the receiver
/// credited under both cards' locks (taken in lexicographic order), with a
/// two-phase compensation if either write or the ledger append fails.
pub struct TransferCommandService {
    cards: Arc<dyn CardRepository>,
    saldos: Arc<dyn SaldoRepository>,
    users: Arc<dyn UserRepository>,
    transfers: Arc<dyn LedgerRepository<Transfer>>,
    cache: Cache,
    events: EventBus,
    locks: Arc<CardLockRegistry>,
}

impl TransferCommandService {
    pub fn new(
        cards: Arc<dyn CardRepository>,
        saldos: Arc<dyn SaldoRepository>,
        users: Arc<dyn UserRepository>,
        transfers: Arc<dyn LedgerRepository<Transfer>>,
        cache: Cache,
        events: EventBus,
        locks: Arc<CardLockRegistry>,
    ) -> Self {
        Self {
            cards,
            saldos,
            users,
            transfers,
            cache,
            events,
            locks,
        }
    }

    fn validate(from: &str, to: &str, amount: i64) -> Result<()> {
        validation::require("transfer_from", from)?;
        validation::require("transfer_to", to)?;
        validation::validate_card_number(from)?;
        validation::validate_card_number(to)?;
        validation::validate_amount("transfer_amount", amount)?;
        if from == to {
            return Err(ServiceError::validation(
                "transfer_from and transfer_to must differ",
            ));
        }
        Ok(())
    }

    pub async fn create(&self, req: CreateTransferRequest) -> Result<Transfer> {
        let args = format!(
            "from={} to={} amount={}",
            req.transfer_from, req.transfer_to, req.transfer_amount
        );
        observed(SERVICE, "create", args, self.create_inner(req)).await
    }

    async fn create_inner(&self, req: CreateTransferRequest) -> Result<Transfer> {
        Self::validate(&req.transfer_from, &req.transfer_to, req.transfer_amount)?;
        let transfer_time = chrono::Utc::now();

        let guards = self
            .locks
            .acquire_pair(&req.transfer_from, &req.transfer_to)
            .await;

        let sender_card = pipeline::resolve_card(&self.cards, &req.transfer_from).await?;
        pipeline::resolve_card(&self.cards, &req.transfer_to).await?;
        let sender_saldo = pipeline::resolve_saldo(&self.saldos, &req.transfer_from).await?;
        let receiver_saldo = pipeline::resolve_saldo(&self.saldos, &req.transfer_to).await?;
        pipeline::ensure_funds(&sender_saldo, req.transfer_amount, &req.transfer_from)?;

        let saldos = Arc::clone(&self.saldos);
        let transfers = Arc::clone(&self.transfers);
        let from = req.transfer_from.clone();
        let to = req.transfer_to.clone();
        let amount = req.transfer_amount;
        let row = pipeline::detached(async move {
            let _guards = guards;
            let pre_from = sender_saldo.total_balance;
            let pre_to = receiver_saldo.total_balance;

            saldos
                .update_balance(&from, pre_from - amount, None)
                .await
                .map_err(pipeline::step("update_saldo"))?;

            if let Err(e) = saldos.update_balance(&to, pre_to + amount, None).await {
                if let Err(rollback) = saldos.update_balance(&from, pre_from, None).await {
                    let rollback = pipeline::step("rollback_saldo")(rollback);
                    tracing::error!(
                        card_number = %from,
                        correlation_id = %rollback.correlation_id,
                        error = %rollback,
                        "invariant breach: sender rollback failed, manual reconciliation required"
                    );
                }
                return Err(pipeline::step("update_saldo")(e));
            }

            let draft = Transfer {
                id: 0,
                transfer_from: from.clone(),
                transfer_to: to.clone(),
                transfer_amount: amount,
                transfer_time,
                status: LedgerStatus::Pending,
                created_at: transfer_time,
                updated_at: transfer_time,
                deleted_at: None,
            };
            let row = match transfers.create(draft).await {
                Ok(row) => row,
                Err(e) => {
                    // Undo both sides before surfacing.
                    if let Err(rollback) = saldos.update_balance(&to, pre_to, None).await {
                        let rollback = pipeline::step("rollback_saldo")(rollback);
                        tracing::error!(
                            card_number = %to,
                            correlation_id = %rollback.correlation_id,
                            error = %rollback,
                            "invariant breach: receiver rollback failed, manual reconciliation required"
                        );
                    }
                    if let Err(rollback) = saldos.update_balance(&from, pre_from, None).await {
                        let rollback = pipeline::step("rollback_saldo")(rollback);
                        tracing::error!(
                            card_number = %from,
                            correlation_id = %rollback.correlation_id,
                            error = %rollback,
                            "invariant breach: sender rollback failed, manual reconciliation required"
                        );
                    }
                    return Err(pipeline::step("create_transfer")(e));
                }
            };

            match transfers.update_status(row.id, LedgerStatus::Success).await {
                Ok(row) => Ok(row),
                Err(e) => {
                    if let Err(mark) = transfers.update_status(row.id, LedgerStatus::Failed).await {
                        tracing::error!(
                            transfer_id = row.id,
                            error = %mark,
                            "could not mark transfer as failed"
                        );
                    }
                    Err(pipeline::step("update_transfer_status")(e))
                }
            }
        })
        .await?;

        self.notify(&sender_card, NotificationKind::TransferCreate, &row).await;
        self.invalidate().await;
        Ok(row)
    }

    pub async fn update(&self, req: UpdateTransferRequest) -> Result<Transfer> {
        let args = format!("id={} amount={}", req.id, req.transfer_amount);
        observed(SERVICE, "update", args, self.update_inner(req)).await
    }

    /// Applies the amount delta to both balances: raising the transfer moves
    /// more from sender to receiver, lowering it moves money back.
    async fn update_inner(&self, req: UpdateTransferRequest) -> Result<Transfer> {
        Self::validate(&req.transfer_from, &req.transfer_to, req.transfer_amount)?;

        let guards = self
            .locks
            .acquire_pair(&req.transfer_from, &req.transfer_to)
            .await;

        let existing = self.transfers.find_by_id(req.id).await?;
        if existing.deleted_at.is_some() {
            return Err(ServiceError::not_found(Entity::Transfer));
        }
        if existing.transfer_from != req.transfer_from
            || existing.transfer_to != req.transfer_to
        {
            return Err(ServiceError::validation(
                "transfer endpoints cannot change on update",
            ));
        }

        let sender_card = pipeline::resolve_card(&self.cards, &req.transfer_from).await?;
        pipeline::resolve_card(&self.cards, &req.transfer_to).await?;
        let sender_saldo = pipeline::resolve_saldo(&self.saldos, &req.transfer_from).await?;
        let receiver_saldo = pipeline::resolve_saldo(&self.saldos, &req.transfer_to).await?;

        let delta = req.transfer_amount - existing.transfer_amount;
        if delta > 0 {
            pipeline::ensure_funds(&sender_saldo, delta, &req.transfer_from)?;
        }
        if delta < 0 && receiver_saldo.total_balance + delta < 0 {
            return Err(ServiceError::insufficient_balance(&req.transfer_to));
        }

        let saldos = Arc::clone(&self.saldos);
        let transfers = Arc::clone(&self.transfers);
        let from = req.transfer_from.clone();
        let to = req.transfer_to.clone();
        let amount = req.transfer_amount;
        let row = pipeline::detached(async move {
            let _guards = guards;
            let pre_from = sender_saldo.total_balance;
            let pre_to = receiver_saldo.total_balance;

            if delta != 0 {
                saldos
                    .update_balance(&from, pre_from - delta, None)
                    .await
                    .map_err(pipeline::step("update_saldo"))?;
                if let Err(e) = saldos.update_balance(&to, pre_to + delta, None).await {
                    if let Err(rollback) = saldos.update_balance(&from, pre_from, None).await {
                        let rollback = pipeline::step("rollback_saldo")(rollback);
                        tracing::error!(
                            card_number = %from,
                            correlation_id = %rollback.correlation_id,
                            error = %rollback,
                            "invariant breach: sender rollback failed, manual reconciliation required"
                        );
                    }
                    return Err(pipeline::step("update_saldo")(e));
                }
            }

            let mut updated = existing;
            updated.transfer_amount = amount;
            match transfers.update(updated).await {
                Ok(row) => Ok(row),
                Err(e) => {
                    if delta != 0 {
                        if let Err(rollback) = saldos.update_balance(&to, pre_to, None).await {
                            let rollback = pipeline::step("rollback_saldo")(rollback);
                            tracing::error!(
                                card_number = %to,
                                correlation_id = %rollback.correlation_id,
                                error = %rollback,
                                "invariant breach: receiver rollback failed, manual reconciliation required"
                            );
                        }
                        if let Err(rollback) = saldos.update_balance(&from, pre_from, None).await {
                            let rollback = pipeline::step("rollback_saldo")(rollback);
                            tracing::error!(
                                card_number = %from,
                                correlation_id = %rollback.correlation_id,
                                error = %rollback,
                                "invariant breach: sender rollback failed, manual reconciliation required"
                            );
                        }
                    }
                    Err(pipeline::step("update_transfer")(e))
                }
            }
        })
        .await?;

        self.notify(&sender_card, NotificationKind::TransferUpdate, &row).await;
        self.invalidate().await;
        Ok(row)
    }

    pub async fn trashed(&self, id: u64) -> Result<Transfer> {
        observed(SERVICE, "trashed", format!("id={id}"), async {
            let row = self
                .transfers
                .trash(id)
                .await
                .map_err(pipeline::step("trash"))?;
            self.invalidate().await;
            Ok(row)
        })
        .await
    }

    pub async fn restore(&self, id: u64) -> Result<Transfer> {
        observed(SERVICE, "restore", format!("id={id}"), async {
            let row = self
                .transfers
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
            self.transfers
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
                .transfers
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
                .transfers
                .delete_all_permanent()
                .await
                .map_err(pipeline::step("delete_permanent"))?;
            self.invalidate().await;
            Ok(removed)
        })
        .await
    }

    async fn notify(&self, sender_card: &Card, kind: NotificationKind, row: &Transfer) {
        let user = match self.users.find_by_id(sender_card.user_id).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(
                    user_id = sender_card.user_id,
                    error = %e,
                    "sender not resolvable, skipping notification"
                );
                return;
            }
        };
        let (subject, html_body) = match kind {
            NotificationKind::TransferUpdate => email::transfer_updated(
                &row.transfer_from,
                &row.transfer_to,
                row.transfer_amount,
            ),
            _ => email::transfer_created(
                &row.transfer_from,
                &row.transfer_to,
                row.transfer_amount,
            ),
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
                transfer_id = row.id,
                correlation_id = %e.correlation_id,
                reason = %e.reason(),
                error = %e,
                "notification enqueue failed after commit"
            );
        }
    }

    async fn invalidate(&self) {
        self.cache
            .invalidate_prefix(&domain_prefix("transfer"))
            .await;
        self.cache.invalidate_prefix(&domain_prefix("saldo")).await;
        self.cache.invalidate_prefix(&domain_prefix("card")).await;
    }
}
