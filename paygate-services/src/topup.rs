use std::sync::Arc;

use paygate_cache::Cache;
use paygate_common::error::{Entity, Result, ServiceError};
use paygate_common::fingerprint::domain_prefix;
use paygate_common::model::{Card, LedgerStatus, Topup};
use paygate_common::observe::observed;
use paygate_common::requests::{CreateTopupRequest, UpdateTopupRequest};
use paygate_common::validation;
use paygate_events::{email, EventBus, EventEnvelope, NotificationKind};
use paygate_ledger::{CardRepository, LedgerRepository, SaldoRepository, UserRepository};

use crate::locks::CardLockRegistry;
use crate::pipeline;

const SERVICE: &str = "topup_command_service";

/// Credit-side pipeline. Symmetric to the withdraw machine with the debit
/// inverted: the balance grows before the ledger row is appended, and the
/// compensation shrinks it back.
pub struct TopupCommandService {
    cards: Arc<dyn CardRepository>,
    saldos: Arc<dyn SaldoRepository>,
    users: Arc<dyn UserRepository>,
    topups: Arc<dyn LedgerRepository<Topup>>,
    cache: Cache,
    events: EventBus,
    locks: Arc<CardLockRegistry>,
}

impl TopupCommandService {
    pub fn new(
        cards: Arc<dyn CardRepository>,
        saldos: Arc<dyn SaldoRepository>,
        users: Arc<dyn UserRepository>,
        topups: Arc<dyn LedgerRepository<Topup>>,
        cache: Cache,
        events: EventBus,
        locks: Arc<CardLockRegistry>,
    ) -> Self {
        Self {
            cards,
            saldos,
            users,
            topups,
            cache,
            events,
            locks,
        }
    }

    pub async fn create(&self, req: CreateTopupRequest) -> Result<Topup> {
        let args = format!("card_number={} amount={}", req.card_number, req.topup_amount);
        observed(SERVICE, "create", args, self.create_inner(req)).await
    }

    async fn create_inner(&self, req: CreateTopupRequest) -> Result<Topup> {
        validation::require("card_number", &req.card_number)?;
        validation::validate_card_number(&req.card_number)?;
        validation::validate_amount("topup_amount", req.topup_amount)?;
        validation::validate_payment_method(&req.topup_method)?;
        let topup_time = chrono::Utc::now();

        let guard = self.locks.acquire(&req.card_number).await;

        let card = pipeline::resolve_card(&self.cards, &req.card_number).await?;
        let saldo = pipeline::resolve_saldo(&self.saldos, &req.card_number).await?;

        let saldos = Arc::clone(&self.saldos);
        let topups = Arc::clone(&self.topups);
        let card_number = req.card_number.clone();
        let amount = req.topup_amount;
        let method = req.topup_method.clone();
        let row = pipeline::detached(async move {
            let _guard = guard;
            let pre_credit = saldo.total_balance;

            saldos
                .update_balance(&card_number, pre_credit + amount, None)
                .await
                .map_err(pipeline::step("update_saldo"))?;

            let draft = Topup {
                id: 0,
                card_number: card_number.clone(),
                topup_no: uuid::Uuid::new_v4().to_string(),
                topup_amount: amount,
                topup_method: method,
                topup_time,
                status: LedgerStatus::Pending,
                created_at: topup_time,
                updated_at: topup_time,
                deleted_at: None,
            };
            let row = match topups.create(draft).await {
                Ok(row) => row,
                Err(e) => {
                    if let Err(rollback) =
                        saldos.update_balance(&card_number, pre_credit, None).await
                    {
                        let rollback = pipeline::step("rollback_saldo")(rollback);
                        tracing::error!(
                            card_number = %card_number,
                            correlation_id = %rollback.correlation_id,
                            error = %rollback,
                            "invariant breach: balance rollback failed, manual reconciliation required"
                        );
                    }
                    return Err(pipeline::step("create_topup")(e));
                }
            };

            match topups.update_status(row.id, LedgerStatus::Success).await {
                Ok(row) => Ok(row),
                Err(e) => {
                    if let Err(mark) = topups.update_status(row.id, LedgerStatus::Failed).await {
                        tracing::error!(topup_id = row.id, error = %mark, "could not mark topup as failed");
                    }
                    Err(pipeline::step("update_topup_status")(e))
                }
            }
        })
        .await?;

        self.notify(&card, NotificationKind::TopupCreate, &row).await;
        self.invalidate().await;
        Ok(row)
    }

    pub async fn update(&self, req: UpdateTopupRequest) -> Result<Topup> {
        let args = format!("id={} amount={}", req.id, req.topup_amount);
        observed(SERVICE, "update", args, self.update_inner(req)).await
    }

    async fn update_inner(&self, req: UpdateTopupRequest) -> Result<Topup> {
        validation::require("card_number", &req.card_number)?;
        validation::validate_card_number(&req.card_number)?;
        validation::validate_amount("topup_amount", req.topup_amount)?;
        validation::validate_payment_method(&req.topup_method)?;

        let guard = self.locks.acquire(&req.card_number).await;

        let existing = self.topups.find_by_id(req.id).await?;
        if existing.deleted_at.is_some() {
            return Err(ServiceError::not_found(Entity::Topup));
        }
        if existing.card_number != req.card_number {
            return Err(ServiceError::validation(
                "card_number cannot change on update",
            ));
        }

        let card = pipeline::resolve_card(&self.cards, &req.card_number).await?;
        let saldo = pipeline::resolve_saldo(&self.saldos, &req.card_number).await?;
        // Shrinking the top-up claws the difference back off the balance.
        let delta = req.topup_amount - existing.topup_amount;
        if delta < 0 && saldo.total_balance + delta < 0 {
            return Err(ServiceError::insufficient_balance(&req.card_number));
        }

        let saldos = Arc::clone(&self.saldos);
        let topups = Arc::clone(&self.topups);
        let card_number = req.card_number.clone();
        let amount = req.topup_amount;
        let method = req.topup_method.clone();
        let row = pipeline::detached(async move {
            let _guard = guard;
            let pre_update = saldo.total_balance;

            if delta != 0 {
                saldos
                    .update_balance(&card_number, pre_update + delta, None)
                    .await
                    .map_err(pipeline::step("update_saldo"))?;
            }

            let mut updated = existing;
            updated.topup_amount = amount;
            updated.topup_method = method;
            match topups.update(updated).await {
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
                    Err(pipeline::step("update_topup")(e))
                }
            }
        })
        .await?;

        self.notify(&card, NotificationKind::TopupUpdate, &row).await;
        self.invalidate().await;
        Ok(row)
    }

    pub async fn trashed(&self, id: u64) -> Result<Topup> {
        observed(SERVICE, "trashed", format!("id={id}"), async {
            let row = self.topups.trash(id).await.map_err(pipeline::step("trash"))?;
            self.invalidate().await;
            Ok(row)
        })
        .await
    }

    pub async fn restore(&self, id: u64) -> Result<Topup> {
        observed(SERVICE, "restore", format!("id={id}"), async {
            let row = self
                .topups
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
            self.topups
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
                .topups
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
                .topups
                .delete_all_permanent()
                .await
                .map_err(pipeline::step("delete_permanent"))?;
            self.invalidate().await;
            Ok(removed)
        })
        .await
    }

    async fn notify(&self, card: &Card, kind: NotificationKind, row: &Topup) {
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
            NotificationKind::TopupUpdate => email::topup_updated(&row.card_number, row.topup_amount),
            _ => email::topup_created(&row.card_number, row.topup_amount, &row.topup_method),
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
                topup_id = row.id,
                correlation_id = %e.correlation_id,
                reason = %e.reason(),
                error = %e,
                "notification enqueue failed after commit"
            );
        }
    }

    async fn invalidate(&self) {
        self.cache.invalidate_prefix(&domain_prefix("topup")).await;
        self.cache.invalidate_prefix(&domain_prefix("saldo")).await;
        self.cache.invalidate_prefix(&domain_prefix("card")).await;
    }
}
