use std::sync::Arc;

use paygate_cache::Cache;
use paygate_common::error::{Entity, Result, ServiceError};
use paygate_common::fingerprint::domain_prefix;
use paygate_common::model::{Card, LedgerStatus, Transaction};
use paygate_common::observe::observed;
use paygate_common::requests::{CreateTransactionRequest, UpdateTransactionRequest};
use paygate_common::validation;
use paygate_events::{email, EventBus, EventEnvelope, NotificationKind};
use paygate_ledger::{CardRepository, LedgerRepository, SaldoRepository, UserRepository};

use crate::locks::CardLockRegistry;
use crate::pipeline;

const SERVICE: &str = "transaction_command_service";

/// Merchant payment pipeline: a debit against the card balance toward an
/// opaque merchant id. The merchant itself is an external collaborator.
pub struct TransactionCommandService {
    cards: Arc<dyn CardRepository>,
    saldos: Arc<dyn SaldoRepository>,
    users: Arc<dyn UserRepository>,
    transactions: Arc<dyn LedgerRepository<Transaction>>,
    cache: Cache,
    events: EventBus,
    locks: Arc<CardLockRegistry>,
}

impl TransactionCommandService {
    pub fn new(
        cards: Arc<dyn CardRepository>,
        saldos: Arc<dyn SaldoRepository>,
        users: Arc<dyn UserRepository>,
        transactions: Arc<dyn LedgerRepository<Transaction>>,
        cache: Cache,
        events: EventBus,
        locks: Arc<CardLockRegistry>,
    ) -> Self {
        Self {
            cards,
            saldos,
            users,
            transactions,
            cache,
            events,
            locks,
        }
    }

    fn validate(req_card: &str, amount: i64, method: &str, merchant_id: u64) -> Result<()> {
        validation::require("card_number", req_card)?;
        validation::validate_card_number(req_card)?;
        validation::validate_amount("amount", amount)?;
        validation::validate_payment_method(method)?;
        if merchant_id == 0 {
            return Err(ServiceError::invalid_field("merchant_id is required"));
        }
        Ok(())
    }

    pub async fn create(&self, req: CreateTransactionRequest) -> Result<Transaction> {
        let args = format!(
            "card_number={} amount={} merchant_id={}",
            req.card_number, req.amount, req.merchant_id
        );
        observed(SERVICE, "create", args, self.create_inner(req)).await
    }

    async fn create_inner(&self, req: CreateTransactionRequest) -> Result<Transaction> {
        Self::validate(&req.card_number, req.amount, &req.payment_method, req.merchant_id)?;
        let transaction_time = validation::parse_wire_time(&req.transaction_time)?;
        validation::validate_not_future("transaction_time", transaction_time)?;

        let guard = self.locks.acquire(&req.card_number).await;

        let card = pipeline::resolve_card(&self.cards, &req.card_number).await?;
        let saldo = pipeline::resolve_saldo(&self.saldos, &req.card_number).await?;
        pipeline::ensure_funds(&saldo, req.amount, &req.card_number)?;

        let saldos = Arc::clone(&self.saldos);
        let transactions = Arc::clone(&self.transactions);
        let card_number = req.card_number.clone();
        let amount = req.amount;
        let payment_method = req.payment_method.clone();
        let merchant_id = req.merchant_id;
        let row = pipeline::detached(async move {
            let _guard = guard;
            let pre_debit = saldo.total_balance;

            saldos
                .update_balance(&card_number, pre_debit - amount, None)
                .await
                .map_err(pipeline::step("update_saldo"))?;

            let draft = Transaction {
                id: 0,
                card_number: card_number.clone(),
                amount,
                payment_method,
                merchant_id,
                transaction_time,
                status: LedgerStatus::Pending,
                created_at: transaction_time,
                updated_at: transaction_time,
                deleted_at: None,
            };
            let row = match transactions.create(draft).await {
                Ok(row) => row,
                Err(e) => {
                    if let Err(rollback) =
                        saldos.update_balance(&card_number, pre_debit, None).await
                    {
                        let rollback = pipeline::step("rollback_saldo")(rollback);
                        tracing::error!(
                            card_number = %card_number,
                            correlation_id = %rollback.correlation_id,
                            error = %rollback,
                            "invariant breach: balance rollback failed, manual reconciliation required"
                        );
                    }
                    return Err(pipeline::step("create_transaction")(e));
                }
            };

            match transactions.update_status(row.id, LedgerStatus::Success).await {
                Ok(row) => Ok(row),
                Err(e) => {
                    if let Err(mark) =
                        transactions.update_status(row.id, LedgerStatus::Failed).await
                    {
                        tracing::error!(
                            transaction_id = row.id,
                            error = %mark,
                            "could not mark transaction as failed"
                        );
                    }
                    Err(pipeline::step("update_transaction_status")(e))
                }
            }
        })
        .await?;

        self.notify(&card, NotificationKind::TransactionCreate, &row).await;
        self.invalidate().await;
        Ok(row)
    }

    pub async fn update(&self, req: UpdateTransactionRequest) -> Result<Transaction> {
        let args = format!("id={} amount={}", req.id, req.amount);
        observed(SERVICE, "update", args, self.update_inner(req)).await
    }

    async fn update_inner(&self, req: UpdateTransactionRequest) -> Result<Transaction> {
        Self::validate(&req.card_number, req.amount, &req.payment_method, req.merchant_id)?;
        let transaction_time = validation::parse_wire_time(&req.transaction_time)?;
        validation::validate_not_future("transaction_time", transaction_time)?;

        let guard = self.locks.acquire(&req.card_number).await;

        let existing = self.transactions.find_by_id(req.id).await?;
        if existing.deleted_at.is_some() {
            return Err(ServiceError::not_found(Entity::Transaction));
        }
        if existing.card_number != req.card_number {
            return Err(ServiceError::validation(
                "card_number cannot change on update",
            ));
        }

        let card = pipeline::resolve_card(&self.cards, &req.card_number).await?;
        let saldo = pipeline::resolve_saldo(&self.saldos, &req.card_number).await?;
        let delta = req.amount - existing.amount;
        if delta > 0 {
            pipeline::ensure_funds(&saldo, delta, &req.card_number)?;
        }

        let saldos = Arc::clone(&self.saldos);
        let transactions = Arc::clone(&self.transactions);
        let card_number = req.card_number.clone();
        let amount = req.amount;
        let payment_method = req.payment_method.clone();
        let merchant_id = req.merchant_id;
        let row = pipeline::detached(async move {
            let _guard = guard;
            let pre_update = saldo.total_balance;

            if delta != 0 {
                saldos
                    .update_balance(&card_number, pre_update - delta, None)
                    .await
                    .map_err(pipeline::step("update_saldo"))?;
            }

            let mut updated = existing;
            updated.amount = amount;
            updated.payment_method = payment_method;
            updated.merchant_id = merchant_id;
            updated.transaction_time = transaction_time;
            match transactions.update(updated).await {
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
                    Err(pipeline::step("update_transaction")(e))
                }
            }
        })
        .await?;

        self.notify(&card, NotificationKind::TransactionUpdate, &row).await;
        self.invalidate().await;
        Ok(row)
    }

    pub async fn trashed(&self, id: u64) -> Result<Transaction> {
        observed(SERVICE, "trashed", format!("id={id}"), async {
            let row = self
                .transactions
                .trash(id)
                .await
                .map_err(pipeline::step("trash"))?;
            self.invalidate().await;
            Ok(row)
        })
        .await
    }

    pub async fn restore(&self, id: u64) -> Result<Transaction> {
        observed(SERVICE, "restore", format!("id={id}"), async {
            let row = self
                .transactions
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
            self.transactions
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
                .transactions
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
                .transactions
                .delete_all_permanent()
                .await
                .map_err(pipeline::step("delete_permanent"))?;
            self.invalidate().await;
            Ok(removed)
        })
        .await
    }

    async fn notify(&self, card: &Card, kind: NotificationKind, row: &Transaction) {
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
            NotificationKind::TransactionUpdate => {
                email::transaction_updated(&row.card_number, row.amount)
            }
            _ => email::transaction_created(&row.card_number, row.amount, row.merchant_id),
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
                transaction_id = row.id,
                correlation_id = %e.correlation_id,
                reason = %e.reason(),
                error = %e,
                "notification enqueue failed after commit"
            );
        }
    }

    async fn invalidate(&self) {
        self.cache
            .invalidate_prefix(&domain_prefix("transaction"))
            .await;
        self.cache.invalidate_prefix(&domain_prefix("saldo")).await;
        self.cache.invalidate_prefix(&domain_prefix("card")).await;
    }
}
