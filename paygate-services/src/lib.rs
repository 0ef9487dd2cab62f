pub mod auth;
pub mod card;
pub mod locks;
mod pipeline;
pub mod query;
pub mod saldo;
pub mod stats;
pub mod topup;
pub mod transaction;
pub mod transfer;
pub mod withdraw;

use std::sync::Arc;

use paygate_cache::Cache;
use paygate_common::model::{Topup, Transaction, Transfer, Withdraw};
use paygate_events::EventBus;
use paygate_ledger::Repositories;

pub use auth::{AuthService, TokenClaims, TokenSigner};
pub use card::{CardCommandService, CardQueryService, CardStatsService};
pub use locks::CardLockRegistry;
pub use query::LedgerQueryService;
pub use saldo::{SaldoCommandService, SaldoQueryService, SaldoStatsService};
pub use stats::LedgerStatsService;
pub use topup::TopupCommandService;
pub use transaction::TransactionCommandService;
pub use transfer::TransferCommandService;
pub use withdraw::WithdrawCommandService;

/// Every domain service of one process, wired over shared repositories,
/// cache, event bus and the per-card lock registry.
pub struct Services {
    pub auth: Arc<AuthService>,

    pub card_command: Arc<CardCommandService>,
    pub card_query: Arc<CardQueryService>,
    pub card_stats: Arc<CardStatsService>,

    pub saldo_command: Arc<SaldoCommandService>,
    pub saldo_query: Arc<SaldoQueryService>,
    pub saldo_stats: Arc<SaldoStatsService>,

    pub withdraw_command: Arc<WithdrawCommandService>,
    pub withdraw_query: Arc<LedgerQueryService<Withdraw>>,
    pub withdraw_stats: Arc<LedgerStatsService<Withdraw>>,

    pub topup_command: Arc<TopupCommandService>,
    pub topup_query: Arc<LedgerQueryService<Topup>>,
    pub topup_stats: Arc<LedgerStatsService<Topup>>,

    pub transaction_command: Arc<TransactionCommandService>,
    pub transaction_query: Arc<LedgerQueryService<Transaction>>,
    pub transaction_stats: Arc<LedgerStatsService<Transaction>>,

    pub transfer_command: Arc<TransferCommandService>,
    pub transfer_query: Arc<LedgerQueryService<Transfer>>,
    pub transfer_stats: Arc<LedgerStatsService<Transfer>>,
}

impl Services {
    pub fn build(
        repos: Repositories,
        cache: Cache,
        events: EventBus,
        signer: TokenSigner,
    ) -> Self {
        let locks = Arc::new(CardLockRegistry::new());

        Self {
            auth: Arc::new(AuthService::new(repos.users.clone(), signer)),

            card_command: Arc::new(CardCommandService::new(repos.cards.clone(), cache.clone())),
            card_query: Arc::new(CardQueryService::new(repos.cards.clone(), cache.clone())),
            card_stats: Arc::new(CardStatsService::new(
                repos.saldos.clone(),
                repos.withdraws.clone(),
                repos.topups.clone(),
                repos.transactions.clone(),
                repos.transfers.clone(),
                cache.clone(),
            )),

            saldo_command: Arc::new(SaldoCommandService::new(
                repos.cards.clone(),
                repos.saldos.clone(),
                cache.clone(),
            )),
            saldo_query: Arc::new(SaldoQueryService::new(repos.saldos.clone(), cache.clone())),
            saldo_stats: Arc::new(SaldoStatsService::new(repos.saldos.clone(), cache.clone())),

            withdraw_command: Arc::new(WithdrawCommandService::new(
                repos.cards.clone(),
                repos.saldos.clone(),
                repos.users.clone(),
                repos.withdraws.clone(),
                cache.clone(),
                events.clone(),
                locks.clone(),
            )),
            withdraw_query: Arc::new(LedgerQueryService::new(
                "withdraw_query_service",
                repos.withdraws.clone(),
                cache.clone(),
            )),
            withdraw_stats: Arc::new(LedgerStatsService::new(
                "withdraw_stats_service",
                repos.withdraws.clone(),
                cache.clone(),
            )),

            topup_command: Arc::new(TopupCommandService::new(
                repos.cards.clone(),
                repos.saldos.clone(),
                repos.users.clone(),
                repos.topups.clone(),
                cache.clone(),
                events.clone(),
                locks.clone(),
            )),
            topup_query: Arc::new(LedgerQueryService::new(
                "topup_query_service",
                repos.topups.clone(),
                cache.clone(),
            )),
            topup_stats: Arc::new(LedgerStatsService::new(
                "topup_stats_service",
                repos.topups.clone(),
                cache.clone(),
            )),

            transaction_command: Arc::new(TransactionCommandService::new(
                repos.cards.clone(),
                repos.saldos.clone(),
                repos.users.clone(),
                repos.transactions.clone(),
                cache.clone(),
                events.clone(),
                locks.clone(),
            )),
            transaction_query: Arc::new(LedgerQueryService::new(
                "transaction_query_service",
                repos.transactions.clone(),
                cache.clone(),
            )),
            transaction_stats: Arc::new(LedgerStatsService::new(
                "transaction_stats_service",
                repos.transactions.clone(),
                cache.clone(),
            )),

            transfer_command: Arc::new(TransferCommandService::new(
                repos.cards.clone(),
                repos.saldos.clone(),
                repos.users.clone(),
                repos.transfers.clone(),
                cache.clone(),
                events.clone(),
                locks.clone(),
            )),
            transfer_query: Arc::new(LedgerQueryService::new(
                "transfer_query_service",
                repos.transfers.clone(),
                cache.clone(),
            )),
            transfer_stats: Arc::new(LedgerStatsService::new(
                "transfer_stats_service",
                repos.transfers,
                cache,
            )),
        }
    }
}
