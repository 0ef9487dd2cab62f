use std::sync::Arc;

use paygate_cache::{ttl, Cache};
use paygate_common::error::Result;
use paygate_common::fingerprint::fingerprint;
use paygate_common::model::{Topup, Transaction, Transfer, Withdraw};
use paygate_common::observe::observed;
use paygate_common::requests::{
    CardStatsKind, CardStatsQuery, Dashboard, StatsBucket, StatsDimension, StatsQuery, StatsScope,
};
use paygate_ledger::{LedgerRepository, SaldoRepository};

use crate::pipeline;

const SERVICE: &str = "card_stats_service";
const DOMAIN: &str = "card";

/// Cross-entity statistics keyed by card: balance series plus the amount
/// series of every monetary entity, and the dashboard totals.
pub struct CardStatsService {
    saldos: Arc<dyn SaldoRepository>,
    withdraws: Arc<dyn LedgerRepository<Withdraw>>,
    topups: Arc<dyn LedgerRepository<Topup>>,
    transactions: Arc<dyn LedgerRepository<Transaction>>,
    transfers: Arc<dyn LedgerRepository<Transfer>>,
    cache: Cache,
}

impl CardStatsService {
    pub fn new(
        saldos: Arc<dyn SaldoRepository>,
        withdraws: Arc<dyn LedgerRepository<Withdraw>>,
        topups: Arc<dyn LedgerRepository<Topup>>,
        transactions: Arc<dyn LedgerRepository<Transaction>>,
        transfers: Arc<dyn LedgerRepository<Transfer>>,
        cache: Cache,
    ) -> Self {
        Self {
            saldos,
            withdraws,
            topups,
            transactions,
            transfers,
            cache,
        }
    }

    pub async fn get_stats(&self, query: CardStatsQuery) -> Result<Vec<StatsBucket>> {
        let args = format!(
            "kind={:?} grain={:?} year={} card={}",
            query.kind,
            query.grain,
            query.year,
            query.card_number.as_deref().unwrap_or("-")
        );
        observed(SERVICE, "get_stats", args, async {
            let key = fingerprint(
                DOMAIN,
                "stats",
                &[
                    ("kind", format!("{:?}", query.kind)),
                    ("grain", format!("{:?}", query.grain)),
                    ("year", query.year.to_string()),
                    ("card_number", query.card_number.clone().unwrap_or_default()),
                ],
            );
            if let Some(hit) = self.cache.get_json::<Vec<StatsBucket>>(&key).await {
                return Ok(hit);
            }

            let scope = match &query.card_number {
                Some(card) => StatsScope::ByCard(card.clone()),
                None => StatsScope::Global,
            };
            let amount_query = StatsQuery {
                dimension: StatsDimension::Amount,
                grain: query.grain,
                scope,
                year: query.year,
                month: None,
            };
            let series = match query.kind {
                CardStatsKind::Balance => {
                    self.saldos
                        .balance_series(query.grain, query.year, query.card_number.as_deref())
                        .await
                }
                CardStatsKind::Withdraw => self.withdraws.aggregate(&amount_query).await,
                CardStatsKind::Topup => self.topups.aggregate(&amount_query).await,
                CardStatsKind::Transaction => self.transactions.aggregate(&amount_query).await,
                CardStatsKind::Transfer => self.transfers.aggregate(&amount_query).await,
            }
            .map_err(pipeline::step("stats"))?;

            self.cache.set_json(&key, &series, ttl::STATS).await;
            Ok(series)
        })
        .await
    }

    pub async fn dashboard(&self, card_number: Option<String>) -> Result<Dashboard> {
        let args = format!("card={}", card_number.as_deref().unwrap_or("-"));
        observed(SERVICE, "dashboard", args, async {
            let key = fingerprint(
                DOMAIN,
                "dashboard",
                &[("card_number", card_number.clone().unwrap_or_default())],
            );
            if let Some(hit) = self.cache.get_json::<Dashboard>(&key).await {
                return Ok(hit);
            }

            let card = card_number.as_deref();
            let scope = match card {
                Some(c) => StatsScope::ByCard(c.to_string()),
                None => StatsScope::Global,
            };
            let (sent_scope, received_scope) = match card {
                Some(c) => (
                    StatsScope::BySender(c.to_string()),
                    StatsScope::ByReceiver(c.to_string()),
                ),
                None => (StatsScope::Global, StatsScope::Global),
            };

            let total_balance = self.saldos.total_balance(card).await;
            let total_topup = self.topups.total_amount(&scope).await;
            let total_withdraw = self.withdraws.total_amount(&scope).await;
            let total_transaction = self.transactions.total_amount(&scope).await;
            let total_transfer = self.transfers.total_amount(&scope).await;
            let total_transfer_sent = self.transfers.total_amount(&sent_scope).await;
            let total_transfer_received = self.transfers.total_amount(&received_scope).await;

            let dashboard = Dashboard {
                total_balance: total_balance.map_err(pipeline::step("dashboard"))?,
                total_topup: total_topup.map_err(pipeline::step("dashboard"))?,
                total_withdraw: total_withdraw.map_err(pipeline::step("dashboard"))?,
                total_transaction: total_transaction.map_err(pipeline::step("dashboard"))?,
                total_transfer: total_transfer.map_err(pipeline::step("dashboard"))?,
                total_transfer_sent: total_transfer_sent.map_err(pipeline::step("dashboard"))?,
                total_transfer_received: total_transfer_received
                    .map_err(pipeline::step("dashboard"))?,
            };

            self.cache.set_json(&key, &dashboard, ttl::STATS).await;
            Ok(dashboard)
        })
        .await
    }
}
