use std::sync::Arc;

use paygate_cache::{ttl, Cache};
use paygate_common::error::Result;
use paygate_common::fingerprint::fingerprint;
use paygate_common::observe::observed;
use paygate_common::requests::{StatsBucket, StatsQuery, StatsScope};
use paygate_ledger::{LedgerRepository, LedgerRow};

pub(crate) fn scope_fields(scope: &StatsScope) -> (&'static str, String) {
    match scope {
        StatsScope::Global => ("global", String::new()),
        StatsScope::ByCard(card) => ("by-card", card.clone()),
        StatsScope::BySender(card) => ("by-sender", card.clone()),
        StatsScope::ByReceiver(card) => ("by-receiver", card.clone()),
    }
}

/// One parametric stats service per monetary domain. Every historical
/// `(dimension x grain x scope)` endpoint resolves to `get_stats` with a
/// different query value; the route table stays flat at the gateway.
pub struct LedgerStatsService<T: LedgerRow> {
    service: &'static str,
    repo: Arc<dyn LedgerRepository<T>>,
    cache: Cache,
}

impl<T: LedgerRow> LedgerStatsService<T> {
    pub fn new(service: &'static str, repo: Arc<dyn LedgerRepository<T>>, cache: Cache) -> Self {
        Self {
            service,
            repo,
            cache,
        }
    }

    pub async fn get_stats(&self, query: StatsQuery) -> Result<Vec<StatsBucket>> {
        let (scope_kind, scope_card) = scope_fields(&query.scope);
        let args = format!(
            "dimension={:?} grain={:?} scope={scope_kind} year={}",
            query.dimension, query.grain, query.year
        );
        observed(self.service, "get_stats", args, async {
            let key = fingerprint(
                T::DOMAIN,
                "stats",
                &[
                    ("dimension", format!("{:?}", query.dimension)),
                    ("grain", format!("{:?}", query.grain)),
                    ("scope", scope_kind.to_string()),
                    ("scope_card", scope_card.clone()),
                    ("year", query.year.to_string()),
                    ("month", query.month.map(|m| m.to_string()).unwrap_or_default()),
                ],
            );
            if let Some(hit) = self.cache.get_json::<Vec<StatsBucket>>(&key).await {
                return Ok(hit);
            }
            let series = self.repo.aggregate(&query).await?;
            self.cache.set_json(&key, &series, ttl::STATS).await;
            Ok(series)
        })
        .await
    }
}
