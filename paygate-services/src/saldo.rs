use std::sync::Arc;

use paygate_cache::{ttl, Cache};
use paygate_common::error::{Result, ServiceError};
use paygate_common::fingerprint::{domain_prefix, fingerprint};
use paygate_common::model::Saldo;
use paygate_common::observe::observed;
use paygate_common::pagination::{Paged, Pagination};
use paygate_common::requests::{CreateSaldoRequest, StatsBucket, StatsGrain, UpdateSaldoRequest};
use paygate_common::validation;
use paygate_ledger::{CardRepository, NewSaldo, SaldoRepository};

use crate::pipeline;

const DOMAIN: &str = "saldo";

/// Balance projection lifecycle. A saldo can only be opened against an
/// existing, untrashed card; balance mutations beyond this service belong to
/// the monetary pipelines.
pub struct SaldoCommandService {
    cards: Arc<dyn CardRepository>,
    saldos: Arc<dyn SaldoRepository>,
    cache: Cache,
}

impl SaldoCommandService {
    pub fn new(
        cards: Arc<dyn CardRepository>,
        saldos: Arc<dyn SaldoRepository>,
        cache: Cache,
    ) -> Self {
        Self {
            cards,
            saldos,
            cache,
        }
    }

    pub async fn create(&self, req: CreateSaldoRequest) -> Result<Saldo> {
        let args = format!("card_number={}", req.card_number);
        observed("saldo_command_service", "create", args, async {
            validation::require("card_number", &req.card_number)?;
            validation::validate_card_number(&req.card_number)?;
            if req.total_balance < 0 {
                return Err(ServiceError::validation("total_balance may not be negative"));
            }
            pipeline::resolve_card(&self.cards, &req.card_number).await?;
            let saldo = self
                .saldos
                .create(NewSaldo {
                    card_number: req.card_number.clone(),
                    total_balance: req.total_balance,
                })
                .await
                .map_err(pipeline::step("create_saldo"))?;
            self.invalidate().await;
            Ok(saldo)
        })
        .await
    }

    pub async fn update(&self, req: UpdateSaldoRequest) -> Result<Saldo> {
        observed("saldo_command_service", "update", format!("id={}", req.id), async {
            validation::require("card_number", &req.card_number)?;
            validation::validate_card_number(&req.card_number)?;
            if req.total_balance < 0 {
                return Err(ServiceError::validation("total_balance may not be negative"));
            }
            let saldo = self
                .saldos
                .update(req.id, req.card_number.clone(), req.total_balance)
                .await
                .map_err(pipeline::step("update_saldo"))?;
            self.invalidate().await;
            Ok(saldo)
        })
        .await
    }

    pub async fn trashed(&self, id: u64) -> Result<Saldo> {
        observed("saldo_command_service", "trashed", format!("id={id}"), async {
            let saldo = self
                .saldos
                .trash(id)
                .await
                .map_err(pipeline::step("trash"))?;
            self.invalidate().await;
            Ok(saldo)
        })
        .await
    }

    pub async fn restore(&self, id: u64) -> Result<Saldo> {
        observed("saldo_command_service", "restore", format!("id={id}"), async {
            let saldo = self
                .saldos
                .restore(id)
                .await
                .map_err(pipeline::step("restore"))?;
            self.invalidate().await;
            Ok(saldo)
        })
        .await
    }

    pub async fn delete_permanent(&self, id: u64) -> Result<()> {
        observed("saldo_command_service", "delete_permanent", format!("id={id}"), async {
            self.saldos
                .delete_permanent(id)
                .await
                .map_err(pipeline::step("delete_permanent"))?;
            self.invalidate().await;
            Ok(())
        })
        .await
    }

    pub async fn restore_all(&self) -> Result<u64> {
        observed("saldo_command_service", "restore_all", String::new(), async {
            let restored = self
                .saldos
                .restore_all()
                .await
                .map_err(pipeline::step("restore"))?;
            self.invalidate().await;
            Ok(restored)
        })
        .await
    }

    pub async fn delete_all_permanent(&self) -> Result<u64> {
        observed("saldo_command_service", "delete_all_permanent", String::new(), async {
            let removed = self
                .saldos
                .delete_all_permanent()
                .await
                .map_err(pipeline::step("delete_permanent"))?;
            self.invalidate().await;
            Ok(removed)
        })
        .await
    }

    async fn invalidate(&self) {
        self.cache.invalidate_prefix(&domain_prefix(DOMAIN)).await;
        self.cache.invalidate_prefix(&domain_prefix("card")).await;
    }
}

pub struct SaldoQueryService {
    saldos: Arc<dyn SaldoRepository>,
    cache: Cache,
}

impl SaldoQueryService {
    pub fn new(saldos: Arc<dyn SaldoRepository>, cache: Cache) -> Self {
        Self { saldos, cache }
    }

    fn list_key(op: &str, filter: &Pagination) -> String {
        fingerprint(
            DOMAIN,
            op,
            &[
                ("page", filter.page.to_string()),
                ("page_size", filter.page_size.to_string()),
                ("search", filter.search.clone()),
            ],
        )
    }

    pub async fn find_all(&self, filter: Pagination) -> Result<Paged<Saldo>> {
        let args = format!("page={} page_size={}", filter.page, filter.page_size);
        observed("saldo_query_service", "find_all", args, async {
            let key = Self::list_key("find_all", &filter);
            if let Some(hit) = self.cache.get_json::<Paged<Saldo>>(&key).await {
                return Ok(hit);
            }
            let page = self.saldos.find_all(&filter).await?;
            self.cache.set_json(&key, &page, ttl::LIST).await;
            Ok(page)
        })
        .await
    }

    pub async fn find_by_id(&self, id: u64) -> Result<Saldo> {
        observed("saldo_query_service", "find_by_id", format!("id={id}"), async {
            let key = fingerprint(DOMAIN, "find_by_id", &[("id", id.to_string())]);
            if let Some(hit) = self.cache.get_json::<Saldo>(&key).await {
                return Ok(hit);
            }
            let saldo = self.saldos.find_by_id(id).await?;
            self.cache.set_json(&key, &saldo, ttl::ENTITY).await;
            Ok(saldo)
        })
        .await
    }

    pub async fn find_by_card_number(&self, card_number: String) -> Result<Saldo> {
        let args = format!("card_number={card_number}");
        observed("saldo_query_service", "find_by_card_number", args, async {
            let key = fingerprint(
                DOMAIN,
                "find_by_card_number",
                &[("card_number", card_number.clone())],
            );
            if let Some(hit) = self.cache.get_json::<Saldo>(&key).await {
                return Ok(hit);
            }
            let saldo = self.saldos.find_by_card_number(&card_number).await?;
            self.cache.set_json(&key, &saldo, ttl::ENTITY).await;
            Ok(saldo)
        })
        .await
    }

    pub async fn find_by_active(&self, filter: Pagination) -> Result<Paged<Saldo>> {
        let args = format!("page={} page_size={}", filter.page, filter.page_size);
        observed("saldo_query_service", "find_by_active", args, async {
            let key = Self::list_key("find_by_active", &filter);
            if let Some(hit) = self.cache.get_json::<Paged<Saldo>>(&key).await {
                return Ok(hit);
            }
            let page = self.saldos.find_active(&filter).await?;
            self.cache.set_json(&key, &page, ttl::LIST).await;
            Ok(page)
        })
        .await
    }

    pub async fn find_by_trashed(&self, filter: Pagination) -> Result<Paged<Saldo>> {
        let args = format!("page={} page_size={}", filter.page, filter.page_size);
        observed("saldo_query_service", "find_by_trashed", args, async {
            let key = Self::list_key("find_by_trashed", &filter);
            if let Some(hit) = self.cache.get_json::<Paged<Saldo>>(&key).await {
                return Ok(hit);
            }
            let page = self.saldos.find_trashed(&filter).await?;
            self.cache.set_json(&key, &page, ttl::LIST).await;
            Ok(page)
        })
        .await
    }
}

pub struct SaldoStatsService {
    saldos: Arc<dyn SaldoRepository>,
    cache: Cache,
}

impl SaldoStatsService {
    pub fn new(saldos: Arc<dyn SaldoRepository>, cache: Cache) -> Self {
        Self { saldos, cache }
    }

    pub async fn balance_series(
        &self,
        grain: StatsGrain,
        year: i32,
        card_number: Option<String>,
    ) -> Result<Vec<StatsBucket>> {
        let args = format!(
            "grain={grain:?} year={year} card={}",
            card_number.as_deref().unwrap_or("-")
        );
        observed("saldo_stats_service", "balance_series", args, async {
            let key = fingerprint(
                DOMAIN,
                "balance_series",
                &[
                    ("grain", format!("{grain:?}")),
                    ("year", year.to_string()),
                    ("card_number", card_number.clone().unwrap_or_default()),
                ],
            );
            if let Some(hit) = self.cache.get_json::<Vec<StatsBucket>>(&key).await {
                return Ok(hit);
            }
            let series = self
                .saldos
                .balance_series(grain, year, card_number.as_deref())
                .await
                .map_err(pipeline::step("stats"))?;
            self.cache.set_json(&key, &series, ttl::STATS).await;
            Ok(series)
        })
        .await
    }
}
