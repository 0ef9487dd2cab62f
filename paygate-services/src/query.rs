use std::sync::Arc;

use paygate_cache::{ttl, Cache};
use paygate_common::error::Result;
use paygate_common::fingerprint::fingerprint;
use paygate_common::observe::observed;
use paygate_common::pagination::{Paged, Pagination};
use paygate_ledger::{LedgerRepository, LedgerRow};

/// Read side shared by the four monetary entities: paginated lists, by-id,
/// active and trashed partitions, all read-through cached under the
/// domain's fingerprint prefix.
pub struct LedgerQueryService<T: LedgerRow> {
    service: &'static str,
    repo: Arc<dyn LedgerRepository<T>>,
    cache: Cache,
}

impl<T: LedgerRow> LedgerQueryService<T> {
    pub fn new(service: &'static str, repo: Arc<dyn LedgerRepository<T>>, cache: Cache) -> Self {
        Self {
            service,
            repo,
            cache,
        }
    }

    fn list_key(op: &str, filter: &Pagination, card_number: Option<&str>) -> String {
        let mut fields = vec![
            ("page", filter.page.to_string()),
            ("page_size", filter.page_size.to_string()),
            ("search", filter.search.clone()),
        ];
        if let Some(card) = card_number {
            fields.push(("card_number", card.to_string()));
        }
        fingerprint(T::DOMAIN, op, &fields)
    }

    pub async fn find_all(&self, filter: Pagination) -> Result<Paged<T>> {
        let args = format!("page={} page_size={}", filter.page, filter.page_size);
        observed(self.service, "find_all", args, async {
            let key = Self::list_key("find_all", &filter, None);
            if let Some(hit) = self.cache.get_json::<Paged<T>>(&key).await {
                return Ok(hit);
            }
            let page = self.repo.find_all(&filter).await?;
            self.cache.set_json(&key, &page, ttl::LIST).await;
            Ok(page)
        })
        .await
    }

    pub async fn find_all_by_card_number(
        &self,
        card_number: String,
        filter: Pagination,
    ) -> Result<Paged<T>> {
        let args = format!("card_number={card_number} page={}", filter.page);
        observed(self.service, "find_all_by_card_number", args, async {
            let key = Self::list_key("find_all_by_card_number", &filter, Some(&card_number));
            if let Some(hit) = self.cache.get_json::<Paged<T>>(&key).await {
                return Ok(hit);
            }
            let page = self.repo.find_by_card(&card_number, &filter).await?;
            self.cache.set_json(&key, &page, ttl::LIST).await;
            Ok(page)
        })
        .await
    }

    pub async fn find_by_id(&self, id: u64) -> Result<T> {
        observed(self.service, "find_by_id", format!("id={id}"), async {
            let key = fingerprint(T::DOMAIN, "find_by_id", &[("id", id.to_string())]);
            if let Some(hit) = self.cache.get_json::<T>(&key).await {
                return Ok(hit);
            }
            let row = self.repo.find_by_id(id).await?;
            self.cache.set_json(&key, &row, ttl::ENTITY).await;
            Ok(row)
        })
        .await
    }

    pub async fn find_by_active(&self, filter: Pagination) -> Result<Paged<T>> {
        let args = format!("page={} page_size={}", filter.page, filter.page_size);
        observed(self.service, "find_by_active", args, async {
            let key = Self::list_key("find_by_active", &filter, None);
            if let Some(hit) = self.cache.get_json::<Paged<T>>(&key).await {
                return Ok(hit);
            }
            let page = self.repo.find_active(&filter).await?;
            self.cache.set_json(&key, &page, ttl::LIST).await;
            Ok(page)
        })
        .await
    }

    pub async fn find_by_trashed(&self, filter: Pagination) -> Result<Paged<T>> {
        let args = format!("page={} page_size={}", filter.page, filter.page_size);
        observed(self.service, "find_by_trashed", args, async {
            let key = Self::list_key("find_by_trashed", &filter, None);
            if let Some(hit) = self.cache.get_json::<Paged<T>>(&key).await {
                return Ok(hit);
            }
            let page = self.repo.find_trashed(&filter).await?;
            self.cache.set_json(&key, &page, ttl::LIST).await;
            Ok(page)
        })
        .await
    }
}
