use std::sync::Arc;

use paygate_cache::{ttl, Cache};
use paygate_common::error::Result;
use paygate_common::fingerprint::fingerprint;
use paygate_common::model::Card;
use paygate_common::observe::observed;
use paygate_common::pagination::{Paged, Pagination};
use paygate_ledger::CardRepository;

const SERVICE: &str = "card_query_service";
const DOMAIN: &str = "card";

pub struct CardQueryService {
    cards: Arc<dyn CardRepository>,
    cache: Cache,
}

impl CardQueryService {
    pub fn new(cards: Arc<dyn CardRepository>, cache: Cache) -> Self {
        Self { cards, cache }
    }

    fn list_key(op: &str, filter: &Pagination, extra: Option<(&'static str, String)>) -> String {
        let mut fields = vec![
            ("page", filter.page.to_string()),
            ("page_size", filter.page_size.to_string()),
            ("search", filter.search.clone()),
        ];
        if let Some(field) = extra {
            fields.push(field);
        }
        fingerprint(DOMAIN, op, &fields)
    }

    pub async fn find_all(&self, filter: Pagination) -> Result<Paged<Card>> {
        let args = format!("page={} page_size={}", filter.page, filter.page_size);
        observed(SERVICE, "find_all", args, async {
            let key = Self::list_key("find_all", &filter, None);
            if let Some(hit) = self.cache.get_json::<Paged<Card>>(&key).await {
                return Ok(hit);
            }
            let page = self.cards.find_all(&filter).await?;
            self.cache.set_json(&key, &page, ttl::LIST).await;
            Ok(page)
        })
        .await
    }

    pub async fn find_by_id(&self, id: u64) -> Result<Card> {
        observed(SERVICE, "find_by_id", format!("id={id}"), async {
            let key = fingerprint(DOMAIN, "find_by_id", &[("id", id.to_string())]);
            if let Some(hit) = self.cache.get_json::<Card>(&key).await {
                return Ok(hit);
            }
            let card = self.cards.find_by_id(id).await?;
            self.cache.set_json(&key, &card, ttl::ENTITY).await;
            Ok(card)
        })
        .await
    }

    pub async fn find_by_card_number(&self, card_number: String) -> Result<Card> {
        let args = format!("card_number={card_number}");
        observed(SERVICE, "find_by_card_number", args, async {
            let key = fingerprint(
                DOMAIN,
                "find_by_card_number",
                &[("card_number", card_number.clone())],
            );
            if let Some(hit) = self.cache.get_json::<Card>(&key).await {
                return Ok(hit);
            }
            let card = self.cards.find_by_card_number(&card_number).await?;
            self.cache.set_json(&key, &card, ttl::ENTITY).await;
            Ok(card)
        })
        .await
    }

    pub async fn find_by_user(&self, user_id: u64, filter: Pagination) -> Result<Paged<Card>> {
        let args = format!("user_id={user_id} page={}", filter.page);
        observed(SERVICE, "find_by_user", args, async {
            let key = Self::list_key("find_by_user", &filter, Some(("user_id", user_id.to_string())));
            if let Some(hit) = self.cache.get_json::<Paged<Card>>(&key).await {
                return Ok(hit);
            }
            let page = self.cards.find_by_user(user_id, &filter).await?;
            self.cache.set_json(&key, &page, ttl::LIST).await;
            Ok(page)
        })
        .await
    }

    pub async fn find_by_active(&self, filter: Pagination) -> Result<Paged<Card>> {
        let args = format!("page={} page_size={}", filter.page, filter.page_size);
        observed(SERVICE, "find_by_active", args, async {
            let key = Self::list_key("find_by_active", &filter, None);
            if let Some(hit) = self.cache.get_json::<Paged<Card>>(&key).await {
                return Ok(hit);
            }
            let page = self.cards.find_active(&filter).await?;
            self.cache.set_json(&key, &page, ttl::LIST).await;
            Ok(page)
        })
        .await
    }

    pub async fn find_by_trashed(&self, filter: Pagination) -> Result<Paged<Card>> {
        let args = format!("page={} page_size={}", filter.page, filter.page_size);
        observed(SERVICE, "find_by_trashed", args, async {
            let key = Self::list_key("find_by_trashed", &filter, None);
            if let Some(hit) = self.cache.get_json::<Paged<Card>>(&key).await {
                return Ok(hit);
            }
            let page = self.cards.find_trashed(&filter).await?;
            self.cache.set_json(&key, &page, ttl::LIST).await;
            Ok(page)
        })
        .await
    }
}
