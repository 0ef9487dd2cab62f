use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

use paygate_cache::Cache;
use paygate_common::error::{Result, ServiceError};
use paygate_common::fingerprint::domain_prefix;
use paygate_common::model::Card;
use paygate_common::observe::observed;
use paygate_common::requests::{CreateCardRequest, UpdateCardRequest};
use paygate_common::validation;
use paygate_ledger::{CardChanges, CardRepository, NewCard};

use crate::pipeline;

const SERVICE: &str = "card_command_service";

const CARD_TYPES: &[&str] = &["debit", "credit"];
const CARD_PROVIDERS: &[&str] = &["visa", "mastercard", "amex", "jcb"];

/// Number of times a freshly generated card number is retried when it
/// collides with an existing one.
const GENERATE_ATTEMPTS: usize = 5;

pub struct CardCommandService {
    cards: Arc<dyn CardRepository>,
    cache: Cache,
}

impl CardCommandService {
    pub fn new(cards: Arc<dyn CardRepository>, cache: Cache) -> Self {
        Self { cards, cache }
    }

    fn validate_fields(
        card_type: &str,
        card_provider: &str,
        expire_date: &str,
        cvv: &str,
    ) -> Result<chrono::NaiveDate> {
        if !CARD_TYPES.contains(&card_type) {
            return Err(ServiceError::validation(format!(
                "card_type must be one of {CARD_TYPES:?}"
            )));
        }
        if !CARD_PROVIDERS.contains(&card_provider) {
            return Err(ServiceError::validation(format!(
                "card_provider must be one of {CARD_PROVIDERS:?}"
            )));
        }
        if cvv.len() != 3 || !cvv.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ServiceError::validation("cvv must be 3 digits"));
        }
        let expire = validation::parse_wire_date(expire_date)?;
        if expire <= Utc::now().date_naive() {
            return Err(ServiceError::validation("expire_date must be in the future"));
        }
        Ok(expire)
    }

    fn generate_card_number() -> String {
        let mut rng = rand::thread_rng();
        let mut number = String::with_capacity(16);
        number.push('4');
        for _ in 0..15 {
            number.push(char::from(b'0' + rng.gen_range(0..10u8)));
        }
        number
    }

    pub async fn create(&self, req: CreateCardRequest) -> Result<Card> {
        let args = format!("user_id={} card_type={}", req.user_id, req.card_type);
        observed(SERVICE, "create", args, async {
            if req.user_id == 0 {
                return Err(ServiceError::invalid_field("user_id is required"));
            }
            let expire_date =
                Self::validate_fields(&req.card_type, &req.card_provider, &req.expire_date, &req.cvv)?;

            let mut last_err = None;
            for _ in 0..GENERATE_ATTEMPTS {
                let new = NewCard {
                    user_id: req.user_id,
                    card_number: Self::generate_card_number(),
                    card_type: req.card_type.clone(),
                    card_provider: req.card_provider.clone(),
                    expire_date,
                    cvv: req.cvv.clone(),
                };
                match self.cards.create(new).await {
                    Ok(card) => {
                        self.invalidate().await;
                        return Ok(card);
                    }
                    Err(e) if e.reason() == "UniqueViolation" => last_err = Some(e),
                    Err(e) => return Err(pipeline::step("create_card")(e)),
                }
            }
            Err(pipeline::step("create_card")(last_err.unwrap_or_else(
                || ServiceError::internal("create_card", "card number space exhausted"),
            )))
        })
        .await
    }

    pub async fn update(&self, req: UpdateCardRequest) -> Result<Card> {
        observed(SERVICE, "update", format!("id={}", req.id), async {
            let expire_date =
                Self::validate_fields(&req.card_type, &req.card_provider, &req.expire_date, &req.cvv)?;
            let card = self
                .cards
                .update(
                    req.id,
                    CardChanges {
                        card_type: req.card_type.clone(),
                        card_provider: req.card_provider.clone(),
                        expire_date,
                        cvv: req.cvv.clone(),
                    },
                )
                .await
                .map_err(pipeline::step("update_card"))?;
            self.invalidate().await;
            Ok(card)
        })
        .await
    }

    pub async fn trashed(&self, id: u64) -> Result<Card> {
        observed(SERVICE, "trashed", format!("id={id}"), async {
            let card = self.cards.trash(id).await.map_err(pipeline::step("trash"))?;
            self.invalidate().await;
            Ok(card)
        })
        .await
    }

    pub async fn restore(&self, id: u64) -> Result<Card> {
        observed(SERVICE, "restore", format!("id={id}"), async {
            let card = self
                .cards
                .restore(id)
                .await
                .map_err(pipeline::step("restore"))?;
            self.invalidate().await;
            Ok(card)
        })
        .await
    }

    pub async fn delete_permanent(&self, id: u64) -> Result<()> {
        observed(SERVICE, "delete_permanent", format!("id={id}"), async {
            self.cards
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
                .cards
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
                .cards
                .delete_all_permanent()
                .await
                .map_err(pipeline::step("delete_permanent"))?;
            self.invalidate().await;
            Ok(removed)
        })
        .await
    }

    async fn invalidate(&self) {
        self.cache.invalidate_prefix(&domain_prefix("card")).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_numbers_are_sixteen_digits() {
        for _ in 0..32 {
            let number = CardCommandService::generate_card_number();
            assert_eq!(number.len(), 16);
            assert!(number.bytes().all(|b| b.is_ascii_digit()));
            assert!(number.starts_with('4'));
        }
    }

    #[test]
    fn test_field_validation() {
        assert!(CardCommandService::validate_fields("debit", "visa", "2031-01-01", "123").is_ok());
        assert!(CardCommandService::validate_fields("loyalty", "visa", "2031-01-01", "123").is_err());
        assert!(CardCommandService::validate_fields("debit", "acme", "2031-01-01", "123").is_err());
        assert!(CardCommandService::validate_fields("debit", "visa", "2000-01-01", "123").is_err());
        assert!(CardCommandService::validate_fields("debit", "visa", "2031-01-01", "12").is_err());
    }
}
