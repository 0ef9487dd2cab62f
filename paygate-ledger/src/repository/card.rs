use async_trait::async_trait;
use chrono::Utc;

use paygate_common::error::{Entity, Result, ServiceError};
use paygate_common::model::Card;
use paygate_common::pagination::{Paged, Pagination};

use crate::store::{Store, CARDS, CARD_NUMBERS};

use super::{CardChanges, CardRepository, NewCard};

pub struct RedbCardRepository {
    store: Store,
}

impl RedbCardRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn load(&self, id: u64) -> Result<Card> {
        self.store
            .get::<Card>(CARDS, id)?
            .ok_or_else(|| ServiceError::not_found(Entity::Card))
    }

    fn page(rows: Vec<Card>, filter: &Pagination) -> Paged<Card> {
        let needle = filter.search.to_lowercase();
        let filtered: Vec<Card> = rows
            .into_iter()
            .filter(|card| {
                needle.is_empty()
                    || card.card_number.to_lowercase().contains(&needle)
                    || card.card_type.to_lowercase().contains(&needle)
                    || card.card_provider.to_lowercase().contains(&needle)
            })
            .collect();
        let total = filtered.len() as i64;
        let items = filtered
            .into_iter()
            .skip(filter.offset())
            .take(filter.limit())
            .collect();
        Paged::new(items, total, filter)
    }
}

#[async_trait]
impl CardRepository for RedbCardRepository {
    async fn create(&self, new: NewCard) -> Result<Card> {
        let now = Utc::now();
        let id = self.store.next_id("cards")?;
        let card = Card {
            id,
            user_id: new.user_id,
            card_number: new.card_number,
            card_type: new.card_type,
            card_provider: new.card_provider,
            expire_date: new.expire_date,
            cvv: new.cvv,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.store
            .put_indexed(CARDS, id, &card, CARD_NUMBERS, &card.card_number)?;
        Ok(card)
    }

    async fn update(&self, id: u64, changes: CardChanges) -> Result<Card> {
        let mut card = self.load(id)?;
        if card.is_trashed() {
            return Err(ServiceError::not_found(Entity::Card));
        }
        card.card_type = changes.card_type;
        card.card_provider = changes.card_provider;
        card.expire_date = changes.expire_date;
        card.cvv = changes.cvv;
        card.updated_at = Utc::now();
        self.store.put(CARDS, id, &card)?;
        Ok(card)
    }

    async fn find_by_id(&self, id: u64) -> Result<Card> {
        self.load(id)
    }

    async fn find_by_card_number(&self, card_number: &str) -> Result<Card> {
        let id = self
            .store
            .index_get(CARD_NUMBERS, card_number)?
            .ok_or_else(|| ServiceError::not_found(Entity::Card))?;
        self.load(id)
    }

    async fn find_by_user(&self, user_id: u64, filter: &Pagination) -> Result<Paged<Card>> {
        let rows: Vec<Card> = self
            .store
            .scan::<Card>(CARDS)?
            .into_iter()
            .filter(|card| card.user_id == user_id)
            .collect();
        Ok(Self::page(rows, filter))
    }

    async fn find_all(&self, filter: &Pagination) -> Result<Paged<Card>> {
        Ok(Self::page(self.store.scan(CARDS)?, filter))
    }

    async fn find_active(&self, filter: &Pagination) -> Result<Paged<Card>> {
        let rows: Vec<Card> = self
            .store
            .scan::<Card>(CARDS)?
            .into_iter()
            .filter(|card| !card.is_trashed())
            .collect();
        Ok(Self::page(rows, filter))
    }

    async fn find_trashed(&self, filter: &Pagination) -> Result<Paged<Card>> {
        let rows: Vec<Card> = self
            .store
            .scan::<Card>(CARDS)?
            .into_iter()
            .filter(|card| card.is_trashed())
            .collect();
        Ok(Self::page(rows, filter))
    }

    async fn trash(&self, id: u64) -> Result<Card> {
        let mut card = self.load(id)?;
        card.deleted_at = Some(Utc::now());
        card.updated_at = Utc::now();
        self.store.put(CARDS, id, &card)?;
        Ok(card)
    }

    async fn restore(&self, id: u64) -> Result<Card> {
        let mut card = self.load(id)?;
        card.deleted_at = None;
        card.updated_at = Utc::now();
        self.store.put(CARDS, id, &card)?;
        Ok(card)
    }

    async fn delete_permanent(&self, id: u64) -> Result<()> {
        let card = self.load(id)?;
        self.store
            .remove_indexed(CARDS, id, CARD_NUMBERS, &card.card_number)?;
        Ok(())
    }

    async fn restore_all(&self) -> Result<u64> {
        let mut restored = 0;
        for mut card in self.store.scan::<Card>(CARDS)? {
            if card.is_trashed() {
                card.deleted_at = None;
                card.updated_at = Utc::now();
                self.store.put(CARDS, card.id, &card)?;
                restored += 1;
            }
        }
        Ok(restored)
    }

    async fn delete_all_permanent(&self) -> Result<u64> {
        let mut removed = 0;
        for card in self.store.scan::<Card>(CARDS)? {
            if card.is_trashed() {
                self.store
                    .remove_indexed(CARDS, card.id, CARD_NUMBERS, &card.card_number)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
