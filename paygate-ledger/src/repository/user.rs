use async_trait::async_trait;
use chrono::Utc;

use paygate_common::error::{Entity, Result, ServiceError};
use paygate_common::model::User;

use crate::store::{Store, USERS, USER_EMAILS};

use super::{NewUser, UserRepository};

pub struct RedbUserRepository {
    store: Store,
}

impl RedbUserRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UserRepository for RedbUserRepository {
    async fn create(&self, new: NewUser) -> Result<User> {
        let now = Utc::now();
        let id = self.store.next_id("users")?;
        let user = User {
            id,
            firstname: new.firstname,
            lastname: new.lastname,
            email: new.email,
            password_hash: new.password_hash,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.store
            .put_indexed(USERS, id, &user, USER_EMAILS, &user.email)?;
        Ok(user)
    }

    async fn find_by_id(&self, id: u64) -> Result<User> {
        self.store
            .get::<User>(USERS, id)?
            .ok_or_else(|| ServiceError::not_found(Entity::User))
    }

    async fn find_by_email(&self, email: &str) -> Result<User> {
        let id = self
            .store
            .index_get(USER_EMAILS, email)?
            .ok_or_else(|| ServiceError::not_found(Entity::User))?;
        self.find_by_id(id).await
    }
}
