use std::time::Duration;

use redis::Client;

use paygate_common::error::{Result, ServiceError};

/// Shared cache backend using Redis.
#[derive(Debug, Clone)]
pub struct RedisCache {
    client: Client,
}

impl RedisCache {
    pub fn new(redis_url: &str) -> Result<Self> {
        let client =
            Client::open(redis_url).map_err(|e| ServiceError::internal("cache", e))?;
        Ok(Self { client })
    }

    pub async fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, redis::RedisError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("GET").arg(key).query_async(&mut con).await
    }

    pub async fn set(
        &self,
        key: &str,
        payload: Vec<u8>,
        ttl: Duration,
    ) -> std::result::Result<(), redis::RedisError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("SET")
            .arg(key)
            .arg(payload)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut con)
            .await
    }

    pub async fn invalidate_prefix(
        &self,
        prefix: &str,
    ) -> std::result::Result<(), redis::RedisError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(format!("{prefix}*"))
            .query_async(&mut con)
            .await?;
        if keys.is_empty() {
            return Ok(());
        }
        redis::cmd("DEL").arg(keys).query_async(&mut con).await
    }
}
