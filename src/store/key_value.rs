use anyhow::Context;
use async_trait::async_trait;
use redis::AsyncCommands;
use secrecy::{ExposeSecret, Secret};
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::Mutex;

/// Opaque string-to-string store with prefix listing.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error>;

    async fn put(&self, key: &str, value: String) -> Result<(), anyhow::Error>;

    /// Writes only when `key` is vacant. Returns whether the write happened.
    async fn put_if_absent(&self, key: &str, value: String) -> Result<bool, anyhow::Error>;

    async fn delete(&self, key: &str) -> Result<bool, anyhow::Error>;

    async fn list(&self, prefix: &str) -> Result<Vec<String>, anyhow::Error>;
}

#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), anyhow::Error> {
        self.entries.lock().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: String) -> Result<bool, anyhow::Error> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_owned(), value);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool, anyhow::Error> {
        Ok(self.entries.lock().await.remove(key).is_some())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, anyhow::Error> {
        Ok(self
            .entries
            .lock()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[derive(Clone)]
pub struct RedisKeyValueStore {
    client: redis::Client,
}

impl RedisKeyValueStore {
    pub fn open(uri: &Secret<String>) -> Result<Self, anyhow::Error> {
        let client =
            redis::Client::open(uri.expose_secret().as_str()).context("Invalid Redis uri")?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::Connection, anyhow::Error> {
        self.client
            .get_async_connection()
            .await
            .context("Failed to connect to Redis")
    }
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: String) -> Result<(), anyhow::Error> {
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: String) -> Result<bool, anyhow::Error> {
        let mut conn = self.connection().await?;
        let written: bool = conn.set_nx(key, value).await?;
        Ok(written)
    }

    async fn delete(&self, key: &str) -> Result<bool, anyhow::Error> {
        let mut conn = self.connection().await?;
        let deleted: i32 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, anyhow::Error> {
        let mut conn = self.connection().await?;
        let mut keys = Vec::new();
        let mut iter: redis::AsyncIter<String> = conn.scan_match(format!("{prefix}*")).await?;
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }
}
