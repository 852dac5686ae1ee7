use super::{
    KeyValueStore, StoreError, SubscriptionStore, CREATE_FAILED, DELETE_FAILED, GET_ALL_FAILED,
    GET_FAILED, UPDATE_FAILED,
};
use crate::domain::{
    IdempotencyKey, NewSubscription, Subscription, SubscriptionId, SubscriptionPatch,
    SubscriptionRecord,
};
use async_trait::async_trait;
use time::OffsetDateTime;

const KEY_PREFIX: &str = "subscription:";
const IDEMPOTENCY_PREFIX: &str = "idempotency:";

/// Subscriptions kept as one JSON document per key, with generated token ids.
pub struct KvSubscriptionStore<K> {
    kv: K,
}

impl<K: KeyValueStore> KvSubscriptionStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    async fn read(&self, key: &str) -> Result<Option<Subscription>, anyhow::Error> {
        let Some(document) = self.kv.get(key).await? else {
            return Ok(None);
        };
        let record: SubscriptionRecord = serde_json::from_str(&document)?;
        let suffix = key.trim_start_matches(KEY_PREFIX);
        let id = SubscriptionId::parse(suffix)
            .unwrap_or_else(|_| SubscriptionId::Token(suffix.to_owned()));
        Ok(Some(record.into_subscription(id)))
    }

    async fn write(&self, subscription: &Subscription) -> Result<(), anyhow::Error> {
        let document = serde_json::to_string(subscription)?;
        self.kv.put(&key_for(&subscription.id), document).await
    }

    async fn insert(&self, input: NewSubscription) -> Result<Subscription, anyhow::Error> {
        let now = OffsetDateTime::now_utc();
        loop {
            let subscription = input.clone().into_subscription(SubscriptionId::generate_token(), now);
            let document = serde_json::to_string(&subscription)?;
            if self
                .kv
                .put_if_absent(&key_for(&subscription.id), document)
                .await?
            {
                return Ok(subscription);
            }
            tracing::warn!(id = %subscription.id, "Generated id collided, retrying");
        }
    }

    async fn replay(&self, key: &str) -> Result<Option<Subscription>, anyhow::Error> {
        let Some(id) = self.kv.get(key).await? else {
            return Ok(None);
        };
        self.read(&format!("{KEY_PREFIX}{id}")).await
    }

    async fn claim(
        &self,
        key: &IdempotencyKey,
        input: NewSubscription,
    ) -> Result<Subscription, anyhow::Error> {
        let idempotency_key = format!("{IDEMPOTENCY_PREFIX}{}", key.as_ref());
        if let Some(existing) = self.replay(&idempotency_key).await? {
            return Ok(existing);
        }

        let created = self.insert(input).await?;
        if self
            .kv
            .put_if_absent(&idempotency_key, created.id.to_string())
            .await?
        {
            return Ok(created);
        }

        match self.replay(&idempotency_key).await? {
            Some(existing) => {
                self.kv.delete(&key_for(&created.id)).await?;
                Ok(existing)
            }
            None => {
                // The first subscription is gone, the key now points at ours.
                self.kv
                    .put(&idempotency_key, created.id.to_string())
                    .await?;
                Ok(created)
            }
        }
    }

    async fn patch(
        &self,
        id: &SubscriptionId,
        patch: &SubscriptionPatch,
    ) -> Result<Option<Subscription>, anyhow::Error> {
        let Some(mut subscription) = self.read(&key_for(id)).await? else {
            return Ok(None);
        };
        patch.apply_to(&mut subscription, OffsetDateTime::now_utc());
        self.write(&subscription).await?;
        Ok(Some(subscription))
    }
}

fn key_for(id: &SubscriptionId) -> String {
    format!("{KEY_PREFIX}{id}")
}

#[async_trait]
impl<K: KeyValueStore> SubscriptionStore for KvSubscriptionStore<K> {
    async fn initialize(&self) -> Result<bool, StoreError> {
        Ok(false)
    }

    #[tracing::instrument(name = "Fetch all subscriptions", skip(self))]
    async fn get_all(&self) -> Result<Vec<Subscription>, StoreError> {
        let keys = self
            .kv
            .list(KEY_PREFIX)
            .await
            .map_err(StoreError::unexpected(GET_ALL_FAILED))?;

        let mut subscriptions = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(subscription) = self
                .read(&key)
                .await
                .map_err(StoreError::unexpected(GET_ALL_FAILED))?
            {
                subscriptions.push(subscription);
            }
        }
        subscriptions.sort_by(|a, b| {
            a.next_billing_date
                .cmp(&b.next_billing_date)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(subscriptions)
    }

    #[tracing::instrument(name = "Fetch subscription", skip(self))]
    async fn get_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, StoreError> {
        self.read(&key_for(id))
            .await
            .map_err(StoreError::unexpected(GET_FAILED))
    }

    #[tracing::instrument(name = "Create subscription", skip(self, input))]
    async fn create(&self, input: NewSubscription) -> Result<Subscription, StoreError> {
        self.insert(input)
            .await
            .map_err(StoreError::unexpected(CREATE_FAILED))
    }

    #[tracing::instrument(name = "Create subscription idempotently", skip(self, key, input))]
    async fn create_idempotent(
        &self,
        key: &IdempotencyKey,
        input: NewSubscription,
    ) -> Result<Subscription, StoreError> {
        self.claim(key, input)
            .await
            .map_err(StoreError::unexpected(CREATE_FAILED))
    }

    #[tracing::instrument(name = "Update subscription", skip(self, patch))]
    async fn update(
        &self,
        id: &SubscriptionId,
        patch: SubscriptionPatch,
    ) -> Result<Option<Subscription>, StoreError> {
        self.patch(id, &patch)
            .await
            .map_err(StoreError::unexpected(UPDATE_FAILED))
    }

    #[tracing::instrument(name = "Delete subscription", skip(self))]
    async fn delete(&self, id: &SubscriptionId) -> Result<bool, StoreError> {
        self.kv
            .delete(&key_for(id))
            .await
            .map_err(StoreError::unexpected(DELETE_FAILED))
    }
}
