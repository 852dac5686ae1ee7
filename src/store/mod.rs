mod key_value;
mod keyed;
mod postgres;

pub use key_value::{InMemoryKeyValueStore, KeyValueStore, RedisKeyValueStore};
pub use keyed::KvSubscriptionStore;
pub use postgres::PgSubscriptionStore;

use crate::domain::{
    IdempotencyKey, NewSubscription, Subscription, SubscriptionId, SubscriptionPatch,
};
use async_trait::async_trait;

/// CRUD over a backing store. Implementations catch every driver error and
/// hand back [`StoreError::Unexpected`] naming only the failed operation.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Creates tables and indexes if the backend needs any. Returns whether
    /// anything was executed.
    async fn initialize(&self) -> Result<bool, StoreError>;

    /// All subscriptions, ordered by ascending next billing date.
    async fn get_all(&self) -> Result<Vec<Subscription>, StoreError>;

    async fn get_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, StoreError>;

    async fn create(&self, input: NewSubscription) -> Result<Subscription, StoreError>;

    /// Like [`SubscriptionStore::create`], but a replay with the same key
    /// returns the subscription created the first time.
    async fn create_idempotent(
        &self,
        key: &IdempotencyKey,
        input: NewSubscription,
    ) -> Result<Subscription, StoreError>;

    async fn update(
        &self,
        id: &SubscriptionId,
        patch: SubscriptionPatch,
    ) -> Result<Option<Subscription>, StoreError>;

    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, id: &SubscriptionId) -> Result<bool, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid subscription id: `{0}`")]
    InvalidId(SubscriptionId),
    #[error("{operation}")]
    Unexpected {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl StoreError {
    /// Logs the driver error and wraps it so only `operation` is displayed.
    pub(crate) fn unexpected<E>(operation: &'static str) -> impl FnOnce(E) -> StoreError
    where
        E: Into<anyhow::Error>,
    {
        move |e| {
            let source = e.into();
            tracing::error!(error.cause_chain = ?source, "{operation}");
            StoreError::Unexpected { operation, source }
        }
    }
}

pub(crate) const GET_ALL_FAILED: &str = "Failed to fetch subscriptions";
pub(crate) const GET_FAILED: &str = "Failed to fetch subscription";
pub(crate) const CREATE_FAILED: &str = "Failed to create subscription";
pub(crate) const UPDATE_FAILED: &str = "Failed to update subscription";
pub(crate) const DELETE_FAILED: &str = "Failed to delete subscription";
pub(crate) const INITIALIZE_FAILED: &str = "Failed to initialize database";
