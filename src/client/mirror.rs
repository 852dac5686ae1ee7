use super::{
    sync_queue::{Operation, PendingOperation, SyncQueue},
    ApiClient, ClientError, LocalStorage,
};
use crate::domain::{
    FieldAliases, NewSubscription, SchemaRules, Subscription, SubscriptionId, SubscriptionPatch,
    SubscriptionStatus, ValidationErrors,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

pub const SUBSCRIPTIONS_KEY: &str = "subscriptions_data";
pub const PENDING_SYNC_KEY: &str = "pending_sync";

const LOCAL_ID_PREFIX: &str = "local-";

/// Client-side copy of the subscription list, persisted to local storage
/// and kept in step with the backend through a queue of pending operations.
///
/// Every mutation is applied locally first and always succeeds locally. The
/// backend is then asked to catch up; if it can't, the operation stays queued
/// and the outcome carries a warning instead of failing.
pub struct CacheMirror<S> {
    api: ApiClient,
    storage: S,
    subscriptions: Vec<Subscription>,
    queue: SyncQueue,
    aliases: FieldAliases,
    rules: SchemaRules,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SyncStatus {
    Synced,
    LocalOnly { warning: String },
}

#[derive(Debug)]
pub struct MirrorOutcome<T> {
    pub value: T,
    pub status: SyncStatus,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub acknowledged: usize,
    pub dropped: usize,
    pub remaining: usize,
    pub warnings: Vec<String>,
    remapped: Vec<(SubscriptionId, SubscriptionId)>,
}

impl SyncReport {
    pub fn status(&self) -> SyncStatus {
        if self.warnings.is_empty() && self.remaining == 0 {
            SyncStatus::Synced
        } else if self.warnings.is_empty() {
            SyncStatus::LocalOnly {
                warning: format!("{} operation(s) waiting to sync", self.remaining),
            }
        } else {
            SyncStatus::LocalOnly {
                warning: self.warnings.join("; "),
            }
        }
    }

    /// The id `id` is known by after this sync.
    pub fn resolve(&self, id: &SubscriptionId) -> SubscriptionId {
        self.remapped
            .iter()
            .find(|(local, _)| local == id)
            .map(|(_, remote)| remote.clone())
            .unwrap_or_else(|| id.clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("{0}")]
    Invalid(#[source] ValidationErrors),
    #[error("Subscription `{0}` not found")]
    NotFound(SubscriptionId),
    #[error("Failed to read local storage")]
    Storage(#[from] anyhow::Error),
}

impl<S: LocalStorage> CacheMirror<S> {
    /// Restores the mirror and the pending queue from `storage`.
    pub fn new(api: ApiClient, storage: S) -> Result<Self, MirrorError> {
        let subscriptions = load(&storage, SUBSCRIPTIONS_KEY)?.unwrap_or_default();
        let queue = load(&storage, PENDING_SYNC_KEY)?.unwrap_or_default();

        Ok(Self {
            api,
            storage,
            subscriptions,
            queue,
            aliases: FieldAliases::default(),
            rules: SchemaRules::default(),
        })
    }

    pub fn with_normalization(mut self, aliases: FieldAliases, rules: SchemaRules) -> Self {
        self.aliases = aliases;
        self.rules = rules;
        self
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    pub fn active_subscriptions(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions
            .iter()
            .filter(|subscription| subscription.status == SubscriptionStatus::Active)
    }

    pub fn pending(&self) -> &SyncQueue {
        &self.queue
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Refreshes from the backend. Pending operations go first; while any
    /// remain the local copy is kept as is. A failed fetch never replaces a
    /// non-empty local copy.
    #[tracing::instrument(name = "Fetch subscriptions into mirror", skip(self))]
    pub async fn fetch(&mut self) -> SyncStatus {
        if self.subscriptions.is_empty() {
            self.reload();
        }

        let report = self.sync_pending().await;
        if !self.queue.is_empty() {
            return report.status();
        }

        match self.api.list_subscriptions().await {
            Ok(subscriptions) => {
                self.subscriptions = subscriptions;
                self.persist();
                report.status()
            }
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, "Fetch failed, serving the local mirror");
                if self.subscriptions.is_empty() {
                    self.reload();
                }
                SyncStatus::LocalOnly {
                    warning: e.to_string(),
                }
            }
        }
    }

    #[tracing::instrument(name = "Create subscription in mirror", skip(self, payload))]
    pub async fn create(
        &mut self,
        payload: &Map<String, Value>,
    ) -> Result<MirrorOutcome<Subscription>, MirrorError> {
        let draft = self.aliases.normalize(payload);
        let input = NewSubscription::parse(&draft, &self.rules).map_err(MirrorError::Invalid)?;

        let local_id = SubscriptionId::Token(format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4()));
        self.subscriptions.push(
            input
                .clone()
                .into_subscription(local_id.clone(), OffsetDateTime::now_utc()),
        );
        self.queue.push(Operation::Create {
            local_id: local_id.clone(),
            payload: input,
        });
        self.persist();

        let report = self.sync_pending().await;
        self.outcome(&report.resolve(&local_id), report.status())
    }

    #[tracing::instrument(name = "Update subscription in mirror", skip(self, payload))]
    pub async fn update(
        &mut self,
        id: &SubscriptionId,
        payload: &Map<String, Value>,
    ) -> Result<MirrorOutcome<Subscription>, MirrorError> {
        let draft = self.aliases.normalize(payload);
        let patch = SubscriptionPatch::parse(&draft, &self.rules).map_err(MirrorError::Invalid)?;

        let subscription = self
            .find_mut(id)
            .ok_or_else(|| MirrorError::NotFound(id.clone()))?;
        patch.apply_to(subscription, OffsetDateTime::now_utc());
        self.queue.push(Operation::Update {
            id: id.clone(),
            payload: patch,
        });
        self.persist();

        let report = self.sync_pending().await;
        self.outcome(&report.resolve(id), report.status())
    }

    pub async fn set_status(
        &mut self,
        id: &SubscriptionId,
        status: SubscriptionStatus,
    ) -> Result<MirrorOutcome<Subscription>, MirrorError> {
        let mut payload = Map::new();
        payload.insert("status".into(), Value::String(status.as_str().into()));
        self.update(id, &payload).await
    }

    #[tracing::instrument(name = "Delete subscription from mirror", skip(self))]
    pub async fn delete(
        &mut self,
        id: &SubscriptionId,
    ) -> Result<MirrorOutcome<SubscriptionId>, MirrorError> {
        let index = self
            .subscriptions
            .iter()
            .position(|subscription| &subscription.id == id)
            .ok_or_else(|| MirrorError::NotFound(id.clone()))?;
        self.subscriptions.remove(index);

        if self.queue.has_pending_create(id) {
            // Never reached the backend, so there is nothing to delete there.
            let dropped = self.queue.discard(id);
            tracing::debug!(%id, dropped, "Discarded operations of a local-only subscription");
        } else {
            self.queue.push(Operation::Delete { id: id.clone() });
        }
        self.persist();

        let report = self.sync_pending().await;
        Ok(MirrorOutcome {
            value: id.clone(),
            status: report.status(),
        })
    }

    /// Replays queued operations in order until one fails transiently.
    /// Operations the backend refuses outright are dropped with a warning.
    #[tracing::instrument(name = "Sync pending operations", skip(self))]
    pub async fn sync_pending(&mut self) -> SyncReport {
        let mut report = SyncReport::default();

        while let Some(pending) = self.queue.front().cloned() {
            match self.replay(&pending, &mut report).await {
                Ok(()) => report.acknowledged += 1,
                Err(e) if e.is_permanent() => {
                    tracing::warn!(
                        operation_id = %pending.operation_id,
                        error.message = %e,
                        "Backend rejected a queued operation, dropping it"
                    );
                    report.dropped += 1;
                    report.warnings.push(e.to_string());
                    self.queue.pop_front();
                    if let Operation::Create { local_id, .. } = &pending.operation {
                        self.queue.discard(local_id);
                    }
                    self.persist();
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        operation_id = %pending.operation_id,
                        error.cause_chain = ?e,
                        "Backend unavailable, operation kept for a later sync"
                    );
                    report.warnings.push(e.to_string());
                    break;
                }
            }
            self.queue.pop_front();
            self.persist();
        }

        report.remaining = self.queue.len();
        report
    }

    async fn replay(
        &mut self,
        pending: &PendingOperation,
        report: &mut SyncReport,
    ) -> Result<(), ClientError> {
        match &pending.operation {
            Operation::Create { local_id, payload } => {
                let operation_id = pending.operation_id.to_string();
                let created = self
                    .api
                    .create_subscription(payload, Some(&operation_id))
                    .await?;
                self.queue.remap_id(local_id, &created.id);
                report.remapped.push((local_id.clone(), created.id.clone()));
                self.replace(local_id, created, pending.operation_id);
            }
            Operation::Update { id, payload } => {
                let updated = self.api.update_subscription(id, payload).await?;
                self.replace(id, updated, pending.operation_id);
            }
            Operation::Delete { id } => match self.api.delete_subscription(id).await {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {
                    tracing::debug!(%id, "Already deleted on the backend");
                }
                Err(e) => return Err(e),
            },
        }
        Ok(())
    }

    fn outcome(
        &self,
        id: &SubscriptionId,
        status: SyncStatus,
    ) -> Result<MirrorOutcome<Subscription>, MirrorError> {
        let value = self
            .subscriptions
            .iter()
            .find(|subscription| &subscription.id == id)
            .cloned()
            .ok_or_else(|| MirrorError::NotFound(id.clone()))?;
        Ok(MirrorOutcome { value, status })
    }

    fn find_mut(&mut self, id: &SubscriptionId) -> Option<&mut Subscription> {
        self.subscriptions
            .iter_mut()
            .find(|subscription| &subscription.id == id)
    }

    /// Adopts the backend's copy of `id`, then re-applies the updates still
    /// queued behind `acknowledged` so unsynced local edits survive.
    fn replace(&mut self, id: &SubscriptionId, mut canonical: Subscription, acknowledged: Uuid) {
        let now = OffsetDateTime::now_utc();
        for pending in self.queue.iter() {
            match &pending.operation {
                Operation::Update { id: target, payload }
                    if pending.operation_id != acknowledged && *target == canonical.id =>
                {
                    payload.apply_to(&mut canonical, now);
                }
                _ => {}
            }
        }
        if let Some(subscription) = self.find_mut(id) {
            *subscription = canonical;
        }
    }

    fn reload(&mut self) {
        match load(&self.storage, SUBSCRIPTIONS_KEY) {
            Ok(Some(subscriptions)) => self.subscriptions = subscriptions,
            Ok(None) => {}
            Err(e) => tracing::warn!(error.cause_chain = ?e, "Failed to load the local mirror"),
        }
    }

    fn persist(&mut self) {
        save(&mut self.storage, SUBSCRIPTIONS_KEY, &self.subscriptions);
        save(&mut self.storage, PENDING_SYNC_KEY, &self.queue);
    }
}

/// A value that fails to parse is treated as absent.
fn load<T: DeserializeOwned>(
    storage: &impl LocalStorage,
    key: &str,
) -> Result<Option<T>, anyhow::Error> {
    let Some(raw) = storage.get_item(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key, error.message = %e, "Ignoring unreadable local data");
            Ok(None)
        }
    }
}

fn save<T: Serialize>(storage: &mut impl LocalStorage, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(anyhow::Error::from)
        .and_then(|raw| storage.set_item(key, &raw));
    if let Err(e) = result {
        tracing::warn!(key, error.cause_chain = ?e, "Failed to save to local storage");
    }
}
