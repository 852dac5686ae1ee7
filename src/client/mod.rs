mod api_client;
mod local_storage;
mod mirror;
mod sync_queue;
mod user_session;

pub use api_client::{ApiClient, ClientError};
pub use local_storage::{FileStorage, LocalStorage, MemoryStorage};
pub use mirror::{
    CacheMirror, MirrorError, MirrorOutcome, SyncReport, SyncStatus, PENDING_SYNC_KEY,
    SUBSCRIPTIONS_KEY,
};
pub use sync_queue::{Operation, PendingOperation, SyncQueue};
pub use user_session::{UserSession, USER_KEY};
