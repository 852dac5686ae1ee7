mod billing_cycle;
mod idempotency_key;
mod new_subscription;
mod normalize;
mod subscription;
mod subscription_id;
mod subscription_status;
mod validation;

pub use billing_cycle::BillingCycle;
pub use idempotency_key::IdempotencyKey;
pub use new_subscription::{NewSubscription, SubscriptionPatch};
pub use normalize::{FieldAliases, SubscriptionDraft};
pub use subscription::{format_date, Subscription, SubscriptionRecord, DEFAULT_CURRENCY};
pub use subscription_id::SubscriptionId;
pub use subscription_status::SubscriptionStatus;
pub use validation::{validate, Field, FieldError, SchemaRules, ValidationErrors};
