use super::{BillingCycle, SubscriptionId, SubscriptionStatus};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

pub const DEFAULT_CURRENCY: &str = "TWD";

/// A subscription in canonical form, every field populated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub currency: String,
    #[serde(alias = "billingCycle")]
    pub billing_cycle: BillingCycle,
    #[serde(alias = "nextBilling")]
    pub next_billing_date: String,
    #[serde(default)]
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub website: String,
    #[serde(with = "time::serde::rfc3339", alias = "createdAt")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339", alias = "updatedAt")]
    pub updated_at: OffsetDateTime,
}

/// A stored subscription as read back from a store, where any column may be
/// missing or null.
#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionRecord {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub billing_cycle: Option<String>,
    pub next_billing_date: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub website: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl SubscriptionRecord {
    /// Fills every gap with its fixed default.
    pub fn into_subscription(self, id: SubscriptionId) -> Subscription {
        let now = OffsetDateTime::now_utc();

        Subscription {
            id,
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            price: self.price.unwrap_or(0.0),
            currency: self
                .currency
                .filter(|currency| !currency.is_empty())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_owned()),
            billing_cycle: self
                .billing_cycle
                .and_then(|cycle| BillingCycle::try_from(cycle.as_str()).ok())
                .unwrap_or_default(),
            next_billing_date: self.next_billing_date.unwrap_or_default(),
            status: self
                .status
                .and_then(|status| SubscriptionStatus::try_from(status.as_str()).ok())
                .unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            website: self.website.unwrap_or_default(),
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        }
    }
}

pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}
