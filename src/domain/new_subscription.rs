use super::{
    subscription::format_date,
    validation::{is_supplied, Checked, ValidationErrors},
    BillingCycle, SchemaRules, Subscription, SubscriptionDraft, SubscriptionId,
    SubscriptionStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Date, OffsetDateTime};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// A validated create request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewSubscription {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub billing_cycle: BillingCycle,
    #[serde(
        default,
        with = "iso_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_billing_date: Option<Date>,
    #[serde(default)]
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub website: String,
}

impl NewSubscription {
    pub fn parse(draft: &SubscriptionDraft, rules: &SchemaRules) -> Result<Self, ValidationErrors> {
        match Checked::run(draft, rules) {
            Checked {
                name: Ok(name),
                next_billing_date: Ok(next_billing_date),
                price: Ok(price),
                currency: Ok(currency),
                billing_cycle: Ok(billing_cycle),
                status: Ok(status),
                description: Ok(description),
                category: Ok(category),
                website: Ok(website),
            } => Ok(Self {
                name,
                description: description.unwrap_or_default(),
                price,
                currency,
                billing_cycle,
                next_billing_date,
                status: status.unwrap_or_default(),
                category: category.unwrap_or_default(),
                website: website.unwrap_or_default(),
            }),
            checked => Err(ValidationErrors(checked.errors())),
        }
    }

    /// Builds the stored form. A missing billing date defaults to the day of creation.
    pub fn into_subscription(self, id: SubscriptionId, now: OffsetDateTime) -> Subscription {
        Subscription {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            currency: self.currency,
            billing_cycle: self.billing_cycle,
            next_billing_date: format_date(self.next_billing_date.unwrap_or(now.date())),
            status: self.status,
            category: self.category,
            website: self.website,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A validated partial update. `None` fields keep their stored value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_cycle: Option<BillingCycle>,
    #[serde(
        default,
        with = "iso_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_billing_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SubscriptionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl SubscriptionPatch {
    /// Validates only what the caller supplied. An absent name is replaced by
    /// a placeholder so the name rule fires only for an explicitly blank name.
    pub fn parse(draft: &SubscriptionDraft, rules: &SchemaRules) -> Result<Self, ValidationErrors> {
        let mut probe = draft.clone();
        if probe.name.is_none() {
            probe.name = Some(Value::String(NAME_PLACEHOLDER.into()));
        }

        let checked = Checked::run(&probe, rules);
        let errors: Vec<_> = checked
            .errors()
            .into_iter()
            .filter(|e| is_supplied(draft, e.field))
            .collect();
        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }

        Ok(Self {
            name: supplied(draft.name.is_some(), checked.name),
            description: checked.description.ok().flatten(),
            price: supplied(draft.price.is_some(), checked.price),
            currency: supplied(draft.currency.is_some(), checked.currency),
            billing_cycle: supplied(draft.billing_cycle.is_some(), checked.billing_cycle),
            next_billing_date: checked.next_billing_date.ok().flatten(),
            status: checked.status.ok().flatten(),
            category: checked.category.ok().flatten(),
            website: checked.website.ok().flatten(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Overwrites the supplied fields and advances `updated_at`, never backwards.
    pub fn apply_to(&self, subscription: &mut Subscription, now: OffsetDateTime) {
        if let Some(name) = &self.name {
            subscription.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            subscription.description.clone_from(description);
        }
        if let Some(price) = self.price {
            subscription.price = price;
        }
        if let Some(currency) = &self.currency {
            subscription.currency.clone_from(currency);
        }
        if let Some(billing_cycle) = self.billing_cycle {
            subscription.billing_cycle = billing_cycle;
        }
        if let Some(next_billing_date) = self.next_billing_date {
            subscription.next_billing_date = format_date(next_billing_date);
        }
        if let Some(status) = self.status {
            subscription.status = status;
        }
        if let Some(category) = &self.category {
            subscription.category.clone_from(category);
        }
        if let Some(website) = &self.website {
            subscription.website.clone_from(website);
        }
        subscription.updated_at = subscription.updated_at.max(now);
    }
}

const NAME_PLACEHOLDER: &str = "placeholder";

fn supplied<T, E>(present: bool, checked: Result<T, E>) -> Option<T> {
    if present {
        checked.ok()
    } else {
        None
    }
}
