use super::{BillingCycle, SubscriptionDraft, SubscriptionStatus};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use time::{macros::format_description, Date};

const NAME_REQUIRED: &str = "Subscription name is required";
const DATE_FORMAT: &str = "Next billing date must be in YYYY-MM-DD format";
const DATE_INVALID: &str = "Next billing date is not a valid calendar date";
const PRICE_INVALID: &str = "Price must be a non-negative number";
const CURRENCY_REQUIRED: &str = "Currency is required";
const STATUS_INVALID: &str = "Status must be active, paused or cancelled";

/// Enumerations that vary between deployments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchemaRules {
    pub allow_weekly_billing: bool,
}

impl SchemaRules {
    fn accepts(&self, billing_cycle: BillingCycle) -> bool {
        billing_cycle != BillingCycle::Weekly || self.allow_weekly_billing
    }

    fn billing_cycle_message(&self) -> &'static str {
        if self.allow_weekly_billing {
            "Billing cycle must be weekly, monthly or yearly"
        } else {
            "Billing cycle must be monthly or yearly"
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Name,
    Description,
    Price,
    Currency,
    BillingCycle,
    NextBillingDate,
    Status,
    Category,
    Website,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Description => "description",
            Field::Price => "price",
            Field::Currency => "currency",
            Field::BillingCycle => "billing_cycle",
            Field::NextBillingDate => "next_billing_date",
            Field::Status => "status",
            Field::Category => "category",
            Field::Website => "website",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct ValidationErrors(pub(super) Vec<FieldError>);

impl ValidationErrors {
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(|e| e.message.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Runs every rule against `draft` and returns one message per violation.
/// An empty list means the draft is a valid new subscription.
pub fn validate(draft: &SubscriptionDraft, rules: &SchemaRules) -> Vec<String> {
    Checked::run(draft, rules)
        .errors()
        .into_iter()
        .map(|e| e.message)
        .collect()
}

/// Outcome of every rule, kept per field so callers can either collect the
/// violations or take the typed values.
pub(super) struct Checked {
    pub name: Result<String, FieldError>,
    pub next_billing_date: Result<Option<Date>, FieldError>,
    pub price: Result<f64, FieldError>,
    pub currency: Result<String, FieldError>,
    pub billing_cycle: Result<BillingCycle, FieldError>,
    pub status: Result<Option<SubscriptionStatus>, FieldError>,
    pub description: Result<Option<String>, FieldError>,
    pub category: Result<Option<String>, FieldError>,
    pub website: Result<Option<String>, FieldError>,
}

impl Checked {
    pub(super) fn run(draft: &SubscriptionDraft, rules: &SchemaRules) -> Self {
        Self {
            name: check_name(draft.name.as_ref()),
            next_billing_date: check_next_billing_date(draft.next_billing_date.as_ref()),
            price: check_price(draft.price.as_ref()),
            currency: check_currency(draft.currency.as_ref()),
            billing_cycle: check_billing_cycle(draft.billing_cycle.as_ref(), rules),
            status: check_status(draft.status.as_ref()),
            description: check_text(Field::Description, draft.description.as_ref()),
            category: check_text(Field::Category, draft.category.as_ref()),
            website: check_text(Field::Website, draft.website.as_ref()),
        }
    }

    pub(super) fn errors(&self) -> Vec<FieldError> {
        [
            self.name.as_ref().err(),
            self.next_billing_date.as_ref().err(),
            self.price.as_ref().err(),
            self.currency.as_ref().err(),
            self.billing_cycle.as_ref().err(),
            self.status.as_ref().err(),
            self.description.as_ref().err(),
            self.category.as_ref().err(),
            self.website.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
    }
}

pub(super) fn is_supplied(draft: &SubscriptionDraft, field: Field) -> bool {
    let value = match field {
        Field::Name => &draft.name,
        Field::Description => &draft.description,
        Field::Price => &draft.price,
        Field::Currency => &draft.currency,
        Field::BillingCycle => &draft.billing_cycle,
        Field::NextBillingDate => &draft.next_billing_date,
        Field::Status => &draft.status,
        Field::Category => &draft.category,
        Field::Website => &draft.website,
    };
    value.is_some()
}

fn check_name(value: Option<&Value>) -> Result<String, FieldError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(FieldError::new(Field::Name, NAME_REQUIRED)),
    }
}

fn check_next_billing_date(value: Option<&Value>) -> Result<Option<Date>, FieldError> {
    static DATE_SHAPE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap());

    let s = match value {
        None => return Ok(None),
        Some(Value::String(s)) if DATE_SHAPE.is_match(s) => s,
        Some(_) => return Err(FieldError::new(Field::NextBillingDate, DATE_FORMAT)),
    };

    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| FieldError::new(Field::NextBillingDate, DATE_INVALID))
}

fn check_price(value: Option<&Value>) -> Result<f64, FieldError> {
    match value.and_then(Value::as_f64) {
        Some(price) if price.is_finite() && price >= 0.0 => Ok(price),
        _ => Err(FieldError::new(Field::Price, PRICE_INVALID)),
    }
}

fn check_currency(value: Option<&Value>) -> Result<String, FieldError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(FieldError::new(Field::Currency, CURRENCY_REQUIRED)),
    }
}

fn check_billing_cycle(
    value: Option<&Value>,
    rules: &SchemaRules,
) -> Result<BillingCycle, FieldError> {
    match value
        .and_then(Value::as_str)
        .and_then(|s| BillingCycle::try_from(s).ok())
    {
        Some(billing_cycle) if rules.accepts(billing_cycle) => Ok(billing_cycle),
        _ => Err(FieldError::new(
            Field::BillingCycle,
            rules.billing_cycle_message(),
        )),
    }
}

fn check_status(value: Option<&Value>) -> Result<Option<SubscriptionStatus>, FieldError> {
    match value {
        None => Ok(None),
        Some(Value::String(s)) => SubscriptionStatus::try_from(s.as_str())
            .map(Some)
            .map_err(|_| FieldError::new(Field::Status, STATUS_INVALID)),
        Some(_) => Err(FieldError::new(Field::Status, STATUS_INVALID)),
    }
}

fn check_text(field: Field, value: Option<&Value>) -> Result<Option<String>, FieldError> {
    match value {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(FieldError::new(
            field,
            format!("`{}` must be a string", field.as_str()),
        )),
    }
}
