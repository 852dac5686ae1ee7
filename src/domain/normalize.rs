use serde::Deserialize;
use serde_json::{Map, Value};

/// Accepted spellings per logical field, in probe order.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldAliases {
    pub next_billing_date: Vec<String>,
    pub billing_cycle: Vec<String>,
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self {
            next_billing_date: [
                "next_billing_date",
                "nextBilling",
                "next_billing",
                "renewalDate",
                "renewal_date",
                "nextBillingDate",
                "next_billing_Date",
                "NextBilling",
            ]
            .map(String::from)
            .to_vec(),
            billing_cycle: ["billing_cycle", "billingCycle"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Subscription payload with every field under its canonical key.
///
/// Values are kept as raw JSON so the validator can report type mismatches.
/// `None` means the caller did not supply the field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubscriptionDraft {
    pub name: Option<Value>,
    pub description: Option<Value>,
    pub price: Option<Value>,
    pub currency: Option<Value>,
    pub billing_cycle: Option<Value>,
    pub next_billing_date: Option<Value>,
    pub status: Option<Value>,
    pub category: Option<Value>,
    pub website: Option<Value>,
}

impl FieldAliases {
    pub fn normalize(&self, payload: &Map<String, Value>) -> SubscriptionDraft {
        SubscriptionDraft {
            name: canonical(payload, "name"),
            description: canonical(payload, "description"),
            price: canonical(payload, "price"),
            currency: canonical(payload, "currency"),
            billing_cycle: probe(payload, &self.billing_cycle),
            next_billing_date: probe(payload, &self.next_billing_date).map(strip_time),
            status: canonical(payload, "status"),
            category: canonical(payload, "category"),
            website: canonical(payload, "website"),
        }
    }
}

fn canonical(payload: &Map<String, Value>, key: &str) -> Option<Value> {
    payload.get(key).filter(|value| !value.is_null()).cloned()
}

// Empty strings fall through to the next alias.
fn probe(payload: &Map<String, Value>, aliases: &[String]) -> Option<Value> {
    aliases
        .iter()
        .filter_map(|alias| payload.get(alias))
        .find(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        })
        .cloned()
}

fn strip_time(value: Value) -> Value {
    match value {
        Value::String(s) => match s.split_once('T') {
            Some((date, _)) => Value::String(date.to_owned()),
            None => Value::String(s),
        },
        other => other,
    }
}
