use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::{Deserialize, Serialize};
use std::{fmt, iter::repeat_with};

const TOKEN_LENGTH: usize = 25;

/// Identifier assigned by a store on create.
///
/// The row store hands out serial integers, the keyed store random
/// alphanumeric tokens. Both travel through JSON untagged, as a number or as
/// a string respectively.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubscriptionId {
    Serial(i64),
    Token(String),
}

impl SubscriptionId {
    pub fn generate_token() -> Self {
        Self::generate_with_rng(&mut thread_rng())
    }

    fn generate_with_rng(rng: &mut impl Rng) -> Self {
        let token = repeat_with(|| rng.sample(Alphanumeric))
            .map(char::from)
            .take(TOKEN_LENGTH)
            .collect();

        Self::Token(token)
    }

    /// Interprets a path segment: integers become serial ids, anything else a token.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("Subscription id must not be empty".into());
        }

        match s.parse::<i64>() {
            Ok(serial) => Ok(Self::Serial(serial)),
            Err(_) => Ok(Self::Token(s.to_owned())),
        }
    }

    pub fn as_serial(&self) -> Option<i64> {
        match self {
            Self::Serial(serial) => Some(*serial),
            Self::Token(_) => None,
        }
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial(serial) => write!(f, "{serial}"),
            Self::Token(token) => f.write_str(token),
        }
    }
}

impl From<i64> for SubscriptionId {
    fn from(serial: i64) -> Self {
        Self::Serial(serial)
    }
}
