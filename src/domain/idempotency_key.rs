const MAX_LENGTH: usize = 64;

/// Client-generated key that makes a create request safe to replay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdempotencyKey(String);

impl TryFrom<String> for IdempotencyKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.is_empty() {
            return Err("The idempotency key cannot be empty".into());
        }
        if s.len() >= MAX_LENGTH {
            return Err(format!(
                "The idempotency key must be shorter than {MAX_LENGTH} characters"
            ));
        }

        Ok(Self(s))
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
