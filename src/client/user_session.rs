use super::LocalStorage;
use serde_json::Value;

pub const USER_KEY: &str = "user_data";

/// The logged-in user object, remembered across restarts.
pub struct UserSession<S> {
    storage: S,
    user: Option<Value>,
}

impl<S: LocalStorage> UserSession<S> {
    /// Restores a previously saved user. Unreadable data logs a warning and
    /// leaves the session logged out.
    pub fn load(storage: S) -> Self {
        let user = match storage.get_item(USER_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .map_err(|e| tracing::warn!(error.message = %e, "Ignoring unreadable user data"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, "Failed to load user data");
                None
            }
        };

        Self { storage, user }
    }

    pub fn user(&self) -> Option<&Value> {
        self.user.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn set_user(&mut self, user: Value) {
        if let Err(e) = self.storage.set_item(USER_KEY, &user.to_string()) {
            tracing::warn!(error.cause_chain = ?e, "Failed to save user data");
        }
        self.user = Some(user);
    }

    pub fn logout(&mut self) {
        self.user = None;
        if let Err(e) = self.storage.remove_item(USER_KEY) {
            tracing::warn!(error.cause_chain = ?e, "Failed to clear user data");
        }
    }

    pub fn into_storage(self) -> S {
        self.storage
    }
}
