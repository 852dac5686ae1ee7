use crate::{
    domain::{FieldAliases, SchemaRules},
    store::SubscriptionStore,
};
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SubscriptionStore>,
    pub aliases: Arc<FieldAliases>,
    pub schema: SchemaRules,
}

impl FromRef<AppState> for Arc<dyn SubscriptionStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}
