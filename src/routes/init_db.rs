use super::{ApiError, ApiResponse};
use crate::{app_state::AppState, store::SubscriptionStore};
use axum::{extract::State, routing::post, Router};
use serde::Serialize;
use std::sync::Arc;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/init-db", post(init_db))
}

#[tracing::instrument(name = "Initialize store", skip(store))]
async fn init_db(
    State(store): State<Arc<dyn SubscriptionStore>>,
) -> Result<ApiResponse<InitReport>, ApiError> {
    let executed = store.initialize().await?;
    let message = if executed {
        "Subscription schema is in place"
    } else {
        "Nothing to initialize for this store"
    };

    Ok(ApiResponse::ok(
        InitReport {
            executed,
            message: message.into(),
        },
        "Database initialized",
    ))
}

#[derive(Serialize)]
struct InitReport {
    executed: bool,
    message: String,
}
