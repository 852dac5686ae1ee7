use super::ApiResponse;
use crate::app_state::AppState;
use axum::{routing::get, Router};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health_check))
}

async fn health_check() -> ApiResponse<Health> {
    ApiResponse::ok(
        Health {
            ok: true,
            timestamp: OffsetDateTime::now_utc(),
        },
        "Service is healthy",
    )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub ok: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}
