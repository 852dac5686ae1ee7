use crate::app_state::AppState;
use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(home))
}

#[tracing::instrument(name = "Describe service")]
async fn home() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Subscription Backend API".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        endpoints: Endpoints {
            health: "/api/health".into(),
            subscriptions: "/api/subscriptions".into(),
            subscription: "/api/subscriptions/:id".into(),
        },
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub endpoints: Endpoints,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Endpoints {
    pub health: String,
    pub subscriptions: String,
    pub subscription: String,
}
