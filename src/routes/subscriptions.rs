use super::{ApiError, ApiResponse};
use crate::{
    app_state::AppState,
    domain::{IdempotencyKey, NewSubscription, Subscription, SubscriptionId, SubscriptionPatch},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/subscriptions",
            get(list_subscriptions).post(create_subscription),
        )
        .route(
            "/api/subscriptions/:id",
            get(get_subscription)
                .put(update_subscription)
                .delete(delete_subscription),
        )
}

#[tracing::instrument(name = "List subscriptions", skip(app_state))]
async fn list_subscriptions(
    State(app_state): State<AppState>,
) -> Result<ApiResponse<Vec<Subscription>>, ApiError> {
    let subscriptions = app_state.store.get_all().await?;
    Ok(ApiResponse::ok(subscriptions, "Subscriptions fetched"))
}

#[tracing::instrument(name = "Get subscription", skip(app_state))]
async fn get_subscription(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Subscription>, ApiError> {
    let id = parse_id(&id)?;
    match app_state.store.get_by_id(&id).await? {
        Some(subscription) => Ok(ApiResponse::ok(subscription, "Subscription fetched")),
        None => Err(ApiError::NotFound(id)),
    }
}

#[tracing::instrument(
    name = "Create subscription",
    skip(app_state, headers, body),
    fields(idempotency_key = tracing::field::Empty)
)]
async fn create_subscription(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<ApiResponse<Subscription>, ApiError> {
    let payload = json_object(body)?;
    let idempotency_key = idempotency_key(&headers)?;

    let draft = app_state.aliases.normalize(&payload);
    let input = NewSubscription::parse(&draft, &app_state.schema).map_err(ApiError::Validation)?;

    let subscription = match idempotency_key {
        Some(key) => {
            tracing::Span::current().record("idempotency_key", key.as_ref());
            app_state.store.create_idempotent(&key, input).await?
        }
        None => app_state.store.create(input).await?,
    };

    Ok(ApiResponse::created(subscription, "Subscription created"))
}

#[tracing::instrument(name = "Update subscription", skip(app_state, body))]
async fn update_subscription(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<ApiResponse<Subscription>, ApiError> {
    let id = parse_id(&id)?;
    let payload = json_object(body)?;

    let draft = app_state.aliases.normalize(&payload);
    let patch = SubscriptionPatch::parse(&draft, &app_state.schema).map_err(ApiError::Validation)?;

    match app_state.store.update(&id, patch).await? {
        Some(subscription) => Ok(ApiResponse::ok(subscription, "Subscription updated")),
        None => Err(ApiError::NotFound(id)),
    }
}

#[tracing::instrument(name = "Delete subscription", skip(app_state))]
async fn delete_subscription(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Deleted>, ApiError> {
    let id = parse_id(&id)?;
    if app_state.store.delete(&id).await? {
        Ok(ApiResponse::ok(Deleted { id }, "Subscription deleted"))
    } else {
        Err(ApiError::NotFound(id))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub id: SubscriptionId,
}

fn parse_id(raw: &str) -> Result<SubscriptionId, ApiError> {
    SubscriptionId::parse(raw).map_err(|_| ApiError::InvalidId(raw.to_owned()))
}

fn json_object(body: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, ApiError> {
    match body {
        Ok(Json(Value::Object(payload))) => Ok(payload),
        Ok(Json(other)) => Err(ApiError::InvalidBody(format!("found `{other}`"))),
        Err(rejection) => Err(ApiError::InvalidBody(rejection.body_text())),
    }
}

fn idempotency_key(headers: &HeaderMap) -> Result<Option<IdempotencyKey>, ApiError> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|e| ApiError::InvalidIdempotencyKey(e.to_string()))?;

    IdempotencyKey::try_from(value.to_owned())
        .map(Some)
        .map_err(ApiError::InvalidIdempotencyKey)
}
