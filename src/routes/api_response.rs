use crate::{
    domain::{SubscriptionId, ValidationErrors},
    store::StoreError,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// The JSON body every `/api` endpoint answers with.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub struct ApiResponse<T> {
    status: StatusCode,
    envelope: Envelope<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: &str) -> Self {
        Self::with_status(StatusCode::OK, data, message)
    }

    pub fn created(data: T, message: &str) -> Self {
        Self::with_status(StatusCode::CREATED, data, message)
    }

    fn with_status(status: StatusCode, data: T, message: &str) -> Self {
        Self {
            status,
            envelope: Envelope {
                success: true,
                data: Some(data),
                error: None,
                message: Some(message.to_owned()),
            },
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[source] ValidationErrors),
    #[error("Request body must be a JSON object: {0}")]
    InvalidBody(String),
    #[error("Invalid subscription id: `{0}`")]
    InvalidId(String),
    #[error("Invalid idempotency key: {0}")]
    InvalidIdempotencyKey(String),
    #[error("Subscription not found")]
    NotFound(SubscriptionId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::InvalidBody(_)
            | Self::InvalidId(_)
            | Self::InvalidIdempotencyKey(_)
            | Self::Store(StoreError::InvalidId(_)) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::Unexpected { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::InvalidBody(_) => "Validation failed",
            Self::InvalidId(_) | Self::Store(StoreError::InvalidId(_)) => {
                "Subscription id must be a number"
            }
            Self::InvalidIdempotencyKey(_) => "Idempotency-Key must be 1 to 63 characters",
            Self::NotFound(_) => "No subscription with the given id",
            Self::Store(StoreError::Unexpected { .. }) => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("{:#?}", self);

        let status = self.status();
        let envelope = Envelope::<()> {
            success: false,
            data: None,
            error: Some(self.to_string()),
            message: Some(self.message().to_owned()),
        };
        (status, Json(envelope)).into_response()
    }
}
