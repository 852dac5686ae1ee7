use crate::{
    domain::{NewSubscription, Subscription, SubscriptionId, SubscriptionPatch},
    routes::{health_check::Health, home::ServiceInfo, subscriptions::Deleted, Envelope},
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Thin JSON wrapper around the subscription backend.
#[derive(Clone)]
pub struct ApiClient {
    http_client: Client,
    base_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to reach the subscription backend")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// The server understood the request and refused it. Replaying it will
    /// not help.
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Status { status, .. } => {
                status.is_client_error()
                    && *status != StatusCode::REQUEST_TIMEOUT
                    && *status != StatusCode::TOO_MANY_REQUESTS
            }
            Self::Transport(_) | Self::Decode(_) => false,
        }
    }
}

impl ApiClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ClientError> {
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub async fn service_info(&self) -> Result<ServiceInfo, ClientError> {
        let response = self.http_client.get(self.url("/")).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status { status, body });
        }
        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn health_check(&self) -> Result<Health, ClientError> {
        self.send(self.http_client.get(self.url("/api/health")))
            .await
    }

    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>, ClientError> {
        self.send(self.http_client.get(self.url("/api/subscriptions")))
            .await
    }

    pub async fn get_subscription(&self, id: &SubscriptionId) -> Result<Subscription, ClientError> {
        self.send(
            self.http_client
                .get(self.url(&format!("/api/subscriptions/{id}"))),
        )
        .await
    }

    pub async fn create_subscription(
        &self,
        input: &NewSubscription,
        idempotency_key: Option<&str>,
    ) -> Result<Subscription, ClientError> {
        let mut request = self
            .http_client
            .post(self.url("/api/subscriptions"))
            .json(input);
        if let Some(key) = idempotency_key {
            request = request.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        self.send(request).await
    }

    pub async fn update_subscription(
        &self,
        id: &SubscriptionId,
        patch: &SubscriptionPatch,
    ) -> Result<Subscription, ClientError> {
        self.send(
            self.http_client
                .put(self.url(&format!("/api/subscriptions/{id}")))
                .json(patch),
        )
        .await
    }

    pub async fn delete_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<SubscriptionId, ClientError> {
        let deleted: Deleted = self
            .send(
                self.http_client
                    .delete(self.url(&format!("/api/subscriptions/{id}"))),
            )
            .await?;
        Ok(deleted.id)
    }

    #[tracing::instrument(name = "Call subscription backend", skip(self, request))]
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(%status, %body, "Backend responded");

        if !status.is_success() {
            let body = serde_json::from_str::<Envelope<Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.error)
                .unwrap_or(body);
            return Err(ClientError::Status { status, body });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))?;
        match envelope {
            Envelope {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            Envelope { error, .. } => Err(ClientError::Decode(
                error.unwrap_or_else(|| "envelope carries no data".into()),
            )),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }
}
