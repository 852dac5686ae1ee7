use once_cell::sync::Lazy;
use reqwest::{Client, Response};
use serde_json::Value;
use std::net::SocketAddr;
use subtrack::{
    configuration::{get_configuration, Settings, StoreBackend},
    startup::Application,
    telemetry::{get_subscriber, init_subscriber},
};

static TRACING: Lazy<()> = Lazy::new(|| {
    let name = "test";
    let default_env_filter = "info";
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(name.into(), default_env_filter.into(), std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(name.into(), default_env_filter.into(), std::io::sink);
        init_subscriber(subscriber);
    }
});

static FAILED_TO_EXECUTE_REQUEST: &str = "Failed to execute request";

pub struct TestApp {
    pub address: SocketAddr,
    client: Client,
}

impl TestApp {
    /// Runs the application on a random port over a fresh in-memory store.
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(customize: impl FnOnce(&mut Settings)) -> Self {
        Lazy::force(&TRACING);

        let mut config = get_configuration().expect("Failed to read configuration");
        config.application.port = 0;
        config.store.backend = StoreBackend::Memory;
        customize(&mut config);

        let app = Application::build(config)
            .await
            .expect("Failed to build application");
        let address = app.local_addr();

        tokio::spawn(app.run_until_stopped());

        Self {
            address,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.address)
    }

    pub async fn get_home(&self) -> Response {
        self.client
            .get(self.url("/"))
            .send()
            .await
            .expect(FAILED_TO_EXECUTE_REQUEST)
    }

    pub async fn get_health(&self) -> Response {
        self.client
            .get(self.url("/api/health"))
            .send()
            .await
            .expect(FAILED_TO_EXECUTE_REQUEST)
    }

    pub async fn post_init_db(&self) -> Response {
        self.client
            .post(self.url("/api/init-db"))
            .send()
            .await
            .expect(FAILED_TO_EXECUTE_REQUEST)
    }

    pub async fn get_subscriptions(&self) -> Response {
        self.client
            .get(self.url("/api/subscriptions"))
            .send()
            .await
            .expect(FAILED_TO_EXECUTE_REQUEST)
    }

    pub async fn get_subscription(&self, id: &str) -> Response {
        self.client
            .get(self.url(&format!("/api/subscriptions/{id}")))
            .send()
            .await
            .expect(FAILED_TO_EXECUTE_REQUEST)
    }

    pub async fn post_subscriptions(&self, body: &Value) -> Response {
        self.client
            .post(self.url("/api/subscriptions"))
            .json(body)
            .send()
            .await
            .expect(FAILED_TO_EXECUTE_REQUEST)
    }

    pub async fn post_subscriptions_with_key(&self, body: &Value, key: &str) -> Response {
        self.client
            .post(self.url("/api/subscriptions"))
            .header("Idempotency-Key", key)
            .json(body)
            .send()
            .await
            .expect(FAILED_TO_EXECUTE_REQUEST)
    }

    pub async fn put_subscription(&self, id: &str, body: &Value) -> Response {
        self.client
            .put(self.url(&format!("/api/subscriptions/{id}")))
            .json(body)
            .send()
            .await
            .expect(FAILED_TO_EXECUTE_REQUEST)
    }

    pub async fn delete_subscription(&self, id: &str) -> Response {
        self.client
            .delete(self.url(&format!("/api/subscriptions/{id}")))
            .send()
            .await
            .expect(FAILED_TO_EXECUTE_REQUEST)
    }

    /// Creates a subscription and returns its id as it appears in URLs.
    pub async fn create(&self, body: &Value) -> String {
        let response = self.post_subscriptions(body).await;
        assert_eq!(response.status().as_u16(), 201);
        let envelope = json_body(response).await;
        id_of(&envelope["data"])
    }

    fn url(&self, endpoint: &str) -> String {
        format!("http://{}{endpoint}", self.address)
    }
}

pub async fn json_body(response: Response) -> Value {
    response
        .json()
        .await
        .expect("Failed to parse response body as JSON")
}

pub fn id_of(subscription: &Value) -> String {
    match &subscription["id"] {
        Value::String(token) => token.clone(),
        other => other.to_string(),
    }
}

pub fn netflix() -> Value {
    serde_json::json!({
        "name": "Netflix",
        "price": 15.99,
        "currency": "USD",
        "billing_cycle": "monthly",
        "next_billing_date": "2025-03-01",
    })
}
