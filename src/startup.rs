use crate::{
    app_state::AppState,
    configuration::{DatabaseSettings, Settings, StoreBackend},
    request_id::{RequestUuid, REQUEST_ID_HEADER},
    routes::{health_check, home, init_db, subscriptions},
    store::{
        InMemoryKeyValueStore, KvSubscriptionStore, PgSubscriptionStore, RedisKeyValueStore,
        SubscriptionStore,
    },
    telemetry::request_span,
};
use anyhow::Context;
use axum::{http::HeaderName, Router};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub struct Application {
    address: SocketAddr,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind {address}"))?;
        let address = listener
            .local_addr()
            .context("Failed to read the bound address")?;

        let app_state = AppState {
            store: build_store(&config)?,
            aliases: Arc::new(config.normalization),
            schema: config.schema,
        };

        Ok(Self {
            address,
            listener,
            router: router(app_state),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        tracing::info!("Listening on {}", self.address);
        axum::serve(self.listener, self.router).await
    }
}

pub fn get_connection_pool(config: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(2))
        .connect_lazy_with(config.with_db())
}

pub fn build_store(config: &Settings) -> Result<Arc<dyn SubscriptionStore>, anyhow::Error> {
    let store: Arc<dyn SubscriptionStore> = match config.store.backend {
        StoreBackend::Postgres => Arc::new(PgSubscriptionStore::new(get_connection_pool(
            &config.database,
        ))),
        StoreBackend::Redis => Arc::new(KvSubscriptionStore::new(RedisKeyValueStore::open(
            &config.redis.uri,
        )?)),
        StoreBackend::Memory => {
            Arc::new(KvSubscriptionStore::new(InMemoryKeyValueStore::default()))
        }
    };
    tracing::info!(backend = ?config.store.backend, "Subscription store ready");

    Ok(store)
}

fn router(app_state: AppState) -> Router {
    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(home::router())
        .merge(health_check::router())
        .merge(init_db::router())
        .merge(subscriptions::router())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), RequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .with_state(app_state)
}
