//! Row-store tests. They need a running Postgres reachable with the local
//! configuration, so they are ignored by default:
//! `cargo test -- --ignored`.
use sqlx::{Connection, Executor, PgConnection, PgPool};
use subtrack::{
    configuration::{get_configuration, DatabaseSettings},
    domain::{
        BillingCycle, IdempotencyKey, NewSubscription, SubscriptionId, SubscriptionPatch,
        SubscriptionStatus,
    },
    startup::get_connection_pool,
    store::{PgSubscriptionStore, StoreError, SubscriptionStore},
};
use time::macros::date;
use uuid::Uuid;

async fn configure_database(config: &mut DatabaseSettings) -> PgPool {
    config.database_name = Uuid::new_v4().to_string();

    let mut conn = PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to Postgres");

    conn.execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("Failed to create database");

    let pool = get_connection_pool(config);

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    pool
}

async fn store() -> PgSubscriptionStore {
    let mut config = get_configuration().expect("Failed to read configuration");
    PgSubscriptionStore::new(configure_database(&mut config.database).await)
}

fn netflix(next_billing_date: Option<time::Date>) -> NewSubscription {
    NewSubscription {
        name: "Netflix".into(),
        description: String::new(),
        price: 15.99,
        currency: "USD".into(),
        billing_cycle: BillingCycle::Monthly,
        next_billing_date,
        status: SubscriptionStatus::Active,
        category: String::new(),
        website: String::new(),
    }
}

#[tokio::test]
#[ignore]
async fn create_returns_the_generated_serial_id() {
    // given
    let store = store().await;

    // when
    let created = store
        .create(netflix(Some(date!(2025 - 03 - 01))))
        .await
        .unwrap();

    // then
    assert!(matches!(created.id, SubscriptionId::Serial(_)));
    assert_eq!(created.next_billing_date, "2025-03-01");
    assert_eq!(store.get_by_id(&created.id).await.unwrap(), Some(created));
}

#[tokio::test]
#[ignore]
async fn missing_billing_date_falls_back_to_today() {
    // given
    let store = store().await;

    // when
    let created = store.create(netflix(None)).await.unwrap();

    // then
    assert_eq!(created.next_billing_date.len(), 10);
}

#[tokio::test]
#[ignore]
async fn update_touches_only_supplied_columns() {
    // given
    let store = store().await;
    let created = store.create(netflix(None)).await.unwrap();
    let patch = SubscriptionPatch {
        status: Some(SubscriptionStatus::Cancelled),
        ..Default::default()
    };

    // when
    let updated = store.update(&created.id, patch).await.unwrap().unwrap();

    // then
    assert_eq!(updated.status, SubscriptionStatus::Cancelled);
    assert_eq!(updated.price, created.price);
    assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
#[ignore]
async fn initialize_is_idempotent_and_ids_must_be_serial() {
    // given
    let store = store().await;

    // then
    assert!(store.initialize().await.unwrap());
    assert!(store.initialize().await.unwrap());
    assert!(matches!(
        store.get_by_id(&SubscriptionId::Token("abc".into())).await,
        Err(StoreError::InvalidId(_))
    ));
    assert!(!store.delete(&SubscriptionId::Serial(12345)).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn replayed_idempotency_key_returns_the_first_row() {
    // given
    let store = store().await;
    let key = IdempotencyKey::try_from("op-1".to_owned()).unwrap();

    // when
    let first = store.create_idempotent(&key, netflix(None)).await.unwrap();
    let second = store.create_idempotent(&key, netflix(None)).await.unwrap();

    // then
    assert_eq!(first.id, second.id);
    assert_eq!(store.get_all().await.unwrap().len(), 1);
}
