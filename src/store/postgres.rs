use super::{
    StoreError, SubscriptionStore, CREATE_FAILED, DELETE_FAILED, GET_ALL_FAILED, GET_FAILED,
    INITIALIZE_FAILED, UPDATE_FAILED,
};
use crate::domain::{
    format_date, IdempotencyKey, NewSubscription, Subscription, SubscriptionId,
    SubscriptionPatch, SubscriptionRecord,
};
use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder, Transaction};
use time::{Date, OffsetDateTime};

const COLUMNS: &str = "id, name, description, price, currency, billing_cycle, \
    next_billing_date, status, category, website, created_at, updated_at";

const CREATE_SUBSCRIPTIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS subscriptions (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        price DOUBLE PRECISION NOT NULL CHECK (price >= 0),
        currency TEXT NOT NULL,
        billing_cycle TEXT NOT NULL CHECK (billing_cycle IN ('weekly', 'monthly', 'yearly')),
        next_billing_date DATE NOT NULL DEFAULT CURRENT_DATE,
        status TEXT NOT NULL DEFAULT 'active',
        category TEXT,
        website TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

const CREATE_NEXT_BILLING_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_subs_next_billing ON subscriptions (next_billing_date)
"#;

const CREATE_STATUS_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_subs_status ON subscriptions (status)
"#;

const CREATE_IDEMPOTENCY_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS subscription_idempotency (
        idempotency_key TEXT PRIMARY KEY,
        subscription_id BIGINT NOT NULL REFERENCES subscriptions (id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

/// Subscriptions as rows of a relational table with serial ids.
pub struct PgSubscriptionStore {
    db_pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: i64,
    name: Option<String>,
    description: Option<String>,
    price: Option<f64>,
    currency: Option<String>,
    billing_cycle: Option<String>,
    next_billing_date: Option<Date>,
    status: Option<String>,
    category: Option<String>,
    website: Option<String>,
    created_at: Option<OffsetDateTime>,
    updated_at: Option<OffsetDateTime>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        SubscriptionRecord {
            name: row.name,
            description: row.description,
            price: row.price,
            currency: row.currency,
            billing_cycle: row.billing_cycle,
            next_billing_date: row.next_billing_date.map(format_date),
            status: row.status,
            category: row.category,
            website: row.website,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
        .into_subscription(row.id.into())
    }
}

fn serial(id: &SubscriptionId) -> Result<i64, StoreError> {
    id.as_serial()
        .ok_or_else(|| StoreError::InvalidId(id.clone()))
}

#[tracing::instrument(name = "Insert subscription row", skip(transaction, input))]
async fn insert_subscription(
    transaction: &mut Transaction<'_, Postgres>,
    input: &NewSubscription,
) -> Result<SubscriptionRow, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO subscriptions (
            name, description, price, currency, billing_cycle,
            next_billing_date, status, category, website
        )
        VALUES ($1, $2, $3, $4, $5, COALESCE($6, CURRENT_DATE), $7, $8, $9)
        RETURNING {COLUMNS}
        "#
    );

    sqlx::query_as::<_, SubscriptionRow>(&sql)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(&input.currency)
        .bind(input.billing_cycle.as_str())
        .bind(input.next_billing_date)
        .bind(input.status.as_str())
        .bind(&input.category)
        .bind(&input.website)
        .fetch_one(&mut **transaction)
        .await
}

#[tracing::instrument(name = "Find subscription by idempotency key", skip(executor, key))]
async fn find_by_idempotency_key<'e, E>(
    executor: E,
    key: &IdempotencyKey,
) -> Result<Option<SubscriptionRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, SubscriptionRow>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM subscriptions
        WHERE id = (
            SELECT subscription_id FROM subscription_idempotency
            WHERE idempotency_key = $1
        )
        "#
    ))
    .bind(key.as_ref())
    .fetch_optional(executor)
    .await
}

impl PgSubscriptionStore {
    async fn claim(
        &self,
        key: &IdempotencyKey,
        input: &NewSubscription,
    ) -> Result<Subscription, sqlx::Error> {
        let mut transaction = self.db_pool.begin().await?;

        if let Some(existing) = find_by_idempotency_key(&mut *transaction, key).await? {
            transaction.commit().await?;
            return Ok(existing.into());
        }

        let created = insert_subscription(&mut transaction, input).await?;
        let claimed = sqlx::query(
            r#"
            INSERT INTO subscription_idempotency (idempotency_key, subscription_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(key.as_ref())
        .bind(created.id)
        .execute(&mut *transaction)
        .await?
        .rows_affected()
            > 0;

        if claimed {
            transaction.commit().await?;
            return Ok(created.into());
        }

        transaction.rollback().await?;
        match find_by_idempotency_key(&self.db_pool, key).await? {
            Some(existing) => Ok(existing.into()),
            None => Err(sqlx::Error::RowNotFound),
        }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    #[tracing::instrument(name = "Initialize database", skip(self))]
    async fn initialize(&self) -> Result<bool, StoreError> {
        for statement in [
            CREATE_SUBSCRIPTIONS_TABLE,
            CREATE_NEXT_BILLING_INDEX,
            CREATE_STATUS_INDEX,
            CREATE_IDEMPOTENCY_TABLE,
        ] {
            self.db_pool
                .execute(statement)
                .await
                .map_err(StoreError::unexpected(INITIALIZE_FAILED))?;
        }
        Ok(true)
    }

    #[tracing::instrument(name = "Fetch all subscriptions", skip(self))]
    async fn get_all(&self) -> Result<Vec<Subscription>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM subscriptions
            ORDER BY next_billing_date ASC, id ASC
            "#
        ))
        .fetch_all(&self.db_pool)
        .await
        .map_err(StoreError::unexpected(GET_ALL_FAILED))?;

        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    #[tracing::instrument(name = "Fetch subscription", skip(self))]
    async fn get_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, StoreError> {
        let id = serial(id)?;
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {COLUMNS} FROM subscriptions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(StoreError::unexpected(GET_FAILED))?;

        Ok(row.map(Subscription::from))
    }

    #[tracing::instrument(name = "Create subscription", skip(self, input))]
    async fn create(&self, input: NewSubscription) -> Result<Subscription, StoreError> {
        let mut transaction = self
            .db_pool
            .begin()
            .await
            .map_err(StoreError::unexpected(CREATE_FAILED))?;
        let row = insert_subscription(&mut transaction, &input)
            .await
            .map_err(StoreError::unexpected(CREATE_FAILED))?;
        transaction
            .commit()
            .await
            .map_err(StoreError::unexpected(CREATE_FAILED))?;

        Ok(row.into())
    }

    #[tracing::instrument(name = "Create subscription idempotently", skip(self, key, input))]
    async fn create_idempotent(
        &self,
        key: &IdempotencyKey,
        input: NewSubscription,
    ) -> Result<Subscription, StoreError> {
        self.claim(key, &input)
            .await
            .map_err(StoreError::unexpected(CREATE_FAILED))
    }

    #[tracing::instrument(name = "Update subscription", skip(self, patch))]
    async fn update(
        &self,
        id: &SubscriptionId,
        patch: SubscriptionPatch,
    ) -> Result<Option<Subscription>, StoreError> {
        let id = serial(id)?;

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE subscriptions SET ");
        let mut assignments = builder.separated(", ");
        if let Some(name) = patch.name {
            assignments.push("name = ").push_bind_unseparated(name);
        }
        if let Some(description) = patch.description {
            assignments
                .push("description = ")
                .push_bind_unseparated(description);
        }
        if let Some(price) = patch.price {
            assignments.push("price = ").push_bind_unseparated(price);
        }
        if let Some(currency) = patch.currency {
            assignments.push("currency = ").push_bind_unseparated(currency);
        }
        if let Some(billing_cycle) = patch.billing_cycle {
            assignments
                .push("billing_cycle = ")
                .push_bind_unseparated(billing_cycle.as_str());
        }
        if let Some(next_billing_date) = patch.next_billing_date {
            assignments
                .push("next_billing_date = ")
                .push_bind_unseparated(next_billing_date);
        }
        if let Some(status) = patch.status {
            assignments
                .push("status = ")
                .push_bind_unseparated(status.as_str());
        }
        if let Some(category) = patch.category {
            assignments.push("category = ").push_bind_unseparated(category);
        }
        if let Some(website) = patch.website {
            assignments.push("website = ").push_bind_unseparated(website);
        }
        assignments
            .push("updated_at = GREATEST(updated_at, ")
            .push_bind_unseparated(OffsetDateTime::now_utc())
            .push_unseparated(")");

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(COLUMNS);

        let row = builder
            .build_query_as::<SubscriptionRow>()
            .fetch_optional(&self.db_pool)
            .await
            .map_err(StoreError::unexpected(UPDATE_FAILED))?;

        Ok(row.map(Subscription::from))
    }

    #[tracing::instrument(name = "Delete subscription", skip(self))]
    async fn delete(&self, id: &SubscriptionId) -> Result<bool, StoreError> {
        let id = serial(id)?;
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await
            .map_err(StoreError::unexpected(DELETE_FAILED))?;

        Ok(result.rows_affected() > 0)
    }
}
