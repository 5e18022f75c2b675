//! `PostgreSQL` document store.
//!
//! # Table: `docstore.documents`
//!
//! One row per document, keyed by `(collection, id)`. Fields live in a
//! `jsonb` column; `seq` preserves insertion order. A trigger publishes the
//! collection name on the `docstore_changes` channel after every write,
//! which [`PgDocumentStore::watch`] turns into fresh snapshots.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::postgres::{PgListener, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::mpsc;

use crate::DocumentStore;
use crate::document::{Document, Fields};
use crate::error::StoreError;
use crate::subscription::{SUBSCRIPTION_BUFFER, Snapshot, Subscription};
use crate::write::{Write, incremented};

/// Channel the change trigger notifies on.
pub const CHANGES_CHANNEL: &str = "docstore_changes";

/// Embedded migrations for the `docstore` schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    data: Json<Fields>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self::new(row.id, row.data.0)
    }
}

/// [`DocumentStore`] backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_all(pool: &PgPool, collection: &str) -> Result<Snapshot, StoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r"
            SELECT id, data
            FROM docstore.documents
            WHERE collection = $1
            ORDER BY seq
            ",
        )
        .bind(collection)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn apply_one(tx: &mut Transaction<'_, Postgres>, write: Write) -> Result<(), StoreError> {
        match write {
            Write::Create {
                collection,
                id,
                fields,
            } => {
                let result = sqlx::query(
                    r"
                    INSERT INTO docstore.documents (collection, id, data)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (collection, id) DO NOTHING
                    ",
                )
                .bind(&collection)
                .bind(&id)
                .bind(Json(&fields))
                .execute(&mut **tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(StoreError::AlreadyExists { collection, id });
                }
            }
            Write::Update {
                collection,
                id,
                fields,
            } => {
                let result = sqlx::query(
                    r"
                    UPDATE docstore.documents
                    SET data = data || $3, updated_at = NOW()
                    WHERE collection = $1 AND id = $2
                    ",
                )
                .bind(&collection)
                .bind(&id)
                .bind(Json(&fields))
                .execute(&mut **tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(StoreError::not_found(&collection, &id));
                }
            }
            Write::Increment {
                collection,
                id,
                field,
                delta,
                floor,
            } => {
                // Row lock keeps concurrent increments of the same document serial.
                let row = sqlx::query_as::<_, DocumentRow>(
                    r"
                    SELECT id, data
                    FROM docstore.documents
                    WHERE collection = $1 AND id = $2
                    FOR UPDATE
                    ",
                )
                .bind(&collection)
                .bind(&id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| StoreError::not_found(&collection, &id))?;

                let current = Document::from(row).integer_field(&collection, &field)?;
                let next = incremented(&collection, &id, &field, current, delta, floor)?;

                sqlx::query(
                    r"
                    UPDATE docstore.documents
                    SET data = data || jsonb_build_object($3::text, $4::bigint), updated_at = NOW()
                    WHERE collection = $1 AND id = $2
                    ",
                )
                .bind(&collection)
                .bind(&id)
                .bind(&field)
                .bind(next)
                .execute(&mut **tx)
                .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    #[tracing::instrument(skip(self))]
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        Self::fetch_all(&self.pool, collection).await
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r"
            SELECT id, data
            FROM docstore.documents
            WHERE collection = $1 AND id = $2
            ",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Document::from))
    }

    #[tracing::instrument(skip(self, fields))]
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.apply_all(vec![Write::create(collection, id.clone(), fields)])
            .await?;
        Ok(id)
    }

    #[tracing::instrument(skip(self, fields))]
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        self.apply_all(vec![Write::update(collection, id, fields)])
            .await
    }

    #[tracing::instrument(skip(self, writes), fields(writes = writes.len()))]
    async fn apply_all(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for write in writes {
            // Dropping the transaction on error rolls everything back.
            Self::apply_one(&mut tx, write).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn watch(&self, collection: &str) -> Result<Subscription, StoreError> {
        // Listen before the first snapshot so no change slips between them.
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGES_CHANNEL).await?;

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let pool = self.pool.clone();
        let name = collection.to_owned();

        let task = tokio::spawn(async move {
            if tx.send(Self::fetch_all(&pool, &name).await).await.is_err() {
                return;
            }
            loop {
                match listener.recv().await {
                    Ok(notification) if notification.payload() != name => continue,
                    Ok(_) => {}
                    Err(e) => {
                        // The listener reconnects on the next recv; anything
                        // missed meanwhile is covered by the resync below.
                        tracing::warn!(error = %e, collection = %name, "change listener interrupted");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
                if tx.send(Self::fetch_all(&pool, &name).await).await.is_err() {
                    return;
                }
            }
        });

        Ok(Subscription::new(collection, rx, task))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
