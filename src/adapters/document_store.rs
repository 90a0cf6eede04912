//! Generic JSONB document store over PostgreSQL.
//!
//! Presents a document-database surface (named collections, JSON filters,
//! timestamp ordering) on a single relational table. The store is
//! failure-absorbing by contract: an unreachable database yields a disabled
//! store, and a failure inside any single operation is logged and converted
//! to the operation's empty sentinel. Callers never see an error from here.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::StoreConfig;

/// Sort order for `find`, applied to the document timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Document-oriented persistence consumed by the audit log.
///
/// Write operations return `None` (or `false`) and reads return empty results
/// both when the store is disabled and when an individual operation fails.
/// Callers treat these as legitimate silent degradation, not as failures.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn is_connected(&self) -> bool;

    /// Insert one document, stamping `timestamp` if the caller omitted it.
    /// Returns the new document id.
    async fn insert_one(&self, collection: &str, document: Value) -> Option<String>;

    /// Insert a batch transactionally. Returns all new ids, or `None` if the
    /// batch did not commit.
    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Option<Vec<String>>;

    /// Find documents matching a containment filter, ordered by timestamp.
    async fn find(
        &self,
        collection: &str,
        filter: Option<&Value>,
        limit: Option<i64>,
        sort: SortOrder,
    ) -> Vec<Value>;

    async fn find_one(&self, collection: &str, filter: Option<&Value>) -> Option<Value>;

    /// Merge `patch` onto the most recent matching document, stamping
    /// `updated_at`. Returns whether a document was modified.
    async fn update_one(&self, collection: &str, filter: &Value, patch: Value) -> bool;

    async fn close(&self);
}

/// PostgreSQL-backed implementation.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: Option<PgPool>,
}

impl PostgresDocumentStore {
    /// Connect eagerly with a bounded liveness timeout. Never fails: a
    /// connection or migration error leaves the store disabled.
    pub async fn connect(cfg: &StoreConfig) -> Self {
        let options = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(Duration::from_millis(cfg.connect_timeout_ms));

        let pool = match options.connect(&cfg.url).await {
            Ok(pool) => pool,
            Err(e) => {
                error!("Failed to connect to PostgreSQL: {e}");
                warn!("Document store operations will be disabled");
                return Self { pool: None };
            }
        };

        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            error!("Failed to run document store migrations: {e}");
            warn!("Document store operations will be disabled");
            return Self { pool: None };
        }

        info!("Connected to document store");
        Self { pool: Some(pool) }
    }

    /// A store that drops every write and answers every read with nothing.
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    /// Liveness-checked pool access; every operation goes through this.
    async fn live_pool(&self, collection: &str) -> Option<&PgPool> {
        let pool = self.pool.as_ref();
        match pool {
            None => {
                warn!("Document store not connected, skipping operation on {collection}");
                None
            }
            Some(pool) => {
                if sqlx::query("SELECT 1").execute(pool).await.is_err() {
                    warn!("Document store unreachable, skipping operation on {collection}");
                    return None;
                }
                Some(pool)
            }
        }
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn is_connected(&self) -> bool {
        match &self.pool {
            Some(pool) => sqlx::query("SELECT 1").execute(pool).await.is_ok(),
            None => false,
        }
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Option<String> {
        let Some(pool) = self.live_pool(collection).await else {
            return None;
        };

        let mut document = document;
        let created_at = stamp(&mut document);

        let result = sqlx::query(
            "INSERT INTO documents (collection, body, created_at) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(collection)
        .bind(&document)
        .bind(created_at)
        .fetch_one(pool)
        .await;

        match result {
            Ok(row) => {
                let id: i64 = row.get("id");
                debug!("Inserted document into {collection}: {id}");
                Some(id.to_string())
            }
            Err(e) => {
                error!("Error inserting document into {collection}: {e}");
                None
            }
        }
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Option<Vec<String>> {
        let Some(pool) = self.live_pool(collection).await else {
            return None;
        };

        let result = async {
            let mut tx = pool.begin().await?;
            let mut ids = Vec::with_capacity(documents.len());

            for mut document in documents {
                let created_at = stamp(&mut document);
                let row = sqlx::query(
                    "INSERT INTO documents (collection, body, created_at) VALUES ($1, $2, $3) RETURNING id",
                )
                .bind(collection)
                .bind(&document)
                .bind(created_at)
                .fetch_one(&mut *tx)
                .await?;

                let id: i64 = row.get("id");
                ids.push(id.to_string());
            }

            tx.commit().await?;
            Ok::<_, sqlx::Error>(ids)
        }
        .await;

        match result {
            Ok(ids) => {
                debug!("Inserted {} documents into {collection}", ids.len());
                Some(ids)
            }
            Err(e) => {
                error!("Error inserting documents into {collection}: {e}");
                None
            }
        }
    }

    async fn find(
        &self,
        collection: &str,
        filter: Option<&Value>,
        limit: Option<i64>,
        sort: SortOrder,
    ) -> Vec<Value> {
        let Some(pool) = self.live_pool(collection).await else {
            return Vec::new();
        };

        let filter = filter
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        let order = match sort {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };
        let sql = format!(
            "SELECT body FROM documents \
             WHERE collection = $1 AND body @> $2 \
             ORDER BY created_at {order} LIMIT $3"
        );

        let result = sqlx::query(&sql)
            .bind(collection)
            .bind(&filter)
            .bind(limit)
            .fetch_all(pool)
            .await;

        match result {
            Ok(rows) => rows.iter().map(|row| row.get::<Value, _>("body")).collect(),
            Err(e) => {
                error!("Error querying {collection}: {e}");
                Vec::new()
            }
        }
    }

    async fn find_one(&self, collection: &str, filter: Option<&Value>) -> Option<Value> {
        self.find(collection, filter, Some(1), SortOrder::Descending)
            .await
            .into_iter()
            .next()
    }

    async fn update_one(&self, collection: &str, filter: &Value, patch: Value) -> bool {
        let Some(pool) = self.live_pool(collection).await else {
            return false;
        };

        let mut patch = patch;
        if let Value::Object(map) = &mut patch {
            map.insert(
                "updated_at".to_string(),
                Value::String(now_rfc3339(Utc::now())),
            );
        }

        let result = sqlx::query(
            r#"
            UPDATE documents SET body = body || $3
            WHERE id = (
                SELECT id FROM documents
                WHERE collection = $1 AND body @> $2
                ORDER BY created_at DESC LIMIT 1
            )
            "#,
        )
        .bind(collection)
        .bind(filter)
        .bind(&patch)
        .execute(pool)
        .await;

        match result {
            Ok(done) => done.rows_affected() > 0,
            Err(e) => {
                error!("Error updating document in {collection}: {e}");
                false
            }
        }
    }

    async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
            info!("Document store connection closed");
        }
    }
}

/// Ensure the document carries a `timestamp`; returns the instant used for
/// the row's ordering column. A caller-supplied timestamp wins and is never
/// mutated afterwards.
fn stamp(document: &mut Value) -> DateTime<Utc> {
    if let Value::Object(map) = document {
        if let Some(Value::String(existing)) = map.get("timestamp") {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(existing) {
                return parsed.with_timezone(&Utc);
            }
        }
        let now = Utc::now();
        map.entry("timestamp".to_string())
            .or_insert_with(|| Value::String(now_rfc3339(now)));
        return now;
    }
    Utc::now()
}

fn now_rfc3339(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// In-memory store used by unit tests across the crate.
#[cfg(test)]
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryDocumentStore {
        collections: Mutex<HashMap<String, Vec<Value>>>,
        next_id: Mutex<i64>,
    }

    impl MemoryDocumentStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    /// JSONB-style containment: every key in `filter` must be present in
    /// `body` with a matching (recursively contained) value.
    fn contains(body: &Value, filter: &Value) -> bool {
        match (body, filter) {
            (Value::Object(body), Value::Object(filter)) => filter
                .iter()
                .all(|(key, expected)| body.get(key).is_some_and(|v| contains(v, expected))),
            (actual, expected) => actual == expected,
        }
    }

    fn timestamp_of(document: &Value) -> String {
        document
            .get("timestamp")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    #[async_trait]
    impl DocumentStore for MemoryDocumentStore {
        async fn is_connected(&self) -> bool {
            true
        }

        async fn insert_one(&self, collection: &str, document: Value) -> Option<String> {
            let mut document = document;
            stamp(&mut document);
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            self.collections
                .lock()
                .unwrap()
                .entry(collection.to_string())
                .or_default()
                .push(document);
            Some(next_id.to_string())
        }

        async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Option<Vec<String>> {
            let mut ids = Vec::with_capacity(documents.len());
            for document in documents {
                ids.push(self.insert_one(collection, document).await?);
            }
            Some(ids)
        }

        async fn find(
            &self,
            collection: &str,
            filter: Option<&Value>,
            limit: Option<i64>,
            sort: SortOrder,
        ) -> Vec<Value> {
            let collections = self.collections.lock().unwrap();
            let mut matched: Vec<Value> = collections
                .get(collection)
                .map(|documents| {
                    documents
                        .iter()
                        .filter(|document| filter.is_none_or(|f| contains(document, f)))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();

            // RFC 3339 strings sort chronologically; stable sort keeps
            // insertion order for equal timestamps.
            matched.sort_by_key(timestamp_of);
            if sort == SortOrder::Descending {
                matched.reverse();
            }
            if let Some(limit) = limit {
                matched.truncate(limit.max(0) as usize);
            }
            matched
        }

        async fn find_one(&self, collection: &str, filter: Option<&Value>) -> Option<Value> {
            self.find(collection, filter, Some(1), SortOrder::Descending)
                .await
                .into_iter()
                .next()
        }

        async fn update_one(&self, collection: &str, filter: &Value, patch: Value) -> bool {
            let mut collections = self.collections.lock().unwrap();
            let Some(documents) = collections.get_mut(collection) else {
                return false;
            };
            let Some(target) = documents.iter_mut().rev().find(|d| contains(d, filter)) else {
                return false;
            };
            if let (Value::Object(body), Value::Object(patch)) = (target, patch) {
                for (key, value) in patch {
                    body.insert(key, value);
                }
                body.insert(
                    "updated_at".to_string(),
                    Value::String(now_rfc3339(Utc::now())),
                );
                return true;
            }
            false
        }

        async fn close(&self) {}
    }
}
