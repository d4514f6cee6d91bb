//! Per-user document store
//!
//! Documents live in one SQLite table keyed by `(user_id, collection, id)`;
//! each row holds the JSON document text. Listing goes through the
//! `(user_id, collection, created_at)` index, which [`init_store`] creates.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rehearse_common::{Error, Result};
use serde_json::{Map, Value};
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Collection holding interview sessions
pub const SESSIONS: &str = "interviewSessions";

const LIST_INDEX: &str = "idx_documents_user_created";

/// JSON object stored as a document
pub type DocumentData = Map<String, Value>;

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: DocumentData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Open (creating if needed) the store database and its schema
pub async fn init_store(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new document store: {}", db_path.display());
    } else {
        info!("Opened existing document store: {}", db_path.display());
    }

    // WAL lets request handlers read while another writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// In-memory store for tests
///
/// Limited to one connection since every SQLite memory connection is its own
/// database.
pub async fn connect_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            user_id TEXT NOT NULL,
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS {} ON documents (user_id, collection, created_at DESC)",
        LIST_INDEX
    ))
    .execute(pool)
    .await?;

    Ok(())
}

/// Diagnostic hint for store failures caused by configuration rather than
/// by the request
///
/// Recognizes a missing table or index and a database the service cannot
/// open or write.
pub fn configuration_hint(err: &sqlx::Error) -> Option<String> {
    let message = match err {
        sqlx::Error::Database(db_err) => db_err.message().to_string(),
        sqlx::Error::Io(io_err) => io_err.to_string(),
        sqlx::Error::Configuration(cfg_err) => cfg_err.to_string(),
        _ => return None,
    };
    let lower = message.to_lowercase();

    if lower.contains("no such table") {
        Some("The document store schema is missing. Restart rehearse-api to create it, \
              or check that the configured database path is correct."
            .to_string())
    } else if lower.contains("no such index") {
        Some(format!(
            "The session listing index ({}) is missing. Restart rehearse-api to recreate it.",
            LIST_INDEX
        ))
    } else if lower.contains("readonly") || lower.contains("read-only") {
        Some("The document store is read-only. Check file permissions on the database.".to_string())
    } else if lower.contains("unable to open") || lower.contains("permission denied") {
        Some("The document store could not be opened. Check the database path and its \
              access permissions."
            .to_string())
    } else {
        None
    }
}

fn require_user(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(Error::Unauthorized(
            "a signed-in user is required for document access".to_string(),
        ));
    }
    Ok(())
}

/// Current time at the precision timestamps are stored with
fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width timestamps so text ordering matches time ordering
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", value, e)))
}

/// Creation time carried by the document itself, if any
fn document_created_at(data: &DocumentData) -> Option<DateTime<Utc>> {
    data.get("createdAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document> {
    let data_text: String = row.get("data");
    let data: DocumentData = serde_json::from_str(&data_text)
        .map_err(|e| Error::Internal(format!("Failed to deserialize document: {}", e)))?;
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Document {
        id: row.get("id"),
        data,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn serialize(data: &DocumentData) -> Result<String> {
    serde_json::to_string(data)
        .map_err(|e| Error::Internal(format!("Failed to serialize document: {}", e)))
}

/// One named collection of per-user documents
#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
    collection: &'static str,
}

impl DocumentStore {
    pub fn new(pool: SqlitePool, collection: &'static str) -> Self {
        Self { pool, collection }
    }

    /// Store a new document under a generated id
    pub async fn create(&self, user_id: &str, data: DocumentData) -> Result<Document> {
        require_user(user_id)?;
        let id = Uuid::new_v4().to_string();
        self.insert(user_id, &id, data).await
    }

    /// Store a document under a caller-chosen id
    ///
    /// Fails with `InvalidTransition` when the id is already taken; existing
    /// documents only change through [`DocumentStore::replace`] and
    /// [`DocumentStore::update`].
    pub async fn insert(&self, user_id: &str, id: &str, mut data: DocumentData) -> Result<Document> {
        require_user(user_id)?;
        if id.trim().is_empty() {
            return Err(Error::InvalidInput("document id is required".to_string()));
        }

        data.insert("id".to_string(), Value::String(id.to_string()));
        let now = timestamp_now();
        let created_at = document_created_at(&data).unwrap_or(now);
        let body = serialize(&data)?;

        let result = sqlx::query(
            r#"
            INSERT INTO documents (user_id, collection, id, data, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, collection, id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(self.collection)
        .bind(id)
        .bind(&body)
        .bind(format_timestamp(created_at))
        .bind(format_timestamp(now))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::InvalidTransition(format!(
                "document {} already exists",
                id
            )));
        }

        debug!(collection = self.collection, id, "Inserted document");

        Ok(Document {
            id: id.to_string(),
            data,
            created_at,
            updated_at: now,
        })
    }

    /// Replace a document's data if it is still at the version that was read
    ///
    /// `expected_updated_at` is the `updated_at` of the copy the caller read.
    /// Fails with `InvalidTransition` when another write landed in between and
    /// with `NotFound` when the document is gone.
    pub async fn replace(
        &self,
        user_id: &str,
        id: &str,
        expected_updated_at: DateTime<Utc>,
        mut data: DocumentData,
    ) -> Result<Document> {
        require_user(user_id)?;

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT id, data, created_at, updated_at
            FROM documents
            WHERE user_id = ? AND collection = ? AND id = ?
            "#,
        )
        .bind(user_id)
        .bind(self.collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(Error::NotFound(format!("document {} does not exist", id)));
        };
        let current = row_to_document(&row)?;

        data.insert("id".to_string(), Value::String(id.to_string()));
        let document = Document {
            id: id.to_string(),
            data,
            created_at: current.created_at,
            updated_at: next_version(expected_updated_at),
        };
        write_if_unchanged(&mut tx, self.collection, user_id, &document, expected_updated_at)
            .await?;

        tx.commit().await?;
        debug!(collection = self.collection, id, "Replaced document");
        Ok(document)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<Document>> {
        require_user(user_id)?;

        let row = sqlx::query(
            r#"
            SELECT id, data, created_at, updated_at
            FROM documents
            WHERE user_id = ? AND collection = ? AND id = ?
            "#,
        )
        .bind(user_id)
        .bind(self.collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    /// All of a user's documents, newest first
    pub async fn list(&self, user_id: &str) -> Result<Vec<Document>> {
        require_user(user_id)?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT id, data, created_at, updated_at
            FROM documents INDEXED BY {}
            WHERE user_id = ? AND collection = ?
            ORDER BY created_at DESC
            "#,
            LIST_INDEX
        ))
        .bind(user_id)
        .bind(self.collection)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_document).collect()
    }

    /// Shallow-merge `partial` into a stored document
    ///
    /// Top-level fields of `partial` replace those of the document; the id
    /// never changes. Returns `None` when the document does not exist. Like
    /// [`DocumentStore::replace`], the write only happens while the document
    /// is still at `expected_updated_at`.
    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        expected_updated_at: DateTime<Utc>,
        partial: DocumentData,
    ) -> Result<Option<Document>> {
        require_user(user_id)?;

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT id, data, created_at, updated_at
            FROM documents
            WHERE user_id = ? AND collection = ? AND id = ?
            "#,
        )
        .bind(user_id)
        .bind(self.collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut document = row_to_document(&row)?;

        for (key, value) in partial {
            if key != "id" {
                document.data.insert(key, value);
            }
        }
        document.updated_at = next_version(expected_updated_at);
        write_if_unchanged(&mut tx, self.collection, user_id, &document, expected_updated_at)
            .await?;

        tx.commit().await?;
        Ok(Some(document))
    }
}

/// New `updated_at` for a write, strictly later than the version it replaces
fn next_version(previous: DateTime<Utc>) -> DateTime<Utc> {
    timestamp_now().max(previous.trunc_subsecs(6) + chrono::Duration::microseconds(1))
}

async fn write_if_unchanged(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    collection: &str,
    user_id: &str,
    document: &Document,
    expected_updated_at: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE documents SET data = ?, updated_at = ?
        WHERE user_id = ? AND collection = ? AND id = ? AND updated_at = ?
        "#,
    )
    .bind(serialize(&document.data)?)
    .bind(format_timestamp(document.updated_at))
    .bind(user_id)
    .bind(collection)
    .bind(&document.id)
    .bind(format_timestamp(expected_updated_at))
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::InvalidTransition(format!(
            "document {} was modified concurrently",
            document.id
        )));
    }
    Ok(())
}
