//! Record store backed by SQLite
//!
//! Records are flat typed structs grouped into named collections. They are
//! serialized to JSON at this boundary and nowhere else; callers only ever
//! see their own types.
//!
//! Every mutation is committed before the call returns. Read-modify-write
//! sequences go through [`Store::transaction`], which takes a per-collection
//! lock so that concurrent processes sharing the same database file never
//! interleave inside one collection.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::{Row, Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::StorageError;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// How long a writer waits for another process to release a collection lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open the store at `path`, creating an empty one if none exists.
    ///
    /// `~` is expanded and missing parent directories are created. Nothing
    /// is cached between calls: every read goes to the database file.
    pub async fn open(path: &str) -> StorageResult<Self> {
        let expanded_path = shellexpand::tilde(path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            // A commit is on disk once it returns
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::migrate(pool).await
    }

    /// Open a private in-memory store. Contents vanish when it is dropped.
    pub async fn open_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every pooled connection would otherwise get its own empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> StorageResult<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        key: &str,
    ) -> StorageResult<Option<T>> {
        let mut conn = self.pool.acquire().await?;
        get_record(&mut conn, collection, key).await
    }

    /// Insert or overwrite a record.
    pub async fn put<T: Serialize>(
        &self,
        collection: &str,
        key: &str,
        record: &T,
    ) -> StorageResult<()> {
        let mut conn = self.pool.acquire().await?;
        put_record(&mut conn, collection, key, record).await
    }

    /// Insert a record only if `key` is free. Returns `false` if it was taken.
    pub async fn insert_new<T: Serialize>(
        &self,
        collection: &str,
        key: &str,
        record: &T,
    ) -> StorageResult<bool> {
        let mut conn = self.pool.acquire().await?;
        insert_record(&mut conn, collection, key, record).await
    }

    pub async fn list_keys(&self, collection: &str) -> StorageResult<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM records WHERE collection = ? ORDER BY key")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|r| r.get("key")).collect())
    }

    pub async fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
    ) -> StorageResult<Vec<(String, T)>> {
        let mut conn = self.pool.acquire().await?;
        list_records(&mut conn, collection).await
    }

    /// Begin a transaction holding the write lock of `collection`.
    ///
    /// Dropping the returned handle without calling [`StoreTx::commit`] rolls
    /// every change back.
    pub async fn transaction(&self, collection: &str) -> StorageResult<StoreTx> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO collection_locks (collection, generation) VALUES (?, 1)
            ON CONFLICT(collection) DO UPDATE SET generation = generation + 1
            "#,
        )
        .bind(collection)
        .execute(&mut *tx)
        .await?;

        Ok(StoreTx {
            tx,
            collection: collection.to_string(),
        })
    }

    /// Move all committed changes from the write-ahead log into the main
    /// database file.
    pub async fn flush(&self) -> StorageResult<()> {
        sqlx::query("PRAGMA wal_checkpoint(FULL)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Close the underlying pool, waiting for in-flight statements.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// A locked, all-or-nothing unit of work on a single collection.
pub struct StoreTx {
    tx: Transaction<'static, Sqlite>,
    collection: String,
}

impl StoreTx {
    pub async fn get<T: DeserializeOwned>(&mut self, key: &str) -> StorageResult<Option<T>> {
        get_record(&mut self.tx, &self.collection, key).await
    }

    pub async fn put<T: Serialize>(&mut self, key: &str, record: &T) -> StorageResult<()> {
        put_record(&mut self.tx, &self.collection, key, record).await
    }

    pub async fn insert_new<T: Serialize>(&mut self, key: &str, record: &T) -> StorageResult<bool> {
        insert_record(&mut self.tx, &self.collection, key, record).await
    }

    pub async fn list<T: DeserializeOwned>(&mut self) -> StorageResult<Vec<(String, T)>> {
        list_records(&mut self.tx, &self.collection).await
    }

    pub async fn commit(self) -> StorageResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

async fn get_record<T: DeserializeOwned>(
    conn: &mut SqliteConnection,
    collection: &str,
    key: &str,
) -> StorageResult<Option<T>> {
    let row = sqlx::query("SELECT data FROM records WHERE collection = ? AND key = ?")
        .bind(collection)
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|r| decode(collection, key, &r.get::<String, _>("data")))
        .transpose()
}

async fn put_record<T: Serialize>(
    conn: &mut SqliteConnection,
    collection: &str,
    key: &str,
    record: &T,
) -> StorageResult<()> {
    let data = serde_json::to_string(record)?;

    sqlx::query(
        r#"
        INSERT INTO records (collection, key, data) VALUES (?, ?, ?)
        ON CONFLICT(collection, key) DO UPDATE SET data = excluded.data
        "#,
    )
    .bind(collection)
    .bind(key)
    .bind(data)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_record<T: Serialize>(
    conn: &mut SqliteConnection,
    collection: &str,
    key: &str,
    record: &T,
) -> StorageResult<bool> {
    let data = serde_json::to_string(record)?;

    let result = sqlx::query(
        r#"
        INSERT INTO records (collection, key, data) VALUES (?, ?, ?)
        ON CONFLICT(collection, key) DO NOTHING
        "#,
    )
    .bind(collection)
    .bind(key)
    .bind(data)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

async fn list_records<T: DeserializeOwned>(
    conn: &mut SqliteConnection,
    collection: &str,
) -> StorageResult<Vec<(String, T)>> {
    let rows = sqlx::query("SELECT key, data FROM records WHERE collection = ? ORDER BY key")
        .bind(collection)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|r| {
            let key: String = r.get("key");
            let record = decode(collection, &key, &r.get::<String, _>("data"))?;
            Ok((key, record))
        })
        .collect()
}

fn decode<T: DeserializeOwned>(collection: &str, key: &str, data: &str) -> StorageResult<T> {
    serde_json::from_str(data).map_err(|source| StorageError::Malformed {
        collection: collection.to_string(),
        key: key.to_string(),
        source,
    })
}
