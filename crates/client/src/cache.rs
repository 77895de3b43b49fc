//! Local durable cache of record collections.
//!
//! One SQLite row per collection (`installationReports`, `serviceReports`),
//! holding the whole collection as a JSON array. Reads never fail on bad data:
//! an unset key or an undecodable payload reads as an empty collection.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;

/// SQLite-backed cache, cheap to clone and safe to share across tasks.
#[derive(Debug, Clone)]
pub struct LocalCache {
    pool: SqlitePool,
    /// Held across every read-modify-write so two completions cannot drop
    /// each other's effects.
    write_lock: Arc<Mutex<()>>,
}

impl LocalCache {
    /// Open (or create) the cache database at `path`.
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create cache directory at {:?}", parent))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open SQLite cache at {:?}", path))?;

        Self::with_pool(pool).await
    }

    /// Process-local cache that disappears with the process (tests, dry runs).
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("invalid in-memory SQLite options")?;

        // A single connection that is never recycled: each new connection
        // would otherwise see its own empty in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("failed to create in-memory SQLite cache")?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name       TEXT PRIMARY KEY,
                data       TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create collections table")?;

        Ok(Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Read a whole collection. Unset or corrupt data reads as empty; only a
    /// failing database surfaces as an error.
    pub async fn get_all<R>(&self, collection: &str) -> anyhow::Result<Vec<R>>
    where
        R: DeserializeOwned,
    {
        let row = sqlx::query(
            r#"
            SELECT data
            FROM collections
            WHERE name = ?1
            "#,
        )
        .bind(collection)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to read collection {collection} from cache"))?;

        let Some(row) = row else {
            return Ok(Vec::new());
        };

        let data: String = row.try_get("data")?;
        Ok(decode_collection(collection, &data))
    }

    /// Overwrite a whole collection.
    pub async fn set_all<R>(&self, collection: &str, records: &[R]) -> anyhow::Result<()>
    where
        R: Serialize,
    {
        let _guard = self.write_lock.lock().await;
        self.write(collection, records).await
    }

    /// Read-modify-write a collection under the cache write lock. The result is
    /// persisted before this returns.
    pub async fn modify<R, T, F>(&self, collection: &str, f: F) -> anyhow::Result<T>
    where
        R: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<R>) -> T,
    {
        let _guard = self.write_lock.lock().await;
        let mut records: Vec<R> = self.get_all(collection).await?;
        let result = f(&mut records);
        self.write(collection, &records).await?;
        Ok(result)
    }

    /// Drop a collection entirely (reads as empty afterwards).
    pub async fn clear(&self, collection: &str) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        sqlx::query(
            r#"
            DELETE FROM collections
            WHERE name = ?1
            "#,
        )
        .bind(collection)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to clear collection {collection}"))?;
        Ok(())
    }

    async fn write<R>(&self, collection: &str, records: &[R]) -> anyhow::Result<()>
    where
        R: Serialize,
    {
        let payload =
            serde_json::to_string(records).context("failed to serialize collection for cache")?;
        self.write_raw(collection, &payload).await
    }

    async fn write_raw(&self, collection: &str, payload: &str) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO collections (name, data, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(name)
            DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection)
        .bind(payload)
        .bind(&now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write collection {collection} to cache"))?;

        tracing::debug!(collection, bytes = payload.len(), "collection persisted");
        Ok(())
    }

    /// Store a raw payload, bypassing serialization.
    #[cfg(test)]
    pub(crate) async fn put_raw(&self, collection: &str, payload: &str) -> anyhow::Result<()> {
        self.write_raw(collection, payload).await
    }
}

fn decode_collection<R>(collection: &str, data: &str) -> Vec<R>
where
    R: DeserializeOwned,
{
    let rows: Vec<Value> = match serde_json::from_str(data) {
        Ok(rows) => rows,
        Err(err) => {
            tracing::warn!(collection, error = %err, "cached collection is corrupt; treating as empty");
            return Vec::new();
        }
    };

    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(collection, error = %err, "dropping undecodable cached record");
                None
            }
        })
        .collect()
}

/// Resolve the default cache database path:
/// `{app_data_dir}/sheetsync/cache.db`.
pub fn default_cache_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    let mut path = base;
    path.push("sheetsync");
    path.push("cache.db");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: String,
        n: u32,
    }

    fn row(id: &str, n: u32) -> Row {
        Row { id: id.to_string(), n }
    }

    #[tokio::test]
    async fn unset_collection_reads_empty() {
        let cache = LocalCache::in_memory().await.unwrap();
        let rows: Vec<Row> = cache.get_all("installationReports").await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn set_all_overwrites_per_collection() {
        let cache = LocalCache::in_memory().await.unwrap();
        cache.set_all("a", &[row("1", 1), row("2", 2)]).await.unwrap();
        cache.set_all("b", &[row("9", 9)]).await.unwrap();
        cache.set_all("a", &[row("3", 3)]).await.unwrap();

        let a: Vec<Row> = cache.get_all("a").await.unwrap();
        let b: Vec<Row> = cache.get_all("b").await.unwrap();
        assert_eq!(a, vec![row("3", 3)]);
        assert_eq!(b, vec![row("9", 9)]);
    }

    #[tokio::test]
    async fn corrupt_payload_reads_empty() {
        let cache = LocalCache::in_memory().await.unwrap();
        cache.put_raw("a", "not json at all").await.unwrap();
        let rows: Vec<Row> = cache.get_all("a").await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn undecodable_rows_are_skipped() {
        let cache = LocalCache::in_memory().await.unwrap();
        cache
            .put_raw("a", r#"[{"id":"1","n":1},{"id":2},{"id":"3","n":3}]"#)
            .await
            .unwrap();
        let rows: Vec<Row> = cache.get_all("a").await.unwrap();
        assert_eq!(rows, vec![row("1", 1), row("3", 3)]);
    }

    #[tokio::test]
    async fn modify_persists_and_returns_closure_result() {
        let cache = LocalCache::in_memory().await.unwrap();
        cache.set_all("a", &[row("1", 1)]).await.unwrap();

        let len = cache
            .modify("a", |rows: &mut Vec<Row>| {
                rows.push(row("2", 2));
                rows.len()
            })
            .await
            .unwrap();
        assert_eq!(len, 2);

        let rows: Vec<Row> = cache.get_all("a").await.unwrap();
        assert_eq!(rows, vec![row("1", 1), row("2", 2)]);

        cache.clear("a").await.unwrap();
        let rows: Vec<Row> = cache.get_all("a").await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn concurrent_modifications_are_not_lost() {
        let cache = LocalCache::in_memory().await.unwrap();
        let mut handles = Vec::new();
        for n in 0..16u32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .modify("a", move |rows: &mut Vec<Row>| rows.push(row(&n.to_string(), n)))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let rows: Vec<Row> = cache.get_all("a").await.unwrap();
        assert_eq!(rows.len(), 16);
    }

    #[tokio::test]
    async fn file_backed_cache_survives_reopen() {
        let path = std::env::temp_dir().join(format!(
            "sheetsync-cache-{}.db",
            sheetsync_core::RecordId::generate()
        ));

        {
            let cache = LocalCache::open(&path).await.unwrap();
            cache.set_all("a", &[row("1", 1)]).await.unwrap();
        }

        let reopened = LocalCache::open(&path).await.unwrap();
        let rows: Vec<Row> = reopened.get_all("a").await.unwrap();
        assert_eq!(rows, vec![row("1", 1)]);

        drop(reopened);
        let _ = std::fs::remove_file(&path);
    }
}
