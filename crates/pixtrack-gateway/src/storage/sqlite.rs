//! SQLite counter store.
//!
//! Several connections to one WAL database, picked round-robin. Each
//! statement autocommits; every operation touches a single row except the
//! admin batches, which run in one transaction. Blocking calls are moved off
//! the async workers with `spawn_blocking`.
//!
//! The create race is settled by `UNIQUE(event, source)`: whoever loses the
//! INSERT gets `SQLITE_CONSTRAINT` and falls back to the UPDATE path. Other
//! processes sharing the file go through the same constraint, so no
//! in-process lock is involved.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{
    params, params_from_iter, Connection, ErrorCode, OptionalExtension, TransactionBehavior,
};

use pixtrack_core::counter::{
    datetime_from_millis, now_millis, Counter, CounterFilter, CounterKey,
};
use pixtrack_core::error::{Result, StoreFailure, TrackerError};
use pixtrack_core::store::{batch_keys, CounterStore, HitOutcome};

use crate::config::StorageSection;

const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS counters (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  event TEXT NOT NULL CHECK (length(event) BETWEEN 1 AND 120),
  source TEXT NOT NULL DEFAULT '' CHECK (length(source) <= 120),
  count INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0),
  updated_at_ms INTEGER NOT NULL,
  UNIQUE (event, source)
);

CREATE INDEX IF NOT EXISTS idx_counters_source ON counters(source);
"#;

const INCREMENT_SQL: &str = "UPDATE counters \
     SET count = count + 1, updated_at_ms = MAX(updated_at_ms, ?3) \
     WHERE event = ?1 AND source = ?2";

const INSERT_SQL: &str =
    "INSERT INTO counters (event, source, count, updated_at_ms) VALUES (?1, ?2, 1, ?3)";

const RESET_SQL: &str = "UPDATE counters \
     SET count = 0, updated_at_ms = MAX(updated_at_ms, ?3) \
     WHERE event = ?1 AND source = ?2";

struct Pool {
    connections: Vec<Mutex<Connection>>,
    cursor: AtomicUsize,
}

impl Pool {
    fn next(&self) -> &Mutex<Connection> {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        &self.connections[i]
    }
}

#[derive(Clone)]
pub struct SqliteCounterStore {
    pool: Arc<Pool>,
}

impl SqliteCounterStore {
    /// Open (or create) the database and bootstrap the schema.
    pub fn open(cfg: &StorageSection) -> Result<Self> {
        let path = PathBuf::from(&cfg.path);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                TrackerError::storage(StoreFailure::Other, format!("create {}: {e}", dir.display()))
            })?;
        }

        let busy_timeout = Duration::from_millis(cfg.busy_timeout_ms);
        let size = cfg.pool_size.max(1);
        let mut connections = Vec::with_capacity(size);

        let mut first = open_connection(&path, busy_timeout)?;
        bootstrap(&mut first)?;
        connections.push(Mutex::new(first));
        for _ in 1..size {
            connections.push(Mutex::new(open_connection(&path, busy_timeout)?));
        }

        tracing::info!(path = %path.display(), pool_size = size, "sqlite counter store ready");
        Ok(Self {
            pool: Arc::new(Pool {
                connections,
                cursor: AtomicUsize::new(0),
            }),
        })
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .next()
                .lock()
                .map_err(|_| TrackerError::storage(StoreFailure::Other, "connection mutex poisoned"))?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| TrackerError::Internal(format!("sqlite {op} task failed: {e}")))?
    }
}

#[async_trait]
impl CounterStore for SqliteCounterStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn record_hit(&self, key: &CounterKey) -> Result<HitOutcome> {
        if !key.is_recordable() {
            return Ok(HitOutcome::Skipped);
        }
        let key = key.clone();
        self.run("record_hit", move |conn| record_hit(conn, &key, now_millis()))
            .await
    }

    async fn increment(&self, key: &CounterKey) -> Result<bool> {
        let key = key.clone();
        self.run("increment", move |conn| increment(conn, &key, now_millis()))
            .await
    }

    async fn list_counters(&self, filter: &CounterFilter) -> Result<Vec<Counter>> {
        let filter = filter.clone();
        self.run("list_counters", move |conn| list_counters(conn, &filter))
            .await
    }

    async fn reset_counters(&self, keys: &[CounterKey]) -> Result<u64> {
        let keys = batch_keys(keys);
        self.run("reset_counters", move |conn| {
            update_batch(conn, RESET_SQL, &keys, now_millis())
        })
        .await
    }

    async fn bump_counters(&self, keys: &[CounterKey]) -> Result<u64> {
        let keys = batch_keys(keys);
        self.run("bump_counters", move |conn| {
            update_batch(conn, INCREMENT_SQL, &keys, now_millis())
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.run("ping", |conn| conn.query_row("SELECT 1", [], |_| Ok(())).map_err(sql_error))
            .await
    }
}

fn open_connection(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    let conn = Connection::open(path).map_err(sql_error)?;
    conn.busy_timeout(busy_timeout).map_err(sql_error)?;
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
        "#,
    )
    .map_err(sql_error)?;
    Ok(conn)
}

fn bootstrap(conn: &mut Connection) -> Result<()> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(sql_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(sql_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(sql_error)?;
    match version {
        None => {
            tx.execute_batch(SCHEMA).map_err(sql_error)?;
            tx.execute(
                "INSERT INTO store_meta (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(sql_error)?;
        }
        Some(v) if v == SCHEMA_VERSION => {}
        Some(v) => {
            return Err(TrackerError::storage(
                StoreFailure::Other,
                format!("unsupported schema version {v} (expected {SCHEMA_VERSION})"),
            ));
        }
    }
    tx.commit().map_err(sql_error)
}

fn record_hit(conn: &Connection, key: &CounterKey, now_ms: i64) -> Result<HitOutcome> {
    if increment(conn, key, now_ms)? {
        return Ok(HitOutcome::Incremented);
    }

    let inserted = conn
        .prepare_cached(INSERT_SQL)
        .and_then(|mut stmt| stmt.execute(params![key.event, key.source, now_ms]));
    match inserted {
        Ok(_) => Ok(HitOutcome::Created),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            // Someone created the row between our UPDATE and INSERT.
            if increment(conn, key, now_ms)? {
                Ok(HitOutcome::Incremented)
            } else {
                Err(TrackerError::storage(
                    StoreFailure::Conflict,
                    "insert conflicted but no row matched",
                ))
            }
        }
        Err(e) => Err(sql_error(e)),
    }
}

fn increment(conn: &Connection, key: &CounterKey, now_ms: i64) -> Result<bool> {
    let changed = conn
        .prepare_cached(INCREMENT_SQL)
        .and_then(|mut stmt| stmt.execute(params![key.event, key.source, now_ms]))
        .map_err(sql_error)?;
    Ok(changed > 0)
}

fn list_counters(conn: &Connection, filter: &CounterFilter) -> Result<Vec<Counter>> {
    let mut clauses = Vec::new();
    let mut values = Vec::new();
    if let Some(source) = &filter.source {
        values.push(source.clone());
        clauses.push(format!("source = ?{}", values.len()));
    }
    if let Some(event) = &filter.event {
        values.push(event.clone());
        clauses.push(format!("event = ?{}", values.len()));
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    // Limit is bounded by LIST_LIMIT, safe to inline.
    let sql = format!(
        "SELECT event, source, count, updated_at_ms FROM counters {where_sql} \
         ORDER BY count DESC, event ASC, source ASC LIMIT {}",
        filter.effective_limit()
    );

    let mut stmt = conn.prepare_cached(&sql).map_err(sql_error)?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })
        .map_err(sql_error)?;

    let mut out = Vec::new();
    for row in rows {
        let (event, source, count, updated_at_ms) = row.map_err(sql_error)?;
        let count = u64::try_from(count).map_err(|_| {
            TrackerError::storage(
                StoreFailure::Other,
                format!("negative count {count} for {event}/{source}"),
            )
        })?;
        out.push(Counter {
            event,
            source,
            count,
            updated_at: datetime_from_millis(updated_at_ms)?,
        });
    }
    Ok(out)
}

fn update_batch(conn: &mut Connection, sql: &str, keys: &[CounterKey], now_ms: i64) -> Result<u64> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(sql_error)?;
    let mut affected = 0u64;
    {
        let mut stmt = tx.prepare_cached(sql).map_err(sql_error)?;
        for key in keys {
            let changed = stmt
                .execute(params![key.event, key.source, now_ms])
                .map_err(sql_error)?;
            affected += changed as u64;
        }
    }
    tx.commit().map_err(sql_error)?;
    Ok(affected)
}

fn sql_error(err: rusqlite::Error) -> TrackerError {
    let kind = match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => StoreFailure::Conflict,
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => StoreFailure::Busy,
        _ => StoreFailure::Other,
    };
    TrackerError::storage(kind, err)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn memory_conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        bootstrap(&mut conn).unwrap();
        conn
    }

    fn count_of(conn: &Connection, key: &CounterKey) -> Option<i64> {
        conn.query_row(
            "SELECT count FROM counters WHERE event = ?1 AND source = ?2",
            params![key.event, key.source],
            |row| row.get(0),
        )
        .optional()
        .unwrap()
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let mut conn = memory_conn();
        bootstrap(&mut conn).unwrap();
        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM store_meta", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn unknown_schema_version_is_rejected() {
        let mut conn = memory_conn();
        conn.execute("UPDATE store_meta SET version = 99", []).unwrap();
        let err = bootstrap(&mut conn).unwrap_err();
        assert_eq!(err.store_failure(), Some(StoreFailure::Other));
    }

    #[test]
    fn create_then_increment() {
        let conn = memory_conn();
        let key = CounterKey::new("signup", "landing");
        assert_eq!(record_hit(&conn, &key, 1_000).unwrap(), HitOutcome::Created);
        assert_eq!(count_of(&conn, &key), Some(1));
        assert_eq!(record_hit(&conn, &key, 2_000).unwrap(), HitOutcome::Incremented);
        assert_eq!(count_of(&conn, &key), Some(2));
    }

    #[test]
    fn duplicate_insert_hits_the_unique_constraint() {
        let conn = memory_conn();
        conn.execute(INSERT_SQL, params!["signup", "", 1_000]).unwrap();
        let err = conn
            .execute(INSERT_SQL, params!["signup", "", 1_000])
            .map_err(sql_error)
            .unwrap_err();
        assert_eq!(err.store_failure(), Some(StoreFailure::Conflict));
    }

    #[test]
    fn updated_at_never_moves_backwards() {
        let conn = memory_conn();
        let key = CounterKey::new("signup", "");
        record_hit(&conn, &key, 5_000).unwrap();
        // clock stepped back
        record_hit(&conn, &key, 4_000).unwrap();
        let ts: i64 = conn
            .query_row("SELECT updated_at_ms FROM counters", [], |row| row.get(0))
            .unwrap();
        assert_eq!(ts, 5_000);
    }

    #[test]
    fn list_applies_filters_order_and_limit() {
        let conn = memory_conn();
        for (event, source, count) in [("a", "", 5), ("b", "", 10), ("c", "x", 7), ("a", "x", 1)] {
            conn.execute(
                "INSERT INTO counters (event, source, count, updated_at_ms) VALUES (?1, ?2, ?3, 0)",
                params![event, source, count],
            )
            .unwrap();
        }

        let all = list_counters(&conn, &CounterFilter::default()).unwrap();
        let got: Vec<_> = all.iter().map(|c| (c.event.as_str(), c.count)).collect();
        assert_eq!(got, [("b", 10), ("c", 7), ("a", 5), ("a", 1)]);

        let x = list_counters(&conn, &CounterFilter::default().with_source("x")).unwrap();
        assert_eq!(x.len(), 2);
        assert!(x.iter().all(|c| c.source == "x"));

        let both = list_counters(&conn, &CounterFilter::from_raw(Some("x"), Some("a"))).unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].count, 1);

        let top = list_counters(&conn, &CounterFilter::default().with_limit(2)).unwrap();
        assert_eq!(top.len(), 2);
    }
}
