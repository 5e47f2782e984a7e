use crate::timefmt;
use crate::types::{FeedmailError, PersistedRecord, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Row, Sqlite, Transaction};
use tracing::{debug, info};

/// A per-item unit of work: lookup plus its paired mutation commit together.
pub type StoreTx<'a> = Transaction<'a, Sqlite>;

/// Durable URL -> last-known-update mapping over a single SQLite table.
///
/// One row per URL ever seen. Rows are inserted on first sighting, updated in
/// place when a strictly newer timestamp is observed, and never deleted here.
/// The table name comes from configuration, so every query is built against a
/// validated identifier rather than a bound parameter.
#[derive(Debug)]
pub struct RecordStore {
    db: SqlitePool,
    table: String,
}

impl RecordStore {
    pub async fn connect(location: &str, table: &str) -> Result<Self> {
        validate_table_name(table)?;

        let options = SqliteConnectOptions::new()
            .filename(location)
            .create_if_missing(true);

        // Item volumes are small; a single connection keeps lookup-then-mutate
        // sequences from interleaving inside SQLite itself.
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        info!("Connected to record store at {} (table: {})", location, table);

        Ok(Self {
            db,
            table: table.to_string(),
        })
    }

    /// Creates the backing table if it does not exist. Idempotent; safe to
    /// call from every feed task on startup.
    pub async fn ensure_schema(&self) -> Result<()> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                "update" TEXT NOT NULL,
                update_date TEXT NOT NULL
            )
            "#,
            self.table
        );

        sqlx::query(&ddl).execute(&self.db).await?;
        debug!("Ensured schema for table {}", self.table);
        Ok(())
    }

    /// Opens a transaction scoping one item's lookup and mutation.
    pub async fn begin(&self) -> Result<StoreTx<'_>> {
        Ok(self.db.begin().await?)
    }

    pub async fn find_by_url(&self, url: &str) -> Result<Option<PersistedRecord>> {
        self.find_by_url_on(&self.db, url).await
    }

    pub async fn find_by_url_in(
        &self,
        tx: &mut StoreTx<'_>,
        url: &str,
    ) -> Result<Option<PersistedRecord>> {
        self.find_by_url_on(&mut **tx, url).await
    }

    async fn find_by_url_on<'c, E>(&self, executor: E, url: &str) -> Result<Option<PersistedRecord>>
    where
        E: sqlx::Executor<'c, Database = Sqlite>,
    {
        let sql = format!(
            r#"SELECT id, url, "update", update_date FROM {} WHERE url = ?"#,
            self.table
        );

        let row = sqlx::query(&sql).bind(url).fetch_optional(executor).await?;

        match row {
            Some(row) => {
                let last_update: String = row.try_get("update")?;
                let recorded_at: String = row.try_get("update_date")?;
                Ok(Some(PersistedRecord {
                    id: row.try_get("id")?,
                    url: row.try_get("url")?,
                    last_update: timefmt::from_store_string(&last_update)?,
                    recorded_at: timefmt::from_store_string(&recorded_at)?,
                }))
            }
            None => Ok(None),
        }
    }

    /// Inserts a fresh record and returns its id. A unique violation on the
    /// URL column surfaces as `DuplicateUrl` so callers can tell a lost race
    /// apart from a real store failure.
    pub async fn insert(
        &self,
        url: &str,
        last_update: DateTime<Utc>,
        recorded_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.insert_on(&self.db, url, last_update, recorded_at).await
    }

    pub async fn insert_in(
        &self,
        tx: &mut StoreTx<'_>,
        url: &str,
        last_update: DateTime<Utc>,
        recorded_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.insert_on(&mut **tx, url, last_update, recorded_at).await
    }

    async fn insert_on<'c, E>(
        &self,
        executor: E,
        url: &str,
        last_update: DateTime<Utc>,
        recorded_at: DateTime<Utc>,
    ) -> Result<i64>
    where
        E: sqlx::Executor<'c, Database = Sqlite>,
    {
        let sql = format!(
            r#"INSERT INTO {} (url, "update", update_date) VALUES (?, ?, ?)"#,
            self.table
        );

        let result = sqlx::query(&sql)
            .bind(url)
            .bind(timefmt::to_store_string(last_update))
            .bind(timefmt::to_store_string(recorded_at))
            .execute(executor)
            .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(FeedmailError::DuplicateUrl {
                    url: url.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_last_seen(
        &self,
        id: i64,
        last_update: DateTime<Utc>,
        recorded_at: DateTime<Utc>,
    ) -> Result<()> {
        self.update_last_seen_on(&self.db, id, last_update, recorded_at)
            .await
    }

    pub async fn update_last_seen_in(
        &self,
        tx: &mut StoreTx<'_>,
        id: i64,
        last_update: DateTime<Utc>,
        recorded_at: DateTime<Utc>,
    ) -> Result<()> {
        self.update_last_seen_on(&mut **tx, id, last_update, recorded_at)
            .await
    }

    async fn update_last_seen_on<'c, E>(
        &self,
        executor: E,
        id: i64,
        last_update: DateTime<Utc>,
        recorded_at: DateTime<Utc>,
    ) -> Result<()>
    where
        E: sqlx::Executor<'c, Database = Sqlite>,
    {
        let sql = format!(
            r#"UPDATE {} SET "update" = ?, update_date = ? WHERE id = ?"#,
            self.table
        );

        let done = sqlx::query(&sql)
            .bind(timefmt::to_store_string(last_update))
            .bind(timefmt::to_store_string(recorded_at))
            .bind(id)
            .execute(executor)
            .await?;

        if done.rows_affected() == 0 {
            return Err(FeedmailError::Store(sqlx::Error::RowNotFound));
        }

        Ok(())
    }
}

fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if !valid {
        return Err(FeedmailError::Config(format!(
            "invalid store table name: {:?}",
            table
        )));
    }

    Ok(())
}
