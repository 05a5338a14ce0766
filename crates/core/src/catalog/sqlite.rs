//! SQLite-backed show catalog implementation.
//!
//! Imports are written into a staging table in batches and published by a
//! single transaction that drops the live table and renames the staging
//! table in its place. The connection lock is only held per batch and for
//! the swap, so queries keep answering from the previous snapshot while a
//! new one is being staged.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::{
    CatalogError, CatalogStats, CatalogStore, ImportSummary, NewShow, Show, ShowFilter, ShowId,
    SortKey, SortOrder,
};
use crate::metrics::{CATALOG_IMPORT_DURATION, CATALOG_SHOWS_IMPORTED};

/// Rows inserted per staging transaction.
const IMPORT_BATCH_SIZE: usize = 10_000;

const SHOW_COLUMNS: &str = "id, channel, topic, title, description, website, date, time, \
                            duration, url, url_small, url_large";

/// SQLite-backed show catalog.
pub struct SqliteCatalogStore {
    conn: Mutex<Connection>,
    /// Serializes imports so that only one staging table exists at a time.
    import_lock: Mutex<()>,
    /// Generation of the published snapshot, mirrored from `catalog_meta`.
    generation: AtomicU64,
}

impl SqliteCatalogStore {
    /// Open (or create) a catalog database file.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Create an in-memory catalog (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CatalogError> {
        Self::initialize_schema(&conn)?;
        let generation: i64 = conn.query_row(
            "SELECT generation FROM catalog_meta WHERE singleton = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            import_lock: Mutex::new(()),
            generation: AtomicU64::new(generation as u64),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        // Tables from before title folding are dropped; the next sync refills them.
        let has_shows: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'shows'",
            [],
            |row| row.get(0),
        )?;
        let has_folded_title: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM pragma_table_info('shows') WHERE name = 'title_folded'",
            [],
            |row| row.get(0),
        )?;
        if has_shows && !has_folded_title {
            info!("Dropping catalog table without folded titles");
            conn.execute_batch("DROP TABLE shows;")?;
        }

        conn.execute_batch(&format!(
            r#"
            {}

            -- Snapshot bookkeeping (single row)
            CREATE TABLE IF NOT EXISTS catalog_meta (
                singleton INTEGER PRIMARY KEY CHECK (singleton = 0),
                generation INTEGER NOT NULL,
                next_id INTEGER NOT NULL,
                imported_at TEXT
            );

            INSERT OR IGNORE INTO catalog_meta (singleton, generation, next_id, imported_at)
            VALUES (0, 0, 1, NULL);

            DROP TABLE IF EXISTS shows_staging;
            "#,
            create_show_table_sql("shows", true)
        ))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Internal("catalog connection lock poisoned".to_string()))
    }

    fn row_to_show(row: &rusqlite::Row) -> rusqlite::Result<Show> {
        let date: i64 = row.get(6)?;
        let time: u32 = row.get(7)?;

        Ok(Show {
            id: ShowId(row.get(0)?),
            channel: row.get(1)?,
            topic: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            website: row.get(5)?,
            date: day_number_to_date(date),
            time: NaiveTime::from_num_seconds_from_midnight_opt(time, 0).unwrap_or(NaiveTime::MIN),
            duration_secs: row.get(8)?,
            url: row.get(9)?,
            url_small: row.get(10)?,
            url_large: row.get(11)?,
        })
    }

    fn stage_batch(
        &self,
        batch: &[NewShow],
        first_id: i64,
    ) -> Result<(), CatalogError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO shows_staging ({SHOW_COLUMNS}, title_folded)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ))?;

            for (offset, show) in batch.iter().enumerate() {
                stmt.execute(params![
                    first_id + offset as i64,
                    &show.channel,
                    &show.topic,
                    &show.title,
                    &show.description,
                    &show.website,
                    date_to_day_number(show.date),
                    show.time.num_seconds_from_midnight(),
                    show.duration_secs,
                    &show.url,
                    &show.url_small,
                    &show.url_large,
                    show.title.to_lowercase(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn replace_all(&self, shows: Vec<NewShow>) -> Result<ImportSummary, CatalogError> {
        let _import = self
            .import_lock
            .lock()
            .map_err(|_| CatalogError::Internal("catalog import lock poisoned".to_string()))?;
        let started = Instant::now();

        let (generation, first_id) = {
            let conn = self.conn()?;
            let (generation, next_id): (i64, i64) = conn.query_row(
                "SELECT generation, next_id FROM catalog_meta WHERE singleton = 0",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            conn.execute_batch(&format!(
                "DROP TABLE IF EXISTS shows_staging; {}",
                create_show_table_sql("shows_staging", false)
            ))?;
            (generation + 1, next_id)
        };

        let mut staged = 0usize;
        for batch in shows.chunks(IMPORT_BATCH_SIZE) {
            self.stage_batch(batch, first_id + staged as i64)?;
            staged += batch.len();
            debug!(staged, total = shows.len(), "Staged catalog batch");
        }

        // Indices are named per generation so they never clash with the ones
        // still attached to the live table.
        {
            let conn = self.conn()?;
            conn.execute_batch(&create_show_indices_sql("shows_staging", generation))?;
        }

        {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            tx.execute_batch(
                "DROP TABLE shows;
                 ALTER TABLE shows_staging RENAME TO shows;",
            )?;
            tx.execute(
                "UPDATE catalog_meta SET generation = ?1, next_id = ?2, imported_at = ?3
                 WHERE singleton = 0",
                params![
                    generation,
                    first_id + staged as i64,
                    Utc::now().to_rfc3339()
                ],
            )?;
            tx.commit()?;
        }
        self.generation.store(generation as u64, Ordering::SeqCst);

        CATALOG_SHOWS_IMPORTED.inc_by(staged as u64);
        CATALOG_IMPORT_DURATION.observe(started.elapsed().as_secs_f64());
        info!(
            generation,
            shows = staged,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Catalog snapshot replaced"
        );

        Ok(ImportSummary {
            generation: generation as u64,
            shows: staged as u64,
        })
    }

    fn query_ids(
        &self,
        filter: &ShowFilter,
        sort_key: SortKey,
        sort_order: SortOrder,
    ) -> Result<Vec<ShowId>, CatalogError> {
        let conn = self.conn()?;
        // Titles are matched against their Unicode lowercase form; LIKE alone
        // only folds ASCII letters.
        let title_pattern = format!("%{}%", escape_like(&filter.title.to_lowercase()));

        let mut stmt = conn.prepare(&format!(
            "SELECT id FROM shows
             WHERE (?1 = '' OR channel = ?1)
               AND (?2 = '' OR topic = ?2)
               AND (?3 = '' OR title_folded LIKE ?4 ESCAPE '\\')
             ORDER BY {column} {order}, id {order}",
            column = sort_key.column(),
            order = sort_order.keyword(),
        ))?;

        let rows = stmt.query_map(
            params![&filter.channel, &filter.topic, &filter.title, &title_pattern],
            |row| row.get::<_, i64>(0),
        )?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(ShowId(row?));
        }
        Ok(ids)
    }

    fn fetch(&self, id: ShowId) -> Result<Show, CatalogError> {
        let conn = self.conn()?;

        conn.query_row(
            &format!("SELECT {SHOW_COLUMNS} FROM shows WHERE id = ?"),
            params![id.0],
            Self::row_to_show,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => CatalogError::NotFound(id),
            _ => CatalogError::Database(e.to_string()),
        })
    }

    fn distinct_channels(&self) -> Result<Vec<String>, CatalogError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT DISTINCT channel FROM shows ORDER BY channel")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut channels = vec![super::ANY.to_string()];
        for row in rows {
            channels.push(row?);
        }
        Ok(channels)
    }

    fn distinct_topics(&self, channel: &str) -> Result<Vec<String>, CatalogError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT topic FROM shows WHERE (?1 = '' OR channel = ?1) ORDER BY topic",
        )?;
        let rows = stmt.query_map(params![channel], |row| row.get::<_, String>(0))?;

        let mut topics = vec![super::ANY.to_string()];
        for row in rows {
            topics.push(row?);
        }
        Ok(topics)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let conn = self.conn()?;

        let total_shows: u64 = conn.query_row("SELECT COUNT(*) FROM shows", [], |row| row.get(0))?;

        let (generation, imported_at): (u64, Option<String>) = conn
            .query_row(
                "SELECT generation, imported_at FROM catalog_meta WHERE singleton = 0",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .unwrap_or((0, None));

        let imported_at = imported_at
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(CatalogStats {
            total_shows,
            generation,
            imported_at,
        })
    }
}

fn create_show_table_sql(table: &str, if_not_exists: bool) -> String {
    let guard = if if_not_exists { "IF NOT EXISTS " } else { "" };
    format!(
        "CREATE TABLE {guard}{table} (
            id INTEGER PRIMARY KEY,
            channel TEXT NOT NULL,
            topic TEXT NOT NULL,
            title TEXT NOT NULL,
            title_folded TEXT NOT NULL,
            description TEXT NOT NULL,
            website TEXT NOT NULL,
            date INTEGER NOT NULL,
            time INTEGER NOT NULL,
            duration INTEGER NOT NULL,
            url TEXT,
            url_small TEXT,
            url_large TEXT
        );"
    )
}

fn create_show_indices_sql(table: &str, generation: i64) -> String {
    let mut sql = String::new();
    for (name, columns) in [
        ("channel", "channel, topic"),
        ("topic", "topic"),
        ("title", "title"),
        ("date", "date"),
        ("time", "time"),
        ("duration", "duration"),
    ] {
        sql.push_str(&format!(
            "CREATE INDEX idx_shows_g{generation}_{name} ON {table}({columns});\n"
        ));
    }
    sql
}

fn date_to_day_number(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce())
}

fn day_number_to_date(days: i64) -> NaiveDate {
    i32::try_from(days)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .unwrap_or_default()
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
