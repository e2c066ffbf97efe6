// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use dyngrid_app::{LayoutStorage, OPEN_TABS_KEY, TabSession};
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const APP_NAME: &str = "dyngrid";

const REQUIRED_SCHEMA: &[(&str, &[&str])] =
    &[("layout_state", &["key", "value", "sha256", "updated_at"])];

/// Metadata of one persisted key, without its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub key: String,
    pub sha256: String,
    pub size_bytes: usize,
    pub updated_at: String,
}

/// SQLite-backed layout state, one row per key.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        }
        self.conn
            .execute_batch(include_str!("sql/schema.sql"))
            .context("create schema")?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM layout_state WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read layout state {key}"))
    }

    /// Upserts a value. Returns false when the stored content was already
    /// identical and nothing was written.
    pub fn put(&self, key: &str, value: &str) -> Result<bool> {
        let digest = content_digest(value);
        if self.digest(key)?.as_deref() == Some(digest.as_str()) {
            log::debug!("layout state {key} unchanged");
            return Ok(false);
        }
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO layout_state (key, value, sha256, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  sha256 = excluded.sha256,
                  updated_at = excluded.updated_at
                ",
                params![key, value, digest, now],
            )
            .with_context(|| format!("upsert layout state {key}"))?;
        Ok(true)
    }

    pub fn remove(&self, key: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM layout_state WHERE key = ?", params![key])
            .with_context(|| format!("delete layout state {key}"))?;
        Ok(changed > 0)
    }

    pub fn digest(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT sha256 FROM layout_state WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read digest of {key}"))
    }

    /// Entries whose key starts with `prefix`, ordered by key.
    pub fn entries(&self, prefix: &str) -> Result<Vec<StoredEntry>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT key, sha256, length(value), updated_at
                FROM layout_state
                WHERE substr(key, 1, length(?1)) = ?1
                ORDER BY key
                ",
            )
            .context("prepare entry listing")?;
        let rows = stmt
            .query_map(params![prefix], |row| {
                Ok(StoredEntry {
                    key: row.get(0)?,
                    sha256: row.get(1)?,
                    size_bytes: row.get::<_, i64>(2)?.max(0) as usize,
                    updated_at: row.get(3)?,
                })
            })
            .context("list layout state")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect layout state")
    }

    /// The saved tab session. A missing or unreadable session reads as empty.
    pub fn load_session(&self) -> Result<TabSession> {
        let Some(raw) = self.get(OPEN_TABS_KEY)? else {
            return Ok(TabSession::default());
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(session),
            Err(error) => {
                log::warn!("ignoring corrupt tab session: {error}");
                Ok(TabSession::default())
            }
        }
    }

    pub fn save_session(&self, session: &TabSession) -> Result<()> {
        let encoded = serde_json::to_string(session).context("encode tab session")?;
        self.put(OPEN_TABS_KEY, &encoded)?;
        Ok(())
    }
}

impl LayoutStorage for Store {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        self.get(key)
    }

    fn put_raw(&mut self, key: &str, value: &str) -> Result<()> {
        self.put(key, value)?;
        Ok(())
    }

    fn remove_raw(&mut self, key: &str) -> Result<()> {
        self.remove(key)?;
        Ok(())
    }
}

/// Lowercase hex SHA-256 of `value`.
pub fn content_digest(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut output = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

/// Digest of a JSON value in its canonical serde_json rendering. Objects
/// are key-sorted, so equal layouts hash equal.
pub fn json_digest(value: &serde_json::Value) -> Result<String> {
    let encoded = serde_json::to_string(value).context("encode json for digest")?;
    Ok(content_digest(&encoded))
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("DYNGRID_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set DYNGRID_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("dyngrid.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; point [storage].db_path at a dyngrid database"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; remove the database file to start fresh",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
