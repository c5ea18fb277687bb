//! Schema, migrations, and FTS synchronization.
//!
//! Owns opening the two mirror databases (mail, calendar) under WAL
//! journalling with a non-trivial busy timeout, applying migrations in
//! order, and keeping each content table's FTS5 shadow table in lockstep
//! via triggers.

pub mod migrations;

use migrations::Migration;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to open mirror database at {path}: {cause}")]
    Open { path: String, cause: String },

    #[error("failed to apply migration '{migration}': {cause}")]
    Migrate { migration: String, cause: String },
}

impl SchemaError {
    fn open(path: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Open {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    fn migrate(migration: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Migrate {
            migration: migration.into(),
            cause: cause.to_string(),
        }
    }
}

/// Which mirror database is being opened; determines which migration set
/// and FTS schema applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    Mail,
    Calendar,
}

/// Opens `path` with WAL journalling and a five-second busy timeout, then
/// applies all pending migrations for `kind` in order. On success the
/// schema is guaranteed to be at `current_version`.
pub async fn initialize(path: &Path, kind: DbKind) -> Result<SqlitePool, SchemaError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SchemaError::open(path.display().to_string(), e))?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .map_err(|e| SchemaError::open(path.display().to_string(), e))?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .map_err(|e| SchemaError::open(path.display().to_string(), e))?;

    apply_migrations(&pool, migrations::for_kind(kind)).await?;

    Ok(pool)
}

/// Opens an in-memory mirror database for tests.
pub async fn initialize_in_memory(kind: DbKind) -> Result<SqlitePool, SchemaError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(|e| SchemaError::open(":memory:", e))?;
    apply_migrations(&pool, migrations::for_kind(kind)).await?;
    Ok(pool)
}

async fn ensure_migration_table(pool: &SqlitePool) -> Result<(), SchemaError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _schema_migrations (
            name TEXT PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| SchemaError::migrate("_schema_migrations", e))?;
    Ok(())
}

async fn apply_migrations(pool: &SqlitePool, migrations: &[Migration]) -> Result<(), SchemaError> {
    ensure_migration_table(pool).await?;

    for migration in migrations {
        let already_applied: Option<(String,)> =
            sqlx::query_as("SELECT name FROM _schema_migrations WHERE name = ?")
                .bind(migration.name)
                .fetch_optional(pool)
                .await
                .map_err(|e| SchemaError::migrate(migration.name, e))?;

        if already_applied.is_some() {
            continue;
        }

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| SchemaError::migrate(migration.name, e))?;

        for statement in split_statements(migration.up_sql) {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| SchemaError::migrate(migration.name, e))?;
        }

        sqlx::query("INSERT INTO _schema_migrations (name, applied_at) VALUES (?, strftime('%s','now'))")
            .bind(migration.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| SchemaError::migrate(migration.name, e))?;

        tx.commit()
            .await
            .map_err(|e| SchemaError::migrate(migration.name, e))?;
    }

    Ok(())
}

fn split_statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty())
}

/// Drops and repopulates the FTS5 shadow tables from their content
/// tables. Never part of the steady-state sync path; only invoked
/// explicitly for recovery.
pub async fn rebuild_fts(pool: &SqlitePool, kind: DbKind) -> Result<(), SchemaError> {
    let (fts_table, rebuild_cmd) = match kind {
        DbKind::Mail => ("mail_messages_fts", "mail_messages_fts"),
        DbKind::Calendar => ("events_fts", "events_fts"),
    };
    sqlx::query(&format!(
        "INSERT INTO {fts_table}({rebuild_cmd}) VALUES('rebuild')"
    ))
    .execute(pool)
    .await
    .map_err(|e| SchemaError::migrate(format!("rebuild_fts:{fts_table}"), e))?;
    Ok(())
}
