//! Run history persisted in PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::errors::HistoryError;
use crate::history::{HistoryStore, NewSeedRun, SeedRunRecord};

/// Longest identifier PostgreSQL keeps without truncation.
const MAX_IDENTIFIER_LEN: usize = 63;

/// History store over a PostgreSQL table.
///
/// The table is named after the history model and quoted, so the default
/// model `seedRun` maps to the table `"seedRun"`.
#[derive(Debug, Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
    table: String,
}

impl PgHistoryStore {
    /// Binds a store to the table for `model`. Only plain identifiers
    /// (`[A-Za-z_][A-Za-z0-9_]*`, at most 63 bytes) are accepted.
    pub fn new(pool: PgPool, model: &str) -> Result<Self, HistoryError> {
        if !is_identifier(model) {
            return Err(HistoryError::InvalidModelName(model.to_string()));
        }
        Ok(Self {
            pool,
            table: model.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Creates the history table if it does not exist yet.
    pub async fn ensure_table(&self) -> Result<(), HistoryError> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{}" (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                environment TEXT,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            self.table
        );
        sqlx::query(&sql).execute(&self.pool).await?;

        info!("Ensured seed history table \"{}\"", self.table);
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<SeedRunRecord>, HistoryError> {
        let sql = format!(
            r#"
            SELECT id, name, environment, applied_at
            FROM "{}"
            WHERE name = $1
            "#,
            self.table
        );
        let record = sqlx::query_as::<_, SeedRunRecord>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    async fn insert(&self, run: NewSeedRun) -> Result<(), HistoryError> {
        let record = run.into_record();
        let sql = format!(
            r#"
            INSERT INTO "{}" (id, name, environment, applied_at)
            VALUES ($1, $2, $3, $4)
            "#,
            self.table
        );
        sqlx::query(&sql)
            .bind(record.id)
            .bind(&record.name)
            .bind(&record.environment)
            .bind(record.applied_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_IDENTIFIER_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
