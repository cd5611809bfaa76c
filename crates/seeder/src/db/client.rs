use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{Executor, PgPool};
use tracing::warn;

use super::PgHistoryStore;
use crate::client::SeedClient;
use crate::history::HistoryStore;
use crate::sql::SqlExecutor;

#[async_trait]
impl SeedClient for PgPool {
    fn history_store(&self, model: &str) -> Option<Arc<dyn HistoryStore>> {
        match PgHistoryStore::new(self.clone(), model) {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                warn!("Cannot bind seed history: {e}");
                None
            }
        }
    }

    async fn disconnect(&self) {
        self.close().await;
    }
}

/// Each script runs in its own transaction.
#[async_trait]
impl SqlExecutor for PgPool {
    async fn execute_script(&self, sql: &str) -> anyhow::Result<()> {
        let mut tx = self.begin().await.context("starting transaction")?;
        (&mut *tx).execute(sqlx::raw_sql(sql)).await?;
        tx.commit().await.context("committing transaction")?;
        Ok(())
    }
}
