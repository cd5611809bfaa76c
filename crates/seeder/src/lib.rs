//! Environment-aware, idempotent database seeding.
//!
//! Seeders are discovered from a directory (or registered in code), ordered
//! by natural name order and executed one at a time by a [`SeedRunner`]. With
//! run tracking on, every completed seeder is recorded in a history store and
//! skipped on later runs.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use seeder::prelude::*;
//!
//! let pool = PgPool::connect(&database_url).await?;
//!
//! let seeders = discover_seeders("./seeders", "*.sql", &SqlScriptLoader).await?;
//! let summary = SeedRunner::new(pool, SeedRunnerConfig::default().environment("staging"))
//!     .run(&seeders)
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod db;
pub mod discovery;
pub mod errors;
pub mod history;
pub mod logger;
pub mod ordering;
pub mod runner;
pub mod seeder;
pub mod sql;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use client::SeedClient;
pub use config::{RunSettings, SeedConfig, SeedRunnerConfig};
pub use db::PgHistoryStore;
pub use discovery::{
    DirectorySource, LoadedUnit, SeederRegistry, SeederSource, StaticLoader, UnitExport,
    UnitLoader, discover_seeders,
};
pub use errors::{ConfigError, DiscoveryError, HistoryError, RunError, SeedError};
pub use history::{HistoryStore, MemoryHistoryStore, NewSeedRun, SeedRunRecord};
pub use logger::{SeedLogger, TracingLogger};
pub use ordering::{compare_names, matches_pattern};
pub use runner::{RunSummary, SeedRunner, SeederOutcome, SeederStatus, SkipReason, run_seeders};
pub use seeder::{SeedAction, Seeder};
pub use sql::{SqlExecutor, SqlScriptLoader};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::SeedClient;
    pub use crate::config::SeedRunnerConfig;
    pub use crate::discovery::{SeederRegistry, SeederSource, discover_seeders};
    pub use crate::history::HistoryStore;
    pub use crate::runner::{RunSummary, SeedRunner};
    pub use crate::seeder::{SeedAction, Seeder};
    pub use crate::sql::SqlScriptLoader;
    pub use sqlx::PgPool;
}
