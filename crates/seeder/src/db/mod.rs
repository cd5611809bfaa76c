//! PostgreSQL integration.
//!
//! [`PgHistoryStore`] keeps run history in a table named after the history
//! model, and `sqlx::PgPool` is a ready-made [`SeedClient`](crate::SeedClient)
//! and [`SqlExecutor`](crate::sql::SqlExecutor).

mod client;
mod history;

pub use history::PgHistoryStore;
