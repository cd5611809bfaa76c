//! SQL files as seeder units.
//!
//! A seeder file is plain SQL. Leading comment directives may set the
//! seeder's name and environments:
//!
//! ```sql
//! -- name: 001_roles
//! -- environments: development, staging
//! INSERT INTO roles (name) VALUES ('admin') ON CONFLICT DO NOTHING;
//! ```
//!
//! Without a `name` directive the file stem is used. A file with no SQL
//! statements has nothing to run and is rejected by discovery.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;

use crate::discovery::{LoadedUnit, UnitExport, UnitLoader};
use crate::seeder::SeedAction;

/// Clients that can execute a multi-statement SQL script.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute_script(&self, sql: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl<C: SqlExecutor + ?Sized> SqlExecutor for std::sync::Arc<C> {
    async fn execute_script(&self, sql: &str) -> anyhow::Result<()> {
        (**self).execute_script(sql).await
    }
}

/// The action of a SQL seeder: run the script through the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlScript {
    sql: String,
}

impl SqlScript {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Whether the script contains anything besides blank lines and `--`
    /// comments.
    pub fn has_statements(&self) -> bool {
        self.sql
            .lines()
            .map(str::trim)
            .any(|line| !line.is_empty() && !line.starts_with("--"))
    }
}

#[async_trait]
impl<C: SqlExecutor + ?Sized> SeedAction<C> for SqlScript {
    async fn run(&self, client: &C) -> anyhow::Result<()> {
        client.execute_script(&self.sql).await
    }
}

/// Header directives of a seeder file.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Directives {
    pub name: Option<String>,
    pub environments: Option<Vec<String>>,
}

impl Directives {
    /// Reads `-- key: value` lines from the top of the file, up to the first
    /// line that is neither blank nor a comment. Unknown keys are ignored.
    pub fn parse(sql: &str) -> Self {
        let mut directives = Self::default();

        for line in sql.lines().map(str::trim) {
            if line.is_empty() {
                continue;
            }
            let Some(comment) = line.strip_prefix("--") else {
                break;
            };
            let Some((key, value)) = comment.split_once(':') else {
                continue;
            };

            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "name" if !value.is_empty() => directives.name = Some(value.to_string()),
                "environments" => {
                    directives.environments = Some(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|env| !env.is_empty())
                            .map(String::from)
                            .collect(),
                    );
                }
                _ => {}
            }
        }

        directives
    }
}

/// Loads `.sql` files as single-seeder units.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlScriptLoader;

impl SqlScriptLoader {
    /// Builds the unit for a script's contents. `path` supplies the default
    /// name.
    pub fn unit_from_source<C>(path: &Path, sql: String) -> LoadedUnit<C>
    where
        C: SqlExecutor + ?Sized,
    {
        let directives = Directives::parse(&sql);
        let name = directives.name.or_else(|| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .map(String::from)
        });

        let script = SqlScript::new(sql);
        let action = script
            .has_statements()
            .then(|| std::sync::Arc::new(script) as std::sync::Arc<dyn SeedAction<C>>);

        LoadedUnit::new().with_primary(UnitExport {
            name,
            environments: directives.environments,
            action,
        })
    }
}

#[async_trait]
impl<C> UnitLoader<C> for SqlScriptLoader
where
    C: SqlExecutor + ?Sized,
{
    async fn load(&self, path: &Path) -> anyhow::Result<LoadedUnit<C>> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let sql = String::from_utf8(bytes)
            .with_context(|| format!("{} is not valid UTF-8", path.display()))?;

        Ok(Self::unit_from_source(path, sql))
    }
}
