use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning a seeders directory into an ordered sequence.
///
/// Every variant is fatal: discovery never returns a partial registry.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Seeders directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Failed to read seeders directory {}: {source}", path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid seeder pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to load seeder from {file}: {source}")]
    LoadFailure {
        file: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("No valid seeder found in {file}. Expected a seeder with a name and a run action.")]
    InvalidSeeder { file: String },
}

/// Failures reported by a run history store.
///
/// The runner never lets these abort a run; they are logged as warnings.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid history model name: {0:?}")]
    InvalidModelName(String),

    #[error("A run named {0} is already recorded")]
    Duplicate(String),

    #[error("History store unavailable: {0}")]
    Unavailable(String),
}

/// Failures that abort a seed run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Seeder {name} failed: {source}")]
    SeederFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Seeder name must not be empty")]
    EmptyName,

    #[error("Duplicate seeder name: {0}")]
    DuplicateName(String),
}

/// Failures loading the `seed.toml` configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No database URL: set `database_url` in the config file or DATABASE_URL")]
    MissingDatabaseUrl,
}

/// Any failure of a full discover-then-run pass.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
