//! Configuration types for seed runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::discovery::DEFAULT_PATTERN;
use crate::errors::ConfigError;
use crate::history::DEFAULT_SEED_RUN_MODEL;

/// Seed-specific environment override, checked first.
pub const SEED_ENV_VAR: &str = "SEED_ENV";

/// Generic application environment, checked after [`SEED_ENV_VAR`].
pub const APP_ENV_VAR: &str = "APP_ENV";

/// Environment used when nothing else names one.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Default name of the CLI config file, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "seed.toml";

/// Runner options as written by the user. Unset fields fall back at
/// resolution time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SeedRunnerConfig {
    /// Target environment. Falls back to `SEED_ENV`, then `APP_ENV`,
    /// then `"development"`.
    pub environment: Option<String>,

    /// Whether to consult and update the run history. Defaults to `true`.
    pub track_runs: Option<bool>,

    /// Name of the history model. Defaults to `"seedRun"`.
    pub seed_run_model: Option<String>,
}

/// Fully resolved runner settings. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub environment: String,
    pub track_runs: bool,
    pub seed_run_model: String,
}

impl Default for RunSettings {
    fn default() -> Self {
        SeedRunnerConfig::default().resolve_with(|_| None)
    }
}

impl SeedRunnerConfig {
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn track_runs(mut self, track_runs: bool) -> Self {
        self.track_runs = Some(track_runs);
        self
    }

    pub fn seed_run_model(mut self, model: impl Into<String>) -> Self {
        self.seed_run_model = Some(model.into());
        self
    }

    /// Resolves against the process environment.
    pub fn resolve(&self) -> RunSettings {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolves using `lookup` for environment variables.
    ///
    /// Precedence for the environment name: explicit value, [`SEED_ENV_VAR`],
    /// [`APP_ENV_VAR`], [`DEFAULT_ENVIRONMENT`]. Empty variables count as unset.
    pub fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> RunSettings {
        let from_env = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let environment = self
            .environment
            .clone()
            .or_else(|| from_env(SEED_ENV_VAR))
            .or_else(|| from_env(APP_ENV_VAR))
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        RunSettings {
            environment,
            track_runs: self.track_runs.unwrap_or(true),
            seed_run_model: self
                .seed_run_model
                .clone()
                .unwrap_or_else(|| DEFAULT_SEED_RUN_MODEL.to_string()),
        }
    }
}

/// Contents of `seed.toml`, the config file the `seed` binary reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SeedConfig {
    /// Connection string. Falls back to `DATABASE_URL`.
    pub database_url: Option<String>,

    /// Seeders directory, relative to the config file.
    pub seeders_path: PathBuf,

    /// File pattern selecting seeder files.
    pub seeders_pattern: String,

    /// Create the history table before running if it does not exist.
    pub create_history_table: bool,

    pub runner: SeedRunnerConfig,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            seeders_path: PathBuf::from("./seeders"),
            seeders_pattern: DEFAULT_PATTERN.to_string(),
            create_history_table: true,
            runner: SeedRunnerConfig::default(),
        }
    }
}

impl SeedConfig {
    /// Reads and parses a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// The seeders directory, resolved against the directory holding the
    /// config file.
    pub fn seeders_dir(&self, config_path: &Path) -> PathBuf {
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        base.join(&self.seeders_path)
    }

    /// The configured database URL, else `lookup("DATABASE_URL")`.
    pub fn database_url_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        self.database_url
            .clone()
            .or_else(|| lookup("DATABASE_URL"))
            .ok_or(ConfigError::MissingDatabaseUrl)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = SeedRunnerConfig::default().resolve_with(vars(&[]));
        assert_eq!(settings.environment, "development");
        assert!(settings.track_runs);
        assert_eq!(settings.seed_run_model, "seedRun");
    }

    #[test]
    fn test_explicit_environment_wins() {
        let settings = SeedRunnerConfig::default()
            .environment("production")
            .resolve_with(vars(&[("SEED_ENV", "staging"), ("APP_ENV", "test")]));
        assert_eq!(settings.environment, "production");
    }

    #[test]
    fn test_seed_env_before_app_env() {
        let settings = SeedRunnerConfig::default()
            .resolve_with(vars(&[("SEED_ENV", "staging"), ("APP_ENV", "test")]));
        assert_eq!(settings.environment, "staging");

        let settings = SeedRunnerConfig::default().resolve_with(vars(&[("APP_ENV", "test")]));
        assert_eq!(settings.environment, "test");
    }

    #[test]
    fn test_empty_variables_are_ignored() {
        let settings = SeedRunnerConfig::default()
            .resolve_with(vars(&[("SEED_ENV", ""), ("APP_ENV", "staging")]));
        assert_eq!(settings.environment, "staging");
    }

    #[test]
    fn test_explicit_tracking_and_model() {
        let settings = SeedRunnerConfig::default()
            .track_runs(false)
            .seed_run_model("seed_runs")
            .resolve_with(vars(&[]));
        assert!(!settings.track_runs);
        assert_eq!(settings.seed_run_model, "seed_runs");
    }

    #[test]
    fn test_parse_seed_toml() {
        let config = SeedConfig::parse(
            r#"
            database_url = "postgres://localhost/app"
            seeders_path = "db/seeders"

            [runner]
            environment = "staging"
            track_runs = false
            "#,
        )
        .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/app"));
        assert_eq!(config.seeders_pattern, "*.sql");
        assert!(config.create_history_table);
        assert_eq!(config.runner.environment.as_deref(), Some("staging"));
        assert_eq!(config.runner.track_runs, Some(false));
        assert_eq!(config.runner.seed_run_model, None);
        assert_eq!(
            config.seeders_dir(Path::new("/srv/app/seed.toml")),
            PathBuf::from("/srv/app/db/seeders")
        );
    }

    #[test]
    fn test_empty_seed_toml_uses_defaults() {
        let config = SeedConfig::parse("").unwrap();
        assert_eq!(config.seeders_path, PathBuf::from("./seeders"));
        assert!(matches!(
            config.database_url_with(|_| None),
            Err(ConfigError::MissingDatabaseUrl)
        ));
        assert_eq!(
            config
                .database_url_with(|_| Some("postgres://env".into()))
                .unwrap(),
            "postgres://env"
        );
    }

    #[test]
    fn test_missing_config_file() {
        let err = SeedConfig::load("/definitely/not/here/seed.toml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
