//! Seed runner - executes seeders with environment filtering and run tracking.
//!
//! Seeders run strictly one after another, in the order given. For each one
//! the runner:
//!
//! 1. skips it if its environment list excludes the current environment,
//! 2. skips it if the history store already holds a record for its name,
//! 3. runs its action and, on success, records it in the history store.
//!
//! History failures are logged and otherwise ignored: a failed lookup counts
//! as "not applied" and a failed write leaves the seeder unrecorded, so it
//! will run again next time. A failing action aborts the run; seeders that
//! already completed stay applied.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::client::SeedClient;
use crate::config::{RunSettings, SeedRunnerConfig};
use crate::discovery::SeederSource;
use crate::errors::{RunError, SeedError};
use crate::history::{HistoryStore, NewSeedRun};
use crate::logger::{SeedLogger, TracingLogger};
use crate::seeder::Seeder;

/// Why a seeder did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Not allowed in the current environment.
    Environment,
    /// A history record already exists.
    AlreadyApplied,
}

/// Final state of a seeder that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeederStatus {
    /// The action ran. `recorded` is false when tracking is off or the
    /// history write did not happen.
    Completed { recorded: bool },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeederOutcome {
    pub name: String,
    pub status: SeederStatus,
}

/// Outcome of a successful run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub environment: String,
    pub executed: usize,
    pub skipped: usize,
    pub outcomes: Vec<SeederOutcome>,
}

impl RunSummary {
    fn new(environment: &str) -> Self {
        Self {
            environment: environment.to_string(),
            ..Self::default()
        }
    }

    fn push(&mut self, name: &str, status: SeederStatus) {
        match status {
            SeederStatus::Completed { .. } => self.executed += 1,
            SeederStatus::Skipped(_) => self.skipped += 1,
        }
        self.outcomes.push(SeederOutcome {
            name: name.to_string(),
            status,
        });
    }

    pub fn status_of(&self, name: &str) -> Option<SeederStatus> {
        self.outcomes
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.status)
    }
}

/// Runs seeder sequences against a client.
pub struct SeedRunner<C> {
    client: C,
    settings: RunSettings,
    logger: Arc<dyn SeedLogger>,
    history: Option<Arc<dyn HistoryStore>>,
}

impl<C: SeedClient> SeedRunner<C> {
    /// Creates a runner, resolving `config` against the process environment.
    pub fn new(client: C, config: SeedRunnerConfig) -> Self {
        Self::with_settings(client, config.resolve())
    }

    /// Creates a runner from already resolved settings. When tracking is on,
    /// the history store is bound here, once.
    pub fn with_settings(client: C, settings: RunSettings) -> Self {
        let history = if settings.track_runs {
            client.history_store(&settings.seed_run_model)
        } else {
            None
        };

        Self {
            client,
            settings,
            logger: Arc::new(TracingLogger),
            history,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn SeedLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Uses `store` for run history instead of asking the client.
    pub fn with_history_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(store);
        self
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    /// Loads the sequence from `source`, then runs it. Nothing runs if
    /// loading fails.
    pub async fn run_source<S>(&self, source: &S) -> Result<RunSummary, SeedError>
    where
        S: SeederSource<C> + ?Sized,
    {
        let seeders = source.load_seeders().await?;
        Ok(self.run(&seeders).await?)
    }

    /// Runs `seeders` in order, stopping at the first failing action.
    pub async fn run(&self, seeders: &[Seeder<C>]) -> Result<RunSummary, RunError> {
        validate_names(seeders)?;

        let environment = &self.settings.environment;
        self.logger.info(
            &format!("Starting seed run in {environment} environment..."),
            &[],
        );

        let mut summary = RunSummary::new(environment);
        for seeder in seeders {
            match self.apply(seeder).await {
                Ok(status) => summary.push(seeder.name(), status),
                Err(source) => {
                    self.logger.error(
                        &format!("✗ Failed {}:", seeder.name()),
                        &[&format!("{source:#}")],
                    );
                    self.logger.error(
                        &format!(
                            "Seed run aborted: {} executed, {} skipped",
                            summary.executed, summary.skipped
                        ),
                        &[],
                    );
                    return Err(RunError::SeederFailed {
                        name: seeder.name().to_string(),
                        source,
                    });
                }
            }
        }

        self.logger.info(
            &format!(
                "Seed run complete: {} executed, {} skipped",
                summary.executed, summary.skipped
            ),
            &[],
        );
        Ok(summary)
    }

    async fn apply(&self, seeder: &Seeder<C>) -> anyhow::Result<SeederStatus> {
        let name = seeder.name();
        let environment = &self.settings.environment;

        if !seeder.allows(environment) {
            self.logger.info(
                &format!("⊘ Skipping {name} (not allowed in {environment})"),
                &[],
            );
            return Ok(SeederStatus::Skipped(SkipReason::Environment));
        }

        if self.settings.track_runs && self.is_applied(name).await {
            self.logger.info(&format!("⊘ Skipping {name} (already applied)"), &[]);
            return Ok(SeederStatus::Skipped(SkipReason::AlreadyApplied));
        }

        self.logger.info(&format!("→ Running {name}..."), &[]);
        seeder.action().run(&self.client).await?;

        let recorded = self.settings.track_runs && self.record(name).await;

        self.logger.info(&format!("✓ Completed {name}"), &[]);
        Ok(SeederStatus::Completed { recorded })
    }

    /// Whether a history record exists. Lookup problems count as "no".
    async fn is_applied(&self, name: &str) -> bool {
        let Some(store) = &self.history else {
            self.logger.warn(
                &format!(
                    "SeedRun model \"{}\" not found - skipping tracking",
                    self.settings.seed_run_model
                ),
                &[],
            );
            return false;
        };

        match store.find_by_name(name).await {
            Ok(record) => record.is_some(),
            Err(e) => {
                self.logger.warn("Failed to check seed run history:", &[&e]);
                false
            }
        }
    }

    /// Writes the history record. Returns whether it was written.
    async fn record(&self, name: &str) -> bool {
        let Some(store) = &self.history else {
            return false;
        };

        let run = NewSeedRun::new(name, Some(self.settings.environment.clone()));
        match store.insert(run).await {
            Ok(()) => true,
            Err(e) => {
                self.logger.warn("Failed to record seed run:", &[&e]);
                false
            }
        }
    }
}

/// Creates a runner for `client` and runs `seeders` once.
pub async fn run_seeders<C: SeedClient>(
    client: C,
    seeders: &[Seeder<C>],
    config: SeedRunnerConfig,
) -> Result<RunSummary, RunError> {
    SeedRunner::new(client, config).run(seeders).await
}

/// Names are the tracking key: they must be present and unique.
fn validate_names<C>(seeders: &[Seeder<C>]) -> Result<(), RunError> {
    let mut seen = HashSet::with_capacity(seeders.len());
    for seeder in seeders {
        if seeder.name().is_empty() {
            return Err(RunError::EmptyName);
        }
        if !seen.insert(seeder.name()) {
            return Err(RunError::DuplicateName(seeder.name().to_string()));
        }
    }
    Ok(())
}
