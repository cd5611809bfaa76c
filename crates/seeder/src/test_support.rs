//! Test-only fakes: a recording logger, a scripted client, failing history
//! stores and seeders that journal their calls.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::client::SeedClient;
use crate::errors::HistoryError;
use crate::history::{DEFAULT_SEED_RUN_MODEL, HistoryStore, NewSeedRun, SeedRunRecord};
use crate::logger::{SeedLogger, render};
use crate::seeder::{SeedAction, Seeder};
use crate::sql::SqlExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
    pub rendered: String,
}

/// Logger that keeps every entry for later assertions.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogger {
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Whether any entry's message (without details) equals `message`.
    pub fn contains(&self, message: &str) -> bool {
        self.entries().iter().any(|e| e.message == message)
    }

    pub fn warned(&self, message: &str) -> bool {
        self.has(Level::Warn, message)
    }

    pub fn errored(&self, message: &str) -> bool {
        self.has(Level::Error, message)
    }

    pub fn warnings(&self) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == Level::Warn)
            .collect()
    }

    fn has(&self, level: Level, message: &str) -> bool {
        self.entries()
            .iter()
            .any(|e| e.level == level && e.message == message)
    }

    fn push(&self, level: Level, message: &str, details: &[&dyn Display]) {
        self.entries.lock().unwrap().push(LogEntry {
            level,
            message: message.to_string(),
            rendered: render(message, details),
        });
    }
}

impl SeedLogger for RecordingLogger {
    fn info(&self, message: &str, details: &[&dyn Display]) {
        self.push(Level::Info, message, details);
    }

    fn warn(&self, message: &str, details: &[&dyn Display]) {
        self.push(Level::Warn, message, details);
    }

    fn error(&self, message: &str, details: &[&dyn Display]) {
        self.push(Level::Error, message, details);
    }
}

/// Client with an optional history store bound to one model name. As a
/// [`SqlExecutor`] it records scripts instead of running them.
pub struct TestClient {
    model: String,
    history: Option<Arc<dyn HistoryStore>>,
    scripts: Mutex<Vec<String>>,
    fail_scripts_containing: Option<String>,
    disconnected: AtomicBool,
}

impl TestClient {
    pub fn without_history() -> Self {
        Self {
            model: DEFAULT_SEED_RUN_MODEL.to_string(),
            history: None,
            scripts: Mutex::new(Vec::new()),
            fail_scripts_containing: None,
            disconnected: AtomicBool::new(false),
        }
    }

    /// Serves `store` for the default model name.
    pub fn with_history(store: Arc<dyn HistoryStore>) -> Self {
        Self::with_history_model(DEFAULT_SEED_RUN_MODEL, store)
    }

    pub fn with_history_model(model: &str, store: Arc<dyn HistoryStore>) -> Self {
        Self {
            model: model.to_string(),
            history: Some(store),
            ..Self::without_history()
        }
    }

    /// Makes every script containing `needle` fail.
    pub fn failing_scripts_containing(mut self, needle: &str) -> Self {
        self.fail_scripts_containing = Some(needle.to_string());
        self
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeedClient for TestClient {
    fn history_store(&self, model: &str) -> Option<Arc<dyn HistoryStore>> {
        (model == self.model).then(|| self.history.clone()).flatten()
    }

    async fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SqlExecutor for TestClient {
    async fn execute_script(&self, sql: &str) -> anyhow::Result<()> {
        self.scripts.lock().unwrap().push(sql.to_string());
        match &self.fail_scripts_containing {
            Some(needle) if sql.contains(needle.as_str()) => {
                anyhow::bail!("script failed: {needle}")
            }
            _ => Ok(()),
        }
    }
}

/// History store whose lookups or inserts always fail.
#[derive(Debug, Default)]
pub struct FailingHistoryStore {
    fail_lookups: bool,
    fail_inserts: bool,
    lookups: AtomicUsize,
    inserts: AtomicUsize,
}

impl FailingHistoryStore {
    /// Lookups fail, inserts succeed.
    pub fn lookups() -> Self {
        Self {
            fail_lookups: true,
            ..Self::default()
        }
    }

    /// Lookups find nothing, inserts fail.
    pub fn writes() -> Self {
        Self {
            fail_inserts: true,
            ..Self::default()
        }
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistoryStore for FailingHistoryStore {
    async fn find_by_name(&self, _name: &str) -> Result<Option<SeedRunRecord>, HistoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups {
            return Err(HistoryError::Unavailable("relation does not exist".into()));
        }
        Ok(None)
    }

    async fn insert(&self, _run: NewSeedRun) -> Result<(), HistoryError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts {
            return Err(HistoryError::Unavailable("connection reset".into()));
        }
        Ok(())
    }
}

/// Shared record of which seeder actions were invoked, in order.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// A seeder that journals its name and succeeds.
    pub fn seeder<C: ?Sized + Sync>(&self, name: &str) -> Seeder<C> {
        Seeder::new(name, self.action(name, None))
    }

    /// A seeder that journals its name and fails with `message`.
    pub fn failing_seeder<C: ?Sized + Sync>(&self, name: &str, message: &str) -> Seeder<C> {
        Seeder::new(name, self.action(name, Some(message)))
    }

    pub fn action(&self, name: &str, failure: Option<&str>) -> JournalAction {
        JournalAction {
            name: name.to_string(),
            calls: Arc::clone(&self.calls),
            failure: failure.map(String::from),
        }
    }
}

pub struct JournalAction {
    name: String,
    calls: Arc<Mutex<Vec<String>>>,
    failure: Option<String>,
}

#[async_trait]
impl<C: ?Sized + Sync> SeedAction<C> for JournalAction {
    async fn run(&self, _client: &C) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(self.name.clone());
        match &self.failure {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }
}
