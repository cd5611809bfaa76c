//! Seeder discovery.
//!
//! Discovery turns a directory of seeder units into an ordered sequence of
//! [`Seeder`]s:
//!
//! 1. entries of the directory (non-recursive) are filtered by a glob
//!    [`Pattern`](crate::ordering::Pattern),
//! 2. sorted with [`compare_names`],
//! 3. loaded one at a time through a [`UnitLoader`], and
//! 4. resolved to exactly one seeder each.
//!
//! The resulting order is the execution order. Any failure aborts discovery.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::DiscoveryError;
use crate::ordering::{Pattern, compare_names};
use crate::seeder::{SeedAction, Seeder};

/// Pattern used when none is configured: SQL seed scripts.
pub const DEFAULT_PATTERN: &str = "*.sql";

/// One export of a loaded unit. It only describes a seeder if it has both a
/// non-empty name and an action.
pub struct UnitExport<C: ?Sized> {
    pub name: Option<String>,
    pub environments: Option<Vec<String>>,
    pub action: Option<Arc<dyn SeedAction<C>>>,
}

impl<C: ?Sized + Sync> UnitExport<C> {
    /// An export with the full seeder shape.
    pub fn seeder(name: impl Into<String>, action: impl SeedAction<C> + 'static) -> Self {
        Self {
            name: Some(name.into()),
            environments: None,
            action: Some(Arc::new(action)),
        }
    }

    /// An export with a name but nothing to run.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            environments: None,
            action: None,
        }
    }

    pub fn environments<I, S>(mut self, environments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.environments = Some(environments.into_iter().map(Into::into).collect());
        self
    }

    /// Validates the shape: a non-empty name and an action.
    pub fn into_seeder(self) -> Option<Seeder<C>> {
        match (self.name, self.action) {
            (Some(name), Some(action)) if !name.is_empty() => {
                Some(Seeder::from_action(name, action).with_environments(self.environments))
            }
            _ => None,
        }
    }

    fn is_seeder(&self) -> bool {
        self.action.is_some() && self.name.as_deref().is_some_and(|n| !n.is_empty())
    }
}

/// The namespace a [`UnitLoader`] produces for one file: an optional primary
/// export plus named exports in declaration order.
pub struct LoadedUnit<C: ?Sized> {
    pub primary: Option<UnitExport<C>>,
    pub exports: Vec<(String, UnitExport<C>)>,
}

impl<C: ?Sized + Sync> LoadedUnit<C> {
    pub fn new() -> Self {
        Self {
            primary: None,
            exports: Vec::new(),
        }
    }

    pub fn with_primary(mut self, export: UnitExport<C>) -> Self {
        self.primary = Some(export);
        self
    }

    pub fn with_export(mut self, key: impl Into<String>, export: UnitExport<C>) -> Self {
        self.exports.push((key.into(), export));
        self
    }

    /// Picks the seeder this unit defines: the primary export if it has the
    /// seeder shape, else the first named export that does.
    pub fn resolve(self) -> Option<Seeder<C>> {
        if let Some(primary) = self.primary
            && primary.is_seeder()
        {
            return primary.into_seeder();
        }

        self.exports
            .into_iter()
            .map(|(_, export)| export)
            .find(UnitExport::is_seeder)
            .and_then(UnitExport::into_seeder)
    }
}

impl<C: ?Sized + Sync> Default for LoadedUnit<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Loads one seeder unit from disk.
#[async_trait]
pub trait UnitLoader<C: ?Sized>: Send + Sync {
    async fn load(&self, path: &Path) -> anyhow::Result<LoadedUnit<C>>;
}

/// Discovers the seeders in `dir` whose file names match `pattern`.
pub async fn discover_seeders<C, L>(
    dir: impl AsRef<Path>,
    pattern: &str,
    loader: &L,
) -> Result<Vec<Seeder<C>>, DiscoveryError>
where
    C: ?Sized + Sync,
    L: UnitLoader<C> + ?Sized,
{
    let dir = dir.as_ref();

    let exists = tokio::fs::try_exists(dir)
        .await
        .map_err(|source| DiscoveryError::ReadDirectory {
            path: dir.to_path_buf(),
            source,
        })?;
    if !exists {
        return Err(DiscoveryError::DirectoryNotFound(dir.to_path_buf()));
    }

    let matcher = Pattern::new(pattern).map_err(|source| DiscoveryError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let files = matching_files(dir, &matcher).await?;
    debug!("Found {} seeder files in {}", files.len(), dir.display());

    let mut seeders = Vec::with_capacity(files.len());
    for file in files {
        let unit = loader
            .load(&dir.join(&file))
            .await
            .map_err(|source| DiscoveryError::LoadFailure {
                file: file.clone(),
                source,
            })?;

        let seeder = unit
            .resolve()
            .ok_or_else(|| DiscoveryError::InvalidSeeder { file: file.clone() })?;

        debug!("Loaded seeder {} from {}", seeder.name(), file);
        seeders.push(seeder);
    }

    Ok(seeders)
}

/// Lists `dir` and returns the matching entry names in execution order.
async fn matching_files(dir: &Path, matcher: &Pattern) -> Result<Vec<String>, DiscoveryError> {
    let read_error = |source| DiscoveryError::ReadDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_error)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        match entry.file_name().into_string() {
            Ok(name) if matcher.matches(&name) => files.push(name),
            Ok(_) => {}
            Err(name) => debug!("Ignoring non UTF-8 entry {:?}", name),
        }
    }

    files.sort_by(|a, b| compare_names(a, b).then_with(|| a.cmp(b)));
    Ok(files)
}

/// Anything that can produce the ordered seeder sequence for a run.
#[async_trait]
pub trait SeederSource<C: ?Sized>: Send + Sync {
    async fn load_seeders(&self) -> Result<Vec<Seeder<C>>, DiscoveryError>;
}

/// Seeders discovered from a directory with a [`UnitLoader`].
pub struct DirectorySource<L> {
    dir: PathBuf,
    pattern: String,
    loader: L,
}

impl<L> DirectorySource<L> {
    pub fn new(dir: impl Into<PathBuf>, loader: L) -> Self {
        Self {
            dir: dir.into(),
            pattern: DEFAULT_PATTERN.to_string(),
            loader,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl<C, L> SeederSource<C> for DirectorySource<L>
where
    C: ?Sized + Sync,
    L: UnitLoader<C>,
{
    async fn load_seeders(&self) -> Result<Vec<Seeder<C>>, DiscoveryError> {
        discover_seeders(&self.dir, &self.pattern, &self.loader).await
    }
}

/// Seeders registered in code.
///
/// Registration order does not matter: seeders come back sorted by name with
/// the same natural order directory discovery uses.
pub struct SeederRegistry<C: ?Sized> {
    seeders: Vec<Seeder<C>>,
}

impl<C: ?Sized> SeederRegistry<C> {
    pub fn new() -> Self {
        Self {
            seeders: Vec::new(),
        }
    }

    pub fn register(mut self, seeder: Seeder<C>) -> Self {
        self.seeders.push(seeder);
        self
    }

    pub fn len(&self) -> usize {
        self.seeders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeders.is_empty()
    }

    /// Registered seeders in execution order.
    pub fn ordered(&self) -> Vec<Seeder<C>> {
        let mut seeders = self.seeders.clone();
        seeders.sort_by(|a, b| compare_names(a.name(), b.name()));
        seeders
    }
}

impl<C: ?Sized> Default for SeederRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<C: ?Sized + Sync> SeederSource<C> for SeederRegistry<C> {
    async fn load_seeders(&self) -> Result<Vec<Seeder<C>>, DiscoveryError> {
        Ok(self.ordered())
    }
}

/// A [`UnitLoader`] that serves pre-built units by file name.
///
/// Useful when seeders are compiled into the binary but their files still
/// decide which run and in what order.
pub struct StaticLoader<C: ?Sized> {
    units: HashMap<String, Arc<dyn Fn() -> anyhow::Result<LoadedUnit<C>> + Send + Sync>>,
}

impl<C: ?Sized> StaticLoader<C> {
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
        }
    }

    /// Registers the unit served for `file_name`.
    pub fn unit<F>(mut self, file_name: impl Into<String>, build: F) -> Self
    where
        F: Fn() -> anyhow::Result<LoadedUnit<C>> + Send + Sync + 'static,
    {
        self.units.insert(file_name.into(), Arc::new(build));
        self
    }
}

impl<C: ?Sized> Default for StaticLoader<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<C: ?Sized + Sync> UnitLoader<C> for StaticLoader<C> {
    async fn load(&self, path: &Path) -> anyhow::Result<LoadedUnit<C>> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow::anyhow!("invalid seeder path {}", path.display()))?;

        let build = self
            .units
            .get(file_name)
            .ok_or_else(|| anyhow::anyhow!("no unit registered for {file_name}"))?;
        build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl SeedAction<()> for Noop {
        async fn run(&self, _client: &()) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_primary_export_wins() {
        let unit: LoadedUnit<()> = LoadedUnit::new()
            .with_export("other", UnitExport::seeder("named", Noop))
            .with_primary(UnitExport::seeder("primary", Noop));
        assert_eq!(unit.resolve().unwrap().name(), "primary");
    }

    #[test]
    fn test_first_qualifying_named_export() {
        let unit: LoadedUnit<()> = LoadedUnit::new()
            .with_primary(UnitExport::named("no_action"))
            .with_export("config", UnitExport::named("config"))
            .with_export("first", UnitExport::seeder("first", Noop).environments(["staging"]))
            .with_export("second", UnitExport::seeder("second", Noop));

        let seeder = unit.resolve().unwrap();
        assert_eq!(seeder.name(), "first");
        assert_eq!(seeder.allowed_environments(), Some(&["staging".to_string()][..]));
    }

    #[test]
    fn test_no_seeder_shape() {
        let unit: LoadedUnit<()> = LoadedUnit::new().with_primary(UnitExport::named("x"));
        assert!(unit.resolve().is_none());

        let unnamed: LoadedUnit<()> = LoadedUnit::new().with_primary(UnitExport {
            name: Some(String::new()),
            environments: None,
            action: Some(Arc::new(Noop)),
        });
        assert!(unnamed.resolve().is_none());
    }

    #[tokio::test]
    async fn test_registry_orders_by_name() {
        let registry: SeederRegistry<()> = SeederRegistry::new()
            .register(Seeder::new("10_b", Noop))
            .register(Seeder::new("2_a", Noop))
            .register(Seeder::new("1_c", Noop));

        let names: Vec<_> = registry
            .load_seeders()
            .await
            .unwrap()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["1_c", "2_a", "10_b"]);
    }
}
