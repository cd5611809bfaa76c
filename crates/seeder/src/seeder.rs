//! Seeder descriptors and the action trait they carry.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

/// The seeding logic of a seeder. Implementations should be idempotent.
#[async_trait]
pub trait SeedAction<C: ?Sized>: Send + Sync {
    async fn run(&self, client: &C) -> anyhow::Result<()>;
}

/// Adapts a closure returning a boxed future into a [`SeedAction`].
pub struct FnAction<F>(F);

#[async_trait]
impl<C, F> SeedAction<C> for FnAction<F>
where
    C: ?Sized + Sync,
    F: for<'c> Fn(&'c C) -> BoxFuture<'c, anyhow::Result<()>> + Send + Sync,
{
    async fn run(&self, client: &C) -> anyhow::Result<()> {
        (self.0)(client).await
    }
}

/// A named unit of seeding logic.
///
/// `name` is the tracking key and must be unique within a run.
/// `environments`, when set, restricts the environments the seeder runs in;
/// an empty list means it runs nowhere.
pub struct Seeder<C: ?Sized> {
    name: String,
    environments: Option<Vec<String>>,
    action: Arc<dyn SeedAction<C>>,
}

impl<C: ?Sized + Sync> Seeder<C> {
    pub fn new(name: impl Into<String>, action: impl SeedAction<C> + 'static) -> Self {
        Self::from_action(name, Arc::new(action))
    }

    pub fn from_action(name: impl Into<String>, action: Arc<dyn SeedAction<C>>) -> Self {
        Self {
            name: name.into(),
            environments: None,
            action,
        }
    }

    /// Builds a seeder from a closure.
    ///
    /// ```rust,ignore
    /// let seeder = Seeder::from_fn("001_roles", |db: &PgPool| {
    ///     Box::pin(async move {
    ///         sqlx::query("INSERT INTO roles (name) VALUES ('admin') ON CONFLICT DO NOTHING")
    ///             .execute(db)
    ///             .await?;
    ///         Ok(())
    ///     })
    /// });
    /// ```
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: for<'c> Fn(&'c C) -> BoxFuture<'c, anyhow::Result<()>> + Send + Sync + 'static,
    {
        Self::new(name, FnAction(f))
    }

    /// Restricts the seeder to the given environments.
    pub fn environments<I, S>(mut self, environments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.environments = Some(environments.into_iter().map(Into::into).collect());
        self
    }

    pub(crate) fn with_environments(mut self, environments: Option<Vec<String>>) -> Self {
        self.environments = environments;
        self
    }
}

impl<C: ?Sized> Seeder<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn allowed_environments(&self) -> Option<&[String]> {
        self.environments.as_deref()
    }

    /// Whether the seeder may run in `environment`.
    pub fn allows(&self, environment: &str) -> bool {
        self.environments
            .as_ref()
            .is_none_or(|envs| envs.iter().any(|e| e == environment))
    }

    pub fn action(&self) -> &Arc<dyn SeedAction<C>> {
        &self.action
    }
}

impl<C: ?Sized> Clone for Seeder<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            environments: self.environments.clone(),
            action: Arc::clone(&self.action),
        }
    }
}

impl<C: ?Sized> fmt::Debug for Seeder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seeder")
            .field("name", &self.name)
            .field("environments", &self.environments)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_unrestricted_seeder_allows_every_environment() {
        let seeder: Seeder<()> = Seeder::from_fn("001_roles", |_: &()| Box::pin(async { Ok(()) }));
        assert!(seeder.allows("development"));
        assert!(seeder.allows("production"));
        assert!(seeder.allowed_environments().is_none());
    }

    #[test]
    fn test_restricted_seeder() {
        let seeder: Seeder<()> = Seeder::from_fn("002_demo", |_: &()| Box::pin(async { Ok(()) }))
            .environments(["development", "staging"]);
        assert!(seeder.allows("staging"));
        assert!(!seeder.allows("production"));
    }

    #[test]
    fn test_empty_environment_list_allows_nothing() {
        let seeder: Seeder<()> = Seeder::from_fn("003_none", |_: &()| Box::pin(async { Ok(()) }))
            .environments(Vec::<String>::new());
        assert!(!seeder.allows("development"));
    }

    #[tokio::test]
    async fn test_fn_action_runs_closure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let seeder: Seeder<()> = Seeder::from_fn("004_count", move |_: &()| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });

        seeder.action().run(&()).await.unwrap();
        seeder.clone().action().run(&()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
