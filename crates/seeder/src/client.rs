//! The database client capability a runner seeds through.

use std::sync::Arc;

use async_trait::async_trait;

use crate::history::HistoryStore;

/// An opaque database handle.
///
/// Seeders receive `&C` and use whatever API the concrete client offers.
/// The runner itself only ever asks for the history store bound to the
/// configured model name, once, when it is constructed.
#[async_trait]
pub trait SeedClient: Send + Sync {
    /// Returns the history store for `model`, or `None` if the client has no
    /// such collection.
    fn history_store(&self, _model: &str) -> Option<Arc<dyn HistoryStore>> {
        None
    }

    async fn disconnect(&self) {}
}

#[async_trait]
impl<C: SeedClient + ?Sized> SeedClient for Arc<C> {
    fn history_store(&self, model: &str) -> Option<Arc<dyn HistoryStore>> {
        (**self).history_store(model)
    }

    async fn disconnect(&self) {
        (**self).disconnect().await;
    }
}
