pub mod demo;
pub mod remote;
mod seed;

pub use demo::{DemoBackend, Latency};
pub use remote::{RemoteBackend, RemoteOptions};

use crate::config::BackendConfig;
use crate::error::Result;
use crate::model::{Actor, Worksheet, WorksheetDraft, WorksheetPatch};
use crate::query::SortSpec;
use crate::store;
use crate::upload::{FilePayload, UploadedFile};
use anyhow::Context;

/// The capability set every persistence backend offers to the catalog. Both
/// implementations must return the same results and the same error kinds for
/// the same calls; only where the bytes end up differs.
#[async_trait::async_trait]
pub trait Backend: Send + Sync + 'static {
    /// The current session's actor, `None` when anonymous. Never fails.
    async fn me(&self) -> Option<Actor>;

    async fn list(&self, sort: &SortSpec) -> Result<Vec<Worksheet>>;

    async fn get(&self, id: &str) -> Result<Worksheet>;

    async fn create(&self, draft: WorksheetDraft) -> Result<Worksheet>;

    async fn update(&self, id: &str, patch: WorksheetPatch) -> Result<Worksheet>;

    async fn upload_file(&self, file: FilePayload) -> Result<UploadedFile>;

    /// Short human readable description, for logs.
    fn describe(&self) -> String;
}

/// Builds the backend variant selected by configuration.
pub async fn make(config: &BackendConfig) -> anyhow::Result<Box<dyn Backend>> {
    match config {
        BackendConfig::Demo(cfg) => {
            let store = store::make(&cfg.store)
                .await
                .with_context(|| format!("failed to open demo store '{}'", cfg.store))?;
            let latency = if cfg.simulate_latency {
                Latency::default()
            } else {
                Latency::none()
            };
            let backend = DemoBackend::new(store, latency)
                .await
                .context("failed to load demo worksheets")?;

            Ok(Box::new(backend))
        }
        BackendConfig::Remote(cfg) => {
            let backend = RemoteBackend::new(RemoteOptions::from(cfg))
                .context("failed to create remote backend")?;

            Ok(Box::new(backend))
        }
    }
}
