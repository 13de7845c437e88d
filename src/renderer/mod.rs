//! Renderer adapter: turns a job into exactly one external invocation.
//!
//! - [`command`]: builds the matrix tool command line for a job
//! - [`executor`]: [`PanelRenderer`], which runs those commands and owns the idle clock process
//! - [`assets`]: downloads assets for sync jobs
//!
//! The scheduler only sees the [`Renderer`] trait, so tests can drive it with
//! an in-memory renderer.

pub mod assets;
pub mod command;
pub mod executor;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RenderError;
use crate::scheduler::job::Job;

pub use assets::{AssetFetcher, HttpAssetFetcher};
pub use command::{CommandBuilder, RenderCommand};
pub use executor::PanelRenderer;

/// Result of a single render.
#[derive(Debug)]
pub enum RenderOutcome {
    /// The job was shown; carries it back for repeat bookkeeping
    Completed(Arc<Job>),
    /// Nothing was shown
    Failed(RenderError),
}

impl RenderOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RenderOutcome::Completed(_))
    }
}

#[async_trait]
pub trait Renderer: Send + Sync + 'static {
    /// Render a queued job and wait for it to finish.
    async fn render(&self, job: Arc<Job>) -> RenderOutcome;

    /// Start the idle clock without waiting for it.
    async fn show_idle(&self) -> Result<(), RenderError>;

    /// Stop the idle clock if one is running.
    async fn stop_idle(&self);
}
