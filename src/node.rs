use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::PanelConfig;
use crate::error::Result;
use crate::renderer::{PanelRenderer, Renderer};
use crate::scheduler::Scheduler;
use crate::source::{self, SourceState};

/// Wires the scheduler, the panel renderer and the message source together.
pub struct Node {
    pub config: PanelConfig,
    pub scheduler: Arc<Scheduler>,
}

impl Node {
    pub fn new(config: PanelConfig) -> Self {
        let renderer: Arc<dyn Renderer> = Arc::new(PanelRenderer::from_config(&config));
        Self::with_renderer(config, renderer)
    }

    pub fn with_renderer(config: PanelConfig, renderer: Arc<dyn Renderer>) -> Self {
        let scheduler = Arc::new(Scheduler::new(renderer, config.scheduler.max_queue_len));
        Self { config, scheduler }
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// 1. Queues the splash logo before any event is accepted
    /// 2. Spawns the scheduler loop
    /// 3. Serves the HTTP message source (blocking)
    ///
    /// After an `end` command the loop exits but the source keeps answering,
    /// rejecting new display requests.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        self.scheduler.enqueue_splash(self.config.logo.clone()).await?;

        let scheduler = self.scheduler.clone();
        let loop_shutdown = shutdown.clone();
        let scheduler_task = tokio::spawn(async move {
            scheduler.run(loop_shutdown).await;
        });

        let state = SourceState {
            scheduler: self.scheduler.clone(),
        };
        source::serve(self.config.source.listen_addr, state, shutdown.clone()).await?;

        // The source only returns on shutdown; let the current render finish.
        shutdown.cancel();
        if let Err(e) = scheduler_task.await {
            tracing::error!(error = %e, "Scheduler task panicked");
        }
        // A loop ended by `end` returned before shutdown and left the clock up
        self.scheduler.stop_idle().await;
        Ok(())
    }
}
