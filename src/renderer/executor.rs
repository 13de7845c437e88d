use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::config::PanelConfig;
use crate::error::RenderError;
use crate::renderer::assets::{AssetFetcher, HttpAssetFetcher};
use crate::renderer::command::{CommandBuilder, RenderCommand};
use crate::renderer::{RenderOutcome, Renderer};
use crate::scheduler::job::{Job, JobKind};

/// How long a signalled renderer gets to exit before it is killed outright.
const STOP_GRACE: Duration = Duration::from_secs(2);

/// Drives the panel through the matrix tool binaries.
///
/// Every render is one child process whose exit status decides the outcome.
/// The idle clock is the only process left running between renders; its
/// handle is kept here so the next panel render can stop it first.
pub struct PanelRenderer {
    commands: CommandBuilder,
    fetcher: Arc<dyn AssetFetcher>,
    timeout: Option<Duration>,
    idle: Mutex<Option<Child>>,
}

impl PanelRenderer {
    pub fn new(
        commands: CommandBuilder,
        fetcher: Arc<dyn AssetFetcher>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            commands,
            fetcher,
            timeout,
            idle: Mutex::new(None),
        }
    }

    pub fn from_config(config: &PanelConfig) -> Self {
        let commands = CommandBuilder::new(
            config.matrix.clone(),
            &config.geometry,
            config.assets.dir.clone(),
        );
        Self::new(
            commands,
            Arc::new(HttpAssetFetcher::new(&config.assets)),
            config.scheduler.render_timeout(),
        )
    }

    /// Returns true while a clock process started by this renderer is alive.
    pub async fn idle_running(&self) -> bool {
        let mut idle = self.idle.lock().await;
        match idle.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    fn spawn(command: &RenderCommand) -> std::io::Result<Child> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        forward(child.stdout.take(), tokio::io::stdout());
        forward(child.stderr.take(), tokio::io::stderr());
        Ok(child)
    }

    async fn wait(&self, child: &mut Child) -> Result<ExitStatus, RenderError> {
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => Ok(status?),
                Err(_) => {
                    tracing::warn!(pid = ?child.id(), timeout = ?limit, "Renderer timed out");
                    self.terminate(child).await;
                    Err(RenderError::TimedOut(limit))
                }
            },
            None => Ok(child.wait().await?),
        }
    }

    async fn run(&self, command: &RenderCommand) -> Result<(), RenderError> {
        tracing::debug!(command = %command.display(), "Spawning renderer");
        let mut child = Self::spawn(command)?;
        let status = self.wait(&mut child).await?;

        if status.success() {
            Ok(())
        } else {
            tracing::error!(
                command = %command.display(),
                exit_code = ?status.code(),
                "Renderer exited unsuccessfully"
            );
            Err(RenderError::ExitStatus(status.code()))
        }
    }

    /// Signal a renderer process and reap it.
    ///
    /// `SIGTERM` goes through the `kill` tool, prefixed with `sudo` when the
    /// child is root-owned; sudo relays it to the tool it started. A plain
    /// kill of the sudo wrapper would leave that tool drawing on the panel.
    async fn terminate(&self, child: &mut Child) {
        let Some(pid) = child.id() else {
            return;
        };

        let mut signal = if self.commands.uses_sudo() {
            let mut sudo = Command::new("sudo");
            sudo.arg("kill");
            sudo
        } else {
            Command::new("kill")
        };
        let signalled = signal
            .args(["-TERM", &pid.to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .await;

        match signalled {
            Ok(status) if status.success() => {
                if tokio::time::timeout(STOP_GRACE, child.wait()).await.is_ok() {
                    tracing::debug!(pid, "Renderer process stopped");
                    return;
                }
                tracing::warn!(pid, "Renderer ignored SIGTERM, killing");
            }
            Ok(status) => tracing::warn!(pid, exit_code = ?status.code(), "kill -TERM failed"),
            Err(e) => tracing::warn!(pid, error = %e, "Failed to signal renderer"),
        }

        match child.kill().await {
            Ok(()) => tracing::debug!(pid, "Renderer process killed"),
            Err(e) => tracing::debug!(pid, error = %e, "Renderer process already gone"),
        }
    }
}

fn forward<R, W>(reader: Option<R>, mut writer: W)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    if let Some(mut reader) = reader {
        tokio::spawn(async move {
            let _ = tokio::io::copy(&mut reader, &mut writer).await;
        });
    }
}

#[async_trait]
impl Renderer for PanelRenderer {
    async fn render(&self, job: Arc<Job>) -> RenderOutcome {
        let result = match job.kind {
            JobKind::Sync { category, ref file } => {
                self.fetcher.fetch(category, file).await.map(|_| ())
            }
            ref kind => match self.commands.build(kind) {
                Some(command) => {
                    self.stop_idle().await;
                    self.run(&command).await
                }
                None => Ok(()),
            },
        };

        match result {
            Ok(()) => RenderOutcome::Completed(job),
            Err(e) => RenderOutcome::Failed(e),
        }
    }

    async fn show_idle(&self) -> Result<(), RenderError> {
        self.stop_idle().await;

        let Some(command) = self.commands.build(&JobKind::Clock) else {
            return Ok(());
        };
        let child = Self::spawn(&command)?;
        tracing::info!(pid = ?child.id(), "Idle clock started");
        *self.idle.lock().await = Some(child);
        Ok(())
    }

    async fn stop_idle(&self) {
        let child = self.idle.lock().await.take();
        if let Some(mut child) = child {
            self.terminate(&mut child).await;
        }
    }
}
