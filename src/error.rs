use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Queue is full ({0} jobs pending)")]
    QueueFull(usize),

    #[error("Scheduler has ended and no longer accepts jobs")]
    SchedulerEnded,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PanelError>;

/// Why a single render did not complete.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to spawn renderer: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Renderer exited with status {0:?}")]
    ExitStatus(Option<i32>),

    #[error("Renderer did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("Asset fetch failed: {0}")]
    AssetFetch(String),
}
