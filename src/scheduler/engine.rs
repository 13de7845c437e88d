use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio_util::sync::CancellationToken;

use crate::error::{PanelError, Result};
use crate::renderer::{RenderOutcome, Renderer};
use crate::scheduler::control::{ControlCommand, SchedulerState};
use crate::scheduler::job::{Job, Origin};
use crate::scheduler::queue::JobQueue;
use crate::scheduler::repeat::{IdleAction, RepeatSlot};
use crate::scheduler::request::DisplayRequest;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobOutcome {
    Completed,
    Failed { reason: String },
}

/// Published once per finished job.
#[derive(Debug, Clone, Serialize)]
pub struct JobEvent {
    pub origin: Origin,
    pub kind: &'static str,
    #[serde(flatten)]
    pub outcome: JobOutcome,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub origin: Origin,
    pub kind: &'static str,
    pub priority: bool,
    pub repeatable: bool,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            origin: job.origin.clone(),
            kind: job.kind.name(),
            priority: job.priority,
            repeatable: job.repeatable,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub queued: usize,
    pub pending: Vec<JobSummary>,
    pub in_flight: Option<JobSummary>,
    pub repeat: Option<JobSummary>,
}

struct Inner {
    queue: JobQueue,
    state: SchedulerState,
    repeat: RepeatSlot,
    in_flight: Option<Arc<Job>>,
    /// Set by `clear` so the job in flight cannot refill the repeat slot
    forget_in_flight: bool,
}

/// Serializes display jobs onto the single renderer.
///
/// All queue, state and repeat-slot mutation goes through one mutex. The run
/// loop is the only caller of the renderer, so at most one job is in flight.
/// Submissions and control commands may arrive at any time from other tasks;
/// they never touch the job currently being rendered.
pub struct Scheduler {
    inner: Mutex<Inner>,
    wake: Notify,
    renderer: Arc<dyn Renderer>,
    events: broadcast::Sender<JobEvent>,
}

impl Scheduler {
    pub fn new(renderer: Arc<dyn Renderer>, max_queue_len: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(Inner {
                queue: JobQueue::with_capacity(max_queue_len),
                state: SchedulerState::Running,
                repeat: RepeatSlot::new(),
                in_flight: None,
                forget_in_flight: false,
            }),
            wake: Notify::new(),
            renderer,
            events,
        }
    }

    /// Receive an event for every job that finishes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Queue the startup logo ahead of everything else.
    pub async fn enqueue_splash(&self, logo: impl Into<std::path::PathBuf>) -> Result<Arc<Job>> {
        self.submit(Job::splash(logo).with_priority(true)).await
    }

    /// Enqueue a job: priority jobs go to the head, others to the tail.
    pub async fn submit(&self, job: Job) -> Result<Arc<Job>> {
        let job = Arc::new(job);
        {
            let mut inner = self.inner.lock().await;
            if inner.state == SchedulerState::Ended {
                return Err(PanelError::SchedulerEnded);
            }
            if !inner.queue.push(Arc::clone(&job)) {
                tracing::warn!(origin = %job.origin, queued = inner.queue.len(), "Queue full, rejecting job");
                return Err(PanelError::QueueFull(inner.queue.len()));
            }
            tracing::info!(
                origin = %job.origin,
                kind = %job.kind,
                priority = job.priority,
                repeatable = job.repeatable,
                queued = inner.queue.len(),
                "Job enqueued"
            );
        }
        self.wake.notify_one();
        Ok(job)
    }

    /// Normalize an inbound request and enqueue it. Malformed requests are dropped.
    pub async fn submit_request(&self, request: &DisplayRequest) -> Result<Arc<Job>> {
        let job = request.normalize().inspect_err(|e| {
            tracing::warn!(error = %e, "Dropping malformed request");
        })?;
        self.submit(job).await
    }

    /// Apply a control command and return the resulting state.
    pub async fn control(&self, command: ControlCommand) -> SchedulerState {
        let state = {
            let mut inner = self.inner.lock().await;
            let previous = inner.state;
            inner.state = previous.apply(command);

            match command {
                ControlCommand::Clear => {
                    let removed = inner.queue.clear_all();
                    let forgot_repeat = inner.repeat.clear().is_some();
                    inner.forget_in_flight = inner.in_flight.is_some();
                    tracing::info!(removed, forgot_repeat, "Queue cleared");
                }
                ControlCommand::End => {
                    let discarded = inner.queue.clear_all();
                    inner.repeat.clear();
                    tracing::info!(discarded, "Scheduler ended");
                }
                ControlCommand::Start | ControlCommand::Stop => {}
            }

            tracing::info!(command = %command, from = %previous, to = %inner.state, "Control command applied");
            inner.state
        };
        self.wake.notify_one();
        state
    }

    /// Dispatch a raw control token. Unknown tokens are ignored.
    pub async fn handle_control_token(&self, token: &str) -> Option<SchedulerState> {
        match ControlCommand::parse(token) {
            Some(command) => Some(self.control(command).await),
            None => {
                tracing::debug!(token, "Ignoring unknown control command");
                None
            }
        }
    }

    /// Stop the idle clock. Safe to call after the loop has exited.
    pub async fn stop_idle(&self) {
        self.renderer.stop_idle().await;
    }

    pub async fn state(&self) -> SchedulerState {
        self.inner.lock().await.state
    }

    pub async fn status(&self) -> SchedulerStatus {
        let inner = self.inner.lock().await;
        SchedulerStatus {
            state: inner.state,
            queued: inner.queue.len(),
            pending: inner.queue.iter().map(|j| JobSummary::from(j.as_ref())).collect(),
            in_flight: inner.in_flight.as_deref().map(JobSummary::from),
            repeat: inner.repeat.current().map(|j| JobSummary::from(j.as_ref())),
        }
    }

    /// Run the scheduler until it is ended or `shutdown` is cancelled.
    ///
    /// A render in progress is always allowed to finish; cancellation and
    /// `end` only prevent the next pop.
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!("Scheduler loop started");

        loop {
            let next = {
                let mut inner = self.inner.lock().await;
                match inner.state {
                    SchedulerState::Ended => break,
                    SchedulerState::Stopped => None,
                    SchedulerState::Running => {
                        let job = inner.queue.pop_head();
                        inner.in_flight = job.clone();
                        inner.forget_in_flight = false;
                        job
                    }
                }
            };

            let job = match next {
                Some(job) => job,
                None => {
                    tokio::select! {
                        _ = self.wake.notified() => {}
                        _ = shutdown.cancelled() => break,
                    }
                    continue;
                }
            };

            tracing::info!(origin = %job.origin, kind = %job.kind, "Rendering job");
            let outcome = self.renderer.render(Arc::clone(&job)).await;
            self.finish(&job, outcome).await;

            if shutdown.is_cancelled() {
                break;
            }
        }

        if shutdown.is_cancelled() {
            self.renderer.stop_idle().await;
        }
        tracing::info!("Scheduler loop stopped");
    }

    async fn finish(&self, job: &Arc<Job>, outcome: RenderOutcome) {
        let (result, show_clock) = {
            let mut inner = self.inner.lock().await;
            inner.in_flight = None;

            // A failing replay must not be queued again straight away
            let mut repeat_failed = false;
            let result = match outcome {
                RenderOutcome::Completed(shown) => {
                    tracing::info!(origin = %shown.origin, kind = %shown.kind, "Job completed");
                    if inner.forget_in_flight {
                        tracing::debug!(origin = %shown.origin, "Cleared while rendering, not remembered");
                    } else if inner.repeat.record_success(&shown) {
                        tracing::debug!(origin = %shown.origin, "Remembered for repeat");
                    }
                    JobOutcome::Completed
                }
                RenderOutcome::Failed(e) => {
                    tracing::error!(kind = %job.kind, error = %e, "Job failed");
                    repeat_failed = inner
                        .repeat
                        .current()
                        .is_some_and(|remembered| Arc::ptr_eq(remembered, job));
                    JobOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            let show_clock = if inner.state == SchedulerState::Ended || !inner.queue.is_empty() {
                false
            } else if repeat_failed {
                tracing::warn!(origin = %job.origin, "Remembered job failed, showing clock instead of replaying");
                true
            } else {
                match inner.repeat.decide() {
                    IdleAction::Replay(again) => {
                        tracing::debug!(origin = %again.origin, "Queue drained, replaying");
                        if !inner.queue.append_tail(again) {
                            tracing::warn!("Queue full, skipping replay");
                        }
                        false
                    }
                    IdleAction::ShowClock => true,
                }
            };
            (result, show_clock)
        };

        if show_clock {
            tracing::debug!("Queue drained, showing clock");
            if let Err(e) = self.renderer.show_idle().await {
                tracing::error!(error = %e, "Failed to start idle clock");
            }
        }

        // No subscribers is fine
        let _ = self.events.send(JobEvent {
            origin: job.origin.clone(),
            kind: job.kind.name(),
            outcome: result,
            finished_at: Utc::now(),
        });
    }
}
