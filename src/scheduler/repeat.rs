use std::sync::Arc;

use crate::scheduler::job::Job;

/// What to show once the queue has drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdleAction {
    /// Re-submit the remembered repeatable job
    Replay(Arc<Job>),
    /// Start the clock outside the queue
    ShowClock,
}

/// Holds at most one repeatable job for replay on empty-queue cycles.
#[derive(Debug, Default)]
pub struct RepeatSlot {
    job: Option<Arc<Job>>,
}

impl RepeatSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully rendered job. Non-repeatable jobs leave the slot untouched.
    pub fn record_success(&mut self, job: &Arc<Job>) -> bool {
        if !job.repeatable {
            return false;
        }
        self.job = Some(Arc::clone(job));
        true
    }

    pub fn clear(&mut self) -> Option<Arc<Job>> {
        self.job.take()
    }

    pub fn current(&self) -> Option<&Arc<Job>> {
        self.job.as_ref()
    }

    pub fn decide(&self) -> IdleAction {
        match self.job {
            Some(ref job) => IdleAction::Replay(Arc::clone(job)),
            None => IdleAction::ShowClock,
        }
    }
}
