use std::collections::VecDeque;
use std::sync::Arc;

use crate::scheduler::job::Job;

const DEFAULT_MAX_JOBS: usize = 1_000;

/// Pending jobs in pop order.
///
/// Two-tier ordering: priority jobs are pushed onto the head (the most recent
/// one runs next), everything else is appended in arrival order.
#[derive(Debug)]
pub struct JobQueue {
    jobs: VecDeque<Arc<Job>>,
    max_jobs: usize,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_JOBS)
    }

    pub fn with_capacity(max_jobs: usize) -> Self {
        Self {
            jobs: VecDeque::new(),
            max_jobs,
        }
    }

    /// Append a job behind everything already queued. Returns false if the queue is at capacity.
    pub fn append_tail(&mut self, job: Arc<Job>) -> bool {
        if self.is_full() {
            return false;
        }
        self.jobs.push_back(job);
        true
    }

    /// Put a job in front of everything already queued. Returns false if the queue is at capacity.
    pub fn insert_head(&mut self, job: Arc<Job>) -> bool {
        if self.is_full() {
            return false;
        }
        self.jobs.push_front(job);
        true
    }

    /// Route a job by its priority flag.
    pub fn push(&mut self, job: Arc<Job>) -> bool {
        if job.priority {
            self.insert_head(job)
        } else {
            self.append_tail(job)
        }
    }

    pub fn pop_head(&mut self) -> Option<Arc<Job>> {
        self.jobs.pop_front()
    }

    /// Drop every pending job. Returns the number removed.
    pub fn clear_all(&mut self) -> usize {
        let removed = self.jobs.len();
        self.jobs.clear();
        removed
    }

    /// Pending jobs in the order they would be popped
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Job>> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.jobs.len() >= self.max_jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::job::{JobKind, Origin};

    fn job(name: &str, priority: bool) -> Arc<Job> {
        Arc::new(
            Job::new(JobKind::Clock)
                .with_origin(Origin::new(name))
                .with_priority(priority),
        )
    }

    fn drain(queue: &mut JobQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.pop_head())
            .map(|j| j.origin.to_string())
            .collect()
    }

    #[test]
    fn fifo_without_priority() {
        let mut queue = JobQueue::new();
        for name in ["a", "b", "c"] {
            assert!(queue.push(job(name, false)));
        }
        assert_eq!(drain(&mut queue), vec!["a", "b", "c"]);
        assert!(queue.pop_head().is_none());
    }

    #[test]
    fn priority_jumps_ahead_of_tail() {
        let mut queue = JobQueue::new();
        queue.push(job("a", false));
        queue.push(job("b", false));
        queue.push(job("c", true));
        assert_eq!(drain(&mut queue), vec!["c", "a", "b"]);
    }

    #[test]
    fn latest_priority_runs_first() {
        let mut queue = JobQueue::new();
        queue.push(job("a", false));
        queue.push(job("p1", true));
        queue.push(job("p2", true));
        queue.push(job("b", false));
        assert_eq!(drain(&mut queue), vec!["p2", "p1", "a", "b"]);
    }

    #[test]
    fn clear_all_reports_removed() {
        let mut queue = JobQueue::new();
        queue.push(job("a", false));
        queue.push(job("b", true));
        assert_eq!(queue.clear_all(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.clear_all(), 0);
    }

    #[test]
    fn capacity_is_enforced_at_both_ends() {
        let mut queue = JobQueue::with_capacity(2);
        assert!(queue.append_tail(job("a", false)));
        assert!(queue.insert_head(job("b", true)));
        assert!(queue.is_full());
        assert!(!queue.append_tail(job("c", false)));
        assert!(!queue.insert_head(job("d", true)));
        assert_eq!(queue.len(), 2);
    }
}
