pub mod control;
pub mod engine;
pub mod job;
pub mod queue;
pub mod repeat;
pub mod request;

pub use control::{ControlCommand, SchedulerState};
pub use engine::{JobEvent, JobOutcome, JobSummary, Scheduler, SchedulerStatus};
pub use job::{AssetCategory, Job, JobKind, Origin, Rgb};
pub use queue::JobQueue;
pub use repeat::{IdleAction, RepeatSlot};
pub use request::DisplayRequest;
