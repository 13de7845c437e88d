//! Message sources feeding the scheduler.
//!
//! A source delivers two kinds of events: display requests and control
//! tokens. Both end up in [`dispatch`], which is the only path into the
//! scheduler from outside.

pub mod http;

use serde::Deserialize;

use crate::error::Result;
use crate::scheduler::{DisplayRequest, Scheduler};

pub use http::{router, serve, SourceState};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum InboundEvent {
    Display(DisplayRequest),
    Control { command: String },
}

/// What happened to an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Enqueued(crate::scheduler::Origin),
    Applied(crate::scheduler::SchedulerState),
    Ignored,
}

/// Route one inbound event to the scheduler.
pub async fn dispatch(scheduler: &Scheduler, event: InboundEvent) -> Result<Dispatched> {
    match event {
        InboundEvent::Display(request) => {
            let job = scheduler.submit_request(&request).await?;
            Ok(Dispatched::Enqueued(job.origin.clone()))
        }
        InboundEvent::Control { command } => Ok(scheduler
            .handle_control_token(&command)
            .await
            .map(Dispatched::Applied)
            .unwrap_or(Dispatched::Ignored)),
    }
}
