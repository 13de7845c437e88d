use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Lifecycle of the scheduler loop. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Running,
    Stopped,
    Ended,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Running => write!(f, "running"),
            SchedulerState::Stopped => write!(f, "stopped"),
            SchedulerState::Ended => write!(f, "ended"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
    End,
    Clear,
}

impl ControlCommand {
    /// Parse a control token. Unknown tokens yield `None`.
    pub fn parse(token: &str) -> Option<Self> {
        token.parse().ok()
    }
}

impl FromStr for ControlCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "start" => Ok(ControlCommand::Start),
            "stop" => Ok(ControlCommand::Stop),
            "end" => Ok(ControlCommand::End),
            "clear" => Ok(ControlCommand::Clear),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlCommand::Start => write!(f, "start"),
            ControlCommand::Stop => write!(f, "stop"),
            ControlCommand::End => write!(f, "end"),
            ControlCommand::Clear => write!(f, "clear"),
        }
    }
}

impl SchedulerState {
    /// State after applying `command`. `clear` never changes state and nothing leaves `Ended`.
    pub fn apply(self, command: ControlCommand) -> SchedulerState {
        match (self, command) {
            (SchedulerState::Ended, _) => SchedulerState::Ended,
            (_, ControlCommand::End) => SchedulerState::Ended,
            (_, ControlCommand::Start) => SchedulerState::Running,
            (_, ControlCommand::Stop) => SchedulerState::Stopped,
            (state, ControlCommand::Clear) => state,
        }
    }
}
