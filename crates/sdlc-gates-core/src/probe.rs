use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Result of running one named validation check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Passed,
    Failed { detail: String },
    TimedOut { after_secs: u64 },
    /// The check could not be run at all (no probe configured, spawn failure).
    Unavailable { reason: String },
}

impl ProbeOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, ProbeOutcome::Passed)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Passed => f.write_str("passed"),
            ProbeOutcome::Failed { detail } => write!(f, "failed: {detail}"),
            ProbeOutcome::TimedOut { after_secs } => write!(f, "timed out after {after_secs}s"),
            ProbeOutcome::Unavailable { reason } => write!(f, "unavailable: {reason}"),
        }
    }
}

/// External check runner. The engine never interprets a check itself; it
/// only asks the probe and folds anything but `Passed` into the gate's issues.
///
/// Implementations must return within `timeout`.
pub trait ValidationProbe {
    fn run(&self, check: &str, timeout: Duration) -> ProbeOutcome;
}

impl<P: ValidationProbe + ?Sized> ValidationProbe for &P {
    fn run(&self, check: &str, timeout: Duration) -> ProbeOutcome {
        (**self).run(check, timeout)
    }
}
