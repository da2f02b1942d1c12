use crate::approval::ApprovalStore;
use crate::engine::GateEngine;
use crate::error::Result;
use crate::probe::ValidationProbe;
use crate::types::Phase;
use serde::{Deserialize, Serialize};

pub const OUT_OF_SEQUENCE: &str = "Can only proceed to next sequential phase";

/// Why a transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Blocker {
    /// One of the phase names is not part of the workflow.
    UnknownPhase,
    /// The target is not the immediate successor of the current phase.
    OutOfSequence,
    /// The current phase's gate has unmet requirements.
    GateIncomplete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProceedDecision {
    pub from: String,
    pub to: String,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocker: Option<Blocker>,
    pub reasons: Vec<String>,
}

impl ProceedDecision {
    fn allowed(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            allowed: true,
            blocker: None,
            reasons: Vec::new(),
        }
    }

    fn blocked(from: &str, to: &str, blocker: Blocker, reasons: Vec<String>) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            allowed: false,
            blocker: Some(blocker),
            reasons,
        }
    }

    /// True when the caller named a phase that does not exist.
    pub fn is_invalid_request(&self) -> bool {
        self.blocker == Some(Blocker::UnknownPhase)
    }
}

/// Check that `next` is the immediate successor of `current`, without
/// looking at any gate. Returns the parsed current phase.
pub fn check_sequence(current: &str, next: &str) -> std::result::Result<Phase, (Blocker, Vec<String>)> {
    let parsed_current = current.parse::<Phase>();
    let parsed_next = next.parse::<Phase>();
    let (current_phase, next_phase) = match (parsed_current, parsed_next) {
        (Ok(c), Ok(n)) => (c, n),
        (c, n) => {
            let reasons = [(current, c.is_err()), (next, n.is_err())]
                .into_iter()
                .filter(|(_, bad)| *bad)
                .map(|(name, _)| format!("Invalid phase name: '{name}'"))
                .collect();
            return Err((Blocker::UnknownPhase, reasons));
        }
    };
    if current_phase.next() != Some(next_phase) {
        return Err((Blocker::OutOfSequence, vec![OUT_OF_SEQUENCE.to_string()]));
    }
    Ok(current_phase)
}

impl<S: ApprovalStore, P: ValidationProbe> GateEngine<S, P> {
    /// Decide whether work may move from `current` to `next`.
    ///
    /// Sequencing is checked first and never touches gate state. A gate
    /// failure returns the gate's issues verbatim under a header line.
    /// Nothing is written either way.
    pub fn can_proceed(&self, current: &str, next: &str, level: &str) -> Result<ProceedDecision> {
        let current_phase = match check_sequence(current, next) {
            Ok(phase) => phase,
            Err((blocker, reasons)) => {
                return Ok(ProceedDecision::blocked(current, next, blocker, reasons));
            }
        };

        let check = self.check_gate(current_phase.as_str(), level)?;
        if check.passed {
            return Ok(ProceedDecision::allowed(current, next));
        }
        let mut reasons = vec![format!("Current phase '{current}' not complete:")];
        reasons.extend(check.issues);
        Ok(ProceedDecision::blocked(
            current,
            next,
            Blocker::GateIncomplete,
            reasons,
        ))
    }
}
