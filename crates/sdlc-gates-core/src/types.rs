use crate::error::GateError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Delivery workflow phases. The order is fixed; each phase is gated by the
/// gate of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Requirements,
    Design,
    Implementation,
    Review,
    Deployment,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[
            Phase::Requirements,
            Phase::Design,
            Phase::Implementation,
            Phase::Review,
            Phase::Deployment,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Phase> {
        Phase::all().get(self.index() + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Requirements => "requirements",
            Phase::Design => "design",
            Phase::Implementation => "implementation",
            Phase::Review => "review",
            Phase::Deployment => "deployment",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requirements" => Ok(Phase::Requirements),
            "design" => Ok(Phase::Design),
            "implementation" => Ok(Phase::Implementation),
            "review" => Ok(Phase::Review),
            "deployment" => Ok(Phase::Deployment),
            _ => Err(GateError::InvalidPhase(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ConsensusType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusType {
    All,
    Majority,
}

impl ConsensusType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsensusType::All => "all",
            ConsensusType::Majority => "majority",
        }
    }
}

impl fmt::Display for ConsensusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConsensusType {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ConsensusType::All),
            "majority" => Ok(ConsensusType::Majority),
            _ => Err(GateError::Configuration(format!(
                "unknown consensus_type '{s}': must be all or majority"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// GateStatus
// ---------------------------------------------------------------------------

/// Derived from the gate definition and its approvals on every read; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Pending,
    Approved,
}

impl GateStatus {
    pub fn from_satisfied(satisfied: bool) -> Self {
        if satisfied {
            GateStatus::Approved
        } else {
            GateStatus::Pending
        }
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateStatus::Pending => f.write_str("pending"),
            GateStatus::Approved => f.write_str("approved"),
        }
    }
}

// ---------------------------------------------------------------------------
// PhaseState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    NotReached,
    Active,
    Complete,
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PhaseState::NotReached => "not_reached",
            PhaseState::Active => "active",
            PhaseState::Complete => "complete",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
