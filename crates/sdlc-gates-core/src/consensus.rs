//! Voting policies for gate approvals.
//!
//! Pure functions only: callers supply the resolved required agents and the
//! set of agents that have approved.

use crate::types::ConsensusType;
use std::collections::HashSet;

/// Whether `approvals` satisfies `consensus` over `required_agents`.
///
/// `Majority` compares against `n / 2` in real arithmetic, so an even-sized
/// set needs more than half (two of two, three of four). A gate with no
/// required agents is satisfied under either policy.
pub fn evaluate(required_agents: &[String], approvals: &HashSet<&str>, consensus: ConsensusType) -> bool {
    if required_agents.is_empty() {
        return true;
    }
    match consensus {
        ConsensusType::All => required_agents.iter().all(|a| approvals.contains(a.as_str())),
        ConsensusType::Majority => {
            let count = approved_count(required_agents, approvals);
            count as f64 > required_agents.len() as f64 / 2.0
        }
    }
}

/// Number of required agents present in `approvals`.
pub fn approved_count(required_agents: &[String], approvals: &HashSet<&str>) -> usize {
    required_agents
        .iter()
        .filter(|a| approvals.contains(a.as_str()))
        .count()
}

/// Required agents that have not approved, in `required_agents` order.
pub fn missing_agents<'a>(required_agents: &'a [String], approvals: &HashSet<&str>) -> Vec<&'a str> {
    required_agents
        .iter()
        .filter(|a| !approvals.contains(a.as_str()))
        .map(String::as_str)
        .collect()
}
