//! Resolution of disagreements between approvers on a gate.
//!
//! Advisory only: nothing here touches the approval ledger.

use crate::approval::ApprovalStore;
use crate::config::ConflictPolicy;
use crate::engine::GateEngine;
use crate::error::{GateError, Result};
use crate::probe::ValidationProbe;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// A veto agent is party to the conflict; its decision is binding.
    Veto { agent: String },
    /// No veto agent involved; route the conflict up this chain of roles.
    Escalate { path: Vec<String> },
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Veto { agent } => {
                write!(f, "{agent} has veto power - their decision stands")
            }
            Resolution::Escalate { path } if path.is_empty() => {
                f.write_str("Escalate to: (no escalation path configured)")
            }
            Resolution::Escalate { path } => write!(f, "Escalate to: {}", path.join(" -> ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub gate: String,
    pub agents: Vec<String>,
    pub resolution: Resolution,
    pub directive: String,
}

/// Pick the binding outcome for `conflicting_agents` under `policy`.
///
/// When several veto agents are involved the one listed first in the policy
/// wins, so the answer does not depend on how the caller ordered the agents.
pub fn resolve_conflict(policy: &ConflictPolicy, conflicting_agents: &[String]) -> Resolution {
    match policy
        .veto_agents
        .iter()
        .find(|veto| conflicting_agents.contains(veto))
    {
        Some(agent) => Resolution::Veto {
            agent: agent.clone(),
        },
        None => Resolution::Escalate {
            path: policy.escalation_path.clone(),
        },
    }
}

impl<S: ApprovalStore, P: ValidationProbe> GateEngine<S, P> {
    pub fn resolve(&self, gate_name: &str, conflicting_agents: &[String]) -> Result<ConflictResolution> {
        if !self.config().has_gate(gate_name) {
            return Err(GateError::UnknownGate(gate_name.to_string()));
        }
        let resolution = resolve_conflict(&self.config().conflict_resolution, conflicting_agents);
        Ok(ConflictResolution {
            gate: gate_name.to_string(),
            agents: conflicting_agents.to_vec(),
            directive: resolution.to_string(),
            resolution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatesConfig;
    use crate::engine::tests::{engine, FakeProbe};
    use tempfile::TempDir;

    fn policy(veto: &[&str], path: &[&str]) -> ConflictPolicy {
        ConflictPolicy {
            veto_agents: veto.iter().map(|s| s.to_string()).collect(),
            escalation_path: path.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn agents(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn veto_agent_wins_in_any_order() {
        let p = policy(&["security-architect"], &["cto"]);
        for order in [
            ["solution-architect", "security-architect"],
            ["security-architect", "solution-architect"],
        ] {
            let r = resolve_conflict(&p, &agents(&order));
            assert_eq!(
                r,
                Resolution::Veto {
                    agent: "security-architect".to_string()
                }
            );
            assert!(r.to_string().starts_with("security-architect has veto power"));
        }
    }

    #[test]
    fn first_veto_in_policy_order_wins() {
        let p = policy(&["compliance-auditor", "security-architect"], &[]);
        let r = resolve_conflict(&p, &agents(&["security-architect", "compliance-auditor"]));
        assert_eq!(
            r,
            Resolution::Veto {
                agent: "compliance-auditor".to_string()
            }
        );
    }

    #[test]
    fn no_veto_escalates() {
        let p = policy(&["security-architect"], &["tech-lead", "architect", "cto"]);
        let r = resolve_conflict(&p, &agents(&["a", "b"]));
        assert_eq!(r.to_string(), "Escalate to: tech-lead -> architect -> cto");
    }

    #[test]
    fn empty_escalation_path_still_renders() {
        let r = resolve_conflict(&policy(&[], &[]), &agents(&["a"]));
        assert!(r.to_string().contains("no escalation path"));
    }

    #[test]
    fn engine_resolve_checks_gate_and_leaves_ledger_alone() {
        let dir = TempDir::new().unwrap();
        let eng = engine(&dir, GatesConfig::default(), FakeProbe::default());
        let out = eng
            .resolve("design", &agents(&["solution-architect", "security-architect"]))
            .unwrap();
        assert!(out.directive.contains("security-architect"));
        assert!(matches!(
            eng.resolve("ghost", &agents(&["a"])),
            Err(GateError::UnknownGate(_))
        ));
        assert!(!crate::paths::gate_status_path(dir.path()).exists());
    }
}
