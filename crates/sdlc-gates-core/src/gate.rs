use crate::types::ConsensusType;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GateSpec
// ---------------------------------------------------------------------------

/// A gate as written in the configuration file, before level overrides.
///
/// `consensus_type` stays a string here so that an unknown policy surfaces as
/// a configuration error naming the gate, not as a bare parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateSpec {
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
    #[serde(default)]
    pub required_agents: Vec<String>,
    #[serde(default = "default_consensus")]
    pub consensus_type: String,
    #[serde(default)]
    pub required_docs: Vec<String>,
    #[serde(default)]
    pub validation_checks: Vec<String>,
}

fn default_mandatory() -> bool {
    true
}

fn default_consensus() -> String {
    ConsensusType::All.as_str().to_string()
}

impl GateSpec {
    pub fn new(required_agents: &[&str], consensus: ConsensusType) -> Self {
        Self {
            mandatory: true,
            required_agents: required_agents.iter().map(|s| s.to_string()).collect(),
            consensus_type: consensus.as_str().to_string(),
            required_docs: Vec::new(),
            validation_checks: Vec::new(),
        }
    }

    pub fn with_docs(mut self, docs: &[&str]) -> Self {
        self.required_docs = docs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_checks(mut self, checks: &[&str]) -> Self {
        self.validation_checks = checks.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn has_requirements(&self) -> bool {
        !(self.required_agents.is_empty()
            && self.required_docs.is_empty()
            && self.validation_checks.is_empty())
    }
}

// ---------------------------------------------------------------------------
// GatePatch
// ---------------------------------------------------------------------------

/// Partial gate fields. Set fields replace the base value; unset fields inherit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandatory: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_agents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consensus_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_docs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_checks: Option<Vec<String>>,
}

impl GatePatch {
    pub fn is_empty(&self) -> bool {
        *self == GatePatch::default()
    }

    /// Apply onto a copy of `base`; the base is never modified.
    pub fn apply(&self, base: &GateSpec) -> GateSpec {
        GateSpec {
            mandatory: self.mandatory.unwrap_or(base.mandatory),
            required_agents: self
                .required_agents
                .clone()
                .unwrap_or_else(|| base.required_agents.clone()),
            consensus_type: self
                .consensus_type
                .clone()
                .unwrap_or_else(|| base.consensus_type.clone()),
            required_docs: self
                .required_docs
                .clone()
                .unwrap_or_else(|| base.required_docs.clone()),
            validation_checks: self
                .validation_checks
                .clone()
                .unwrap_or_else(|| base.validation_checks.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// GateDefinition
// ---------------------------------------------------------------------------

/// The effective definition of a gate under one level, fully validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDefinition {
    pub name: String,
    pub level: String,
    pub mandatory: bool,
    pub required_agents: Vec<String>,
    pub consensus_type: ConsensusType,
    pub required_docs: Vec<String>,
    pub validation_checks: Vec<String>,
}

impl GateDefinition {
    pub fn requires_agent(&self, agent: &str) -> bool {
        self.required_agents.iter().any(|a| a == agent)
    }
}

// ---------------------------------------------------------------------------
// GateCheck
// ---------------------------------------------------------------------------

/// Outcome of evaluating every requirement of a gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateCheck {
    pub gate: String,
    pub level: String,
    pub passed: bool,
    pub issues: Vec<String>,
}

impl GateCheck {
    pub fn new(gate: &str, level: &str, issues: Vec<String>) -> Self {
        Self {
            gate: gate.to_string(),
            level: level.to_string(),
            passed: issues.is_empty(),
            issues,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_spec_defaults() {
        let yaml = "required_agents: [solution-architect]\n";
        let spec: GateSpec = serde_yaml::from_str(yaml).unwrap();
        assert!(spec.mandatory);
        assert_eq!(spec.consensus_type, "all");
        assert!(spec.required_docs.is_empty());
        assert!(spec.validation_checks.is_empty());
    }

    #[test]
    fn gate_spec_rejects_unknown_fields() {
        let yaml = "required_agent: [solution-architect]\n";
        assert!(serde_yaml::from_str::<GateSpec>(yaml).is_err());
    }

    #[test]
    fn patch_replaces_only_set_fields() {
        let base = GateSpec::new(&["a", "b"], ConsensusType::All).with_docs(&["docs/x.md"]);
        let patch = GatePatch {
            consensus_type: Some("majority".to_string()),
            required_docs: Some(Vec::new()),
            ..GatePatch::default()
        };
        let merged = patch.apply(&base);
        assert_eq!(merged.required_agents, base.required_agents);
        assert_eq!(merged.consensus_type, "majority");
        assert!(merged.required_docs.is_empty());
        // base untouched
        assert_eq!(base.required_docs, vec!["docs/x.md".to_string()]);
    }

    #[test]
    fn empty_patch_is_identity() {
        let base = GateSpec::new(&["a"], ConsensusType::Majority).with_checks(&["security-scan"]);
        let patch = GatePatch::default();
        assert!(patch.is_empty());
        assert_eq!(patch.apply(&base), base);
    }

    #[test]
    fn gate_check_passed_tracks_issues() {
        assert!(GateCheck::new("design", "production", vec![]).passed);
        let failing = GateCheck::new(
            "design",
            "production",
            vec!["Missing approval from: security".to_string()],
        );
        assert!(!failing.passed);
    }
}
