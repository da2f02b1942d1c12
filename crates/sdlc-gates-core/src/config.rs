use crate::error::{GateError, Result};
use crate::gate::{GateDefinition, GatePatch, GateSpec};
use crate::paths;
use crate::types::{ConsensusType, Phase};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Levels that exist even when the configuration declares no overrides for them.
pub const BUILTIN_LEVELS: &[&str] = &["prototype", "production", "enterprise"];

pub const DEFAULT_LEVEL: &str = "production";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn warning(message: String) -> Self {
        Self {
            level: WarnLevel::Warning,
            message,
        }
    }

    fn error(message: String) -> Self {
        Self {
            level: WarnLevel::Error,
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// LevelOverride
// ---------------------------------------------------------------------------

/// Field patch for one level: the top-level fields apply to every gate, then
/// the matching entry under `gates` applies to that gate only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelOverride {
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
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub gates: BTreeMap<String, GatePatch>,
}

impl LevelOverride {
    /// The level-wide part of the override.
    pub fn patch(&self) -> GatePatch {
        GatePatch {
            mandatory: self.mandatory,
            required_agents: self.required_agents.clone(),
            consensus_type: self.consensus_type.clone(),
            required_docs: self.required_docs.clone(),
            validation_checks: self.validation_checks.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConflictPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConflictPolicy {
    #[serde(default)]
    pub veto_agents: Vec<String>,
    #[serde(default)]
    pub escalation_path: Vec<String>,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        Self {
            veto_agents: vec!["security-architect".to_string()],
            escalation_path: vec![
                "solution-architect".to_string(),
                "critical-goal-reviewer".to_string(),
                "human-reviewer".to_string(),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// ProbeSpec
// ---------------------------------------------------------------------------

/// Shell command backing a named validation check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeSpec {
    pub command: String,
    #[serde(default = "default_probe_timeout")]
    pub timeout_seconds: u32,
}

pub fn default_probe_timeout() -> u32 {
    30
}

impl ProbeSpec {
    fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            timeout_seconds: default_probe_timeout(),
        }
    }
}

fn default_probes() -> BTreeMap<String, ProbeSpec> {
    let mut m = BTreeMap::new();
    m.insert(
        "technical-debt".to_string(),
        ProbeSpec::new("python tools/validation/check-technical-debt.py"),
    );
    m.insert(
        "test-coverage".to_string(),
        ProbeSpec::new("python -m pytest --cov"),
    );
    m.insert(
        "security-scan".to_string(),
        ProbeSpec::new("python tools/validation/security-scan.py"),
    );
    m.insert(
        "architecture-complete".to_string(),
        ProbeSpec::new("python tools/validation/validate-architecture.py"),
    );
    m
}

// ---------------------------------------------------------------------------
// GatesConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatesConfig {
    pub gates: BTreeMap<String, GateSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub level_overrides: BTreeMap<String, LevelOverride>,
    #[serde(default)]
    pub conflict_resolution: ConflictPolicy,
    #[serde(default = "default_probes")]
    pub probes: BTreeMap<String, ProbeSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sequences: BTreeMap<String, Vec<String>>,
}

impl Default for GatesConfig {
    fn default() -> Self {
        let mut gates = BTreeMap::new();
        gates.insert(
            Phase::Requirements.to_string(),
            GateSpec::new(
                &["solution-architect", "critical-goal-reviewer"],
                ConsensusType::All,
            )
            .with_docs(&["docs/feature-proposals/XX-feature.md"]),
        );
        gates.insert(
            Phase::Design.to_string(),
            GateSpec::new(
                &["solution-architect", "security-architect"],
                ConsensusType::Majority,
            )
            .with_docs(&[
                "docs/architecture/requirements-traceability-matrix.md",
                "docs/architecture/what-if-analysis.md",
                "docs/architecture/architecture-decision-record.md",
                "docs/architecture/system-invariants.md",
                "docs/architecture/integration-design.md",
                "docs/architecture/failure-mode-analysis.md",
            ]),
        );
        gates.insert(
            Phase::Implementation.to_string(),
            GateSpec::new(&["sdlc-enforcer", "test-manager"], ConsensusType::All),
        );
        gates.insert(
            Phase::Review.to_string(),
            GateSpec::new(
                &["critical-goal-reviewer", "test-manager"],
                ConsensusType::All,
            ),
        );
        gates.insert(
            Phase::Deployment.to_string(),
            GateSpec::new(&["sre-specialist", "compliance-auditor"], ConsensusType::All),
        );

        Self {
            gates,
            level_overrides: BTreeMap::new(),
            conflict_resolution: ConflictPolicy::default(),
            probes: default_probes(),
            sequences: BTreeMap::new(),
        }
    }
}

impl GatesConfig {
    /// Load the gate configuration for a project.
    ///
    /// A missing or unreadable file yields the built-in defaults. A file that
    /// parses but fails validation is a hard error.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::gates_config_path(root);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no gate config found, using built-in defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "gate config unreadable, using built-in defaults");
                return Ok(Self::default());
            }
        };
        Self::from_yaml(&data).map_err(|e| match e {
            GateError::Configuration(m) => {
                GateError::Configuration(format!("{}: {m}", path.display()))
            }
            other => other,
        })
    }

    /// Parse and validate a configuration document.
    pub fn from_yaml(data: &str) -> Result<Self> {
        let cfg: GatesConfig =
            serde_yaml::from_str(data).map_err(|e| GateError::Configuration(e.to_string()))?;
        cfg.check()?;
        Ok(cfg)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Log warnings and fail on any error-level finding.
    fn check(&self) -> Result<()> {
        let mut errors = Vec::new();
        for w in self.validate() {
            match w.level {
                WarnLevel::Warning => warn!("{}", w.message),
                WarnLevel::Error => errors.push(w.message),
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GateError::Configuration(errors.join("; ")))
        }
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn has_gate(&self, name: &str) -> bool {
        self.gates.contains_key(name)
    }

    /// Every level a caller may select.
    pub fn known_levels(&self) -> Vec<String> {
        let mut levels: Vec<String> = BUILTIN_LEVELS.iter().map(|s| s.to_string()).collect();
        for name in self.level_overrides.keys() {
            if !levels.contains(name) {
                levels.push(name.clone());
            }
        }
        levels
    }

    pub fn validate_level(&self, level: &str) -> Result<()> {
        if BUILTIN_LEVELS.contains(&level) || self.level_overrides.contains_key(level) {
            Ok(())
        } else {
            Err(GateError::InvalidLevel(format!(
                "'{level}': expected one of {}",
                self.known_levels().join(", ")
            )))
        }
    }

    /// Effective definition of `gate_name` under `level`.
    ///
    /// The gate must exist in the base table; an override alone does not
    /// define a gate.
    pub fn resolve(&self, gate_name: &str, level: &str) -> Result<GateDefinition> {
        let base = self
            .gates
            .get(gate_name)
            .ok_or_else(|| GateError::UnknownGate(gate_name.to_string()))?;
        self.validate_level(level)?;

        let spec = match self.level_overrides.get(level) {
            Some(ov) => {
                let spec = ov.patch().apply(base);
                match ov.gates.get(gate_name) {
                    Some(per_gate) => per_gate.apply(&spec),
                    None => spec,
                }
            }
            None => base.clone(),
        };
        debug!(gate = gate_name, level, ?spec, "resolved gate");

        let consensus_type = spec.consensus_type.parse::<ConsensusType>().map_err(|e| {
            GateError::Configuration(format!("gate '{gate_name}' at level '{level}': {e}"))
        })?;
        if let Some(dup) = first_duplicate(&spec.required_agents) {
            return Err(GateError::Configuration(format!(
                "gate '{gate_name}' at level '{level}' lists agent '{dup}' more than once"
            )));
        }

        Ok(GateDefinition {
            name: gate_name.to_string(),
            level: level.to_string(),
            mandatory: spec.mandatory,
            required_agents: spec.required_agents,
            consensus_type,
            required_docs: spec.required_docs,
            validation_checks: spec.validation_checks,
        })
    }

    /// Gate names with the phase gates first in phase order, then the rest by name.
    pub fn gate_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Phase::all()
            .iter()
            .map(|p| p.as_str())
            .filter(|p| self.gates.contains_key(*p))
            .collect();
        for name in self.gates.keys() {
            if name.parse::<Phase>().is_err() {
                names.push(name);
            }
        }
        names
    }

    pub fn probe(&self, check: &str) -> Option<&ProbeSpec> {
        self.probes.get(check)
    }

    pub fn sequence(&self, scenario: &str) -> Option<&[String]> {
        self.sequences.get(scenario).map(|v| v.as_slice())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Base gates
        for (name, spec) in &self.gates {
            if name.trim().is_empty() {
                warnings.push(ConfigWarning::error(
                    "gate with an empty name in gates".to_string(),
                ));
            }
            self.validate_spec_fields(
                &format!("gate '{name}'"),
                Some(&spec.consensus_type),
                Some(&spec.required_agents),
                Some(&spec.validation_checks),
                &mut warnings,
            );
            if !spec.has_requirements() {
                warnings.push(ConfigWarning::warning(format!(
                    "gate '{name}' has no required agents, documents, or checks"
                )));
            }
        }

        for phase in Phase::all() {
            if !self.gates.contains_key(phase.as_str()) {
                warnings.push(ConfigWarning::warning(format!(
                    "no gate defined for phase '{phase}'; transitions out of it will fail"
                )));
            }
        }

        // 2. Level overrides
        for (level, ov) in &self.level_overrides {
            self.validate_spec_fields(
                &format!("level_overrides.{level}"),
                ov.consensus_type.as_ref(),
                ov.required_agents.as_ref(),
                ov.validation_checks.as_ref(),
                &mut warnings,
            );
            for (gate, patch) in &ov.gates {
                if !self.gates.contains_key(gate) {
                    warnings.push(ConfigWarning::warning(format!(
                        "level_overrides.{level} patches unknown gate '{gate}'"
                    )));
                }
                self.validate_spec_fields(
                    &format!("level_overrides.{level}.gates.{gate}"),
                    patch.consensus_type.as_ref(),
                    patch.required_agents.as_ref(),
                    patch.validation_checks.as_ref(),
                    &mut warnings,
                );
            }
        }

        // 3. Probes
        for (check, probe) in &self.probes {
            if probe.command.trim().is_empty() {
                warnings.push(ConfigWarning::error(format!(
                    "probe '{check}' has an empty command"
                )));
            }
            if probe.timeout_seconds == 0 {
                warnings.push(ConfigWarning::error(format!(
                    "probe '{check}' has timeout_seconds=0 (probes must be bounded)"
                )));
            }
        }

        // 4. Conflict resolution and sequences
        if self.conflict_resolution.escalation_path.is_empty() {
            warnings.push(ConfigWarning::warning(
                "conflict_resolution.escalation_path is empty".to_string(),
            ));
        }
        for (scenario, seq) in &self.sequences {
            if seq.is_empty() {
                warnings.push(ConfigWarning::warning(format!(
                    "sequence '{scenario}' lists no agents"
                )));
            }
        }

        warnings
    }

    fn validate_spec_fields(
        &self,
        context: &str,
        consensus_type: Option<&String>,
        required_agents: Option<&Vec<String>>,
        validation_checks: Option<&Vec<String>>,
        warnings: &mut Vec<ConfigWarning>,
    ) {
        if let Some(ct) = consensus_type {
            if let Err(e) = ct.parse::<ConsensusType>() {
                warnings.push(ConfigWarning::error(format!("{context}: {e}")));
            }
        }
        if let Some(dup) = required_agents.and_then(|a| first_duplicate(a)) {
            warnings.push(ConfigWarning::error(format!(
                "{context} lists agent '{dup}' more than once"
            )));
        }
        for check in validation_checks.into_iter().flatten() {
            if !self.probes.contains_key(check) {
                warnings.push(ConfigWarning::warning(format!(
                    "{context} requires check '{check}' but no probe is configured for it"
                )));
            }
        }
    }
}

fn first_duplicate(items: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    items
        .iter()
        .find(|i| !seen.insert(i.as_str()))
        .map(String::as_str)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
gates:
  design:
    required_agents: [architect, security]
    consensus_type: all
    required_docs: [docs/design.md]
  review:
    required_agents: [a, b, c]
    consensus_type: majority
    validation_checks: [security-scan]
level_overrides:
  prototype:
    required_docs: []
    gates:
      review:
        required_agents: [a]
  enterprise:
    consensus_type: all
conflict_resolution:
  veto_agents: [security-architect]
  escalation_path: [solution-architect, human-reviewer]
probes:
  security-scan:
    command: "true"
    timeout_seconds: 5
sequences:
  new-feature: [solution-architect, security-architect, test-manager]
"#;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = GatesConfig::load(dir.path()).unwrap();
        assert_eq!(cfg, GatesConfig::default());
        assert_eq!(cfg.gates.len(), 5);
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = GatesConfig::default();
        assert!(cfg
            .validate()
            .iter()
            .all(|w| w.level == WarnLevel::Warning));
        let yaml = cfg.to_yaml().unwrap();
        assert_eq!(GatesConfig::from_yaml(&yaml).unwrap(), cfg);
    }

    #[test]
    fn load_reads_project_file() {
        let dir = TempDir::new().unwrap();
        let path = paths::gates_config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, SAMPLE).unwrap();
        let cfg = GatesConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.gates.len(), 2);
        assert_eq!(cfg.probe("security-scan").unwrap().timeout_seconds, 5);
        assert_eq!(
            cfg.sequence("new-feature").unwrap(),
            &["solution-architect", "security-architect", "test-manager"]
        );
    }

    #[test]
    fn malformed_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = paths::gates_config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "gates: [not, a, map]\n").unwrap();
        assert!(matches!(
            GatesConfig::load(dir.path()),
            Err(GateError::Configuration(_))
        ));
    }

    #[test]
    fn unknown_consensus_fails_whole_load() {
        let yaml = "gates:\n  design:\n    required_agents: [a]\n    consensus_type: quorum\n";
        let err = GatesConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(&err, GateError::Configuration(m) if m.contains("quorum")));
    }

    #[test]
    fn duplicate_agents_fail_load() {
        let yaml = "gates:\n  design:\n    required_agents: [a, b, a]\n";
        let err = GatesConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(&err, GateError::Configuration(m) if m.contains("'a'")));
    }

    #[test]
    fn resolve_applies_level_then_gate_patch() {
        let cfg = GatesConfig::from_yaml(SAMPLE).unwrap();

        let base = cfg.resolve("review", "production").unwrap();
        assert_eq!(base.required_agents, vec!["a", "b", "c"]);
        assert_eq!(base.consensus_type, ConsensusType::Majority);

        let proto = cfg.resolve("review", "prototype").unwrap();
        assert_eq!(proto.required_agents, vec!["a"]);
        assert_eq!(proto.consensus_type, ConsensusType::Majority);

        let design_proto = cfg.resolve("design", "prototype").unwrap();
        assert!(design_proto.required_docs.is_empty());
        assert_eq!(design_proto.required_agents, vec!["architect", "security"]);

        let ent = cfg.resolve("review", "enterprise").unwrap();
        assert_eq!(ent.consensus_type, ConsensusType::All);

        // overrides never leak into the base table
        assert_eq!(cfg.gates["review"].required_agents.len(), 3);
    }

    #[test]
    fn resolve_unknown_gate_even_if_overridden() {
        let yaml = r#"
gates:
  design:
    required_agents: [a]
level_overrides:
  prototype:
    gates:
      ghost:
        required_agents: [b]
"#;
        let cfg = GatesConfig::from_yaml(yaml).unwrap();
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.message.contains("unknown gate 'ghost'")));
        assert!(matches!(
            cfg.resolve("ghost", "prototype"),
            Err(GateError::UnknownGate(g)) if g == "ghost"
        ));
    }

    #[test]
    fn resolve_rejects_unknown_level() {
        let cfg = GatesConfig::default();
        assert!(matches!(
            cfg.resolve("design", "staging"),
            Err(GateError::InvalidLevel(_))
        ));
        assert!(cfg.resolve("design", "enterprise").is_ok());
    }

    #[test]
    fn override_with_bad_consensus_is_rejected() {
        let yaml = r#"
gates:
  design:
    required_agents: [a]
level_overrides:
  prototype:
    consensus_type: any
"#;
        assert!(matches!(
            GatesConfig::from_yaml(yaml),
            Err(GateError::Configuration(m)) if m.contains("level_overrides.prototype")
        ));
    }

    #[test]
    fn probe_without_timeout_rejected() {
        let yaml = "gates:\n  design:\n    required_agents: [a]\nprobes:\n  lint:\n    command: make lint\n    timeout_seconds: 0\n";
        assert!(GatesConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn check_without_probe_warns() {
        let yaml = "gates:\n  review:\n    validation_checks: [mutation-score]\n";
        let cfg = GatesConfig::from_yaml(yaml).unwrap();
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.level == WarnLevel::Warning && w.message.contains("mutation-score")));
    }

    #[test]
    fn gate_names_phase_order_first() {
        let mut cfg = GatesConfig::default();
        cfg.gates.insert(
            "architecture-review".to_string(),
            GateSpec::new(&["a"], ConsensusType::All),
        );
        assert_eq!(
            cfg.gate_names(),
            vec![
                "requirements",
                "design",
                "implementation",
                "review",
                "deployment",
                "architecture-review"
            ]
        );
    }
}
