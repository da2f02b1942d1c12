use crate::approval::{Approval, ApprovalStore, Ledger};
use crate::config::{self, GatesConfig};
use crate::consensus;
use crate::error::Result;
use crate::gate::{GateCheck, GateDefinition};
use crate::io;
use crate::paths;
use crate::probe::ValidationProbe;
use crate::types::{ConsensusType, GateStatus, Phase, PhaseState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// What `approve` reports back: the ledger entry and the re-derived status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub gate: String,
    pub agent: String,
    pub level: String,
    /// False when the agent had already approved this gate.
    pub newly_recorded: bool,
    /// Whether the agent is one of the gate's required agents at this level.
    pub required_agent: bool,
    pub status: GateStatus,
    pub approvals: Vec<String>,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSummary {
    pub gate: String,
    pub level: String,
    pub mandatory: bool,
    pub consensus_type: ConsensusType,
    pub required_agents: Vec<String>,
    pub approvals: Vec<Approval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    pub status: GateStatus,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub phase: Phase,
    pub state: PhaseState,
}

// ---------------------------------------------------------------------------
// GateEngine
// ---------------------------------------------------------------------------

/// Everything an engine operation needs, passed explicitly: the project root
/// that relative document paths resolve against, the loaded configuration,
/// the approval store and the validation probe.
#[derive(Debug)]
pub struct GateEngine<S, P> {
    root: PathBuf,
    config: GatesConfig,
    store: S,
    probe: P,
}

impl<S: ApprovalStore, P: ValidationProbe> GateEngine<S, P> {
    pub fn new(root: &Path, config: GatesConfig, store: S, probe: P) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            store,
            probe,
        }
    }

    pub fn config(&self) -> &GatesConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // -----------------------------------------------------------------------
    // check_gate
    // -----------------------------------------------------------------------

    /// Evaluate every requirement of `gate_name` under `level`.
    ///
    /// Failures accumulate in a fixed order (documents, validation checks,
    /// approvals) so a caller sees everything that remains in one pass.
    pub fn check_gate(&self, gate_name: &str, level: &str) -> Result<GateCheck> {
        let def = self.config.resolve(gate_name, level)?;
        let mut issues = self.document_issues(&def);
        issues.extend(self.validation_issues(&def));

        let ledger = self.store.load()?;
        issues.extend(approval_issues(&def, &ledger));

        debug!(gate = gate_name, level, issues = issues.len(), "gate checked");
        Ok(GateCheck::new(gate_name, level, issues))
    }

    fn document_issues(&self, def: &GateDefinition) -> Vec<String> {
        let mut issues = Vec::new();
        for entry in &def.required_docs {
            if paths::is_doc_pattern(entry) {
                let dir = paths::pattern_dir(&self.root, entry);
                if !io::dir_has_entries(&dir) {
                    issues.push(format!("Missing required document matching: {entry}"));
                }
            } else if !self.root.join(entry).exists() {
                issues.push(format!("Missing required document: {entry}"));
            }
        }
        issues
    }

    fn validation_issues(&self, def: &GateDefinition) -> Vec<String> {
        let mut issues = Vec::new();
        for check in &def.validation_checks {
            let timeout = self
                .config
                .probe(check)
                .map(|p| p.timeout_seconds)
                .unwrap_or_else(config::default_probe_timeout);
            let outcome = self
                .probe
                .run(check, Duration::from_secs(u64::from(timeout)));
            if !outcome.passed() {
                warn!(gate = %def.name, check = %check, %outcome, "validation check failed");
                issues.push(format!("Validation failing: {check}"));
            }
        }
        issues
    }

    // -----------------------------------------------------------------------
    // approve
    // -----------------------------------------------------------------------

    /// Record `agent_id`'s approval of `gate_name` and report the gate's
    /// status afterwards.
    ///
    /// Agents outside the required set are still recorded; they do not count
    /// toward consensus unless a later configuration makes them required.
    pub fn approve(&self, gate_name: &str, agent_id: &str, level: &str) -> Result<ApprovalOutcome> {
        let def = self.config.resolve(gate_name, level)?;
        let required_agent = def.requires_agent(agent_id);
        if !required_agent {
            info!(
                gate = gate_name,
                agent = agent_id,
                level,
                "recording approval from an agent the gate does not require"
            );
        }

        let (ledger, newly_recorded) = self.store.record_approval(gate_name, agent_id)?;
        let approvals = ledger.approvals_for(gate_name);
        let status = GateStatus::from_satisfied(consensus::evaluate(
            &def.required_agents,
            &approvals,
            def.consensus_type,
        ));

        Ok(ApprovalOutcome {
            gate: gate_name.to_string(),
            agent: agent_id.to_string(),
            level: level.to_string(),
            newly_recorded,
            required_agent,
            status,
            approvals: ledger
                .record(gate_name)
                .map(|r| r.agents().map(str::to_string).collect())
                .unwrap_or_default(),
            missing: consensus::missing_agents(&def.required_agents, &approvals)
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
    }

    // -----------------------------------------------------------------------
    // status
    // -----------------------------------------------------------------------

    /// Approval status of every configured gate, phase gates first.
    pub fn status(&self, level: &str) -> Result<Vec<GateSummary>> {
        self.config.validate_level(level)?;
        let ledger = self.store.load()?;
        self.config
            .gate_names()
            .into_iter()
            .map(|name| {
                let def = self.config.resolve(name, level)?;
                Ok(summarize(&def, &ledger))
            })
            .collect()
    }

    /// Where the workflow stands: phases before the first pending gate are
    /// complete, that phase is active, the rest are not reached.
    pub fn phase_states(&self, level: &str) -> Result<Vec<PhaseProgress>> {
        let ledger = self.store.load()?;
        let mut active_seen = false;
        let mut progress = Vec::with_capacity(Phase::all().len());
        for phase in Phase::all() {
            let def = self.config.resolve(phase.as_str(), level)?;
            let state = if active_seen {
                PhaseState::NotReached
            } else if gate_status(&def, &ledger) == GateStatus::Approved {
                PhaseState::Complete
            } else {
                active_seen = true;
                PhaseState::Active
            };
            progress.push(PhaseProgress {
                phase: *phase,
                state,
            });
        }
        Ok(progress)
    }

    /// Mandatory agent order for a named scenario.
    pub fn sequence(&self, scenario: &str) -> Option<&[String]> {
        self.config.sequence(scenario)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Status derived from the ledger; recomputed on every call.
pub fn gate_status(def: &GateDefinition, ledger: &Ledger) -> GateStatus {
    let approvals = ledger.approvals_for(&def.name);
    GateStatus::from_satisfied(consensus::evaluate(
        &def.required_agents,
        &approvals,
        def.consensus_type,
    ))
}

fn approval_issues(def: &GateDefinition, ledger: &Ledger) -> Vec<String> {
    let approvals = ledger.approvals_for(&def.name);
    if consensus::evaluate(&def.required_agents, &approvals, def.consensus_type) {
        return Vec::new();
    }
    consensus::missing_agents(&def.required_agents, &approvals)
        .into_iter()
        .map(|agent| format!("Missing approval from: {agent}"))
        .collect()
}

fn summarize(def: &GateDefinition, ledger: &Ledger) -> GateSummary {
    let record = ledger.record(&def.name);
    let approvals = ledger.approvals_for(&def.name);
    GateSummary {
        gate: def.name.clone(),
        level: def.level.clone(),
        mandatory: def.mandatory,
        consensus_type: def.consensus_type,
        required_agents: def.required_agents.clone(),
        approvals: record.map(|r| r.approvals.clone()).unwrap_or_default(),
        last_updated: record.map(|r| r.last_updated),
        status: gate_status(def, ledger),
        missing: consensus::missing_agents(&def.required_agents, &approvals)
            .into_iter()
            .map(str::to_string)
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
