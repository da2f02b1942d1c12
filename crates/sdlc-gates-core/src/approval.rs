//! Append-only ledger of gate approvals.
//!
//! Layout:
//!   .sdlc/gate-status.json   `gate → { approvals: [{agent, timestamp}], last_updated }`
//!
//! Writers follow read-entire / mutate / write-entire while holding
//! `.sdlc/gate-status.json.lock`. `save` also rejects the write with
//! `LedgerConflict` if the file on disk no longer matches what the paired
//! `load` read.

use crate::error::{GateError, Result};
use crate::io;
use crate::paths;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// How long a writer waits for the ledger lock.
pub const LOCK_WAIT: Duration = Duration::from_secs(10);

/// Age after which a leftover lock file is treated as abandoned.
pub const LOCK_STALE_AFTER: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub agent: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRecord")]
pub struct ApprovalRecord {
    pub approvals: Vec<Approval>,
    pub last_updated: DateTime<Utc>,
}

impl ApprovalRecord {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            approvals: Vec::new(),
            last_updated: now,
        }
    }

    pub fn contains(&self, agent: &str) -> bool {
        self.approvals.iter().any(|a| a.agent == agent)
    }

    pub fn agents(&self) -> impl Iterator<Item = &str> {
        self.approvals.iter().map(|a| a.agent.as_str())
    }

    /// Append `agent` unless already present. Returns true if appended.
    pub fn add(&mut self, agent: &str, now: DateTime<Utc>) -> bool {
        if self.contains(agent) {
            return false;
        }
        self.approvals.push(Approval {
            agent: agent.to_string(),
            timestamp: now,
        });
        self.last_updated = now;
        true
    }
}

// Older ledgers stored bare agent names, a naive local timestamp, and a
// cached `status` field. The status is dropped: it is always recomputed.
#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    approvals: Vec<RawApproval>,
    #[serde(default)]
    last_updated: Option<RawTimestamp>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawApproval {
    Agent(String),
    Full {
        agent: String,
        timestamp: RawTimestamp,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Utc(DateTime<Utc>),
    Naive(NaiveDateTime),
}

impl From<RawTimestamp> for DateTime<Utc> {
    fn from(raw: RawTimestamp) -> Self {
        match raw {
            RawTimestamp::Utc(t) => t,
            RawTimestamp::Naive(t) => t.and_utc(),
        }
    }
}

impl From<RawRecord> for ApprovalRecord {
    fn from(raw: RawRecord) -> Self {
        let last_updated: DateTime<Utc> = raw.last_updated.map(Into::into).unwrap_or_default();
        let mut record = ApprovalRecord::new(last_updated);
        for entry in raw.approvals {
            let (agent, timestamp) = match entry {
                RawApproval::Agent(agent) => (agent, last_updated),
                RawApproval::Full { agent, timestamp } => (agent, timestamp.into()),
            };
            if !record.contains(&agent) {
                record.approvals.push(Approval { agent, timestamp });
            }
        }
        record
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// In-memory copy of the ledger plus the exact document it was read from.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub records: BTreeMap<String, ApprovalRecord>,
    baseline: Option<String>,
}

impl Ledger {
    pub fn record(&self, gate: &str) -> Option<&ApprovalRecord> {
        self.records.get(gate)
    }

    /// Agents that have approved `gate`; empty if the gate has no record.
    pub fn approvals_for(&self, gate: &str) -> HashSet<&str> {
        self.records
            .get(gate)
            .map(|r| r.agents().collect())
            .unwrap_or_default()
    }

    /// Append an approval, creating the gate's record on first use.
    /// Returns false when the agent had already approved.
    pub fn record_approval(&mut self, gate: &str, agent: &str, now: DateTime<Utc>) -> bool {
        self.records
            .entry(gate.to_string())
            .or_insert_with(|| ApprovalRecord::new(now))
            .add(agent, now)
    }
}

// ---------------------------------------------------------------------------
// ApprovalStore
// ---------------------------------------------------------------------------

pub trait ApprovalStore {
    /// Held for the duration of a load/mutate/save cycle.
    type Lock;

    /// Block until this caller is the only writer.
    fn lock(&self) -> Result<Self::Lock>;

    /// Read the whole ledger. A store with nothing persisted yields an empty ledger.
    fn load(&self) -> Result<Ledger>;

    /// Persist the whole ledger, failing with `LedgerConflict` if the
    /// underlying document changed since `ledger` was loaded.
    fn save(&self, ledger: &mut Ledger) -> Result<()>;

    /// Idempotently record that `agent` approved `gate` under the store's lock.
    /// Returns the ledger as saved and whether a new entry was appended.
    fn record_approval(&self, gate: &str, agent: &str) -> Result<(Ledger, bool)> {
        let _lock = self.lock()?;
        let mut ledger = self.load()?;
        if !ledger.record_approval(gate, agent, Utc::now()) {
            debug!(gate, agent, "approval already recorded");
            return Ok((ledger, false));
        }
        self.save(&mut ledger)?;
        Ok((ledger, true))
    }
}

/// JSON ledger stored under the project root.
#[derive(Debug, Clone)]
pub struct FileApprovalStore {
    path: PathBuf,
}

impl FileApprovalStore {
    pub fn new(root: &Path) -> Self {
        Self {
            path: paths::gate_status_path(root),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ApprovalStore for FileApprovalStore {
    type Lock = io::LockFile;

    fn lock(&self) -> Result<io::LockFile> {
        io::LockFile::acquire(&paths::lock_path(&self.path), LOCK_WAIT, LOCK_STALE_AFTER)
    }

    fn load(&self) -> Result<Ledger> {
        let Some(data) = io::read_if_exists(&self.path)? else {
            return Ok(Ledger::default());
        };
        let records = if data.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&data)?
        };
        Ok(Ledger {
            records,
            baseline: Some(data),
        })
    }

    fn save(&self, ledger: &mut Ledger) -> Result<()> {
        let current = io::read_if_exists(&self.path)?;
        if current != ledger.baseline {
            return Err(GateError::LedgerConflict {
                path: self.path.clone(),
            });
        }
        let mut data = serde_json::to_string_pretty(&ledger.records)?;
        data.push('\n');
        io::atomic_write(&self.path, data.as_bytes())?;
        ledger.baseline = Some(data);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileApprovalStore::new(dir.path());
        assert!(store.load().unwrap().records.is_empty());
    }

    #[test]
    fn record_approval_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileApprovalStore::new(dir.path());

        let (_, added) = store.record_approval("design", "architect").unwrap();
        assert!(added);
        let (ledger, added) = store.record_approval("design", "architect").unwrap();
        assert!(!added);
        assert_eq!(ledger.record("design").unwrap().approvals.len(), 1);

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.record("design").unwrap().approvals.len(), 1);
    }

    #[test]
    fn approvals_keep_insertion_order() {
        let dir = TempDir::new().unwrap();
        let store = FileApprovalStore::new(dir.path());
        for agent in ["c", "a", "b"] {
            store.record_approval("review", agent).unwrap();
        }
        let ledger = store.load().unwrap();
        let agents: Vec<&str> = ledger.record("review").unwrap().agents().collect();
        assert_eq!(agents, vec!["c", "a", "b"]);
    }

    #[test]
    fn save_of_unmodified_load_roundtrips() {
        let dir = TempDir::new().unwrap();
        let store = FileApprovalStore::new(dir.path());
        store.record_approval("design", "architect").unwrap();
        store.record_approval("review", "a").unwrap();

        let before = store.load().unwrap();
        let mut copy = store.load().unwrap();
        store.save(&mut copy).unwrap();
        let after = store.load().unwrap();
        assert_eq!(before.records, after.records);
    }

    #[test]
    fn stale_save_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FileApprovalStore::new(dir.path());

        let mut first = store.load().unwrap();
        let mut second = store.load().unwrap();

        first.record_approval("design", "architect", Utc::now());
        store.save(&mut first).unwrap();

        second.record_approval("design", "security", Utc::now());
        assert!(matches!(
            store.save(&mut second),
            Err(GateError::LedgerConflict { .. })
        ));

        // the first writer's approval survived
        let ledger = store.load().unwrap();
        assert!(ledger.record("design").unwrap().contains("architect"));
        assert!(!ledger.record("design").unwrap().contains("security"));
    }

    #[test]
    fn saved_ledger_can_be_saved_again() {
        let dir = TempDir::new().unwrap();
        let store = FileApprovalStore::new(dir.path());
        let mut ledger = store.load().unwrap();
        ledger.record_approval("design", "a", Utc::now());
        store.save(&mut ledger).unwrap();
        ledger.record_approval("design", "b", Utc::now());
        store.save(&mut ledger).unwrap();
        assert_eq!(store.load().unwrap().approvals_for("design").len(), 2);
    }

    #[test]
    fn concurrent_writers_keep_every_approval() {
        const WRITERS: usize = 8;
        for _ in 0..10 {
            let dir = TempDir::new().unwrap();
            let root = dir.path().to_path_buf();
            let barrier = std::sync::Arc::new(std::sync::Barrier::new(WRITERS));
            let handles: Vec<_> = (0..WRITERS)
                .map(|i| {
                    let root = root.clone();
                    let barrier = barrier.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        FileApprovalStore::new(&root)
                            .record_approval("design", &format!("agent-{i}"))
                            .unwrap()
                    })
                })
                .collect();
            for h in handles {
                assert!(h.join().unwrap().1);
            }

            let ledger = FileApprovalStore::new(&root).load().unwrap();
            assert_eq!(ledger.approvals_for("design").len(), WRITERS);
            assert!(!paths::lock_path(&paths::gate_status_path(&root)).exists());
        }
    }

    #[test]
    fn record_approval_waits_for_held_lock() {
        let dir = TempDir::new().unwrap();
        let store = FileApprovalStore::new(dir.path());
        let held = store.lock().unwrap();

        let root = dir.path().to_path_buf();
        let writer = std::thread::spawn(move || {
            FileApprovalStore::new(&root).record_approval("design", "architect")
        });
        std::thread::sleep(Duration::from_millis(100));
        assert!(store.load().unwrap().records.is_empty());

        drop(held);
        let (ledger, added) = writer.join().unwrap().unwrap();
        assert!(added);
        assert!(ledger.record("design").unwrap().contains("architect"));
    }

    #[test]
    fn reads_legacy_layout() {
        let dir = TempDir::new().unwrap();
        let path = paths::gate_status_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{
  "design": {
    "approvals": ["solution-architect", "security-architect", "solution-architect"],
    "status": "approved",
    "last_updated": "2024-03-01T09:30:00.123456"
  }
}"#,
        )
        .unwrap();

        let ledger = FileApprovalStore::new(dir.path()).load().unwrap();
        let record = ledger.record("design").unwrap();
        assert_eq!(record.approvals.len(), 2);
        assert_eq!(record.approvals[0].timestamp, record.last_updated);
        assert_eq!(
            ledger.approvals_for("design"),
            ["solution-architect", "security-architect"].into_iter().collect()
        );
    }

    #[test]
    fn written_layout_has_agent_and_timestamp() {
        let dir = TempDir::new().unwrap();
        let store = FileApprovalStore::new(dir.path());
        store.record_approval("design", "architect").unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["design"]["approvals"][0]["agent"], "architect");
        assert!(raw["design"]["approvals"][0]["timestamp"].is_string());
        assert!(raw["design"]["last_updated"].is_string());
        assert!(raw["design"].get("status").is_none());
    }
}
