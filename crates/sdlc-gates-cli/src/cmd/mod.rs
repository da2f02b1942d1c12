pub mod approve;
pub mod check;
pub mod config;
pub mod level;
pub mod proceed;
pub mod resolve;
pub mod sequence;
pub mod status;

use crate::probe::ShellProbe;
use anyhow::Context;
use sdlc_gates_core::approval::FileApprovalStore;
use sdlc_gates_core::config::GatesConfig;
use sdlc_gates_core::level as project_level;
use sdlc_gates_core::{GateEngine, GateError};
use std::path::PathBuf;
use thiserror::Error;

pub type Engine = GateEngine<FileApprovalStore, ShellProbe>;

/// Global flags shared by every command.
pub struct Ctx {
    pub root: PathBuf,
    pub level: Option<String>,
    pub json: bool,
}

impl Ctx {
    pub fn load_config(&self) -> anyhow::Result<GatesConfig> {
        GatesConfig::load(&self.root).context("failed to load gate configuration")
    }

    pub fn engine(&self) -> anyhow::Result<Engine> {
        let config = self.load_config()?;
        let probe = ShellProbe::new(&self.root, config.probes.clone());
        Ok(GateEngine::new(
            &self.root,
            config,
            FileApprovalStore::new(&self.root),
            probe,
        ))
    }

    /// `--level` if given, else the project's level file.
    pub fn level(&self) -> anyhow::Result<String> {
        match &self.level {
            Some(level) => Ok(level.clone()),
            None => project_level::current_level(&self.root)
                .context("failed to read project level"),
        }
    }
}

/// A command ran fine but the answer is "no"; the process must still exit non-zero.
#[derive(Debug, Error)]
pub enum Refusal {
    #[error("gate '{0}' is not satisfied")]
    GateNotSatisfied(String),

    #[error("cannot proceed from '{from}' to '{to}'")]
    Blocked { from: String, to: String },

    #[error("unknown phase in '{from}' -> '{to}'")]
    UnknownPhase { from: String, to: String },
}

/// 2 for requests naming something that does not exist, 1 for everything else.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    let invalid = err
        .downcast_ref::<GateError>()
        .is_some_and(GateError::is_invalid_request)
        || matches!(
            err.downcast_ref::<Refusal>(),
            Some(Refusal::UnknownPhase { .. })
        );
    if invalid {
        2
    } else {
        1
    }
}
