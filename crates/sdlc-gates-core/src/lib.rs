pub mod approval;
pub mod config;
pub mod conflict;
pub mod consensus;
pub mod engine;
pub mod gate;
pub mod error;
pub mod io;
pub mod level;
pub mod paths;
pub mod probe;
pub mod sequencer;
pub mod types;

pub use engine::GateEngine;
pub use error::{GateError, Result};
