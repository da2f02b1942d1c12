use super::Ctx;
use crate::output::{join_or, print_json};
use anyhow::Context;
use sdlc_gates_core::types::GateStatus;

pub fn run(ctx: &Ctx, gate: &str, agent: &str) -> anyhow::Result<()> {
    let engine = ctx.engine()?;
    let level = ctx.level()?;
    let outcome = engine
        .approve(gate, agent, &level)
        .with_context(|| format!("failed to record approval of '{gate}' by '{agent}'"))?;

    if ctx.json {
        return print_json(&outcome);
    }

    if outcome.newly_recorded {
        println!("{agent} approved gate '{gate}'");
    } else {
        println!("{agent} had already approved gate '{gate}'");
    }
    if !outcome.required_agent {
        println!("note: '{agent}' is not a required agent for '{gate}' at level '{level}'");
    }
    match outcome.status {
        GateStatus::Approved => println!("Gate '{gate}' is now APPROVED"),
        GateStatus::Pending => println!(
            "Gate '{gate}' is PENDING (awaiting: {})",
            join_or(&outcome.missing, "-")
        ),
    }
    Ok(())
}
