use super::{Ctx, Refusal};
use crate::output::print_json;
use anyhow::Context;

pub fn run(ctx: &Ctx, gate: &str) -> anyhow::Result<()> {
    let engine = ctx.engine()?;
    let level = ctx.level()?;
    let check = engine
        .check_gate(gate, &level)
        .with_context(|| format!("failed to check gate '{gate}'"))?;

    if ctx.json {
        print_json(&check)?;
    } else if check.passed {
        println!("Gate '{gate}' requirements met (level: {level})");
    } else {
        println!("Gate '{gate}' has issues (level: {level}):");
        for issue in &check.issues {
            println!("  - {issue}");
        }
    }

    if !check.passed {
        return Err(Refusal::GateNotSatisfied(gate.to_string()).into());
    }
    Ok(())
}
