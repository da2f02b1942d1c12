use super::{Ctx, Refusal};
use crate::output::print_json;
use anyhow::Context;

pub fn run(ctx: &Ctx, current: &str, next: &str) -> anyhow::Result<()> {
    let engine = ctx.engine()?;
    let level = ctx.level()?;
    let decision = engine
        .can_proceed(current, next, &level)
        .with_context(|| format!("failed to evaluate '{current}' -> '{next}'"))?;

    if ctx.json {
        print_json(&decision)?;
    } else if decision.allowed {
        println!("Can proceed from '{current}' to '{next}'");
    } else {
        println!("Cannot proceed to '{next}':");
        for reason in &decision.reasons {
            println!("  - {reason}");
        }
    }

    if decision.allowed {
        Ok(())
    } else if decision.is_invalid_request() {
        Err(Refusal::UnknownPhase {
            from: current.to_string(),
            to: next.to_string(),
        }
        .into())
    } else {
        Err(Refusal::Blocked {
            from: current.to_string(),
            to: next.to_string(),
        }
        .into())
    }
}
