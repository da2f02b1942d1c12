use super::Ctx;
use crate::output::print_json;
use anyhow::Context;

pub fn run(ctx: &Ctx, gate: &str, agents: &[String]) -> anyhow::Result<()> {
    let engine = ctx.engine()?;
    let resolution = engine
        .resolve(gate, agents)
        .with_context(|| format!("failed to resolve conflict on '{gate}'"))?;

    if ctx.json {
        return print_json(&resolution);
    }
    println!("Conflict resolution: {}", resolution.directive);
    Ok(())
}
