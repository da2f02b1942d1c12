use super::Ctx;
use crate::output::print_json;

pub fn run(ctx: &Ctx, scenario: &str) -> anyhow::Result<()> {
    let engine = ctx.engine()?;
    let sequence = engine.sequence(scenario).unwrap_or_default();

    if ctx.json {
        let value = serde_json::json!({
            "scenario": scenario,
            "sequence": sequence,
        });
        return print_json(&value);
    }

    if sequence.is_empty() {
        println!("No defined sequence for scenario: {scenario}");
        return Ok(());
    }
    println!("Agent sequence for '{scenario}':");
    for (i, agent) in sequence.iter().enumerate() {
        println!("  {}. {agent}", i + 1);
    }
    Ok(())
}
