use super::Ctx;
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use sdlc_gates_core::config::WarnLevel;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Validate the gate configuration for common mistakes
    Validate,

    /// Print the effective configuration, or one gate resolved at the current level
    Show {
        /// Show only this gate, with level overrides applied
        #[arg(long)]
        gate: Option<String>,
    },
}

pub fn run(ctx: &Ctx, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Validate => validate(ctx),
        ConfigSubcommand::Show { gate } => show(ctx, gate.as_deref()),
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(ctx: &Ctx) -> anyhow::Result<()> {
    // Loading already fails on error-level findings; what remains are warnings.
    let config = ctx.load_config()?;
    let warnings = config.validate();

    if ctx.json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Gate configuration is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("gate configuration has errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(ctx: &Ctx, gate: Option<&str>) -> anyhow::Result<()> {
    let config = ctx.load_config()?;

    let Some(gate) = gate else {
        if ctx.json {
            return print_json(&config);
        }
        print!("{}", config.to_yaml().context("failed to render configuration")?);
        return Ok(());
    };

    let level = ctx.level()?;
    let def = config
        .resolve(gate, &level)
        .with_context(|| format!("failed to resolve gate '{gate}'"))?;
    if ctx.json {
        return print_json(&def);
    }
    println!("Gate: {} (level: {})", def.name, def.level);
    println!("Mandatory: {}", def.mandatory);
    println!("Consensus: {}", def.consensus_type);
    for (label, items) in [
        ("Required agents", &def.required_agents),
        ("Required docs", &def.required_docs),
        ("Validation checks", &def.validation_checks),
    ] {
        if items.is_empty() {
            println!("{label}: (none)");
        } else {
            println!("{label}:");
            for item in items {
                println!("  - {item}");
            }
        }
    }
    Ok(())
}
