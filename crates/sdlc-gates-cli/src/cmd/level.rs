use super::Ctx;
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use sdlc_gates_core::level;

#[derive(Subcommand)]
pub enum LevelSubcommand {
    /// Show the current level and the levels available
    Show,

    /// Set the project's level
    Set {
        /// Level name (prototype, production, enterprise, or one from level_overrides)
        level: String,
    },
}

pub fn run(ctx: &Ctx, subcmd: LevelSubcommand) -> anyhow::Result<()> {
    match subcmd {
        LevelSubcommand::Show => show(ctx),
        LevelSubcommand::Set { level } => set(ctx, &level),
    }
}

fn show(ctx: &Ctx) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let current = ctx.level()?;
    let available = config.known_levels();

    if ctx.json {
        let value = serde_json::json!({
            "level": current,
            "available": available,
        });
        return print_json(&value);
    }

    println!("Level: {current}");
    println!("Available: {}", available.join(", "));
    Ok(())
}

fn set(ctx: &Ctx, name: &str) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let file = level::set_level(&ctx.root, &config, name)
        .with_context(|| format!("failed to set level '{name}'"))?;

    if ctx.json {
        return print_json(&file);
    }
    println!("Level set to '{}'.", file.level);
    Ok(())
}
