use super::Ctx;
use crate::output::{join_or, print_json, print_table};
use anyhow::Context;
use sdlc_gates_core::engine::{GateSummary, PhaseProgress};
use sdlc_gates_core::types::GateStatus;

pub fn run(ctx: &Ctx) -> anyhow::Result<()> {
    let engine = ctx.engine()?;
    let level = ctx.level()?;
    let gates = engine
        .status(&level)
        .context("failed to read gate status")?;
    // Phase tracking needs a gate per phase; configs without one still get gate status.
    let phases = match engine.phase_states(&level) {
        Ok(p) => Some(p),
        Err(e) => {
            tracing::debug!(error = %e, "phase progress unavailable");
            None
        }
    };

    if ctx.json {
        #[derive(serde::Serialize)]
        struct StatusOutput<'a> {
            level: &'a str,
            gates: &'a [GateSummary],
            #[serde(skip_serializing_if = "Option::is_none")]
            phases: Option<&'a [PhaseProgress]>,
        }
        return print_json(&StatusOutput {
            level: &level,
            gates: &gates,
            phases: phases.as_deref(),
        });
    }

    println!("Level: {level}");
    if let Some(phases) = &phases {
        let line: Vec<String> = phases
            .iter()
            .map(|p| format!("{} [{}]", p.phase, p.state))
            .collect();
        println!("Phases: {}", line.join(" -> "));
    }
    println!();

    let rows = gates
        .iter()
        .map(|g| {
            let approved_by: Vec<String> = g.approvals.iter().map(|a| a.agent.clone()).collect();
            vec![
                g.gate.clone(),
                match g.status {
                    GateStatus::Approved => "APPROVED".to_string(),
                    GateStatus::Pending => "PENDING".to_string(),
                },
                g.consensus_type.to_string(),
                join_or(&approved_by, "no approvals yet"),
                join_or(&g.missing, "-"),
            ]
        })
        .collect();
    print_table(
        &["GATE", "STATUS", "CONSENSUS", "APPROVED BY", "AWAITING"],
        rows,
    );
    Ok(())
}
