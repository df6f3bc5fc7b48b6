mod cli;
mod ui;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, MachineArg};
use encounter_flow::config::EngineConfig;
use encounter_flow::gating::can_create_note;
use encounter_flow::graph::transition_graph;
use encounter_flow::machines::{CaptureWorkflow, EncounterWorkflow, ExportJobWorkflow, NoteWorkflow};
use encounter_flow::replay::Script;
use ui::Printer;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load_from(&cli.config)?;

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut policy = config.retry_policy();
    if let Some(max_retries) = cli.max_retries {
        policy.max_retries = max_retries;
    }
    debug!(?policy, config = %cli.config.display(), "configuration loaded");

    let printer = Printer::default();

    match cli.command {
        Command::Replay { script, strict } => {
            let replay = Script::load(&script)?.run(policy)?;
            printer.replay(&replay)?;
            if strict && replay.rejected() > 0 {
                bail!("{} step(s) rejected", replay.rejected());
            }
        }
        Command::Table { machine, json } => match (machine, json) {
            (MachineArg::Encounter, false) => printer.table(&transition_graph::<EncounterWorkflow>()),
            (MachineArg::Encounter, true) => printer.json(&transition_graph::<EncounterWorkflow>())?,
            (MachineArg::CaptureSession, false) => printer.table(&transition_graph::<CaptureWorkflow>()),
            (MachineArg::CaptureSession, true) => printer.json(&transition_graph::<CaptureWorkflow>())?,
            (MachineArg::Note, false) => printer.table(&transition_graph::<NoteWorkflow>()),
            (MachineArg::Note, true) => printer.json(&transition_graph::<NoteWorkflow>())?,
            (MachineArg::ExportJob, false) => printer.table(&transition_graph::<ExportJobWorkflow>()),
            (MachineArg::ExportJob, true) => printer.json(&transition_graph::<ExportJobWorkflow>())?,
        },
        Command::CheckNote(args) => {
            let decision = can_create_note(&args.into());
            printer.decision(&decision);
            if !decision.allowed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
