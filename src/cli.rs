//! Command-line interface for replaying and inspecting workflows.
//!
//! Defines [`Cli`] with subcommands [`Command`] (replay, table, check-note)
//! and global flags (--max-retries, --verbose).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use encounter_flow::gating::NoteCreationFacts;

/// Guarded clinical encounter workflows: replay event scripts, print tables.
#[derive(Debug, Parser)]
#[command(name = "encounter-flow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Override the configured export retry cap.
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Path to the configuration file.
    #[arg(long, global = true, default_value = encounter_flow::config::CONFIG_FILE)]
    pub config: PathBuf,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MachineArg {
    Encounter,
    CaptureSession,
    Note,
    ExportJob,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay a JSON or TOML event script and print the audit record.
    Replay {
        /// Script file (`.toml` is read as TOML, anything else as JSON).
        script: PathBuf,

        /// Exit with an error if any step was rejected.
        #[arg(long)]
        strict: bool,
    },

    /// Print a machine's transition table.
    Table {
        #[arg(value_enum)]
        machine: MachineArg,

        /// Emit JSON instead of a text table.
        #[arg(long)]
        json: bool,
    },

    /// Pre-check whether a note may be created.
    CheckNote(CheckNoteArgs),
}

#[derive(Debug, Args)]
pub struct CheckNoteArgs {
    #[arg(long)]
    pub has_audio: bool,

    #[arg(long)]
    pub audio_validated: bool,

    #[arg(long)]
    pub capture_session_id: Option<String>,

    #[arg(long)]
    pub transcript_id: Option<String>,
}

impl From<CheckNoteArgs> for NoteCreationFacts {
    fn from(args: CheckNoteArgs) -> Self {
        NoteCreationFacts {
            has_audio: args.has_audio,
            audio_validated: args.audio_validated,
            capture_session_id: args.capture_session_id,
            transcript_id: args.transcript_id,
        }
    }
}
