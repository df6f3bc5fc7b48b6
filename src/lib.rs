//! encounter-flow: guarded state machines for clinical encounter documentation.
//!
//! Four workflows share one generic engine:
//! - [`machines::EncounterMachine`]: scheduling through a finalized, signed note
//! - [`machines::CaptureSessionMachine`]: audio capture with diagnostics
//! - [`machines::NoteMachine`]: drafting, attested signing, append-only amendments
//! - [`machines::ExportJobMachine`]: export with a bounded retry budget
//!
//! The engine is a pure decision function. Callers rehydrate a machine from
//! their persisted `status`, apply events, and persist the result themselves.

pub mod config;
pub mod engine;
pub mod error;
pub mod gating;
pub mod graph;
pub mod guards;
pub mod machines;
pub mod replay;

pub use engine::{Machine, WorkflowDefinition};
pub use error::{FailureClass, WorkflowError};
pub use gating::{GateDecision, NoteCreationFacts, can_create_note};
pub use machines::{
    RetryPolicy, create_capture_session_machine, create_encounter_machine,
    create_export_job_machine, create_note_machine,
};
