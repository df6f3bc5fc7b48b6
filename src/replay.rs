//! Scripted replay of events against a machine, producing an audit record.
//!
//! A rejected step leaves the machine unchanged and the replay continues, so
//! one record shows every decision the engine made for the script.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::engine::{Machine, WorkflowDefinition};
use crate::error::{AppError, FailureClass};
use crate::machines::{
    CaptureEvent, CaptureSessionMachine, CaptureWorkflow, EncounterEvent, EncounterMachine,
    EncounterWorkflow, ExportJobEvent, ExportJobMachine, ExportJobWorkflow, NoteEvent,
    NoteMachine, NoteWorkflow, RetryPolicy,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome<S> {
    Accepted { to: S },
    Rejected { class: FailureClass, message: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(bound = "")]
pub struct ReplayStep<D: WorkflowDefinition> {
    pub index: usize,
    pub event: D::Event,
    pub from: D::State,
    #[serde(flatten)]
    pub outcome: StepOutcome<D::State>,
}

/// Structured record of one replay.
#[derive(Debug, Clone, Serialize)]
#[serde(bound = "")]
pub struct AuditRecord<D: WorkflowDefinition> {
    pub id: Uuid,
    pub machine: &'static str,
    pub initial_state: D::State,
    pub final_state: D::State,
    pub final_data: D::Data,
    pub steps: Vec<ReplayStep<D>>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl<D: WorkflowDefinition> AuditRecord<D> {
    pub fn accepted(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Accepted { .. }))
            .count()
    }

    pub fn rejected(&self) -> usize {
        self.steps.len() - self.accepted()
    }

    /// States visited, starting with the initial one.
    pub fn path(&self) -> Vec<D::State> {
        let mut path = vec![self.initial_state];
        path.extend(self.steps.iter().filter_map(|s| match s.outcome {
            StepOutcome::Accepted { to } => Some(to),
            StepOutcome::Rejected { .. } => None,
        }));
        path
    }
}

/// Drive `machine` through `events`, recording every outcome.
pub fn run<D: WorkflowDefinition>(
    mut machine: Machine<D>,
    events: impl IntoIterator<Item = D::Event>,
) -> AuditRecord<D> {
    let started_at = Utc::now();
    let initial_state = machine.state();
    let mut steps = Vec::new();

    for (index, event) in events.into_iter().enumerate() {
        let from = machine.state();
        let outcome = match machine.transition(event.clone()) {
            Ok(to) => StepOutcome::Accepted { to },
            Err(err) => StepOutcome::Rejected {
                class: err.class(),
                message: err.to_string(),
            },
        };
        steps.push(ReplayStep {
            index,
            event,
            from,
            outcome,
        });
    }

    let record = AuditRecord {
        id: Uuid::new_v4(),
        machine: D::NAME,
        initial_state,
        final_state: machine.state(),
        final_data: machine.data().clone(),
        steps,
        started_at,
        completed_at: Utc::now(),
    };

    info!(
        machine = D::NAME,
        id = %record.id,
        from = %record.initial_state,
        to = %record.final_state,
        accepted = record.accepted(),
        rejected = record.rejected(),
        "replay finished"
    );

    record
}

/// A replay script as read from JSON or TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "machine", rename_all = "snake_case")]
pub enum Script {
    Encounter {
        initial_state: String,
        events: Vec<EncounterEvent>,
    },
    CaptureSession {
        initial_state: String,
        events: Vec<CaptureEvent>,
    },
    Note {
        initial_state: String,
        events: Vec<NoteEvent>,
    },
    ExportJob {
        initial_state: String,
        #[serde(default)]
        retry_count: u32,
        /// Overrides the configured policy for this script only.
        #[serde(default)]
        max_retries: Option<u32>,
        events: Vec<ExportJobEvent>,
    },
}

impl Script {
    /// Parse a script; `.toml` files are read as TOML, everything else as JSON.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let contents = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        if is_toml {
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(serde_json::from_str(&contents)?)
        }
    }

    pub fn run(self, policy: RetryPolicy) -> Result<Replay, AppError> {
        let replay = match self {
            Script::Encounter {
                initial_state,
                events,
            } => Replay::Encounter(run(EncounterMachine::from_persisted(&initial_state)?, events)),
            Script::CaptureSession {
                initial_state,
                events,
            } => Replay::CaptureSession(run(
                CaptureSessionMachine::from_persisted(&initial_state)?,
                events,
            )),
            Script::Note {
                initial_state,
                events,
            } => Replay::Note(run(NoteMachine::from_persisted(&initial_state)?, events)),
            Script::ExportJob {
                initial_state,
                retry_count,
                max_retries,
                events,
            } => {
                let policy = max_retries
                    .map(|max_retries| RetryPolicy { max_retries })
                    .unwrap_or(policy);
                let machine = ExportJobMachine::rehydrate(&initial_state, retry_count, policy)?;
                Replay::ExportJob(run(machine, events))
            }
        };
        Ok(replay)
    }
}

/// Audit record for whichever machine a script targeted.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Replay {
    Encounter(AuditRecord<EncounterWorkflow>),
    CaptureSession(AuditRecord<CaptureWorkflow>),
    Note(AuditRecord<NoteWorkflow>),
    ExportJob(AuditRecord<ExportJobWorkflow>),
}

impl Replay {
    pub fn rejected(&self) -> usize {
        match self {
            Replay::Encounter(r) => r.rejected(),
            Replay::CaptureSession(r) => r.rejected(),
            Replay::Note(r) => r.rejected(),
            Replay::ExportJob(r) => r.rejected(),
        }
    }

    pub fn steps(&self) -> usize {
        match self {
            Replay::Encounter(r) => r.steps.len(),
            Replay::CaptureSession(r) => r.steps.len(),
            Replay::Note(r) => r.steps.len(),
            Replay::ExportJob(r) => r.steps.len(),
        }
    }

    pub fn final_state(&self) -> String {
        match self {
            Replay::Encounter(r) => r.final_state.to_string(),
            Replay::CaptureSession(r) => r.final_state.to_string(),
            Replay::Note(r) => r.final_state.to_string(),
            Replay::ExportJob(r) => r.final_state.to_string(),
        }
    }

    /// `(index, message)` of each rejected step.
    pub fn rejections(&self) -> Vec<(usize, String)> {
        fn collect<D: WorkflowDefinition>(r: &AuditRecord<D>) -> Vec<(usize, String)> {
            r.steps
                .iter()
                .filter_map(|s| match &s.outcome {
                    StepOutcome::Rejected { message, .. } => Some((s.index, message.clone())),
                    StepOutcome::Accepted { .. } => None,
                })
                .collect()
        }
        match self {
            Replay::Encounter(r) => collect(r),
            Replay::CaptureSession(r) => collect(r),
            Replay::Note(r) => collect(r),
            Replay::ExportJob(r) => collect(r),
        }
    }
}
