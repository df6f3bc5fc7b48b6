use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::{Machine, Rejection, Rule, Source, Target, WorkflowDefinition, parse_state};
use crate::error::Result;
use crate::guards;

/// Default cap on `RETRY` events per export job.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Export job lifecycle (EHR/PDF export of a finalized note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportJobState {
    Pending,
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
    /// Accepted from persisted rows; `RETRY` itself re-queues directly.
    Retrying,
}

impl ExportJobState {
    pub const fn as_str(self) -> &'static str {
        match self {
            ExportJobState::Pending => "PENDING",
            ExportJobState::Queued => "QUEUED",
            ExportJobState::Processing => "PROCESSING",
            ExportJobState::Completed => "COMPLETED",
            ExportJobState::Failed => "FAILED",
            ExportJobState::Cancelled => "CANCELLED",
            ExportJobState::Retrying => "RETRYING",
        }
    }
}

impl fmt::Display for ExportJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportJobEvent {
    Queue,
    Start,
    Complete,
    Fail {
        #[serde(default)]
        message: Option<String>,
    },
    Retry,
    Cancel,
}

impl ExportJobEvent {
    pub fn fail(message: impl Into<String>) -> Self {
        ExportJobEvent::Fail {
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportJobEventKind {
    Queue,
    Start,
    Complete,
    Fail,
    Retry,
    Cancel,
}

impl fmt::Display for ExportJobEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportJobEventKind::Queue => write!(f, "QUEUE"),
            ExportJobEventKind::Start => write!(f, "START"),
            ExportJobEventKind::Complete => write!(f, "COMPLETE"),
            ExportJobEventKind::Fail => write!(f, "FAIL"),
            ExportJobEventKind::Retry => write!(f, "RETRY"),
            ExportJobEventKind::Cancel => write!(f, "CANCEL"),
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of `RETRY` events a job may take.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportJobData {
    pub retry_count: u32,
    pub policy: RetryPolicy,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportJobWorkflow;

pub type ExportJobMachine = Machine<ExportJobWorkflow>;

fn guard_retry_budget(
    _: ExportJobState,
    data: &ExportJobData,
    _: &ExportJobEvent,
) -> std::result::Result<(), Rejection> {
    guards::retry_budget(data.retry_count, data.policy.max_retries)
}

fn on_retry(data: &mut ExportJobData, _: &ExportJobEvent) {
    data.retry_count += 1;
}

fn on_fail(data: &mut ExportJobData, event: &ExportJobEvent) {
    if let ExportJobEvent::Fail { message } = event {
        data.last_error = message.clone();
    }
}

fn on_complete(data: &mut ExportJobData, _: &ExportJobEvent) {
    data.last_error = None;
}

static RULES: [Rule<ExportJobWorkflow>; 6] = {
    use ExportJobEventKind as E;
    use ExportJobState as S;
    [
        Rule::new(
            Source::AnyOf(&[S::Pending, S::Retrying]),
            E::Queue,
            Target::State(S::Queued),
            None,
            None,
        ),
        Rule::new(Source::State(S::Queued), E::Start, Target::State(S::Processing), None, None),
        Rule::new(
            Source::State(S::Processing),
            E::Complete,
            Target::State(S::Completed),
            None,
            Some(on_complete),
        ),
        Rule::new(
            Source::AnyOf(&[S::Pending, S::Queued, S::Processing, S::Retrying]),
            E::Fail,
            Target::State(S::Failed),
            None,
            Some(on_fail),
        ),
        Rule::new(
            Source::State(S::Failed),
            E::Retry,
            Target::State(S::Queued),
            Some(guard_retry_budget),
            Some(on_retry),
        ),
        Rule::new(Source::AnyActive, E::Cancel, Target::State(S::Cancelled), None, None),
    ]
};

impl WorkflowDefinition for ExportJobWorkflow {
    type State = ExportJobState;
    type EventKind = ExportJobEventKind;
    type Event = ExportJobEvent;
    type Data = ExportJobData;

    const NAME: &'static str = "ExportJob";

    const STATES: &'static [ExportJobState] = &[
        ExportJobState::Pending,
        ExportJobState::Queued,
        ExportJobState::Processing,
        ExportJobState::Completed,
        ExportJobState::Failed,
        ExportJobState::Cancelled,
        ExportJobState::Retrying,
    ];

    const EVENT_KINDS: &'static [ExportJobEventKind] = &[
        ExportJobEventKind::Queue,
        ExportJobEventKind::Start,
        ExportJobEventKind::Complete,
        ExportJobEventKind::Fail,
        ExportJobEventKind::Retry,
        ExportJobEventKind::Cancel,
    ];

    fn kind_of(event: &ExportJobEvent) -> ExportJobEventKind {
        match event {
            ExportJobEvent::Queue => ExportJobEventKind::Queue,
            ExportJobEvent::Start => ExportJobEventKind::Start,
            ExportJobEvent::Complete => ExportJobEventKind::Complete,
            ExportJobEvent::Fail { .. } => ExportJobEventKind::Fail,
            ExportJobEvent::Retry => ExportJobEventKind::Retry,
            ExportJobEvent::Cancel => ExportJobEventKind::Cancel,
        }
    }

    fn is_terminal(state: ExportJobState) -> bool {
        matches!(state, ExportJobState::Completed | ExportJobState::Cancelled)
    }

    fn rules() -> &'static [Rule<Self>] {
        &RULES
    }
}

/// Rehydrate a fresh job (retry count 0) from its persisted `status`.
pub fn create_export_job_machine(status: &str, policy: RetryPolicy) -> Result<ExportJobMachine> {
    ExportJobMachine::rehydrate(status, 0, policy)
}

impl Machine<ExportJobWorkflow> {
    /// Rebuild a job from its `status` and `retry_count` columns.
    pub fn rehydrate(status: &str, retry_count: u32, policy: RetryPolicy) -> Result<Self> {
        let state = parse_state::<ExportJobWorkflow>(status)?;
        Ok(Self::with_data(
            state,
            ExportJobData {
                retry_count,
                policy,
                last_error: None,
            },
        ))
    }

    pub fn can_retry(&self) -> bool {
        self.data().retry_count < self.data().policy.max_retries
    }

    pub fn retry_count(&self) -> u32 {
        self.data().retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.data().policy.max_retries
    }

    pub fn last_error(&self) -> Option<&str> {
        self.data().last_error.as_deref()
    }
}
