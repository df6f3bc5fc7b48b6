use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{Machine, Rejection, Rule, Source, Target, WorkflowDefinition, parse_state};
use crate::error::Result;
use crate::guards;

/// Failure code recorded when the browser/device refused microphone access.
pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";

/// Audio capture session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureState {
    Idle,
    Initializing,
    StreamActive,
    Recording,
    Paused,
    Stopping,
    Processing,
    Complete,
    Failed,
    Aborted,
}

impl CaptureState {
    pub const fn as_str(self) -> &'static str {
        match self {
            CaptureState::Idle => "IDLE",
            CaptureState::Initializing => "INITIALIZING",
            CaptureState::StreamActive => "STREAM_ACTIVE",
            CaptureState::Recording => "RECORDING",
            CaptureState::Paused => "PAUSED",
            CaptureState::Stopping => "STOPPING",
            CaptureState::Processing => "PROCESSING",
            CaptureState::Complete => "COMPLETE",
            CaptureState::Failed => "FAILED",
            CaptureState::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureEvent {
    Initialize,
    StreamReady,
    StartRecording,
    AudioLevel {
        level: f32,
    },
    Pause,
    Resume,
    Stop,
    Process,
    Complete,
    Fail {
        code: String,
        message: String,
        #[serde(default = "Utc::now")]
        at: DateTime<Utc>,
    },
    Reset,
    Abort,
}

impl CaptureEvent {
    /// A `FAIL` event stamped with the current time.
    pub fn fail(code: impl Into<String>, message: impl Into<String>) -> Self {
        CaptureEvent::Fail {
            code: code.into(),
            message: message.into(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureEventKind {
    Initialize,
    StreamReady,
    StartRecording,
    AudioLevel,
    Pause,
    Resume,
    Stop,
    Process,
    Complete,
    Fail,
    Reset,
    Abort,
}

impl fmt::Display for CaptureEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureEventKind::Initialize => "INITIALIZE",
            CaptureEventKind::StreamReady => "STREAM_READY",
            CaptureEventKind::StartRecording => "START_RECORDING",
            CaptureEventKind::AudioLevel => "AUDIO_LEVEL",
            CaptureEventKind::Pause => "PAUSE",
            CaptureEventKind::Resume => "RESUME",
            CaptureEventKind::Stop => "STOP",
            CaptureEventKind::Process => "PROCESS",
            CaptureEventKind::Complete => "COMPLETE",
            CaptureEventKind::Fail => "FAIL",
            CaptureEventKind::Reset => "RESET",
            CaptureEventKind::Abort => "ABORT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionState {
    #[default]
    Unknown,
    Prompt,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub microphone: PermissionState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastError {
    pub code: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Capture diagnostics, written only by transition effects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub stream_active: bool,
    pub recording_active: bool,
    /// Normalized input level in `0.0..=1.0`.
    pub audio_level: f32,
    /// Message of the failure that put the session in `FAILED`, if any.
    pub error: Option<String>,
    pub permissions: Permissions,
    /// Most recent failure; survives `RESET`.
    pub last_error: Option<LastError>,
}

impl Diagnostics {
    fn clear_activity(&mut self) {
        self.stream_active = false;
        self.recording_active = false;
        self.audio_level = 0.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureWorkflow;

pub type CaptureSessionMachine = Machine<CaptureWorkflow>;

fn guard_stream_active(
    _: CaptureState,
    data: &Diagnostics,
    _: &CaptureEvent,
) -> std::result::Result<(), Rejection> {
    guards::capture_stream_active(data.stream_active)
}

fn on_stream_ready(data: &mut Diagnostics, _: &CaptureEvent) {
    data.stream_active = true;
    data.permissions.microphone = PermissionState::Granted;
}

fn on_recording(data: &mut Diagnostics, _: &CaptureEvent) {
    data.recording_active = true;
}

fn on_pause(data: &mut Diagnostics, _: &CaptureEvent) {
    data.recording_active = false;
}

fn on_level(data: &mut Diagnostics, event: &CaptureEvent) {
    if let CaptureEvent::AudioLevel { level } = event {
        let level = *level;
        // NaN from a broken meter reads as silence.
        data.audio_level = if level.is_nan() {
            0.0
        } else {
            level.clamp(0.0, 1.0)
        };
    }
}

fn on_stop(data: &mut Diagnostics, _: &CaptureEvent) {
    data.clear_activity();
}

fn on_fail(data: &mut Diagnostics, event: &CaptureEvent) {
    data.clear_activity();
    if let CaptureEvent::Fail { code, message, at } = event {
        if code == PERMISSION_DENIED {
            data.permissions.microphone = PermissionState::Denied;
        }
        data.error = Some(message.clone());
        data.last_error = Some(LastError {
            code: code.clone(),
            message: message.clone(),
            timestamp: *at,
        });
    }
}

fn on_reset(data: &mut Diagnostics, _: &CaptureEvent) {
    data.clear_activity();
    data.error = None;
}

static RULES: [Rule<CaptureWorkflow>; 12] = {
    use CaptureEventKind as E;
    use CaptureState as S;
    [
        Rule::new(Source::State(S::Idle), E::Initialize, Target::State(S::Initializing), None, None),
        Rule::new(
            Source::State(S::Initializing),
            E::StreamReady,
            Target::State(S::StreamActive),
            None,
            Some(on_stream_ready),
        ),
        // Listed from INITIALIZING so an early start is a guard rejection, not a defect.
        Rule::new(
            Source::AnyOf(&[S::Initializing, S::StreamActive]),
            E::StartRecording,
            Target::State(S::Recording),
            Some(guard_stream_active),
            Some(on_recording),
        ),
        Rule::new(
            Source::AnyOf(&[S::StreamActive, S::Recording, S::Paused]),
            E::AudioLevel,
            Target::Stay,
            None,
            Some(on_level),
        ),
        Rule::new(Source::State(S::Recording), E::Pause, Target::State(S::Paused), None, Some(on_pause)),
        Rule::new(
            Source::State(S::Paused),
            E::Resume,
            Target::State(S::Recording),
            None,
            Some(on_recording),
        ),
        Rule::new(
            Source::AnyOf(&[S::Recording, S::Paused]),
            E::Stop,
            Target::State(S::Stopping),
            None,
            Some(on_stop),
        ),
        Rule::new(Source::State(S::Stopping), E::Process, Target::State(S::Processing), None, None),
        Rule::new(Source::State(S::Processing), E::Complete, Target::State(S::Complete), None, None),
        Rule::new(
            Source::AnyOf(&[
                S::Initializing,
                S::StreamActive,
                S::Recording,
                S::Paused,
                S::Stopping,
                S::Processing,
            ]),
            E::Fail,
            Target::State(S::Failed),
            None,
            Some(on_fail),
        ),
        Rule::new(Source::State(S::Failed), E::Reset, Target::State(S::Idle), None, Some(on_reset)),
        Rule::new(Source::AnyActive, E::Abort, Target::State(S::Aborted), None, Some(on_stop)),
    ]
};

impl WorkflowDefinition for CaptureWorkflow {
    type State = CaptureState;
    type EventKind = CaptureEventKind;
    type Event = CaptureEvent;
    type Data = Diagnostics;

    const NAME: &'static str = "CaptureSession";

    const STATES: &'static [CaptureState] = &[
        CaptureState::Idle,
        CaptureState::Initializing,
        CaptureState::StreamActive,
        CaptureState::Recording,
        CaptureState::Paused,
        CaptureState::Stopping,
        CaptureState::Processing,
        CaptureState::Complete,
        CaptureState::Failed,
        CaptureState::Aborted,
    ];

    const EVENT_KINDS: &'static [CaptureEventKind] = &[
        CaptureEventKind::Initialize,
        CaptureEventKind::StreamReady,
        CaptureEventKind::StartRecording,
        CaptureEventKind::AudioLevel,
        CaptureEventKind::Pause,
        CaptureEventKind::Resume,
        CaptureEventKind::Stop,
        CaptureEventKind::Process,
        CaptureEventKind::Complete,
        CaptureEventKind::Fail,
        CaptureEventKind::Reset,
        CaptureEventKind::Abort,
    ];

    fn kind_of(event: &CaptureEvent) -> CaptureEventKind {
        match event {
            CaptureEvent::Initialize => CaptureEventKind::Initialize,
            CaptureEvent::StreamReady => CaptureEventKind::StreamReady,
            CaptureEvent::StartRecording => CaptureEventKind::StartRecording,
            CaptureEvent::AudioLevel { .. } => CaptureEventKind::AudioLevel,
            CaptureEvent::Pause => CaptureEventKind::Pause,
            CaptureEvent::Resume => CaptureEventKind::Resume,
            CaptureEvent::Stop => CaptureEventKind::Stop,
            CaptureEvent::Process => CaptureEventKind::Process,
            CaptureEvent::Complete => CaptureEventKind::Complete,
            CaptureEvent::Fail { .. } => CaptureEventKind::Fail,
            CaptureEvent::Reset => CaptureEventKind::Reset,
            CaptureEvent::Abort => CaptureEventKind::Abort,
        }
    }

    fn is_terminal(state: CaptureState) -> bool {
        matches!(state, CaptureState::Complete | CaptureState::Aborted)
    }

    fn rules() -> &'static [Rule<Self>] {
        &RULES
    }
}

/// Rehydrate a capture session from its persisted `status` with empty diagnostics.
pub fn create_capture_session_machine(status: &str) -> Result<CaptureSessionMachine> {
    CaptureSessionMachine::from_persisted(status)
}

impl Machine<CaptureWorkflow> {
    /// Rebuild a session from its `status` and the diagnostics saved with it.
    pub fn rehydrate(status: &str, diagnostics: Diagnostics) -> Result<Self> {
        let state = parse_state::<CaptureWorkflow>(status)?;
        Ok(Self::with_data(state, diagnostics))
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.data()
    }
}
