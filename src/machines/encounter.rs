use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::{Machine, Rejection, Rule, Source, Target, WorkflowDefinition, parse_state};
use crate::error::Result;
use crate::guards;

/// Lifecycle of a clinical encounter, from scheduling to a finalized signed note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncounterState {
    Draft,
    Scheduled,
    CheckedIn,
    InProgress,
    Recording,
    Transcribing,
    NoteDraft,
    NoteReview,
    NoteSigned,
    Finalized,
    Cancelled,
}

impl EncounterState {
    pub const fn as_str(self) -> &'static str {
        match self {
            EncounterState::Draft => "DRAFT",
            EncounterState::Scheduled => "SCHEDULED",
            EncounterState::CheckedIn => "CHECKED_IN",
            EncounterState::InProgress => "IN_PROGRESS",
            EncounterState::Recording => "RECORDING",
            EncounterState::Transcribing => "TRANSCRIBING",
            EncounterState::NoteDraft => "NOTE_DRAFT",
            EncounterState::NoteReview => "NOTE_REVIEW",
            EncounterState::NoteSigned => "NOTE_SIGNED",
            EncounterState::Finalized => "FINALIZED",
            EncounterState::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for EncounterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attempted actions on an encounter, each carrying only what its guard reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncounterEvent {
    Schedule,
    CheckIn,
    Start,
    StartRecording { stream_active: bool },
    StopRecording,
    TranscribeComplete { has_audio: bool },
    CreateNote,
    SubmitForReview,
    RequestChanges,
    Sign { attestation: bool },
    Finalize,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncounterEventKind {
    Schedule,
    CheckIn,
    Start,
    StartRecording,
    StopRecording,
    TranscribeComplete,
    CreateNote,
    SubmitForReview,
    RequestChanges,
    Sign,
    Finalize,
    Cancel,
}

impl fmt::Display for EncounterEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncounterEventKind::Schedule => "SCHEDULE",
            EncounterEventKind::CheckIn => "CHECK_IN",
            EncounterEventKind::Start => "START",
            EncounterEventKind::StartRecording => "START_RECORDING",
            EncounterEventKind::StopRecording => "STOP_RECORDING",
            EncounterEventKind::TranscribeComplete => "TRANSCRIBE_COMPLETE",
            EncounterEventKind::CreateNote => "CREATE_NOTE",
            EncounterEventKind::SubmitForReview => "SUBMIT_FOR_REVIEW",
            EncounterEventKind::RequestChanges => "REQUEST_CHANGES",
            EncounterEventKind::Sign => "SIGN",
            EncounterEventKind::Finalize => "FINALIZE",
            EncounterEventKind::Cancel => "CANCEL",
        };
        f.write_str(name)
    }
}

/// Facts the encounter remembers between caller operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterData {
    /// Set by the first `TRANSCRIBE_COMPLETE` that reports audio and kept for
    /// the rest of the encounter; `CREATE_NOTE` is guarded on it. The status
    /// column alone does not carry it, so callers persist it alongside.
    pub has_audio: bool,
    /// Number of recordings started in this encounter.
    pub recordings: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncounterWorkflow;

pub type EncounterMachine = Machine<EncounterWorkflow>;

fn guard_stream_active(
    _: EncounterState,
    _: &EncounterData,
    event: &EncounterEvent,
) -> std::result::Result<(), Rejection> {
    match event {
        EncounterEvent::StartRecording { stream_active } => guards::stream_active(*stream_active),
        _ => Ok(()),
    }
}

// Reads the remembered value, not the event: CREATE_NOTE carries no audio claim.
fn guard_has_audio(
    _: EncounterState,
    data: &EncounterData,
    _: &EncounterEvent,
) -> std::result::Result<(), Rejection> {
    guards::has_audio(data.has_audio)
}

fn guard_attestation(
    _: EncounterState,
    _: &EncounterData,
    event: &EncounterEvent,
) -> std::result::Result<(), Rejection> {
    match event {
        EncounterEvent::Sign { attestation } => guards::attested(*attestation),
        _ => Ok(()),
    }
}

fn guard_note_signed(
    state: EncounterState,
    _: &EncounterData,
    _: &EncounterEvent,
) -> std::result::Result<(), Rejection> {
    guards::signed(state == EncounterState::NoteSigned)
}

fn count_recording(data: &mut EncounterData, _: &EncounterEvent) {
    data.recordings = data.recordings.saturating_add(1);
}

fn capture_has_audio(data: &mut EncounterData, event: &EncounterEvent) {
    if let EncounterEvent::TranscribeComplete { has_audio } = event {
        data.has_audio |= *has_audio;
    }
}

static RULES: [Rule<EncounterWorkflow>; 12] = {
    use EncounterEventKind as E;
    use EncounterState as S;
    [
        Rule::new(Source::State(S::Draft), E::Schedule, Target::State(S::Scheduled), None, None),
        Rule::new(Source::State(S::Scheduled), E::CheckIn, Target::State(S::CheckedIn), None, None),
        Rule::new(
            Source::AnyOf(&[S::Draft, S::Scheduled, S::CheckedIn]),
            E::Start,
            Target::State(S::InProgress),
            None,
            None,
        ),
        Rule::new(
            Source::State(S::InProgress),
            E::StartRecording,
            Target::State(S::Recording),
            Some(guard_stream_active),
            Some(count_recording),
        ),
        Rule::new(
            Source::State(S::Recording),
            E::StopRecording,
            Target::State(S::Transcribing),
            None,
            None,
        ),
        Rule::new(
            Source::State(S::Transcribing),
            E::TranscribeComplete,
            Target::State(S::InProgress),
            None,
            Some(capture_has_audio),
        ),
        Rule::new(
            Source::State(S::InProgress),
            E::CreateNote,
            Target::State(S::NoteDraft),
            Some(guard_has_audio),
            None,
        ),
        Rule::new(
            Source::State(S::NoteDraft),
            E::SubmitForReview,
            Target::State(S::NoteReview),
            None,
            None,
        ),
        Rule::new(
            Source::State(S::NoteReview),
            E::RequestChanges,
            Target::State(S::NoteDraft),
            None,
            None,
        ),
        Rule::new(
            Source::State(S::NoteReview),
            E::Sign,
            Target::State(S::NoteSigned),
            Some(guard_attestation),
            None,
        ),
        Rule::new(
            Source::AnyActive,
            E::Finalize,
            Target::State(S::Finalized),
            Some(guard_note_signed),
            None,
        ),
        Rule::new(Source::AnyActive, E::Cancel, Target::State(S::Cancelled), None, None),
    ]
};

impl WorkflowDefinition for EncounterWorkflow {
    type State = EncounterState;
    type EventKind = EncounterEventKind;
    type Event = EncounterEvent;
    type Data = EncounterData;

    const NAME: &'static str = "Encounter";

    const STATES: &'static [EncounterState] = &[
        EncounterState::Draft,
        EncounterState::Scheduled,
        EncounterState::CheckedIn,
        EncounterState::InProgress,
        EncounterState::Recording,
        EncounterState::Transcribing,
        EncounterState::NoteDraft,
        EncounterState::NoteReview,
        EncounterState::NoteSigned,
        EncounterState::Finalized,
        EncounterState::Cancelled,
    ];

    const EVENT_KINDS: &'static [EncounterEventKind] = &[
        EncounterEventKind::Schedule,
        EncounterEventKind::CheckIn,
        EncounterEventKind::Start,
        EncounterEventKind::StartRecording,
        EncounterEventKind::StopRecording,
        EncounterEventKind::TranscribeComplete,
        EncounterEventKind::CreateNote,
        EncounterEventKind::SubmitForReview,
        EncounterEventKind::RequestChanges,
        EncounterEventKind::Sign,
        EncounterEventKind::Finalize,
        EncounterEventKind::Cancel,
    ];

    fn kind_of(event: &EncounterEvent) -> EncounterEventKind {
        match event {
            EncounterEvent::Schedule => EncounterEventKind::Schedule,
            EncounterEvent::CheckIn => EncounterEventKind::CheckIn,
            EncounterEvent::Start => EncounterEventKind::Start,
            EncounterEvent::StartRecording { .. } => EncounterEventKind::StartRecording,
            EncounterEvent::StopRecording => EncounterEventKind::StopRecording,
            EncounterEvent::TranscribeComplete { .. } => EncounterEventKind::TranscribeComplete,
            EncounterEvent::CreateNote => EncounterEventKind::CreateNote,
            EncounterEvent::SubmitForReview => EncounterEventKind::SubmitForReview,
            EncounterEvent::RequestChanges => EncounterEventKind::RequestChanges,
            EncounterEvent::Sign { .. } => EncounterEventKind::Sign,
            EncounterEvent::Finalize => EncounterEventKind::Finalize,
            EncounterEvent::Cancel => EncounterEventKind::Cancel,
        }
    }

    fn is_terminal(state: EncounterState) -> bool {
        matches!(state, EncounterState::Finalized | EncounterState::Cancelled)
    }

    fn rules() -> &'static [Rule<Self>] {
        &RULES
    }
}

/// Rehydrate an encounter from its persisted `status` value with no audio
/// recorded. Use [`EncounterMachine::rehydrate`] once a transcription completed.
pub fn create_encounter_machine(status: &str) -> Result<EncounterMachine> {
    EncounterMachine::from_persisted(status)
}

impl Machine<EncounterWorkflow> {
    /// Rebuild an encounter from its `status` and persisted `has_audio` columns.
    pub fn rehydrate(status: &str, has_audio: bool) -> Result<Self> {
        let state = parse_state::<EncounterWorkflow>(status)?;
        Ok(Self::with_data(
            state,
            EncounterData {
                has_audio,
                ..EncounterData::default()
            },
        ))
    }

    /// Whether any completed transcription in this encounter reported audio.
    pub fn has_audio(&self) -> bool {
        self.data().has_audio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkflowError;

    fn in_progress() -> EncounterMachine {
        EncounterMachine::from_state(EncounterState::InProgress)
    }

    fn transcribed(has_audio: bool) -> EncounterMachine {
        let mut m = in_progress();
        m.transition(EncounterEvent::StartRecording { stream_active: true })
            .unwrap();
        m.transition(EncounterEvent::StopRecording).unwrap();
        m.transition(EncounterEvent::TranscribeComplete { has_audio })
            .unwrap();
        m
    }

    #[test]
    fn scheduling_path_reaches_in_progress() {
        let mut m = create_encounter_machine("DRAFT").unwrap();
        assert_eq!(m.transition(EncounterEvent::Schedule).unwrap(), EncounterState::Scheduled);
        assert_eq!(m.transition(EncounterEvent::CheckIn).unwrap(), EncounterState::CheckedIn);
        assert_eq!(m.transition(EncounterEvent::Start).unwrap(), EncounterState::InProgress);
    }

    #[test]
    fn start_recording_requires_active_stream() {
        let mut m = in_progress();
        let err = m
            .transition(EncounterEvent::StartRecording {
                stream_active: false,
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot start recording: Audio stream not active.");
        assert_eq!(m.state(), EncounterState::InProgress);
        assert_eq!(m.data().recordings, 0);

        let state = m
            .transition(EncounterEvent::StartRecording {
                stream_active: true,
            })
            .unwrap();
        assert_eq!(state, EncounterState::Recording);
        assert_eq!(m.data().recordings, 1);
    }

    #[test]
    fn create_note_without_audio_is_rejected() {
        let mut m = transcribed(false);
        assert_eq!(m.state(), EncounterState::InProgress);
        assert!(!m.has_audio());

        let err = m.transition(EncounterEvent::CreateNote).unwrap_err();
        assert!(err.is_guard_rejected());
        assert!(err.to_string().contains("Cannot create note: No audio recorded"));
        assert_eq!(m.state(), EncounterState::InProgress);
    }

    #[test]
    fn create_note_uses_audio_captured_at_transcription() {
        let mut m = transcribed(true);
        assert!(m.has_audio());
        assert_eq!(m.transition(EncounterEvent::CreateNote).unwrap(), EncounterState::NoteDraft);
    }

    #[test]
    fn create_note_before_any_transcription_is_rejected() {
        let mut m = in_progress();
        let err = m.transition(EncounterEvent::CreateNote).unwrap_err();
        assert_eq!(err.reason(), Some(guards::NO_AUDIO_RECORDED));
    }

    #[test]
    fn create_note_after_rebuild_from_saved_columns() {
        let m = transcribed(true);
        let status = m.state().to_string();
        let has_audio = m.has_audio();
        assert_eq!(status, "IN_PROGRESS");

        let mut rebuilt = EncounterMachine::rehydrate(&status, has_audio).unwrap();
        assert_eq!(
            rebuilt.transition(EncounterEvent::CreateNote).unwrap(),
            EncounterState::NoteDraft
        );

        let mut bare = create_encounter_machine(&status).unwrap();
        assert_eq!(
            bare.transition(EncounterEvent::CreateNote).unwrap_err().reason(),
            Some(guards::NO_AUDIO_RECORDED)
        );
    }

    #[test]
    fn rehydrate_rejects_unknown_status() {
        let err = EncounterMachine::rehydrate("SIGNED_OFF", true).unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownState { .. }));
    }

    #[test]
    fn silent_retake_keeps_earlier_audio() {
        let mut m = transcribed(true);
        m.transition(EncounterEvent::StartRecording { stream_active: true })
            .unwrap();
        m.transition(EncounterEvent::StopRecording).unwrap();
        m.transition(EncounterEvent::TranscribeComplete { has_audio: false })
            .unwrap();
        assert!(m.has_audio());
        assert_eq!(m.data().recordings, 2);
        assert_eq!(m.transition(EncounterEvent::CreateNote).unwrap(), EncounterState::NoteDraft);
    }

    #[test]
    fn recording_counter_saturates() {
        let mut m = EncounterMachine::with_data(
            EncounterState::InProgress,
            EncounterData {
                recordings: u32::MAX,
                ..EncounterData::default()
            },
        );
        m.transition(EncounterEvent::StartRecording { stream_active: true })
            .unwrap();
        assert_eq!(m.state(), EncounterState::Recording);
        assert_eq!(m.data().recordings, u32::MAX);
    }

    #[test]
    fn finalize_requires_signed_note() {
        let mut m = EncounterMachine::from_state(EncounterState::NoteDraft);
        let err = m.transition(EncounterEvent::Finalize).unwrap_err();
        assert!(err.to_string().contains("Note must be signed first"));
        assert_eq!(m.state(), EncounterState::NoteDraft);

        let mut m = EncounterMachine::from_state(EncounterState::NoteSigned);
        assert_eq!(m.transition(EncounterEvent::Finalize).unwrap(), EncounterState::Finalized);
        assert!(m.is_terminal());
    }

    #[test]
    fn full_documentation_flow() {
        let mut m = transcribed(true);
        m.transition(EncounterEvent::CreateNote).unwrap();
        m.transition(EncounterEvent::SubmitForReview).unwrap();

        let err = m
            .transition(EncounterEvent::Sign { attestation: false })
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot sign note: Attestation required.");

        m.transition(EncounterEvent::Sign { attestation: true })
            .unwrap();
        assert_eq!(m.state(), EncounterState::NoteSigned);
        m.transition(EncounterEvent::Finalize).unwrap();
        assert_eq!(m.state(), EncounterState::Finalized);
    }

    #[test]
    fn review_can_send_note_back_to_draft() {
        let mut m = EncounterMachine::from_state(EncounterState::NoteReview);
        assert_eq!(
            m.transition(EncounterEvent::RequestChanges).unwrap(),
            EncounterState::NoteDraft
        );
    }

    #[test]
    fn cancel_from_any_active_state() {
        for state in EncounterWorkflow::STATES {
            let mut m = EncounterMachine::from_state(*state);
            let result = m.transition(EncounterEvent::Cancel);
            if EncounterWorkflow::is_terminal(*state) {
                assert!(matches!(result, Err(WorkflowError::InvalidTransition { .. })));
            } else {
                assert_eq!(result.unwrap(), EncounterState::Cancelled);
            }
        }
    }

    #[test]
    fn out_of_order_event_is_invalid() {
        let mut m = create_encounter_machine("SCHEDULED").unwrap();
        let err = m.transition(EncounterEvent::CreateNote).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidTransition {
                machine: "Encounter",
                state: "SCHEDULED".into(),
                event: "CREATE_NOTE".into(),
            }
        );
    }

    #[test]
    fn unknown_status_fails_fast() {
        let err = create_encounter_machine("ON_HOLD").unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownState { .. }));
    }

    #[test]
    fn events_deserialize_from_tagged_json() {
        let event: EncounterEvent =
            serde_json::from_str(r#"{"event":"START_RECORDING","stream_active":true}"#).unwrap();
        assert_eq!(event, EncounterEvent::StartRecording { stream_active: true });

        let event: EncounterEvent = serde_json::from_str(r#"{"event":"CREATE_NOTE"}"#).unwrap();
        assert_eq!(event, EncounterEvent::CreateNote);
    }

    #[test]
    fn state_display_matches_persisted_form() {
        for state in EncounterWorkflow::STATES {
            let json = serde_json::to_string(state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
    }
}
