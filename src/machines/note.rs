use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::{Machine, Rejection, Rule, Source, Target, WorkflowDefinition};
use crate::error::Result;
use crate::guards;

/// Clinical note lifecycle. Content is editable only before `SIGNED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteState {
    Draft,
    AutoSaved,
    Submitted,
    UnderReview,
    Signed,
    Amended,
    Finalized,
    Locked,
}

impl NoteState {
    pub const fn as_str(self) -> &'static str {
        match self {
            NoteState::Draft => "DRAFT",
            NoteState::AutoSaved => "AUTO_SAVED",
            NoteState::Submitted => "SUBMITTED",
            NoteState::UnderReview => "UNDER_REVIEW",
            NoteState::Signed => "SIGNED",
            NoteState::Amended => "AMENDED",
            NoteState::Finalized => "FINALIZED",
            NoteState::Locked => "LOCKED",
        }
    }

    /// Signed or later. Derivable from the persisted status alone, so callers
    /// can check it without building a machine.
    pub const fn is_immutable(self) -> bool {
        matches!(
            self,
            NoteState::Signed | NoteState::Amended | NoteState::Finalized | NoteState::Locked
        )
    }
}

impl fmt::Display for NoteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteEvent {
    AutoSave,
    Edit,
    Submit,
    Review,
    ReturnToDraft,
    Sign { attestation: bool },
    /// Appends a linked amendment; the signed content itself is untouched.
    Amend,
    Finalize,
    Lock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteEventKind {
    AutoSave,
    Edit,
    Submit,
    Review,
    ReturnToDraft,
    Sign,
    Amend,
    Finalize,
    Lock,
}

impl fmt::Display for NoteEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NoteEventKind::AutoSave => "AUTO_SAVE",
            NoteEventKind::Edit => "EDIT",
            NoteEventKind::Submit => "SUBMIT",
            NoteEventKind::Review => "REVIEW",
            NoteEventKind::ReturnToDraft => "RETURN_TO_DRAFT",
            NoteEventKind::Sign => "SIGN",
            NoteEventKind::Amend => "AMEND",
            NoteEventKind::Finalize => "FINALIZE",
            NoteEventKind::Lock => "LOCK",
        };
        f.write_str(name)
    }
}

impl NoteEventKind {
    /// Events that would change the note body.
    pub const fn alters_content(self) -> bool {
        matches!(
            self,
            NoteEventKind::AutoSave | NoteEventKind::Edit | NoteEventKind::Submit
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteData {
    pub attested: bool,
    pub amendments: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteWorkflow;

pub type NoteMachine = Machine<NoteWorkflow>;

fn guard_attestation(
    _: NoteState,
    _: &NoteData,
    event: &NoteEvent,
) -> std::result::Result<(), Rejection> {
    match event {
        NoteEvent::Sign { attestation } => guards::attested(*attestation),
        _ => Ok(()),
    }
}

fn guard_signed(
    state: NoteState,
    _: &NoteData,
    _: &NoteEvent,
) -> std::result::Result<(), Rejection> {
    guards::signed(matches!(state, NoteState::Signed | NoteState::Amended))
}

fn on_sign(data: &mut NoteData, _: &NoteEvent) {
    data.attested = true;
}

fn on_amend(data: &mut NoteData, _: &NoteEvent) {
    data.amendments = data.amendments.saturating_add(1);
}

const EDITABLE: &[NoteState] = &[NoteState::Draft, NoteState::AutoSaved];
const SIGNED_OR_AMENDED: &[NoteState] = &[NoteState::Signed, NoteState::Amended];

static RULES: [Rule<NoteWorkflow>; 9] = {
    use NoteEventKind as E;
    use NoteState as S;
    [
        Rule::new(Source::AnyOf(EDITABLE), E::AutoSave, Target::State(S::AutoSaved), None, None),
        Rule::new(Source::AnyOf(EDITABLE), E::Edit, Target::State(S::Draft), None, None),
        Rule::new(Source::AnyOf(EDITABLE), E::Submit, Target::State(S::Submitted), None, None),
        Rule::new(Source::State(S::Submitted), E::Review, Target::State(S::UnderReview), None, None),
        Rule::new(
            Source::State(S::UnderReview),
            E::ReturnToDraft,
            Target::State(S::Draft),
            None,
            None,
        ),
        Rule::new(
            Source::State(S::UnderReview),
            E::Sign,
            Target::State(S::Signed),
            Some(guard_attestation),
            Some(on_sign),
        ),
        Rule::new(
            Source::AnyOf(SIGNED_OR_AMENDED),
            E::Amend,
            Target::State(S::Amended),
            None,
            Some(on_amend),
        ),
        Rule::new(
            Source::AnyActive,
            E::Finalize,
            Target::State(S::Finalized),
            Some(guard_signed),
            None,
        ),
        Rule::new(Source::AnyOf(SIGNED_OR_AMENDED), E::Lock, Target::State(S::Locked), None, None),
    ]
};

impl WorkflowDefinition for NoteWorkflow {
    type State = NoteState;
    type EventKind = NoteEventKind;
    type Event = NoteEvent;
    type Data = NoteData;

    const NAME: &'static str = "Note";

    const STATES: &'static [NoteState] = &[
        NoteState::Draft,
        NoteState::AutoSaved,
        NoteState::Submitted,
        NoteState::UnderReview,
        NoteState::Signed,
        NoteState::Amended,
        NoteState::Finalized,
        NoteState::Locked,
    ];

    const EVENT_KINDS: &'static [NoteEventKind] = &[
        NoteEventKind::AutoSave,
        NoteEventKind::Edit,
        NoteEventKind::Submit,
        NoteEventKind::Review,
        NoteEventKind::ReturnToDraft,
        NoteEventKind::Sign,
        NoteEventKind::Amend,
        NoteEventKind::Finalize,
        NoteEventKind::Lock,
    ];

    fn kind_of(event: &NoteEvent) -> NoteEventKind {
        match event {
            NoteEvent::AutoSave => NoteEventKind::AutoSave,
            NoteEvent::Edit => NoteEventKind::Edit,
            NoteEvent::Submit => NoteEventKind::Submit,
            NoteEvent::Review => NoteEventKind::Review,
            NoteEvent::ReturnToDraft => NoteEventKind::ReturnToDraft,
            NoteEvent::Sign { .. } => NoteEventKind::Sign,
            NoteEvent::Amend => NoteEventKind::Amend,
            NoteEvent::Finalize => NoteEventKind::Finalize,
            NoteEvent::Lock => NoteEventKind::Lock,
        }
    }

    fn is_terminal(state: NoteState) -> bool {
        matches!(state, NoteState::Finalized | NoteState::Locked)
    }

    fn rules() -> &'static [Rule<Self>] {
        &RULES
    }
}

pub fn create_note_machine(status: &str) -> Result<NoteMachine> {
    NoteMachine::from_persisted(status)
}

impl Machine<NoteWorkflow> {
    /// True while the note awaits a signature; callers prompt for attestation.
    pub fn requires_attestation(&self) -> bool {
        self.state() == NoteState::UnderReview
    }

    pub fn is_immutable(&self) -> bool {
        self.state().is_immutable()
    }
}
