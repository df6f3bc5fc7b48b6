//! Caller-facing pre-checks.
//!
//! These let a UI disable an action (or an API handler refuse early) using the
//! same guards the transition tables enforce. They are advisory: the transition
//! itself remains the authority.

use serde::{Deserialize, Serialize};

use crate::engine::Rejection;
use crate::guards;
use crate::machines::{NoteState, RetryPolicy};

/// Facts gathered by the caller before offering "Create note".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteCreationFacts {
    pub has_audio: bool,
    pub audio_validated: bool,
    pub capture_session_id: Option<String>,
    pub transcript_id: Option<String>,
}

/// Outcome of a pre-check; `reason` is set exactly when `allowed` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl GateDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

impl From<Result<(), Rejection>> for GateDecision {
    fn from(result: Result<(), Rejection>) -> Self {
        match result {
            Ok(()) => GateDecision::allow(),
            Err(reason) => GateDecision::deny(reason),
        }
    }
}

/// Whether a note may be created. Checks run in a fixed order and the first
/// failure is reported.
pub fn can_create_note(facts: &NoteCreationFacts) -> GateDecision {
    let check = || -> Result<(), Rejection> {
        guards::has_audio(facts.has_audio)?;
        guards::audio_validated(facts.audio_validated)?;
        guards::capture_session_linked(facts.capture_session_id.as_deref())?;
        guards::transcript_available(facts.transcript_id.as_deref())?;
        Ok(())
    };
    check().into()
}

/// Whether `SIGN` would be accepted for a note in `state` with the given attestation.
pub fn can_sign_note(state: NoteState, attestation: bool) -> GateDecision {
    if state != NoteState::UnderReview {
        return GateDecision::deny(format!("Cannot sign note: Note is {state}, not under review."));
    }
    guards::attested(attestation).into()
}

/// Whether another `RETRY` fits within the policy.
pub fn can_retry_export(retry_count: u32, policy: RetryPolicy) -> GateDecision {
    guards::retry_budget(retry_count, policy.max_retries).into()
}
