//! Guard library: pure predicates shared by the transition tables and the
//! gating helpers, so the UI pre-check and the authoritative transition can
//! never disagree.

use std::borrow::Cow;

use crate::engine::Rejection;

pub const STREAM_NOT_ACTIVE: &str = "Cannot start recording: Audio stream not active.";
pub const CAPTURE_STREAM_NOT_ACTIVE: &str = "Cannot start recording: Stream not active.";
pub const NO_AUDIO_RECORDED: &str = "Cannot create note: No audio recorded.";
pub const AUDIO_NOT_VALIDATED: &str = "Cannot create note: Audio has not been validated.";
pub const NO_CAPTURE_SESSION: &str = "Cannot create note: No capture session linked.";
pub const NO_TRANSCRIPT: &str = "Cannot create note: Transcript not available.";
pub const ATTESTATION_REQUIRED: &str = "Cannot sign note: Attestation required.";
pub const NOT_SIGNED: &str = "Cannot finalize: Note must be signed first.";

fn require(holds: bool, reason: &'static str) -> Result<(), Rejection> {
    if holds {
        Ok(())
    } else {
        Err(Cow::Borrowed(reason))
    }
}

pub fn stream_active(active: bool) -> Result<(), Rejection> {
    require(active, STREAM_NOT_ACTIVE)
}

pub fn capture_stream_active(active: bool) -> Result<(), Rejection> {
    require(active, CAPTURE_STREAM_NOT_ACTIVE)
}

pub fn has_audio(has_audio: bool) -> Result<(), Rejection> {
    require(has_audio, NO_AUDIO_RECORDED)
}

pub fn audio_validated(validated: bool) -> Result<(), Rejection> {
    require(validated, AUDIO_NOT_VALIDATED)
}

/// Treats an empty or whitespace-only identifier as missing.
fn present(id: Option<&str>) -> bool {
    id.is_some_and(|id| !id.trim().is_empty())
}

pub fn capture_session_linked(id: Option<&str>) -> Result<(), Rejection> {
    require(present(id), NO_CAPTURE_SESSION)
}

pub fn transcript_available(id: Option<&str>) -> Result<(), Rejection> {
    require(present(id), NO_TRANSCRIPT)
}

pub fn attested(attestation: bool) -> Result<(), Rejection> {
    require(attestation, ATTESTATION_REQUIRED)
}

pub fn signed(is_signed: bool) -> Result<(), Rejection> {
    require(is_signed, NOT_SIGNED)
}

/// Retry budget check. The message carries the configured maximum.
pub fn retry_budget(retry_count: u32, max_retries: u32) -> Result<(), Rejection> {
    if retry_count < max_retries {
        Ok(())
    } else {
        Err(Cow::Owned(format!(
            "Cannot retry: Maximum retry count ({max_retries}) exceeded."
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_guards_pass_and_reject() {
        assert!(stream_active(true).is_ok());
        assert_eq!(stream_active(false).unwrap_err(), STREAM_NOT_ACTIVE);
        assert!(has_audio(true).is_ok());
        assert_eq!(has_audio(false).unwrap_err(), NO_AUDIO_RECORDED);
        assert!(attested(true).is_ok());
        assert_eq!(attested(false).unwrap_err(), ATTESTATION_REQUIRED);
        assert_eq!(signed(false).unwrap_err(), NOT_SIGNED);
    }

    #[test]
    fn blank_identifiers_count_as_missing() {
        assert!(capture_session_linked(Some("cs_123")).is_ok());
        assert!(capture_session_linked(Some("   ")).is_err());
        assert!(capture_session_linked(None).is_err());
        assert_eq!(transcript_available(Some("")).unwrap_err(), NO_TRANSCRIPT);
    }

    #[test]
    fn retry_budget_names_the_configured_maximum() {
        assert!(retry_budget(0, 3).is_ok());
        assert!(retry_budget(2, 3).is_ok());
        assert_eq!(
            retry_budget(3, 3).unwrap_err(),
            "Cannot retry: Maximum retry count (3) exceeded."
        );
        assert_eq!(
            retry_budget(5, 5).unwrap_err(),
            "Cannot retry: Maximum retry count (5) exceeded."
        );
        assert!(retry_budget(0, 0).is_err());
    }
}
