mod capture;
mod encounter;
mod export;
mod note;

pub use capture::{
    CaptureEvent, CaptureEventKind, CaptureSessionMachine, CaptureState, CaptureWorkflow,
    Diagnostics, LastError, PERMISSION_DENIED, PermissionState, Permissions,
    create_capture_session_machine,
};
pub use encounter::{
    EncounterData, EncounterEvent, EncounterEventKind, EncounterMachine, EncounterState,
    EncounterWorkflow, create_encounter_machine,
};
pub use export::{
    DEFAULT_MAX_RETRIES, ExportJobData, ExportJobEvent, ExportJobEventKind, ExportJobMachine,
    ExportJobState, ExportJobWorkflow, RetryPolicy, create_export_job_machine,
};
pub use note::{
    NoteData, NoteEvent, NoteEventKind, NoteMachine, NoteState, NoteWorkflow, create_note_machine,
};
