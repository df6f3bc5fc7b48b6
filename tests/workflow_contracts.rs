use encounter_flow::WorkflowError;
use encounter_flow::engine::{WorkflowDefinition, parse_event_kind, parse_state, permitted_events, step};
use encounter_flow::graph::transition_graph;
use encounter_flow::machines::{
    CaptureEvent, CaptureSessionMachine, CaptureWorkflow, EncounterEvent, EncounterMachine,
    EncounterWorkflow, ExportJobEvent, ExportJobMachine, ExportJobWorkflow, NoteEvent,
    NoteMachine, NoteWorkflow,
};

fn encounter_samples() -> Vec<EncounterEvent> {
    vec![
        EncounterEvent::Schedule,
        EncounterEvent::CheckIn,
        EncounterEvent::Start,
        EncounterEvent::StartRecording { stream_active: true },
        EncounterEvent::StopRecording,
        EncounterEvent::TranscribeComplete { has_audio: true },
        EncounterEvent::CreateNote,
        EncounterEvent::SubmitForReview,
        EncounterEvent::RequestChanges,
        EncounterEvent::Sign { attestation: true },
        EncounterEvent::Finalize,
        EncounterEvent::Cancel,
    ]
}

fn capture_samples() -> Vec<CaptureEvent> {
    vec![
        CaptureEvent::Initialize,
        CaptureEvent::StreamReady,
        CaptureEvent::StartRecording,
        CaptureEvent::AudioLevel { level: 0.5 },
        CaptureEvent::Pause,
        CaptureEvent::Resume,
        CaptureEvent::Stop,
        CaptureEvent::Process,
        CaptureEvent::Complete,
        CaptureEvent::fail("E", "failure"),
        CaptureEvent::Reset,
        CaptureEvent::Abort,
    ]
}

fn note_samples() -> Vec<NoteEvent> {
    vec![
        NoteEvent::AutoSave,
        NoteEvent::Edit,
        NoteEvent::Submit,
        NoteEvent::Review,
        NoteEvent::ReturnToDraft,
        NoteEvent::Sign { attestation: true },
        NoteEvent::Amend,
        NoteEvent::Finalize,
        NoteEvent::Lock,
    ]
}

fn export_samples() -> Vec<ExportJobEvent> {
    vec![
        ExportJobEvent::Queue,
        ExportJobEvent::Start,
        ExportJobEvent::Complete,
        ExportJobEvent::fail("timeout"),
        ExportJobEvent::Retry,
        ExportJobEvent::Cancel,
    ]
}

/// Every `(state, event)` pair: terminal states and unlisted pairs fail with
/// `InvalidTransition`; listed pairs never do, and land inside the state set.
fn check_table_contract<D: WorkflowDefinition>(samples: &[D::Event]) {
    let kinds: Vec<_> = samples.iter().map(D::kind_of).collect();
    for kind in D::EVENT_KINDS {
        assert!(kinds.contains(kind), "{}: no sample for {kind}", D::NAME);
    }

    for &state in D::STATES {
        let permitted = permitted_events::<D>(state);
        if D::is_terminal(state) {
            assert!(permitted.is_empty(), "{}: terminal {state} permits events", D::NAME);
        }

        for event in samples {
            let kind = D::kind_of(event);
            let result = step::<D>(state, &D::Data::default(), event);

            if D::is_terminal(state) || !permitted.contains(&kind) {
                assert!(
                    matches!(result, Err(WorkflowError::InvalidTransition { .. })),
                    "{}: {state} + {kind} should be invalid, got {result:?}",
                    D::NAME
                );
            } else {
                match result {
                    Ok((to, _)) => assert!(D::STATES.contains(&to)),
                    Err(err) => assert!(
                        err.is_guard_rejected(),
                        "{}: {state} + {kind} is listed but failed with {err}",
                        D::NAME
                    ),
                }
            }
        }
    }
}

#[test]
fn encounter_table_contract() {
    check_table_contract::<EncounterWorkflow>(&encounter_samples());
}

#[test]
fn capture_table_contract() {
    check_table_contract::<CaptureWorkflow>(&capture_samples());
}

#[test]
fn note_table_contract() {
    check_table_contract::<NoteWorkflow>(&note_samples());
}

#[test]
fn export_table_contract() {
    check_table_contract::<ExportJobWorkflow>(&export_samples());
}

fn check_names_round_trip<D: WorkflowDefinition>() {
    for &state in D::STATES {
        assert_eq!(parse_state::<D>(&state.to_string()).unwrap(), state);
        assert_eq!(
            parse_state::<D>(&state.to_string().to_lowercase()).unwrap(),
            state
        );
    }
    for &kind in D::EVENT_KINDS {
        assert_eq!(parse_event_kind::<D>(&kind.to_string()).unwrap(), kind);
    }
    assert!(matches!(
        parse_event_kind::<D>("TELEPORT"),
        Err(WorkflowError::UnknownEvent { .. })
    ));
}

#[test]
fn persisted_names_parse_back() {
    check_names_round_trip::<EncounterWorkflow>();
    check_names_round_trip::<CaptureWorkflow>();
    check_names_round_trip::<NoteWorkflow>();
    check_names_round_trip::<ExportJobWorkflow>();
}

#[test]
fn graphs_never_leave_terminal_states() {
    fn check<D: WorkflowDefinition>() {
        let graph = transition_graph::<D>();
        assert!(!graph.terminal.is_empty());
        for edge in &graph.transitions {
            assert!(!graph.terminal.contains(&edge.start));
        }
    }
    check::<EncounterWorkflow>();
    check::<CaptureWorkflow>();
    check::<NoteWorkflow>();
    check::<ExportJobWorkflow>();
}

#[test]
fn rejection_leaves_machine_unchanged() {
    let mut m = EncounterMachine::from_persisted("IN_PROGRESS").unwrap();
    let before = m.clone();
    assert!(m.transition(EncounterEvent::CreateNote).is_err());
    assert!(m.transition(EncounterEvent::Finalize).is_err());
    assert!(m.transition(EncounterEvent::Schedule).is_err());
    assert_eq!(m, before);
}

#[test]
fn apply_is_the_pure_form_of_transition() {
    let m = NoteMachine::from_persisted("UNDER_REVIEW").unwrap();
    let signed = m.clone().apply(NoteEvent::Sign { attestation: true }).unwrap();
    assert!(signed.is_immutable());
    assert!(!m.is_immutable());

    let err = m.apply(NoteEvent::Sign { attestation: false }).unwrap_err();
    assert_eq!(err.reason(), Some("Cannot sign note: Attestation required."));
}

#[test]
fn machines_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<EncounterMachine>();
    assert_send_sync::<CaptureSessionMachine>();
    assert_send_sync::<NoteMachine>();
    assert_send_sync::<ExportJobMachine>();
}

#[test]
fn diagnostics_read_twice_are_identical() {
    let mut m = CaptureSessionMachine::from_persisted("IDLE").unwrap();
    m.transition(CaptureEvent::Initialize).unwrap();
    m.transition(CaptureEvent::StreamReady).unwrap();
    let first = m.diagnostics().clone();
    let second = m.diagnostics().clone();
    assert_eq!(first, second);
}

#[test]
fn encounter_and_capture_cooperate_on_a_visit() {
    let mut capture = CaptureSessionMachine::from_persisted("IDLE").unwrap();
    let mut encounter = EncounterMachine::from_persisted("CHECKED_IN").unwrap();
    encounter.transition(EncounterEvent::Start).unwrap();

    capture.transition(CaptureEvent::Initialize).unwrap();
    capture.transition(CaptureEvent::StreamReady).unwrap();
    encounter
        .transition(EncounterEvent::StartRecording {
            stream_active: capture.diagnostics().stream_active,
        })
        .unwrap();
    capture.transition(CaptureEvent::StartRecording).unwrap();

    capture.transition(CaptureEvent::Stop).unwrap();
    encounter.transition(EncounterEvent::StopRecording).unwrap();
    capture.transition(CaptureEvent::Process).unwrap();
    capture.transition(CaptureEvent::Complete).unwrap();
    encounter
        .transition(EncounterEvent::TranscribeComplete { has_audio: true })
        .unwrap();

    encounter.transition(EncounterEvent::CreateNote).unwrap();
    encounter.transition(EncounterEvent::SubmitForReview).unwrap();
    encounter
        .transition(EncounterEvent::Sign { attestation: true })
        .unwrap();
    encounter.transition(EncounterEvent::Finalize).unwrap();

    assert!(capture.is_terminal());
    assert!(encounter.is_terminal());
    assert_eq!(encounter.state().to_string(), "FINALIZED");
}
