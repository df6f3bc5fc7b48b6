//! Generic transition-table interpreter.
//!
//! A workflow is described by a [`WorkflowDefinition`]: a closed state set, a
//! closed event set, and a static table of [`Rule`]s. The engine looks up the
//! first rule matching `(state, event kind)`, evaluates its guard, and applies
//! its effect to a copy of the machine data. It performs no I/O and holds no
//! state of its own beyond the [`Machine`] value.

mod machine;
mod rule;

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, WorkflowError};

pub use machine::{Machine, permitted_events, step};
pub use rule::{Effect, Guard, Rejection, Rule, Source, Target};

/// Static description of one workflow: states, events, data and table.
pub trait WorkflowDefinition: Sized + 'static {
    type State: Copy + Eq + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + 'static;
    type EventKind: Copy + Eq + fmt::Debug + fmt::Display + Serialize + 'static;
    type Event: Clone + fmt::Debug + Serialize + DeserializeOwned;
    type Data: Clone + fmt::Debug + Default + PartialEq + Serialize;

    /// Machine name used in logs and errors.
    const NAME: &'static str;
    const STATES: &'static [Self::State];
    const EVENT_KINDS: &'static [Self::EventKind];

    fn kind_of(event: &Self::Event) -> Self::EventKind;

    fn is_terminal(state: Self::State) -> bool;

    fn rules() -> &'static [Rule<Self>];
}

/// Parse a persisted status value (e.g. `"NOTE_SIGNED"`) into a state.
///
/// Matching ignores surrounding whitespace and ASCII case.
pub fn parse_state<D: WorkflowDefinition>(value: &str) -> Result<D::State> {
    let wanted = value.trim();
    D::STATES
        .iter()
        .copied()
        .find(|s| s.to_string().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| WorkflowError::UnknownState {
            machine: D::NAME,
            value: value.to_string(),
        })
}

/// Parse an event kind name (e.g. `"START_RECORDING"`).
pub fn parse_event_kind<D: WorkflowDefinition>(value: &str) -> Result<D::EventKind> {
    let wanted = value.trim();
    D::EVENT_KINDS
        .iter()
        .copied()
        .find(|k| k.to_string().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| WorkflowError::UnknownEvent {
            machine: D::NAME,
            value: value.to_string(),
        })
}

/// First rule for `(state, kind)`, ignoring guards. Terminal states never match.
pub(crate) fn find_rule<D: WorkflowDefinition>(
    state: D::State,
    kind: D::EventKind,
) -> Option<&'static Rule<D>> {
    if D::is_terminal(state) {
        return None;
    }
    D::rules()
        .iter()
        .find(|rule| rule.on == kind && rule.from.contains(state))
}
