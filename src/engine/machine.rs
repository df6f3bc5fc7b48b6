use std::marker::PhantomData;

use tracing::{debug, info, warn};

use super::{WorkflowDefinition, find_rule, parse_state};
use crate::error::{Result, WorkflowError};

/// The pure transition function.
///
/// Looks up `(state, kind_of(event))`, evaluates the guard, and returns the
/// target state together with a copy of `data` updated by the rule's effect.
/// Nothing is mutated on failure.
pub fn step<D: WorkflowDefinition>(
    state: D::State,
    data: &D::Data,
    event: &D::Event,
) -> Result<(D::State, D::Data)> {
    let kind = D::kind_of(event);

    let Some(rule) = find_rule::<D>(state, kind) else {
        warn!(
            machine = D::NAME,
            state = %state,
            event = %kind,
            terminal = D::is_terminal(state),
            "invalid transition"
        );
        return Err(WorkflowError::InvalidTransition {
            machine: D::NAME,
            state: state.to_string(),
            event: kind.to_string(),
        });
    };

    if let Some(guard) = rule.guard {
        if let Err(reason) = guard(state, data, event) {
            info!(
                machine = D::NAME,
                state = %state,
                event = %kind,
                %reason,
                "guard rejected transition"
            );
            return Err(WorkflowError::GuardRejected {
                machine: D::NAME,
                state: state.to_string(),
                event: kind.to_string(),
                reason,
            });
        }
    }

    let mut next = data.clone();
    if let Some(effect) = rule.effect {
        effect(&mut next, event);
    }
    let to = rule.to.resolve(state);

    debug!(
        machine = D::NAME,
        from = %state,
        to = %to,
        event = %kind,
        "state transition"
    );

    Ok((to, next))
}

/// Event kinds that have a table entry from `state`. Guards are not evaluated.
pub fn permitted_events<D: WorkflowDefinition>(state: D::State) -> Vec<D::EventKind> {
    D::EVENT_KINDS
        .iter()
        .copied()
        .filter(|kind| find_rule::<D>(state, *kind).is_some())
        .collect()
}

/// A live workflow instance: the current state plus the data the table
/// accumulates (captured facts, diagnostics, counters).
///
/// Rebuilt from persisted values at the start of each caller operation and
/// discarded afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Machine<D: WorkflowDefinition> {
    state: D::State,
    data: D::Data,
    _definition: PhantomData<fn() -> D>,
}

impl<D: WorkflowDefinition> Machine<D> {
    pub fn from_state(state: D::State) -> Self {
        Self::with_data(state, D::Data::default())
    }

    pub fn with_data(state: D::State, data: D::Data) -> Self {
        Self {
            state,
            data,
            _definition: PhantomData,
        }
    }

    /// Rehydrate from a persisted status string. Unrecognized values fail
    /// with [`WorkflowError::UnknownState`].
    pub fn from_persisted(status: &str) -> Result<Self> {
        parse_state::<D>(status).map(Self::from_state)
    }

    pub fn state(&self) -> D::State {
        self.state
    }

    pub fn data(&self) -> &D::Data {
        &self.data
    }

    pub fn is_terminal(&self) -> bool {
        D::is_terminal(self.state)
    }

    /// Attempt `event`. On success the machine moves and the new state is
    /// returned; on failure it is left untouched.
    pub fn transition(&mut self, event: D::Event) -> Result<D::State> {
        let (state, data) = step::<D>(self.state, &self.data, &event)?;
        self.state = state;
        self.data = data;
        Ok(state)
    }

    /// Consuming form of [`Machine::transition`].
    pub fn apply(self, event: D::Event) -> Result<Self> {
        let (state, data) = step::<D>(self.state, &self.data, &event)?;
        Ok(Self::with_data(state, data))
    }

    pub fn permitted_events(&self) -> Vec<D::EventKind> {
        permitted_events::<D>(self.state)
    }
}
