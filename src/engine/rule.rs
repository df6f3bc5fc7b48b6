use std::borrow::Cow;
use std::marker::PhantomData;

use super::WorkflowDefinition;

/// Operator-facing explanation returned by a failing guard.
pub type Rejection = Cow<'static, str>;

/// Pure admissibility check over the current state, machine data and event payload.
pub type Guard<D> = fn(
    <D as WorkflowDefinition>::State,
    &<D as WorkflowDefinition>::Data,
    &<D as WorkflowDefinition>::Event,
) -> Result<(), Rejection>;

/// Deterministic update of the machine data, applied only after the guard passes.
pub type Effect<D> = fn(&mut <D as WorkflowDefinition>::Data, &<D as WorkflowDefinition>::Event);

/// States a rule may fire from.
#[derive(Debug, Clone, Copy)]
pub enum Source<S: 'static> {
    State(S),
    AnyOf(&'static [S]),
    /// Every non-terminal state.
    AnyActive,
}

impl<S: Copy + PartialEq> Source<S> {
    /// Whether `state` is covered. Terminal filtering is done by the engine.
    pub fn contains(&self, state: S) -> bool {
        match self {
            Source::State(s) => *s == state,
            Source::AnyOf(states) => states.contains(&state),
            Source::AnyActive => true,
        }
    }
}

/// Where a rule lands.
#[derive(Debug, Clone, Copy)]
pub enum Target<S> {
    State(S),
    /// Self-loop: stay in the current state (data-only updates).
    Stay,
}

impl<S: Copy> Target<S> {
    pub fn resolve(&self, current: S) -> S {
        match self {
            Target::State(s) => *s,
            Target::Stay => current,
        }
    }
}

/// One row of a transition table.
pub struct Rule<D: WorkflowDefinition> {
    pub from: Source<D::State>,
    pub on: D::EventKind,
    pub to: Target<D::State>,
    pub guard: Option<Guard<D>>,
    pub effect: Option<Effect<D>>,
    _definition: PhantomData<fn() -> D>,
}

impl<D: WorkflowDefinition> Rule<D> {
    pub const fn new(
        from: Source<D::State>,
        on: D::EventKind,
        to: Target<D::State>,
        guard: Option<Guard<D>>,
        effect: Option<Effect<D>>,
    ) -> Self {
        Self {
            from,
            on,
            to,
            guard,
            effect,
            _definition: PhantomData,
        }
    }

    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }
}
