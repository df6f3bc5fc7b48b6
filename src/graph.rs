use serde::Serialize;

use crate::engine::{WorkflowDefinition, find_rule};

/// Transition graph derived from a machine's table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionGraph<S, K> {
    pub machine: &'static str,
    pub states: Vec<S>,
    pub terminal: Vec<S>,
    pub transitions: Vec<TransitionEdge<S, K>>,
}

/// Directed edge `start --event--> goal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionEdge<S, K> {
    pub start: S,
    pub event: K,
    pub goal: S,
    pub guarded: bool,
}

/// Build the graph using the engine's own first-match lookup, so every edge
/// listed is exactly what `step` would consult.
pub fn transition_graph<D: WorkflowDefinition>() -> TransitionGraph<D::State, D::EventKind> {
    let mut transitions = Vec::new();

    for &start in D::STATES {
        for &event in D::EVENT_KINDS {
            if let Some(rule) = find_rule::<D>(start, event) {
                transitions.push(TransitionEdge {
                    start,
                    event,
                    goal: rule.to.resolve(start),
                    guarded: rule.is_guarded(),
                });
            }
        }
    }

    TransitionGraph {
        machine: D::NAME,
        states: D::STATES.to_vec(),
        terminal: D::STATES
            .iter()
            .copied()
            .filter(|s| D::is_terminal(*s))
            .collect(),
        transitions,
    }
}
