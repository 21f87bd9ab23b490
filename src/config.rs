use crate::cc::config::StateUpdateConfig;
use crate::cc::transition::{StateTransition, DEFAULT_STATE_TRANSITIONS};
use serde::{Deserialize, Serialize};

/// Configuration for `Engine::update`
///
/// Sets the number of iterations and the transitions each state runs.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngineUpdateConfig {
    /// Number of iterations to run each state.
    pub n_iters: usize,
    /// Which transitions to run, in order, in each iteration
    #[serde(default)]
    pub transitions: Vec<StateTransition>,
}

impl EngineUpdateConfig {
    /// One iteration and no transitions
    pub fn new() -> Self {
        Self {
            n_iters: 1,
            transitions: Vec::new(),
        }
    }

    pub fn with_default_transitions() -> Self {
        Self::new().default_transitions()
    }

    #[must_use]
    pub fn default_transitions(mut self) -> Self {
        self.transitions = DEFAULT_STATE_TRANSITIONS.into();
        self
    }

    #[must_use]
    pub fn transitions(mut self, transitions: Vec<StateTransition>) -> Self {
        self.transitions.extend(transitions);
        self
    }

    #[must_use]
    pub fn transition(mut self, transition: StateTransition) -> Self {
        self.transitions.push(transition);
        self
    }

    #[must_use]
    pub fn n_iters(mut self, n_iters: usize) -> Self {
        self.n_iters = n_iters;
        self
    }

    /// Emit a `StateUpdateConfig` with the same settings. An empty
    /// transition list runs every transition.
    pub fn state_config(&self) -> StateUpdateConfig {
        let transitions = if self.transitions.is_empty() {
            DEFAULT_STATE_TRANSITIONS.into()
        } else {
            self.transitions.clone()
        };
        StateUpdateConfig {
            n_iters: self.n_iters,
            transitions,
        }
    }
}

impl Default for EngineUpdateConfig {
    fn default() -> Self {
        Self::with_default_transitions()
    }
}
