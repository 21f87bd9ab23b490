use crate::transition::{StateTransition, DEFAULT_STATE_TRANSITIONS};
use serde::{Deserialize, Serialize};

/// Configuration for `State::update`
///
/// Sets the number of iterations and the transitions run in each.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StateUpdateConfig {
    /// Number of iterations to run.
    #[serde(default = "default_n_iters")]
    pub n_iters: usize,
    /// Which transitions to run, in order, in each iteration
    #[serde(default = "default_transitions")]
    pub transitions: Vec<StateTransition>,
}

fn default_n_iters() -> usize {
    1
}

fn default_transitions() -> Vec<StateTransition> {
    DEFAULT_STATE_TRANSITIONS.into()
}

impl StateUpdateConfig {
    pub fn new() -> Self {
        StateUpdateConfig {
            n_iters: default_n_iters(),
            transitions: default_transitions(),
        }
    }
}

impl Default for StateUpdateConfig {
    fn default() -> Self {
        StateUpdateConfig::new()
    }
}
