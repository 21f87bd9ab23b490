use thiserror::Error;

use crate::cc::state::BuildStateError;

/// Errors that can arise when creating a new engine
#[derive(Debug, Error, PartialEq)]
pub enum NewEngineError {
    /// Asked for zero states. The Engine must have at least one state.
    #[error("attempted to create an engine with zero states")]
    ZeroStatesRequested,
    /// The data could not be turned into a state
    #[error("could not build state: {0}")]
    BuildState(#[from] BuildStateError),
}
