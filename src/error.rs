use thiserror::Error;

use crate::cc::error::StateError;
use crate::cc::ParseError;
use crate::data::DataParseError;
use crate::engine::NewEngineError;

/// Anything that can go wrong between reading input and saving an engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("data parse error: {0}")]
    DataParse(#[from] DataParseError),
    #[error("invalid column types: {0}")]
    ColumnTypes(#[from] ParseError<String>),
    #[error("{0}")]
    NewEngine(#[from] NewEngineError),
    #[error("state error: {0}")]
    State(#[from] StateError),
}
