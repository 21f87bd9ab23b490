//! CrossCat posterior inference over mixed continuous and categorical tables.
//!
//! An [`Engine`] runs independent [`State`](crate::cc::state::State) chains
//! in parallel. Each state partitions the columns into views and the rows of
//! each view into categories.
#![warn(
    clippy::all,
    clippy::imprecise_flops,
    clippy::suboptimal_flops,
    clippy::unseparated_literal_suffix,
    clippy::unreadable_literal,
    clippy::option_option,
    clippy::implicit_clone
)]
pub mod config;
pub mod data;
pub mod engine;
pub mod error;

pub use crosscat_cc as cc;
pub use crosscat_stats as stats;
pub use crosscat_utils as utils;

pub use config::EngineUpdateConfig;
pub use engine::{Engine, EngineBuilder};
pub use error::Error;
