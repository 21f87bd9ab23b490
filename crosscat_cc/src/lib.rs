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
pub mod error;
pub mod feature;
pub mod state;
pub mod transition;
pub mod view;

use serde::Serialize;
use std::fmt::{Debug, Display};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ParseError<T: Serialize + Debug + Clone + PartialEq + Eq>(pub T);

impl<T> Display for ParseError<T>
where
    T: Serialize + Debug + Clone + PartialEq + Eq,
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "could not parse {self:?}")
    }
}

impl<T> std::error::Error for ParseError<T> where
    T: Serialize + Debug + Clone + PartialEq + Eq
{
}
