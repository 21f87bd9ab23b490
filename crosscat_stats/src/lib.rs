#![warn(unused_extern_crates)]
#![warn(
    clippy::all,
    clippy::imprecise_flops,
    clippy::suboptimal_flops,
    clippy::unseparated_literal_suffix,
    clippy::unreadable_literal,
    clippy::option_option,
    clippy::implicit_clone
)]
//! Partitions, the Chinese restaurant process, and the conjugate component
//! models used by CrossCat columns.
pub mod assignment;
pub mod prior;
pub mod prior_process;

pub use assignment::{lcrp, Assignment, AssignmentError};
pub use prior::{
    CategoricalHyper, CategoricalSuffStat, ConjugateModel, ContinuousHyper,
    ContinuousSuffStat, SuffStat,
};
pub use prior_process::{Crp, PriorProcess};

/// Natural log of the gamma function
#[inline]
pub fn ln_gamma(x: f64) -> f64 {
    ::special::Gamma::ln_gamma(x).0
}
