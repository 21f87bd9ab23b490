//! Conjugate component models
//!
//! Components are collapsed: a cluster is represented only by the
//! sufficient statistic of the data it holds, and the hyperparameters are
//! shared by every cluster of a column.
mod csd;
mod ng;

pub use csd::{CategoricalHyper, CategoricalSuffStat};
pub use ng::{ContinuousHyper, ContinuousSuffStat};

use std::fmt::Debug;

/// Sufficient statistic that can absorb and release observations
pub trait SuffStat {
    /// Number of observations absorbed
    fn n(&self) -> usize;
    fn observe(&mut self, x: f64);
    fn forget(&mut self, x: f64);
}

/// Hyperparameters of a conjugate model with a closed-form marginal
pub trait ConjugateModel: Clone + Debug + PartialEq {
    type Stat: SuffStat + Clone + Debug + PartialEq;

    fn empty_suffstat(&self) -> Self::Stat;

    /// Log marginal likelihood of the data summarized by `stat`. Zero for
    /// an empty statistic.
    fn ln_m(&self, stat: &Self::Stat) -> f64;

    /// Log posterior predictive of `x` given the data summarized by `stat`
    fn ln_pp(&self, x: f64, stat: &Self::Stat) -> f64 {
        let mut with_x = stat.clone();
        with_x.observe(x);
        self.ln_m(&with_x) - self.ln_m(stat)
    }

    /// `false` if `x` can't be generated by the model
    fn supports(&self, x: f64) -> bool;
}
