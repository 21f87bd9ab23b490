//! Defines the `Feature` trait for cross-categorization columns
use crosscat_stats::{Assignment, CategoricalHyper, ContinuousHyper};
use enum_dispatch::enum_dispatch;

use crate::feature::{ColModel, Column};

/// A Cross-Categorization feature/column
///
/// Components are collapsed, so every score is a closed-form marginal or
/// posterior predictive. Missing values are `NaN` and contribute nothing.
#[enum_dispatch(ColModel)]
pub trait Feature {
    /// The feature ID
    fn id(&self) -> usize;

    /// The number of rows
    fn len(&self) -> usize;
    /// Whether len is zero
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// The number of components
    fn k(&self) -> usize;

    /// Rebuild the component statistics from an assignment
    fn reassign(&mut self, asgn: &Assignment);
    /// The log marginal likelihood of the data under the current components
    fn score(&self) -> f64;
    /// The log marginal likelihood of the data under a different assignment
    fn asgn_score(&self, asgn: &Assignment) -> f64;
    /// Append an empty component to the components vector
    fn append_empty_component(&mut self);
    /// Remove the component at index `k`
    fn drop_component(&mut self, k: usize);
    /// The log posterior predictive of the datum at `row_ix` under the
    /// component at index `k`
    fn predictive_score_at(&self, row_ix: usize, k: usize) -> f64;
    /// The log posterior predictive of the value `x` under component `k`
    fn value_predictive_score(&self, x: f64, k: usize) -> f64;
    /// The marginal likelihood of the datum on its own
    fn singleton_score(&self, row_ix: usize) -> f64;
    /// The marginal likelihood of the value `x` on its own
    fn value_singleton_score(&self, x: f64) -> f64;

    /// Have the component at index `k` observe the datum at row `row_ix`
    fn observe_datum(&mut self, row_ix: usize, k: usize);
    /// Have the component at index `k` forget the datum at row `row_ix`
    fn forget_datum(&mut self, row_ix: usize, k: usize);

    /// The column's data
    fn data(&self) -> &[f64];
    /// `true` if `x` is missing or a value the column can hold
    fn accepts(&self, x: f64) -> bool;
}
