use std::collections::BTreeMap;

use crosscat_stats::{Assignment, PriorProcess};
use crosscat_utils::{ln_pflip, logsumexp};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ViewError;
use crate::feature::{ColModel, Feature};

mod gibbs;

/// Stable handle to a `View` owned by a `State`
///
/// Handles are never reused within a `State`, and ordering handles orders
/// views by creation.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct ViewId(pub u64);

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// A cross-categorization view of columns/features
///
/// View is a multivariate generalization of the standard Dirichlet-process
/// mixture model. `View` captures a joint distribution over its columns by
/// assuming the columns share one partition of the rows.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct View {
    /// A Map of features indexed by the feature ID
    pub ftrs: BTreeMap<usize, ColModel>,
    /// The assignment of rows to categories and the CRP it came from
    pub prior_process: PriorProcess,
}

impl View {
    /// An empty view partitioned by `prior_process`
    pub fn new(prior_process: PriorProcess) -> Self {
        Self {
            ftrs: BTreeMap::new(),
            prior_process,
        }
    }

    pub fn asgn(&self) -> &Assignment {
        &self.prior_process.asgn
    }

    pub fn asgn_mut(&mut self) -> &mut Assignment {
        &mut self.prior_process.asgn
    }

    /// The number of rows in the `View`
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.asgn().len()
    }

    /// The number of columns in the `View`
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.ftrs.len()
    }

    /// The number of columns/features
    #[inline]
    pub fn len(&self) -> usize {
        self.n_cols()
    }

    /// returns true if there are no features
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_cols() == 0
    }

    /// The number of categories
    #[inline]
    pub fn n_cats(&self) -> usize {
        self.asgn().n_cats
    }

    /// The row CRP concentration
    #[inline]
    pub fn alpha(&self) -> f64 {
        self.prior_process.alpha()
    }

    /// The number of rows in each category
    #[inline]
    pub fn row_partition_sizes(&self) -> &[usize] {
        &self.asgn().counts
    }

    /// Log probability of the row partition under the view's CRP
    #[inline]
    pub fn crp_score(&self) -> f64 {
        self.prior_process.ln_f_partition()
    }

    /// Log probability of the row partition under a CRP with `alpha`
    #[inline]
    pub fn row_crp_score(&self, alpha: f64) -> f64 {
        self.prior_process.ln_f_partition_at(alpha)
    }

    /// Get the likelihood of the data in this view given the current
    /// assignment
    #[inline]
    pub fn score(&self) -> f64 {
        self.ftrs.values().fold(0.0, |acc, ftr| acc + ftr.score())
    }

    /// Log marginal likelihood of `ftr` if it were partitioned like this
    /// view's rows. Does not modify the view.
    #[inline]
    pub fn predictive_logp(&self, ftr: &ColModel) -> f64 {
        ftr.asgn_score(self.asgn())
    }

    /// Insert a new `Feature` into the `View`
    ///
    /// Returns the feature's log marginal likelihood under the view's row
    /// partition, which is the change in the view's score.
    pub fn insert_feature(&mut self, mut ftr: ColModel) -> Result<f64, ViewError> {
        let id = ftr.id();
        if self.ftrs.contains_key(&id) {
            return Err(ViewError::FeatureAlreadyPresent(id));
        }
        if ftr.len() != self.n_rows() {
            return Err(ViewError::FeatureLengthMismatch {
                col_ix: id,
                n_rows: self.n_rows(),
                len: ftr.len(),
            });
        }

        ftr.reassign(self.asgn());
        let score = ftr.score();
        self.ftrs.insert(id, ftr);
        Ok(score)
    }

    /// Remove and return the `Feature` with `id` along with the change in
    /// the view's score.
    pub fn remove_feature(
        &mut self,
        id: usize,
    ) -> Result<(ColModel, f64), ViewError> {
        self.ftrs
            .remove(&id)
            .map(|ftr| {
                let score = ftr.score();
                (ftr, -score)
            })
            .ok_or(ViewError::FeatureNotPresent(id))
    }

    /// Grid-sample the row CRP alpha. The grid carries a flat prior.
    ///
    /// Returns the change in the partition's log probability.
    pub fn update_alpha<R: Rng>(&mut self, grid: &[f64], rng: &mut R) -> f64 {
        let logps: Vec<f64> =
            grid.iter().map(|&alpha| self.row_crp_score(alpha)).collect();
        let ix = ln_pflip(&logps, rng);
        let delta = logps[ix] - self.crp_score();
        self.prior_process.process.alpha = grid[ix];
        delta
    }

    /// Log predictive probability of a new row of values, indexed by column
    /// ID. Missing values (`NaN`) are skipped.
    pub fn row_predictive_logp(&self, row: &[f64]) -> Result<f64, ViewError> {
        if let Some(&col_ix) = self.ftrs.keys().find(|&&id| id >= row.len()) {
            return Err(ViewError::RowTooShort {
                col_ix,
                len: row.len(),
            });
        }

        let process = &self.prior_process.process;
        let ln_norm = process.ln_normalizer(self.n_rows());

        let mut logps: Vec<f64> = self
            .row_partition_sizes()
            .iter()
            .enumerate()
            .map(|(k, &ct)| {
                let ln_x: f64 = self
                    .ftrs
                    .iter()
                    .map(|(&id, ftr)| ftr.value_predictive_score(row[id], k))
                    .sum();
                process.ln_gibbs_weight(ct) - ln_norm + ln_x
            })
            .collect();

        let ln_x: f64 = self
            .ftrs
            .iter()
            .map(|(&id, ftr)| ftr.value_singleton_score(row[id]))
            .sum();
        logps.push(process.ln_singleton_weight() - ln_norm + ln_x);

        Ok(logsumexp(&logps))
    }
}

// private view functions
impl View {
    #[inline]
    fn append_empty_component(&mut self) {
        for ftr in self.ftrs.values_mut() {
            ftr.append_empty_component();
        }
    }

    #[inline]
    fn drop_component(&mut self, k: usize) {
        for ftr in self.ftrs.values_mut() {
            ftr.drop_component(k);
        }
    }

    #[inline]
    fn observe_row(&mut self, row_ix: usize, k: usize) {
        self.ftrs
            .values_mut()
            .for_each(|ftr| ftr.observe_datum(row_ix, k));
    }

    #[inline]
    fn forget_row(&mut self, row_ix: usize, k: usize) {
        self.ftrs
            .values_mut()
            .for_each(|ftr| ftr.forget_datum(row_ix, k));
    }

    /// The log posterior predictive of row `row_ix` under component `k`
    #[inline]
    fn predictive_score_at(&self, row_ix: usize, k: usize) -> f64 {
        self.ftrs
            .values()
            .map(|ftr| ftr.predictive_score_at(row_ix, k))
            .sum()
    }

    /// The marginal likelihood of row `row_ix` on its own
    #[inline]
    fn singleton_score(&self, row_ix: usize) -> f64 {
        self.ftrs
            .values()
            .map(|ftr| ftr.singleton_score(row_ix))
            .sum()
    }
}
