//! A CrossCat state: a partition of columns into views
mod builder;
mod geweke;
mod grids;

pub use builder::{BuildStateError, Builder, InitPolicy};
pub use geweke::{
    run_geweke, GewekeColumnSummary, GewekeError, GewekeResult,
    GewekeStateSummary, StateGewekeSettings,
};
pub use grids::{HyperGrids, DEFAULT_N_GRID};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crosscat_stats::{lcrp, Crp, PriorProcess};
use crosscat_utils::ln_pflip;
use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};

use crate::config::StateUpdateConfig;
use crate::error::{StateError, ViewError};
use crate::feature::{
    continuous_scale_fits, max_abs, ColModel, ColType, ColumnSuffStats,
    Feature, Hyper,
};
use crate::transition::StateTransition;
use crate::view::{View, ViewId};

/// Stores some diagnostic info in the `State` at every iteration
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
#[serde(default)]
pub struct StateDiagnostics {
    /// Log joint probability of the column partition and the data
    pub marginal_logp: Vec<f64>,
    /// The number of views
    pub n_views: Vec<usize>,
    /// The column CRP alpha
    pub column_crp_alpha: Vec<f64>,
    /// The number of categories in the views with the fewest categories
    pub n_cats_min: Vec<usize>,
    /// The number of categories in the views with the most categories
    pub n_cats_max: Vec<usize>,
    /// The median number of categories in a view
    pub n_cats_median: Vec<f64>,
}

/// A place a column could be sent during a column Gibbs step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewCandidate {
    Existing(ViewId),
    /// The auxiliary singleton view, which only exists if it is chosen
    NewView,
}

/// What `State::remove_feature` took out of the state
#[derive(Clone, Debug, PartialEq)]
pub struct RemovedFeature {
    pub ftr: ColModel,
    /// The view the feature was in
    pub view: ViewId,
    /// The view itself, if removing the feature left it empty
    pub dropped_view: Option<View>,
    /// Change in the state's marginal log probability
    pub delta: f64,
}

/// A cross-categorization state
///
/// Each column belongs to exactly one view, and each view holds its own
/// partition of the rows. The state keeps two running scores:
/// `column_crp_score`, the log CRP probability of the column partition, and
/// `data_score`, the sum over views of the row-partition log probability
/// plus each column's log marginal likelihood. Every mutation updates both
/// incrementally and reports the change.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct State {
    views: BTreeMap<ViewId, View>,
    view_lookup: BTreeMap<usize, ViewId>,
    next_view_id: u64,
    col_types: Vec<ColType>,
    n_rows: usize,
    column_crp_alpha: f64,
    column_crp_score: f64,
    data_score: f64,
    grids: HyperGrids,
    rng: Xoshiro256Plus,
    pub diagnostics: StateDiagnostics,
}

impl State {
    /// A state with no views and no assigned columns
    pub(crate) fn empty(
        n_rows: usize,
        col_types: Vec<ColType>,
        grids: HyperGrids,
        column_crp_alpha: f64,
        rng: Xoshiro256Plus,
    ) -> Self {
        let col_types = col_types
            .iter()
            .map(|col_type| match col_type {
                ColType::Continuous { .. } => ColType::continuous(),
                ColType::Categorical { k, .. } => ColType::categorical(*k),
            })
            .collect();

        Self {
            views: BTreeMap::new(),
            view_lookup: BTreeMap::new(),
            next_view_id: 0,
            col_types,
            n_rows,
            column_crp_alpha,
            column_crp_score: 0.0,
            data_score: 0.0,
            grids,
            rng,
            diagnostics: StateDiagnostics::default(),
        }
    }

    /// The number of rows
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// The number of columns, assigned or not
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.col_types.len()
    }

    /// The number of views, including empty ones
    #[inline]
    pub fn n_views(&self) -> usize {
        self.views.len()
    }

    /// The number of columns in each view, in view order
    pub fn view_counts(&self) -> Vec<usize> {
        self.views.values().map(View::n_cols).collect()
    }

    #[inline]
    pub fn column_crp_alpha(&self) -> f64 {
        self.column_crp_alpha
    }

    #[inline]
    pub fn column_crp_score(&self) -> f64 {
        self.column_crp_score
    }

    #[inline]
    pub fn data_score(&self) -> f64 {
        self.data_score
    }

    /// Log joint probability of the column partition, the row partitions,
    /// and the data
    #[inline]
    pub fn marginal_logp(&self) -> f64 {
        self.column_crp_score + self.data_score
    }

    #[inline]
    pub fn grids(&self) -> &HyperGrids {
        &self.grids
    }

    /// The type of column `col_ix`
    pub fn col_type(&self, col_ix: usize) -> Result<&ColType, StateError> {
        self.col_types
            .get(col_ix)
            .ok_or(StateError::ColumnIndexOutOfBounds {
                n_cols: self.n_cols(),
                col_ix,
            })
    }

    /// Iterate over the views in order of creation
    pub fn views(&self) -> impl Iterator<Item = (ViewId, &View)> {
        self.views.iter().map(|(id, view)| (*id, view))
    }

    /// The view that owns column `col_ix`
    pub fn view_of(&self, col_ix: usize) -> Result<ViewId, StateError> {
        self.view_lookup.get(&col_ix).copied().ok_or_else(|| {
            if col_ix < self.n_cols() {
                StateError::ColumnNotAssigned(col_ix)
            } else {
                StateError::ColumnIndexOutOfBounds {
                    n_cols: self.n_cols(),
                    col_ix,
                }
            }
        })
    }

    /// The feature for column `col_ix`
    pub fn feature(&self, col_ix: usize) -> Result<&ColModel, StateError> {
        let view_id = self.view_of(col_ix)?;
        self.view(view_id)?
            .ftrs
            .get(&col_ix)
            .ok_or(StateError::ColumnNotAssigned(col_ix))
    }

    /// A feature for column `col_ix` holding `data`. It carries the column's
    /// current hyperparameters, or the default ones if the column is not
    /// assigned.
    pub fn column_model(
        &self,
        col_ix: usize,
        data: Vec<f64>,
    ) -> Result<ColModel, StateError> {
        let hyper = match self.feature(col_ix) {
            Ok(ftr) => ftr.hyper(),
            Err(StateError::ColumnNotAssigned(_)) => {
                match self.col_type(col_ix)? {
                    ColType::Continuous { .. } => {
                        Hyper::Continuous(Default::default())
                    }
                    ColType::Categorical { k, .. } => Hyper::Categorical(
                        crosscat_stats::CategoricalHyper::uniform(*k),
                    ),
                }
            }
            Err(err) => return Err(err),
        };
        let ftr = ColModel::new(col_ix, data, hyper);
        self.check_feature(&ftr)?;
        Ok(ftr)
    }

    /// Look up a view by its position in creation order
    pub fn get_view(&self, view_ix: usize) -> Result<ViewId, StateError> {
        self.views.keys().nth(view_ix).copied().ok_or(
            StateError::ViewIndexOutOfBounds {
                n_views: self.n_views(),
                view_ix,
            },
        )
    }

    pub fn view(&self, id: ViewId) -> Result<&View, StateError> {
        self.views.get(&id).ok_or(StateError::UnknownView(id))
    }

    /// Create a new, empty view. Its row alpha is drawn uniformly from the
    /// row alpha grid and its row partition from the CRP with that alpha.
    ///
    /// The partition's log probability is added to `data_score`.
    pub fn get_new_view(&mut self) -> ViewId {
        let prior_process = self.draw_singleton_process();
        self.add_view(prior_process)
    }

    /// Remove view `id` if it owns no columns, subtracting its partition's
    /// log probability from `data_score`. Returns the removed view.
    pub fn remove_if_empty(
        &mut self,
        id: ViewId,
    ) -> Result<Option<View>, StateError> {
        let is_empty = self
            .views
            .get(&id)
            .map(View::is_empty)
            .ok_or(StateError::UnknownView(id))?;

        if !is_empty {
            return Ok(None);
        }

        let dropped = self.views.remove(&id);
        if let Some(view) = dropped.as_ref() {
            self.data_score -= view.crp_score();
            debug!("dropped empty {id}");
        }
        Ok(dropped)
    }

    /// Add `ftr` to view `view_id`
    ///
    /// Returns the change in the state's marginal log probability: the
    /// sequential column CRP term plus the feature's log marginal likelihood
    /// under the view's row partition.
    pub fn insert_feature(
        &mut self,
        ftr: ColModel,
        view_id: ViewId,
    ) -> Result<f64, StateError> {
        self.check_feature(&ftr)?;
        let col_ix = ftr.id();
        if self.view_lookup.contains_key(&col_ix) {
            return Err(StateError::ColumnAlreadyAssigned(col_ix));
        }

        let n_others = self.view_lookup.len();
        let view = self
            .views
            .get_mut(&view_id)
            .ok_or(StateError::UnknownView(view_id))?;
        let crp_delta =
            ln_crp_seat(self.column_crp_alpha, view.n_cols(), n_others);
        let data_delta = view.insert_feature(ftr)?;

        self.view_lookup.insert(col_ix, view_id);
        self.column_crp_score += crp_delta;
        self.data_score += data_delta;

        trace!("inserted column {col_ix} into {view_id}");
        Ok(crp_delta + data_delta)
    }

    /// Take column `col_ix` out of its view, dropping the view if that left
    /// it empty. Exactly undoes `insert_feature` when no view is dropped.
    pub fn remove_feature(
        &mut self,
        col_ix: usize,
    ) -> Result<RemovedFeature, StateError> {
        let view_id = self.view_of(col_ix)?;
        let view = self
            .views
            .get_mut(&view_id)
            .ok_or(StateError::UnknownView(view_id))?;
        let (ftr, data_delta) = view.remove_feature(col_ix)?;
        let n_v = view.n_cols();

        self.view_lookup.remove(&col_ix);
        let crp_delta =
            -ln_crp_seat(self.column_crp_alpha, n_v, self.view_lookup.len());
        self.column_crp_score += crp_delta;
        self.data_score += data_delta;

        let dropped_view = self.remove_if_empty(view_id)?;
        let view_delta = dropped_view.as_ref().map_or(0.0, |v| -v.crp_score());

        Ok(RemovedFeature {
            ftr,
            view: view_id,
            dropped_view,
            delta: crp_delta + data_delta + view_delta,
        })
    }

    /// Log weight of sending `ftr` to view `view_id`, split into the column
    /// CRP term and the feature's log marginal likelihood under the view's
    /// row partition. If `ftr` is already assigned, its own membership is
    /// left out of the counts. Does not modify the state.
    pub fn calc_feature_view_predictive_logp(
        &self,
        ftr: &ColModel,
        view_id: ViewId,
    ) -> Result<(f64, f64), StateError> {
        self.check_feature(ftr)?;
        let view = self.view(view_id)?;
        let owner = self.view_lookup.get(&ftr.id()).copied();
        let n_others = self.view_lookup.len() - usize::from(owner.is_some());
        let n_v = view.n_cols() - usize::from(owner == Some(view_id));

        let crp = ln_crp_seat(self.column_crp_alpha, n_v, n_others);
        Ok((crp, view.predictive_logp(ftr)))
    }

    /// Log weights of sending `ftr` to each existing view, in view order,
    /// followed by the weight of a new view partitioned like `singleton`.
    /// Does not modify the state.
    pub fn calc_feature_view_predictive_logps(
        &self,
        ftr: &ColModel,
        singleton: &PriorProcess,
    ) -> Result<Vec<f64>, StateError> {
        self.check_feature(ftr)?;
        self.check_singleton(singleton)?;
        let (_, logps) = self.candidate_logps(ftr, singleton);
        Ok(logps)
    }

    /// Insert an unassigned `ftr` into an existing view or into a new view
    /// partitioned like `singleton`, drawn in proportion to the candidates'
    /// weights. Returns the change in the state's marginal log probability.
    pub fn sample_insert_feature(
        &mut self,
        ftr: ColModel,
        singleton: PriorProcess,
    ) -> Result<f64, StateError> {
        self.check_feature(&ftr)?;
        self.check_singleton(&singleton)?;
        let col_ix = ftr.id();
        if self.view_lookup.contains_key(&col_ix) {
            return Err(StateError::ColumnAlreadyAssigned(col_ix));
        }

        let (candidates, logps) = self.candidate_logps(&ftr, &singleton);
        let ix = ln_pflip(&logps, &mut self.rng);

        match candidates[ix] {
            ViewCandidate::Existing(view_id) => {
                self.insert_feature(ftr, view_id)
            }
            ViewCandidate::NewView => {
                let view_delta = singleton.ln_f_partition();
                let view_id = self.add_view(singleton);
                debug!("column {col_ix} opened {view_id}");
                Ok(view_delta + self.insert_feature(ftr, view_id)?)
            }
        }
    }

    /// Gibbs step for one column: remove it, then reinsert it into an
    /// existing view or a new one. If removal emptied the column's view, the
    /// emptied view's row partition and alpha are used for the new-view
    /// candidate.
    pub fn transition_feature(
        &mut self,
        col_ix: usize,
    ) -> Result<f64, StateError> {
        let removed = self.remove_feature(col_ix)?;
        let singleton = match removed.dropped_view {
            Some(view) => view.prior_process,
            None => self.draw_singleton_process(),
        };
        let insert_delta = self.sample_insert_feature(removed.ftr, singleton)?;

        if let Ok(view_id) = self.view_of(col_ix) {
            if view_id != removed.view {
                debug!("column {col_ix} moved from {} to {view_id}", removed.view);
            }
        }
        Ok(removed.delta + insert_delta)
    }

    /// Gibbs step for each column in `which_cols`, in order. An empty slice
    /// means every column, in random order.
    pub fn transition_features(
        &mut self,
        which_cols: &[usize],
    ) -> Result<f64, StateError> {
        let col_ixs = self.select_cols(which_cols)?;
        col_ixs.iter().try_fold(0.0, |acc, &col_ix| {
            Ok(acc + self.transition_feature(col_ix)?)
        })
    }

    /// Grid-sample the column CRP alpha
    pub fn transition_column_crp_alpha(&mut self) -> f64 {
        let logps = self.calc_column_crp_marginals(&self.grids.column_crp_alpha);
        let ix = ln_pflip(&logps, &mut self.rng);
        let delta = logps[ix] - self.column_crp_score;

        self.column_crp_alpha = self.grids.column_crp_alpha[ix];
        self.column_crp_score = logps[ix];
        delta
    }

    /// Grid-sample the row CRP alpha of every view that owns a column in
    /// `which_cols`. An empty slice means every view.
    pub fn transition_row_partition_hyperparameters(
        &mut self,
        which_cols: &[usize],
    ) -> Result<f64, StateError> {
        let view_ids: BTreeSet<ViewId> = if which_cols.is_empty() {
            self.views.keys().copied().collect()
        } else {
            which_cols
                .iter()
                .map(|&col_ix| self.view_of(col_ix))
                .collect::<Result<_, _>>()?
        };

        let mut delta = 0.0;
        for view_id in view_ids {
            let view = self
                .views
                .get_mut(&view_id)
                .ok_or(StateError::UnknownView(view_id))?;
            delta += view.update_alpha(&self.grids.row_crp_alpha, &mut self.rng);
        }
        self.data_score += delta;
        Ok(delta)
    }

    /// Grid-sample the hyperparameters of each column in `which_cols`. An
    /// empty slice means every column.
    pub fn transition_column_hyperparameters(
        &mut self,
        which_cols: &[usize],
    ) -> Result<f64, StateError> {
        let col_ixs = self.select_cols(which_cols)?;

        let mut delta = 0.0;
        for col_ix in col_ixs {
            let view_id = self.view_of(col_ix)?;
            let grids = self.grids.column(col_ix);
            let ftr = self
                .views
                .get_mut(&view_id)
                .and_then(|view| view.ftrs.get_mut(&col_ix))
                .ok_or(StateError::ColumnNotAssigned(col_ix))?;
            let ftr_delta = ftr.update_hypers(&grids, &mut self.rng);
            self.data_score += ftr_delta;
            delta += ftr_delta;
        }
        Ok(delta)
    }

    /// Gibbs-reassign the rows in `which_rows` within every view. An empty
    /// slice means every row, in a fresh random order for each view.
    pub fn transition_row_partition_assignments(
        &mut self,
        which_rows: &[usize],
    ) -> Result<f64, StateError> {
        if let Some(&row_ix) =
            which_rows.iter().find(|&&row_ix| row_ix >= self.n_rows)
        {
            return Err(StateError::RowIndexOutOfBounds {
                n_rows: self.n_rows,
                row_ix,
            });
        }

        let mut delta = 0.0;
        for view in self.views.values_mut() {
            let view_delta = if which_rows.is_empty() {
                let mut row_ixs: Vec<usize> = (0..self.n_rows).collect();
                row_ixs.shuffle(&mut self.rng);
                view.reassign_rows_gibbs(&row_ixs, &mut self.rng)?
            } else {
                view.reassign_rows_gibbs(which_rows, &mut self.rng)?
            };
            self.data_score += view_delta;
            delta += view_delta;
        }
        Ok(delta)
    }

    /// Run each transition once, in order, over every column, view, and
    /// row. Returns the total change in the marginal log probability.
    pub fn step(
        &mut self,
        transitions: &[StateTransition],
    ) -> Result<f64, StateError> {
        transitions.iter().try_fold(0.0, |acc, transition| {
            let delta = match transition {
                StateTransition::ColumnAssignment => {
                    self.transition_features(&[])?
                }
                StateTransition::ColumnCrpAlpha => {
                    self.transition_column_crp_alpha()
                }
                StateTransition::RowAssignment => {
                    self.transition_row_partition_assignments(&[])?
                }
                StateTransition::RowCrpAlphas => {
                    self.transition_row_partition_hyperparameters(&[])?
                }
                StateTransition::ColumnHypers => {
                    self.transition_column_hyperparameters(&[])?
                }
            };
            trace!("{transition:?}: delta = {delta}");
            Ok(acc + delta)
        })
    }

    /// Run `config.n_iters` steps, recording diagnostics after each
    pub fn update(
        &mut self,
        config: &StateUpdateConfig,
    ) -> Result<(), StateError> {
        for iter in 0..config.n_iters {
            self.step(&config.transitions)?;
            self.push_diagnostics();
            debug!(
                "iter {iter}: marginal_logp = {}, n_views = {}",
                self.marginal_logp(),
                self.n_views()
            );
        }
        Ok(())
    }

    pub fn push_diagnostics(&mut self) {
        // Sort the number of categories in each view
        let n_cats = {
            let mut n_cats: Vec<usize> =
                self.views.values().map(View::n_cats).collect();
            n_cats.sort_unstable();
            n_cats
        };

        let n_views = n_cats.len();
        if n_views > 0 {
            let n_cats_median: f64 = if n_views % 2 == 0 {
                let split = n_views / 2;
                (n_cats[split - 1] + n_cats[split]) as f64 / 2.0
            } else {
                n_cats[n_views / 2] as f64
            };
            self.diagnostics.n_cats_min.push(n_cats[0]);
            self.diagnostics.n_cats_max.push(n_cats[n_views - 1]);
            self.diagnostics.n_cats_median.push(n_cats_median);
        }

        self.diagnostics.marginal_logp.push(self.marginal_logp());
        self.diagnostics.n_views.push(n_views);
        self.diagnostics
            .column_crp_alpha
            .push(self.column_crp_alpha);
    }

    /// Log predictive probability of a new row with one value per column.
    /// Missing values are `NaN`.
    pub fn calc_row_predictive_logp(
        &self,
        row: &[f64],
    ) -> Result<f64, StateError> {
        if row.len() != self.n_cols() {
            return Err(StateError::RowLengthMismatch {
                n_cols: self.n_cols(),
                len: row.len(),
            });
        }
        for (col_ix, &x) in row.iter().enumerate() {
            if x.is_nan() {
                continue;
            }
            let ftr = self.feature(col_ix)?;
            if !ftr.accepts(x) {
                return Err(StateError::UnsupportedValue {
                    col_ix,
                    value: x.to_string(),
                });
            }
            if let Hyper::Continuous(h) = ftr.hyper() {
                let scale = max_abs(ftr.data()).max(h.mu.abs()).max(x.abs());
                if !continuous_scale_fits(scale, self.n_rows + 1) {
                    return Err(StateError::ValueScaleOverflow { col_ix });
                }
            }
        }

        let logp = self
            .views
            .values()
            .map(|view| view.row_predictive_logp(row))
            .sum::<Result<f64, ViewError>>()?;
        Ok(logp)
    }

    /// Log CRP probability of the column partition at the current alpha
    pub fn calc_column_crp_marginal(&self) -> f64 {
        self.column_crp_marginal_at(self.column_crp_alpha)
    }

    /// Log CRP probability of the column partition at each of `alphas`
    pub fn calc_column_crp_marginals(&self, alphas: &[f64]) -> Vec<f64> {
        alphas
            .iter()
            .map(|&alpha| self.column_crp_marginal_at(alpha))
            .collect()
    }

    /// Recompute `column_crp_score + data_score` without using any cached
    /// scores or sufficient statistics
    pub fn calc_marginal_logp_from_scratch(&self) -> f64 {
        let data_score: f64 = self
            .views
            .values()
            .map(|view| {
                view.crp_score()
                    + view
                        .ftrs
                        .values()
                        .map(|ftr| ftr.asgn_score(view.asgn()))
                        .sum::<f64>()
            })
            .sum();
        self.calc_column_crp_marginal() + data_score
    }

    /// The column indices owned by each view, in view order
    pub fn column_groups(&self) -> Vec<Vec<usize>> {
        self.views
            .values()
            .map(|view| view.ftrs.keys().copied().collect())
            .collect()
    }

    /// Re-seed the state's generator
    pub fn seed_from_u64(&mut self, seed: u64) {
        self.rng = Xoshiro256Plus::seed_from_u64(seed);
    }

    /// A uniform draw from [0, 1) using the state's generator
    pub fn draw_rand_u(&mut self) -> f64 {
        self.rng.gen()
    }

    /// A uniform draw from `0..=max` using the state's generator
    pub fn draw_rand_i(&mut self, max: usize) -> usize {
        self.rng.gen_range(0..=max)
    }

    /// The row CRP of the view at `view_ix`
    pub fn row_partition_model_hypers(
        &self,
        view_ix: usize,
    ) -> Result<Crp, StateError> {
        let view_id = self.get_view(view_ix)?;
        Ok(self.view(view_id)?.prior_process.process)
    }

    /// The number of rows in each category of the view at `view_ix`
    pub fn row_partition_model_counts(
        &self,
        view_ix: usize,
    ) -> Result<Vec<usize>, StateError> {
        let view_id = self.get_view(view_ix)?;
        Ok(self.view(view_id)?.row_partition_sizes().to_vec())
    }

    /// The row category of every row, for each view in view order
    pub fn x_d(&self) -> Vec<Vec<usize>> {
        self.views
            .values()
            .map(|view| view.asgn().asgn.clone())
            .collect()
    }

    /// Per-category sufficient statistics of each column in the view at
    /// `view_ix`
    pub fn column_component_suffstats(
        &self,
        view_ix: usize,
    ) -> Result<BTreeMap<usize, ColumnSuffStats>, StateError> {
        let view_id = self.get_view(view_ix)?;
        Ok(self
            .view(view_id)?
            .ftrs
            .iter()
            .map(|(&col_ix, ftr)| (col_ix, ftr.suffstats()))
            .collect())
    }

    /// The hyperparameters of every column, in column order
    pub fn column_hypers(&self) -> Result<Vec<Hyper>, StateError> {
        (0..self.n_cols())
            .map(|col_ix| self.feature(col_ix).map(ColModel::hyper))
            .collect()
    }

    /// The column CRP
    pub fn column_partition_hypers(&self) -> Crp {
        Crp::new(self.column_crp_alpha)
    }

    /// The position, in view order, of the view owning each column
    pub fn column_partition_assignments(
        &self,
    ) -> Result<Vec<usize>, StateError> {
        let positions: BTreeMap<ViewId, usize> = self
            .views
            .keys()
            .enumerate()
            .map(|(ix, id)| (*id, ix))
            .collect();

        (0..self.n_cols())
            .map(|col_ix| {
                let view_id = self.view_of(col_ix)?;
                positions
                    .get(&view_id)
                    .copied()
                    .ok_or(StateError::UnknownView(view_id))
            })
            .collect()
    }

    /// The number of columns in each view, in view order
    pub fn column_partition_counts(&self) -> Vec<usize> {
        self.view_counts()
    }
}

// private state functions
impl State {
    fn add_view(&mut self, prior_process: PriorProcess) -> ViewId {
        let view = View::new(prior_process);
        let id = ViewId(self.next_view_id);
        self.next_view_id += 1;
        self.data_score += view.crp_score();
        self.views.insert(id, view);
        id
    }

    fn draw_singleton_process(&mut self) -> PriorProcess {
        let grid = &self.grids.row_crp_alpha;
        let alpha = grid[self.rng.gen_range(0..grid.len())];
        PriorProcess::from_process(Crp::new(alpha), self.n_rows, &mut self.rng)
    }

    fn column_crp_marginal_at(&self, alpha: f64) -> f64 {
        let counts: Vec<usize> = self
            .views
            .values()
            .map(View::n_cols)
            .filter(|&ct| ct > 0)
            .collect();
        lcrp(self.view_lookup.len(), &counts, alpha)
    }

    /// The candidates for `ftr` and their log weights. Existing views come
    /// first, in view order, and the new view is last.
    fn candidate_logps(
        &self,
        ftr: &ColModel,
        singleton: &PriorProcess,
    ) -> (Vec<ViewCandidate>, Vec<f64>) {
        let alpha = self.column_crp_alpha;
        let owner = self.view_lookup.get(&ftr.id()).copied();
        let n_others = self.view_lookup.len() - usize::from(owner.is_some());

        let (mut candidates, mut logps): (Vec<_>, Vec<_>) = self
            .views
            .iter()
            .map(|(&id, view)| {
                let n_v = view.n_cols() - usize::from(owner == Some(id));
                let logp = ln_crp_seat(alpha, n_v, n_others)
                    + view.predictive_logp(ftr);
                (ViewCandidate::Existing(id), logp)
            })
            .unzip();

        candidates.push(ViewCandidate::NewView);
        logps.push(
            ln_crp_seat(alpha, 0, n_others) + ftr.asgn_score(&singleton.asgn),
        );
        (candidates, logps)
    }

    /// Check that `ftr` could be a column of this state
    fn check_feature(&self, ftr: &ColModel) -> Result<(), StateError> {
        let col_ix = ftr.id();
        let col_type = self.col_type(col_ix)?;

        if ftr.len() != self.n_rows {
            return Err(StateError::ColumnLengthMismatch {
                col_ix,
                n_rows: self.n_rows,
                len: ftr.len(),
            });
        }

        let found = match ftr.hyper() {
            Hyper::Continuous(_) => ColType::continuous(),
            Hyper::Categorical(hyper) => ColType::categorical(hyper.k),
        };
        if found.ftype() != col_type.ftype()
            || found.cardinality() != col_type.cardinality()
        {
            return Err(StateError::FeatureTypeMismatch {
                col_ix,
                expected: describe(col_type),
                found: describe(&found),
            });
        }

        if let Some(x) = ftr.data().iter().find(|&&x| !ftr.accepts(x)) {
            return Err(StateError::UnsupportedValue {
                col_ix,
                value: x.to_string(),
            });
        }

        match ftr.hyper() {
            Hyper::Continuous(h)
                if !continuous_scale_fits(
                    max_abs(ftr.data()).max(h.mu.abs()),
                    self.n_rows,
                ) =>
            {
                Err(StateError::ValueScaleOverflow { col_ix })
            }
            _ => Ok(()),
        }
    }

    fn check_singleton(
        &self,
        singleton: &PriorProcess,
    ) -> Result<(), StateError> {
        if singleton.asgn.len() == self.n_rows {
            Ok(())
        } else {
            Err(StateError::PartitionLengthMismatch {
                n_rows: self.n_rows,
                len: singleton.asgn.len(),
            })
        }
    }

    fn select_cols(&mut self, which_cols: &[usize]) -> Result<Vec<usize>, StateError> {
        if which_cols.is_empty() {
            let mut col_ixs: Vec<usize> = (0..self.n_cols()).collect();
            col_ixs.shuffle(&mut self.rng);
            Ok(col_ixs)
        } else {
            match which_cols.iter().find(|&&ix| ix >= self.n_cols()) {
                Some(&col_ix) => Err(StateError::ColumnIndexOutOfBounds {
                    n_cols: self.n_cols(),
                    col_ix,
                }),
                None => Ok(which_cols.to_vec()),
            }
        }
    }
}

/// Log probability that a column joins a view holding `n_v` of the
/// `n_others` other assigned columns. `n_v = 0` seats it at a new view.
fn ln_crp_seat(alpha: f64, n_v: usize, n_others: usize) -> f64 {
    let numer = if n_v == 0 { alpha } else { n_v as f64 };
    numer.ln() - (n_others as f64 + alpha).ln()
}

fn describe(col_type: &ColType) -> String {
    match col_type {
        ColType::Continuous { .. } => String::from("continuous"),
        ColType::Categorical { k, .. } => format!("categorical(k={k})"),
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "State: {} rows, {} columns, {} views",
            self.n_rows,
            self.n_cols(),
            self.n_views()
        )?;
        writeln!(f, "  column crp alpha: {}", self.column_crp_alpha)?;
        writeln!(f, "  column crp score: {}", self.column_crp_score)?;
        writeln!(f, "  data score: {}", self.data_score)?;
        for (ix, (id, view)) in self.views.iter().enumerate() {
            let cols: Vec<usize> = view.ftrs.keys().copied().collect();
            writeln!(
                f,
                "  {ix} ({id}): columns {cols:?}, alpha {}, row counts {:?}",
                view.alpha(),
                view.row_partition_sizes()
            )?;
        }
        Ok(())
    }
}
