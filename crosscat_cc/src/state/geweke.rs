//! Geweke tests of the state transitions
//!
//! A forward sampler draws states and data straight from the prior. A
//! successive-conditional sampler starts from one such draw and alternates
//! the MCMC transitions with redrawing the data given the structure. If the
//! transitions leave the posterior invariant, both samplers draw from the
//! same joint distribution, so summaries of their draws must agree.
use std::collections::BTreeMap;

use crosscat_stats::{Assignment, ContinuousHyper, Crp, PriorProcess};
use crosscat_utils::pflip;
use rand::Rng;
use rand_distr::{Distribution, Gamma, GammaError, Normal, NormalError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{BuildStateError, Builder, HyperGrids, InitPolicy, State};
use crate::error::StateError;
use crate::feature::{ColModel, ColType, Feature, Hyper};
use crate::transition::{StateTransition, DEFAULT_STATE_TRANSITIONS};
use crate::view::View;

const GEWEKE_N_GRID: usize = 5;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StateGewekeSettings {
    /// The number of rows in the state
    pub n_rows: usize,
    /// The type of each column
    pub col_types: Vec<ColType>,
    /// The number of points in each hyperparameter grid
    pub n_grid: usize,
    /// Which transitions to do
    pub transitions: Vec<StateTransition>,
}

impl StateGewekeSettings {
    pub fn new(n_rows: usize, col_types: Vec<ColType>) -> Self {
        Self {
            n_rows,
            col_types,
            n_grid: GEWEKE_N_GRID,
            transitions: DEFAULT_STATE_TRANSITIONS.into(),
        }
    }

    fn has_transition(&self, transition: StateTransition) -> bool {
        self.transitions.contains(&transition)
    }

    pub fn do_col_asgn_transition(&self) -> bool {
        self.has_transition(StateTransition::ColumnAssignment)
    }

    pub fn do_row_asgn_transition(&self) -> bool {
        self.has_transition(StateTransition::RowAssignment)
    }

    pub fn do_column_alpha_transition(&self) -> bool {
        self.has_transition(StateTransition::ColumnCrpAlpha)
    }

    pub fn do_row_alpha_transition(&self) -> bool {
        self.has_transition(StateTransition::RowCrpAlphas)
    }

    pub fn do_hyper_transition(&self) -> bool {
        self.has_transition(StateTransition::ColumnHypers)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GewekeError {
    #[error("failed to build a state from the prior: {0}")]
    BuildState(#[from] BuildStateError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("invalid precision prior: {0}")]
    Gamma(#[from] GammaError),
    #[error("invalid mean prior: {0}")]
    Normal(#[from] NormalError),
}

/// Summary of one column's draw
#[derive(Clone, Debug, PartialEq)]
pub enum GewekeColumnSummary {
    Continuous {
        col_ix: usize,
        /// Fraction of the values above zero
        positive_frac: f64,
        hyper: Option<ContinuousHyper>,
    },
    Categorical {
        col_ix: usize,
        /// Fraction of the values in category zero
        zero_frac: f64,
        dirichlet_alpha: Option<f64>,
    },
}

/// The State summary for Geweke. Quantities that a disabled transition
/// holds fixed are left out.
#[derive(Clone, Debug, PartialEq)]
pub struct GewekeStateSummary {
    /// The number of views
    pub n_views: Option<usize>,
    /// Column CRP alpha
    pub column_crp_alpha: Option<f64>,
    /// Mean of the views' row CRP alphas
    pub row_crp_alpha: Option<f64>,
    /// Mean number of categories per view
    pub n_cats: Option<f64>,
    pub columns: Vec<GewekeColumnSummary>,
}

impl From<&GewekeStateSummary> for BTreeMap<String, f64> {
    fn from(value: &GewekeStateSummary) -> Self {
        let mut map: BTreeMap<String, f64> = BTreeMap::new();

        if let Some(n_views) = value.n_views {
            map.insert("n views".into(), n_views as f64);
        }
        if let Some(alpha) = value.column_crp_alpha {
            map.insert("column crp alpha".into(), alpha);
        }
        if let Some(alpha) = value.row_crp_alpha {
            map.insert("mean row crp alpha".into(), alpha);
        }
        if let Some(n_cats) = value.n_cats {
            map.insert("mean n cats".into(), n_cats);
        }

        for column in &value.columns {
            match column {
                GewekeColumnSummary::Continuous {
                    col_ix,
                    positive_frac,
                    hyper,
                } => {
                    map.insert(format!("positive frac {col_ix}"), *positive_frac);
                    if let Some(h) = hyper {
                        map.insert(format!("r {col_ix}"), h.r);
                        map.insert(format!("nu {col_ix}"), h.nu);
                        map.insert(format!("s {col_ix}"), h.s);
                        map.insert(format!("mu {col_ix}"), h.mu);
                    }
                }
                GewekeColumnSummary::Categorical {
                    col_ix,
                    zero_frac,
                    dirichlet_alpha,
                } => {
                    map.insert(format!("zero frac {col_ix}"), *zero_frac);
                    if let Some(alpha) = dirichlet_alpha {
                        map.insert(format!("dirichlet alpha {col_ix}"), *alpha);
                    }
                }
            }
        }
        map
    }
}

impl From<GewekeStateSummary> for BTreeMap<String, f64> {
    fn from(value: GewekeStateSummary) -> Self {
        Self::from(&value)
    }
}

// Geweke only holds if every transition is on. With the row alpha
// transition off, say, the column Gibbs step still opens new views with an
// alpha drawn from the grid rather than fixed at 1.
impl State {
    /// Draw a state and its data from the prior. Partitions that no
    /// transition moves are flat, alphas that no transition moves are 1, and
    /// hypers that no transition moves are the defaults.
    pub fn geweke_from_prior<R: Rng>(
        settings: &StateGewekeSettings,
        rng: &mut R,
    ) -> Result<Self, GewekeError> {
        let n_rows = settings.n_rows;
        let grids = HyperGrids::unit_scale(
            settings.n_grid,
            n_rows,
            &settings.col_types,
        );
        let placeholder = vec![vec![0.0; n_rows]; settings.col_types.len()];

        let mut builder = Builder::new()
            .columns(placeholder, settings.col_types.clone())
            .grids(grids)
            .seed_from_rng(rng);
        if !settings.do_col_asgn_transition() {
            builder = builder.column_init(InitPolicy::Together);
        }
        if !settings.do_row_asgn_transition() {
            builder = builder.row_init(InitPolicy::Together);
        }
        if !settings.do_column_alpha_transition() {
            builder = builder.column_crp_alpha(1.0);
        }
        if settings.do_hyper_transition() {
            builder = builder.hypers_from_prior();
        }
        let mut state = builder.build()?;

        if !settings.do_row_alpha_transition() {
            let do_row_asgn = settings.do_row_asgn_transition();
            for view in state.views.values_mut() {
                view.prior_process = if do_row_asgn {
                    PriorProcess::from_process(Crp::new(1.0), n_rows, &mut state.rng)
                } else {
                    PriorProcess::flat(Crp::new(1.0), n_rows)
                };
            }
        }

        state.geweke_resample_data()?;
        Ok(state)
    }

    /// Redraw every column's data given its view's row partition and its
    /// hypers, then rescore the state
    pub fn geweke_resample_data(&mut self) -> Result<(), GewekeError> {
        let mut data_score = 0.0;
        for view in self.views.values_mut() {
            let View {
                ftrs,
                prior_process,
            } = view;
            data_score += prior_process.ln_f_partition();
            for ftr in ftrs.values_mut() {
                let data = draw_column_data(
                    ftr.hyper(),
                    &prior_process.asgn,
                    &mut self.rng,
                )?;
                replace_data(ftr, data);
                ftr.reassign(&prior_process.asgn);
                data_score += ftr.score();
            }
        }
        self.data_score = data_score;
        Ok(())
    }

    /// Run each of the settings' transitions once
    pub fn geweke_step(
        &mut self,
        settings: &StateGewekeSettings,
    ) -> Result<(), GewekeError> {
        self.step(&settings.transitions)?;
        Ok(())
    }

    pub fn geweke_summarize(
        &self,
        settings: &StateGewekeSettings,
    ) -> GewekeStateSummary {
        let n_views = self.n_views() as f64;
        let mean_over_views = |f: &dyn Fn(&View) -> f64| {
            self.views.values().map(f).sum::<f64>() / n_views
        };

        let columns = (0..self.n_cols())
            .filter_map(|col_ix| self.feature(col_ix).ok())
            .map(|ftr| {
                let data = ftr.data();
                let frac = |pred: &dyn Fn(f64) -> bool| {
                    data.iter().filter(|&&x| pred(x)).count() as f64
                        / data.len() as f64
                };
                match ftr.hyper() {
                    Hyper::Continuous(h) => GewekeColumnSummary::Continuous {
                        col_ix: ftr.id(),
                        positive_frac: frac(&|x| x > 0.0),
                        hyper: settings.do_hyper_transition().then_some(h),
                    },
                    Hyper::Categorical(h) => GewekeColumnSummary::Categorical {
                        col_ix: ftr.id(),
                        zero_frac: frac(&|x| x == 0.0),
                        dirichlet_alpha: settings
                            .do_hyper_transition()
                            .then_some(h.dirichlet_alpha),
                    },
                }
            })
            .collect();

        GewekeStateSummary {
            n_views: settings
                .do_col_asgn_transition()
                .then(|| self.n_views()),
            column_crp_alpha: settings
                .do_column_alpha_transition()
                .then_some(self.column_crp_alpha),
            row_crp_alpha: settings
                .do_row_alpha_transition()
                .then(|| mean_over_views(&|view| view.alpha())),
            n_cats: settings
                .do_row_asgn_transition()
                .then(|| mean_over_views(&|view| view.n_cats() as f64)),
            columns,
        }
    }
}

/// Summaries of forward and successive-conditional draws
#[derive(Clone, Debug, Default)]
pub struct GewekeResult {
    pub forward: Vec<BTreeMap<String, f64>>,
    pub posterior: Vec<BTreeMap<String, f64>>,
}

impl GewekeResult {
    /// For each statistic, the distance between its forward and posterior
    /// means in units of its forward standard deviation. A statistic that
    /// never varies in the forward draws gets the raw distance.
    pub fn standardized_mean_errors(&self) -> BTreeMap<String, f64> {
        let keys = self.forward.first().map(|summary| summary.keys());
        keys.into_iter()
            .flatten()
            .map(|key| {
                let fwd = values_of(&self.forward, key);
                let post = values_of(&self.posterior, key);
                let (fwd_mean, fwd_sd) = mean_and_sd(&fwd);
                let (post_mean, _) = mean_and_sd(&post);
                let dist = (fwd_mean - post_mean).abs();
                let err = if fwd_sd > 0.0 { dist / fwd_sd } else { dist };
                (key.clone(), err)
            })
            .collect()
    }
}

/// Draw `n_samples` forward summaries and `n_samples` successive-conditional
/// summaries, taking `lag` transition and resample rounds between the latter
pub fn run_geweke<R: Rng>(
    settings: &StateGewekeSettings,
    n_samples: usize,
    lag: usize,
    rng: &mut R,
) -> Result<GewekeResult, GewekeError> {
    let forward: Vec<BTreeMap<String, f64>> = (0..n_samples)
        .map(|_| {
            State::geweke_from_prior(settings, rng)
                .map(|state| state.geweke_summarize(settings).into())
        })
        .collect::<Result<_, _>>()?;

    let mut state = State::geweke_from_prior(settings, rng)?;
    let mut posterior: Vec<BTreeMap<String, f64>> =
        Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        for _ in 0..lag.max(1) {
            state.geweke_step(settings)?;
            state.geweke_resample_data()?;
        }
        posterior.push(state.geweke_summarize(settings).into());
    }

    Ok(GewekeResult { forward, posterior })
}

fn values_of(summaries: &[BTreeMap<String, f64>], key: &str) -> Vec<f64> {
    summaries
        .iter()
        .filter_map(|summary| summary.get(key).copied())
        .collect()
}

fn mean_and_sd(xs: &[f64]) -> (f64, f64) {
    if xs.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let var = xs.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn replace_data(ftr: &mut ColModel, data: Vec<f64>) {
    match ftr {
        ColModel::Continuous(col) => col.data = data,
        ColModel::Categorical(col) => col.data = data,
    }
}

/// Draw a column given the row partition. Continuous components draw their
/// mean and precision from the Normal-Gamma, and categorical values come
/// from the Dirichlet-multinomial urn of their category.
fn draw_column_data<R: Rng>(
    hyper: Hyper,
    asgn: &Assignment,
    rng: &mut R,
) -> Result<Vec<f64>, GewekeError> {
    match hyper {
        Hyper::Continuous(h) => {
            let components = (0..asgn.n_cats)
                .map(|_| draw_normal(&h, rng))
                .collect::<Result<Vec<Normal<f64>>, _>>()?;
            Ok(asgn
                .asgn
                .iter()
                .map(|&k| components[k].sample(rng))
                .collect())
        }
        Hyper::Categorical(h) => {
            let mut counts = vec![vec![0_usize; h.k]; asgn.n_cats];
            Ok(asgn
                .asgn
                .iter()
                .map(|&k| {
                    let weights: Vec<f64> = counts[k]
                        .iter()
                        .map(|&ct| h.dirichlet_alpha + ct as f64)
                        .collect();
                    let x = pflip(&weights, rng);
                    counts[k][x] += 1;
                    x as f64
                })
                .collect())
        }
    }
}

fn draw_normal<R: Rng>(
    hyper: &ContinuousHyper,
    rng: &mut R,
) -> Result<Normal<f64>, GewekeError> {
    let tau = Gamma::new(hyper.nu / 2.0, 2.0 / hyper.s)?.sample(rng);
    let mu = Normal::new(hyper.mu, (hyper.r * tau).recip().sqrt())?.sample(rng);
    Ok(Normal::new(mu, tau.recip().sqrt())?)
}
