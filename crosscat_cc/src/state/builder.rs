use crosscat_stats::{
    Assignment, AssignmentError, CategoricalHyper, ContinuousHyper, Crp,
    PriorProcess,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{HyperGrids, State, DEFAULT_N_GRID};
use crate::error::StateError;
use crate::feature::{
    continuous_scale_fits, max_abs, ColModel, ColType, Hyper,
};

/// How to build a partition that was not given explicitly
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InitPolicy {
    /// Draw from the CRP
    #[default]
    FromThePrior,
    /// Everything in one group
    Together,
    /// Everything in its own group
    Apart,
}

impl InitPolicy {
    fn draw<R: Rng>(self, n: usize, alpha: f64, rng: &mut R) -> Assignment {
        match self {
            Self::FromThePrior => Crp::new(alpha).draw_assignment(n, rng),
            Self::Together => PriorProcess::flat(Crp::new(alpha), n).asgn,
            Self::Apart => Assignment {
                asgn: (0..n).collect(),
                counts: vec![1; n],
                n_cats: n,
            },
        }
    }
}

/// Builds a `State`
///
/// Anything not given explicitly is filled in: partitions by their
/// `InitPolicy`, alphas uniformly from their grids, and hypers either from
/// the defaults or, with `hypers_from_prior`, uniformly from the grids.
#[derive(Clone, Debug, Default)]
pub struct Builder {
    columns: Vec<Vec<f64>>,
    col_types: Vec<ColType>,
    col_asgn: Option<Vec<usize>>,
    col_init: InitPolicy,
    row_asgns: Option<Vec<Vec<usize>>>,
    row_alphas: Option<Vec<f64>>,
    row_init: InitPolicy,
    column_crp_alpha: Option<f64>,
    hypers_from_prior: bool,
    n_grid: Option<usize>,
    grids: Option<HyperGrids>,
    seed: Option<u64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum BuildStateError {
    #[error("the state must have at least one column")]
    NoColumns,
    #[error("the state must have at least one row")]
    NoRows,
    #[error("column {col_ix} has {len} rows, but column 0 has {n_rows}")]
    RaggedColumns {
        col_ix: usize,
        n_rows: usize,
        len: usize,
    },
    #[error("{n_types} column types were given for {n_cols} columns")]
    ColumnTypesLengthMismatch { n_cols: usize, n_types: usize },
    #[error("grids need at least 2 points, but {0} was given")]
    NGridTooSmall(usize),
    #[error("the {0} grid is empty or holds an invalid value")]
    InvalidGrid(String),
    #[error("CRP alpha must be positive and finite, but is {0}")]
    NonPositiveAlpha(f64),
    #[error("column partition has {len} entries for {n_cols} columns")]
    ColumnPartitionLength { n_cols: usize, len: usize },
    #[error("invalid column partition: {0}")]
    InvalidColumnPartition(AssignmentError),
    #[error("{n_partitions} row partitions were given for {n_views} views")]
    RowPartitionCount { n_views: usize, n_partitions: usize },
    #[error("row partition {view_ix} has {len} entries for {n_rows} rows")]
    RowPartitionLength {
        view_ix: usize,
        n_rows: usize,
        len: usize,
    },
    #[error("invalid row partition for view {view_ix}: {source}")]
    InvalidRowPartition {
        view_ix: usize,
        source: AssignmentError,
    },
    #[error("row partitions were given without a column partition")]
    RowPartitionsWithoutColumnPartition,
    #[error("{n_alphas} row alphas were given for {n_views} views")]
    RowAlphaCount { n_views: usize, n_alphas: usize },
    #[error("categorical column {col_ix} must have at least one category")]
    ZeroCategories { col_ix: usize },
    #[error(
        "column {col_ix} holds {value}, which is not a category in 0..{k}"
    )]
    CategoryOutOfRange { col_ix: usize, value: f64, k: usize },
    #[error("continuous column {col_ix} holds the non-finite value {value}")]
    NonFiniteValue { col_ix: usize, value: f64 },
    #[error(
        "continuous column {col_ix} holds values too large in magnitude to \
        score without overflow"
    )]
    ValueScaleOverflow { col_ix: usize },
    #[error("column {col_ix} has invalid hyperparameters")]
    InvalidHyper { col_ix: usize },
    #[error("the hyperparameters of column {col_ix} do not match its type")]
    HyperTypeMismatch { col_ix: usize },
    #[error("failed to insert a column: {0}")]
    State(#[from] StateError),
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column of data. Missing values are `NaN`.
    #[must_use]
    pub fn column(mut self, data: Vec<f64>, col_type: ColType) -> Self {
        self.columns.push(data);
        self.col_types.push(col_type);
        self
    }

    /// Add many columns at once
    #[must_use]
    pub fn columns(
        mut self,
        columns: Vec<Vec<f64>>,
        col_types: Vec<ColType>,
    ) -> Self {
        self.columns.extend(columns);
        self.col_types.extend(col_types);
        self
    }

    /// Assign each column to a view. Views are numbered `0..n_views`.
    #[must_use]
    pub fn column_partition(mut self, col_asgn: Vec<usize>) -> Self {
        self.col_asgn = Some(col_asgn);
        self
    }

    /// How to partition the columns when no partition is given
    #[must_use]
    pub fn column_init(mut self, policy: InitPolicy) -> Self {
        self.col_init = policy;
        self
    }

    /// One row partition per view of the column partition
    #[must_use]
    pub fn row_partitions(mut self, row_asgns: Vec<Vec<usize>>) -> Self {
        self.row_asgns = Some(row_asgns);
        self
    }

    /// How to partition the rows of each view when no partitions are given
    #[must_use]
    pub fn row_init(mut self, policy: InitPolicy) -> Self {
        self.row_init = policy;
        self
    }

    /// One row CRP alpha per view of the column partition
    #[must_use]
    pub fn row_alphas(mut self, alphas: Vec<f64>) -> Self {
        self.row_alphas = Some(alphas);
        self
    }

    #[must_use]
    pub fn column_crp_alpha(mut self, alpha: f64) -> Self {
        self.column_crp_alpha = Some(alpha);
        self
    }

    /// Draw hypers not given in the column types uniformly from the grids
    /// instead of using the defaults
    #[must_use]
    pub fn hypers_from_prior(mut self) -> Self {
        self.hypers_from_prior = true;
        self
    }

    /// The number of points in each hyperparameter grid
    #[must_use]
    pub fn n_grid(mut self, n_grid: usize) -> Self {
        self.n_grid = Some(n_grid);
        self
    }

    /// Use these grids instead of building them from the data
    #[must_use]
    pub fn grids(mut self, grids: HyperGrids) -> Self {
        self.grids = Some(grids);
        self
    }

    /// Set the RNG seed
    #[must_use]
    pub fn seed_from_u64(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the RNG seed from another RNG
    #[must_use]
    pub fn seed_from_rng<R: Rng>(mut self, rng: &mut R) -> Self {
        self.seed = Some(rng.next_u64());
        self
    }

    /// Build the `State`
    pub fn build(self) -> Result<State, BuildStateError> {
        let n_cols = self.columns.len();
        if n_cols == 0 {
            return Err(BuildStateError::NoColumns);
        }
        if self.col_types.len() != n_cols {
            return Err(BuildStateError::ColumnTypesLengthMismatch {
                n_cols,
                n_types: self.col_types.len(),
            });
        }
        let n_rows = self.columns[0].len();
        if n_rows == 0 {
            return Err(BuildStateError::NoRows);
        }
        if let Some((col_ix, col)) = self
            .columns
            .iter()
            .enumerate()
            .find(|(_, col)| col.len() != n_rows)
        {
            return Err(BuildStateError::RaggedColumns {
                col_ix,
                n_rows,
                len: col.len(),
            });
        }

        let n_grid = self.n_grid.unwrap_or(DEFAULT_N_GRID);
        if n_grid <= 1 {
            return Err(BuildStateError::NGridTooSmall(n_grid));
        }

        if let Some(alpha) = self.column_crp_alpha {
            validate_alpha(alpha)?;
        }
        if let Some(alphas) = self.row_alphas.as_ref() {
            alphas.iter().try_for_each(|&alpha| validate_alpha(alpha))?;
        }
        if self.row_asgns.is_some() && self.col_asgn.is_none() {
            return Err(BuildStateError::RowPartitionsWithoutColumnPartition);
        }

        self.columns
            .iter()
            .zip(self.col_types.iter())
            .enumerate()
            .try_for_each(|(col_ix, (data, col_type))| {
                validate_column(col_ix, data, col_type)
            })?;

        let mut rng = match self.seed {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };

        let grids = match self.grids {
            Some(grids) => match grids.find_invalid(&self.col_types) {
                Some(name) => return Err(BuildStateError::InvalidGrid(name)),
                None => grids,
            },
            None => {
                HyperGrids::new(n_grid, n_rows, &self.columns, &self.col_types)
            }
        };

        let column_crp_alpha = match self.column_crp_alpha {
            Some(alpha) => alpha,
            None => draw_from(&grids.column_crp_alpha, &mut rng),
        };

        let col_asgn = match self.col_asgn {
            Some(col_asgn) if col_asgn.len() != n_cols => {
                return Err(BuildStateError::ColumnPartitionLength {
                    n_cols,
                    len: col_asgn.len(),
                })
            }
            Some(col_asgn) => Assignment::from_vec(col_asgn)
                .map_err(BuildStateError::InvalidColumnPartition)?,
            None => self.col_init.draw(n_cols, column_crp_alpha, &mut rng),
        };
        let n_views = col_asgn.n_cats;

        let hypers: Vec<Hyper> = self
            .col_types
            .iter()
            .enumerate()
            .map(|(col_ix, col_type)| {
                let grids = grids.column(col_ix);
                match col_type {
                    ColType::Continuous { hyper: Some(hyper) } => {
                        Hyper::Continuous(*hyper)
                    }
                    ColType::Continuous { hyper: None } => {
                        Hyper::Continuous(if self.hypers_from_prior {
                            grids.draw_continuous(&mut rng)
                        } else {
                            ContinuousHyper::default()
                        })
                    }
                    ColType::Categorical {
                        hyper: Some(hyper), ..
                    } => Hyper::Categorical(*hyper),
                    ColType::Categorical { k, hyper: None } => {
                        Hyper::Categorical(if self.hypers_from_prior {
                            grids.draw_categorical(*k, &mut rng)
                        } else {
                            CategoricalHyper::uniform(*k)
                        })
                    }
                }
            })
            .collect();

        let row_alphas = match self.row_alphas {
            Some(alphas) if alphas.len() != n_views => {
                return Err(BuildStateError::RowAlphaCount {
                    n_views,
                    n_alphas: alphas.len(),
                })
            }
            Some(alphas) => alphas,
            None => (0..n_views)
                .map(|_| draw_from(&grids.row_crp_alpha, &mut rng))
                .collect(),
        };

        let row_asgns: Vec<Assignment> = match self.row_asgns {
            Some(row_asgns) if row_asgns.len() != n_views => {
                return Err(BuildStateError::RowPartitionCount {
                    n_views,
                    n_partitions: row_asgns.len(),
                })
            }
            Some(row_asgns) => row_asgns
                .into_iter()
                .enumerate()
                .map(|(view_ix, asgn)| {
                    if asgn.len() != n_rows {
                        return Err(BuildStateError::RowPartitionLength {
                            view_ix,
                            n_rows,
                            len: asgn.len(),
                        });
                    }
                    Assignment::from_vec(asgn).map_err(|source| {
                        BuildStateError::InvalidRowPartition { view_ix, source }
                    })
                })
                .collect::<Result<_, _>>()?,
            None => row_alphas
                .iter()
                .map(|&alpha| self.row_init.draw(n_rows, alpha, &mut rng))
                .collect(),
        };

        let mut state = State::empty(
            n_rows,
            self.col_types,
            grids,
            column_crp_alpha,
            rng,
        );

        let view_ids: Vec<_> = row_alphas
            .iter()
            .zip(row_asgns)
            .map(|(&alpha, asgn)| {
                state.add_view(PriorProcess {
                    process: Crp::new(alpha),
                    asgn,
                })
            })
            .collect();

        for (col_ix, (data, hyper)) in
            self.columns.into_iter().zip(hypers).enumerate()
        {
            let ftr = ColModel::new(col_ix, data, hyper);
            state.insert_feature(ftr, view_ids[col_asgn.asgn[col_ix]])?;
        }

        Ok(state)
    }
}

fn draw_from<R: Rng>(grid: &[f64], rng: &mut R) -> f64 {
    grid[rng.gen_range(0..grid.len())]
}

fn validate_alpha(alpha: f64) -> Result<(), BuildStateError> {
    if alpha > 0.0 && alpha.is_finite() {
        Ok(())
    } else {
        Err(BuildStateError::NonPositiveAlpha(alpha))
    }
}

fn positive(x: f64) -> bool {
    x > 0.0 && x.is_finite()
}

fn validate_column(
    col_ix: usize,
    data: &[f64],
    col_type: &ColType,
) -> Result<(), BuildStateError> {
    match col_type {
        ColType::Continuous { hyper } => {
            if let Some(h) = hyper {
                if !(positive(h.r)
                    && positive(h.nu)
                    && positive(h.s)
                    && h.mu.is_finite())
                {
                    return Err(BuildStateError::InvalidHyper { col_ix });
                }
            }
            if let Some(&value) = data.iter().find(|x| x.is_infinite()) {
                return Err(BuildStateError::NonFiniteValue { col_ix, value });
            }
            let mu = hyper.map_or(0.0, |h| h.mu.abs());
            if continuous_scale_fits(max_abs(data).max(mu), data.len()) {
                Ok(())
            } else {
                Err(BuildStateError::ValueScaleOverflow { col_ix })
            }
        }
        ColType::Categorical { k, hyper } => {
            if *k == 0 {
                return Err(BuildStateError::ZeroCategories { col_ix });
            }
            if let Some(h) = hyper {
                if h.k != *k {
                    return Err(BuildStateError::HyperTypeMismatch { col_ix });
                }
                if !positive(h.dirichlet_alpha) {
                    return Err(BuildStateError::InvalidHyper { col_ix });
                }
            }
            let out_of_range = data.iter().find(|&&x| {
                !x.is_nan()
                    && (x < 0.0 || x.fract() != 0.0 || x >= *k as f64)
            });
            match out_of_range {
                Some(&value) => Err(BuildStateError::CategoryOutOfRange {
                    col_ix,
                    value,
                    k: *k,
                }),
                None => Ok(()),
            }
        }
    }
}
