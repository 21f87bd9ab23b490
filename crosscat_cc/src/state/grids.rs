use std::collections::BTreeMap;

use crosscat_stats::SuffStat;
use crosscat_stats::{ContinuousHyper, ContinuousSuffStat};
use crosscat_utils::{linspace, log_linspace, MinMax};
use serde::{Deserialize, Serialize};

use crate::feature::{ColType, ColumnHyperGrids};

/// The default number of points in every hyperparameter grid
pub const DEFAULT_N_GRID: usize = 31;

/// Candidate values for every hyperparameter, fixed when the state is built
///
/// Grids are ascending. The `s` and `mu` grids are scaled to each
/// continuous column's data, so they are keyed by column index.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HyperGrids {
    pub column_crp_alpha: Vec<f64>,
    pub row_crp_alpha: Vec<f64>,
    pub r: Vec<f64>,
    pub nu: Vec<f64>,
    pub dirichlet_alpha: Vec<f64>,
    pub s: BTreeMap<usize, Vec<f64>>,
    pub mu: BTreeMap<usize, Vec<f64>>,
}

impl HyperGrids {
    /// Build the grids for `columns`, all of which must have `n_rows`
    /// entries. `n_grid` must be at least 2.
    pub fn new(
        n_grid: usize,
        n_rows: usize,
        columns: &[Vec<f64>],
        col_types: &[ColType],
    ) -> Self {
        let mut grids = Self::unscaled(n_grid, n_rows, columns.len());
        columns
            .iter()
            .zip(col_types.iter())
            .enumerate()
            .filter(|(_, (_, col_type))| {
                matches!(col_type, ColType::Continuous { .. })
            })
            .for_each(|(col_ix, (xs, _))| {
                let (s_grid, mu_grid) = continuous_grids(xs, n_grid);
                grids.s.insert(col_ix, s_grid);
                grids.mu.insert(col_ix, mu_grid);
            });
        grids
    }

    /// Grids that do not depend on any data. Continuous columns get `s` on
    /// [0.5, 2] and `mu` on [-1, 1], which suits data on roughly unit scale.
    pub fn unit_scale(
        n_grid: usize,
        n_rows: usize,
        col_types: &[ColType],
    ) -> Self {
        let mut grids = Self::unscaled(n_grid, n_rows, col_types.len());
        col_types
            .iter()
            .enumerate()
            .filter(|(_, col_type)| matches!(col_type, ColType::Continuous { .. }))
            .for_each(|(col_ix, _)| {
                grids.s.insert(col_ix, log_linspace(0.5, 2.0, n_grid));
                grids.mu.insert(col_ix, linspace(-1.0, 1.0, n_grid));
            });
        grids
    }

    /// The grids shared by every column, with no `s` or `mu` grids yet
    fn unscaled(n_grid: usize, n_rows: usize, n_cols: usize) -> Self {
        let n_cols = n_cols.max(1) as f64;
        let n_rows = n_rows.max(1) as f64;
        Self {
            column_crp_alpha: log_linspace(1.0 / n_cols, n_cols, n_grid),
            row_crp_alpha: log_linspace(1.0 / n_rows, n_rows, n_grid),
            r: log_linspace(1.0 / n_rows, n_rows, n_grid),
            nu: log_linspace(1.0, n_rows, n_grid),
            dirichlet_alpha: log_linspace(1.0 / n_rows, n_rows, n_grid),
            s: BTreeMap::new(),
            mu: BTreeMap::new(),
        }
    }

    /// The name of the first grid that is empty or holds a value its
    /// hyperparameter cannot take, if any. Each continuous column in
    /// `col_types` needs its own `s` and `mu` grids.
    pub fn find_invalid(&self, col_types: &[ColType]) -> Option<String> {
        let positive = |grid: &[f64]| {
            !grid.is_empty() && grid.iter().all(|&x| x > 0.0 && x.is_finite())
        };
        let shared = [
            ("column_crp_alpha", &self.column_crp_alpha),
            ("row_crp_alpha", &self.row_crp_alpha),
            ("r", &self.r),
            ("nu", &self.nu),
            ("dirichlet_alpha", &self.dirichlet_alpha),
        ];
        if let Some((name, _)) = shared.iter().find(|(_, grid)| !positive(grid)) {
            return Some(String::from(*name));
        }

        col_types
            .iter()
            .enumerate()
            .filter(|(_, col_type)| matches!(col_type, ColType::Continuous { .. }))
            .find_map(|(col_ix, _)| {
                let s_ok = self.s.get(&col_ix).map_or(false, |s| positive(s));
                let mu_ok = self.mu.get(&col_ix).map_or(false, |mu| {
                    !mu.is_empty() && mu.iter().all(|x| x.is_finite())
                });
                if !s_ok {
                    Some(format!("s[{col_ix}]"))
                } else if !mu_ok {
                    Some(format!("mu[{col_ix}]"))
                } else {
                    None
                }
            })
    }

    /// The grids for the hyperparameters of column `col_ix`. Categorical
    /// columns get empty `s` and `mu` grids.
    pub fn column(&self, col_ix: usize) -> ColumnHyperGrids<'_> {
        ColumnHyperGrids {
            r: &self.r,
            nu: &self.nu,
            s: self.s.get(&col_ix).map_or(&[][..], Vec::as_slice),
            mu: self.mu.get(&col_ix).map_or(&[][..], Vec::as_slice),
            dirichlet_alpha: &self.dirichlet_alpha,
        }
    }
}

/// The `s` and `mu` grids for one continuous column
fn continuous_grids(xs: &[f64], n_grid: usize) -> (Vec<f64>, Vec<f64>) {
    let defaults = ContinuousHyper::default();
    let mut stat = ContinuousSuffStat::new();
    xs.iter()
        .filter(|x| !x.is_nan())
        .for_each(|&x| stat.observe(x));

    let ssd = stat.ssd();
    let ssd = if ssd > 0.0 && ssd.is_finite() {
        ssd
    } else {
        defaults.s
    };
    let s_grid = log_linspace(ssd / 100.0, ssd, n_grid);

    let mu_grid = match xs.iter().filter(|x| !x.is_nan()).minmax() {
        Some((&min, &max)) if min < max => linspace(min, max, n_grid),
        _ => linspace(defaults.mu - 1.0, defaults.mu + 1.0, n_grid),
    };

    (s_grid, mu_grid)
}
