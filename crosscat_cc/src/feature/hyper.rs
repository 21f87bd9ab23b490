//! Grid Gibbs updates of column hyperparameters
//!
//! Each hyperparameter is resampled in turn from its conditional given the
//! others. The conditional is evaluated at every point of a fixed grid and a
//! point is drawn in proportion to `exp(score)`, which puts a flat prior on
//! the grid.
use crosscat_stats::{CategoricalHyper, ConjugateModel, ContinuousHyper};
use crosscat_utils::ln_pflip;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{ColModel, Column};

/// Hyperparameters of either column type
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Hyper {
    Continuous(ContinuousHyper),
    Categorical(CategoricalHyper),
}

/// The grids a single column's hyperparameters are sampled on
#[derive(Clone, Copy, Debug)]
pub struct ColumnHyperGrids<'a> {
    pub r: &'a [f64],
    pub nu: &'a [f64],
    pub s: &'a [f64],
    pub mu: &'a [f64],
    pub dirichlet_alpha: &'a [f64],
}

impl ColumnHyperGrids<'_> {
    /// Draw continuous hypers uniformly from the grids
    pub fn draw_continuous<R: Rng>(&self, rng: &mut R) -> ContinuousHyper {
        ContinuousHyper {
            r: draw_from(self.r, rng),
            nu: draw_from(self.nu, rng),
            s: draw_from(self.s, rng),
            mu: draw_from(self.mu, rng),
        }
    }

    /// Draw categorical hypers uniformly from the grids
    pub fn draw_categorical<R: Rng>(
        &self,
        k: usize,
        rng: &mut R,
    ) -> CategoricalHyper {
        CategoricalHyper::new(k, draw_from(self.dirichlet_alpha, rng))
    }
}

fn draw_from<R: Rng>(grid: &[f64], rng: &mut R) -> f64 {
    grid[rng.gen_range(0..grid.len())]
}

impl<Pr: ConjugateModel> Column<Pr> {
    /// Resample one hyperparameter on `grid`. `set` writes a grid value into
    /// a copy of the hypers. Returns the change in the column score.
    fn gibbs_hyper<R, F>(&mut self, grid: &[f64], set: F, rng: &mut R) -> f64
    where
        R: Rng,
        F: Fn(&mut Pr, f64),
    {
        let score_before = self.score_with(&self.hyper);
        let logps: Vec<f64> = grid
            .iter()
            .map(|&value| {
                let mut hyper = self.hyper.clone();
                set(&mut hyper, value);
                self.score_with(&hyper)
            })
            .collect();

        let ix = ln_pflip(&logps, rng);
        set(&mut self.hyper, grid[ix]);
        logps[ix] - score_before
    }
}

impl ColModel {
    /// Gibbs-sample every hyperparameter of the column in turn, each on its
    /// grid. Continuous columns are updated in the order r, nu, s, mu.
    ///
    /// Returns the change in the column's log marginal likelihood.
    pub fn update_hypers<R: Rng>(
        &mut self,
        grids: &ColumnHyperGrids,
        rng: &mut R,
    ) -> f64 {
        match self {
            Self::Continuous(ftr) => {
                ftr.gibbs_hyper(grids.r, |h, r| h.r = r, rng)
                    + ftr.gibbs_hyper(grids.nu, |h, nu| h.nu = nu, rng)
                    + ftr.gibbs_hyper(grids.s, |h, s| h.s = s, rng)
                    + ftr.gibbs_hyper(grids.mu, |h, mu| h.mu = mu, rng)
            }
            Self::Categorical(ftr) => ftr.gibbs_hyper(
                grids.dirichlet_alpha,
                |h, alpha| h.dirichlet_alpha = alpha,
                rng,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Feature;
    use approx::*;
    use crosscat_stats::Assignment;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn update_hypers_delta_matches_rescore() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0x1234);
        let r = vec![0.25, 1.0, 4.0];
        let nu = vec![1.0, 2.0, 4.0];
        let s = vec![0.5, 2.0, 8.0];
        let mu = vec![-1.0, 0.0, 1.0];
        let alpha = vec![0.5, 1.0, 2.0];
        let grids = ColumnHyperGrids {
            r: &r,
            nu: &nu,
            s: &s,
            mu: &mu,
            dirichlet_alpha: &alpha,
        };

        let asgn = Assignment::from_vec(vec![0, 0, 1, 1, 1]).unwrap();
        let mut ftr = ColModel::new(
            0,
            vec![0.1, -0.4, 2.2, 1.9, f64::NAN],
            Hyper::Continuous(ContinuousHyper::default()),
        );
        ftr.reassign(&asgn);

        for _ in 0..20 {
            let before = ftr.score();
            let delta = ftr.update_hypers(&grids, &mut rng);
            assert_relative_eq!(ftr.score() - before, delta, epsilon = 1E-10);
            match ftr.hyper() {
                Hyper::Continuous(h) => {
                    assert!(r.contains(&h.r));
                    assert!(nu.contains(&h.nu));
                    assert!(s.contains(&h.s));
                    assert!(mu.contains(&h.mu));
                }
                Hyper::Categorical(_) => panic!("wrong hyper type"),
            }
        }
    }

    #[test]
    fn categorical_update_only_touches_alpha() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0x1234);
        let alpha = vec![0.5, 1.0, 2.0];
        let empty: Vec<f64> = Vec::new();
        let grids = ColumnHyperGrids {
            r: &empty,
            nu: &empty,
            s: &empty,
            mu: &empty,
            dirichlet_alpha: &alpha,
        };
        let asgn = Assignment::from_vec(vec![0, 1, 0]).unwrap();
        let mut ftr = ColModel::new(
            0,
            vec![2.0, 0.0, 2.0],
            Hyper::Categorical(CategoricalHyper::uniform(3)),
        );
        ftr.reassign(&asgn);

        let before = ftr.score();
        let delta = ftr.update_hypers(&grids, &mut rng);
        assert_relative_eq!(ftr.score() - before, delta, epsilon = 1E-10);
        match ftr.hyper() {
            Hyper::Categorical(h) => {
                assert_eq!(h.k, 3);
                assert!(alpha.contains(&h.dirichlet_alpha));
            }
            Hyper::Continuous(_) => panic!("wrong hyper type"),
        }
    }

    #[test]
    fn draws_come_from_the_grids() {
        let mut rng = Xoshiro256Plus::seed_from_u64(9);
        let g = vec![1.0, 2.0];
        let grids = ColumnHyperGrids {
            r: &g,
            nu: &g,
            s: &g,
            mu: &g,
            dirichlet_alpha: &g,
        };
        let h = grids.draw_continuous(&mut rng);
        assert!(g.contains(&h.r) && g.contains(&h.mu));
        let c = grids.draw_categorical(4, &mut rng);
        assert_eq!(c.k, 4);
        assert!(g.contains(&c.dirichlet_alpha));
    }
}
