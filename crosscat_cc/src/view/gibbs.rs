use super::View;

use crate::error::ViewError;
use crosscat_utils::ln_pflip;
use rand::Rng;

impl View {
    /// Remove the row for the purposes of MCMC without deleting its data.
    ///
    /// Returns the log predictive the row had in its category, i.e. the
    /// amount the data score dropped.
    pub(crate) fn remove_row(&mut self, row_ix: usize) -> f64 {
        let k = self.asgn().asgn[row_ix];
        let is_singleton = self.asgn().counts[k] == 1;
        self.forget_row(row_ix, k);
        let ln_p_x = self.predictive_score_at(row_ix, k);
        self.asgn_mut().unassign(row_ix);

        if is_singleton {
            self.drop_component(k);
        }
        ln_p_x
    }

    /// Gibbs-assign an unassigned row. Returns the log predictive of the row
    /// in the category it joined.
    pub(crate) fn reinsert_row<R: Rng>(
        &mut self,
        row_ix: usize,
        rng: &mut R,
    ) -> Result<f64, ViewError> {
        let (k_new, ln_p_x) = if self.n_cats() == 0 {
            // If empty, assign to category zero
            self.append_empty_component();
            (0, self.singleton_score(row_ix))
        } else {
            let process = self.prior_process.process;
            let mut ln_p_xs: Vec<f64> = Vec::with_capacity(self.n_cats() + 1);
            let mut logps: Vec<f64> = Vec::with_capacity(self.n_cats() + 1);

            self.asgn().counts.iter().enumerate().for_each(|(k, &ct)| {
                let ln_p_x = self.predictive_score_at(row_ix, k);
                ln_p_xs.push(ln_p_x);
                logps.push(process.ln_gibbs_weight(ct) + ln_p_x);
            });

            let ln_p_x = self.singleton_score(row_ix);
            ln_p_xs.push(ln_p_x);
            logps.push(process.ln_singleton_weight() + ln_p_x);

            let k_new = ln_pflip(&logps, rng);

            if k_new == self.n_cats() {
                self.append_empty_component();
            }

            (k_new, ln_p_xs[k_new])
        };

        self.observe_row(row_ix, k_new);
        self.asgn_mut().reassign(row_ix, k_new)?;
        Ok(ln_p_x)
    }

    /// Gibbs-reassign one row to a category given all other rows.
    ///
    /// Returns the change in `crp_score() + score()`.
    pub fn reassign_row_gibbs<R: Rng>(
        &mut self,
        row_ix: usize,
        rng: &mut R,
    ) -> Result<f64, ViewError> {
        if row_ix >= self.n_rows() {
            return Err(ViewError::RowIndexOutOfBounds {
                n_rows: self.n_rows(),
                row_ix,
            });
        }
        let crp_before = self.crp_score();
        let removed = self.remove_row(row_ix);
        let added = self.reinsert_row(row_ix, rng)?;
        Ok(self.crp_score() - crp_before + added - removed)
    }

    /// Gibbs-reassign each row in `row_ixs`, in order
    pub fn reassign_rows_gibbs<R: Rng>(
        &mut self,
        row_ixs: &[usize],
        rng: &mut R,
    ) -> Result<f64, ViewError> {
        let mut delta = 0.0;
        for &row_ix in row_ixs {
            delta += self.reassign_row_gibbs(row_ix, rng)?;
        }
        debug_assert!(self.asgn().validate().is_valid());
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{ColModel, Feature, Hyper};
    use approx::*;
    use crosscat_stats::{
        Assignment, CategoricalHyper, ContinuousHyper, Crp, PriorProcess,
    };
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    fn test_view(seed: u64) -> View {
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        let n_rows = 30;
        let asgn = Crp::new(1.0).draw_assignment(n_rows, &mut rng);
        let xs: Vec<f64> = (0..n_rows)
            .map(|i| if i % 7 == 3 { f64::NAN } else { (i as f64).cos() * 4.0 })
            .collect();
        let ys: Vec<f64> = (0..n_rows).map(|i| (i % 3) as f64).collect();
        let mut view = View::new(PriorProcess {
            process: Crp::new(0.8),
            asgn,
        });
        view.insert_feature(ColModel::new(
            0,
            xs,
            Hyper::Continuous(ContinuousHyper::default()),
        ))
        .unwrap();
        view.insert_feature(ColModel::new(
            1,
            ys,
            Hyper::Categorical(CategoricalHyper::uniform(3)),
        ))
        .unwrap();
        view
    }

    #[test]
    fn row_gibbs_delta_tracks_score() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0xFEED);
        let mut view = test_view(1);
        let rows: Vec<usize> = (0..view.n_rows()).collect();

        for _ in 0..5 {
            let before = view.crp_score() + view.score();
            let delta = view.reassign_rows_gibbs(&rows, &mut rng).unwrap();
            let after = view.crp_score() + view.score();
            assert_relative_eq!(after - before, delta, epsilon = 1E-8);
        }
    }

    #[test]
    fn row_gibbs_keeps_suffstats_consistent() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0xBEEF);
        let mut view = test_view(2);
        let rows: Vec<usize> = (0..view.n_rows()).rev().collect();
        view.reassign_rows_gibbs(&rows, &mut rng).unwrap();

        assert!(view.asgn().validate().is_valid());
        for ftr in view.ftrs.values() {
            assert_eq!(ftr.k(), view.n_cats());
            assert_relative_eq!(
                ftr.score(),
                ftr.asgn_score(view.asgn()),
                epsilon = 1E-8
            );
        }
    }

    #[test]
    fn reassign_out_of_bounds_row_fails() {
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let mut view = test_view(3);
        assert_eq!(
            view.reassign_row_gibbs(30, &mut rng),
            Err(ViewError::RowIndexOutOfBounds {
                n_rows: 30,
                row_ix: 30
            })
        );
    }

    #[test]
    fn single_row_view_stays_in_one_category() {
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let mut view = View::new(PriorProcess {
            process: Crp::new(1.0),
            asgn: Assignment::from_vec(vec![0]).unwrap(),
        });
        view.insert_feature(ColModel::new(
            0,
            vec![1.0],
            Hyper::Continuous(ContinuousHyper::default()),
        ))
        .unwrap();
        let delta = view.reassign_row_gibbs(0, &mut rng).unwrap();
        assert_eq!(view.asgn().asgn, vec![0]);
        assert_relative_eq!(delta, 0.0, epsilon = 1E-12);
    }
}
