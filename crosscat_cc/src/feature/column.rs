use crosscat_stats::{
    Assignment, CategoricalHyper, CategoricalSuffStat, ConjugateModel,
    ContinuousHyper, ContinuousSuffStat, SuffStat,
};
use enum_dispatch::enum_dispatch;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::feature::traits::Feature;
use crate::feature::{FType, Hyper};

/// A partitioned column of data
///
/// `components[k]` summarizes the data currently assigned to category `k` of
/// the owning view's row partition.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(bound(
    serialize = "Pr: Serialize, Pr::Stat: Serialize",
    deserialize = "Pr: DeserializeOwned, Pr::Stat: DeserializeOwned"
))]
pub struct Column<Pr: ConjugateModel> {
    pub id: usize,
    pub data: Vec<f64>,
    pub components: Vec<Pr::Stat>,
    pub hyper: Pr,
}

#[enum_dispatch]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ColModel {
    Continuous(Column<ContinuousHyper>),
    Categorical(Column<CategoricalHyper>),
}

/// Per-category sufficient statistics of one column
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSuffStats {
    Continuous(Vec<ContinuousSuffStat>),
    Categorical(Vec<CategoricalSuffStat>),
}

impl ColModel {
    /// Create an unpartitioned column. Call `reassign` before scoring.
    pub fn new(id: usize, data: Vec<f64>, hyper: Hyper) -> Self {
        match hyper {
            Hyper::Continuous(h) => Self::Continuous(Column::new(id, data, h)),
            Hyper::Categorical(h) => {
                Self::Categorical(Column::new(id, data, h))
            }
        }
    }

    pub fn ftype(&self) -> FType {
        match self {
            Self::Continuous(_) => FType::Continuous,
            Self::Categorical(_) => FType::Categorical,
        }
    }

    /// The current hyperparameters
    pub fn hyper(&self) -> Hyper {
        match self {
            Self::Continuous(ftr) => Hyper::Continuous(ftr.hyper),
            Self::Categorical(ftr) => Hyper::Categorical(ftr.hyper),
        }
    }

    pub fn suffstats(&self) -> ColumnSuffStats {
        match self {
            Self::Continuous(ftr) => {
                ColumnSuffStats::Continuous(ftr.components.clone())
            }
            Self::Categorical(ftr) => {
                ColumnSuffStats::Categorical(ftr.components.clone())
            }
        }
    }
}

impl<Pr: ConjugateModel> Column<Pr> {
    pub fn new(id: usize, data: Vec<f64>, hyper: Pr) -> Self {
        Column {
            id,
            data,
            components: Vec::new(),
            hyper,
        }
    }

    /// Log marginal likelihood of the current components under `hyper`
    pub fn score_with(&self, hyper: &Pr) -> f64 {
        self.components.iter().map(|stat| hyper.ln_m(stat)).sum()
    }

    fn stats_for(&self, asgn: &Assignment) -> Vec<Pr::Stat> {
        let mut stats: Vec<Pr::Stat> = (0..asgn.n_cats)
            .map(|_| self.hyper.empty_suffstat())
            .collect();
        self.data
            .iter()
            .zip(asgn.asgn.iter())
            .filter(|(x, _)| !x.is_nan())
            .for_each(|(&x, &z)| stats[z].observe(x));
        stats
    }
}

impl<Pr: ConjugateModel> Feature for Column<Pr> {
    #[inline]
    fn id(&self) -> usize {
        self.id
    }

    #[inline]
    fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn k(&self) -> usize {
        self.components.len()
    }

    fn reassign(&mut self, asgn: &Assignment) {
        debug_assert_eq!(asgn.len(), self.len());
        self.components = self.stats_for(asgn);
    }

    fn score(&self) -> f64 {
        self.score_with(&self.hyper)
    }

    fn asgn_score(&self, asgn: &Assignment) -> f64 {
        self.stats_for(asgn)
            .iter()
            .map(|stat| self.hyper.ln_m(stat))
            .sum()
    }

    #[inline]
    fn append_empty_component(&mut self) {
        self.components.push(self.hyper.empty_suffstat());
    }

    #[inline]
    fn drop_component(&mut self, k: usize) {
        self.components.remove(k);
    }

    #[inline]
    fn predictive_score_at(&self, row_ix: usize, k: usize) -> f64 {
        self.value_predictive_score(self.data[row_ix], k)
    }

    fn value_predictive_score(&self, x: f64, k: usize) -> f64 {
        if x.is_nan() {
            0.0
        } else {
            self.hyper.ln_pp(x, &self.components[k])
        }
    }

    #[inline]
    fn singleton_score(&self, row_ix: usize) -> f64 {
        self.value_singleton_score(self.data[row_ix])
    }

    fn value_singleton_score(&self, x: f64) -> f64 {
        if x.is_nan() {
            0.0
        } else {
            self.hyper.ln_pp(x, &self.hyper.empty_suffstat())
        }
    }

    fn observe_datum(&mut self, row_ix: usize, k: usize) {
        let x = self.data[row_ix];
        if !x.is_nan() {
            self.components[k].observe(x);
        }
    }

    fn forget_datum(&mut self, row_ix: usize, k: usize) {
        let x = self.data[row_ix];
        if !x.is_nan() {
            self.components[k].forget(x);
        }
    }

    #[inline]
    fn data(&self) -> &[f64] {
        &self.data
    }

    fn accepts(&self, x: f64) -> bool {
        x.is_nan() || self.hyper.supports(x)
    }
}

/// Room left over the largest squared magnitude for the sums of squares and
/// squared deviations the Normal-Gamma posterior accumulates
const SCALE_HEADROOM: f64 = 8.0;

/// Whether continuous values no larger than `max_abs` in magnitude can be
/// summarized `n` at a time without the squared sums overflowing
pub(crate) fn continuous_scale_fits(max_abs: f64, n: usize) -> bool {
    (max_abs * max_abs * SCALE_HEADROOM * (n as f64 + 1.0)).is_finite()
}

/// The largest magnitude among the observed values of `data`
pub(crate) fn max_abs(data: &[f64]) -> f64 {
    data.iter()
        .filter(|x| !x.is_nan())
        .fold(0.0, |acc: f64, x| acc.max(x.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;
    use crosscat_stats::Crp;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    fn continuous_column(xs: Vec<f64>) -> ColModel {
        ColModel::new(0, xs, Hyper::Continuous(ContinuousHyper::default()))
    }

    #[test]
    fn scale_check_flags_values_whose_squares_overflow() {
        let xs = [1E200, -1E200, 0.0, 3.0];
        assert_eq!(max_abs(&xs), 1E200);
        assert!(!continuous_scale_fits(max_abs(&xs), xs.len()));
        assert!(continuous_scale_fits(1E150, 1000));
        assert!(continuous_scale_fits(max_abs(&[f64::NAN, -2.0]), 2));
        assert_eq!(max_abs(&[f64::NAN]), 0.0);
    }

    #[test]
    fn score_and_asgn_score_equivalency() {
        let n_rows = 100;
        let mut rng = Xoshiro256Plus::seed_from_u64(1337);
        for i in 0..100 {
            let asgn = Crp::new(1.0).draw_assignment(n_rows, &mut rng);
            let xs: Vec<f64> = (0..n_rows)
                .map(|j| ((i * n_rows + j) as f64 * 0.37).sin() * 3.0)
                .collect();
            let mut feature = continuous_column(xs);
            feature.reassign(&asgn);

            assert_relative_eq!(
                feature.score(),
                feature.asgn_score(&asgn),
                epsilon = 1E-8
            );
        }
    }

    #[test]
    fn missing_values_do_not_contribute() {
        let asgn = Assignment::from_vec(vec![0, 0, 1, 1]).unwrap();
        let mut with_nan = continuous_column(vec![0.5, f64::NAN, 1.5, -0.2]);
        let mut without = ColModel::new(
            0,
            vec![0.5, 1.5, -0.2],
            Hyper::Continuous(ContinuousHyper::default()),
        );
        with_nan.reassign(&asgn);
        without.reassign(&Assignment::from_vec(vec![0, 1, 1]).unwrap());

        assert_relative_eq!(with_nan.score(), without.score(), epsilon = 1E-12);
        assert_eq!(with_nan.predictive_score_at(1, 0), 0.0);
        assert_eq!(with_nan.singleton_score(1), 0.0);
    }

    #[test]
    fn observe_then_forget_restores_component() {
        let asgn = Assignment::from_vec(vec![0, 1, 0]).unwrap();
        let mut ftr = ColModel::new(
            3,
            vec![0.0, 2.0, 1.0],
            Hyper::Categorical(CategoricalHyper::uniform(3)),
        );
        ftr.reassign(&asgn);
        let before = ftr.suffstats();
        ftr.observe_datum(1, 0);
        ftr.forget_datum(1, 0);
        assert_eq!(ftr.suffstats(), before);
        assert_eq!(ftr.id(), 3);
        assert_eq!(ftr.k(), 2);
    }

    #[test]
    fn drop_component_shifts_later_components_down() {
        let asgn = Assignment::from_vec(vec![0, 1, 2, 2]).unwrap();
        let mut ftr = ColModel::new(
            0,
            vec![0.0, 1.0, 1.0, 2.0],
            Hyper::Categorical(CategoricalHyper::uniform(3)),
        );
        ftr.reassign(&asgn);
        ftr.forget_datum(1, 1);
        ftr.drop_component(1);

        assert_eq!(ftr.k(), 2);
        let shifted = Assignment::from_vec(vec![0, 1, 1]).unwrap();
        let mut expected = ColModel::new(
            0,
            vec![0.0, 1.0, 2.0],
            Hyper::Categorical(CategoricalHyper::uniform(3)),
        );
        expected.reassign(&shifted);
        assert_eq!(ftr.suffstats(), expected.suffstats());
    }

    #[test]
    fn categorical_accepts_only_levels_and_missing() {
        let ftr = ColModel::new(
            0,
            vec![0.0],
            Hyper::Categorical(CategoricalHyper::uniform(2)),
        );
        assert!(ftr.accepts(1.0));
        assert!(ftr.accepts(f64::NAN));
        assert!(!ftr.accepts(2.0));
    }
}
