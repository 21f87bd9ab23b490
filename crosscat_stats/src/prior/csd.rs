use serde::{Deserialize, Serialize};

use super::{ConjugateModel, SuffStat};
use crate::ln_gamma;

/// Symmetric Dirichlet hyperparameters for a categorical column with `k`
/// levels
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CategoricalHyper {
    pub k: usize,
    pub dirichlet_alpha: f64,
}

impl CategoricalHyper {
    pub fn new(k: usize, dirichlet_alpha: f64) -> Self {
        Self { k, dirichlet_alpha }
    }

    /// Unit concentration over `k` levels
    pub fn uniform(k: usize) -> Self {
        Self::new(k, 1.0)
    }
}

/// Per-level counts
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoricalSuffStat {
    pub n: usize,
    pub counts: Vec<usize>,
}

impl CategoricalSuffStat {
    pub fn new(k: usize) -> Self {
        Self {
            n: 0,
            counts: vec![0; k],
        }
    }
}

impl SuffStat for CategoricalSuffStat {
    fn n(&self) -> usize {
        self.n
    }

    fn observe(&mut self, x: f64) {
        self.n += 1;
        self.counts[x as usize] += 1;
    }

    fn forget(&mut self, x: f64) {
        self.n -= 1;
        self.counts[x as usize] -= 1;
    }
}

impl ConjugateModel for CategoricalHyper {
    type Stat = CategoricalSuffStat;

    fn empty_suffstat(&self) -> Self::Stat {
        CategoricalSuffStat::new(self.k)
    }

    fn ln_m(&self, stat: &Self::Stat) -> f64 {
        if stat.n == 0 {
            return 0.0;
        }
        let alpha = self.dirichlet_alpha;
        let sum_alpha = alpha * self.k as f64;
        let ln_gamma_alpha = ln_gamma(alpha);
        let ln_num: f64 = stat
            .counts
            .iter()
            .filter(|&&ct| ct > 0)
            .map(|&ct| ln_gamma(alpha + ct as f64) - ln_gamma_alpha)
            .sum();
        ln_gamma(sum_alpha) - ln_gamma(sum_alpha + stat.n as f64) + ln_num
    }

    fn ln_pp(&self, x: f64, stat: &Self::Stat) -> f64 {
        let alpha = self.dirichlet_alpha;
        let ct = stat.counts[x as usize] as f64;
        ((ct + alpha) / (alpha.mul_add(self.k as f64, stat.n as f64))).ln()
    }

    fn supports(&self, x: f64) -> bool {
        x >= 0.0 && x.fract() == 0.0 && (x as usize) < self.k
    }
}
