use serde::{Deserialize, Serialize};

use super::{ConjugateModel, SuffStat};
use crate::ln_gamma;

const LN_2: f64 = std::f64::consts::LN_2;
const HALF_LN_2PI: f64 = 0.918_938_533_204_672_8;

/// Normal-Gamma hyperparameters for continuous columns
///
/// The precision has a Gamma(nu/2, rate=s/2) prior and the mean, given the
/// precision `tau`, a Normal(mu, 1/(r tau)) prior.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ContinuousHyper {
    pub r: f64,
    pub nu: f64,
    pub s: f64,
    pub mu: f64,
}

impl Default for ContinuousHyper {
    fn default() -> Self {
        Self {
            r: 1.0,
            nu: 2.0,
            s: 2.0,
            mu: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ContinuousSuffStat {
    pub n: usize,
    pub sum_x: f64,
    pub sum_x_sq: f64,
}

impl ContinuousSuffStat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mean(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum_x / self.n as f64)
    }

    /// Sum of squared deviations from the mean, clamped at zero
    pub fn ssd(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.sum_x
                .mul_add(-self.sum_x / self.n as f64, self.sum_x_sq)
                .max(0.0)
        }
    }
}

impl SuffStat for ContinuousSuffStat {
    fn n(&self) -> usize {
        self.n
    }

    fn observe(&mut self, x: f64) {
        self.n += 1;
        self.sum_x += x;
        self.sum_x_sq += x * x;
    }

    fn forget(&mut self, x: f64) {
        if self.n <= 1 {
            *self = Self::default();
        } else {
            self.n -= 1;
            self.sum_x -= x;
            self.sum_x_sq -= x * x;
        }
    }
}

impl ContinuousHyper {
    pub fn new(r: f64, nu: f64, s: f64, mu: f64) -> Self {
        Self { r, nu, s, mu }
    }

    /// Log normalizer of the Normal-Gamma
    fn ln_z(r: f64, nu: f64, s: f64) -> f64 {
        let half_nu = nu / 2.0;
        half_nu.mul_add(LN_2 - s.ln(), HALF_LN_2PI - 0.5 * r.ln())
            + ln_gamma(half_nu)
    }

    /// Hyperparameters after observing the data in `stat`
    pub fn posterior(&self, stat: &ContinuousSuffStat) -> Self {
        if stat.n == 0 {
            return *self;
        }
        let n = stat.n as f64;
        let r = self.r + n;
        let nu = self.nu + n;
        let mu = self.r.mul_add(self.mu, stat.sum_x) / r;
        let xbar = stat.sum_x / n;
        let dev = xbar - self.mu;
        let s = (self.r * n / r).mul_add(dev * dev, self.s + stat.ssd());
        Self { r, nu, s, mu }
    }
}

impl ConjugateModel for ContinuousHyper {
    type Stat = ContinuousSuffStat;

    fn empty_suffstat(&self) -> Self::Stat {
        ContinuousSuffStat::new()
    }

    fn ln_m(&self, stat: &Self::Stat) -> f64 {
        if stat.n == 0 {
            return 0.0;
        }
        let post = self.posterior(stat);
        let n = stat.n as f64;
        -n * HALF_LN_2PI + Self::ln_z(post.r, post.nu, post.s)
            - Self::ln_z(self.r, self.nu, self.s)
    }

    fn supports(&self, x: f64) -> bool {
        x.is_finite()
    }
}
