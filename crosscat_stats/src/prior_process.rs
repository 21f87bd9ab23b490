use crosscat_utils::pflip;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::assignment::{lcrp, Assignment};

/// Chinese restaurant process with concentration `alpha`
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Crp {
    pub alpha: f64,
}

impl Crp {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    /// Log weight of joining a category holding `n_k` items
    #[inline]
    pub fn ln_gibbs_weight(&self, n_k: usize) -> f64 {
        (n_k as f64).ln()
    }

    /// Log weight of opening a new category
    #[inline]
    pub fn ln_singleton_weight(&self) -> f64 {
        self.alpha.ln()
    }

    /// Log of the seating normalizer when `n` items are already seated
    #[inline]
    pub fn ln_normalizer(&self, n: usize) -> f64 {
        (n as f64 + self.alpha).ln()
    }

    /// Draw a partition of `n` items by seating them one at a time
    pub fn draw_assignment<R: Rng>(&self, n: usize, rng: &mut R) -> Assignment {
        if n == 0 {
            return Assignment::empty();
        }

        let mut counts = vec![1];
        let mut ps = vec![1.0, self.alpha];
        let mut zs = vec![0; n];

        for z in zs.iter_mut().skip(1) {
            let zi = pflip(&ps, rng);
            *z = zi;
            if zi < counts.len() {
                ps[zi] += 1.0;
                counts[zi] += 1;
            } else {
                ps[zi] = 1.0;
                ps.push(self.alpha);
                counts.push(1);
            };
        }

        Assignment {
            asgn: zs,
            n_cats: counts.len(),
            counts,
        }
    }

    /// Log probability of `asgn` under this process
    pub fn ln_f_partition(&self, asgn: &Assignment) -> f64 {
        lcrp(asgn.len(), &asgn.counts, self.alpha)
    }
}

/// A partition together with the process that generated it
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PriorProcess {
    pub process: Crp,
    pub asgn: Assignment,
}

impl PriorProcess {
    /// Draw a partition of `n` items from `process`
    pub fn from_process<R: Rng>(process: Crp, n: usize, rng: &mut R) -> Self {
        let asgn = process.draw_assignment(n, rng);
        Self { process, asgn }
    }

    /// Everything in one category
    pub fn flat(process: Crp, n: usize) -> Self {
        Self {
            process,
            asgn: Assignment {
                asgn: vec![0; n],
                counts: if n == 0 { Vec::new() } else { vec![n] },
                n_cats: usize::from(n > 0),
            },
        }
    }

    pub fn alpha(&self) -> f64 {
        self.process.alpha
    }

    /// Log probability of the current partition
    pub fn ln_f_partition(&self) -> f64 {
        self.process.ln_f_partition(&self.asgn)
    }

    /// Log probability of the current partition under another alpha
    pub fn ln_f_partition_at(&self, alpha: f64) -> f64 {
        lcrp(self.asgn.len(), &self.asgn.counts, alpha)
    }
}
