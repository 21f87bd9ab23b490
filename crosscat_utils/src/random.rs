use rand::Rng;

/// Draw an index with probability proportional to `weights`
///
/// # Panics
///
/// Panics if `weights` is empty or if the weights do not sum to a positive,
/// finite value.
pub fn pflip<R: Rng>(weights: &[f64], rng: &mut R) -> usize {
    if weights.is_empty() {
        panic!("Empty container");
    }
    let scale: f64 = weights.iter().sum();
    if !(scale.is_finite() && scale > 0.0) {
        panic!("Could not draw from {:?}", weights);
    }

    let r = rng.gen::<f64>() * scale;
    let mut acc = 0.0;
    for (ix, w) in weights.iter().enumerate() {
        acc += w;
        if acc > r {
            return ix;
        }
    }
    // rounding can leave `r` a hair above the final cumulative sum
    weights
        .iter()
        .rposition(|&w| w > 0.0)
        .unwrap_or(weights.len() - 1)
}

/// Draw an index with probability proportional to `exp(log_weights)`
///
/// The weights are shifted by their max before exponentiation so any finite
/// input is safe. Entries of `-inf` are never drawn.
///
/// # Panics
///
/// Panics if `log_weights` is empty or its max is not finite.
pub fn ln_pflip<R: Rng>(log_weights: &[f64], rng: &mut R) -> usize {
    if log_weights.is_empty() {
        panic!("Empty container");
    }
    if log_weights.len() == 1 {
        return 0;
    }

    let maxval = log_weights
        .iter()
        .fold(f64::NEG_INFINITY, |m, &x| m.max(x));
    if !maxval.is_finite() {
        panic!("Could not draw from {:?}", log_weights);
    }

    let weights: Vec<f64> =
        log_weights.iter().map(|w| (w - maxval).exp()).collect();
    pflip(&weights, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn pflip_single_weight_is_zero() {
        let mut rng = Xoshiro256Plus::seed_from_u64(1337);
        for _ in 0..50 {
            assert_eq!(pflip(&[0.3], &mut rng), 0);
        }
    }

    #[test]
    fn pflip_never_draws_zero_weight() {
        let mut rng = Xoshiro256Plus::seed_from_u64(1337);
        let ws = vec![0.0, 1.0, 0.0, 2.0];
        for _ in 0..500 {
            let ix = pflip(&ws, &mut rng);
            assert!(ix == 1 || ix == 3);
        }
    }

    #[test]
    fn ln_pflip_follows_weights() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0xABCD);
        let ln_ws = vec![0.25_f64.ln(), 0.75_f64.ln()];
        let n = 20_000;
        let ct = (0..n).filter(|_| ln_pflip(&ln_ws, &mut rng) == 1).count();
        let freq = ct as f64 / n as f64;
        assert!((freq - 0.75).abs() < 0.02);
    }

    #[test]
    fn ln_pflip_handles_large_negative_logs() {
        let mut rng = Xoshiro256Plus::seed_from_u64(7);
        let ln_ws = vec![-2000.0, f64::NEG_INFINITY, -2001.0];
        for _ in 0..100 {
            assert_ne!(ln_pflip(&ln_ws, &mut rng), 1);
        }
    }

    #[test]
    #[should_panic]
    fn ln_pflip_panics_on_empty() {
        let mut rng = Xoshiro256Plus::seed_from_u64(7);
        ln_pflip(&[], &mut rng);
    }
}
