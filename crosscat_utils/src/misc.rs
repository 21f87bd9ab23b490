use std::mem::swap;

pub trait MinMax {
    type Inner: PartialOrd;
    /// Simultaneously compute the min and max of items in an Iterator. Returns
    /// `None` if the iterator is empty.
    fn minmax(&mut self) -> Option<(Self::Inner, Self::Inner)>;
}

impl<T> MinMax for T
where
    T: Iterator,
    T::Item: PartialOrd + Clone,
{
    type Inner = T::Item;
    fn minmax(&mut self) -> Option<(Self::Inner, Self::Inner)> {
        let mut min = self.next()?;

        let mut max = if let Some(item) = self.next() {
            item
        } else {
            return Some((min.clone(), min));
        };

        if min > max {
            swap(&mut min, &mut max);
        }

        for item in self {
            if item > max {
                max = item;
            } else if item < min {
                min = item;
            }
        }
        Some((min, max))
    }
}

/// Numerically stable `ln(sum(exp(xs)))`
///
/// Panics on an empty container. If every entry is `-inf`, the result is
/// `-inf`.
///
/// # Example
///
/// ```
/// # use crosscat_utils::logsumexp;
/// let xs = vec![0.0; 4];
/// assert!((logsumexp(&xs) - 4_f64.ln()).abs() < 1E-12);
/// ```
pub fn logsumexp(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        panic!("Empty container");
    } else if xs.len() == 1 {
        xs[0]
    } else {
        let maxval = xs.iter().fold(f64::NEG_INFINITY, |m, &x| m.max(x));
        if maxval == f64::NEG_INFINITY {
            return maxval;
        }
        xs.iter()
            .fold(0.0_f64, |acc, x| acc + (x - maxval).exp())
            .ln()
            + maxval
    }
}

/// `n` evenly spaced values from `a` to `b`, inclusive.
///
/// With `n == 1` only `a` is returned.
pub fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![a],
        _ => {
            let step = (b - a) / (n - 1) as f64;
            (0..n)
                .map(|ix| if ix == n - 1 { b } else { a + step * ix as f64 })
                .collect()
        }
    }
}

/// `n` values from `a` to `b`, inclusive, evenly spaced in log space.
///
/// `a` and `b` must be positive.
///
/// # Example
///
/// ```
/// # use crosscat_utils::log_linspace;
/// let xs = log_linspace(0.1, 10.0, 3);
/// assert!((xs[0] - 0.1).abs() < 1E-12);
/// assert!((xs[1] - 1.0).abs() < 1E-12);
/// assert!((xs[2] - 10.0).abs() < 1E-12);
/// ```
pub fn log_linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    let mut xs: Vec<f64> = linspace(a.ln(), b.ln(), n)
        .into_iter()
        .map(|x| x.exp())
        .collect();
    // pin the endpoints so round-tripping through ln/exp doesn't drift
    if let Some(first) = xs.first_mut() {
        *first = a;
    }
    if n > 1 {
        xs[n - 1] = b;
    }
    xs
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;

    const TOL: f64 = 1E-10;

    #[test]
    fn minmax_of_empty_is_none() {
        let xs: Vec<f64> = Vec::new();
        assert!(xs.iter().minmax().is_none());
    }

    #[test]
    fn minmax_of_single_is_that_value() {
        let xs = vec![1.5_f64];
        assert_eq!(xs.iter().minmax(), Some((&1.5, &1.5)));
    }

    #[test]
    fn minmax_unsorted() {
        let xs = vec![3.0_f64, -1.0, 8.0, 2.0];
        assert_eq!(xs.iter().cloned().minmax(), Some((-1.0, 8.0)));
    }

    #[test]
    fn logsumexp_on_vector_of_zeros() {
        let xs: Vec<f64> = vec![0.0; 5];
        // should be about log(5)
        assert_relative_eq!(
            logsumexp(&xs),
            1.609_437_912_434_100_3,
            epsilon = TOL
        );
    }

    #[test]
    fn logsumexp_on_random_values() {
        let xs: Vec<f64> = vec![
            0.304_153_86,
            -0.070_722_96,
            -1.042_870_19,
            0.278_554_07,
            -0.818_967_65,
        ];
        assert_relative_eq!(
            logsumexp(&xs),
            1.482_000_789_426_305_9,
            epsilon = TOL
        );
    }

    #[test]
    fn logsumexp_handles_very_negative_values() {
        let xs = vec![-1000.0, -1000.0];
        assert_relative_eq!(
            logsumexp(&xs),
            -1000.0 + 2_f64.ln(),
            epsilon = TOL
        );
    }

    #[test]
    fn logsumexp_of_all_neg_inf_is_neg_inf() {
        let xs = vec![f64::NEG_INFINITY, f64::NEG_INFINITY];
        assert_eq!(logsumexp(&xs), f64::NEG_INFINITY);
    }

    #[test]
    #[should_panic]
    fn logsumexp_should_panic_on_empty() {
        let xs: Vec<f64> = Vec::new();
        logsumexp(&xs);
    }

    #[test]
    fn linspace_endpoints_and_length() {
        let xs = linspace(-2.0, 3.0, 6);
        assert_eq!(xs.len(), 6);
        assert_relative_eq!(xs[0], -2.0, epsilon = TOL);
        assert_relative_eq!(xs[1], -1.0, epsilon = TOL);
        assert_relative_eq!(xs[5], 3.0, epsilon = TOL);
    }

    #[test]
    fn log_linspace_is_ascending_and_positive() {
        let xs = log_linspace(0.01, 100.0, 31);
        assert_eq!(xs.len(), 31);
        assert!(xs.iter().all(|&x| x > 0.0 && x.is_finite()));
        assert!(xs.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(xs[0], 0.01);
        assert_eq!(xs[30], 100.0);
    }
}
