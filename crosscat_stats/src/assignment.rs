//! Data structures for assignments of items to components (partitions)
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ln_gamma;

/// Marks an entry that has been pulled out of the partition
pub const UNASSIGNED: usize = usize::MAX;

/// A partition of `n` items into `n_cats` non-empty, contiguously indexed
/// categories
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Assignment {
    /// The assignment vector. `asgn[i]` is the partition index of the
    /// i<sup>th</sup> datum.
    pub asgn: Vec<usize>,
    /// Contains the number a data assigned to each partition
    pub counts: Vec<usize>,
    /// The number of partitions/categories
    pub n_cats: usize,
}

/// The possible ways an assignment can go wrong with incorrect bookkeeping
#[derive(Serialize, Deserialize, Eq, PartialEq, Debug, Clone)]
pub struct AssignmentDiagnostics {
    /// There should be a partition with index zero in the assignment vector
    asgn_min_is_zero: bool,
    /// If `n_cats` is `k`, then the largest index in `asgn` should be `k-1`
    asgn_max_is_n_cats_minus_one: bool,
    /// If `n_cats` is `k`, then there should be indices 0, ..., k-1 in the
    /// assignment vector
    asgn_contains_0_through_n_cats_minus_1: bool,
    /// None of the entries in `counts` should be 0
    no_zero_counts: bool,
    /// `counts` should have an entry for every partition/category
    n_cats_cmp_counts_len: bool,
    /// The sum of `counts` should be the number of data
    sum_counts_cmp_n: bool,
    /// The sum of the indices in the assignment vector matches those in
    /// `counts`.
    asgn_agrees_with_counts: bool,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("Minimum assignment index is not 0")]
    MinAssignmentIndexNotZero,
    #[error("Max assignment index is not n_cats - 1")]
    MaxAssignmentIndexNotNCatsMinusOne,
    #[error("The assignment is missing one or more indices")]
    AssignmentDoesNotContainAllIndices,
    #[error("One or more of the counts is zero")]
    ZeroCounts,
    #[error("The sum of counts does not equal the number of data")]
    SumCountsNotEqualToAssignmentLength,
    #[error("The counts do not agree with the assignment")]
    AssignmentAndCountsDisagree,
    #[error(
        "The length of the counts does not equal the number of categories"
    )]
    NCatsIsNotCountsLength,
    #[error("Entry {0} is already assigned")]
    EntryAlreadyAssigned(usize),
    #[error("Category {k} is beyond the next new category ({n_cats})")]
    CategoryOutOfBounds { k: usize, n_cats: usize },
}

impl AssignmentDiagnostics {
    pub fn new(asgn: &Assignment) -> Self {
        let mut observed = vec![0_usize; asgn.n_cats];
        let mut in_range = true;
        for &z in asgn.asgn.iter() {
            if z < asgn.n_cats {
                observed[z] += 1;
            } else {
                in_range = false;
            }
        }

        AssignmentDiagnostics {
            asgn_min_is_zero: asgn.asgn.iter().min().map_or(true, |&z| z == 0),
            asgn_max_is_n_cats_minus_one: asgn
                .asgn
                .iter()
                .max()
                .map_or(true, |&z| z + 1 == asgn.n_cats),
            asgn_contains_0_through_n_cats_minus_1: in_range
                && observed.iter().all(|&ct| ct > 0),
            no_zero_counts: !asgn.counts.iter().any(|&ct| ct == 0),
            n_cats_cmp_counts_len: asgn.n_cats == asgn.counts.len(),
            sum_counts_cmp_n: asgn.counts.iter().sum::<usize>()
                == asgn.asgn.len(),
            asgn_agrees_with_counts: in_range && observed == asgn.counts,
        }
    }

    /// `true` if none of diagnostics was violated
    pub fn is_valid(&self) -> bool {
        self.asgn_min_is_zero
            && self.asgn_max_is_n_cats_minus_one
            && self.asgn_contains_0_through_n_cats_minus_1
            && self.no_zero_counts
            && self.n_cats_cmp_counts_len
            && self.sum_counts_cmp_n
            && self.asgn_agrees_with_counts
    }

    /// The first violated diagnostic as an error
    pub fn emit_error(&self) -> Result<(), AssignmentError> {
        let checks = [
            (self.asgn_min_is_zero, AssignmentError::MinAssignmentIndexNotZero),
            (
                self.asgn_max_is_n_cats_minus_one,
                AssignmentError::MaxAssignmentIndexNotNCatsMinusOne,
            ),
            (
                self.asgn_contains_0_through_n_cats_minus_1,
                AssignmentError::AssignmentDoesNotContainAllIndices,
            ),
            (self.no_zero_counts, AssignmentError::ZeroCounts),
            (
                self.n_cats_cmp_counts_len,
                AssignmentError::NCatsIsNotCountsLength,
            ),
            (
                self.sum_counts_cmp_n,
                AssignmentError::SumCountsNotEqualToAssignmentLength,
            ),
            (
                self.asgn_agrees_with_counts,
                AssignmentError::AssignmentAndCountsDisagree,
            ),
        ];
        checks
            .into_iter()
            .find(|(ok, _)| !ok)
            .map_or(Ok(()), |(_, err)| Err(err))
    }
}

impl Assignment {
    pub fn empty() -> Self {
        Self {
            asgn: Vec::new(),
            counts: Vec::new(),
            n_cats: 0,
        }
    }

    /// Build an assignment from an assignment vector, counting occupants
    ///
    /// # Example
    ///
    /// ```
    /// # use crosscat_stats::Assignment;
    /// let asgn = Assignment::from_vec(vec![0, 1, 0, 2]).unwrap();
    /// assert_eq!(asgn.n_cats, 3);
    /// assert_eq!(asgn.counts, vec![2, 1, 1]);
    ///
    /// // category 1 is skipped
    /// assert!(Assignment::from_vec(vec![0, 2, 2]).is_err());
    /// ```
    pub fn from_vec(asgn: Vec<usize>) -> Result<Self, AssignmentError> {
        let n_cats = asgn.iter().max().map_or(0, |&z| z + 1);
        let mut counts: Vec<usize> = vec![0; n_cats];
        asgn.iter().for_each(|&z| counts[z] += 1);

        let asgn = Self {
            asgn,
            counts,
            n_cats,
        };
        asgn.validate().emit_error().map(|_| asgn)
    }

    /// Create and iterator for the assignment vector
    pub fn iter(&self) -> impl Iterator<Item = &usize> {
        self.asgn.iter()
    }

    pub fn len(&self) -> usize {
        self.asgn.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark the entry at ix as unassigned. Removes the entry's contribution
    /// to `n_cats` and `counts`.
    ///
    /// Returns the category the entry occupied and whether that category
    /// was removed because the entry was its only member. When a category is
    /// removed, every higher category index shifts down by one.
    pub fn unassign(&mut self, ix: usize) -> Option<(usize, bool)> {
        let k = self.asgn[ix];
        if k == UNASSIGNED {
            return None;
        }

        let removed = if self.counts[k] == 1 {
            self.asgn.iter_mut().for_each(|z| {
                if *z != UNASSIGNED && *z > k {
                    *z -= 1
                }
            });
            self.counts.remove(k);
            self.n_cats -= 1;
            true
        } else {
            self.counts[k] -= 1;
            false
        };
        self.asgn[ix] = UNASSIGNED;
        Some((k, removed))
    }

    /// Reassign an unassigned entry to category `k`. `k == n_cats` opens a
    /// new category.
    pub fn reassign(&mut self, ix: usize, k: usize) -> Result<(), AssignmentError> {
        if self.asgn[ix] != UNASSIGNED {
            Err(AssignmentError::EntryAlreadyAssigned(ix))
        } else if k < self.n_cats {
            self.asgn[ix] = k;
            self.counts[k] += 1;
            Ok(())
        } else if k == self.n_cats {
            self.asgn[ix] = k;
            self.n_cats += 1;
            self.counts.push(1);
            Ok(())
        } else {
            Err(AssignmentError::CategoryOutOfBounds {
                k,
                n_cats: self.n_cats,
            })
        }
    }

    /// Validates the assignment
    pub fn validate(&self) -> AssignmentDiagnostics {
        AssignmentDiagnostics::new(self)
    }
}

/// Log probability of a partition with occupancy `cts` of `n` items under a
/// CRP with concentration `alpha`
///
/// Equals the product of the sequential seating probabilities, so it does
/// not depend on the order in which items were seated.
pub fn lcrp(n: usize, cts: &[usize], alpha: f64) -> f64 {
    let k: f64 = cts.len() as f64;
    let gsum = cts.iter().fold(0.0, |acc, ct| acc + ln_gamma(*ct as f64));
    let cpnt_2 = ln_gamma(alpha) - ln_gamma(n as f64 + alpha);
    gsum + k.mul_add(alpha.ln(), cpnt_2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;

    #[test]
    fn zero_count_fails_validation() {
        let asgn = Assignment {
            asgn: vec![0, 0, 0, 0],
            counts: vec![0, 4],
            n_cats: 1,
        };

        let diagnostic = asgn.validate();

        assert!(!diagnostic.is_valid());
        assert!(diagnostic.asgn_min_is_zero);
        assert!(diagnostic.asgn_max_is_n_cats_minus_one);
        assert!(diagnostic.asgn_contains_0_through_n_cats_minus_1);
        assert!(diagnostic.sum_counts_cmp_n);
        assert!(!diagnostic.n_cats_cmp_counts_len);
        assert!(!diagnostic.no_zero_counts);
        assert!(!diagnostic.asgn_agrees_with_counts);
    }

    #[test]
    fn bad_counts_fails_validation() {
        let asgn = Assignment {
            asgn: vec![1, 1, 0, 0],
            counts: vec![2, 3],
            n_cats: 2,
        };

        let diagnostic = asgn.validate();

        assert!(!diagnostic.is_valid());
        assert!(!diagnostic.sum_counts_cmp_n);
        assert!(!diagnostic.asgn_agrees_with_counts);
        assert_eq!(
            diagnostic.emit_error(),
            Err(AssignmentError::SumCountsNotEqualToAssignmentLength)
        );
    }

    #[test]
    fn no_zero_cat_fails_validation() {
        let asgn = Assignment {
            asgn: vec![1, 1, 2, 2],
            counts: vec![2, 2],
            n_cats: 2,
        };

        let diagnostic = asgn.validate();

        assert!(!diagnostic.is_valid());
        assert!(!diagnostic.asgn_min_is_zero);
        assert_eq!(
            diagnostic.emit_error(),
            Err(AssignmentError::MinAssignmentIndexNotZero)
        );
    }

    #[test]
    fn from_vec() {
        let z = vec![0, 1, 2, 0, 1, 0];
        let asgn = Assignment::from_vec(z).unwrap();
        assert_eq!(asgn.n_cats, 3);
        assert_eq!(asgn.counts, vec![3, 2, 1]);
    }

    #[test]
    fn unassign_non_singleton() {
        let mut asgn = Assignment::from_vec(vec![0, 1, 1, 2]).unwrap();
        assert_eq!(asgn.unassign(1), Some((1, false)));

        assert_eq!(asgn.asgn, vec![0, UNASSIGNED, 1, 2]);
        assert_eq!(asgn.counts, vec![1, 1, 1]);
        assert_eq!(asgn.n_cats, 3);
    }

    #[test]
    fn unassign_singleton_shifts_higher_categories() {
        let mut asgn = Assignment::from_vec(vec![0, 1, 2, 2]).unwrap();
        assert_eq!(asgn.unassign(1), Some((1, true)));

        assert_eq!(asgn.asgn, vec![0, UNASSIGNED, 1, 1]);
        assert_eq!(asgn.counts, vec![1, 2]);
        assert_eq!(asgn.n_cats, 2);
    }

    #[test]
    fn unassign_twice_is_noop() {
        let mut asgn = Assignment::from_vec(vec![0, 0, 1]).unwrap();
        asgn.unassign(0);
        assert_eq!(asgn.unassign(0), None);
        assert_eq!(asgn.counts, vec![1, 1]);
    }

    #[test]
    fn reassign_to_new_category() {
        let mut asgn = Assignment::from_vec(vec![0, 0, 1]).unwrap();
        asgn.unassign(0);
        asgn.reassign(0, 2).unwrap();

        assert_eq!(asgn.asgn, vec![2, 0, 1]);
        assert_eq!(asgn.counts, vec![1, 1, 1]);
        assert!(asgn.validate().is_valid());
    }

    #[test]
    fn reassign_assigned_entry_errors() {
        let mut asgn = Assignment::from_vec(vec![0, 0, 1]).unwrap();
        assert_eq!(
            asgn.reassign(0, 1),
            Err(AssignmentError::EntryAlreadyAssigned(0))
        );
    }

    #[test]
    fn reassign_too_far_errors() {
        let mut asgn = Assignment::from_vec(vec![0, 0, 1]).unwrap();
        asgn.unassign(2);
        assert_eq!(
            asgn.reassign(2, 3),
            Err(AssignmentError::CategoryOutOfBounds { k: 3, n_cats: 1 })
        );
    }

    #[test]
    fn lcrp_all_ones() {
        let lcrp_1 = lcrp(4, &[1, 1, 1, 1], 1.0);
        assert_relative_eq!(lcrp_1, -3.178_053_830_347_146, epsilon = 1E-8);

        let lcrp_2 = lcrp(4, &[1, 1, 1, 1], 2.1);
        assert_relative_eq!(lcrp_2, -1.945_817_168_283_883_7, epsilon = 1E-8);
    }

    #[test]
    fn lcrp_equals_product_of_seating_probabilities() {
        // seat [0, 0, 1, 0, 2] one at a time with alpha = 1.5
        let alpha: f64 = 1.5;
        let seq = (1.0_f64.ln() + alpha.ln() - alpha.ln())
            + (1.0 / (1.0 + alpha)).ln()
            + (alpha / (2.0 + alpha)).ln()
            + (2.0 / (3.0 + alpha)).ln()
            + (alpha / (4.0 + alpha)).ln();
        assert_relative_eq!(lcrp(5, &[3, 1, 1], alpha), seq, epsilon = 1E-10);
    }
}
