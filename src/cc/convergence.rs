/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Convergence detection by the sum of the sources of the edges.
//!
//! Supersteps never increase the source of an edge, so the sum of the
//! sources is nonincreasing, and it is stable exactly when the edge set is.

use super::CcError;
use crate::graphs::EdgeSet;
use anyhow::Result;
use rayon::prelude::*;

/// The number of decimal digits available to the sum: twenty for each value
/// plus ten of headroom for the accumulation.
pub const SUM_PRECISION: u32 = 30;

/// The smallest sum that does not fit in [`SUM_PRECISION`] digits.
pub const SUM_BOUND: u128 = 10u128.pow(SUM_PRECISION);

/// Adds `value` to `sum`, returning [`None`] if the result does not fit in
/// [`SUM_PRECISION`] digits.
#[inline(always)]
pub fn accumulate(sum: u128, value: u128) -> Option<u128> {
    sum.checked_add(value).filter(|&sum| sum < SUM_BOUND)
}

/// The summary of an edge set observed after a superstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConvergenceSum {
    /// The sum of the sources of the edges.
    pub sum: u128,
    /// The number of edges.
    pub num_edges: usize,
}

impl ConvergenceSum {
    /// Computes the summary of an edge set, failing with
    /// [`CcError::SumOverflow`] if the sum does not fit in
    /// [`SUM_PRECISION`] digits.
    pub fn of(edges: &EdgeSet) -> Result<Self> {
        let num_edges = edges.len();
        let sources = edges
            .table()
            .parts()
            .par_iter()
            .flat_map_iter(|part| part.iter().map(|&(src, _)| src as u128));
        Ok(Self {
            sum: bounded_sum(sources, num_edges)?,
            num_edges,
        })
    }
}

/// Sums `values` within [`SUM_PRECISION`] digits, failing with
/// [`CcError::SumOverflow`] otherwise.
///
/// `num_edges` is only used for the error.
pub fn bounded_sum(values: impl IntoParallelIterator<Item = u128>, num_edges: usize) -> Result<u128> {
    values
        .into_par_iter()
        .try_fold(|| 0, accumulate)
        .try_reduce(|| 0, accumulate)
        .ok_or_else(|| {
            CcError::SumOverflow {
                digits: SUM_PRECISION,
                num_edges,
            }
            .into()
        })
}

/// The outcome of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// The edge set changed.
    Running(ConvergenceSum),
    /// The edge set is empty or its sum is unchanged.
    Converged(ConvergenceSum),
}

/// Compares the summary of each superstep with that of the previous one.
#[derive(Debug, Clone, Default)]
pub struct ConvergenceDetector {
    sums: Vec<ConvergenceSum>,
}

impl ConvergenceDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the summary of the edge set produced by a superstep.
    pub fn observe(&mut self, edges: &EdgeSet) -> Result<Convergence> {
        let current = ConvergenceSum::of(edges)?;
        let converged = current.num_edges == 0
            || self
                .sums
                .last()
                .is_some_and(|previous| previous.sum == current.sum);
        self.sums.push(current);
        Ok(if converged {
            Convergence::Converged(current)
        } else {
            Convergence::Running(current)
        })
    }

    pub fn into_sums(self) -> Vec<ConvergenceSum> {
        self.sums
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    #[test]
    fn test_accumulate() {
        assert_eq!(accumulate(1, 2), Some(3));
        assert_eq!(accumulate(SUM_BOUND - 1, 0), Some(SUM_BOUND - 1));
        assert_eq!(accumulate(SUM_BOUND - 1, 1), None);
        assert_eq!(accumulate(u128::MAX, 1), None);
        // Twenty-digit values leave room for ten billion of them
        assert!(accumulate(u64::MAX as u128 * 10_000_000_000, 0).is_some());
    }

    #[test]
    fn test_bounded_sum() -> Result<()> {
        let half = SUM_BOUND / 2;
        assert_eq!(bounded_sum(vec![half, half - 1], 2)?, SUM_BOUND - 1);
        let err = bounded_sum(vec![half, half], 2).unwrap_err();
        assert_eq!(
            err.downcast_ref::<CcError>(),
            Some(&CcError::SumOverflow {
                digits: SUM_PRECISION,
                num_edges: 2
            })
        );
        // Overflow is detected across partial sums too
        let err = bounded_sum(vec![half - 1; 4], 4).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CcError>(),
            Some(CcError::SumOverflow { num_edges: 4, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_detector() -> Result<()> {
        let two = NonZeroUsize::new(2).unwrap();
        let mut detector = ConvergenceDetector::new();
        let first = EdgeSet::from_edges([(1, 5), (2, 6)], two);
        let second = EdgeSet::from_edges([(0, 5), (2, 6), (1, 3)], two);
        assert!(matches!(detector.observe(&first)?, Convergence::Running(s) if s.sum == 3));
        assert!(matches!(detector.observe(&second)?, Convergence::Converged(s) if s.num_edges == 3));
        assert_eq!(detector.into_sums().len(), 2);
        Ok(())
    }

    #[test]
    fn test_empty_converges() -> Result<()> {
        let mut detector = ConvergenceDetector::new();
        let empty = EdgeSet::from_edges([], NonZeroUsize::MIN);
        assert_eq!(
            detector.observe(&empty)?,
            Convergence::Converged(ConvergenceSum::default())
        );
        Ok(())
    }
}
