//! Cost terms built by reducing a constraint residual to a scalar.
//!
//! A cost wraps a shared, already-linked constraint set and a differentiable
//! reduction rule. Its gradient is obtained by chain-ruling the reduction
//! gradient through the wrapped constraint's Jacobian, so the cost never
//! needs its own offset bookkeeping: it inherits the wrapped constraint's
//! resolved column layout.

use crate::error::{ComposeError, ComposeResult};
use crate::jacobian::SparseTriplets;

use crate::constraint::SharedConstraint;

/// Differentiable scalar reduction of a residual vector.
pub trait Reduction {
    /// Reduced value at `residual`.
    fn value(&self, residual: &[f64]) -> f64;

    /// Gradient of the reduced value with respect to `residual`.
    fn gradient(&self, residual: &[f64]) -> Vec<f64>;
}

/// Sum of squares: `Σ r_j²`, gradient `2 r`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumSquares;

impl Reduction for SumSquares {
    fn value(&self, residual: &[f64]) -> f64 {
        residual.iter().map(|r| r * r).sum()
    }

    fn gradient(&self, residual: &[f64]) -> Vec<f64> {
        residual.iter().map(|r| 2.0 * r).collect()
    }
}

/// A scalar cost term: one value plus one gradient row.
pub trait CostTerm {
    /// Cost name (unique within a problem).
    fn name(&self) -> &str;

    /// Current cost value.
    fn cost(&self) -> ComposeResult<f64>;

    /// Scatter the gradient into row 0 of `out` (shape 1 × total columns).
    /// Entries for columns the underlying constraint does not touch are left
    /// as implicit zero.
    fn fill_gradient(&self, out: &mut SparseTriplets) -> ComposeResult<()>;
}

/// Cost obtained by applying a [`Reduction`] to a wrapped constraint's
/// residual. Cost dimension is always 1 regardless of the wrapped M.
pub struct ReducedCost<R: Reduction> {
    name: String,
    constraint: SharedConstraint,
    reduction: R,
}

impl<R: Reduction> ReducedCost<R> {
    /// Wrap an already-linked constraint set with the given reduction.
    ///
    /// Fails with `NotLinked` if the constraint has not been linked: the
    /// gradient scatter depends on the constraint's resolved offsets.
    pub fn with_reduction(constraint: SharedConstraint, reduction: R) -> ComposeResult<Self> {
        let name = {
            let c = constraint.borrow();
            if !c.is_linked() {
                return Err(ComposeError::NotLinked(c.name().to_string()));
            }
            format!("{}_cost", c.name())
        };
        Ok(Self {
            name,
            constraint,
            reduction,
        })
    }
}

impl<R: Reduction> CostTerm for ReducedCost<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn cost(&self) -> ComposeResult<f64> {
        let residual = self.constraint.borrow().values()?;
        Ok(self.reduction.value(&residual))
    }

    fn fill_gradient(&self, out: &mut SparseTriplets) -> ComposeResult<()> {
        let constraint = self.constraint.borrow();
        let residual = constraint.values()?;
        let dr = self.reduction.gradient(&residual);

        // Chain rule: grad = drᵗ · J_wrapped, accumulated triplet by triplet
        // onto the single cost row.
        let mut jac = SparseTriplets::new((constraint.rows(), out.cols()));
        constraint.fill_jacobian(&mut jac, 0)?;
        for (val, (row, col)) in jac.triplet_iter() {
            out.add_triplet(0, col, dr[row] * val);
        }
        Ok(())
    }
}

/// Sum-of-squares cost over a wrapped constraint residual.
pub type SquaredCost = ReducedCost<SumSquares>;

impl SquaredCost {
    /// Wrap an already-linked constraint set with the sum-of-squares reduction.
    pub fn new(constraint: SharedConstraint) -> ComposeResult<Self> {
        Self::with_reduction(constraint, SumSquares)
    }
}
