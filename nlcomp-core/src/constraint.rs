//! Constraint sets: bounded residual vectors with sparse Jacobians.
//!
//! A constraint set is a function of a subset of variable blocks. It must be
//! linked against a [`VariableSet`] before any value or Jacobian query:
//! linking resolves each referenced block's global column offset, and every
//! downstream Jacobian scatter depends on those offsets being right.
//! Querying before linking is a composition error, not a recoverable one.

use std::cell::RefCell;
use std::rc::Rc;

use crate::bounds::Bounds;
use crate::error::ComposeResult;
use crate::jacobian::SparseTriplets;
use crate::variable::VariableSet;

pub mod joint_position;
pub mod joint_velocity;

pub use joint_position::JointPosConstraint;
pub use joint_velocity::JointVelConstraint;

/// Shared handle to a constraint set.
///
/// Shared because the same constraint may simultaneously be registered as a
/// hard constraint and wrapped by a cost term; the problem is the longest
/// holder.
pub type SharedConstraint = Rc<RefCell<dyn ConstraintSet>>;

/// A bounded residual vector plus its Jacobian with respect to the variable
/// blocks it references.
pub trait ConstraintSet {
    /// Constraint name (unique within a problem).
    fn name(&self) -> &str;

    /// Declared output dimension M.
    fn rows(&self) -> usize;

    /// Per-row bounds, length M, fixed at construction.
    fn bounds(&self) -> Vec<Bounds>;

    /// Names of the referenced variable blocks, in Jacobian layout order.
    fn var_names(&self) -> Vec<String>;

    /// Whether `link_with_variables` has resolved the column offsets.
    fn is_linked(&self) -> bool;

    /// Resolve each referenced block's global column offset in `variables`.
    ///
    /// Must be called before any value or Jacobian query. Calling it again
    /// re-resolves the offsets; it is never invoked implicitly.
    fn link_with_variables(&mut self, variables: &VariableSet) -> ComposeResult<()>;

    /// Evaluate the residual, length M, from the referenced blocks' current
    /// values (read through the live handles, so repeated calls reflect the
    /// latest solver iterate). Fails with `NotLinked` before linking.
    fn values(&self) -> ComposeResult<Vec<f64>>;

    /// Scatter the M×N partial derivative with respect to the named block
    /// into `out`, at the block's resolved column offset and this
    /// constraint's `row_offset`. A name this constraint does not reference
    /// is a no-op: sparsity is the default.
    fn fill_jacobian_block(
        &self,
        var_name: &str,
        out: &mut SparseTriplets,
        row_offset: usize,
    ) -> ComposeResult<()>;

    /// Scatter the full Jacobian of this constraint at `row_offset`.
    fn fill_jacobian(&self, out: &mut SparseTriplets, row_offset: usize) -> ComposeResult<()> {
        // A repeated reference must only be scattered once:
        // `fill_jacobian_block` already covers every occurrence of a name.
        let mut names = self.var_names();
        names.sort_unstable();
        names.dedup();
        for name in names {
            self.fill_jacobian_block(&name, out, row_offset)?;
        }
        Ok(())
    }
}
