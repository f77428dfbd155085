//! Position constraint: pin variable blocks to target values.

use crate::bounds::Bounds;
use crate::error::{ComposeError, ComposeResult};
use crate::jacobian::{scatter_identity, SparseTriplets};
use crate::variable::{SharedBlock, VariableSet};

use super::ConstraintSet;

/// Equality constraint `value_of(block) - target = 0` applied to each
/// referenced block.
///
/// With one referenced block of length N this is the classic start/end
/// position pin: M = N and the Jacobian restricted to that block's columns
/// is the identity.
#[derive(Debug)]
pub struct JointPosConstraint {
    name: String,
    target: Vec<f64>,
    blocks: Vec<SharedBlock>,
    /// Resolved global column offsets, parallel to `blocks`. None until linked.
    offsets: Option<Vec<usize>>,
}

impl JointPosConstraint {
    /// Create a position constraint pinning each block in `blocks` to `target`.
    ///
    /// Every referenced block must have the target's length.
    pub fn new(
        name: impl Into<String>,
        target: Vec<f64>,
        blocks: Vec<SharedBlock>,
    ) -> ComposeResult<Self> {
        let name = name.into();
        for block in &blocks {
            let b = block.borrow();
            if b.len() != target.len() {
                return Err(ComposeError::dimension(
                    target.len(),
                    b.len(),
                    format!("block '{}' in position constraint '{name}'", b.name()),
                ));
            }
        }
        Ok(Self {
            name,
            target,
            blocks,
            offsets: None,
        })
    }

    fn offsets(&self) -> ComposeResult<&[usize]> {
        self.offsets
            .as_deref()
            .ok_or_else(|| ComposeError::NotLinked(self.name.clone()))
    }
}

impl ConstraintSet for JointPosConstraint {
    fn name(&self) -> &str {
        &self.name
    }

    fn rows(&self) -> usize {
        self.blocks.len() * self.target.len()
    }

    fn bounds(&self) -> Vec<Bounds> {
        vec![Bounds::zero(); self.rows()]
    }

    fn var_names(&self) -> Vec<String> {
        self.blocks
            .iter()
            .map(|b| b.borrow().name().to_string())
            .collect()
    }

    fn is_linked(&self) -> bool {
        self.offsets.is_some()
    }

    fn link_with_variables(&mut self, variables: &VariableSet) -> ComposeResult<()> {
        let mut offsets = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            offsets.push(variables.offset_of(block.borrow().name())?);
        }
        self.offsets = Some(offsets);
        Ok(())
    }

    fn values(&self) -> ComposeResult<Vec<f64>> {
        self.offsets()?;
        let n = self.target.len();
        let mut out = Vec::with_capacity(self.rows());
        for block in &self.blocks {
            let b = block.borrow();
            for j in 0..n {
                out.push(b.values()[j] - self.target[j]);
            }
        }
        Ok(out)
    }

    fn fill_jacobian_block(
        &self,
        var_name: &str,
        out: &mut SparseTriplets,
        row_offset: usize,
    ) -> ComposeResult<()> {
        let offsets = self.offsets()?;
        let n = self.target.len();
        for (i, block) in self.blocks.iter().enumerate() {
            if block.borrow().name() == var_name {
                scatter_identity(out, row_offset + i * n, offsets[i], n, 1.0);
            }
        }
        Ok(())
    }
}
