//! Finite-difference velocity constraint over consecutive position blocks.

use crate::bounds::Bounds;
use crate::error::{ComposeError, ComposeResult};
use crate::jacobian::{scatter_identity, SparseTriplets};
use crate::variable::{SharedBlock, VariableSet};

use super::ConstraintSet;

/// Equality constraint `(pos[i+1] - pos[i]) - target_velocity = 0` for each
/// consecutive pair of K referenced blocks of length N.
///
/// M = (K-1)×N. Jacobian row block k has -I at block k's columns and +I at
/// block k+1's columns, the finite-difference velocity model.
#[derive(Debug)]
pub struct JointVelConstraint {
    name: String,
    target_velocity: Vec<f64>,
    blocks: Vec<SharedBlock>,
    offsets: Option<Vec<usize>>,
}

impl JointVelConstraint {
    /// Create a velocity constraint over `blocks`, ordered along the
    /// trajectory. Requires at least two blocks, all of the target's length.
    pub fn new(
        name: impl Into<String>,
        target_velocity: Vec<f64>,
        blocks: Vec<SharedBlock>,
    ) -> ComposeResult<Self> {
        let name = name.into();
        if blocks.len() < 2 {
            return Err(ComposeError::dimension(
                2,
                blocks.len(),
                format!("blocks of velocity constraint '{name}'"),
            ));
        }
        for block in &blocks {
            let b = block.borrow();
            if b.len() != target_velocity.len() {
                return Err(ComposeError::dimension(
                    target_velocity.len(),
                    b.len(),
                    format!("block '{}' in velocity constraint '{name}'", b.name()),
                ));
            }
        }
        Ok(Self {
            name,
            target_velocity,
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

impl ConstraintSet for JointVelConstraint {
    fn name(&self) -> &str {
        &self.name
    }

    fn rows(&self) -> usize {
        (self.blocks.len() - 1) * self.target_velocity.len()
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
        let n = self.target_velocity.len();
        let mut out = Vec::with_capacity(self.rows());
        for pair in self.blocks.windows(2) {
            let cur = pair[0].borrow();
            let next = pair[1].borrow();
            for j in 0..n {
                out.push(next.values()[j] - cur.values()[j] - self.target_velocity[j]);
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
        let n = self.target_velocity.len();
        // Block k contributes -I to pair row k and +I to pair row k-1.
        for (k, block) in self.blocks.iter().enumerate() {
            if block.borrow().name() != var_name {
                continue;
            }
            if k < self.blocks.len() - 1 {
                scatter_identity(out, row_offset + k * n, offsets[k], n, -1.0);
            }
            if k > 0 {
                scatter_identity(out, row_offset + (k - 1) * n, offsets[k], n, 1.0);
            }
        }
        Ok(())
    }
}
