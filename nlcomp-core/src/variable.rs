//! Variable blocks and the ordered variable set.
//!
//! A [`VariableBlock`] is one named, fixed-size, bounded slice of the
//! optimization vector (e.g. the joint positions of one trajectory
//! waypoint). A [`VariableSet`] concatenates blocks in insertion order,
//! which fixes each block's global column offset for every downstream
//! Jacobian scatter.
//!
//! Blocks are shared (`Rc<RefCell<_>>`): constraint sets hold the same
//! block handles the variable set holds, so every value query reads the
//! latest solver iterate instead of a cached copy. The model is strictly
//! single-threaded; only the solver mutates values, between evaluation
//! rounds.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::bounds::Bounds;
use crate::error::{ComposeError, ComposeResult};

/// Shared handle to a variable block.
pub type SharedBlock = Rc<RefCell<VariableBlock>>;

/// A named, fixed-size, bounded vector of optimization variables.
///
/// The length is fixed at construction; `set_values` never resizes.
/// Bounds are stored but not enforced at write time — respecting them is
/// the solver's contract, this layer stores whatever is written.
#[derive(Debug, Clone)]
pub struct VariableBlock {
    name: String,
    values: Vec<f64>,
    bounds: Vec<Bounds>,
}

impl VariableBlock {
    /// Create an unbounded block with the given initial value.
    pub fn new(name: impl Into<String>, initial: Vec<f64>) -> Self {
        let bounds = vec![Bounds::unbounded(); initial.len()];
        Self {
            name: name.into(),
            values: initial,
            bounds,
        }
    }

    /// Create a block with per-component bounds.
    ///
    /// Fails with `InvalidBounds` if any component has `lower > upper` (or a
    /// NaN side): an inverted box would otherwise surface much later, inside
    /// a solver's projection step.
    pub fn with_bounds(
        name: impl Into<String>,
        initial: Vec<f64>,
        bounds: Vec<Bounds>,
    ) -> ComposeResult<Self> {
        let name = name.into();
        if bounds.len() != initial.len() {
            return Err(ComposeError::dimension(
                initial.len(),
                bounds.len(),
                format!("bounds of variable block '{name}'"),
            ));
        }
        for (i, b) in bounds.iter().enumerate() {
            if b.lower > b.upper || b.lower.is_nan() || b.upper.is_nan() {
                return Err(ComposeError::InvalidBounds {
                    lower: b.lower,
                    upper: b.upper,
                    context: format!("component {i} of variable block '{name}'"),
                });
            }
        }
        Ok(Self {
            name,
            values: initial,
            bounds,
        })
    }

    /// Wrap a block in the shared handle constraint sets consume.
    pub fn into_shared(self) -> SharedBlock {
        Rc::new(RefCell::new(self))
    }

    /// Block name (unique within a variable set).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of components N.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the block has zero components.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Current value.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Overwrite the current value.
    ///
    /// Fails with `DimensionMismatch` if `values` has the wrong length.
    /// No bounds check: out-of-bound values are stored as-is.
    pub fn set_values(&mut self, values: &[f64]) -> ComposeResult<()> {
        if values.len() != self.values.len() {
            return Err(ComposeError::dimension(
                self.values.len(),
                values.len(),
                format!("values of variable block '{}'", self.name),
            ));
        }
        self.values.copy_from_slice(values);
        Ok(())
    }

    /// Per-component bounds.
    pub fn bounds(&self) -> &[Bounds] {
        &self.bounds
    }
}

/// Ordered collection of variable blocks forming the full optimization vector.
///
/// Insertion order is significant: block k's global column offset is the sum
/// of the lengths of blocks 0..k.
#[derive(Debug, Default)]
pub struct VariableSet {
    blocks: Vec<SharedBlock>,
    offsets: HashMap<String, usize>,
    total: usize,
}

impl VariableSet {
    /// Create an empty variable set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block, assigning it the next column range.
    ///
    /// Fails with `DuplicateName` if a block with the same name is already
    /// registered; the set is unchanged on error.
    pub fn add(&mut self, block: SharedBlock) -> ComposeResult<()> {
        let (name, len) = {
            let b = block.borrow();
            (b.name().to_string(), b.len())
        };
        if self.offsets.contains_key(&name) {
            return Err(ComposeError::DuplicateName(name));
        }
        self.offsets.insert(name, self.total);
        self.total += len;
        self.blocks.push(block);
        Ok(())
    }

    /// Total number of scalar components across all blocks.
    pub fn len(&self) -> usize {
        self.total
    }

    /// Whether the set holds no components.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of blocks.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Blocks in insertion order.
    pub fn blocks(&self) -> &[SharedBlock] {
        &self.blocks
    }

    /// Global column offset of the named block.
    pub fn offset_of(&self, name: &str) -> ComposeResult<usize> {
        self.offsets
            .get(name)
            .copied()
            .ok_or_else(|| ComposeError::UnknownVariable(name.to_string()))
    }

    /// Concatenated value vector in insertion order.
    pub fn values(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.total);
        for block in &self.blocks {
            out.extend_from_slice(block.borrow().values());
        }
        out
    }

    /// Scatter a full-length vector back into the blocks.
    ///
    /// Fails with `DimensionMismatch` (before any block is touched) if
    /// `values` does not have the concatenated length.
    pub fn set_values(&mut self, values: &[f64]) -> ComposeResult<()> {
        if values.len() != self.total {
            return Err(ComposeError::dimension(
                self.total,
                values.len(),
                "variable set values",
            ));
        }
        let mut offset = 0;
        for block in &self.blocks {
            let mut b = block.borrow_mut();
            let len = b.len();
            b.set_values(&values[offset..offset + len])?;
            offset += len;
        }
        Ok(())
    }

    /// Concatenated per-component bounds.
    pub fn bounds(&self) -> Vec<Bounds> {
        let mut out = Vec::with_capacity(self.total);
        for block in &self.blocks {
            out.extend_from_slice(block.borrow().bounds());
        }
        out
    }
}
