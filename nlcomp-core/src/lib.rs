//! nlcomp-core: a composition layer for nonlinear programs.
//!
//! This crate turns a collection of named variable blocks into the
//! mathematical objects an NLP solver consumes:
//!
//! - **Variable blocks / variable set**: named, fixed-size, bounded value
//!   vectors, concatenated in insertion order into the optimization vector.
//! - **Constraint sets**: bounded residual vectors over a subset of the
//!   blocks, with sparse Jacobians scattered at offsets resolved by an
//!   explicit linking step.
//! - **Cost terms**: scalar reductions of constraint residuals (sum of
//!   squares by default), with gradients chain-ruled through the wrapped
//!   constraint's Jacobian.
//! - **Problem**: the assembler that owns all of the above and exposes the
//!   concatenated vectors, bounds, and global sparse Jacobians.
//!
//! The layer is single-threaded and synchronous: a solver drives a strict
//! read-evaluate-write loop against it, and only the solver mutates
//! variable values, between full evaluation rounds.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use nlcomp_core::{
//!     JointPosConstraint, Problem, SharedConstraint, SquaredCost, VariableBlock,
//! };
//!
//! let mut nlp = Problem::new();
//! let q = VariableBlock::new("q", vec![1.0, 2.0]).into_shared();
//! nlp.add_variable_set(Rc::clone(&q))?;
//!
//! let pin = JointPosConstraint::new("pin_q", vec![0.0, 0.0], vec![q])?;
//! let pin: SharedConstraint = Rc::new(RefCell::new(pin));
//! pin.borrow_mut().link_with_variables(nlp.variables())?;
//! nlp.add_constraint_set(Rc::clone(&pin))?;
//! nlp.add_cost_set(Box::new(SquaredCost::new(pin)?))?;
//!
//! assert_eq!(nlp.evaluate_constraints()?, vec![1.0, 2.0]);
//! assert_eq!(nlp.cost()?, 5.0);
//! # Ok::<(), nlcomp_core::ComposeError>(())
//! ```

#![warn(clippy::all)]

pub mod bounds;
pub mod constraint;
pub mod cost;
pub mod error;
pub mod jacobian;
pub mod problem;
pub mod variable;

pub use bounds::Bounds;
pub use constraint::{ConstraintSet, JointPosConstraint, JointVelConstraint, SharedConstraint};
pub use cost::{CostTerm, ReducedCost, Reduction, SquaredCost, SumSquares};
pub use error::{ComposeError, ComposeResult};
pub use jacobian::{SparseCsc, SparseTriplets};
pub use problem::{link_and_add, Problem};
pub use variable::{SharedBlock, VariableBlock, VariableSet};
