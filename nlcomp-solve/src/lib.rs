//! nlcomp-solve: reference solver adapter for `nlcomp-core` problems.
//!
//! A quadratic-penalty Newton method that consumes exactly the assembler
//! surface a real NLP solver would: current variable vector, variable
//! bounds, constraint vector and bounds, constraint Jacobian, and cost
//! gradient, writing iterates back through `Problem::set_values`. It is
//! deliberately small — no barrier, no KKT machinery — but it is enough to
//! drive the trajectory-smoothing problems the composition layer was built
//! for (see `examples/velocity_smoother.rs`).

#![warn(clippy::all)]

pub mod newton;
pub mod settings;

pub use newton::{solve, SolveError, SolveResult, SolveStatus};
pub use settings::{BoundsPolicy, SolveSettings};
