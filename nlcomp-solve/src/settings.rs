//! Solver settings.

/// What to do with variable bounds when accepting an iterate.
///
/// The composition layer stores whatever is written (bounds are not
/// enforced at set-time), so the policy lives here, as explicit solver
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsPolicy {
    /// Project each accepted iterate onto the variable box.
    Clamp,
    /// Write iterates as computed, even outside the bounds.
    Ignore,
}

/// Settings for the penalty-Newton reference solver.
#[derive(Debug, Clone)]
pub struct SolveSettings {
    /// Maximum number of Newton iterations
    pub max_iter: usize,

    /// Converged when the merit gradient norm falls below this
    pub tol_grad: f64,

    /// Converged when an accepted step moves the iterate less than this
    pub tol_step: f64,

    /// Feasible when no constraint row is violated by more than this
    pub tol_constraint: f64,

    /// Quadratic penalty weight on constraint violation
    pub penalty: f64,

    /// Forward-difference step for the Hessian of the merit gradient
    pub fd_step: f64,

    /// Static regularization added to the Hessian diagonal before factorizing
    pub static_reg: f64,

    /// Backtracking line search shrink factor
    pub ls_beta: f64,

    /// Maximum backtracking steps per iteration
    pub ls_max_steps: usize,

    /// Variable bound handling for accepted iterates
    pub bounds_policy: BoundsPolicy,

    /// Print a per-iteration table
    pub verbose: bool,
}

impl Default for SolveSettings {
    fn default() -> Self {
        Self {
            max_iter: 50,
            tol_grad: 1e-6,
            tol_step: 1e-12,
            tol_constraint: 1e-5,
            penalty: 1e6,
            fd_step: 1e-6,
            static_reg: 1e-9,
            ls_beta: 0.5,
            ls_max_steps: 30,
            bounds_policy: BoundsPolicy::Clamp,
            verbose: false,
        }
    }
}
