//! Quadratic-penalty Newton solver.
//!
//! Minimizes the merit function
//!
//! ```text
//! φ(x) = Σ costs(x) + μ · Σ_i violation_i(c(x))²
//! ```
//!
//! where `violation_i` is the distance of constraint row i outside its
//! bounds (zero for satisfied rows, the plain residual for equality rows).
//! The merit gradient is assembled exactly from the problem's sparse
//! Jacobians; the Hessian is approximated by forward-differencing that
//! gradient, which is exact for the quadratic merits trajectory smoothing
//! produces. Steps come from a dense Cholesky solve with a diagonal-shift
//! retry, followed by a backtracking line search on the merit.
//!
//! The solver only talks to the assembler surface: read the variable
//! vector, request values and Jacobians, write the next iterate back.

use nalgebra::{Cholesky, DMatrix, DVector};
use thiserror::Error;

use nlcomp_core::{Bounds, ComposeError, ComposeResult, Problem};

use crate::settings::{BoundsPolicy, SolveSettings};

/// Errors that can occur while driving a solve.
#[derive(Debug, Error)]
pub enum SolveError {
    /// The composed problem rejected a query or a write
    #[error("composition error: {0}")]
    Compose(#[from] ComposeError),
}

/// Terminal state of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Merit gradient (or step) below tolerance, constraints satisfied
    Optimal,
    /// No further progress possible (line search or bound projection stuck)
    Stalled,
    /// Iteration limit reached
    MaxIters,
    /// Hessian factorization failed even with regularization
    NumericalError,
}

/// Solve outcome and diagnostics. The solution itself is written back into
/// the problem's variable blocks.
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// Terminal status
    pub status: SolveStatus,
    /// Newton iterations performed
    pub iters: usize,
    /// Final cost (without the penalty term)
    pub cost: f64,
    /// Final merit value
    pub merit: f64,
    /// Final merit gradient norm
    pub grad_norm: f64,
    /// Largest constraint-row violation at the solution
    pub max_violation: f64,
}

/// Minimize the problem's costs subject to its constraints (via quadratic
/// penalty), writing every accepted iterate back through `set_values`.
pub fn solve(problem: &mut Problem, settings: &SolveSettings) -> Result<SolveResult, SolveError> {
    let n = problem.num_variables();
    let mu = settings.penalty;
    let var_bounds = problem.variable_bounds();

    let mut x = problem.values();
    apply_bounds(&mut x, &var_bounds, settings.bounds_policy);

    if n == 0 {
        problem.set_values(&x)?;
        return finish(problem, SolveStatus::Optimal, 0, mu);
    }

    let mut phi = merit(problem, &x, mu)?;
    let mut status = SolveStatus::MaxIters;
    let mut iters = 0;

    if settings.verbose {
        println!("penalty Newton: n = {n}, m = {}, mu = {mu:.1e}", problem.num_constraint_rows());
        println!("{:>4} {:>14} {:>12} {:>12} {:>9}", "iter", "merit", "|grad|", "viol", "alpha");
    }

    for it in 0..settings.max_iter {
        iters = it + 1;

        let grad = merit_gradient(problem, &x, mu)?;
        let grad_norm = norm(&grad);
        if grad_norm <= settings.tol_grad {
            status = SolveStatus::Optimal;
            iters = it;
            break;
        }

        let hess = fd_hessian(problem, &x, &grad, mu, settings.fd_step)?;
        let Some(step) = newton_step(&hess, &grad, settings.static_reg) else {
            status = SolveStatus::NumericalError;
            break;
        };

        // Backtracking line search on the merit.
        let mut alpha = 1.0;
        let mut accepted = false;
        let mut moved = 0.0;
        for _ in 0..settings.ls_max_steps {
            let mut x_trial: Vec<f64> = x
                .iter()
                .zip(&step)
                .map(|(xi, di)| xi + alpha * di)
                .collect();
            apply_bounds(&mut x_trial, &var_bounds, settings.bounds_policy);

            let phi_trial = merit(problem, &x_trial, mu)?;
            if phi_trial.is_finite() && phi_trial <= phi {
                moved = distance(&x, &x_trial);
                x = x_trial;
                phi = phi_trial;
                accepted = true;
                break;
            }
            alpha *= settings.ls_beta;
        }

        if settings.verbose {
            // The line search may have left the problem at a rejected trial
            // point; report the violation at the iterate we kept.
            problem.set_values(&x)?;
            let viol = max_violation(problem)?;
            println!("{it:>4} {phi:>14.6e} {grad_norm:>12.4e} {viol:>12.4e} {alpha:>9.2e}");
        }

        if !accepted {
            status = SolveStatus::Stalled;
            break;
        }
        if moved <= settings.tol_step {
            // Either converged or pinned against the variable box.
            status = if grad_norm <= settings.tol_grad * (1.0 + phi.abs()) {
                SolveStatus::Optimal
            } else {
                SolveStatus::Stalled
            };
            break;
        }
    }

    problem.set_values(&x)?;

    // A "converged" point that still violates constraints means the penalty
    // could not enforce them; report it as stalled rather than optimal.
    if status == SolveStatus::Optimal && max_violation(problem)? > settings.tol_constraint {
        status = SolveStatus::Stalled;
    }

    finish(problem, status, iters, mu)
}

fn finish(
    problem: &mut Problem,
    status: SolveStatus,
    iters: usize,
    mu: f64,
) -> Result<SolveResult, SolveError> {
    let x = problem.values();
    let grad_norm = if x.is_empty() {
        0.0
    } else {
        norm(&merit_gradient(problem, &x, mu)?)
    };
    Ok(SolveResult {
        status,
        iters,
        cost: problem.cost()?,
        merit: merit(problem, &x, mu)?,
        grad_norm,
        max_violation: max_violation(problem)?,
    })
}

/// φ(x) = costs + μ Σ violation². Leaves the problem evaluated at `x`.
fn merit(problem: &mut Problem, x: &[f64], mu: f64) -> ComposeResult<f64> {
    problem.set_values(x)?;
    let mut phi = problem.cost()?;
    let residuals = problem.evaluate_constraints()?;
    let bounds = problem.constraint_bounds();
    for (r, b) in residuals.iter().zip(&bounds) {
        let v = b.violation(*r);
        phi += mu * v * v;
    }
    Ok(phi)
}

/// ∇φ(x) = g_cost + 2μ Jᵗ violation, assembled from the sparse Jacobians.
fn merit_gradient(problem: &mut Problem, x: &[f64], mu: f64) -> ComposeResult<Vec<f64>> {
    problem.set_values(x)?;
    let mut grad = vec![0.0; problem.num_variables()];

    for (&val, (_row, col)) in problem.jacobian_of_costs()?.iter() {
        grad[col] += val;
    }

    let residuals = problem.evaluate_constraints()?;
    let bounds = problem.constraint_bounds();
    let violations: Vec<f64> = residuals
        .iter()
        .zip(&bounds)
        .map(|(r, b)| b.violation(*r))
        .collect();
    for (&val, (row, col)) in problem.jacobian_of_constraints()?.iter() {
        grad[col] += 2.0 * mu * violations[row] * val;
    }
    Ok(grad)
}

/// Forward-difference Hessian of the merit gradient, symmetrized.
fn fd_hessian(
    problem: &mut Problem,
    x: &[f64],
    grad0: &[f64],
    mu: f64,
    h: f64,
) -> ComposeResult<DMatrix<f64>> {
    let n = x.len();
    let mut hess = DMatrix::zeros(n, n);
    let mut xp = x.to_vec();
    for j in 0..n {
        xp[j] += h;
        let gj = merit_gradient(problem, &xp, mu)?;
        for i in 0..n {
            hess[(i, j)] = (gj[i] - grad0[i]) / h;
        }
        xp[j] = x[j];
    }
    for i in 0..n {
        for j in 0..i {
            let s = 0.5 * (hess[(i, j)] + hess[(j, i)]);
            hess[(i, j)] = s;
            hess[(j, i)] = s;
        }
    }
    Ok(hess)
}

/// Solve `H d = -g` by Cholesky, bumping the diagonal shift on failure.
fn newton_step(hess: &DMatrix<f64>, grad: &[f64], static_reg: f64) -> Option<Vec<f64>> {
    let n = grad.len();
    let rhs = DVector::from_iterator(n, grad.iter().map(|g| -g));

    let mut shift = static_reg.max(1e-12);
    for _ in 0..8 {
        let mut h = hess.clone();
        for i in 0..n {
            h[(i, i)] += shift;
        }
        if let Some(chol) = Cholesky::new(h) {
            let d = chol.solve(&rhs);
            return Some(d.iter().copied().collect());
        }
        shift *= 100.0;
    }
    None
}

fn max_violation(problem: &Problem) -> ComposeResult<f64> {
    let residuals = problem.evaluate_constraints()?;
    let bounds = problem.constraint_bounds();
    Ok(residuals
        .iter()
        .zip(&bounds)
        .map(|(r, b)| b.violation(*r).abs())
        .fold(0.0, f64::max))
}

fn apply_bounds(x: &mut [f64], bounds: &[Bounds], policy: BoundsPolicy) {
    if policy == BoundsPolicy::Clamp {
        for (xi, b) in x.iter_mut().zip(bounds) {
            *xi = xi.clamp(b.lower, b.upper);
        }
    }
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
