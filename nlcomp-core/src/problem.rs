//! The problem assembler.
//!
//! Aggregates variable blocks, constraint sets, and cost terms, and exposes
//! the concatenated views an NLP solver consumes: variable vector and
//! bounds, constraint vector and bounds, total cost, and the global sparse
//! Jacobians of constraints and costs. Registration order fixes the global
//! layout: each constraint set gets a contiguous row range, each variable
//! block a contiguous column range.

use std::rc::Rc;

use crate::bounds::Bounds;
use crate::constraint::SharedConstraint;
use crate::cost::CostTerm;
use crate::error::{ComposeError, ComposeResult};
use crate::jacobian::{SparseCsc, SparseTriplets};
use crate::variable::{SharedBlock, VariableSet};

struct ConstraintEntry {
    set: SharedConstraint,
    row_offset: usize,
    rows: usize,
}

/// A composed nonlinear program.
///
/// The problem owns its variable set, constraint sets, and cost terms for
/// its lifetime (constraints are shared handles, since a cost may wrap the
/// same set). Linking constraints to the variable set is the caller's job
/// and must happen before registration; the assembler rejects unlinked sets
/// instead of producing a silently-zero Jacobian later.
#[derive(Default)]
pub struct Problem {
    variables: VariableSet,
    constraints: Vec<ConstraintEntry>,
    constraint_rows: usize,
    costs: Vec<Box<dyn CostTerm>>,
}

impl Problem {
    /// Create an empty problem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a variable block, assigning it the next column range.
    pub fn add_variable_set(&mut self, block: SharedBlock) -> ComposeResult<()> {
        self.variables.add(block)
    }

    /// Append a constraint set, assigning it the next contiguous row range.
    ///
    /// The set must already be linked (`NotLinked` otherwise) and its name
    /// must not collide with a registered constraint.
    pub fn add_constraint_set(&mut self, set: SharedConstraint) -> ComposeResult<()> {
        let (name, linked, rows) = {
            let s = set.borrow();
            (s.name().to_string(), s.is_linked(), s.rows())
        };
        if !linked {
            return Err(ComposeError::NotLinked(name));
        }
        if self.constraints.iter().any(|e| e.set.borrow().name() == name) {
            return Err(ComposeError::DuplicateName(name));
        }
        self.constraints.push(ConstraintEntry {
            set,
            row_offset: self.constraint_rows,
            rows,
        });
        self.constraint_rows += rows;
        Ok(())
    }

    /// Append a cost term.
    pub fn add_cost_set(&mut self, cost: Box<dyn CostTerm>) -> ComposeResult<()> {
        if self.costs.iter().any(|c| c.name() == cost.name()) {
            return Err(ComposeError::DuplicateName(cost.name().to_string()));
        }
        self.costs.push(cost);
        Ok(())
    }

    /// The variable set all constraints link against.
    pub fn variables(&self) -> &VariableSet {
        &self.variables
    }

    /// Total number of variable columns.
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Total number of constraint rows.
    pub fn num_constraint_rows(&self) -> usize {
        self.constraint_rows
    }

    /// Number of registered cost terms.
    pub fn num_costs(&self) -> usize {
        self.costs.len()
    }

    /// Concatenated variable vector.
    pub fn values(&self) -> Vec<f64> {
        self.variables.values()
    }

    /// Overwrite the full variable vector (the solver's write path).
    pub fn set_values(&mut self, values: &[f64]) -> ComposeResult<()> {
        self.variables.set_values(values)
    }

    /// Concatenated variable bounds.
    pub fn variable_bounds(&self) -> Vec<Bounds> {
        self.variables.bounds()
    }

    /// Concatenated constraint residuals in registration order.
    pub fn evaluate_constraints(&self) -> ComposeResult<Vec<f64>> {
        let mut out = Vec::with_capacity(self.constraint_rows);
        for entry in &self.constraints {
            out.extend(entry.set.borrow().values()?);
        }
        Ok(out)
    }

    /// Concatenated constraint row bounds in registration order.
    pub fn constraint_bounds(&self) -> Vec<Bounds> {
        let mut out = Vec::with_capacity(self.constraint_rows);
        for entry in &self.constraints {
            out.extend(entry.set.borrow().bounds());
        }
        out
    }

    /// Global constraint Jacobian (total rows × total columns, CSC).
    ///
    /// Each constraint scatters its triplets at its assigned row range and
    /// its referenced blocks' column offsets; everything else is
    /// structurally zero.
    pub fn jacobian_of_constraints(&self) -> ComposeResult<SparseCsc> {
        let mut tri = SparseTriplets::new((self.constraint_rows, self.variables.len()));
        for entry in &self.constraints {
            entry.set.borrow().fill_jacobian(&mut tri, entry.row_offset)?;
        }
        Ok(tri.to_csc())
    }

    /// Total cost: sum over all registered cost terms.
    pub fn cost(&self) -> ComposeResult<f64> {
        let mut total = 0.0;
        for cost in &self.costs {
            total += cost.cost()?;
        }
        Ok(total)
    }

    /// Gradient of the total cost as a 1 × total-columns sparse row.
    /// Contributions from every cost term are summed.
    pub fn jacobian_of_costs(&self) -> ComposeResult<SparseCsc> {
        let mut tri = SparseTriplets::new((1, self.variables.len()));
        for cost in &self.costs {
            cost.fill_gradient(&mut tri)?;
        }
        Ok(tri.to_csc())
    }

    /// Diagnostic dump of the current problem state. Reporting only, no
    /// state change.
    pub fn print_current(&self) {
        println!("Problem: {} variables, {} constraint rows, {} cost terms",
            self.num_variables(), self.constraint_rows, self.costs.len());

        for block in self.variables.blocks() {
            let b = block.borrow();
            println!("  var {:<24} {:?}", b.name(), b.values());
        }

        for entry in &self.constraints {
            let set = entry.set.borrow();
            match set.values() {
                Ok(values) => println!(
                    "  constraint {:<17} rows {}..{} {:?}",
                    set.name(),
                    entry.row_offset,
                    entry.row_offset + entry.rows,
                    values
                ),
                Err(e) => println!("  constraint {:<17} <error: {e}>", set.name()),
            }
        }

        for cost in &self.costs {
            match cost.cost() {
                Ok(v) => println!("  cost {:<23} {v}", cost.name()),
                Err(e) => println!("  cost {:<23} <error: {e}>", cost.name()),
            }
        }
    }
}

/// Link `set` against the problem's variables, then register it.
///
/// Linking stays an explicit step; this just spells out the common order.
pub fn link_and_add(problem: &mut Problem, set: SharedConstraint) -> ComposeResult<()> {
    set.borrow_mut().link_with_variables(problem.variables())?;
    problem.add_constraint_set(Rc::clone(&set))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{JointPosConstraint, JointVelConstraint};
    use crate::cost::SquaredCost;
    use crate::jacobian::dense_row;
    use crate::variable::VariableBlock;
    use std::cell::RefCell;

    fn two_block_problem() -> (Problem, SharedConstraint) {
        let mut problem = Problem::new();
        let p0 = VariableBlock::new("p0", vec![1.0, 1.0]).into_shared();
        let p1 = VariableBlock::new("p1", vec![2.0, 3.0]).into_shared();
        problem.add_variable_set(Rc::clone(&p0)).unwrap();
        problem.add_variable_set(Rc::clone(&p1)).unwrap();

        let pin = JointPosConstraint::new("pin_p1", vec![0.0, 0.0], vec![p1]).unwrap();
        let pin: SharedConstraint = Rc::new(RefCell::new(pin));
        (problem, pin)
    }

    #[test]
    fn test_unlinked_constraint_rejected_at_registration() {
        let (mut problem, pin) = two_block_problem();
        let err = problem.add_constraint_set(Rc::clone(&pin)).unwrap_err();
        assert!(matches!(err, ComposeError::NotLinked(name) if name == "pin_p1"));
        assert_eq!(problem.num_constraint_rows(), 0);
    }

    #[test]
    fn test_row_ranges_follow_registration_order() {
        let (mut problem, pin) = two_block_problem();
        link_and_add(&mut problem, Rc::clone(&pin)).unwrap();

        let blocks: Vec<_> = problem.variables().blocks().to_vec();
        let vel = JointVelConstraint::new("vel", vec![0.0, 0.0], blocks).unwrap();
        let vel: SharedConstraint = Rc::new(RefCell::new(vel));
        link_and_add(&mut problem, Rc::clone(&vel)).unwrap();

        assert_eq!(problem.num_constraint_rows(), 4);
        // pin rows first: r = p1 - 0 = [2, 3]; then vel rows r = p1 - p0
        assert_eq!(
            problem.evaluate_constraints().unwrap(),
            vec![2.0, 3.0, 1.0, 2.0]
        );
    }

    #[test]
    fn test_jacobian_sparsity_respects_assigned_ranges() {
        let (mut problem, pin) = two_block_problem();
        link_and_add(&mut problem, Rc::clone(&pin)).unwrap();

        let j = problem.jacobian_of_constraints().unwrap();
        assert_eq!(j.rows(), 2);
        assert_eq!(j.cols(), 4);
        // pin references only p1 (columns 2..4); p0's columns stay zero.
        assert_eq!(dense_row(&j, 0), vec![0.0, 0.0, 1.0, 0.0]);
        assert_eq!(dense_row(&j, 1), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_duplicate_constraint_name_rejected() {
        let (mut problem, pin) = two_block_problem();
        link_and_add(&mut problem, Rc::clone(&pin)).unwrap();

        let p1 = Rc::clone(&problem.variables().blocks()[1]);
        let again = JointPosConstraint::new("pin_p1", vec![0.0, 0.0], vec![p1]).unwrap();
        let again: SharedConstraint = Rc::new(RefCell::new(again));
        let err = link_and_add(&mut problem, again).unwrap_err();
        assert!(matches!(err, ComposeError::DuplicateName(_)));
    }

    #[test]
    fn test_costs_sum_and_share_constraints() {
        let (mut problem, pin) = two_block_problem();
        link_and_add(&mut problem, Rc::clone(&pin)).unwrap();

        // The same constraint backs a cost: shared ownership, two roles.
        let cost = SquaredCost::new(Rc::clone(&pin)).unwrap();
        problem.add_cost_set(Box::new(cost)).unwrap();

        // r = [2, 3] -> cost = 13, gradient = [0, 0, 4, 6]
        assert_eq!(problem.cost().unwrap(), 13.0);
        let g = problem.jacobian_of_costs().unwrap();
        assert_eq!(g.rows(), 1);
        assert_eq!(dense_row(&g, 0), vec![0.0, 0.0, 4.0, 6.0]);
    }

    #[test]
    fn test_set_values_reaches_constraints() {
        let (mut problem, pin) = two_block_problem();
        link_and_add(&mut problem, Rc::clone(&pin)).unwrap();

        problem.set_values(&[0.0, 0.0, -1.0, 1.0]).unwrap();
        assert_eq!(problem.evaluate_constraints().unwrap(), vec![-1.0, 1.0]);
        assert_eq!(pin.borrow().values().unwrap(), vec![-1.0, 1.0]);
    }

    #[test]
    fn test_empty_problem_shapes() {
        let problem = Problem::new();
        assert_eq!(problem.num_variables(), 0);
        assert_eq!(problem.num_constraint_rows(), 0);
        let j = problem.jacobian_of_constraints().unwrap();
        assert_eq!((j.rows(), j.cols()), (0, 0));
        assert_eq!(problem.cost().unwrap(), 0.0);
    }
}
