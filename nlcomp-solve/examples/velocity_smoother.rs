//! Smooth a 9-waypoint, 7-DOF joint trajectory.
//!
//! Start pinned to zeros, end pinned to ones, squared joint-velocity cost
//! with zero target: the minimizer is linear interpolation between the
//! endpoints.
//!
//! Run with: cargo run -p nlcomp-solve --example velocity_smoother

use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

use nlcomp_core::{
    JointPosConstraint, JointVelConstraint, Problem, SharedConstraint, SquaredCost, VariableBlock,
};
use nlcomp_solve::{solve, SolveSettings};

const NUM_WAYPOINTS: usize = 9;
const NUM_JOINTS: usize = 7;

fn main() -> Result<(), Box<dyn Error>> {
    // 1) Variables: one position block per waypoint, initialized to ones.
    let mut nlp = Problem::new();
    let mut waypoints = Vec::new();
    for i in 0..NUM_WAYPOINTS {
        let block =
            VariableBlock::new(format!("joint_position_{i}"), vec![1.0; NUM_JOINTS]).into_shared();
        nlp.add_variable_set(Rc::clone(&block))?;
        waypoints.push(block);
    }

    // 2) Constraints: pin the first waypoint to zeros and the last to ones.
    let start = JointPosConstraint::new(
        "start_position",
        vec![0.0; NUM_JOINTS],
        vec![Rc::clone(&waypoints[0])],
    )?;
    let start: SharedConstraint = Rc::new(RefCell::new(start));
    start.borrow_mut().link_with_variables(nlp.variables())?;
    nlp.add_constraint_set(start)?;

    let end = JointPosConstraint::new(
        "end_position",
        vec![1.0; NUM_JOINTS],
        vec![Rc::clone(&waypoints[NUM_WAYPOINTS - 1])],
    )?;
    let end: SharedConstraint = Rc::new(RefCell::new(end));
    end.borrow_mut().link_with_variables(nlp.variables())?;
    nlp.add_constraint_set(end)?;

    // 3) Cost: squared joint velocity with zero target. The backing
    //    constraint is linked but only registered through the cost.
    let vel = JointVelConstraint::new(
        "joint_velocity",
        vec![0.0; NUM_JOINTS],
        waypoints.clone(),
    )?;
    let vel: SharedConstraint = Rc::new(RefCell::new(vel));
    vel.borrow_mut().link_with_variables(nlp.variables())?;
    nlp.add_cost_set(Box::new(SquaredCost::new(vel)?))?;

    nlp.print_current();
    let jac = nlp.jacobian_of_constraints()?;
    println!(
        "constraint Jacobian: {} x {}, {} nonzeros",
        jac.rows(),
        jac.cols(),
        jac.nnz()
    );
    let grad = nlp.jacobian_of_costs()?;
    println!("cost Jacobian: {} x {}, {} nonzeros", grad.rows(), grad.cols(), grad.nnz());

    // 4) Solve.
    let settings = SolveSettings {
        verbose: true,
        ..Default::default()
    };
    let result = solve(&mut nlp, &settings)?;
    println!("\nstatus: {:?}, iters: {}, cost: {:.6}", result.status, result.iters, result.cost);

    for block in &waypoints {
        let b = block.borrow();
        let values: Vec<String> = b.values().iter().map(|v| format!("{v:.4}")).collect();
        println!("{:<20} [{}]", b.name(), values.join(", "));
    }

    nlp.print_current();
    Ok(())
}
