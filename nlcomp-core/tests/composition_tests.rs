//! Integration tests for the composition layer: the 9-waypoint, 7-DOF
//! trajectory layout the velocity-smoother driver uses.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use nlcomp_core::{
    link_and_add, ComposeError, ConstraintSet, JointPosConstraint, JointVelConstraint,
    Problem, SharedBlock, SharedConstraint, SquaredCost, VariableBlock,
};

const NUM_WAYPOINTS: usize = 9;
const NUM_JOINTS: usize = 7;

/// Build the smoother's variable layout: 9 blocks of 7 joints, all ones.
fn trajectory_problem() -> (Problem, Vec<SharedBlock>) {
    let mut nlp = Problem::new();
    let mut blocks = Vec::new();
    for i in 0..NUM_WAYPOINTS {
        let block =
            VariableBlock::new(format!("joint_position_{i}"), vec![1.0; NUM_JOINTS]).into_shared();
        nlp.add_variable_set(Rc::clone(&block)).unwrap();
        blocks.push(block);
    }
    (nlp, blocks)
}

fn dense(m: &nlcomp_core::SparseCsc) -> Vec<Vec<f64>> {
    let mut out = vec![vec![0.0; m.cols()]; m.rows()];
    for (&val, (r, c)) in m.iter() {
        out[r][c] += val;
    }
    out
}

#[test]
fn variable_round_trip_is_idempotent() {
    let (mut nlp, _) = trajectory_problem();
    assert_eq!(nlp.num_variables(), NUM_WAYPOINTS * NUM_JOINTS);

    let x = nlp.values();
    assert!(x.iter().all(|&v| v == 1.0));
    nlp.set_values(&x).unwrap();
    assert_eq!(nlp.values(), x);
}

#[test]
fn velocity_constraint_dimensions_and_pattern() {
    let (mut nlp, blocks) = trajectory_problem();

    let vel = JointVelConstraint::new("joint_velocity", vec![0.0; NUM_JOINTS], blocks).unwrap();
    let vel: SharedConstraint = Rc::new(RefCell::new(vel));
    link_and_add(&mut nlp, Rc::clone(&vel)).unwrap();

    // M = (K-1) * N = 8 * 7 = 56
    assert_eq!(nlp.num_constraint_rows(), 56);

    // All-ones trajectory: every pairwise difference is zero.
    let r = nlp.evaluate_constraints().unwrap();
    assert!(r.iter().all(|&v| v == 0.0), "residual not zero: {r:?}");

    // Row k*N + j has -1 at p_k's column j and +1 at p_{k+1}'s column j.
    let j = dense(&nlp.jacobian_of_constraints().unwrap());
    for k in 0..NUM_WAYPOINTS - 1 {
        for joint in 0..NUM_JOINTS {
            let row = &j[k * NUM_JOINTS + joint];
            for col in 0..NUM_WAYPOINTS * NUM_JOINTS {
                let expected = if col == k * NUM_JOINTS + joint {
                    -1.0
                } else if col == (k + 1) * NUM_JOINTS + joint {
                    1.0
                } else {
                    0.0
                };
                assert_eq!(row[col], expected, "row {} col {col}", k * NUM_JOINTS + joint);
            }
        }
    }
}

#[test]
fn position_and_velocity_rows_are_disjoint() {
    let (mut nlp, blocks) = trajectory_problem();

    let start = JointPosConstraint::new(
        "start_position",
        vec![0.0; NUM_JOINTS],
        vec![Rc::clone(&blocks[0])],
    )
    .unwrap();
    let start: SharedConstraint = Rc::new(RefCell::new(start));
    link_and_add(&mut nlp, start).unwrap();

    let end = JointPosConstraint::new(
        "end_position",
        vec![1.0; NUM_JOINTS],
        vec![Rc::clone(&blocks[8])],
    )
    .unwrap();
    let end: SharedConstraint = Rc::new(RefCell::new(end));
    link_and_add(&mut nlp, end).unwrap();

    assert_eq!(nlp.num_constraint_rows(), 2 * NUM_JOINTS);

    let j = dense(&nlp.jacobian_of_constraints().unwrap());

    // Start rows: identity on block 0's columns, zero elsewhere.
    for i in 0..NUM_JOINTS {
        for col in 0..NUM_WAYPOINTS * NUM_JOINTS {
            let expected = if col == i { 1.0 } else { 0.0 };
            assert_eq!(j[i][col], expected);
        }
    }
    // End rows: identity on block 8's columns.
    let end_offset = 8 * NUM_JOINTS;
    for i in 0..NUM_JOINTS {
        for col in 0..NUM_WAYPOINTS * NUM_JOINTS {
            let expected = if col == end_offset + i { 1.0 } else { 0.0 };
            assert_eq!(j[NUM_JOINTS + i][col], expected);
        }
    }

    // Residuals: start sees ones - zeros, end sees ones - ones.
    let r = nlp.evaluate_constraints().unwrap();
    assert_eq!(&r[..NUM_JOINTS], &[1.0; NUM_JOINTS]);
    assert_eq!(&r[NUM_JOINTS..], &[0.0; NUM_JOINTS]);
}

#[test]
fn squared_velocity_cost_matches_chain_rule() {
    let (mut nlp, blocks) = trajectory_problem();

    // Make the trajectory non-trivial so the gradient has structure.
    let n = nlp.num_variables();
    let x: Vec<f64> = (0..n).map(|i| (i as f64) * 0.01).collect();
    nlp.set_values(&x).unwrap();

    let vel = JointVelConstraint::new("joint_velocity", vec![0.0; NUM_JOINTS], blocks).unwrap();
    let vel: SharedConstraint = Rc::new(RefCell::new(vel));
    vel.borrow_mut().link_with_variables(nlp.variables()).unwrap();

    let cost = SquaredCost::new(Rc::clone(&vel)).unwrap();
    nlp.add_cost_set(Box::new(cost)).unwrap();

    // Cost value: sum of squared pairwise differences.
    let r = vel.borrow().values().unwrap();
    let expected: f64 = r.iter().map(|v| v * v).sum();
    assert_relative_eq!(nlp.cost().unwrap(), expected, max_relative = 1e-12);

    // Gradient: 2 rᵗ J, computed densely for comparison.
    let mut jtri = nlcomp_core::SparseTriplets::new((r.len(), n));
    vel.borrow().fill_jacobian(&mut jtri, 0).unwrap();
    let jd = dense(&jtri.to_csc());
    let mut expected_grad = vec![0.0; n];
    for (row, ri) in r.iter().enumerate() {
        for (col, g) in expected_grad.iter_mut().enumerate() {
            *g += 2.0 * ri * jd[row][col];
        }
    }

    let grad = dense(&nlp.jacobian_of_costs().unwrap());
    for col in 0..n {
        assert_relative_eq!(grad[0][col], expected_grad[col], max_relative = 1e-12);
    }
}

#[test]
fn unlinked_constraint_cannot_enter_the_problem() {
    let (mut nlp, blocks) = trajectory_problem();
    let vel = JointVelConstraint::new("joint_velocity", vec![0.0; NUM_JOINTS], blocks).unwrap();
    let vel: SharedConstraint = Rc::new(RefCell::new(vel));

    // Jacobian query before linking fails, it does not return zeros.
    let mut tri = nlcomp_core::SparseTriplets::new((56, nlp.num_variables()));
    assert!(matches!(
        vel.borrow().fill_jacobian(&mut tri, 0),
        Err(ComposeError::NotLinked(_))
    ));

    // And the assembler refuses to register it.
    assert!(matches!(
        nlp.add_constraint_set(vel),
        Err(ComposeError::NotLinked(_))
    ));
}

#[test]
fn linking_against_a_foreign_set_reports_unknown_variable() {
    let (nlp, _) = trajectory_problem();
    let stray = VariableBlock::new("not_registered", vec![0.0; NUM_JOINTS]).into_shared();
    let mut pin =
        JointPosConstraint::new("stray_pin", vec![0.0; NUM_JOINTS], vec![stray]).unwrap();
    assert!(matches!(
        pin.link_with_variables(nlp.variables()),
        Err(ComposeError::UnknownVariable(name)) if name == "not_registered"
    ));
    assert!(!pin.is_linked());
}

#[test]
fn print_current_does_not_mutate_state() {
    let (mut nlp, blocks) = trajectory_problem();
    let vel = JointVelConstraint::new("joint_velocity", vec![0.0; NUM_JOINTS], blocks).unwrap();
    let vel: SharedConstraint = Rc::new(RefCell::new(vel));
    link_and_add(&mut nlp, vel).unwrap();

    let before = nlp.values();
    nlp.print_current();
    assert_eq!(nlp.values(), before);
}
