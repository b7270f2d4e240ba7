//! Variable layout and active-set bookkeeping through the public API.

use nalgebra::Vector3;
use qptasks_qp::{
    Constraint, Contact, ContactAccConstr, FrictionConeConstr, MotionConstr, PostureTask, QpSolver, SolverConfig,
    TorqueBounds,
};
use qptasks_test_utils::{foot_normals, foot_points, humanoid, standing_config};

fn foot(mb: &qptasks_rbd::MultiBody, name: &str) -> Contact {
    Contact::on_body(mb, name, foot_points(), foot_normals()).unwrap()
}

#[test]
fn blocks_always_sum_to_nr_vars() {
    let mb = humanoid();
    let hand = Contact::on_body(&mb, "l_forearm", vec![Vector3::new(0.0, 0.0, -0.25)], vec![Vector3::x()]).unwrap();
    let mut solver = QpSolver::new(SolverConfig::default()).unwrap();

    for contacts in [
        vec![],
        vec![foot(&mb, "l_foot")],
        vec![foot(&mb, "l_foot"), foot(&mb, "r_foot")],
        vec![foot(&mb, "r_foot"), hand],
    ] {
        let layout = solver.nr_vars(&mb, &contacts).unwrap();
        let points: usize = contacts.iter().map(Contact::nr_points).sum();
        assert_eq!(layout.alpha_d + layout.lambda + layout.torque, layout.nr_vars());
        assert_eq!(layout.lambda, 3 * points);
        assert_eq!(solver.layout(), Some(layout));
    }
}

#[test]
fn one_foot_scenario_sizes_motion_constraint() {
    let mb = humanoid();
    let mut solver = QpSolver::new(SolverConfig::default()).unwrap();
    let motion = solver.add_constraint(MotionConstr::new(&mb, TorqueBounds::from_model(&mb)).unwrap());
    let acc = solver.add_constraint(ContactAccConstr::new());

    let layout = solver.nr_vars(&mb, &[foot(&mb, "l_foot")]).unwrap();
    assert_eq!(layout.lambda, 12);
    assert_eq!(layout.alpha_d, 30);

    let motion = solver.constraint(motion).unwrap();
    assert_eq!(motion.equality().unwrap().nr_eq_lines(), 30);
    assert_eq!(motion.bound().unwrap().len(), 24);
    assert_eq!(motion.bound().unwrap().begin_var(), layout.torque_begin());
    assert_eq!(solver.constraint(acc).unwrap().equality().unwrap().nr_eq_lines(), 12);
}

#[test]
fn contact_acc_rows_follow_contact_changes() {
    let mb = humanoid();
    let mbc = standing_config(&mb);
    let mut solver = QpSolver::new(SolverConfig::default()).unwrap();
    solver.add_constraint(MotionConstr::new(&mb, TorqueBounds::from_model(&mb)).unwrap());
    let acc = solver.add_constraint(ContactAccConstr::new());
    solver.add_task(PostureTask::new(&mb, mbc.q.clone(), 1.0, 1.0).unwrap());

    for contacts in [vec![foot(&mb, "l_foot"), foot(&mb, "r_foot")], vec![foot(&mb, "r_foot")]] {
        solver.nr_vars(&mb, &contacts).unwrap();
        let rows = solver.constraint(acc).unwrap().equality().unwrap().nr_eq_lines();
        let points: usize = contacts.iter().map(Contact::nr_points).sum();
        assert_eq!(rows, 3 * points);
    }
}

#[test]
fn set_membership_round_trips() {
    let mb = humanoid();
    let mut solver = QpSolver::new(SolverConfig::default()).unwrap();
    solver.add_constraint(MotionConstr::new(&mb, TorqueBounds::from_model(&mb)).unwrap());
    let counts = |s: &QpSolver| {
        (
            s.nr_tasks(),
            s.nr_constraints(),
            s.nr_equality_constraints(),
            s.nr_inequality_constraints(),
            s.nr_bound_constraints(),
        )
    };
    let before = counts(&solver);

    let cone = solver.add_constraint(FrictionConeConstr::new(0.5));
    let posture = solver.add_task(PostureTask::new(&mb, standing_config(&mb).q, 1.0, 1.0).unwrap());
    assert_eq!(counts(&solver), (1, 2, 1, 1, 1));

    let cone = solver.remove_constraint(cone).unwrap();
    let posture = solver.remove_task(posture).unwrap();
    assert_eq!(counts(&solver), before);
    assert!((cone.mu() - 0.5).abs() < f64::EPSILON);
    assert_eq!(posture.posture(), standing_config(&mb).q.as_slice());
}

#[test]
fn reset_tasks_then_resolve() {
    let mb = humanoid();
    let mbc = standing_config(&mb);
    let mut solver = QpSolver::new(SolverConfig::default()).unwrap();
    solver.add_constraint(MotionConstr::new(&mb, TorqueBounds::from_model(&mb)).unwrap());
    solver.add_constraint(ContactAccConstr::new());
    solver.add_task(PostureTask::new(&mb, mbc.q.clone(), 1.0, 1.0).unwrap());
    solver.nr_vars(&mb, &[foot(&mb, "l_foot"), foot(&mb, "r_foot")]).unwrap();

    let removed = solver.reset_tasks();
    assert_eq!(removed.len(), 1);
    assert_eq!(solver.nr_equality_constraints(), 2);
    assert_eq!(solver.nr_bound_constraints(), 1);

    // Only the regularization objective remains.
    let sol = solver.update(&mb, &mbc).unwrap();
    assert_eq!(sol.contact_forces.len(), 2);
    assert_eq!(sol.lambda.len(), 24);
}
