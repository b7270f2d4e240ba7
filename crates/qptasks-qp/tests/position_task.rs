//! Set-point feedback on a position task.

use approx::assert_relative_eq;
use nalgebra::Vector3;
use qptasks_qp::{HighLevelTask, PositionTask, SetPointTask, SolverData, Task};
use qptasks_rbd::{MultiBody, MultiBodyConfig};
use qptasks_test_utils::{humanoid, refresh};

/// Humanoid with its pelvis at the world origin.
fn pelvis_at_origin(mb: &MultiBody) -> MultiBodyConfig {
    let mut mbc = MultiBodyConfig::new(mb);
    mbc.q[0] = vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    refresh(mb, &mut mbc);
    mbc
}

fn pelvis_task(mb: &MultiBody, target: Vector3<f64>, stiffness: f64, weight: f64) -> SetPointTask<PositionTask> {
    SetPointTask::new(PositionTask::new(mb, "pelvis", target).unwrap(), stiffness, weight)
}

#[test]
fn unit_error_toward_target() {
    let mb = humanoid();
    let mbc = pelvis_at_origin(&mb);
    let data = SolverData::new(&mb, &[], 1).unwrap();
    let mut task = pelvis_task(&mb, Vector3::new(1.0, 0.0, 0.0), 100.0, 10.0);
    task.update(&mb, &mbc, &data).unwrap();

    let e = task.task().eval();
    assert_relative_eq!(e.norm(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(e[0], 1.0, epsilon = 1e-12);
    assert_eq!(task.q().shape(), (30, 30));
    assert_eq!(task.c().len(), 30);
}

#[test]
fn weight_scales_q_and_c_linearly() {
    let mb = humanoid();
    let mbc = pelvis_at_origin(&mb);
    let data = SolverData::new(&mb, &[], 1).unwrap();
    let target = Vector3::new(1.0, 0.0, 0.0);

    let mut light = pelvis_task(&mb, target, 100.0, 10.0);
    let mut heavy = pelvis_task(&mb, target, 100.0, 100.0);
    light.update(&mb, &mbc, &data).unwrap();
    heavy.update(&mb, &mbc, &data).unwrap();

    assert_relative_eq!(heavy.q().clone(), light.q() * 10.0, epsilon = 1e-9);
    assert_relative_eq!(heavy.c().clone(), light.c() * 10.0, epsilon = 1e-9);
    assert_relative_eq!(heavy.task().eval().clone(), light.task().eval().clone());

    // Live reweighting reaches the same objective.
    light.set_weight(100.0);
    light.update(&mb, &mbc, &data).unwrap();
    assert_relative_eq!(heavy.c().clone(), light.c().clone(), epsilon = 1e-9);
}

#[test]
fn pelvis_translation_is_driven_directly() {
    let mb = humanoid();
    let mbc = pelvis_at_origin(&mb);
    let data = SolverData::new(&mb, &[], 1).unwrap();
    let mut task = pelvis_task(&mb, Vector3::new(1.0, 0.0, 0.0), 100.0, 10.0);
    task.update(&mb, &mbc, &data).unwrap();

    // Base x translation column: C = -w·k·e.
    assert_relative_eq!(task.c()[3], -10.0 * 100.0, epsilon = 1e-9);
    assert_relative_eq!(task.q()[(3, 3)], 10.0, epsilon = 1e-12);
    // Leg joints do not move the pelvis.
    assert_relative_eq!(task.c().rows(6, 24).norm(), 0.0, epsilon = 1e-12);
}

#[test]
fn zero_error_leaves_only_velocity_terms() {
    let mb = humanoid();
    let mut mbc = pelvis_at_origin(&mb);
    let data = SolverData::new(&mb, &[], 1).unwrap();

    // At rest with zero error the objective has no linear term.
    let mut task = pelvis_task(&mb, Vector3::zeros(), 100.0, 10.0);
    task.update(&mb, &mbc, &data).unwrap();
    assert_relative_eq!(task.c().norm(), 0.0, epsilon = 1e-12);

    // Moving, the linear term does not depend on stiffness.
    let forearm = mb.body_index_by_name("l_forearm").unwrap();
    mbc.alpha[0] = vec![0.0, 0.0, 2.0, 0.1, 0.0, 0.0];
    refresh(&mb, &mut mbc);
    let on_forearm = |stiffness: f64| {
        let target = mbc.body_pos_w[forearm].translation.vector;
        let mut task = SetPointTask::new(PositionTask::new(&mb, "l_forearm", target).unwrap(), stiffness, 10.0);
        task.set_damping(0.0);
        task.update(&mb, &mbc, &data).unwrap();
        task
    };
    let soft = on_forearm(1.0);
    let stiff = on_forearm(400.0);
    assert_relative_eq!(soft.c().clone(), stiff.c().clone(), epsilon = 1e-9);

    // With no damping what remains is the J_dot·alpha coupling: C = w Jᵀ J_dot alpha.
    let jac = stiff.task().jac();
    let expected = jac.transpose() * stiff.task().normal_acc() * 10.0;
    assert_relative_eq!(stiff.c().clone(), expected, epsilon = 1e-9);
    assert!(stiff.c().norm() > 1e-6);
}
