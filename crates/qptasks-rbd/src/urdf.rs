//! URDF loading using `urdf-rs`.
//!
//! Converts `urdf_rs` types into a [`MultiBody`]. The root link is attached
//! to the world with a free joint (floating base) or a fixed joint.

use std::collections::HashSet;
use std::path::Path;

use nalgebra::{Isometry3, Matrix3, Rotation3, Translation3, Unit, UnitQuaternion, Vector3};

use crate::body::Body;
use crate::error::RbdError;
use crate::joint::{Joint, JointType};
use crate::multibody::{MultiBody, MultiBodyBuilder};

/// Name given to the joint attaching the root link to the world.
pub const ROOT_JOINT_NAME: &str = "root";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a URDF file from disk into a [`MultiBody`].
pub fn parse_file(path: impl AsRef<Path>, floating_base: bool) -> Result<MultiBody, RbdError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| RbdError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_string(&content, floating_base)
}

/// Parse a URDF XML string into a [`MultiBody`].
pub fn parse_string(xml: &str, floating_base: bool) -> Result<MultiBody, RbdError> {
    let robot = urdf_rs::read_from_string(xml).map_err(|e| RbdError::Parse(e.to_string()))?;
    convert_robot(&robot, floating_base)
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn convert_robot(robot: &urdf_rs::Robot, floating_base: bool) -> Result<MultiBody, RbdError> {
    let child_links: HashSet<&str> = robot.joints.iter().map(|j| j.child.link.as_str()).collect();
    let root = robot
        .links
        .iter()
        .find(|l| !child_links.contains(l.name.as_str()))
        .ok_or(RbdError::NoRootLink)?
        .name
        .clone();

    let mut builder = robot
        .links
        .iter()
        .fold(MultiBodyBuilder::new(), |b, l| b.body(convert_link(l)));
    for joint in &robot.joints {
        builder = builder.joint(
            joint.parent.link.as_str(),
            joint.child.link.as_str(),
            convert_joint(joint)?,
            convert_pose(&joint.origin),
        );
    }

    let root_type = if floating_base {
        JointType::Free
    } else {
        JointType::Fixed
    };
    let mb = builder.build(&root, Joint::new(ROOT_JOINT_NAME, root_type))?;
    tracing::debug!(
        robot = %robot.name,
        bodies = mb.nr_bodies(),
        dof = mb.nr_dof(),
        "loaded URDF model"
    );
    Ok(mb)
}

fn convert_link(link: &urdf_rs::Link) -> Body {
    let inertial = &link.inertial;
    let i = &inertial.inertia;
    let local = Matrix3::new(
        i.ixx, i.ixy, i.ixz, //
        i.ixy, i.iyy, i.iyz, //
        i.ixz, i.iyz, i.izz,
    );
    let rpy = &inertial.origin.rpy;
    let rot = Rotation3::from_euler_angles(rpy[0], rpy[1], rpy[2]);
    let inertia = rot.matrix() * local * rot.matrix().transpose();
    Body::new(
        link.name.clone(),
        inertial.mass.value,
        vec3(&inertial.origin.xyz),
        inertia,
    )
}

fn convert_joint(joint: &urdf_rs::Joint) -> Result<Joint, RbdError> {
    let axis = || {
        Unit::try_new(vec3(&joint.axis.xyz), 1e-9)
            .ok_or_else(|| RbdError::Parse(format!("joint {} has a zero axis", joint.name)))
    };
    let joint_type = match joint.joint_type {
        urdf_rs::JointType::Revolute | urdf_rs::JointType::Continuous => JointType::Revolute(axis()?),
        urdf_rs::JointType::Prismatic => JointType::Prismatic(axis()?),
        urdf_rs::JointType::Fixed => JointType::Fixed,
        urdf_rs::JointType::Floating => {
            return Err(RbdError::UnsupportedJointType("Floating".into()));
        }
        urdf_rs::JointType::Planar => {
            return Err(RbdError::UnsupportedJointType("Planar".into()));
        }
        urdf_rs::JointType::Spherical => {
            return Err(RbdError::UnsupportedJointType("Spherical".into()));
        }
    };

    let converted = Joint::new(joint.name.clone(), joint_type);
    // urdf-rs defaults effort to 0.0 when no <limit> is given.
    Ok(if joint_type.is_actuated() && joint.limit.effort > 0.0 {
        converted.with_effort_limit(joint.limit.effort)
    } else {
        converted
    })
}

fn convert_pose(pose: &urdf_rs::Pose) -> Isometry3<f64> {
    // URDF rpy is fixed-axis XYZ, which is nalgebra's Euler convention.
    Isometry3::from_parts(
        Translation3::from(vec3(&pose.xyz)),
        UnitQuaternion::from_euler_angles(pose.rpy[0], pose.rpy[1], pose.rpy[2]),
    )
}

fn vec3(v: &[f64; 3]) -> Vector3<f64> {
    Vector3::new(v[0], v[1], v[2])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
