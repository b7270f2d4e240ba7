//! Floating-base humanoid: free pelvis plus 24 revolute joints (30 dof).
//!
//! Legs have six joints each, the waist two, arms four each and the neck
//! two. With every joint at zero and the pelvis at [`PELVIS_HEIGHT`], both
//! foot soles rest on the plane z = 0.

use nalgebra::{Isometry3, Vector3};
use qptasks_rbd::{Body, Joint, JointType, MultiBody, MultiBodyBuilder, MultiBodyConfig};

/// Pelvis height that puts the soles on the ground at zero configuration.
pub const PELVIS_HEIGHT: f64 = 0.95;

/// Bodies carrying the sole contact points.
pub const FOOT_BODIES: [&str; 2] = ["l_foot", "r_foot"];

const LEG_EFFORT: f64 = 300.0;
const WAIST_EFFORT: f64 = 200.0;
const ARM_EFFORT: f64 = 80.0;
const NECK_EFFORT: f64 = 20.0;

fn revolute(name: &str, axis: nalgebra::Unit<Vector3<f64>>, effort: f64) -> Joint {
    Joint::new(name, JointType::Revolute(axis)).with_effort_limit(effort)
}

fn link(name: &str, mass: f64, com: Vector3<f64>, size: Vector3<f64>) -> Body {
    Body::cuboid(name, mass, com, size)
}

fn small(name: &str, mass: f64) -> Body {
    link(name, mass, Vector3::zeros(), Vector3::repeat(0.06))
}

fn add_leg(b: MultiBodyBuilder, side: &str, sign: f64) -> MultiBodyBuilder {
    let n = |s: &str| format!("{side}_{s}");
    b.body(small(&n("hip_yaw_link"), 1.0))
        .body(small(&n("hip_roll_link"), 1.0))
        .body(link(&n("thigh"), 4.0, Vector3::new(0.0, 0.0, -0.2), Vector3::new(0.1, 0.1, 0.4)))
        .body(link(&n("shin"), 3.0, Vector3::new(0.0, 0.0, -0.2), Vector3::new(0.08, 0.08, 0.4)))
        .body(small(&n("ankle_link"), 0.5))
        .body(link(&n("foot"), 1.0, Vector3::new(0.03, 0.0, -0.03), Vector3::new(0.24, 0.12, 0.05)))
        .joint(
            "pelvis",
            n("hip_yaw_link"),
            revolute(&n("hip_yaw"), Vector3::z_axis(), LEG_EFFORT),
            Isometry3::translation(0.0, 0.1 * sign, -0.1),
        )
        .joint(
            n("hip_yaw_link"),
            n("hip_roll_link"),
            revolute(&n("hip_roll"), Vector3::x_axis(), LEG_EFFORT),
            Isometry3::identity(),
        )
        .joint(
            n("hip_roll_link"),
            n("thigh"),
            revolute(&n("hip_pitch"), Vector3::y_axis(), LEG_EFFORT),
            Isometry3::identity(),
        )
        .joint(
            n("thigh"),
            n("shin"),
            revolute(&n("knee"), Vector3::y_axis(), LEG_EFFORT),
            Isometry3::translation(0.0, 0.0, -0.4),
        )
        .joint(
            n("shin"),
            n("ankle_link"),
            revolute(&n("ankle_pitch"), Vector3::y_axis(), LEG_EFFORT),
            Isometry3::translation(0.0, 0.0, -0.4),
        )
        .joint(
            n("ankle_link"),
            n("foot"),
            revolute(&n("ankle_roll"), Vector3::x_axis(), LEG_EFFORT),
            Isometry3::identity(),
        )
}

fn add_arm(b: MultiBodyBuilder, side: &str, sign: f64) -> MultiBodyBuilder {
    let n = |s: &str| format!("{side}_{s}");
    b.body(small(&n("shoulder_pitch_link"), 0.5))
        .body(small(&n("shoulder_roll_link"), 0.5))
        .body(link(&n("upper_arm"), 2.0, Vector3::new(0.0, 0.0, -0.14), Vector3::new(0.06, 0.06, 0.28)))
        .body(link(&n("forearm"), 1.5, Vector3::new(0.0, 0.0, -0.12), Vector3::new(0.05, 0.05, 0.24)))
        .joint(
            "chest",
            n("shoulder_pitch_link"),
            revolute(&n("shoulder_pitch"), Vector3::y_axis(), ARM_EFFORT),
            Isometry3::translation(0.0, 0.22 * sign, 0.35),
        )
        .joint(
            n("shoulder_pitch_link"),
            n("shoulder_roll_link"),
            revolute(&n("shoulder_roll"), Vector3::x_axis(), ARM_EFFORT),
            Isometry3::identity(),
        )
        .joint(
            n("shoulder_roll_link"),
            n("upper_arm"),
            revolute(&n("shoulder_yaw"), Vector3::z_axis(), ARM_EFFORT),
            Isometry3::identity(),
        )
        .joint(
            n("upper_arm"),
            n("forearm"),
            revolute(&n("elbow"), Vector3::y_axis(), ARM_EFFORT),
            Isometry3::translation(0.0, 0.0, -0.28),
        )
}

/// Build the humanoid. Panics only if the hard-coded tree is inconsistent.
pub fn humanoid() -> MultiBody {
    let mut b = MultiBodyBuilder::new().body(link(
        "pelvis",
        10.0,
        Vector3::zeros(),
        Vector3::new(0.25, 0.3, 0.2),
    ));
    b = add_leg(b, "l", 1.0);
    b = add_leg(b, "r", -1.0);
    b = b
        .body(small("waist_link", 1.0))
        .body(link("chest", 12.0, Vector3::new(0.0, 0.0, 0.2), Vector3::new(0.25, 0.35, 0.4)))
        .joint(
            "pelvis",
            "waist_link",
            revolute("waist_yaw", Vector3::z_axis(), WAIST_EFFORT),
            Isometry3::translation(0.0, 0.0, 0.1),
        )
        .joint(
            "waist_link",
            "chest",
            revolute("waist_pitch", Vector3::y_axis(), WAIST_EFFORT),
            Isometry3::identity(),
        );
    b = add_arm(b, "l", 1.0);
    b = add_arm(b, "r", -1.0);
    b.body(small("neck_link", 0.5))
        .body(link("head", 4.0, Vector3::new(0.0, 0.0, 0.1), Vector3::repeat(0.2)))
        .joint(
            "chest",
            "neck_link",
            revolute("neck_yaw", Vector3::z_axis(), NECK_EFFORT),
            Isometry3::translation(0.0, 0.0, 0.45),
        )
        .joint(
            "neck_link",
            "head",
            revolute("neck_pitch", Vector3::y_axis(), NECK_EFFORT),
            Isometry3::identity(),
        )
        .build("pelvis", Joint::new("root", JointType::Free))
        .expect("humanoid tree is valid")
}

/// Zero joint angles, pelvis upright at [`PELVIS_HEIGHT`], kinematics fresh.
pub fn standing_config(mb: &MultiBody) -> MultiBodyConfig {
    let mut mbc = MultiBodyConfig::new(mb);
    mbc.q[0] = vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, PELVIS_HEIGHT];
    crate::refresh(mb, &mut mbc);
    mbc
}

/// Four sole corners in the foot frame.
pub fn foot_points() -> Vec<Vector3<f64>> {
    vec![
        Vector3::new(0.1, 0.05, -0.05),
        Vector3::new(0.1, -0.05, -0.05),
        Vector3::new(-0.1, 0.05, -0.05),
        Vector3::new(-0.1, -0.05, -0.05),
    ]
}

/// Sole normals in the foot frame, one per point of [`foot_points`].
pub fn foot_normals() -> Vec<Vector3<f64>> {
    vec![Vector3::z(); 4]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
