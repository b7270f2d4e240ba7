//! Static topology of an articulated rigid-body system.
//!
//! A [`MultiBody`] stores bodies in topological order (every parent comes
//! before its children). Joint `i` is the joint whose child is body `i`, so
//! bodies and joints share indices. The root body is attached to the world
//! by joint 0 (typically [`JointType::Free`] for a floating base or
//! [`JointType::Fixed`] for a bolted arm).

use std::collections::HashMap;

use nalgebra::Isometry3;

use crate::body::Body;
use crate::error::RbdError;
use crate::joint::{Joint, JointType};

/// Topology and inertial parameters of a kinematic tree.
#[derive(Debug, Clone)]
pub struct MultiBody {
    bodies: Vec<Body>,
    joints: Vec<Joint>,
    parents: Vec<Option<usize>>,
    /// Static transform from the parent body frame to joint `i`'s frame.
    transforms: Vec<Isometry3<f64>>,
    q_offsets: Vec<usize>,
    dof_offsets: Vec<usize>,
    nr_params: usize,
    nr_dof: usize,
    actuated_dofs: Vec<usize>,
    body_names: HashMap<String, usize>,
    joint_names: HashMap<String, usize>,
}

impl MultiBody {
    pub fn nr_bodies(&self) -> usize {
        self.bodies.len()
    }

    pub fn nr_joints(&self) -> usize {
        self.joints.len()
    }

    /// Total configuration parameters (quaternion counts 4).
    pub const fn nr_params(&self) -> usize {
        self.nr_params
    }

    /// Total velocity degrees of freedom.
    pub const fn nr_dof(&self) -> usize {
        self.nr_dof
    }

    /// Degrees of freedom a motor can drive (free joints excluded).
    pub fn nr_actuated_dof(&self) -> usize {
        self.actuated_dofs.len()
    }

    /// Dof indices driven by the torque vector, in torque order.
    pub fn actuated_dofs(&self) -> &[usize] {
        &self.actuated_dofs
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, index: usize) -> &Body {
        &self.bodies[index]
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint(&self, index: usize) -> &Joint {
        &self.joints[index]
    }

    /// Parent body of body `index`, `None` for the root.
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents[index]
    }

    /// Static transform from the parent body frame to joint `index`.
    pub fn transform(&self, index: usize) -> &Isometry3<f64> {
        &self.transforms[index]
    }

    /// First configuration parameter of joint `index`.
    pub fn q_offset(&self, index: usize) -> usize {
        self.q_offsets[index]
    }

    /// First velocity dof of joint `index`.
    pub fn dof_offset(&self, index: usize) -> usize {
        self.dof_offsets[index]
    }

    /// Whether the root joint is a free joint.
    pub fn has_floating_base(&self) -> bool {
        self.joints
            .first()
            .is_some_and(|j| j.joint_type == JointType::Free)
    }

    /// Sum of all body masses.
    pub fn total_mass(&self) -> f64 {
        self.bodies.iter().map(|b| b.mass).sum()
    }

    /// Look up a body index by name.
    pub fn body_index_by_name(&self, name: &str) -> Result<usize, RbdError> {
        self.body_names
            .get(name)
            .copied()
            .ok_or_else(|| RbdError::UnknownBody(name.into()))
    }

    /// Look up a joint index by name.
    pub fn joint_index_by_name(&self, name: &str) -> Result<usize, RbdError> {
        self.joint_names
            .get(name)
            .copied()
            .ok_or_else(|| RbdError::UnknownJoint(name.into()))
    }

    /// Check that `index` names a body of this model.
    pub fn check_body_index(&self, index: usize) -> Result<(), RbdError> {
        if index < self.bodies.len() {
            Ok(())
        } else {
            Err(RbdError::BodyIndexOutOfRange {
                index,
                nr_bodies: self.bodies.len(),
            })
        }
    }

    /// Joints between the world and body `index`, root first.
    pub fn path_to(&self, index: usize) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = Some(index);
        while let Some(i) = current {
            path.push(i);
            current = self.parents[i];
        }
        path.reverse();
        path
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

struct Link {
    parent: String,
    child: String,
    joint: Joint,
    origin: Isometry3<f64>,
}

/// Incremental construction of a [`MultiBody`].
///
/// Bodies and joints may be added in any order; [`build`](Self::build)
/// sorts them topologically starting from the root body.
#[derive(Default)]
pub struct MultiBodyBuilder {
    bodies: Vec<Body>,
    links: Vec<Link>,
}

impl MultiBodyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body.
    #[must_use]
    pub fn body(mut self, body: Body) -> Self {
        self.bodies.push(body);
        self
    }

    /// Connect `child` to `parent` through `joint`, placed at `origin` in the
    /// parent body frame.
    #[must_use]
    pub fn joint(
        mut self,
        parent: impl Into<String>,
        child: impl Into<String>,
        joint: Joint,
        origin: Isometry3<f64>,
    ) -> Self {
        self.links.push(Link {
            parent: parent.into(),
            child: child.into(),
            joint,
            origin,
        });
        self
    }

    /// Finish the model. `root_joint` attaches `root` to the world frame.
    pub fn build(self, root: &str, root_joint: Joint) -> Result<MultiBody, RbdError> {
        let mut by_name: HashMap<&str, usize> = HashMap::new();
        for (i, b) in self.bodies.iter().enumerate() {
            if by_name.insert(b.name.as_str(), i).is_some() {
                return Err(RbdError::InvalidTree(format!("duplicate body name {}", b.name)));
            }
        }
        if !by_name.contains_key(root) {
            return Err(RbdError::UnknownBody(root.into()));
        }

        let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut has_parent: HashMap<&str, bool> = HashMap::new();
        for (i, link) in self.links.iter().enumerate() {
            for name in [&link.parent, &link.child] {
                if !by_name.contains_key(name.as_str()) {
                    return Err(RbdError::UnknownBody(name.clone()));
                }
            }
            if link.child == root || has_parent.insert(link.child.as_str(), true).is_some() {
                return Err(RbdError::InvalidTree(format!(
                    "body {} has more than one parent",
                    link.child
                )));
            }
            children.entry(link.parent.as_str()).or_default().push(i);
        }

        // Depth-first traversal from the root fixes the topological order.
        let mut order: Vec<(usize, Option<usize>, Joint, Isometry3<f64>)> = Vec::new();
        let mut stack = vec![(by_name[root], None, root_joint, Isometry3::identity())];
        while let Some((body, parent, joint, origin)) = stack.pop() {
            let index = order.len();
            let name = self.bodies[body].name.as_str();
            if let Some(links) = children.get(name) {
                for &l in links.iter().rev() {
                    let link = &self.links[l];
                    stack.push((
                        by_name[link.child.as_str()],
                        Some(index),
                        link.joint.clone(),
                        link.origin,
                    ));
                }
            }
            order.push((body, parent, joint, origin));
        }

        if order.len() != self.bodies.len() {
            return Err(RbdError::InvalidTree(format!(
                "{} bodies are not reachable from root {root}",
                self.bodies.len() - order.len()
            )));
        }

        let mut mb = MultiBody {
            bodies: Vec::with_capacity(order.len()),
            joints: Vec::with_capacity(order.len()),
            parents: Vec::with_capacity(order.len()),
            transforms: Vec::with_capacity(order.len()),
            q_offsets: Vec::with_capacity(order.len()),
            dof_offsets: Vec::with_capacity(order.len()),
            nr_params: 0,
            nr_dof: 0,
            actuated_dofs: Vec::new(),
            body_names: HashMap::new(),
            joint_names: HashMap::new(),
        };

        for (index, (body, parent, joint, origin)) in order.into_iter().enumerate() {
            if mb.joint_names.insert(joint.name.clone(), index).is_some() {
                return Err(RbdError::InvalidTree(format!("duplicate joint name {}", joint.name)));
            }
            if joint.joint_type == JointType::Free && parent.is_some() {
                return Err(RbdError::InvalidTree(format!(
                    "free joint {} must attach the root body",
                    joint.name
                )));
            }
            let body = self.bodies[body].clone();
            mb.body_names.insert(body.name.clone(), index);

            mb.q_offsets.push(mb.nr_params);
            mb.dof_offsets.push(mb.nr_dof);
            if joint.joint_type.is_actuated() {
                mb.actuated_dofs.extend(mb.nr_dof..mb.nr_dof + joint.dof());
            }
            mb.nr_params += joint.params();
            mb.nr_dof += joint.dof();

            mb.bodies.push(body);
            mb.joints.push(joint);
            mb.parents.push(parent);
            mb.transforms.push(origin);
        }

        Ok(mb)
    }
}
