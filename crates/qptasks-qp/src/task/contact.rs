//! Linear objectives on the contact force block.
//!
//! Both tasks act on the force variables of one contact only, so their
//! `Q`/`C` start at that contact's lambda offset rather than at zero. A
//! body with no active contact yields an empty block.

use nalgebra::{DMatrix, DVector, Point3, Vector3};
use qptasks_rbd::{MultiBody, MultiBodyConfig};

use super::{check_weight, Task};
use crate::error::QpError;
use crate::layout::{ContactData, LayoutStamp, SolverData};

/// Contact force block owned by a task, refreshed on every layout change.
#[derive(Default)]
struct ForceBlock {
    contact: Option<usize>,
    begin: usize,
    stamp: LayoutStamp,
}

impl ForceBlock {
    fn locate(&mut self, body: usize, data: &SolverData) -> usize {
        self.contact = data.contacts().iter().position(|c| c.body == body);
        let (begin, len) = self
            .contact
            .map_or((0, 0), |i| (data.contacts()[i].lambda_begin, 3 * data.contacts()[i].points.len()));
        self.begin = begin;
        self.stamp.mark(data);
        len
    }

    fn contact<'a>(&self, name: &str, data: &'a SolverData) -> Result<Option<&'a ContactData>, QpError> {
        self.stamp.check(name, data)?;
        Ok(self.contact.and_then(|i| data.contacts().get(i)))
    }
}

/// Minimizes or maximizes the normal force of the contact on one body.
///
/// The cost is `dir·w·Σ nᵢ·fᵢ` over the contact points, with `nᵢ` the world
/// normal and `dir = 1` to unload the contact or `-1` to press on it.
pub struct ContactTask {
    name: String,
    body: usize,
    dir: f64,
    weight: f64,
    block: ForceBlock,
    q: DMatrix<f64>,
    c: DVector<f64>,
}

impl ContactTask {
    /// Pushes the contact on `body` toward zero normal force.
    ///
    /// # Panics
    ///
    /// If `weight` is negative or not finite.
    pub fn minimize(body: usize, weight: f64) -> Self {
        Self::with_direction(body, 1.0, weight)
    }

    /// Pushes the contact on `body` toward a larger normal force.
    ///
    /// # Panics
    ///
    /// If `weight` is negative or not finite.
    pub fn maximize(body: usize, weight: f64) -> Self {
        Self::with_direction(body, -1.0, weight)
    }

    fn with_direction(body: usize, dir: f64, weight: f64) -> Self {
        check_weight(weight);
        Self {
            name: "contact".into(),
            body,
            dir,
            weight,
            block: ForceBlock::default(),
            q: DMatrix::zeros(0, 0),
            c: DVector::zeros(0),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub const fn body(&self) -> usize {
        self.body
    }

    pub fn is_minimizing(&self) -> bool {
        self.dir > 0.0
    }
}

impl Task for ContactTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn set_weight(&mut self, weight: f64) {
        check_weight(weight);
        self.weight = weight;
    }

    fn begin(&self) -> usize {
        self.block.begin
    }

    fn update_nr_vars(&mut self, _mb: &MultiBody, data: &SolverData) -> Result<(), QpError> {
        let len = self.block.locate(self.body, data);
        self.q = DMatrix::zeros(len, len);
        self.c = DVector::zeros(len);
        Ok(())
    }

    fn update(&mut self, _mb: &MultiBody, mbc: &MultiBodyConfig, data: &SolverData) -> Result<(), QpError> {
        let Some(contact) = self.block.contact(&self.name, data)? else {
            return Ok(());
        };
        let rot = mbc.body_pos_w[contact.body].rotation;
        let scale = self.dir * self.weight;
        for (i, normal) in contact.normals.iter().enumerate() {
            let n = (rot * normal).normalize() * scale;
            self.c.fixed_rows_mut::<3>(3 * i).copy_from(&n);
        }
        Ok(())
    }

    fn q(&self) -> &DMatrix<f64> {
        &self.q
    }

    fn c(&self) -> &DVector<f64> {
        &self.c
    }
}

/// Minimizes the moment of a contact's forces about an axis.
///
/// `origin` and `axis` are in the body frame. With world lever `rᵢ` from the
/// origin to point `i`, the moment is `Σ a·(rᵢ × fᵢ) = Σ (a × rᵢ)·fᵢ`, so the
/// cost is linear in the forces.
pub struct GripperTorqueTask {
    name: String,
    body: usize,
    origin: Vector3<f64>,
    axis: Vector3<f64>,
    weight: f64,
    block: ForceBlock,
    q: DMatrix<f64>,
    c: DVector<f64>,
}

impl GripperTorqueTask {
    /// # Panics
    ///
    /// If `weight` is negative or not finite.
    pub fn new(body: usize, origin: Vector3<f64>, axis: Vector3<f64>, weight: f64) -> Self {
        check_weight(weight);
        Self {
            name: "gripper_torque".into(),
            body,
            origin,
            axis,
            weight,
            block: ForceBlock::default(),
            q: DMatrix::zeros(0, 0),
            c: DVector::zeros(0),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub const fn origin(&self) -> &Vector3<f64> {
        &self.origin
    }

    pub const fn axis(&self) -> &Vector3<f64> {
        &self.axis
    }
}

impl Task for GripperTorqueTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn set_weight(&mut self, weight: f64) {
        check_weight(weight);
        self.weight = weight;
    }

    fn begin(&self) -> usize {
        self.block.begin
    }

    fn update_nr_vars(&mut self, _mb: &MultiBody, data: &SolverData) -> Result<(), QpError> {
        let len = self.block.locate(self.body, data);
        self.q = DMatrix::zeros(len, len);
        self.c = DVector::zeros(len);
        Ok(())
    }

    fn update(&mut self, _mb: &MultiBody, mbc: &MultiBodyConfig, data: &SolverData) -> Result<(), QpError> {
        let Some(contact) = self.block.contact(&self.name, data)? else {
            return Ok(());
        };
        let pose = mbc.body_pos_w[contact.body];
        let axis = pose.rotation * self.axis;
        let origin = pose * Point3::from(self.origin);
        for (i, point) in contact.points.iter().enumerate() {
            let lever = pose * Point3::from(*point) - origin;
            self.c
                .fixed_rows_mut::<3>(3 * i)
                .copy_from(&(axis.cross(&lever) * self.weight));
        }
        Ok(())
    }

    fn q(&self) -> &DMatrix<f64> {
        &self.q
    }

    fn c(&self) -> &DVector<f64> {
        &self.c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Contact;
    use crate::error::ConfigurationError;
    use approx::assert_relative_eq;
    use qptasks_test_utils::{foot_normals, foot_points, humanoid, planar_arm, refresh, standing_config};

    fn feet(mb: &MultiBody) -> Vec<Contact> {
        ["l_foot", "r_foot"]
            .iter()
            .map(|name| Contact::on_body(mb, name, foot_points(), foot_normals()).unwrap())
            .collect()
    }

    #[test]
    fn block_starts_at_own_contact() {
        let mb = humanoid();
        let right = mb.body_index_by_name("r_foot").unwrap();
        let data = SolverData::new(&mb, &feet(&mb), 1).unwrap();
        let mut task = ContactTask::minimize(right, 1.0);
        task.update_nr_vars(&mb, &data).unwrap();

        assert_eq!(task.begin(), data.contacts()[1].lambda_begin);
        assert_eq!(task.begin(), 30 + 12);
        assert_eq!(task.q().shape(), (12, 12));
        assert_eq!(task.c().len(), 12);
    }

    #[test]
    fn direction_flips_the_gradient() {
        let mb = humanoid();
        let mbc = standing_config(&mb);
        let left = mb.body_index_by_name("l_foot").unwrap();
        let data = SolverData::new(&mb, &feet(&mb), 1).unwrap();

        let mut unload = ContactTask::minimize(left, 2.0);
        let mut press = ContactTask::maximize(left, 2.0);
        for task in [&mut unload, &mut press] {
            task.update_nr_vars(&mb, &data).unwrap();
            task.update(&mb, &mbc, &data).unwrap();
        }

        let rot = mbc.body_pos_w[left].rotation;
        for (i, normal) in foot_normals().iter().enumerate() {
            let n = (rot * normal).normalize() * 2.0;
            assert_relative_eq!(unload.c().fixed_rows::<3>(3 * i).into_owned(), n, epsilon = 1e-12);
        }
        assert_relative_eq!(unload.c(), &-press.c(), epsilon = 1e-12);
        assert!(unload.is_minimizing() && !press.is_minimizing());
    }

    #[test]
    fn body_without_contact_gives_empty_block() {
        let mb = humanoid();
        let mbc = standing_config(&mb);
        let pelvis = mb.body_index_by_name("pelvis").unwrap();
        let data = SolverData::new(&mb, &feet(&mb), 1).unwrap();
        let mut task = ContactTask::minimize(pelvis, 1.0);
        task.update_nr_vars(&mb, &data).unwrap();
        task.update(&mb, &mbc, &data).unwrap();
        assert_eq!(task.c().len(), 0);
        assert_eq!(task.begin(), 0);
    }

    #[test]
    fn stale_layout_is_rejected() {
        let mb = humanoid();
        let mbc = standing_config(&mb);
        let left = mb.body_index_by_name("l_foot").unwrap();
        let mut task = ContactTask::minimize(left, 1.0);
        let old = SolverData::new(&mb, &feet(&mb), 1).unwrap();
        task.update_nr_vars(&mb, &old).unwrap();
        let new = SolverData::new(&mb, &feet(&mb)[..1], 2).unwrap();
        assert!(matches!(
            task.update(&mb, &mbc, &new),
            Err(QpError::InvalidConfiguration(ConfigurationError::LayoutMismatch { .. }))
        ));
    }

    #[test]
    fn gripper_moment_is_axis_cross_lever() {
        let mb = planar_arm();
        let mut mbc = MultiBodyConfig::new(&mb);
        refresh(&mb, &mut mbc);
        let tool = mb.body_index_by_name("tool").unwrap();
        let points = vec![Vector3::new(0.1, 0.0, 0.0), Vector3::new(0.0, 0.1, 0.0)];
        let normals = vec![Vector3::z(); 2];
        let data = SolverData::new(&mb, &[Contact::new(tool, points.clone(), normals)], 1).unwrap();

        let mut task = GripperTorqueTask::new(tool, Vector3::zeros(), Vector3::z(), 3.0);
        task.update_nr_vars(&mb, &data).unwrap();
        task.update(&mb, &mbc, &data).unwrap();

        assert_eq!(task.begin(), mb.nr_dof());
        let pose = mbc.body_pos_w[tool];
        let axis = pose.rotation * Vector3::z();
        for (i, p) in points.iter().enumerate() {
            let expected = axis.cross(&(pose.rotation * p)) * 3.0;
            assert_relative_eq!(task.c().fixed_rows::<3>(3 * i).into_owned(), expected, epsilon = 1e-12);
        }
        // A force along the lever produces no moment.
        let lever = pose.rotation * points[0];
        assert_relative_eq!(task.c().fixed_rows::<3>(0).dot(&lever), 0.0, epsilon = 1e-12);
    }

    #[test]
    #[should_panic(expected = "task weight")]
    fn negative_weight_panics() {
        let _ = ContactTask::maximize(0, -1.0);
    }
}
