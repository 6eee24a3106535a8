//! Hydrodynamic and hydrostatic terms: damping, Coriolis/centripetal coupling and
//! restoring forces. Every term has a single-sample form and a batched form that
//! evaluates the same code for each sample.
use crate::skew::{skew, skew_batch};
use crate::vehicle::{MassModel, VehicleParameters};
use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};
use rayon::prelude::*;

/// Velocity- and attitude-dependent forces acting on the vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct HydroForces {
    linear_damping: Matrix6<f64>,
    linear_damping_forward_speed: Matrix6<f64>,
    quadratic_damping: Matrix6<f64>,
    total_mass: Matrix6<f64>,
    cog: Vector3<f64>,
    cob: Vector3<f64>,
    /// m * g
    weight: f64,
    /// V * rho * g
    buoyancy: f64,
    sname: bool,
}

impl HydroForces {
    /// Creates the force model of a vehicle
    /// # Arguments
    /// * `params` - The vehicle parameters
    /// * `mass` - The vehicle mass model, its total mass drives the Coriolis term
    /// * `gravity` - The gravitational acceleration in m/s^2
    /// * `sname` - Use the SNAME signs for weight and buoyancy
    pub fn new(params: &VehicleParameters, mass: &MassModel, gravity: f64, sname: bool) -> Self {
        Self {
            linear_damping: params.linear_damping,
            linear_damping_forward_speed: params.linear_damping_forward_speed,
            quadratic_damping: params.quadratic_damping,
            total_mass: *mass.total(),
            cog: params.cog,
            cob: params.cob,
            weight: params.mass * gravity,
            buoyancy: params.volume * params.density * gravity,
            sname,
        }
    }
    /// Damping matrix `D(v) = -L - u * L_fwd - Q |diag(v)|`
    /// # Arguments
    /// * `velocity` - Body velocity `[u, v, w, p, q, r]`
    /// # Returns
    /// * The 6x6 damping matrix; `-D(v) v` is the damping force
    pub fn damping_matrix(&self, velocity: &Vector6<f64>) -> Matrix6<f64> {
        -self.linear_damping
            - self.linear_damping_forward_speed * velocity[0]
            - self.quadratic_damping * Matrix6::from_diagonal(&velocity.abs())
    }
    pub fn damping_matrices(&self, velocities: &[Vector6<f64>]) -> Vec<Matrix6<f64>> {
        velocities
            .par_iter()
            .map(|v| self.damping_matrix(v))
            .collect()
    }
    /// Coriolis and centripetal matrix of the total (rigid body + added) mass
    ///
    /// ```text
    /// C(v) = | 0    S12 |    S12 = -S(M11 v1 + M12 v2)
    ///        | S12  S22 |    S22 = -S(M21 v1 + M22 v2)
    /// ```
    /// with `v1` the linear and `v2` the angular body velocity. `C(0)` is zero
    /// and `C(v)` is antisymmetric.
    pub fn coriolis_matrix(&self, velocity: &Vector6<f64>) -> Matrix6<f64> {
        let (linear, angular) = self.momentum(velocity);
        coriolis_blocks(&skew(&linear), &skew(&angular))
    }
    /// Batched [`HydroForces::coriolis_matrix`], one skew pass over all momenta
    pub fn coriolis_matrices(&self, velocities: &[Vector6<f64>]) -> Vec<Matrix6<f64>> {
        let (linear, angular): (Vec<Vector3<f64>>, Vec<Vector3<f64>>) =
            velocities.iter().map(|v| self.momentum(v)).unzip();
        let s1 = skew_batch(&linear);
        let s2 = skew_batch(&angular);
        s1.par_iter()
            .zip(s2.par_iter())
            .map(|(a, b)| coriolis_blocks(a, b))
            .collect()
    }
    /// Linear and angular parts of `M v`
    fn momentum(&self, velocity: &Vector6<f64>) -> (Vector3<f64>, Vector3<f64>) {
        let m = &self.total_mass;
        let linear = velocity.fixed_rows::<3>(0);
        let angular = velocity.fixed_rows::<3>(3);
        (
            m.fixed_view::<3, 3>(0, 0) * linear + m.fixed_view::<3, 3>(0, 3) * angular,
            m.fixed_view::<3, 3>(3, 0) * linear + m.fixed_view::<3, 3>(3, 3) * angular,
        )
    }
    /// Restoring (gravity and buoyancy) generalized force
    /// # Arguments
    /// * `rotation` - Body to inertial rotation of the vehicle
    /// # Returns
    /// * `[-R^T (Fg + Fb); -R^T (cog x Fg + cob x Fb)]` with `Fg = m g z` and
    ///   `Fb = -V rho g z`, both negated under the SNAME signs
    pub fn restoring_forces(&self, rotation: &Matrix3<f64>) -> Vector6<f64> {
        let sign = if self.sname { -1.0 } else { 1.0 };
        let fg = Vector3::z() * (sign * self.weight);
        let fb = Vector3::z() * (-sign * self.buoyancy);
        let to_body = rotation.transpose();
        let force = -(to_body * (fg + fb));
        let torque = -(to_body * (self.cog.cross(&fg) + self.cob.cross(&fb)));
        Vector6::new(force.x, force.y, force.z, torque.x, torque.y, torque.z)
    }
    pub fn restoring_forces_batch(&self, rotations: &[Matrix3<f64>]) -> Vec<Vector6<f64>> {
        rotations
            .par_iter()
            .map(|r| self.restoring_forces(r))
            .collect()
    }
}

/// Assembles `C(v)` from the skew matrices of the two momentum halves
fn coriolis_blocks(s1: &Matrix3<f64>, s2: &Matrix3<f64>) -> Matrix6<f64> {
    let mut c = Matrix6::zeros();
    c.fixed_view_mut::<3, 3>(0, 3).copy_from(&-s1);
    c.fixed_view_mut::<3, 3>(3, 0).copy_from(&-s1);
    c.fixed_view_mut::<3, 3>(3, 3).copy_from(&-s2);
    c
}
