//! The batched AUV model: acceleration solve and forward-Euler integration.
use crate::config::Config;
use crate::frame::{BodyFrame, InertialFrame};
use crate::hydro::HydroForces;
use crate::kinematics::{Attitude, KinematicFrame};
use crate::vehicle::{MassModel, VehicleParameters};
use crate::{DynamicsModel, ModelError};
use nalgebra::{DMatrix, DVector, Matrix3, Vector6};
use rayon::prelude::*;

/// Six degree-of-freedom underwater vehicle evaluated over a batch of `k` samples
///
/// A state batch holds one sample per row: the pose (`Attitude::pose_dim` values)
/// followed by the body velocity `[u, v, w, p, q, r]`. An action batch holds the
/// generalized body force `[X, Y, Z, K, M, N]` per row. State and action batches
/// may have a single row, which is then shared by all `k` samples.
/// # Example
/// ```
/// use auv_dynamics::config::Config;
/// use auv_dynamics::{AuvModel, DynamicsModel};
/// use nalgebra::DMatrix;
/// let config = Config::from_yaml(concat!(env!("CARGO_MANIFEST_DIR"), "/config/auv.yaml")).unwrap();
/// let model = AuvModel::from_config(&config).unwrap();
/// let state = DMatrix::zeros(1, model.state_dim());
/// let action = DMatrix::zeros(1, 6);
/// let next = model.step(&state, &action).unwrap();
/// assert_eq!(next.shape(), (model.batch_size(), model.state_dim()));
/// ```
#[derive(Debug, Clone)]
pub struct AuvModel {
    name: String,
    attitude: Attitude,
    dt: f64,
    action_dim: usize,
    k: usize,
    body_frame: BodyFrame,
    parameters: VehicleParameters,
    mass: MassModel,
    hydro: HydroForces,
}

impl AuvModel {
    /// Creates a new model in the `world` inertial frame with standard gravity
    /// # Arguments
    /// * `parameters` - The validated vehicle parameters
    /// * `attitude` - The attitude parameterization of the pose
    /// * `dt` - The integration time step in seconds
    /// * `action_dim` - The number of action components, must be 6
    /// * `k` - The number of samples evaluated per step
    /// # Errors
    /// * `ConfigurationError` for a non-positive time step, an empty batch or an
    ///   action dimension other than 6
    /// * `SingularMatrixError` if the total mass matrix cannot be inverted
    pub fn new(
        parameters: VehicleParameters,
        attitude: Attitude,
        dt: f64,
        action_dim: usize,
        k: usize,
    ) -> Result<Self, ModelError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ModelError::ConfigurationError(
                "Time step has to be positive.".to_string(),
            ));
        }
        if k == 0 {
            return Err(ModelError::ConfigurationError(
                "Batch size has to be at least 1.".to_string(),
            ));
        }
        if action_dim != 6 {
            return Err(ModelError::ConfigurationError(format!(
                "Action must be a 6 component generalized force, got {}",
                action_dim
            )));
        }
        let mass = MassModel::new(&parameters)?;
        let hydro = HydroForces::new(&parameters, &mass, 9.81, false);
        log::debug!(
            "Built AUV model: {:?} attitude, k = {}, dt = {} s",
            attitude,
            k,
            dt
        );
        Ok(Self {
            name: "AUV".to_string(),
            attitude,
            dt,
            action_dim,
            k,
            body_frame: BodyFrame::BaseLink,
            parameters,
            mass,
            hydro,
        })
    }
    /// Builds the model described by a configuration file
    /// # Errors
    /// * Any error of [`VehicleParameters::from_config`] or [`AuvModel::new`]
    pub fn from_config(config: &Config) -> Result<Self, ModelError> {
        let model = &config.model;
        if !(model.gravity.is_finite() && model.gravity > 0.0) {
            return Err(ModelError::ConfigurationError(
                "Gravity has to be positive.".to_string(),
            ));
        }
        let parameters = VehicleParameters::from_config(&config.vehicle)?;
        Ok(Self::new(
            parameters,
            Attitude::from_quat_flag(model.quat),
            model.dt,
            model.action_dim,
            model.k,
        )?
        .with_name(&model.name)
        .with_inertial_frame(model.inertial_frame)
        .with_restoring(model.gravity, model.use_sname))
    }
    /// Renames the model
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
    /// Selects the inertial frame, and with it the body frame used by
    /// [`AuvModel::to_sname`]
    pub fn with_inertial_frame(mut self, frame: InertialFrame) -> Self {
        self.body_frame = BodyFrame::from(frame);
        self
    }
    /// Rebuilds the restoring forces for another gravity or sign convention
    pub fn with_restoring(mut self, gravity: f64, sname: bool) -> Self {
        self.hydro = HydroForces::new(&self.parameters, &self.mass, gravity, sname);
        self
    }
    /// Attitude parameterization of the pose
    pub fn attitude(&self) -> Attitude {
        self.attitude
    }
    /// Integration time step in seconds
    pub fn dt(&self) -> f64 {
        self.dt
    }
    /// Body frame the states are expressed in
    pub fn body_frame(&self) -> BodyFrame {
        self.body_frame
    }
    /// Validated vehicle parameters
    pub fn parameters(&self) -> &VehicleParameters {
        &self.parameters
    }
    /// Rigid-body, total and inverse mass matrices
    pub fn mass_model(&self) -> &MassModel {
        &self.mass
    }
    /// Damping, Coriolis and restoring terms
    pub fn hydro(&self) -> &HydroForces {
        &self.hydro
    }
    /// Converts a batch of 3- or 6-vectors to the SNAME convention
    pub fn to_sname(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>, ModelError> {
        self.body_frame.to_sname(x)
    }
    /// Converts a batch of 3- or 6-vectors from the SNAME convention
    pub fn from_sname(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>, ModelError> {
        self.body_frame.from_sname(x)
    }
    /// Solves `M a = tau - C(v) v - D(v) v - g(eta)` for every sample of the batch
    /// # Arguments
    /// * `frames` - Kinematic frames of the poses, 1 or `k` entries
    /// * `velocities` - Body velocities, 1 or `k` entries
    /// * `actions` - Generalized body forces, 1 or `k` entries
    /// # Returns
    /// * `k` body-frame accelerations
    /// # Errors
    /// * `ShapeMismatchError` if an input holds neither 1 nor `k` entries
    pub fn acceleration(
        &self,
        frames: &[KinematicFrame],
        velocities: &[Vector6<f64>],
        actions: &[Vector6<f64>],
    ) -> Result<Vec<Vector6<f64>>, ModelError> {
        let k = self.k;
        self.check_batch("pose", frames.len())?;
        self.check_batch("velocity", velocities.len())?;
        self.check_batch("action", actions.len())?;
        let velocities = broadcast(velocities, k);
        let actions = broadcast(actions, k);
        let rotations: Vec<Matrix3<f64>> = frames.iter().map(|f| f.rotation).collect();
        let rotations = broadcast(&rotations, k);

        let damping = self.hydro.damping_matrices(&velocities);
        let coriolis = self.hydro.coriolis_matrices(&velocities);
        let restoring = self.hydro.restoring_forces_batch(&rotations);
        let inverse = self.mass.inverse();
        Ok((0..k)
            .into_par_iter()
            .map(|i| {
                let nu = &velocities[i];
                inverse * (actions[i] - coriolis[i] * nu - damping[i] * nu - restoring[i])
            })
            .collect())
    }
    fn check_batch(&self, what: &str, len: usize) -> Result<(), ModelError> {
        if len == 1 || len == self.k {
            Ok(())
        } else {
            Err(ModelError::ShapeMismatchError(format!(
                "{} batch of size {} does not match k = {}",
                what, len, self.k
            )))
        }
    }
    fn check_columns(&self, what: &str, batch: &DMatrix<f64>, ncols: usize) -> Result<(), ModelError> {
        if batch.ncols() != ncols {
            return Err(ModelError::ShapeMismatchError(format!(
                "{} must have {} columns, got {}",
                what,
                ncols,
                batch.ncols()
            )));
        }
        self.check_batch(what, batch.nrows())
    }
    /// Splits a state batch into poses and body velocities
    fn split_state(&self, state: &DMatrix<f64>) -> (Vec<DVector<f64>>, Vec<Vector6<f64>>) {
        let p = self.attitude.pose_dim();
        (0..state.nrows())
            .map(|i| {
                (
                    DVector::from_fn(p, |j, _| state[(i, j)]),
                    Vector6::from_fn(|j, _| state[(i, p + j)]),
                )
            })
            .unzip()
    }
    /// Concatenates poses and velocities into a state batch, sharing a single
    /// pose across all velocities on the first step from one initial condition
    fn assemble(
        &self,
        poses: Vec<DVector<f64>>,
        velocities: &[Vector6<f64>],
    ) -> Result<DMatrix<f64>, ModelError> {
        let poses = if poses.len() == 1 && velocities.len() > 1 {
            vec![poses[0].clone(); velocities.len()]
        } else {
            poses
        };
        if poses.len() != velocities.len() {
            return Err(ModelError::ShapeMismatchError(format!(
                "pose batch of size {} does not match velocity batch of size {}",
                poses.len(),
                velocities.len()
            )));
        }
        let p = self.attitude.pose_dim();
        Ok(DMatrix::from_fn(velocities.len(), p + 6, |i, j| {
            if j < p {
                poses[i][j]
            } else {
                velocities[i][j - p]
            }
        }))
    }
}

impl DynamicsModel for AuvModel {
    fn name(&self) -> &str {
        &self.name
    }
    fn state_dim(&self) -> usize {
        self.attitude.state_dim()
    }
    fn action_dim(&self) -> usize {
        self.action_dim
    }
    fn batch_size(&self) -> usize {
        self.k
    }
    fn step(&self, state: &DMatrix<f64>, action: &DMatrix<f64>) -> Result<DMatrix<f64>, ModelError> {
        self.check_columns("state", state, self.state_dim())?;
        self.check_columns("action", action, self.action_dim)?;
        let (poses, velocities) = self.split_state(state);
        let actions: Vec<Vector6<f64>> = (0..action.nrows())
            .map(|i| Vector6::from_fn(|j, _| action[(i, j)]))
            .collect();

        let frames = self.attitude.frames(&poses);
        let velocity_dots = self.acceleration(&frames, &velocities, &actions)?;

        let poses_next: Vec<DVector<f64>> = poses
            .par_iter()
            .zip(frames.par_iter())
            .zip(velocities.par_iter())
            .map(|((pose, frame), nu)| {
                let mut next = pose + frame.pose_rate(nu) * self.dt;
                self.attitude.normalize(&mut next);
                next
            })
            .collect();
        let velocities_next: Vec<Vector6<f64>> = broadcast(&velocities, self.k)
            .par_iter()
            .zip(velocity_dots.par_iter())
            .map(|(nu, nu_dot)| nu + nu_dot * self.dt)
            .collect();
        self.assemble(poses_next, &velocities_next)
    }
}

/// Repeats a single entry `k` times, leaves full batches untouched
fn broadcast<T: Clone>(items: &[T], k: usize) -> Vec<T> {
    if items.len() == 1 {
        vec![items[0].clone(); k]
    } else {
        items.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_vehicle;
    use approx::assert_relative_eq;

    fn model(attitude: Attitude, k: usize) -> AuvModel {
        let params = VehicleParameters::from_config(&test_vehicle()).unwrap();
        AuvModel::new(params, attitude, 0.1, 6, k).unwrap()
    }

    #[test]
    fn rejects_invalid_options() {
        let params = VehicleParameters::from_config(&test_vehicle()).unwrap();
        for (dt, action_dim, k) in [(0.0, 6, 1), (-0.1, 6, 1), (0.1, 3, 1), (0.1, 6, 0)] {
            assert!(matches!(
                AuvModel::new(params.clone(), Attitude::Euler, dt, action_dim, k),
                Err(ModelError::ConfigurationError(_))
            ));
        }
    }

    #[test]
    fn neutral_vehicle_at_rest_stays_at_rest() {
        let mut config = test_vehicle();
        config.linear_damping = None;
        config.quad_damping = None;
        // Same displaced mass as the vehicle and both centres at the origin.
        config.volume = Some(1862.87 / 1028.0);
        config.cob = Some(vec![0.0, 0.0, 0.0]);
        let params = VehicleParameters::from_config(&config).unwrap();
        let model = AuvModel::new(params, Attitude::Euler, 0.1, 6, 1).unwrap();
        let frames = vec![Attitude::Euler.frame(&Attitude::Euler.identity_pose())];
        let acc = model
            .acceleration(&frames, &[Vector6::zeros()], &[Vector6::zeros()])
            .unwrap();
        assert_relative_eq!(acc[0], Vector6::zeros(), epsilon = 1e-9);
    }

    #[test]
    fn acceleration_matches_mass_inverse() {
        let model = model(Attitude::Euler, 2);
        let frames = vec![Attitude::Euler.frame(&Attitude::Euler.identity_pose())];
        let velocities = [Vector6::zeros()];
        let tau = Vector6::new(100.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let acc = model
            .acceleration(&frames, &velocities, &[Vector6::zeros(), tau])
            .unwrap();
        assert_eq!(acc.len(), 2);
        let g = model.hydro().restoring_forces(&Matrix3::identity());
        assert_relative_eq!(acc[0], model.mass_model().inverse() * -g, epsilon = 1e-12);
        assert_relative_eq!(
            model.mass_model().total() * (acc[1] - acc[0]),
            tau,
            epsilon = 1e-9
        );
    }

    #[test]
    fn acceleration_rejects_partial_batches() {
        let model = model(Attitude::Euler, 3);
        let frames = vec![Attitude::Euler.frame(&Attitude::Euler.identity_pose())];
        let result = model.acceleration(&frames, &[Vector6::zeros(); 2], &[Vector6::zeros()]);
        assert!(matches!(result, Err(ModelError::ShapeMismatchError(_))));
    }

    #[test]
    fn step_integrates_with_forward_euler() {
        let model = model(Attitude::Euler, 1);
        let mut state = DMatrix::zeros(1, 12);
        state[(0, 5)] = 0.3;
        state[(0, 6)] = 1.0;
        state[(0, 11)] = 0.2;
        let action = DMatrix::from_row_slice(1, 6, &[10.0, 0.0, 0.0, 0.0, 0.0, 5.0]);
        let next = model.step(&state, &action).unwrap();

        let (poses, velocities) = model.split_state(&state);
        let frame = Attitude::Euler.frame(&poses[0]);
        let acc = model
            .acceleration(&[frame], &velocities, &[Vector6::new(10.0, 0.0, 0.0, 0.0, 0.0, 5.0)])
            .unwrap();
        // Surge along a yawed heading.
        assert_relative_eq!(next[(0, 0)], 0.1 * 0.3_f64.cos(), epsilon = 1e-12);
        assert_relative_eq!(next[(0, 1)], 0.1 * 0.3_f64.sin(), epsilon = 1e-12);
        assert_relative_eq!(next[(0, 5)], 0.3 + 0.1 * 0.2, epsilon = 1e-12);
        for j in 0..6 {
            assert_relative_eq!(next[(0, 6 + j)], velocities[0][j] + 0.1 * acc[0][j], epsilon = 1e-12);
        }
    }

    #[test]
    fn quaternion_step_keeps_unit_norm() {
        let model = model(Attitude::Quaternion, 1);
        let mut state = DMatrix::zeros(1, 13);
        state[(0, 3)] = 1.0;
        state[(0, 10)] = 0.8;
        state[(0, 11)] = -0.5;
        state[(0, 12)] = 1.2;
        let action = DMatrix::zeros(1, 6);
        for _ in 0..20 {
            state = model.step(&state, &action).unwrap();
            let norm = state.view((0, 3), (1, 4)).norm();
            assert_relative_eq!(norm, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn diverging_quaternion_batch_keeps_each_row_unit_norm() {
        let model = model(Attitude::Quaternion, 3);
        let mut state = DMatrix::zeros(3, 13);
        for i in 0..3 {
            let rate = (i + 1) as f64;
            state[(i, 3)] = 1.0;
            state[(i, 10)] = 0.5 * rate;
            state[(i, 11)] = -0.7 * rate;
            state[(i, 12)] = 0.3 * rate * rate;
        }
        let action = DMatrix::zeros(3, 6);
        for _ in 0..30 {
            state = model.step(&state, &action).unwrap();
            for i in 0..3 {
                let norm = state.view((i, 3), (1, 4)).norm();
                assert_relative_eq!(norm, 1.0, epsilon = 1e-12);
            }
        }
        // The samples really do end up at different attitudes.
        assert_ne!(state.view((0, 3), (1, 4)), state.view((2, 3), (1, 4)));
    }

    #[test]
    fn single_pose_is_shared_by_the_batch() {
        let model = model(Attitude::Euler, 5);
        let mut state = DMatrix::zeros(1, 12);
        state[(0, 0)] = 2.0;
        state[(0, 4)] = 0.1;
        let action = DMatrix::from_fn(5, 6, |i, j| (i * 6 + j) as f64 * 10.0);
        let next = model.step(&state, &action).unwrap();
        assert_eq!(next.shape(), (5, 12));
        for i in 1..5 {
            assert_eq!(next.view((i, 0), (1, 6)), next.view((0, 0), (1, 6)));
            assert_ne!(next.view((i, 6), (1, 6)), next.view((0, 6), (1, 6)));
        }
    }

    #[test]
    fn step_rejects_mismatched_shapes() {
        let model = model(Attitude::Euler, 4);
        let cases = [
            (DMatrix::<f64>::zeros(1, 13), DMatrix::<f64>::zeros(1, 6)),
            (DMatrix::zeros(1, 12), DMatrix::zeros(1, 5)),
            (DMatrix::zeros(2, 12), DMatrix::zeros(4, 6)),
            (DMatrix::zeros(4, 12), DMatrix::zeros(3, 6)),
        ];
        for (state, action) in &cases {
            assert!(matches!(
                model.step(state, action),
                Err(ModelError::ShapeMismatchError(_))
            ));
        }
    }

    #[test]
    fn assemble_rejects_disagreeing_batches() {
        let model = model(Attitude::Euler, 3);
        let poses = vec![DVector::zeros(6); 2];
        assert!(model.assemble(poses, &[Vector6::zeros(); 3]).is_err());
    }
}
