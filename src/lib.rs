//! # AUV Dynamics
//! This crate provides a batched six degree-of-freedom dynamics model of an underwater
//! vehicle, meant to be evaluated for thousands of sampled trajectories per control
//! cycle by a sampling-based model predictive controller.
//! ## Features
//! - Rigid-body and added-mass inertia with a cached inverse of the total mass matrix
//! - Linear, quadratic and forward-speed coupled hydrodynamic damping
//! - Coriolis/centripetal coupling and gravity/buoyancy restoring forces
//! - Euler-angle or unit-quaternion attitude, selected once per model
//! - Explicit forward-Euler integration of `k` samples in lock-step, parallelized with `rayon`
//! - YAML vehicle descriptions and conversion to the SNAME body-frame convention
use nalgebra::DMatrix;

pub mod config;
pub mod frame;
pub mod hydro;
pub mod kinematics;
pub mod model;
pub mod skew;
pub mod vehicle;

pub use frame::{BodyFrame, InertialFrame};
pub use kinematics::{Attitude, AttitudeRate, KinematicFrame};
pub use model::AuvModel;
pub use vehicle::{MassModel, VehicleParameters};

#[derive(thiserror::Error, Debug)]
/// Represents errors that can occur while building or stepping a model
pub enum ModelError {
    /// Invalid or missing vehicle or model parameter
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// Batch size or vector length disagreement at call time
    #[error("Shape mismatch: {0}")]
    ShapeMismatchError(String),
    /// Non-invertible mass matrix
    #[error("Singular matrix: {0}")]
    SingularMatrixError(String),
    /// Error reading a configuration file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    /// Error parsing a YAML configuration
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    /// Error related to normal distribution calculations
    #[error("Normal error: {0}")]
    NormalError(#[from] rand_distr::NormalError),
}

/// Trait defining the interface a sampling controller uses to propagate states
pub trait DynamicsModel: Send + Sync {
    /// Name of the model
    fn name(&self) -> &str;
    /// Number of state components per sample
    fn state_dim(&self) -> usize;
    /// Number of action components per sample
    fn action_dim(&self) -> usize;
    /// Number of samples `k` propagated per step
    fn batch_size(&self) -> usize;
    /// Propagates a batch of states for one time step
    /// # Arguments
    /// * `state` - The current states, one row per sample (or a single shared row)
    /// * `action` - The applied actions, one row per sample (or a single shared row)
    /// # Returns
    /// * The next states, `batch_size` rows
    /// # Errors
    /// * `ShapeMismatchError` if the batches do not conform to the model
    fn step(&self, state: &DMatrix<f64>, action: &DMatrix<f64>)
        -> Result<DMatrix<f64>, ModelError>;
    /// Propagates a batch of states over a horizon of actions
    /// # Arguments
    /// * `initial` - The initial states
    /// * `actions` - One action batch per time step
    /// # Returns
    /// * The state batch after every step, in order
    /// # Errors
    /// * The first error returned by [`DynamicsModel::step`]
    fn rollout(
        &self,
        initial: &DMatrix<f64>,
        actions: &[DMatrix<f64>],
    ) -> Result<Vec<DMatrix<f64>>, ModelError> {
        let mut states = Vec::with_capacity(actions.len());
        let mut state = initial.clone();
        for action in actions {
            state = self.step(&state, action)?;
            states.push(state.clone());
        }
        Ok(states)
    }
}
