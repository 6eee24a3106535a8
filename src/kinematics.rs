//! Body-to-inertial kinematics for the two supported attitude parameterizations.
//!
//! A pose is laid out as `[x, y, z, roll, pitch, yaw]` for [`Attitude::Euler`] and
//! `[x, y, z, w, qx, qy, qz]` for [`Attitude::Quaternion`]. For every pose the
//! transform produces a [`KinematicFrame`] holding the body-to-inertial rotation
//! and the attitude-rate transform, from which the pose-rate Jacobian is assembled.
use nalgebra::{
    DMatrix, DVector, Matrix3, Matrix4x3, Quaternion, Rotation3, UnitQuaternion, Vector3,
    Vector4, Vector6,
};
use rayon::prelude::*;

/// Attitude parameterization of the pose, selected once when the model is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attitude {
    /// Roll, pitch, yaw with ZYX composition
    Euler,
    /// Unit quaternion `(w, x, y, z)`
    Quaternion,
}

impl Attitude {
    /// Maps the `quat` configuration flag to an attitude variant
    pub fn from_quat_flag(quat: bool) -> Self {
        if quat {
            Attitude::Quaternion
        } else {
            Attitude::Euler
        }
    }
    /// Number of pose components (6 for Euler, 7 for quaternion)
    pub fn pose_dim(&self) -> usize {
        match self {
            Attitude::Euler => 6,
            Attitude::Quaternion => 7,
        }
    }
    /// Number of state components, pose followed by the 6 body velocities
    pub fn state_dim(&self) -> usize {
        self.pose_dim() + 6
    }
    /// Pose at the origin with zero rotation
    pub fn identity_pose(&self) -> DVector<f64> {
        let mut pose = DVector::zeros(self.pose_dim());
        if let Attitude::Quaternion = self {
            pose[3] = 1.0;
        }
        pose
    }
    /// Computes the kinematic frame of a single pose
    /// # Arguments
    /// * `pose` - The pose, of length [`Attitude::pose_dim`]
    /// # Returns
    /// * The rotation and attitude-rate transform at this pose
    pub fn frame(&self, pose: &DVector<f64>) -> KinematicFrame {
        match self {
            Attitude::Euler => euler_frame(&Vector3::new(pose[3], pose[4], pose[5])),
            Attitude::Quaternion => {
                quaternion_frame(&Vector4::new(pose[3], pose[4], pose[5], pose[6]))
            }
        }
    }
    /// Computes the kinematic frames of a batch of poses
    pub fn frames(&self, poses: &[DVector<f64>]) -> Vec<KinematicFrame> {
        poses.par_iter().map(|pose| self.frame(pose)).collect()
    }
    /// Renormalizes the quaternion block of `pose` to unit norm, no-op for Euler poses
    pub fn normalize(&self, pose: &mut DVector<f64>) {
        if let Attitude::Quaternion = self {
            normalize_quaternion(pose);
        }
    }
}

/// Attitude-rate transform mapping body angular velocity to attitude derivative
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttitudeRate {
    /// Body rates to roll/pitch/yaw rates
    Euler(Matrix3<f64>),
    /// Body rates to quaternion derivative, `0.5 * E(q)`
    Quaternion(Matrix4x3<f64>),
}

impl AttitudeRate {
    /// Number of attitude components driven by the transform
    pub fn nrows(&self) -> usize {
        match self {
            AttitudeRate::Euler(_) => 3,
            AttitudeRate::Quaternion(_) => 4,
        }
    }
}

/// Per-pose kinematic quantities, recomputed every step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicFrame {
    /// Rotation from body to inertial frame
    pub rotation: Matrix3<f64>,
    /// Attitude-rate transform
    pub rate: AttitudeRate,
}

impl KinematicFrame {
    /// Assembles the block-diagonal pose-rate Jacobian
    ///
    /// ```text
    /// J = | R  0 |
    ///     | 0  T |
    /// ```
    /// The result is 6x6 for Euler poses and 7x6 for quaternion poses.
    pub fn jacobian(&self) -> DMatrix<f64> {
        let mut jac = DMatrix::zeros(3 + self.rate.nrows(), 6);
        jac.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.rotation);
        match &self.rate {
            AttitudeRate::Euler(t) => jac.fixed_view_mut::<3, 3>(3, 3).copy_from(t),
            AttitudeRate::Quaternion(t) => jac.fixed_view_mut::<4, 3>(3, 3).copy_from(t),
        }
        jac
    }
    /// Pose derivative in the inertial frame for a body-frame velocity
    pub fn pose_rate(&self, velocity: &Vector6<f64>) -> DVector<f64> {
        self.jacobian() * velocity
    }
}

/// Kinematic frame of a roll/pitch/yaw attitude
///
/// The rotation is `Rz(yaw) * Ry(pitch) * Rx(roll)`. The rate transform divides by
/// `cos(pitch)` and is singular at pitch = ±90° (gimbal lock); callers relying on
/// Euler poses must keep away from it.
pub fn euler_frame(angles: &Vector3<f64>) -> KinematicFrame {
    let (roll, pitch, yaw) = (angles[0], angles[1], angles[2]);
    let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), roll);
    let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), pitch);
    let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), yaw);
    let (sr, cr) = roll.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let rate = Matrix3::new(
        1.0, sr * sp / cp, cr * sp / cp, //
        0.0, cr, -sr, //
        0.0, sr / cp, cr / cp,
    );
    KinematicFrame {
        rotation: (rz * ry * rx).into_inner(),
        rate: AttitudeRate::Euler(rate),
    }
}

/// Kinematic frame of a `(w, x, y, z)` quaternion attitude
///
/// The quaternion is used as given; it is expected to have unit norm.
pub fn quaternion_frame(q: &Vector4<f64>) -> KinematicFrame {
    let (w, x, y, z) = (q[0], q[1], q[2], q[3]);
    let rotation = UnitQuaternion::new_unchecked(Quaternion::new(w, x, y, z))
        .to_rotation_matrix()
        .into_inner();
    let rate = 0.5
        * Matrix4x3::new(
            -x, -y, -z, //
            w, -z, y, //
            z, w, -x, //
            -y, x, w,
        );
    KinematicFrame {
        rotation,
        rate: AttitudeRate::Quaternion(rate),
    }
}

/// Scales the quaternion block `pose[3..7]` to unit norm
pub fn normalize_quaternion(pose: &mut DVector<f64>) {
    let norm = pose.fixed_rows::<4>(3).norm();
    pose.fixed_rows_mut::<4>(3).unscale_mut(norm);
}
