//! Vehicle parameters and the constant generalized mass matrix.
use crate::config::{DampingConfig, InertialConfig, VehicleConfig};
use crate::skew::skew;
use crate::ModelError;
use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};

/// Physical description of the vehicle, validated once and never mutated
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleParameters {
    pub(crate) mass: f64,
    pub(crate) volume: f64,
    pub(crate) density: f64,
    pub(crate) height: f64,
    pub(crate) length: f64,
    pub(crate) width: f64,
    pub(crate) cog: Vector3<f64>,
    pub(crate) cob: Vector3<f64>,
    pub(crate) inertia: Matrix3<f64>,
    pub(crate) added_mass: Matrix6<f64>,
    pub(crate) linear_damping: Matrix6<f64>,
    pub(crate) quadratic_damping: Matrix6<f64>,
    pub(crate) linear_damping_forward_speed: Matrix6<f64>,
}

impl VehicleParameters {
    /// Validates a vehicle parameter mapping
    /// # Arguments
    /// * `config` - The vehicle mapping, usually read from YAML
    /// # Returns
    /// * The validated parameters; optional matrices default to zero
    /// # Errors
    /// * `ConfigurationError` if a required value is missing, a scalar is not
    ///   strictly positive, or a vector/matrix has the wrong size
    pub fn from_config(config: &VehicleConfig) -> Result<Self, ModelError> {
        Ok(Self {
            mass: positive(config.mass, "Mass")?,
            volume: positive(config.volume, "Volume")?,
            density: positive(config.density, "Liquid density")?,
            height: positive(config.height, "Height")?,
            length: positive(config.length, "Length")?,
            width: positive(config.width, "Width")?,
            cog: point(config.cog.as_deref(), "center of gravity")?,
            cob: point(config.cob.as_deref(), "center of buoyancy")?,
            inertia: match &config.inertial {
                Some(inertial) => inertia_tensor(inertial)?,
                None => Matrix3::zeros(),
            },
            added_mass: match &config.added_mass {
                Some(rows) => matrix6(rows, "added mass")?,
                None => Matrix6::zeros(),
            },
            linear_damping: damping(config.linear_damping.as_ref(), "Linear damping")?,
            quadratic_damping: match &config.quad_damping {
                Some(coefficients) => Matrix6::from_diagonal(&diagonal6(
                    coefficients,
                    "Quadratic damping must be defined with 6 coefficients",
                )?),
                None => Matrix6::zeros(),
            },
            linear_damping_forward_speed: damping(
                config.linear_damping_forward_speed.as_ref(),
                "Linear damping proportional to the forward speed",
            )?,
        })
    }
    /// Dry mass in kg
    pub fn mass(&self) -> f64 {
        self.mass
    }
    /// Displaced volume in m^3
    pub fn volume(&self) -> f64 {
        self.volume
    }
    /// Density of the surrounding water in kg/m^3
    pub fn density(&self) -> f64 {
        self.density
    }
    /// Bounding box of the hull as `(height, length, width)`
    pub fn dimensions(&self) -> (f64, f64, f64) {
        (self.height, self.length, self.width)
    }
    /// Center of gravity in the body frame
    pub fn cog(&self) -> &Vector3<f64> {
        &self.cog
    }
    /// Center of buoyancy in the body frame
    pub fn cob(&self) -> &Vector3<f64> {
        &self.cob
    }
    /// Inertia tensor about the body origin
    pub fn inertia(&self) -> &Matrix3<f64> {
        &self.inertia
    }
    /// Hydrodynamic added mass `Ma`
    pub fn added_mass(&self) -> &Matrix6<f64> {
        &self.added_mass
    }
    /// Linear damping `L`
    pub fn linear_damping(&self) -> &Matrix6<f64> {
        &self.linear_damping
    }
    /// Quadratic damping `Q`, scaled by `|v|`
    pub fn quadratic_damping(&self) -> &Matrix6<f64> {
        &self.quadratic_damping
    }
    /// Linear damping `L_fwd`, scaled by the surge speed
    pub fn linear_damping_forward_speed(&self) -> &Matrix6<f64> {
        &self.linear_damping_forward_speed
    }
}

fn positive(value: Option<f64>, name: &str) -> Result<f64, ModelError> {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(ModelError::ConfigurationError(format!(
            "{} has to be positive.",
            name
        ))),
    }
}

fn point(value: Option<&[f64]>, name: &str) -> Result<Vector3<f64>, ModelError> {
    let v = value.ok_or_else(|| {
        ModelError::ConfigurationError(format!("need to define the {} in the body frame", name))
    })?;
    if v.len() != 3 {
        return Err(ModelError::ConfigurationError(format!(
            "Invalid {} vector. Size != 3",
            name
        )));
    }
    Ok(Vector3::from_column_slice(v))
}

fn matrix6(rows: &[Vec<f64>], name: &str) -> Result<Matrix6<f64>, ModelError> {
    if rows.len() != 6 || rows.iter().any(|row| row.len() != 6) {
        return Err(ModelError::ConfigurationError(format!(
            "Invalid {} matrix, expected 6x6",
            name
        )));
    }
    Ok(Matrix6::from_fn(|i, j| rows[i][j]))
}

fn diagonal6(coefficients: &[f64], message: &str) -> Result<Vector6<f64>, ModelError> {
    if coefficients.len() != 6 {
        return Err(ModelError::ConfigurationError(message.to_string()));
    }
    Ok(Vector6::from_column_slice(coefficients))
}

fn damping(config: Option<&DampingConfig>, name: &str) -> Result<Matrix6<f64>, ModelError> {
    let message = format!(
        "{} must be given as a 6x6 matrix or the diagonal coefficients",
        name
    );
    match config {
        None => Ok(Matrix6::zeros()),
        Some(DampingConfig::Diagonal(d)) => Ok(Matrix6::from_diagonal(&diagonal6(d, &message)?)),
        Some(DampingConfig::Matrix(rows)) => {
            matrix6(rows, name).map_err(|_| ModelError::ConfigurationError(message))
        }
    }
}

fn inertia_tensor(inertial: &InertialConfig) -> Result<Matrix3<f64>, ModelError> {
    let moment = |value: Option<f64>, key: &str| {
        value.ok_or_else(|| {
            ModelError::ConfigurationError(format!("Invalid moments of inertia, missing {}", key))
        })
    };
    let (ixx, iyy, izz) = (
        moment(inertial.ixx, "ixx")?,
        moment(inertial.iyy, "iyy")?,
        moment(inertial.izz, "izz")?,
    );
    let (ixy, ixz, iyz) = (
        moment(inertial.ixy, "ixy")?,
        moment(inertial.ixz, "ixz")?,
        moment(inertial.iyz, "iyz")?,
    );
    Ok(Matrix3::new(
        ixx, ixy, ixz, //
        ixy, iyy, iyz, //
        ixz, iyz, izz,
    ))
}

/// Builds the 6x6 rigid-body mass matrix
///
/// ```text
/// M_rb = | m I          -m S(cog) |
///        | m S(cog)      I_o      |
/// ```
pub fn rigid_body_mass(mass: f64, cog: &Vector3<f64>, inertia: &Matrix3<f64>) -> Matrix6<f64> {
    let mass_eye = Matrix3::identity() * mass;
    let mass_lower = skew(cog) * mass;
    let mut m = Matrix6::zeros();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(&mass_eye);
    m.fixed_view_mut::<3, 3>(0, 3).copy_from(&(-mass_lower));
    m.fixed_view_mut::<3, 3>(3, 0).copy_from(&mass_lower);
    m.fixed_view_mut::<3, 3>(3, 3).copy_from(inertia);
    m
}

/// Total generalized mass matrix (rigid body plus added mass) and its inverse
#[derive(Debug, Clone, PartialEq)]
pub struct MassModel {
    rigid_body: Matrix6<f64>,
    total: Matrix6<f64>,
    inverse: Matrix6<f64>,
}

impl MassModel {
    /// Assembles and inverts the total mass matrix of a vehicle
    /// # Arguments
    /// * `params` - The vehicle parameters
    /// # Returns
    /// * The mass model with its cached inverse
    /// # Errors
    /// * `SingularMatrixError` if the total mass matrix cannot be inverted
    pub fn new(params: &VehicleParameters) -> Result<Self, ModelError> {
        let rigid_body = rigid_body_mass(params.mass, &params.cog, &params.inertia);
        let total = rigid_body + params.added_mass;
        let inverse = total
            .try_inverse()
            .filter(|inv| inv.iter().all(|x| x.is_finite()))
            .ok_or(ModelError::SingularMatrixError(
                "Failed to invert total mass matrix".to_string(),
            ))?;
        Ok(Self {
            rigid_body,
            total,
            inverse,
        })
    }
    /// Rigid-body mass matrix `M_RB`
    pub fn rigid_body(&self) -> &Matrix6<f64> {
        &self.rigid_body
    }
    /// Total mass matrix `M = M_RB + Ma`
    pub fn total(&self) -> &Matrix6<f64> {
        &self.total
    }
    /// Cached `M^-1`
    pub fn inverse(&self) -> &Matrix6<f64> {
        &self.inverse
    }
}
