use crate::frame::InertialFrame;
use crate::ModelError;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub model: ModelConfig,
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub rollout: RolloutConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub quat: bool,
    pub dt: f64,
    #[serde(default = "default_action_dim")]
    pub action_dim: usize,
    #[serde(default = "default_batch_size")]
    pub k: usize,
    #[serde(default)]
    pub inertial_frame: InertialFrame,
    #[serde(default = "default_gravity")]
    pub gravity: f64,
    /// Flip the gravity/buoyancy signs of the restoring forces
    #[serde(default)]
    pub use_sname: bool,
}

/// Vehicle parameter mapping; every key is optional here and checked when the
/// model is built so that missing entries surface as configuration errors.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct VehicleConfig {
    pub mass: Option<f64>,
    pub volume: Option<f64>,
    pub density: Option<f64>,
    pub height: Option<f64>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub cog: Option<Vec<f64>>,
    pub cob: Option<Vec<f64>>,
    #[serde(rename = "Ma")]
    pub added_mass: Option<Vec<Vec<f64>>>,
    pub linear_damping: Option<DampingConfig>,
    pub quad_damping: Option<Vec<f64>>,
    pub linear_damping_forward_speed: Option<DampingConfig>,
    pub inertial: Option<InertialConfig>,
}

/// Damping given either as the 6 diagonal coefficients or as a full 6x6 matrix
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum DampingConfig {
    Diagonal(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct InertialConfig {
    pub ixx: Option<f64>,
    pub iyy: Option<f64>,
    pub izz: Option<f64>,
    pub ixy: Option<f64>,
    pub ixz: Option<f64>,
    pub iyz: Option<f64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct RolloutConfig {
    pub steps: usize,
    pub action_noise_std: f64,
    pub seed: u64,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            steps: 30,
            action_noise_std: 0.0,
            seed: 0,
        }
    }
}

fn default_name() -> String {
    "AUV".to_string()
}
fn default_action_dim() -> usize {
    6
}
fn default_batch_size() -> usize {
    1
}
fn default_gravity() -> f64 {
    9.81
}

impl Config {
    pub fn from_yaml(filename: &str) -> Result<Self, ModelError> {
        let mut contents = String::new();
        File::open(filename)?.read_to_string(&mut contents)?;
        let config: Self = serde_yaml::from_str(&contents)?;
        log::info!("Loaded configuration from {}", filename);
        Ok(config)
    }
}

/// Vehicle used across the unit tests, the same one shipped in `config/auv.yaml`
#[cfg(test)]
pub(crate) fn test_vehicle() -> VehicleConfig {
    VehicleConfig {
        mass: Some(1862.87),
        volume: Some(1.83826),
        density: Some(1028.0),
        height: Some(1.6),
        length: Some(2.6),
        width: Some(1.5),
        cog: Some(vec![0.0, 0.0, 0.0]),
        cob: Some(vec![0.0, 0.0, 0.3]),
        added_mass: Some(vec![
            vec![779.79, -6.8773, -103.32, 8.5426, -165.54, -7.8033],
            vec![-6.8773, 1222.0, 51.29, 409.44, -5.8488, 62.726],
            vec![-103.32, 51.29, 3659.9, 6.1112, -386.42, 10.774],
            vec![8.5426, 409.44, 6.1112, 534.9, -10.027, 21.019],
            vec![-165.54, -5.8488, -386.42, -10.027, 842.69, -1.1162],
            vec![-7.8033, 62.726, 10.775, 21.019, -1.1162, 224.32],
        ]),
        linear_damping: Some(DampingConfig::Diagonal(vec![
            -74.82, -69.48, -728.4, -268.8, -309.77, -105.0,
        ])),
        quad_damping: Some(vec![-748.22, -992.53, -1821.01, -672.0, -774.44, -523.27]),
        linear_damping_forward_speed: Some(DampingConfig::Diagonal(vec![0.0; 6])),
        inertial: Some(InertialConfig {
            ixx: Some(525.39),
            iyy: Some(794.2),
            izz: Some(691.23),
            ixy: Some(1.44),
            ixz: Some(33.41),
            iyz: Some(2.6),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vehicle_with_defaults() {
        let yaml = r#"
model:
  dt: 0.05
vehicle:
  mass: 10.0
  cog: [0.0, 0.0, 0.0]
  Ma: [[1, 0, 0, 0, 0, 0], [0, 1, 0, 0, 0, 0], [0, 0, 1, 0, 0, 0],
       [0, 0, 0, 1, 0, 0], [0, 0, 0, 0, 1, 0], [0, 0, 0, 0, 0, 1]]
  linear_damping: [1, 2, 3, 4, 5, 6]
  linear_damping_forward_speed: [[1, 0, 0, 0, 0, 0], [0, 1, 0, 0, 0, 0], [0, 0, 1, 0, 0, 0],
                                 [0, 0, 0, 1, 0, 0], [0, 0, 0, 0, 1, 0], [0, 0, 0, 0, 0, 1]]
  inertial: {ixx: 1.0, iyy: 2.0}
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.model.name, "AUV");
        assert!(!config.model.quat);
        assert_eq!(config.model.action_dim, 6);
        assert_eq!(config.model.k, 1);
        assert_eq!(config.model.gravity, 9.81);
        assert_eq!(config.model.inertial_frame, InertialFrame::World);
        assert_eq!(config.rollout.steps, 30);
        assert_eq!(config.vehicle.mass, Some(10.0));
        assert_eq!(config.vehicle.volume, None);
        assert_eq!(config.vehicle.added_mass.as_ref().map(Vec::len), Some(6));
        assert_eq!(
            config.vehicle.linear_damping,
            Some(DampingConfig::Diagonal(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
        );
        assert!(matches!(
            config.vehicle.linear_damping_forward_speed,
            Some(DampingConfig::Matrix(ref rows)) if rows.len() == 6
        ));
        let inertial = config.vehicle.inertial.unwrap();
        assert_eq!(inertial.iyy, Some(2.0));
        assert_eq!(inertial.iyz, None);
    }

    #[test]
    fn parses_ned_frame() {
        let yaml = "model: {dt: 0.1, quat: true, k: 8, inertial_frame: world_ned}\nvehicle: {}\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.model.quat);
        assert_eq!(config.model.k, 8);
        assert_eq!(config.model.inertial_frame, InertialFrame::WorldNed);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            Config::from_yaml("does/not/exist.yaml"),
            Err(ModelError::IoError(_))
        ));
    }
}
