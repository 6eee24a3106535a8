use auv_dynamics::config::Config;
use auv_dynamics::{Attitude, AuvModel, DynamicsModel, ModelError};
use nalgebra::DMatrix;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Initial state of every sample: at the origin, level and at rest
fn initial_state(model: &AuvModel) -> DMatrix<f64> {
    let pose = model.attitude().identity_pose();
    DMatrix::from_fn(1, model.state_dim(), |_, j| {
        if j < pose.len() {
            pose[j]
        } else {
            0.0
        }
    })
}

/// Formats one state row as a compact list
fn format_row(state: &DMatrix<f64>, row: usize) -> String {
    state
        .row(row)
        .iter()
        .map(|x| format!("{:.4}", x))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Propagates the nominal sample with zero action and logs every state
fn nominal_rollout(model: &AuvModel, steps: usize) -> Result<DMatrix<f64>, ModelError> {
    let actions = vec![DMatrix::zeros(1, model.action_dim()); steps];
    let states = model.rollout(&initial_state(model), &actions)?;
    for (i, state) in states.iter().enumerate() {
        log::info!("Step {:>3}: [{}]", i + 1, format_row(state, 0));
    }
    states.last().cloned().ok_or(ModelError::ConfigurationError(
        "Rollout needs at least one step".to_string(),
    ))
}

/// Propagates all samples with Gaussian action noise and reports their spread
fn sampled_rollout(
    model: &AuvModel,
    steps: usize,
    noise_std: f64,
    seed: u64,
) -> Result<(), ModelError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let noise = Normal::new(0.0, noise_std)?;
    let k = model.batch_size();
    let actions: Vec<DMatrix<f64>> = (0..steps)
        .map(|_| DMatrix::from_fn(k, model.action_dim(), |_, _| noise.sample(&mut rng)))
        .collect();
    let states = model.rollout(&initial_state(model), &actions)?;
    if let Some(last) = states.last() {
        let depth = last.column(2);
        log::info!(
            "{} samples after {} steps: depth in [{:.4}, {:.4}], all finite: {}",
            k,
            steps,
            depth.min(),
            depth.max(),
            last.iter().all(|x| x.is_finite())
        );
    }
    Ok(())
}

fn main() -> Result<(), ModelError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/auv.yaml".to_string());
    let config = Config::from_yaml(&config_path)?;
    let model = AuvModel::from_config(&config)?;
    log::info!(
        "Model {}: {} attitude in {}, state dimension {}, k = {}, dt = {} s",
        model.name(),
        match model.attitude() {
            Attitude::Euler => "Euler",
            Attitude::Quaternion => "quaternion",
        },
        model.body_frame().id(),
        model.state_dim(),
        model.batch_size(),
        model.dt()
    );
    let rollout = &config.rollout;
    let last = nominal_rollout(&model, rollout.steps)?;
    log::info!("Final state: [{}]", format_row(&last, 0));
    if model.batch_size() > 1 && rollout.action_noise_std > 0.0 {
        sampled_rollout(&model, rollout.steps, rollout.action_noise_std, rollout.seed)?;
    }
    Ok(())
}
