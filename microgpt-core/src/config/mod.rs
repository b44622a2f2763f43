//! Configuration for the model, the optimizer, training, inference, and paths.
//!
//! [`ModelConfig`] and [`AdamConfig`] are what the core consumes; [`Config`] bundles them
//! with the pipeline settings the binary needs. Load from environment via [`from_env`] and
//! validate with [`Config::validate`]. Default values and env key names are centralized in
//! the `constants` submodule.

mod builder;
mod constants;
mod error;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use constants::{
    DEFAULT_BETA1, DEFAULT_BETA2, DEFAULT_BLOCK_SIZE, DEFAULT_CHECKPOINT_PATH, DEFAULT_EPSILON,
    DEFAULT_EVAL_FRACTION, DEFAULT_INIT_STD, DEFAULT_INPUT_PATH, DEFAULT_LEARNING_RATE,
    DEFAULT_LOSS_LOG_EVERY, DEFAULT_NUM_STEPS, DEFAULT_N_EMBD, DEFAULT_N_HEAD, DEFAULT_N_LAYER,
    DEFAULT_SAMPLE_SIZE, DEFAULT_SEED, DEFAULT_TEMPERATURE,
};

pub use builder::{env_key, env_parsed, env_string, from_env};
pub use error::ConfigError;

/// MLP hidden width as a multiple of the embedding width.
pub const MLP_RATIO: usize = 4;

/// Transformer dimensions. Fixed for the lifetime of a trained model: the
/// parameter shapes are derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Embedding width (must be divisible by `n_head`).
    pub n_embd: usize,
    /// Number of attention heads.
    pub n_head: usize,
    /// Number of transformer layers.
    pub n_layer: usize,
    /// Maximum context length (tokens); also the number of position embeddings.
    pub block_size: usize,
    /// Standard deviation of the Gaussian weight init.
    pub init_std: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_embd: DEFAULT_N_EMBD,
            n_head: DEFAULT_N_HEAD,
            n_layer: DEFAULT_N_LAYER,
            block_size: DEFAULT_BLOCK_SIZE,
            init_std: DEFAULT_INIT_STD,
        }
    }
}

impl ModelConfig {
    /// Checks the shape invariants before any parameter is allocated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_head == 0 {
            return Err(ConfigError::Validation(
                "n_head must be greater than 0".to_string(),
            ));
        }
        if self.n_embd == 0 {
            return Err(ConfigError::Validation(
                "n_embd must be greater than 0".to_string(),
            ));
        }
        if !self.n_embd.is_multiple_of(self.n_head) {
            return Err(ConfigError::Validation(format!(
                "n_embd ({}) must be divisible by n_head ({})",
                self.n_embd, self.n_head
            )));
        }
        if self.n_layer == 0 {
            return Err(ConfigError::Validation(
                "n_layer must be greater than 0".to_string(),
            ));
        }
        if self.block_size == 0 {
            return Err(ConfigError::Validation(
                "block_size must be greater than 0".to_string(),
            ));
        }
        if !self.init_std.is_finite() || self.init_std < 0.0 {
            return Err(ConfigError::Validation(format!(
                "init_std must be finite and non-negative, got {}",
                self.init_std
            )));
        }
        Ok(())
    }

    /// Width of one attention head (`n_embd / n_head`).
    #[must_use]
    pub fn head_dim(&self) -> usize {
        self.n_embd / self.n_head
    }

    /// Hidden width of the MLP block.
    #[must_use]
    pub fn mlp_dim(&self) -> usize {
        MLP_RATIO * self.n_embd
    }
}

/// Adam hyperparameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdamConfig {
    /// Base learning rate, decayed linearly to zero over the run.
    pub learning_rate: f64,
    /// First-moment decay.
    pub beta1: f64,
    /// Second-moment decay.
    pub beta2: f64,
    /// Added to the denominator of the update.
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: DEFAULT_LEARNING_RATE,
            beta1: DEFAULT_BETA1,
            beta2: DEFAULT_BETA2,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl AdamConfig {
    /// Checks that the betas are in `[0, 1)`, epsilon is positive and the rate is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.learning_rate.is_finite() || self.learning_rate < 0.0 {
            return Err(ConfigError::Validation(format!(
                "learning_rate must be finite and non-negative, got {}",
                self.learning_rate
            )));
        }
        for (name, beta) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be in [0, 1), got {beta}"
                )));
            }
        }
        if self.epsilon.is_nan() || self.epsilon <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Validates a sampling temperature: finite and `>= 0` (0 means greedy).
pub fn validate_temperature(temperature: f64) -> Result<(), ConfigError> {
    if !temperature.is_finite() || temperature < 0.0 {
        return Err(ConfigError::Validation(format!(
            "temperature must be finite and >= 0, got {temperature}"
        )));
    }
    Ok(())
}

/// Central configuration for the training and sampling pipeline.
///
/// Use [`from_env`] to build from environment variables and [`Config::validate`] before use.
#[derive(Clone, Debug)]
pub struct Config {
    /// Seed for RNG (init, shuffling, sampling).
    pub seed: u64,
    /// Path to input corpus (one document per line).
    pub input_path: PathBuf,
    /// Path the trained checkpoint is written to.
    pub checkpoint_path: PathBuf,

    /// Model dimensions.
    pub model: ModelConfig,
    /// Optimizer hyperparameters.
    pub adam: AdamConfig,

    /// Number of training steps.
    pub num_steps: usize,
    /// Log loss every this many steps.
    pub loss_log_every: usize,
    /// Fraction of documents held out for evaluation (0 disables evaluation).
    pub eval_fraction: f64,

    /// Sampling temperature (0 = greedy).
    pub temperature: f64,
    /// Number of samples to generate after training.
    pub sample_size: usize,
}

impl Default for Config {
    /// Returns default configuration (suitable for tests and fallbacks).
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            checkpoint_path: PathBuf::from(DEFAULT_CHECKPOINT_PATH),
            model: ModelConfig::default(),
            adam: AdamConfig::default(),
            num_steps: DEFAULT_NUM_STEPS,
            loss_log_every: DEFAULT_LOSS_LOG_EVERY,
            eval_fraction: DEFAULT_EVAL_FRACTION,
            temperature: DEFAULT_TEMPERATURE,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl Config {
    /// Validates configuration. Returns `Ok(())` if valid, or a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model.validate()?;
        self.adam.validate()?;
        validate_temperature(self.temperature)?;
        if self.num_steps == 0 {
            return Err(ConfigError::Validation(
                "num_steps must be greater than 0".to_string(),
            ));
        }
        if self.loss_log_every == 0 {
            return Err(ConfigError::Validation(
                "loss_log_every must be greater than 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.eval_fraction) {
            return Err(ConfigError::Validation(format!(
                "eval_fraction must be in [0, 1), got {}",
                self.eval_fraction
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::constants::{ENV_N_EMBD, ENV_N_HEAD, ENV_SEED, ENV_TEMPERATURE};
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.model.head_dim(), 4);
        assert_eq!(cfg.model.mlp_dim(), 64);
    }

    #[test]
    fn validate_rejects_n_embd_not_divisible_by_n_head() {
        let cfg = ModelConfig {
            n_embd: 15,
            n_head: 4,
            ..ModelConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.message().contains("divisible"));
    }

    #[test]
    fn validate_rejects_zero_dimensions() {
        for cfg in [
            ModelConfig {
                n_head: 0,
                ..ModelConfig::default()
            },
            ModelConfig {
                n_embd: 0,
                ..ModelConfig::default()
            },
            ModelConfig {
                n_layer: 0,
                ..ModelConfig::default()
            },
            ModelConfig {
                block_size: 0,
                ..ModelConfig::default()
            },
        ] {
            assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
        }
    }

    #[test]
    fn validate_rejects_bad_init_std() {
        let cfg = ModelConfig {
            init_std: f64::NAN,
            ..ModelConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn adam_validate_rejects_out_of_range_values() {
        assert!(AdamConfig::default().validate().is_ok());
        let bad_beta = AdamConfig {
            beta1: 1.0,
            ..AdamConfig::default()
        };
        assert!(bad_beta.validate().is_err());
        let bad_eps = AdamConfig {
            epsilon: 0.0,
            ..AdamConfig::default()
        };
        assert!(bad_eps.validate().is_err());
        let bad_lr = AdamConfig {
            learning_rate: -0.1,
            ..AdamConfig::default()
        };
        assert!(bad_lr.validate().is_err());
    }

    #[test]
    fn temperature_zero_is_greedy_and_allowed() {
        assert!(validate_temperature(0.0).is_ok());
        assert!(validate_temperature(1.5).is_ok());
        assert!(validate_temperature(-0.1).is_err());
        assert!(validate_temperature(f64::INFINITY).is_err());
    }

    #[test]
    fn validate_rejects_zero_steps_and_bad_eval_fraction() {
        let cfg = Config {
            num_steps: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = Config {
            eval_fraction: 1.0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn model_config_serde_round_trip() {
        let cfg = ModelConfig {
            n_embd: 8,
            n_head: 2,
            n_layer: 3,
            block_size: 5,
            init_std: 0.02,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    /// Lock so env tests don't run in parallel and pollute each other.
    static CONFIG_ENV_LOCK: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        CONFIG_ENV_LOCK
            .get_or_init(|| std::sync::Mutex::new(()))
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[test]
    fn from_env_falls_back_to_defaults() {
        let _g = env_lock();
        std::env::remove_var(env_key(ENV_N_EMBD));
        std::env::remove_var(env_key(ENV_SEED));
        let cfg = from_env().unwrap();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.seed, Config::default().seed);
    }

    #[test]
    fn from_env_overrides_with_env_vars() {
        let _g = env_lock();
        let key_n_embd = env_key(ENV_N_EMBD);
        let key_n_head = env_key(ENV_N_HEAD);
        let key_temp = env_key(ENV_TEMPERATURE);
        std::env::set_var(&key_n_embd, "32");
        std::env::set_var(&key_n_head, "8");
        std::env::set_var(&key_temp, "0");
        let cfg = from_env().unwrap();
        std::env::remove_var(key_n_embd);
        std::env::remove_var(key_n_head);
        std::env::remove_var(key_temp);
        assert_eq!(cfg.model.n_embd, 32);
        assert_eq!(cfg.model.n_head, 8);
        assert_eq!(cfg.temperature, 0.0);
    }

    #[test]
    fn from_env_returns_error_on_invalid_parse() {
        let _g = env_lock();
        let key = env_key(ENV_SEED);
        std::env::set_var(&key, "not_a_number");
        let res = from_env();
        std::env::remove_var(key);
        assert!(matches!(res, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn config_error_display() {
        let e = ConfigError::Validation("n_head must be > 0".to_string());
        assert!(e.to_string().contains("config validation"));
        assert_eq!(e.message(), "n_head must be > 0");

        let e = ConfigError::Parse {
            key: "MICROGPT_SEED".to_string(),
            value: "abc".to_string(),
            message: "invalid digit".to_string(),
        };
        assert!(e.to_string().contains("MICROGPT_SEED"));
        assert!(e.to_string().contains("abc"));
        assert_eq!(e.message(), "invalid digit");
    }

    #[test]
    fn env_helpers_unset_return_none() {
        assert_eq!(env_string("MICROGPT_UNLIKELY_KEY_12345").unwrap(), None);
        assert_eq!(env_parsed::<u64>("MICROGPT_UNLIKELY_KEY_67890").unwrap(), None);
    }
}
