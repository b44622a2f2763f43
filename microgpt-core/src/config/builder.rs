//! Build [`Config`] from environment variables.
//!
//! Uses [`env_string`] and [`env_parsed`] to read env vars with a single place for key names
//! (see the `constants` submodule) and typed errors ([`ConfigError`]).

use std::path::PathBuf;

use super::constants::{
    ENV_BETA1, ENV_BETA2, ENV_BLOCK_SIZE, ENV_CHECKPOINT_PATH, ENV_EPSILON, ENV_EVAL_FRACTION,
    ENV_INIT_STD, ENV_INPUT_PATH, ENV_LEARNING_RATE, ENV_LOSS_LOG_EVERY, ENV_NUM_STEPS,
    ENV_N_EMBD, ENV_N_HEAD, ENV_N_LAYER, ENV_PREFIX, ENV_SAMPLE_SIZE, ENV_SEED, ENV_TEMPERATURE,
};
use super::{AdamConfig, Config, ConfigError, ModelConfig};

/// Returns the full environment variable key for a given suffix (e.g. `SEED` → `MICROGPT_SEED`).
#[must_use]
pub fn env_key(suffix: &str) -> String {
    format!("{ENV_PREFIX}{suffix}")
}

/// Reads an environment variable as a string.
///
/// Returns `Some(value)` if the variable is set and valid UTF-8, `None` if unset.
/// Returns `Err(ConfigError::EnvVar)` if the variable is set but invalid (e.g. not Unicode).
pub fn env_string(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(s) => Ok(Some(s)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::EnvVar {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Reads an environment variable and parses it into type `T`.
///
/// Returns `Ok(Some(value))` if set and parse succeeds, `Ok(None)` if unset, and
/// `Err(ConfigError::Parse)` if set but parsing fails (e.g. `SEED=abc` for `u64`).
pub fn env_parsed<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(s) = env_string(key)? else {
        return Ok(None);
    };
    match s.parse() {
        Ok(t) => Ok(Some(t)),
        Err(e) => Err(ConfigError::Parse {
            key: key.to_string(),
            value: s,
            message: e.to_string(),
        }),
    }
}

fn parsed_or<T>(suffix: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(env_parsed::<T>(&env_key(suffix))?.unwrap_or(default))
}

/// Builds [`Config`] from environment variables, falling back to [`Config::default`] for unset values.
///
/// Returns [`ConfigError`] if any *set* variable fails to parse (e.g. `MICROGPT_SEED=abc`).
/// The result is not validated; call [`Config::validate`] before use.
pub fn from_env() -> Result<Config, ConfigError> {
    let default = Config::default();

    let input_path = env_string(&env_key(ENV_INPUT_PATH))?
        .map(PathBuf::from)
        .unwrap_or(default.input_path);
    let checkpoint_path = env_string(&env_key(ENV_CHECKPOINT_PATH))?
        .map(PathBuf::from)
        .unwrap_or(default.checkpoint_path);

    let model = ModelConfig {
        n_embd: parsed_or(ENV_N_EMBD, default.model.n_embd)?,
        n_head: parsed_or(ENV_N_HEAD, default.model.n_head)?,
        n_layer: parsed_or(ENV_N_LAYER, default.model.n_layer)?,
        block_size: parsed_or(ENV_BLOCK_SIZE, default.model.block_size)?,
        init_std: parsed_or(ENV_INIT_STD, default.model.init_std)?,
    };
    let adam = AdamConfig {
        learning_rate: parsed_or(ENV_LEARNING_RATE, default.adam.learning_rate)?,
        beta1: parsed_or(ENV_BETA1, default.adam.beta1)?,
        beta2: parsed_or(ENV_BETA2, default.adam.beta2)?,
        epsilon: parsed_or(ENV_EPSILON, default.adam.epsilon)?,
    };

    Ok(Config {
        seed: parsed_or(ENV_SEED, default.seed)?,
        input_path,
        checkpoint_path,
        model,
        adam,
        num_steps: parsed_or(ENV_NUM_STEPS, default.num_steps)?,
        loss_log_every: parsed_or(ENV_LOSS_LOG_EVERY, default.loss_log_every)?,
        temperature: parsed_or(ENV_TEMPERATURE, default.temperature)?,
        sample_size: parsed_or(ENV_SAMPLE_SIZE, default.sample_size)?,
        eval_fraction: parsed_or(ENV_EVAL_FRACTION, default.eval_fraction)?,
    })
}
