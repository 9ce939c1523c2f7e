//! Configuration Vault – reads/writes `~/.seekdog/config.toml`.
//!
//! Every field has a serde default, so a partial file (or an empty one) is
//! valid. The runtime never sees this type: [`Config::scheduler_config`]
//! validates it and converts it into the plain structs the scheduler is
//! built from.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use seekdog_nav::{MapConfig, PathfinderConfig};
use seekdog_runtime::{PoseCorrection, SchedulerConfig};
use seekdog_types::{Pose, SeekError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or saving the config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// How landmark references in feedback are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// Whole-word match on landmark names; works offline.
    #[default]
    Keyword,
    /// Ask the model.
    Llm,
}

/// Which actuator the search drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorKind {
    /// Track the pose in-process.
    #[default]
    Sim,
    /// Expand actions into velocity pulses on a recording motion driver.
    Velocity,
}

/// Persisted user configuration stored in `~/.seekdog/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Object to search for.
    #[serde(default = "default_target")]
    pub target: String,

    #[serde(default)]
    pub start_pose: Pose,

    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    #[serde(default)]
    pub pose_correction: PoseCorrection,

    /// Seconds before a decision call is abandoned; unset waits forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_timeout_secs: Option<u64>,

    /// Ask for operator feedback before every n-th round; unset never asks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_interval: Option<u32>,

    /// Base URL of the OpenAI-compatible model server.
    #[serde(default = "default_model_url")]
    pub model_url: String,

    #[serde(default = "default_model")]
    pub active_model: String,

    #[serde(default)]
    pub classifier: ClassifierKind,

    #[serde(default)]
    pub actuator: ActuatorKind,

    /// Directory of recorded frames to replay instead of a live camera.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_dir: Option<PathBuf>,

    /// Parent directory for per-search round logs.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default = "default_max_expansions")]
    pub max_expansions: usize,

    #[serde(default)]
    pub map: MapConfig,
}

fn default_target() -> String {
    "banana".to_string()
}
fn default_max_rounds() -> u32 {
    20
}
fn default_model_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3".to_string()
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}
fn default_max_expansions() -> usize {
    PathfinderConfig::default().max_expansions
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: default_target(),
            start_pose: Pose::default(),
            max_rounds: default_max_rounds(),
            pose_correction: PoseCorrection::default(),
            decision_timeout_secs: None,
            feedback_interval: None,
            model_url: default_model_url(),
            active_model: default_model(),
            classifier: ClassifierKind::default(),
            actuator: ActuatorKind::default(),
            dataset_dir: None,
            log_dir: default_log_dir(),
            max_expansions: default_max_expansions(),
            map: MapConfig::default(),
        }
    }
}

impl Config {
    /// # Errors
    ///
    /// [`SeekError::Config`] for an empty target, a zero feedback interval,
    /// or a start pose, landmark or border outside [`Pose::COORD_LIMIT`].
    pub fn scheduler_config(&self) -> Result<SchedulerConfig, SeekError> {
        self.validate()?;
        Ok(SchedulerConfig {
            target: self.target.clone(),
            start_pose: self.start_pose,
            max_rounds: self.max_rounds,
            pose_correction: self.pose_correction,
            map: self.map.clone(),
            pathfinder: PathfinderConfig {
                max_expansions: self.max_expansions,
            },
            decision_timeout: self.decision_timeout_secs.map(Duration::from_secs),
            feedback_interval: self.feedback_interval,
        })
    }

    fn validate(&self) -> Result<(), SeekError> {
        let invalid = |msg: String| Err(SeekError::Config(msg));
        if self.target.trim().is_empty() {
            return invalid("target must not be empty".to_string());
        }
        if self.feedback_interval == Some(0) {
            return invalid("feedback_interval must be at least 1".to_string());
        }
        if !self.start_pose.in_bounds() {
            return invalid(format!("start_pose {} is off the grid", self.start_pose));
        }
        if let Some((name, pose)) = self.map.landmarks.iter().find(|(_, p)| !p.in_bounds()) {
            return invalid(format!("landmark '{name}' at {pose} is off the grid"));
        }
        if let Some(radius) = self.map.border_radius
            && !(0..=Pose::COORD_LIMIT).contains(&radius)
        {
            return invalid(format!("border_radius {radius} is out of range"));
        }
        Ok(())
    }
}

/// Return the path to `~/.seekdog/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".seekdog").join("config.toml")
}

/// Load the config from disk. Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, ConfigError> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut cfg: Config = toml::from_str(&raw)?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `SEEKDOG_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SEEKDOG_TARGET` | `target` |
/// | `SEEKDOG_MODEL_URL` | `model_url` |
/// | `SEEKDOG_MODEL` | `active_model` |
/// | `SEEKDOG_MAX_ROUNDS` | `max_rounds` |
/// | `SEEKDOG_LOG_DIR` | `log_dir` |
/// | `SEEKDOG_DATASET_DIR` | `dataset_dir` |
///
/// Unparsable numbers are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("SEEKDOG_TARGET") {
        cfg.target = v;
    }
    if let Ok(v) = std::env::var("SEEKDOG_MODEL_URL") {
        cfg.model_url = v;
    }
    if let Ok(v) = std::env::var("SEEKDOG_MODEL") {
        cfg.active_model = v;
    }
    if let Ok(v) = std::env::var("SEEKDOG_MAX_ROUNDS")
        && let Ok(n) = v.parse::<u32>()
    {
        cfg.max_rounds = n;
    }
    if let Ok(v) = std::env::var("SEEKDOG_LOG_DIR") {
        cfg.log_dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("SEEKDOG_DATASET_DIR") {
        cfg.dataset_dir = Some(PathBuf::from(v));
    }
}

/// Save the config to disk, creating `~/.seekdog/` if necessary.
pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    let io = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| ConfigError::Io { path, source }
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io(parent))?;
        // Owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(io(parent))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)?;
    // Owner read/write (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(io(path))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(io(path))?;
    Ok(())
}
