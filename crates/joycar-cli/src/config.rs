//! Operator configuration – reads/writes `~/.joycar/config.toml`.

use joycar_types::RobotConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted operator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Control-cycle period of the drive loop.
    #[serde(default = "default_cycle_ms")]
    pub cycle_ms: u64,

    /// Robot geometry, calibration and timing.
    #[serde(default)]
    pub robot: RobotConfig,
}

fn default_cycle_ms() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cycle_ms: default_cycle_ms(),
            robot: RobotConfig::default(),
        }
    }
}

/// Return the path to `~/.joycar/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".joycar").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `JOYCAR_*` environment variable overrides to `cfg`.  Values that
/// do not parse are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `JOYCAR_WHEEL_DIAMETER` | `robot.wheel_diameter_m` |
/// | `JOYCAR_WHEEL_BASE` | `robot.wheel_base_m` |
/// | `JOYCAR_CYCLE_MS` | `cycle_ms` |
/// | `JOYCAR_REVERSAL_GUARD_MS` | `robot.reversal_guard_ms` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("JOYCAR_WHEEL_DIAMETER")
        && let Ok(metres) = v.parse::<f32>()
    {
        cfg.robot.wheel_diameter_m = metres;
    }
    if let Ok(v) = std::env::var("JOYCAR_WHEEL_BASE")
        && let Ok(metres) = v.parse::<f32>()
    {
        cfg.robot.wheel_base_m = metres;
    }
    if let Ok(v) = std::env::var("JOYCAR_CYCLE_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.cycle_ms = ms;
    }
    if let Ok(v) = std::env::var("JOYCAR_REVERSAL_GUARD_MS")
        && let Ok(ms) = v.parse::<u32>()
    {
        cfg.robot.reversal_guard_ms = ms;
    }
}

/// Save the config to disk, creating `~/.joycar/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
