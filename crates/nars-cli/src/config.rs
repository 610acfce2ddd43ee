//! Configuration Vault – reads/writes `~/.nars/config.toml`.

use nars_runtime::ReasonerConfig;
use nars_types::NarsError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted user configuration stored in `~/.nars/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Stop `/run` after this many ticks.  Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,

    /// Milliseconds between ticks during `/run`.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Print forgotten-concept notices as well as input and derivations.
    #[serde(default)]
    pub show_memory_events: bool,

    /// Memory and scheduler tuning.
    #[serde(default)]
    pub reasoner: ReasonerConfig,
}

fn default_tick_interval_ms() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_steps: None,
            tick_interval_ms: default_tick_interval_ms(),
            show_memory_events: false,
            reasoner: ReasonerConfig::default(),
        }
    }
}

/// Return the path to `~/.nars/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".nars").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, NarsError> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, NarsError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        NarsError::InvalidConfig(format!("failed to read config at {}: {e}", path.display()))
    })?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| NarsError::InvalidConfig(format!("failed to parse config: {e}")))?;
    apply_env_overrides(&mut cfg);
    cfg.reasoner.validate()?;
    Ok(Some(cfg))
}

/// Apply `NARS_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `NARS_CONCEPT_CAPACITY` | `reasoner.concept_capacity` |
/// | `NARS_LEVELS` | `reasoner.levels` |
/// | `NARS_SEED` | `reasoner.seed` |
/// | `NARS_MAX_STEPS` | `max_steps` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |name| std::env::var(name).ok());
}

/// Apply overrides looked up by variable name through `var`.
pub(crate) fn apply_overrides(cfg: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("NARS_CONCEPT_CAPACITY")
        && let Ok(n) = v.parse::<usize>()
    {
        cfg.reasoner.concept_capacity = n;
    }
    if let Some(v) = var("NARS_LEVELS")
        && let Ok(n) = v.parse::<usize>()
    {
        cfg.reasoner.levels = n;
    }
    if let Some(v) = var("NARS_SEED")
        && let Ok(seed) = v.parse::<u64>()
    {
        cfg.reasoner.seed = Some(seed);
    }
    if let Some(v) = var("NARS_MAX_STEPS")
        && let Ok(n) = v.parse::<u64>()
    {
        cfg.max_steps = Some(n);
    }
}

/// Save the config to disk, creating `~/.nars/` if necessary.
pub fn save(cfg: &Config) -> Result<(), NarsError> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), NarsError> {
    let io_err = |what: &str, e: std::io::Error| {
        NarsError::InvalidConfig(format!("{what} {}: {e}", path.display()))
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err("failed to create directory for", e))?;
        // Restrict the config directory to the owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| io_err("failed to set directory permissions for", e))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| NarsError::Serialization(format!("failed to serialize config: {e}")))?;
    // Write the file with owner-only read/write (rw-------) on Unix.
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
            .map_err(|e| io_err("failed to write config at", e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| io_err("failed to write config at", e))?;
    Ok(())
}
