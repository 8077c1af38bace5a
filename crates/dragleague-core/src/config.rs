// Configuration loading and parsing (config/dragleague.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the single config file under `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "dragleague.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// dragleague.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub scoring: ScoringDefaults,
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Point values given to new leagues that don't set their own.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScoringDefaults {
    pub placement_points: u32,
    pub challenge_points: u32,
    pub lip_sync_points: u32,
}

impl Default for ScoringDefaults {
    fn default() -> Self {
        ScoringDefaults {
            placement_points: 1,
            challenge_points: 1,
            lip_sync_points: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// How often `watch` runs the deadline check.
    pub check_interval_secs: u64,
    /// Actor name recorded on history entries written by scheduled work.
    pub system_actor: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "dragleague=info,warn".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load and validate `config/dragleague.toml` under `base_dir`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;

    Ok(config)
}

/// Copy `defaults/dragleague.toml` into `config/` unless a config file is
/// already there, so local edits are never overwritten. Returns the path
/// written, if any.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.exists() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(CONFIG_FILE);
    if !source.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no {CONFIG_FILE} under config/ or defaults/ in {}; \
                 pass --base-dir pointing at the dragleague-core crate or a copy of it",
                base_dir.display()
            ),
        });
    }

    let copy_err = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
    };
    std::fs::create_dir_all(base_dir.join("config")).map_err(copy_err)?;
    std::fs::copy(&source, &target).map_err(copy_err)?;
    Ok(Some(target))
}

/// Load config relative to `base_dir`, seeding it from the defaults on first
/// run.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_file(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.database.path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    if config.lifecycle.check_interval_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "lifecycle.check_interval_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.lifecycle.system_actor.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "lifecycle.system_actor".into(),
            message: "must not be empty".into(),
        });
    }

    if config.scoring.placement_points == 0 {
        return Err(ConfigError::ValidationError {
            field: "scoring.placement_points".into(),
            message: "must be greater than 0".into(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: the crate root, which holds `defaults/`.
    fn project_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    }

    /// Helper: fresh temp dir with a `config/` subdirectory.
    fn scratch(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        tmp
    }

    const VALID: &str = r#"
[database]
path = "league.db"

[scoring]
placement_points = 1
challenge_points = 2
lip_sync_points = 1

[lifecycle]
check_interval_secs = 60
system_actor = "system"
"#;

    #[test]
    fn load_defaults_shipped_with_crate() {
        let tmp = scratch("dragleague_config_defaults");
        fs::copy(
            project_root().join("defaults").join(CONFIG_FILE),
            tmp.join("config").join(CONFIG_FILE),
        )
        .unwrap();

        let config = load_config_from(&tmp).expect("shipped defaults should load");
        assert_eq!(config.database.path, "dragleague.db");
        assert_eq!(config.scoring.placement_points, 1);
        assert_eq!(config.scoring.challenge_points, 1);
        assert_eq!(config.lifecycle.check_interval_secs, 300);
        assert_eq!(config.lifecycle.system_actor, "system");
        assert_eq!(config.logging.filter, "dragleague=info,warn");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn logging_section_is_optional() {
        let tmp = scratch("dragleague_config_no_logging");
        fs::write(tmp.join("config").join(CONFIG_FILE), VALID).unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.logging.filter, LoggingConfig::default().filter);
        assert_eq!(config.scoring.challenge_points, 2);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_check_interval() {
        let tmp = scratch("dragleague_config_zero_interval");
        let text = VALID.replace("check_interval_secs = 60", "check_interval_secs = 0");
        fs::write(tmp.join("config").join(CONFIG_FILE), text).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "lifecycle.check_interval_secs");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_names_file() {
        let tmp = scratch("dragleague_config_parse_error");
        fs::write(tmp.join("config").join(CONFIG_FILE), "[database\npath=").unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_file_is_not_found() {
        let tmp = scratch("dragleague_config_missing");
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn defaults_are_copied_once() {
        let tmp = std::env::temp_dir().join("dragleague_config_copy");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults").join(CONFIG_FILE), VALID).unwrap();

        let target = tmp.join("config").join(CONFIG_FILE);
        assert_eq!(ensure_config_file(&tmp).unwrap(), Some(target.clone()));
        assert_eq!(load_config(&tmp).unwrap().lifecycle.check_interval_secs, 60);

        // Local edits survive later runs.
        fs::write(&target, "edited").unwrap();
        assert_eq!(ensure_config_file(&tmp).unwrap(), None);
        assert_eq!(fs::read_to_string(&target).unwrap(), "edited");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn existing_config_needs_no_defaults() {
        let tmp = scratch("dragleague_config_no_defaults");
        fs::write(tmp.join("config").join(CONFIG_FILE), VALID).unwrap();
        assert_eq!(ensure_config_file(&tmp).unwrap(), None);
        assert!(load_config(&tmp).is_ok());
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_defaults_and_config_errors() {
        let tmp = std::env::temp_dir().join("dragleague_config_empty");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        assert!(matches!(
            ensure_config_file(&tmp),
            Err(ConfigError::DefaultsCopyError { .. })
        ));

        let _ = fs::remove_dir_all(&tmp);
    }
}
