//! Persisted defaults and per-invocation overrides.
//!
//! Loads `~/.config/taiga-stats/config.toml` (or `TAIGA_STATS_CONFIG`).
//! Command-line flags win over file values. The merged [`RunConfig`] is built
//! once at startup and handed to commands by reference.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::GlobalArgs;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("missing required setting `{0}`; pass --{1} or run `taiga-stats config`")]
    MissingField(&'static str, &'static str),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Tracker base URL
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Used to obtain a token when none is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,

    /// Where snapshot files and charts live
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Name of the custom story attribute listing dependencies
    #[serde(default = "default_dependency_attribute")]
    pub dependency_attribute: String,
}

fn default_url() -> String {
    "https://api.taiga.io".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_dependency_attribute() -> String {
    "Depends On".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: default_url(),
            auth_token: None,
            username: None,
            password: None,
            project_id: None,
            output_dir: default_output_dir(),
            dependency_attribute: default_dependency_attribute(),
        }
    }
}

impl Settings {
    /// Environment variable for config path override
    pub const ENV_CONFIG_PATH: &'static str = "TAIGA_STATS_CONFIG";

    /// Default config filename
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "config.toml";

    /// Resolve the configuration file path
    ///
    /// Resolution order:
    /// 1. explicit `--config`
    /// 2. `TAIGA_STATS_CONFIG` environment variable
    /// 3. `<config dir>/taiga-stats/config.toml`
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH)
            && !path.is_empty()
        {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .map(|d| d.join("taiga-stats").join(Self::DEFAULT_CONFIG_FILENAME))
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_FILENAME))
    }

    /// Load settings from `path`; a missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "config not found, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        let write = |path: &Path| -> std::io::Result<()> {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, contents.as_bytes())
        };
        write(path).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "saved config");
        Ok(())
    }

    /// Apply command-line overrides.
    pub fn merge_args(mut self, args: &GlobalArgs) -> Self {
        if let Some(url) = &args.url {
            self.url = url.clone();
        }
        if let Some(token) = &args.auth_token {
            self.auth_token = Some(token.clone());
        }
        if let Some(username) = &args.username {
            self.username = Some(username.clone());
        }
        if let Some(password) = &args.password {
            self.password = Some(password.clone());
        }
        if let Some(project_id) = args.project_id {
            self.project_id = Some(project_id);
        }
        if let Some(dir) = &args.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(attribute) = &args.dependency_attribute {
            self.dependency_attribute = attribute.clone();
        }
        self
    }
}

/// Settings for one invocation, after merging file and flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub settings: Settings,
    pub config_path: PathBuf,
}

impl RunConfig {
    pub fn assemble(args: &GlobalArgs) -> Result<Self> {
        let config_path = Settings::resolve_path(args.config.as_deref());
        let settings = Settings::load_from_path(&config_path)?.merge_args(args);
        Ok(Self {
            settings,
            config_path,
        })
    }

    pub fn project_id(&self) -> Result<i64> {
        self.settings
            .project_id
            .ok_or(ConfigError::MissingField("project_id", "project-id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    fn no_args() -> GlobalArgs {
        GlobalArgs::default()
    }

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.url, "https://api.taiga.io");
        assert_eq!(s.output_dir, PathBuf::from("."));
        assert_eq!(s.dependency_attribute, "Depends On");
        assert_eq!(s.project_id, None);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let s = Settings::load_from_path(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "project_id = 42\nauth_token = \"abc\"\n").unwrap();

        let s = Settings::load_from_path(&path).unwrap();
        assert_eq!(s.project_id, Some(42));
        assert_eq!(s.auth_token.as_deref(), Some("abc"));
        assert_eq!(s.url, "https://api.taiga.io");
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "project_id = \"not a number\"\n").unwrap();
        let err = Settings::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn flags_override_file_values() {
        let file = Settings {
            project_id: Some(1),
            url: "https://old.example".into(),
            ..Settings::default()
        };
        let args = GlobalArgs {
            project_id: Some(2),
            output_dir: Some(PathBuf::from("/srv/cfd")),
            ..no_args()
        };
        let merged = file.merge_args(&args);
        assert_eq!(merged.project_id, Some(2));
        assert_eq!(merged.url, "https://old.example");
        assert_eq!(merged.output_dir, PathBuf::from("/srv/cfd"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.toml");
        let s = Settings {
            project_id: Some(9),
            auth_token: Some("t".into()),
            ..Settings::default()
        };
        s.save_to_path(&path).unwrap();
        assert_eq!(Settings::load_from_path(&path).unwrap(), s);
    }

    #[test]
    #[serial]
    fn env_var_selects_config_path() {
        unsafe {
            std::env::set_var(Settings::ENV_CONFIG_PATH, "/tmp/custom-taiga.toml");
        }
        assert_eq!(
            Settings::resolve_path(None),
            PathBuf::from("/tmp/custom-taiga.toml")
        );
        assert_eq!(
            Settings::resolve_path(Some(Path::new("/etc/ts.toml"))),
            PathBuf::from("/etc/ts.toml")
        );
        unsafe {
            std::env::remove_var(Settings::ENV_CONFIG_PATH);
        }
    }

    #[test]
    fn project_id_is_required() {
        let cfg = RunConfig {
            settings: Settings::default(),
            config_path: PathBuf::from("config.toml"),
        };
        assert!(matches!(
            cfg.project_id(),
            Err(ConfigError::MissingField("project_id", _))
        ));
    }
}
