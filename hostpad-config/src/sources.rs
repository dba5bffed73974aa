use serde::Deserialize;
use std::path::PathBuf;

use crate::util::parse_csv;

/// Raw configuration as defined in a TOML file.
///
/// Durations are kept as strings here and parsed with `humantime` during
/// composition so that file and environment values share one parser.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub access: FileAccessConfig,
    #[serde(default)]
    pub paths: FilePathsConfig,
    #[serde(default)]
    pub shout: FileShoutConfig,
    #[serde(default)]
    pub actions: FileActionsConfig,
    pub shutdown_grace: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileAccessConfig {
    pub allowed_networks: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FilePathsConfig {
    pub hostcontrol_dir: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileShoutConfig {
    pub renderer: Option<PathBuf>,
    pub duration_policy: Option<String>,
    pub duration: Option<String>,
    pub per_char: Option<String>,
    pub min_duration: Option<String>,
    pub max_duration: Option<String>,
    pub render_timeout: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileActionsConfig {
    pub timeout: Option<String>,
}

/// Environment-derived configuration values, unparsed.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<String>,
    pub allowed_networks: Option<Vec<String>>,
    pub hostcontrol_dir: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub shout_renderer: Option<PathBuf>,
    pub shout_duration_policy: Option<String>,
    pub shout_duration: Option<String>,
    pub shout_per_char: Option<String>,
    pub shout_min_duration: Option<String>,
    pub shout_max_duration: Option<String>,
    pub shout_render_timeout: Option<String>,
    pub action_timeout: Option<String>,
    pub shutdown_grace: Option<String>,
}

impl EnvConfig {
    /// Read every recognised variable from the process environment.
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read variables through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name).filter(|value| !value.trim().is_empty())
        };
        let path = |name: &str| var(name).map(PathBuf::from);

        Self {
            config_path: path("HOSTPAD_CONFIG"),
            server_host: var("SERVER_HOST"),
            server_port: var("SERVER_PORT"),
            allowed_networks: var("HOSTPAD_ALLOWED_NETWORKS")
                .map(|raw| parse_csv(&raw)),
            hostcontrol_dir: path("HOSTCONTROL_DIR"),
            static_dir: path("STATIC_DIR"),
            shout_renderer: path("SHOUT_RENDERER"),
            shout_duration_policy: var("SHOUT_DURATION_POLICY"),
            shout_duration: var("SHOUT_DURATION"),
            shout_per_char: var("SHOUT_PER_CHAR"),
            shout_min_duration: var("SHOUT_MIN_DURATION"),
            shout_max_duration: var("SHOUT_MAX_DURATION"),
            shout_render_timeout: var("SHOUT_RENDER_TIMEOUT"),
            action_timeout: var("ACTION_TIMEOUT"),
            shutdown_grace: var("SHUTDOWN_GRACE"),
        }
    }
}
