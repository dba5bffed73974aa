use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Duration,
};

use hostpad_core::{
    AllowedOrigins, DurationPolicy,
    access::AllowedOriginsError,
    shout::{
        DEFAULT_FIXED_DURATION, DEFAULT_MAX_DURATION, DEFAULT_MIN_DURATION,
        DEFAULT_PER_CHAR_DURATION, DEFAULT_RENDER_TIMEOUT,
        DEFAULT_SHUTDOWN_GRACE,
    },
    actions::DEFAULT_ACTION_TIMEOUT,
};
use thiserror::Error;

use super::{
    models::{
        AccessConfig, ActionsConfig, Config, ConfigMetadata, PathsConfig,
        ServerConfig, ShoutConfig,
    },
    sources::{EnvConfig, FileConfig, FileShoutConfig},
    util::parse_duration,
    validation::{self, ConfigGuardRailError, ConfigWarnings},
};

static DEFAULT_CONFIG_LOCATIONS: LazyLock<Vec<PathBuf>> = LazyLock::new(|| {
    vec![
        PathBuf::from("hostpad.toml"),
        PathBuf::from("config/hostpad.toml"),
    ]
});

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8090;
const DEFAULT_HOSTCONTROL_DIR: &str = "./hostcontrol";
const DEFAULT_STATIC_DIR: &str = "./stream";
const DEFAULT_RENDERER_NAME: &str = "shout.sh";

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Load `.env`, read the process environment, and compose the config.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut load = self.load_from_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Compose the config from already gathered environment values. Does not
    /// touch `.env` files or the process environment.
    pub fn load_from_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) =
            self.compose_config(file_config, env, config_path)?;

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let mut source = ConfigPathSource::default();

        if let Some(explicit) = &self.options.config_path {
            source.explicit = Some(explicit.clone());
        } else if let Some(from_env) = &env_config.config_path {
            source.env = Some(from_env.clone());
        } else {
            source.default = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
                .cloned();
        }

        let Some((path, provenance)) = source.resolved_path() else {
            return Ok((None, None));
        };

        if !path.exists() {
            if provenance.is_explicit() {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents =
            fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
                path: path.clone(),
                source,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| {
                ConfigLoadError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;

        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();

        if config_path.is_none() {
            warnings.push_with_hint(
                "No hostpad.toml detected; using environment variables and defaults",
                "Create hostpad.toml or set HOSTPAD_CONFIG to pin settings in a file",
            );
        }

        let FileConfig {
            server: file_server,
            access: file_access,
            paths: file_paths,
            shout: file_shout,
            actions: file_actions,
            shutdown_grace: file_shutdown_grace,
        } = file_config.unwrap_or_default();

        let port = match env.server_port.as_deref() {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                ConfigLoadError::InvalidValue {
                    field: "SERVER_PORT",
                    value: raw.to_string(),
                    reason: "expected a port number between 0 and 65535"
                        .into(),
                }
            })?,
            None => file_server.port.unwrap_or(DEFAULT_PORT),
        };
        let server = ServerConfig {
            host: env
                .server_host
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
        };

        let allowed_networks = match env
            .allowed_networks
            .or(file_access.allowed_networks)
        {
            Some(entries) => AllowedOrigins::parse(&entries)?,
            None => AllowedOrigins::lan_defaults(),
        };
        let access = AccessConfig { allowed_networks };

        let hostcontrol_dir = env
            .hostcontrol_dir
            .or(file_paths.hostcontrol_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HOSTCONTROL_DIR));
        let static_dir = env
            .static_dir
            .or(file_paths.static_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        let FileShoutConfig {
            renderer: file_renderer,
            duration_policy: file_policy,
            duration: file_duration,
            per_char: file_per_char,
            min_duration: file_min,
            max_duration: file_max,
            render_timeout: file_render_timeout,
        } = file_shout;

        let renderer = env
            .shout_renderer
            .or(file_renderer)
            .unwrap_or_else(|| hostcontrol_dir.join(DEFAULT_RENDERER_NAME));

        let duration_policy = match env
            .shout_duration_policy
            .or(file_policy)
            .as_deref()
            .map(|raw| raw.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("fixed") => DurationPolicy::Fixed {
                duration: duration_setting(
                    "SHOUT_DURATION",
                    env.shout_duration,
                    file_duration,
                    DEFAULT_FIXED_DURATION,
                )?,
            },
            Some("proportional") => DurationPolicy::Proportional {
                per_char: duration_setting(
                    "SHOUT_PER_CHAR",
                    env.shout_per_char,
                    file_per_char,
                    DEFAULT_PER_CHAR_DURATION,
                )?,
                min: duration_setting(
                    "SHOUT_MIN_DURATION",
                    env.shout_min_duration,
                    file_min,
                    DEFAULT_MIN_DURATION,
                )?,
                max: duration_setting(
                    "SHOUT_MAX_DURATION",
                    env.shout_max_duration,
                    file_max,
                    DEFAULT_MAX_DURATION,
                )?,
            },
            Some(other) => {
                return Err(ConfigLoadError::InvalidValue {
                    field: "SHOUT_DURATION_POLICY",
                    value: other.to_string(),
                    reason: "expected `fixed` or `proportional`".into(),
                });
            }
        };

        let shout = ShoutConfig {
            renderer,
            duration_policy,
            render_timeout: duration_setting(
                "SHOUT_RENDER_TIMEOUT",
                env.shout_render_timeout,
                file_render_timeout,
                DEFAULT_RENDER_TIMEOUT,
            )?,
        };

        let actions = ActionsConfig {
            timeout: duration_setting(
                "ACTION_TIMEOUT",
                env.action_timeout,
                file_actions.timeout,
                DEFAULT_ACTION_TIMEOUT,
            )?,
        };

        let shutdown_grace = duration_setting(
            "SHUTDOWN_GRACE",
            env.shutdown_grace,
            file_shutdown_grace,
            DEFAULT_SHUTDOWN_GRACE,
        )?;

        let config = Config {
            server,
            access,
            paths: PathsConfig {
                hostcontrol_dir,
                static_dir,
            },
            shout,
            actions,
            shutdown_grace,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded: false,
            },
        };

        let guard_warnings = validation::apply_guard_rails(&config)?;
        warnings.extend(guard_warnings);

        Ok((config, warnings))
    }
}

/// Environment value, else file value, else `default`; parsed as a duration.
fn duration_setting(
    field: &'static str,
    env: Option<String>,
    file: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigLoadError> {
    match env.or(file) {
        Some(raw) => parse_duration(&raw).map_err(|source| {
            ConfigLoadError::InvalidDuration {
                field,
                value: raw,
                source,
            }
        }),
        None => Ok(default),
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {}", path.display())]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid {field} `{value}`: {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid {field} `{value}`")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("invalid allowed network")]
    AllowedNetworks(#[from] AllowedOriginsError),
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug, Default)]
struct ConfigPathSource {
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    default: Option<PathBuf>,
}

impl ConfigPathSource {
    fn resolved_path(&self) -> Option<(PathBuf, ConfigPathProvenance)> {
        if let Some(path) = &self.explicit {
            return Some((path.clone(), ConfigPathProvenance::Explicit));
        }
        if let Some(path) = &self.env {
            return Some((path.clone(), ConfigPathProvenance::Env));
        }
        if let Some(path) = &self.default {
            return Some((path.clone(), ConfigPathProvenance::Default));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigPathProvenance {
    Explicit,
    Env,
    Default,
}

impl ConfigPathProvenance {
    fn is_explicit(self) -> bool {
        matches!(
            self,
            ConfigPathProvenance::Explicit | ConfigPathProvenance::Env
        )
    }
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoad {
    pub fn config_path(&self) -> Option<&Path> {
        self.config.metadata.config_path()
    }
}
