use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use hostpad_core::{
    AccessGate, ActionRunner, AllowedOrigins, DurationPolicy, MessageSanitizer,
    ScriptRenderer,
};

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub access: AccessConfig,
    pub paths: PathsConfig,
    pub shout: ShoutConfig,
    pub actions: ActionsConfig,
    /// How long shutdown waits for an in-flight overlay.
    pub shutdown_grace: Duration,
    pub metadata: ConfigMetadata,
}

impl Config {
    /// Gate built from the configured allow-list.
    pub fn access_gate(&self) -> AccessGate {
        AccessGate::new(self.access.allowed_networks.clone())
    }

    /// Sanitizer applying the configured duration policy.
    pub fn sanitizer(&self) -> MessageSanitizer {
        MessageSanitizer::new(self.shout.duration_policy)
    }

    pub fn renderer(&self) -> ScriptRenderer {
        ScriptRenderer::new(&self.shout.renderer)
            .with_timeout(self.shout.render_timeout)
    }

    pub fn action_runner(&self) -> ActionRunner {
        ActionRunner::new(&self.paths.hostcontrol_dir)
            .with_timeout(self.actions.timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// `host:port`, suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        match self.host.parse::<std::net::IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.port).to_string(),
            Err(_) => format!("{}:{}", self.host, self.port),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccessConfig {
    pub allowed_networks: AllowedOrigins,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsConfig {
    /// Directory holding the host action scripts.
    pub hostcontrol_dir: PathBuf,
    /// Directory served for `GET`/`HEAD` fallbacks.
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoutConfig {
    /// Overlay renderer executable.
    pub renderer: PathBuf,
    pub duration_policy: DurationPolicy,
    pub render_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionsConfig {
    pub timeout: Duration,
}

/// Where the configuration came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

impl ConfigMetadata {
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
