use std::time::Duration;

use hostpad_core::DurationPolicy;
use thiserror::Error;

use super::models::Config;

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error(
        "HOSTPAD_ALLOWED_NETWORKS is empty; every request would be rejected"
    )]
    EmptyAllowList,
    #[error(
        "SHOUT_MIN_DURATION ({min:?}) is greater than SHOUT_MAX_DURATION ({max:?})"
    )]
    InvertedDurationBounds { min: Duration, max: Duration },
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
    #[error(
        "{field} ({display:?}) does not fit inside SHOUT_RENDER_TIMEOUT ({timeout:?}); overlays would be killed before they finish"
    )]
    DisplayExceedsRenderTimeout {
        field: &'static str,
        display: Duration,
        timeout: Duration,
    },
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    let origins = &config.access.allowed_networks;
    if origins.is_empty() {
        return Err(ConfigGuardRailError::EmptyAllowList);
    }
    if origins.is_catch_all() {
        warnings.push_with_hint(
            "HOSTPAD_ALLOWED_NETWORKS contains a /0 prefix; any address can trigger host actions",
            "Restrict the allow-list to your LAN, e.g. 192.168.1.0/24",
        );
    }

    match config.shout.duration_policy {
        DurationPolicy::Fixed { duration } if duration.is_zero() => {
            return Err(ConfigGuardRailError::ZeroDuration {
                field: "SHOUT_DURATION",
            });
        }
        DurationPolicy::Proportional { min, max, .. } if min > max => {
            return Err(ConfigGuardRailError::InvertedDurationBounds {
                min,
                max,
            });
        }
        DurationPolicy::Proportional { per_char, .. } if per_char.is_zero() => {
            warnings.push_with_hint(
                "SHOUT_PER_CHAR is zero; every overlay will use SHOUT_MIN_DURATION",
                "Set SHOUT_DURATION_POLICY=fixed if a constant duration is intended",
            );
        }
        _ => {}
    }

    if config.shout.render_timeout.is_zero() {
        return Err(ConfigGuardRailError::ZeroDuration {
            field: "SHOUT_RENDER_TIMEOUT",
        });
    }
    let (field, longest_display) = match config.shout.duration_policy {
        DurationPolicy::Fixed { duration } => ("SHOUT_DURATION", duration),
        DurationPolicy::Proportional { max, .. } => ("SHOUT_MAX_DURATION", max),
    };
    if longest_display >= config.shout.render_timeout {
        return Err(ConfigGuardRailError::DisplayExceedsRenderTimeout {
            field,
            display: longest_display,
            timeout: config.shout.render_timeout,
        });
    }

    if config.actions.timeout.is_zero() {
        return Err(ConfigGuardRailError::ZeroDuration {
            field: "ACTION_TIMEOUT",
        });
    }

    if !config.paths.hostcontrol_dir.is_dir() {
        warnings.push_with_hint(
            format!(
                "hostcontrol directory {} does not exist; directional commands will be no-ops",
                config.paths.hostcontrol_dir.display()
            ),
            "Set HOSTCONTROL_DIR to the directory containing space.sh, left.sh, right.sh, up.sh and down.sh",
        );
    }

    if !config.shout.renderer.is_file() {
        warnings.push_with_hint(
            format!(
                "shout renderer {} not found; shouts will be accepted but not displayed",
                config.shout.renderer.display()
            ),
            "Set SHOUT_RENDERER to an executable overlay script",
        );
    }

    if !config.paths.static_dir.is_dir() {
        warnings.push_with_hint(
            format!(
                "static directory {} does not exist; the browser front-end will return 404",
                config.paths.static_dir.display()
            ),
            "Set STATIC_DIR to the directory containing index.html",
        );
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use hostpad_core::AllowedOrigins;
    use tempfile::TempDir;

    use super::*;
    use crate::models::{
        AccessConfig, ActionsConfig, ConfigMetadata, PathsConfig, ServerConfig,
        ShoutConfig,
    };

    fn config_in(dir: &TempDir) -> Config {
        let hostcontrol = dir.path().join("hostcontrol");
        let static_dir = dir.path().join("stream");
        std::fs::create_dir_all(&hostcontrol).unwrap();
        std::fs::create_dir_all(&static_dir).unwrap();
        std::fs::write(hostcontrol.join("shout.sh"), "#!/bin/sh\n").unwrap();

        Config {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 8090,
            },
            access: AccessConfig {
                allowed_networks: AllowedOrigins::lan_defaults(),
            },
            paths: PathsConfig {
                hostcontrol_dir: hostcontrol.clone(),
                static_dir,
            },
            shout: ShoutConfig {
                renderer: hostcontrol.join("shout.sh"),
                duration_policy: DurationPolicy::default(),
                render_timeout: Duration::from_secs(60),
            },
            actions: ActionsConfig {
                timeout: Duration::from_secs(10),
            },
            shutdown_grace: Duration::from_secs(5),
            metadata: ConfigMetadata::default(),
        }
    }

    #[test]
    fn complete_configuration_has_no_warnings() {
        let dir = TempDir::new().unwrap();
        let warnings = apply_guard_rails(&config_in(&dir)).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn empty_allow_list_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.access.allowed_networks = AllowedOrigins::new(Vec::new());

        assert!(matches!(
            apply_guard_rails(&config),
            Err(ConfigGuardRailError::EmptyAllowList)
        ));
    }

    #[test]
    fn catch_all_network_is_a_warning() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.access.allowed_networks =
            AllowedOrigins::parse(["0.0.0.0/0"]).unwrap();

        let warnings = apply_guard_rails(&config).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings.items[0].message.contains("/0"));
    }

    #[test]
    fn inverted_proportional_bounds_are_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.shout.duration_policy = DurationPolicy::Proportional {
            per_char: Duration::from_millis(80),
            min: Duration::from_secs(20),
            max: Duration::from_secs(10),
        };

        assert!(matches!(
            apply_guard_rails(&config),
            Err(ConfigGuardRailError::InvertedDurationBounds { .. })
        ));
    }

    #[test]
    fn zero_fixed_duration_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.shout.duration_policy = DurationPolicy::Fixed {
            duration: Duration::ZERO,
        };

        assert!(matches!(
            apply_guard_rails(&config),
            Err(ConfigGuardRailError::ZeroDuration {
                field: "SHOUT_DURATION"
            })
        ));
    }

    #[test]
    fn display_longer_than_render_timeout_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.shout.duration_policy = DurationPolicy::Fixed {
            duration: Duration::from_secs(90),
        };

        match apply_guard_rails(&config) {
            Err(ConfigGuardRailError::DisplayExceedsRenderTimeout {
                field,
                display,
                timeout,
            }) => {
                assert_eq!(field, "SHOUT_DURATION");
                assert_eq!(display, Duration::from_secs(90));
                assert_eq!(timeout, Duration::from_secs(60));
            }
            other => panic!("expected timeout guard rail, got {other:?}"),
        }

        config.shout.duration_policy = DurationPolicy::Proportional {
            per_char: Duration::from_millis(80),
            min: Duration::from_secs(3),
            max: Duration::from_secs(15),
        };
        config.shout.render_timeout = Duration::from_secs(15);
        assert!(matches!(
            apply_guard_rails(&config),
            Err(ConfigGuardRailError::DisplayExceedsRenderTimeout {
                field: "SHOUT_MAX_DURATION",
                ..
            })
        ));

        config.shout.render_timeout = Duration::from_secs(16);
        assert!(apply_guard_rails(&config).is_ok());
    }

    #[test]
    fn missing_collaborators_are_warnings() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.paths.hostcontrol_dir = PathBuf::from("/nonexistent/hostcontrol");
        config.paths.static_dir = dir.path().join("missing-stream");
        config.shout.renderer = dir.path().join("missing.sh");

        let warnings = apply_guard_rails(&config).unwrap();
        let messages: Vec<_> =
            warnings.iter().map(|w| w.message.as_str()).collect();
        assert_eq!(messages.len(), 3, "{messages:?}");
        assert!(messages.iter().any(|m| m.contains("hostcontrol directory")));
        assert!(messages.iter().any(|m| m.contains("shout renderer")));
        assert!(messages.iter().any(|m| m.contains("static directory")));
    }
}
