use std::{
    collections::HashMap, ffi::OsString, fs, path::Path, time::Duration,
};

use hostpad_config::{
    ConfigGuardRailError, ConfigLoadError, ConfigLoader, EnvConfig,
};
use hostpad_core::DurationPolicy;
use parking_lot::Mutex;
use tempfile::TempDir;

/// Serializes tests that mutate the process environment.
static ENV_LOCK: Mutex<()> = Mutex::new(());

struct EnvVarGuard {
    key: &'static str,
    previous: Option<OsString>,
}

impl EnvVarGuard {
    fn unset(key: &'static str) -> Self {
        let previous = std::env::var_os(key);
        // SAFETY: callers hold ENV_LOCK and the previous value is restored on drop.
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, previous }
    }

    fn set(key: &'static str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        let previous = std::env::var_os(key);
        // SAFETY: callers hold ENV_LOCK and the previous value is restored on drop.
        unsafe {
            std::env::set_var(key, value);
        }
        Self { key, previous }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        // SAFETY: we reinstate the environment variable to its prior state.
        unsafe {
            match &self.previous {
                Some(prev) => std::env::set_var(self.key, prev),
                None => std::env::remove_var(self.key),
            }
        }
    }
}

fn env(pairs: &[(&str, &str)]) -> EnvConfig {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    EnvConfig::from_lookup(|name| vars.get(name).cloned())
}

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("hostpad.toml");
    fs::write(&path, contents).unwrap();
    path
}

fn seed_layout(root: &Path) {
    fs::create_dir_all(root.join("hostcontrol")).unwrap();
    fs::create_dir_all(root.join("stream")).unwrap();
    fs::write(root.join("hostcontrol/shout.sh"), "#!/bin/sh\n").unwrap();
}

#[test]
fn defaults_apply_without_file_or_environment() {
    let load = ConfigLoader::new().load_from_env(env(&[])).unwrap();
    let config = load.config;

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8090);
    assert_eq!(config.server.bind_address(), "0.0.0.0:8090");
    assert_eq!(config.paths.hostcontrol_dir, Path::new("./hostcontrol"));
    assert_eq!(config.paths.static_dir, Path::new("./stream"));
    assert_eq!(config.shout.renderer, Path::new("./hostcontrol/shout.sh"));
    assert_eq!(config.shout.duration_policy, DurationPolicy::default());
    assert_eq!(config.shout.render_timeout, Duration::from_secs(60));
    assert_eq!(config.actions.timeout, Duration::from_secs(10));
    assert_eq!(config.shutdown_grace, Duration::from_secs(5));
    assert_eq!(config.access.allowed_networks.len(), 5);
    assert!(config.metadata.config_path.is_none());

    assert!(
        load.warnings
            .iter()
            .any(|w| w.message.contains("No hostpad.toml detected"))
    );
}

#[test]
fn file_values_are_used_and_environment_overrides_them() {
    let dir = TempDir::new().unwrap();
    seed_layout(dir.path());
    let path = write_config(
        &dir,
        &format!(
            r#"
shutdown_grace = "2s"

[server]
host = "127.0.0.1"
port = 9100

[access]
allowed_networks = ["192.168.7.0/24"]

[paths]
hostcontrol_dir = "{root}/hostcontrol"
static_dir = "{root}/stream"

[shout]
duration_policy = "proportional"
per_char = "50ms"
min_duration = "2s"
max_duration = "8s"
render_timeout = "30s"

[actions]
timeout = "3s"
"#,
            root = dir.path().display()
        ),
    );

    let load = ConfigLoader::new()
        .with_config_path(&path)
        .load_from_env(env(&[
            ("SERVER_PORT", "9200"),
            ("SHOUT_MAX_DURATION", "12s"),
        ]))
        .unwrap();
    let config = load.config;

    assert_eq!(config.server.bind_address(), "127.0.0.1:9200");
    assert_eq!(config.access.allowed_networks.to_string(), "192.168.7.0/24");
    assert_eq!(
        config.shout.duration_policy,
        DurationPolicy::Proportional {
            per_char: Duration::from_millis(50),
            min: Duration::from_secs(2),
            max: Duration::from_secs(12),
        }
    );
    assert_eq!(
        config.shout.renderer,
        dir.path().join("hostcontrol").join("shout.sh")
    );
    assert_eq!(config.shout.render_timeout, Duration::from_secs(30));
    assert_eq!(config.actions.timeout, Duration::from_secs(3));
    assert_eq!(config.shutdown_grace, Duration::from_secs(2));
    assert_eq!(config.metadata.config_path.as_deref(), Some(path.as_path()));
    assert!(load.warnings.is_empty(), "{:?}", load.warnings);
}

#[test]
fn fixed_policy_reads_its_duration() {
    let load = ConfigLoader::new()
        .load_from_env(env(&[
            ("SHOUT_DURATION_POLICY", "Fixed"),
            ("SHOUT_DURATION", "7s 500ms"),
        ]))
        .unwrap();
    assert_eq!(
        load.config.shout.duration_policy,
        DurationPolicy::Fixed {
            duration: Duration::from_millis(7500)
        }
    );
}

#[test]
fn explicit_config_path_must_exist() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");

    let err = ConfigLoader::new()
        .with_config_path(&missing)
        .load_from_env(env(&[]))
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::MissingConfig { path } if path == missing));
}

#[test]
fn config_path_from_environment_must_exist() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");
    let missing_str = missing.display().to_string();

    let err = ConfigLoader::new()
        .load_from_env(env(&[("HOSTPAD_CONFIG", &missing_str)]))
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[server\nport = ");

    let err = ConfigLoader::new()
        .with_config_path(&path)
        .load_from_env(env(&[]))
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::Parse { .. }), "{err:?}");
}

#[test]
fn invalid_values_are_rejected_with_the_variable_name() {
    let cases: [(&str, &str, &str); 4] = [
        ("SERVER_PORT", "eighty", "SERVER_PORT"),
        ("SHUTDOWN_GRACE", "later", "SHUTDOWN_GRACE"),
        ("SHOUT_DURATION_POLICY", "random", "SHOUT_DURATION_POLICY"),
        ("SHOUT_RENDER_TIMEOUT", "10", "SHOUT_RENDER_TIMEOUT"),
    ];

    for (key, value, expected_field) in cases {
        let err = ConfigLoader::new()
            .load_from_env(env(&[(key, value)]))
            .unwrap_err();
        let field = match err {
            ConfigLoadError::InvalidValue { field, .. } => field,
            ConfigLoadError::InvalidDuration { field, .. } => field,
            other => panic!("{key}={value} gave {other:?}"),
        };
        assert_eq!(field, expected_field);
    }
}

#[test]
fn malformed_network_prefix_is_rejected() {
    let err = ConfigLoader::new()
        .load_from_env(env(&[(
            "HOSTPAD_ALLOWED_NETWORKS",
            "192.168.1.0/24,not-a-network",
        )]))
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::AllowedNetworks(_)), "{err:?}");
}

#[test]
fn empty_allow_list_in_file_fails_guard_rails() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[access]\nallowed_networks = []\n");

    let err = ConfigLoader::new()
        .with_config_path(&path)
        .load_from_env(env(&[]))
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigLoadError::GuardRail(ConfigGuardRailError::EmptyAllowList)
    ));
}

#[test]
fn display_duration_must_fit_the_render_timeout() {
    let err = ConfigLoader::new()
        .load_from_env(env(&[("SHOUT_DURATION", "90s")]))
        .unwrap_err();
    assert!(
        matches!(
            err,
            ConfigLoadError::GuardRail(
                ConfigGuardRailError::DisplayExceedsRenderTimeout {
                    field: "SHOUT_DURATION",
                    ..
                }
            )
        ),
        "{err:?}"
    );

    let load = ConfigLoader::new()
        .load_from_env(env(&[
            ("SHOUT_DURATION", "90s"),
            ("SHOUT_RENDER_TIMEOUT", "2m"),
        ]))
        .unwrap();
    assert_eq!(
        load.config.shout.render_timeout,
        Duration::from_secs(120)
    );
}

#[test]
fn env_file_values_reach_the_loaded_config() {
    let _lock = ENV_LOCK.lock();
    let _policy = EnvVarGuard::unset("SHOUT_DURATION_POLICY");
    let _per_char = EnvVarGuard::unset("SHOUT_PER_CHAR");
    let _grace = EnvVarGuard::set("SHUTDOWN_GRACE", "9s");

    let dir = TempDir::new().unwrap();
    let env_file = dir.path().join(".env");
    fs::write(
        &env_file,
        "SHOUT_DURATION_POLICY=proportional\nSHOUT_PER_CHAR=120ms\nSHUTDOWN_GRACE=1s\n",
    )
    .unwrap();

    let load = ConfigLoader::new().with_env_file(&env_file).load().unwrap();

    assert!(load.config.metadata.env_file_loaded);
    assert!(matches!(
        load.config.shout.duration_policy,
        DurationPolicy::Proportional { per_char, .. } if per_char == Duration::from_millis(120)
    ));
    // Variables already present in the process win over the .env file.
    assert_eq!(load.config.shutdown_grace, Duration::from_secs(9));
}

#[test]
fn missing_env_file_is_not_an_error() {
    let _lock = ENV_LOCK.lock();
    let dir = TempDir::new().unwrap();

    let load = ConfigLoader::new()
        .with_env_file(dir.path().join("missing.env"))
        .load()
        .unwrap();
    assert!(!load.config.metadata.env_file_loaded);
}
