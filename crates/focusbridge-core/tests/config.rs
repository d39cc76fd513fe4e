use serial_test::serial;
use tempfile::TempDir;

use focusbridge_core::config::{
    load_config_file, resolve_config_with_source, write_config_file, BridgeConfig, HOME_ENV,
    INTERPRETER_ENV,
};
use focusbridge_core::runner::ProcessRunner;

struct EnvGuard {
    saved: Vec<(&'static str, Option<String>)>,
}

impl EnvGuard {
    fn set(vars: &[(&'static str, Option<&str>)]) -> Self {
        let saved = vars
            .iter()
            .map(|(key, _)| (*key, std::env::var(key).ok()))
            .collect();
        for (key, value) in vars {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
    }
}

#[test]
#[serial]
fn defaults_apply_without_config() {
    let home = TempDir::new().expect("tempdir");
    let _guard = EnvGuard::set(&[
        (HOME_ENV, Some(home.path().to_str().expect("utf8"))),
        (INTERPRETER_ENV, None),
    ]);
    let (config, source) = resolve_config_with_source().expect("resolve");
    assert_eq!(source, "default");
    let runner = ProcessRunner::from_config(&config);
    assert_eq!(runner.program(), "osascript");
    assert_eq!(runner.args(), ["-l", "JavaScript", "-e"]);
}

#[test]
#[serial]
fn global_config_file_is_used() {
    let home = TempDir::new().expect("tempdir");
    let path = home.path().join("config.toml");
    write_config_file(
        &path,
        &BridgeConfig {
            interpreter: Some("/usr/local/bin/osascript".into()),
            interpreter_args: None,
            application: Some("OmniFocus 4".into()),
        },
    )
    .expect("write");
    let _guard = EnvGuard::set(&[
        (HOME_ENV, Some(home.path().to_str().expect("utf8"))),
        (INTERPRETER_ENV, None),
    ]);

    let (config, source) = resolve_config_with_source().expect("resolve");
    assert_eq!(source, "global");
    assert_eq!(config.interpreter(), "/usr/local/bin/osascript");
    assert_eq!(config.application(), "OmniFocus 4");
    assert_eq!(load_config_file(&path).expect("load"), Some(config));
}

#[test]
#[serial]
fn environment_overrides_the_config_file() {
    let home = TempDir::new().expect("tempdir");
    write_config_file(
        &home.path().join("config.toml"),
        &BridgeConfig {
            interpreter: Some("osascript".into()),
            ..BridgeConfig::default()
        },
    )
    .expect("write");
    let _guard = EnvGuard::set(&[
        (HOME_ENV, Some(home.path().to_str().expect("utf8"))),
        (INTERPRETER_ENV, Some("/opt/bin/jxa-runner --quiet")),
    ]);

    let (config, source) = resolve_config_with_source().expect("resolve");
    assert_eq!(source, "env");
    assert_eq!(config.interpreter(), "/opt/bin/jxa-runner");
    assert_eq!(config.interpreter_args(), vec!["--quiet"]);
}

#[test]
#[serial]
fn malformed_config_is_an_error() {
    let home = TempDir::new().expect("tempdir");
    std::fs::write(home.path().join("config.toml"), "interpreter = [").expect("write");
    let _guard = EnvGuard::set(&[
        (HOME_ENV, Some(home.path().to_str().expect("utf8"))),
        (INTERPRETER_ENV, None),
    ]);
    assert!(resolve_config_with_source().is_err());
}
