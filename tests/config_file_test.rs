// Integration test for configuration file support

use nix::sys::signal::Signal;
use sigrelay::{ForwardConfig, SigrelayError};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_toml_config_top_level() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("sigrelay.toml");

    let toml_content = r#"
        exclude = ["SIGPIPE", "HUP", "winch"]
        restart_interrupted = false
    "#;

    fs::write(&config_path, toml_content).unwrap();

    let config = ForwardConfig::from_file(&config_path).unwrap();
    assert_eq!(config.exclude, vec!["SIGPIPE", "HUP", "winch"]);
    assert!(!config.restart_interrupted);

    let signals = config.signals().unwrap();
    assert!(!signals.contains(&Signal::SIGHUP.into()));
    assert!(!signals.contains(&Signal::SIGWINCH.into()));
    assert!(signals.contains(&Signal::SIGTERM.into()));
}

#[test]
fn test_load_toml_config_forward_table() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("sigrelay.toml");

    let toml_content = r#"
        [forward]
        exclude = ["SIGUSR1"]
    "#;

    fs::write(&config_path, toml_content).unwrap();

    let config = ForwardConfig::from_file(&config_path).unwrap();
    assert_eq!(config.exclude, vec!["SIGUSR1"]);
    assert!(config.restart_interrupted);
}

#[test]
fn test_load_toml_config_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("empty.toml");
    fs::write(&config_path, "").unwrap();

    let config = ForwardConfig::from_file(&config_path).unwrap();
    assert_eq!(config, ForwardConfig::default());
}

#[test]
fn test_load_json_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("sigrelay.json");

    let json_content = r#"
    {
        "exclude": ["SIGPIPE", "SIGTSTP", "SIGTTIN", "SIGTTOU"]
    }
    "#;

    fs::write(&config_path, json_content).unwrap();

    let config = ForwardConfig::from_file(&config_path).unwrap();
    assert!(config.restart_interrupted);

    let signals = config.signals().unwrap();
    assert!(!signals.contains(&Signal::SIGTSTP.into()));
    assert!(!signals.contains(&Signal::SIGTTIN.into()));
    assert!(!signals.contains(&Signal::SIGTTOU.into()));
}

#[test]
fn test_invalid_signal_in_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("bad.toml");
    fs::write(&config_path, r#"exclude = ["SIGNOTREAL"]"#).unwrap();

    let result = ForwardConfig::from_file(&config_path);
    assert!(matches!(
        result,
        Err(SigrelayError::ConfigValidationError(_))
    ));
}

#[test]
fn test_malformed_toml() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("broken.toml");
    fs::write(&config_path, "exclude = [").unwrap();

    let result = ForwardConfig::from_file(&config_path);
    assert!(matches!(result, Err(SigrelayError::InvalidConfig(_))));
}

#[test]
fn test_malformed_json() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("broken.json");
    fs::write(&config_path, r#"{"exclude": "SIGPIPE"}"#).unwrap();

    let result = ForwardConfig::from_file(&config_path);
    assert!(matches!(result, Err(SigrelayError::InvalidConfig(_))));
}
