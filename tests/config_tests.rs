//! Configuration files loaded from disk.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use switchyard::error::{ConfigError, Error};
use switchyard::infrastructure::config::{Config, ExhaustionPolicy};

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, content).expect("write config");
    path
}

const FULL: &str = r#"
simulation = true

[logging]
level = "debug"
format = "json"

[[endpoints]]
name = "helius"
url = "https://mainnet.helius-rpc.com"
ws_url = "wss://mainnet.helius-rpc.com"
weight = 10

[[endpoints]]
name = "public"
url = "https://api.mainnet-beta.solana.com"
weight = 1
primary = true

[pool]
error_threshold = 5
recovery_secs = 10
exhaustion_policy = "half_open"
commitment = "finalized"

[admission]
max_requests_per_second = 20
max_requests_per_minute = 600
max_concurrent_requests = 4
max_pending = 50

[engine]
path = "/opt/engine/bin/engine"
args = ["--network", "mainnet"]
transaction_timeout_secs = 30
"#;

#[test]
fn full_config_round_trips_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, FULL);

    let config = Config::load(&path).unwrap();

    assert!(config.simulation);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.endpoints.len(), 2);
    assert_eq!(config.write_primary_index(), Some(1));
    assert_eq!(config.pool.error_threshold, 5);
    assert_eq!(config.pool.recovery_secs, 10);
    assert_eq!(config.pool.exhaustion_policy, ExhaustionPolicy::HalfOpen);
    assert_eq!(config.pool.commitment, "finalized");
    assert_eq!(config.admission.max_requests_per_second, 20);
    assert_eq!(config.admission.max_pending, 50);
    assert_eq!(config.engine.args, ["--network", "mainnet"]);
    assert_eq!(config.engine.transaction_timeout_secs, 30);
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = TempDir::new().unwrap();

    let result = Config::load(dir.path().join("absent.toml"));

    assert!(matches!(result, Err(Error::Config(ConfigError::ReadFile(_)))));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[[endpoints]\nname = ");

    let result = Config::load(&path);

    assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
}

#[test]
fn two_primaries_are_rejected() {
    let dir = TempDir::new().unwrap();
    let content = FULL.replacen("weight = 10", "weight = 10\nprimary = true", 1);
    let path = write_config(&dir, &content);

    let result = Config::load(&path);

    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidValue {
            field: "primary",
            ..
        }))
    ));
}

#[test]
fn zero_weight_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, &FULL.replace("weight = 1\n", "weight = 0\n"));

    let result = Config::load(&path);

    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidValue { field: "weight", .. }))
    ));
}
