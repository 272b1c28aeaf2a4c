//! Test plan for the `cycle-config` crate.
//!
//! Exercises the configuration loader across default handling, file
//! discovery, and environment overrides.

use std::fs;
use std::path::PathBuf;

use serial_test::serial;
use tempfile::TempDir;

use cycle_config::load;

const ENV_VARS_TO_RESET: &[&str] = &[
    "CYCLE_CONFIG",
    "CYCLE__DATABASE__MAX_CONNECTIONS",
    "CYCLE__DATABASE__URL",
    "CYCLE__HTTP__ADDRESS",
    "CYCLE__HTTP__PORT",
    "CYCLE__INVITES__EXPIRY_HOURS",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        let mut ctx = Self {
            vars: Vec::new(),
            original_dir: None,
        };
        for key in ENV_VARS_TO_RESET {
            ctx.remove_var(key);
        }
        ctx
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn change_dir(&mut self, dir: &std::path::Path) {
        self.original_dir = std::env::current_dir().ok();
        std::env::set_current_dir(dir).expect("failed to change directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(dir) = self.original_dir.take() {
            let _ = std::env::set_current_dir(dir);
        }
        for (key, previous) in self.vars.drain(..).rev() {
            match previous {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

#[test]
#[serial]
fn defaults_apply_without_file_or_env() {
    let temp = TempDir::new().unwrap();
    let mut ctx = TestContext::new();
    ctx.change_dir(temp.path());

    let config = load().expect("defaults should load");
    assert_eq!(config.http.address, "127.0.0.1");
    assert_eq!(config.http.port, 7080);
    assert_eq!(config.database.url, "sqlite://cycle.db");
    assert_eq!(config.database.max_connections, 10);
    assert_eq!(config.invites.expiry_hours, 72);
}

#[test]
#[serial]
fn env_overrides_take_precedence() {
    let temp = TempDir::new().unwrap();
    let mut ctx = TestContext::new();
    ctx.change_dir(temp.path());
    ctx.set_var("CYCLE__HTTP__PORT", "9099");
    ctx.set_var("CYCLE__DATABASE__URL", "sqlite://override.db");
    ctx.set_var("CYCLE__INVITES__EXPIRY_HOURS", "24");

    let config = load().expect("overridden config should load");
    assert_eq!(config.http.port, 9099);
    assert_eq!(config.database.url, "sqlite://override.db");
    assert_eq!(config.invites.expiry_hours, 24);
}

#[test]
#[serial]
fn config_file_discovered_in_working_directory() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("cycle.toml"),
        "[http]\naddress = \"0.0.0.0\"\nport = 8800\n",
    )
    .unwrap();

    let mut ctx = TestContext::new();
    ctx.change_dir(temp.path());

    let config = load().expect("file-backed config should load");
    assert_eq!(config.http.address, "0.0.0.0");
    assert_eq!(config.http.port, 8800);
    // Sections absent from the file keep their defaults.
    assert_eq!(config.database.max_connections, 10);
}

#[test]
#[serial]
fn explicit_config_path_wins_over_discovery() {
    let temp = TempDir::new().unwrap();
    let explicit = temp.path().join("explicit.toml");
    fs::write(&explicit, "[database]\nurl = \"sqlite://explicit.db\"\nmax_connections = 3\n").unwrap();
    fs::write(
        temp.path().join("cycle.toml"),
        "[database]\nurl = \"sqlite://discovered.db\"\nmax_connections = 5\n",
    )
    .unwrap();

    let mut ctx = TestContext::new();
    ctx.change_dir(temp.path());
    ctx.set_var("CYCLE_CONFIG", explicit.display().to_string());

    let config = load().expect("explicit config should load");
    assert_eq!(config.database.url, "sqlite://explicit.db");
    assert_eq!(config.database.max_connections, 3);
}
