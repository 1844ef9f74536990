use std::ffi::OsString;
use std::fs;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use keel_config::{DEFAULT_EVENT_TTL_SECS, Settings, default_log_filter, default_log_format};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct Harness {
    temp_dir: TempDir,
    cli_args: std::cell::RefCell<Vec<OsString>>,
    env_overrides: std::cell::RefCell<Vec<(String, Option<OsString>)>>,
    loaded: std::cell::RefCell<Option<Settings>>,
    error: std::cell::RefCell<Option<String>>,
    _env_guard: MutexGuard<'static, ()>,
}

impl Harness {
    fn new() -> Self {
        let env_guard = ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let temp_dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(error) => panic!("failed to create temporary directory: {error}"),
        };
        Self {
            temp_dir,
            cli_args: std::cell::RefCell::new(vec![OsString::from("keel-master")]),
            env_overrides: std::cell::RefCell::new(Vec::new()),
            loaded: std::cell::RefCell::new(None),
            error: std::cell::RefCell::new(None),
            _env_guard: env_guard,
        }
    }

    fn write_config(&self, ttl: u64) {
        let path = self.temp_dir.path().join("keel.toml");
        let toml = format!("node_cache_ttl_secs = {ttl}\nnodes = [\"n1\", \"n2\"]\n");

        if let Err(error) = fs::write(&path, toml) {
            panic!("failed to write configuration: {error}");
        }

        let mut args = self.cli_args.borrow_mut();
        args.push(OsString::from("--config-path"));
        args.push(path.into_os_string());
    }

    fn set_env(&self, key: &str, value: &str) {
        let previous = std::env::var_os(key);
        // Environment mutation is process-wide; `Drop` restores the previous
        // values and `ENV_MUTEX` serialises the scenarios.
        unsafe { std::env::set_var(key, value) };
        self.env_overrides
            .borrow_mut()
            .push((key.to_owned(), previous));
    }

    fn push_cli_arg(&self, arg: impl Into<OsString>) {
        self.cli_args.borrow_mut().push(arg.into());
    }

    fn load(&self) {
        if self.loaded.borrow().is_some() || self.error.borrow().is_some() {
            return;
        }

        let args = self.cli_args.borrow().clone();
        match Settings::load_from_iter(args) {
            Ok(settings) => {
                *self.loaded.borrow_mut() = Some(settings);
            }
            Err(error) => {
                *self.error.borrow_mut() = Some(error.to_string());
            }
        }
    }

    fn loaded(&self) -> Settings {
        self.load();
        if let Some(error) = self.error.borrow().as_ref() {
            panic!("configuration failed to load: {error}");
        }
        match self.loaded.borrow().as_ref() {
            Some(settings) => settings.clone(),
            None => panic!("configuration was not loaded"),
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let mut overrides = self.env_overrides.borrow_mut();
        while let Some((key, value)) = overrides.pop() {
            if let Some(os_value) = value {
                unsafe { std::env::set_var(&key, os_value) };
            } else {
                unsafe { std::env::remove_var(&key) };
            }
        }
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

#[given("a configuration file setting the node cache ttl to {ttl}")]
fn given_configuration_file(harness: &Harness, ttl: u64) {
    harness.write_config(ttl);
}

#[given("the environment overrides the node cache ttl to \"{ttl}\"")]
fn given_environment_override(harness: &Harness, ttl: String) {
    harness.set_env("KEEL_NODE_CACHE_TTL_SECS", &ttl);
}

#[when("the command line sets the node cache ttl to \"{ttl}\"")]
fn when_cli_override(harness: &Harness, ttl: String) {
    harness.push_cli_arg("--node-cache-ttl-secs");
    harness.push_cli_arg(OsString::from(&ttl));
}

#[when("the configuration loads without overrides")]
fn when_load_without_overrides(harness: &Harness) {
    harness.load();
}

#[then("loading the configuration resolves the node cache ttl to {ttl}")]
fn then_resolved_ttl(harness: &Harness, ttl: u64) {
    let settings = harness.loaded();
    assert_eq!(settings.node_cache_ttl_secs, ttl);
}

#[then("the configured nodes are {first} and {second}")]
fn then_configured_nodes(harness: &Harness, first: String, second: String) {
    let settings = harness.loaded();
    assert_eq!(settings.nodes, vec![first, second]);
}

#[then("loading the configuration applies the built-in defaults")]
fn then_defaults_applied(harness: &Harness) {
    let settings = harness.loaded();
    assert_eq!(settings.log_filter(), default_log_filter());
    assert_eq!(settings.log_format(), default_log_format());
    assert_eq!(settings.event_ttl_secs, DEFAULT_EVENT_TTL_SECS);
    assert!(settings.nodes.is_empty(), "expected no static nodes");
    assert!(!settings.health_check_nodes);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Built-in defaults apply without overrides"
)]
fn defaults_apply(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Configuration file values are read"
)]
fn file_values_are_read(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Environment overrides the configuration file"
)]
fn environment_overrides_file(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Command line overrides every other layer"
)]
fn command_line_overrides_all(#[from(harness)] harness: Harness) {
    drop(harness);
}
