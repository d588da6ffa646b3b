use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::core::diagnostics::Diagnostic;
use crate::core::drain::{DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL, DrainSettings};
use crate::core::selector::{MATCH_ALL, NameFilter};
use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "vmcycle.toml";
pub const DEFAULT_RUNNING_LIST: &str = "running_vms.txt";
pub const DEFAULT_LOG_FILE: &str = "vmcycle.log";
pub const DEFAULT_INVENTORY_TOKEN_ENV: &str = "VMCYCLE_INVENTORY_TOKEN";
pub const DEFAULT_BROKER_TOKEN_ENV: &str = "VMCYCLE_BROKER_TOKEN";
pub const DEFAULT_SERVICE_TIMEOUT: Duration = Duration::from_secs(30);

/// Effective configuration for a run, before CLI overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub name_filter: NameFilter,
    pub drain: DrainSettings,
    pub running_list: PathBuf,
    pub log_file: PathBuf,
    pub inventory: ServiceConfig,
    pub broker: ServiceConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Environment variable holding the bearer token.
    pub token_env: String,
    pub timeout: Duration,
}

impl RunConfig {
    /// Built-in defaults with relative paths resolved against `root_dir`.
    pub fn defaults(root_dir: &Path) -> Self {
        Self {
            name_filter: NameFilter::default(),
            drain: DrainSettings::default(),
            running_list: root_dir.join(DEFAULT_RUNNING_LIST),
            log_file: root_dir.join(DEFAULT_LOG_FILE),
            inventory: ServiceConfig {
                token_env: DEFAULT_INVENTORY_TOKEN_ENV.to_string(),
                timeout: DEFAULT_SERVICE_TIMEOUT,
            },
            broker: ServiceConfig {
                token_env: DEFAULT_BROKER_TOKEN_ENV.to_string(),
                timeout: DEFAULT_SERVICE_TIMEOUT,
            },
        }
    }
}

/// Configuration plus where it came from.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: RunConfig,
    /// `None` when no file was found and defaults are in effect.
    pub path: Option<PathBuf>,
    pub warnings: Vec<Diagnostic>,
}

/// Load the run configuration.
///
/// An explicit path must exist. Otherwise `vmcycle.toml` in `working_dir` is
/// used when present, and built-in defaults when it is not.
pub fn load_config(explicit: Option<&Path>, working_dir: &Path) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::ExplicitConfigMissing {
                    path: path.to_path_buf(),
                });
            }
            path.to_path_buf()
        }
        None => {
            let candidate = working_dir.join(DEFAULT_CONFIG_FILE);
            if !candidate.is_file() {
                return Ok(LoadedConfig {
                    config: RunConfig::defaults(working_dir),
                    path: None,
                    warnings: Vec::new(),
                });
            }
            candidate
        }
    };

    let contents = fs::read_to_string(&path).map_err(|source| Error::ReadConfig {
        path: path.clone(),
        source,
    })?;
    let (config, warnings) = parse_config(&contents, &path)?;

    Ok(LoadedConfig {
        config,
        path: Some(path),
        warnings,
    })
}

/// Parse and validate configuration text read from `path`.
pub fn parse_config(contents: &str, path: &Path) -> Result<(RunConfig, Vec<Diagnostic>)> {
    let value: toml::Value = toml::from_str(contents).map_err(|source| Error::ParseConfig {
        path: path.to_path_buf(),
        source,
    })?;

    let warnings = detect_unknown_fields(&value)
        .into_iter()
        .map(|message| Diagnostic::warning(message).with_path(path.to_path_buf()))
        .collect();

    let raw = RawConfig::deserialize(value).map_err(|source| Error::ParseConfig {
        path: path.to_path_buf(),
        source,
    })?;

    let config = raw.into_validated(path)?;
    Ok((config, warnings))
}

fn invalid_config(path: &Path, message: impl Into<String>) -> Error {
    Error::InvalidConfig {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn detect_unknown_fields(value: &toml::Value) -> Vec<String> {
    let mut warnings = Vec::new();
    let sections: [(&str, &[&str]); 5] = [
        ("selection", &["name_filter"]),
        ("drain", &["poll_interval_secs", "max_wait_secs"]),
        ("state", &["running_list", "log_file"]),
        ("inventory", &["token_env", "timeout_secs"]),
        ("broker", &["token_env", "timeout_secs"]),
    ];

    let toml::Value::Table(table) = value else {
        return warnings;
    };

    let allowed_root: Vec<&str> = sections.iter().map(|(name, _)| *name).collect();
    warn_table(table, &allowed_root, "root", &mut warnings);

    for (name, allowed) in sections {
        match table.get(name) {
            Some(toml::Value::Table(section)) => {
                warn_table(section, allowed, &format!("[{name}]"), &mut warnings);
            }
            Some(_) => warnings.push(format!("Expected [{name}] to be a table.")),
            None => {}
        }
    }

    warnings
}

fn warn_table(
    table: &toml::map::Map<String, toml::Value>,
    allowed: &[&str],
    context: &str,
    warnings: &mut Vec<String>,
) {
    for key in table.keys() {
        if !allowed.contains(&key.as_str()) {
            warnings.push(format!(
                "Unknown field `{key}` at {context}; this value will be ignored."
            ));
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    selection: RawSelection,
    #[serde(default)]
    drain: RawDrain,
    #[serde(default)]
    state: RawState,
    #[serde(default)]
    inventory: RawService,
    #[serde(default)]
    broker: RawService,
}

#[derive(Debug, Deserialize, Default)]
struct RawSelection {
    name_filter: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawDrain {
    poll_interval_secs: Option<u64>,
    max_wait_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct RawState {
    running_list: Option<PathBuf>,
    log_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct RawService {
    token_env: Option<String>,
    timeout_secs: Option<u64>,
}

impl RawConfig {
    fn into_validated(self, path: &Path) -> Result<RunConfig> {
        let root_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let filter = self.selection.name_filter.as_deref().unwrap_or(MATCH_ALL);
        let name_filter = NameFilter::parse(filter).map_err(|err| invalid_config(path, err.to_string()))?;

        let poll_interval = match self.drain.poll_interval_secs {
            Some(0) => {
                return Err(invalid_config(
                    path,
                    "`drain.poll_interval_secs` must be at least 1. Example: `poll_interval_secs = 60`.",
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_POLL_INTERVAL,
        };
        let max_wait = self
            .drain
            .max_wait_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_MAX_WAIT);

        let running_list = resolve_path(
            &root_dir,
            self.state
                .running_list
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RUNNING_LIST)),
        );
        let log_file = resolve_path(
            &root_dir,
            self.state
                .log_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
        );

        let inventory = self
            .inventory
            .into_validated(path, "inventory", DEFAULT_INVENTORY_TOKEN_ENV)?;
        let broker = self
            .broker
            .into_validated(path, "broker", DEFAULT_BROKER_TOKEN_ENV)?;

        Ok(RunConfig {
            name_filter,
            drain: DrainSettings {
                poll_interval,
                max_wait,
            },
            running_list,
            log_file,
            inventory,
            broker,
        })
    }
}

impl RawService {
    fn into_validated(
        self,
        path: &Path,
        section: &str,
        default_token_env: &str,
    ) -> Result<ServiceConfig> {
        let token_env = match self.token_env {
            Some(name) if name.trim().is_empty() => {
                return Err(invalid_config(
                    path,
                    format!("`{section}.token_env` must name an environment variable."),
                ));
            }
            Some(name) => name.trim().to_string(),
            None => default_token_env.to_string(),
        };

        let timeout = match self.timeout_secs {
            Some(0) => {
                return Err(invalid_config(
                    path,
                    format!("`{section}.timeout_secs` must be at least 1."),
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_SERVICE_TIMEOUT,
        };

        Ok(ServiceConfig { token_env, timeout })
    }
}

fn resolve_path(root: &Path, value: PathBuf) -> PathBuf {
    if value.is_absolute() {
        value
    } else {
        root.join(value)
    }
}
