//! Command-line front end: resolves settings, opens the run log, connects to
//! both services and drives the requested workflow.

pub mod error;
pub mod log;
pub mod render;

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use crate::cli::Cli;
use crate::config::{ServiceConfig, load_config};
use crate::core::diagnostics::{Diagnostic, Severity};
use crate::core::drain::{DrainSettings, SystemTicker};
use crate::core::operations;
use crate::core::options::{ShutdownOptions, StartupOptions};
use crate::core::reporter::Reporter;
use crate::core::selector::{NameFilter, read_host_list};
use crate::core::transition::Services;
use crate::remote::{BrokerClient, InventoryClient, ServiceSettings};
use crate::{Error, Result};

pub use error::exit_code;
use self::log::RunLog;

/// The two supported workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Shutdown,
    Startup,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Shutdown => "shutdown",
            Action::Startup => "startup",
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "shutdown" => Ok(Action::Shutdown),
            "startup" => Ok(Action::Startup),
            _ => Err(Error::UnknownAction {
                action: value.to_string(),
            }),
        }
    }
}

/// Configuration file values with CLI overrides applied.
#[derive(Debug)]
pub struct RunSettings {
    pub name_filter: NameFilter,
    pub drain: DrainSettings,
    pub running_list: PathBuf,
    pub log_file: PathBuf,
    pub inventory: ServiceConfig,
    pub broker: ServiceConfig,
    pub warnings: Vec<Diagnostic>,
}

pub fn resolve_settings(cli: &Cli, working_dir: &Path) -> Result<RunSettings> {
    let loaded = load_config(cli.config.as_deref(), working_dir)?;
    let mut config = loaded.config;

    if let Some(filter) = &cli.name_filter {
        config.name_filter = NameFilter::parse(filter)?;
    }
    if let Some(secs) = cli.poll_interval_secs {
        config.drain.poll_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = cli.max_wait_secs {
        config.drain.max_wait = Duration::from_secs(secs);
    }
    if let Some(path) = &cli.running_list {
        config.running_list = path.clone();
    }
    if let Some(path) = &cli.log_file {
        config.log_file = path.clone();
    }

    Ok(RunSettings {
        name_filter: config.name_filter,
        drain: config.drain,
        running_list: config.running_list,
        log_file: config.log_file,
        inventory: config.inventory,
        broker: config.broker,
        warnings: loaded.warnings,
    })
}

pub fn execute(cli: Cli) -> ExitCode {
    let working_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let settings = match resolve_settings(&cli, &working_dir) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Error: {err}");
            return exit_code(&err);
        }
    };

    let mut log = match RunLog::open(&settings.log_file) {
        Ok(log) => log,
        Err(err) => {
            eprintln!("Error: {err}");
            return exit_code(&err);
        }
    };
    log.diagnostics(&settings.warnings);

    match run(&cli, &settings, &mut log) {
        Ok(summary) => {
            log.line(Severity::Info, &summary);
            ExitCode::SUCCESS
        }
        Err(err) => {
            log.fatal(&err);
            exit_code(&err)
        }
    }
}

fn run(cli: &Cli, settings: &RunSettings, log: &mut RunLog) -> Result<String> {
    let action: Action = cli.action.parse()?;
    log.line(
        Severity::Info,
        &format!(
            "Starting {} for hosts in {}.",
            action.as_str(),
            cli.hosts_file.display()
        ),
    );

    let mut diagnostics = Vec::new();
    let hosts = read_host_list(&cli.hosts_file, &mut diagnostics)?;
    log.diagnostics(&diagnostics);

    let inventory = InventoryClient::connect(&cli.inventory, &service_settings(&settings.inventory))?;
    let broker = match BrokerClient::connect(&cli.broker, &service_settings(&settings.broker)) {
        Ok(broker) => broker,
        Err(err) => {
            let _ = inventory.disconnect();
            return Err(err);
        }
    };

    let services = Services::new(&inventory, &broker);
    let result = match action {
        Action::Shutdown => run_shutdown(services, hosts, settings, log),
        Action::Startup => run_startup(services, hosts, settings, log),
    };

    let _ = broker.disconnect();
    let _ = inventory.disconnect();
    result
}

fn run_shutdown(
    services: Services<'_>,
    hosts: Vec<String>,
    settings: &RunSettings,
    log: &mut RunLog,
) -> Result<String> {
    let options = ShutdownOptions {
        hosts,
        name_filter: settings.name_filter.clone(),
        running_list: settings.running_list.clone(),
        drain: settings.drain,
    };
    let mut ticker = SystemTicker::start();
    let reporter: &mut dyn Reporter = &mut *log;
    let output = operations::shutdown(services, options, &mut ticker, Some(reporter))?;
    log.diagnostics(&output.diagnostics);
    Ok(render::shutdown_summary(&output.value))
}

fn run_startup(
    services: Services<'_>,
    hosts: Vec<String>,
    settings: &RunSettings,
    log: &mut RunLog,
) -> Result<String> {
    let options = StartupOptions {
        hosts,
        name_filter: settings.name_filter.clone(),
        running_list: settings.running_list.clone(),
    };
    let reporter: &mut dyn Reporter = &mut *log;
    let output = operations::startup(services, options, Some(reporter))?;
    log.diagnostics(&output.diagnostics);
    Ok(render::startup_summary(&output.value))
}

fn service_settings(config: &ServiceConfig) -> ServiceSettings {
    ServiceSettings::from_env(&config.token_env, config.timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["vmcycle", "shutdown", "hosts.txt", "vc01", "broker"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn action_parsing_is_case_insensitive() {
        assert_eq!("shutdown".parse::<Action>().unwrap(), Action::Shutdown);
        assert_eq!(" Startup ".parse::<Action>().unwrap(), Action::Startup);
        assert!(matches!(
            "reboot".parse::<Action>(),
            Err(Error::UnknownAction { action }) if action == "reboot"
        ));
    }

    #[test]
    fn cli_flags_override_config_file() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("vmcycle.toml"),
            "[selection]\nname_filter = \"lab-*\"\n[drain]\npoll_interval_secs = 30\nmax_wait_secs = 600\n",
        )
        .unwrap();

        let settings = resolve_settings(
            &cli(&["--max-wait-secs", "120", "--running-list", "/srv/running.txt"]),
            dir.path(),
        )
        .unwrap();

        assert_eq!(settings.name_filter.as_str(), "lab-*");
        assert_eq!(settings.drain.poll_interval, Duration::from_secs(30));
        assert_eq!(settings.drain.max_wait, Duration::from_secs(120));
        assert_eq!(settings.running_list, PathBuf::from("/srv/running.txt"));
        assert_eq!(settings.log_file, dir.path().join("vmcycle.log"));
    }

    #[test]
    fn invalid_name_filter_override_is_fatal() {
        let dir = tempdir().unwrap();
        let err = resolve_settings(&cli(&["--name-filter", "[desk"]), dir.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidNameFilter { .. }));
    }
}
