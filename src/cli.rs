use std::path::PathBuf;

use clap::Parser;

const VERSION: &str = env!("VMCYCLE_VERSION");

/// Top-level CLI definition for the `vmcycle` tool.
#[derive(Debug, Parser)]
#[command(
    name = "vmcycle",
    version = VERSION,
    about = "Maintenance-window power cycling for brokered virtual desktops.",
    long_about = "vmcycle places brokered desktops in maintenance mode and shuts them down \
                  (action `shutdown`), or powers the previously running ones back on and \
                  clears maintenance mode (action `startup`)."
)]
pub struct Cli {
    /// `shutdown` or `startup`.
    #[arg(value_name = "ACTION")]
    pub action: String,

    /// File listing one hypervisor host per line.
    #[arg(value_name = "HOSTS_FILE")]
    pub hosts_file: PathBuf,

    /// Inventory/power service endpoint.
    #[arg(value_name = "INVENTORY_ENDPOINT")]
    pub inventory: String,

    /// Desktop broker endpoint.
    #[arg(value_name = "BROKER_ENDPOINT")]
    pub broker: String,

    #[arg(
        short,
        long = "config",
        value_name = "PATH",
        help = "Load configuration from PATH instead of ./vmcycle.toml"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "GLOB",
        help = "Only act on VMs whose name matches GLOB (default `*`)"
    )]
    pub name_filter: Option<String>,

    #[arg(
        long,
        value_name = "SECONDS",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds between power-state polls while waiting for guest shutdowns"
    )]
    pub poll_interval_secs: Option<u64>,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "Seconds to wait for guest shutdowns before forcing power-off"
    )]
    pub max_wait_secs: Option<u64>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Where the names of running VMs are recorded at shutdown and read at startup"
    )]
    pub running_list: Option<PathBuf>,

    #[arg(long, value_name = "PATH", help = "Append the run log to PATH")]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn parses_positionals_and_overrides() {
        let cli = Cli::try_parse_from([
            "vmcycle",
            "shutdown",
            "hosts.txt",
            "vc01.corp",
            "broker.corp",
            "--name-filter",
            "desk-*",
            "--poll-interval-secs",
            "15",
            "--max-wait-secs",
            "0",
            "--log-file",
            "/tmp/run.log",
        ])
        .unwrap();

        assert_eq!(cli.action, "shutdown");
        assert_eq!(cli.hosts_file, PathBuf::from("hosts.txt"));
        assert_eq!(cli.inventory, "vc01.corp");
        assert_eq!(cli.broker, "broker.corp");
        assert_eq!(cli.name_filter.as_deref(), Some("desk-*"));
        assert_eq!(cli.poll_interval_secs, Some(15));
        assert_eq!(cli.max_wait_secs, Some(0));
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/run.log")));
        assert!(cli.config.is_none());
        assert!(cli.running_list.is_none());
    }

    #[test]
    fn missing_positionals_is_a_usage_error() {
        let err = Cli::try_parse_from(["vmcycle", "shutdown", "hosts.txt"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = Cli::try_parse_from([
            "vmcycle",
            "startup",
            "hosts.txt",
            "vc01",
            "broker",
            "--poll-interval-secs",
            "0",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn unknown_action_still_parses() {
        let cli = Cli::try_parse_from(["vmcycle", "reboot", "hosts.txt", "vc01", "broker"]).unwrap();
        assert_eq!(cli.action, "reboot");
    }
}
