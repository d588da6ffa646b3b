//! The two workflows: `shutdown` and `startup`.
//!
//! Hosts are processed one at a time and VMs within a host one at a time. The
//! only fatal failure inside an operation is being unable to prepare the
//! running-VM list; everything else is reported and skipped.

use super::drain::{TrackedShutdowns, Ticker, drain};
use super::events::Event;
use super::options::{ShutdownOptions, StartupOptions};
use super::outcome::{
    HostOutcome, OperationOutput, OperationResult, PowerOnOutcome, ShutdownOutcome,
    StartupOutcome, VmReleaseOutcome, VmShutdownOutcome,
};
use super::reporter::{Reporter, ReporterProxy};
use super::running_list::{RunningListWriter, read_running_list};
use super::selector::select_vms;
use super::transition::{ShutdownPass, Services, power_on_vm, release_vm, shutdown_vm};

/// Place every selected VM in maintenance mode, shut down the powered-on ones,
/// and drain the graceful shutdowns before forcing stragglers off.
pub fn shutdown(
    services: Services<'_>,
    options: ShutdownOptions,
    ticker: &mut dyn Ticker,
    reporter: Option<&mut dyn Reporter>,
) -> OperationResult<ShutdownOutcome> {
    let mut events = Vec::new();
    let mut reporter = ReporterProxy::new(reporter, &mut events);

    let mut running = RunningListWriter::truncate(&options.running_list)?;
    reporter.emit(Event::RunningListReset {
        path: options.running_list.clone(),
    });

    let mut tracked = TrackedShutdowns::new();
    let mut hosts = Vec::with_capacity(options.hosts.len());

    for host in &options.hosts {
        let records = match select_vms(services.power, host, &options.name_filter) {
            Ok(records) => records,
            Err(err) => {
                reporter.emit(Event::HostSkipped {
                    host: host.clone(),
                    error: err.to_string(),
                });
                hosts.push(HostOutcome::skipped(host, err.to_string()));
                continue;
            }
        };
        reporter.emit(Event::HostEnumerated {
            host: host.clone(),
            count: records.len(),
        });

        let mut pass = ShutdownPass {
            running: &mut running,
            tracked: &mut tracked,
        };
        let vms = records
            .iter()
            .map(|record| VmShutdownOutcome {
                vm: record.id(),
                disposition: shutdown_vm(services, record, &mut pass, &mut reporter),
            })
            .collect();

        hosts.push(HostOutcome {
            host: host.clone(),
            vms,
            error: None,
        });
    }

    let drain_report = drain(
        services.power,
        tracked,
        options.drain,
        ticker,
        &mut reporter,
    );

    let outcome = ShutdownOutcome {
        hosts,
        running_list: running.path().to_path_buf(),
        recorded: running.into_recorded(),
        drain: drain_report,
    };

    Ok(OperationOutput::new(outcome)
        .with_events(events))
}

/// Power on every VM named in the running-VM list, then clear maintenance
/// mode for every VM currently enumerable under the host list.
pub fn startup(
    services: Services<'_>,
    options: StartupOptions,
    reporter: Option<&mut dyn Reporter>,
) -> OperationResult<StartupOutcome> {
    let mut diagnostics = Vec::new();
    let mut events = Vec::new();
    let mut reporter = ReporterProxy::new(reporter, &mut events);

    let names = read_running_list(&options.running_list, &mut diagnostics)?;

    let power_ons = names
        .iter()
        .map(|name| PowerOnOutcome {
            name: name.clone(),
            accepted: power_on_vm(services, name, &mut reporter),
        })
        .collect();

    let mut hosts = Vec::with_capacity(options.hosts.len());
    for host in &options.hosts {
        let records = match select_vms(services.power, host, &options.name_filter) {
            Ok(records) => records,
            Err(err) => {
                reporter.emit(Event::HostSkipped {
                    host: host.clone(),
                    error: err.to_string(),
                });
                hosts.push(HostOutcome::skipped(host, err.to_string()));
                continue;
            }
        };
        reporter.emit(Event::HostEnumerated {
            host: host.clone(),
            count: records.len(),
        });

        let vms = records
            .iter()
            .map(|record| VmReleaseOutcome {
                vm: record.id(),
                released: release_vm(services, record, &mut reporter),
            })
            .collect();

        hosts.push(HostOutcome {
            host: host.clone(),
            vms,
            error: None,
        });
    }

    Ok(OperationOutput::new(StartupOutcome { power_ons, hosts })
        .with_diagnostics(diagnostics)
        .with_events(events))
}
