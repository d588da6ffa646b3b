//! Human-readable text for events and run summaries.

use crate::core::events::Event;
use crate::core::outcome::{ShutdownOutcome, StartupOutcome};
use crate::core::transition::ShutdownDisposition;

/// One-line description of an event, without timestamp or severity.
pub fn describe_event(event: &Event) -> String {
    match event {
        Event::RunningListReset { path } => {
            format!("Running-VM list {} reset for this run.", path.display())
        }
        Event::HostEnumerated { host, count } => {
            format!("{host}: {count} VM(s) selected.")
        }
        Event::HostSkipped { host, error } => {
            format!("{host}: unable to enumerate VMs, skipping host ({error}).")
        }
        Event::MaintenanceChanged { vm, enabled } => {
            if *enabled {
                format!("→ {vm}: maintenance mode enabled.")
            } else {
                format!("→ {vm}: maintenance mode cleared.")
            }
        }
        Event::MaintenanceFailed { vm, enabled, error } => {
            let verb = if *enabled { "enable" } else { "clear" };
            format!("→ {vm}: failed to {verb} maintenance mode, skipping VM ({error}).")
        }
        Event::AlreadyStopped { vm, state } => {
            format!("→ {vm}: already {}; nothing to shut down.", state.describe())
        }
        Event::RunningRecorded { vm } => {
            format!("→ {vm}: recorded as running.")
        }
        Event::RunningRecordFailed { vm, error } => {
            format!("→ {vm}: could not be recorded in the running-VM list ({error}).")
        }
        Event::GracefulRequested { vm } => {
            format!("→ {vm}: guest shutdown requested.")
        }
        Event::ForcedOff { vm, reason } => {
            format!("→ {vm}: powered off ({}).", reason.describe())
        }
        Event::PowerOperationFailed {
            vm,
            operation,
            error,
        } => format!("→ {vm}: {} failed ({error}).", operation.describe()),
        Event::DrainStarted {
            tracked,
            poll_interval_ms,
            max_wait_ms,
        } => format!(
            "Waiting for {tracked} guest shutdown(s): polling every {}, forcing after {}.",
            format_duration_ms(*poll_interval_ms),
            format_duration_ms(*max_wait_ms)
        ),
        Event::DrainTick {
            tick,
            remaining,
            elapsed_ms,
        } => format!(
            "Poll {tick} at {}: {remaining} VM(s) still powered on.",
            format_duration_ms(*elapsed_ms)
        ),
        Event::ShutdownConfirmed { vm, elapsed_ms } => {
            format!(
                "→ {vm}: guest shut down after {}.",
                format_duration_ms(*elapsed_ms)
            )
        }
        Event::DrainFinished {
            remaining,
            elapsed_ms,
            timed_out,
        } => {
            if *timed_out {
                format!(
                    "Gave up waiting after {} with {remaining} VM(s) still powered on.",
                    format_duration_ms(*elapsed_ms)
                )
            } else {
                format!(
                    "All guest shutdowns finished after {}.",
                    format_duration_ms(*elapsed_ms)
                )
            }
        }
        Event::PowerOnRequested { name } => format!("→ {name}: power-on requested."),
        Event::PowerOnFailed { name, error } => {
            format!("→ {name}: power-on failed ({error}).")
        }
    }
}

pub fn shutdown_summary(outcome: &ShutdownOutcome) -> String {
    let maintenance = outcome
        .hosts
        .iter()
        .flat_map(|host| host.vms.iter())
        .filter(|vm| vm.disposition != ShutdownDisposition::MaintenanceFailed)
        .count();
    let failures = outcome.count(ShutdownDisposition::MaintenanceFailed)
        + outcome.count(ShutdownDisposition::PowerOperationFailed)
        + outcome.drain.force_failed.len();

    format!(
        "Shutdown complete: {maintenance} in maintenance, {} graceful, {} forced off, \
         {} already stopped, {} recorded, {failures} failure(s), {} host(s) skipped.",
        outcome.count(ShutdownDisposition::GracefulRequested),
        outcome.count(ShutdownDisposition::ForcedOff) + outcome.drain.forced.len(),
        outcome.count(ShutdownDisposition::AlreadyStopped),
        outcome.recorded.len(),
        outcome.skipped_hosts()
    )
}

pub fn startup_summary(outcome: &StartupOutcome) -> String {
    format!(
        "Startup complete: {} powered on, {} released from maintenance, {} failure(s), {} host(s) skipped.",
        outcome.powered_on(),
        outcome.released(),
        outcome.failures(),
        outcome.skipped_hosts()
    )
}

pub fn format_duration_ms(ms: u64) -> String {
    if ms == 0 {
        return "0s".to_string();
    }

    if ms % 1000 == 0 {
        return format!("{}s", ms / 1000);
    }

    let seconds = ms as f64 / 1000.0;
    if seconds >= 1.0 {
        format!("{seconds:.1}s")
    } else {
        format!("{ms}ms")
    }
}
