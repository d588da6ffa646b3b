//! Per-VM power transitions for the shutdown and startup passes.
//!
//! Every external failure is handled here at VM granularity: it becomes an
//! event plus a disposition and the caller moves on to the next VM.

use super::drain::TrackedShutdowns;
use super::events::{Event, ForceReason, PowerOperation};
use super::inventory::{PowerService, VmRecord};
use super::maintenance::MaintenanceService;
use super::reporter::Reporter;
use super::running_list::{Recorded, RunningListWriter};

/// The two collaborating services for one run. Each holds a single session
/// that is reused for every call.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub power: &'a dyn PowerService,
    pub maintenance: &'a dyn MaintenanceService,
}

impl<'a> Services<'a> {
    pub fn new(power: &'a dyn PowerService, maintenance: &'a dyn MaintenanceService) -> Self {
        Self { power, maintenance }
    }
}

/// What the shutdown pass did with one VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownDisposition {
    /// Maintenance mode could not be set; the VM was left untouched.
    MaintenanceFailed,
    /// VM was not powered on; only maintenance mode was set.
    AlreadyStopped,
    /// Guest shutdown requested and the VM is being tracked.
    GracefulRequested,
    /// Guest tools unavailable; powered off immediately.
    ForcedOff,
    /// A tools query or power operation failed after maintenance mode was set.
    PowerOperationFailed,
}

/// Mutable per-run state threaded through the shutdown pass.
pub struct ShutdownPass<'r> {
    pub running: &'r mut RunningListWriter,
    pub tracked: &'r mut TrackedShutdowns,
}

/// Shutdown handling for one enumerated VM:
///
/// 1. set maintenance mode, skipping the VM entirely if that fails;
/// 2. stop there if the VM is not powered on;
/// 3. record the name in the running-VM list;
/// 4. request guest shutdown and track it when tools are running, otherwise
///    power it off.
pub fn shutdown_vm(
    services: Services<'_>,
    record: &VmRecord,
    pass: &mut ShutdownPass<'_>,
    reporter: &mut dyn Reporter,
) -> ShutdownDisposition {
    let vm = record.id();

    if let Err(err) = services.maintenance.set_maintenance(&vm, true) {
        reporter.report(Event::MaintenanceFailed {
            vm,
            enabled: true,
            error: err.to_string(),
        });
        return ShutdownDisposition::MaintenanceFailed;
    }
    reporter.report(Event::MaintenanceChanged {
        vm: vm.clone(),
        enabled: true,
    });

    if !record.power_state.is_powered_on() {
        reporter.report(Event::AlreadyStopped {
            vm,
            state: record.power_state,
        });
        return ShutdownDisposition::AlreadyStopped;
    }

    match pass.running.append(&record.name) {
        Ok(Recorded::Appended) => reporter.report(Event::RunningRecorded { vm: vm.clone() }),
        Ok(Recorded::AlreadyPresent) => {}
        Err(err) => reporter.report(Event::RunningRecordFailed {
            vm: vm.clone(),
            error: err.to_string(),
        }),
    }

    let tools = match services.power.tools_state(&vm) {
        Ok(tools) => tools,
        Err(err) => {
            reporter.report(Event::PowerOperationFailed {
                vm,
                operation: PowerOperation::ToolsStateQuery,
                error: err.to_string(),
            });
            return ShutdownDisposition::PowerOperationFailed;
        }
    };

    if tools.is_running() {
        match services.power.shutdown_guest(&vm) {
            Ok(()) => {
                reporter.report(Event::GracefulRequested { vm: vm.clone() });
                pass.tracked.insert(vm);
                ShutdownDisposition::GracefulRequested
            }
            Err(err) => {
                reporter.report(Event::PowerOperationFailed {
                    vm,
                    operation: PowerOperation::GuestShutdown,
                    error: err.to_string(),
                });
                ShutdownDisposition::PowerOperationFailed
            }
        }
    } else {
        match services.power.power_off(&vm) {
            Ok(()) => {
                reporter.report(Event::ForcedOff {
                    vm,
                    reason: ForceReason::ToolsNotRunning,
                });
                ShutdownDisposition::ForcedOff
            }
            Err(err) => {
                reporter.report(Event::PowerOperationFailed {
                    vm,
                    operation: PowerOperation::PowerOff,
                    error: err.to_string(),
                });
                ShutdownDisposition::PowerOperationFailed
            }
        }
    }
}

/// Power on one VM named in the running-VM list. Returns whether the request
/// was accepted.
pub fn power_on_vm(services: Services<'_>, name: &str, reporter: &mut dyn Reporter) -> bool {
    match services.power.power_on(name) {
        Ok(()) => {
            reporter.report(Event::PowerOnRequested {
                name: name.to_string(),
            });
            true
        }
        Err(err) => {
            reporter.report(Event::PowerOnFailed {
                name: name.to_string(),
                error: err.to_string(),
            });
            false
        }
    }
}

/// Clear maintenance mode for one VM after startup. Returns whether it succeeded.
pub fn release_vm(services: Services<'_>, record: &VmRecord, reporter: &mut dyn Reporter) -> bool {
    let vm = record.id();
    match services.maintenance.set_maintenance(&vm, false) {
        Ok(()) => {
            reporter.report(Event::MaintenanceChanged { vm, enabled: false });
            true
        }
        Err(err) => {
            reporter.report(Event::MaintenanceFailed {
                vm,
                enabled: false,
                error: err.to_string(),
            });
            false
        }
    }
}
