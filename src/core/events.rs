use std::path::PathBuf;

use super::diagnostics::Severity;
use super::inventory::{PowerState, VmId};

/// Structured event emitted while a shutdown or startup run is in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The running-VM list was truncated for a new shutdown run.
    RunningListReset { path: PathBuf },
    /// VMs on a host were enumerated.
    HostEnumerated { host: String, count: usize },
    /// Enumeration failed; the host is skipped and the run moves to the next one.
    HostSkipped { host: String, error: String },
    /// Maintenance flag changed for a VM's managed desktop record.
    MaintenanceChanged { vm: VmId, enabled: bool },
    /// Maintenance flag could not be changed; further work on the VM is skipped.
    MaintenanceFailed {
        vm: VmId,
        enabled: bool,
        error: String,
    },
    /// VM was not powered on when the shutdown pass reached it.
    AlreadyStopped { vm: VmId, state: PowerState },
    /// VM name appended to the persisted running-VM list.
    RunningRecorded { vm: VmId },
    /// Appending to the running-VM list failed; the VM is still shut down.
    RunningRecordFailed { vm: VmId, error: String },
    /// Guest-initiated shutdown accepted; the VM joins the tracked set.
    GracefulRequested { vm: VmId },
    /// Forced power-off issued.
    ForcedOff { vm: VmId, reason: ForceReason },
    /// A power operation or state query failed for a VM.
    PowerOperationFailed {
        vm: VmId,
        operation: PowerOperation,
        error: String,
    },
    /// Drain loop began waiting on the tracked set.
    DrainStarted {
        tracked: usize,
        poll_interval_ms: u64,
        max_wait_ms: u64,
    },
    /// One poll pass completed.
    DrainTick {
        tick: u32,
        remaining: usize,
        elapsed_ms: u64,
    },
    /// A tracked VM was observed off.
    ShutdownConfirmed { vm: VmId, elapsed_ms: u64 },
    /// Drain loop exited, either empty or at the timeout boundary.
    DrainFinished {
        remaining: usize,
        elapsed_ms: u64,
        timed_out: bool,
    },
    /// Power-on issued for a VM named in the running-VM list.
    PowerOnRequested { name: String },
    /// Power-on failed for a VM named in the running-VM list.
    PowerOnFailed { name: String, error: String },
}

/// Why a VM was powered off without waiting for the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceReason {
    /// Guest tools were not running, so graceful shutdown was not possible.
    ToolsNotRunning,
    /// Guest did not finish shutting down before the drain loop gave up.
    DrainTimeout,
}

impl ForceReason {
    pub fn describe(self) -> &'static str {
        match self {
            ForceReason::ToolsNotRunning => "guest tools not running",
            ForceReason::DrainTimeout => "graceful shutdown timed out",
        }
    }
}

/// External call that failed for a specific VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerOperation {
    PowerStateQuery,
    ToolsStateQuery,
    GuestShutdown,
    PowerOff,
}

impl PowerOperation {
    pub fn describe(self) -> &'static str {
        match self {
            PowerOperation::PowerStateQuery => "power state query",
            PowerOperation::ToolsStateQuery => "guest tools query",
            PowerOperation::GuestShutdown => "guest shutdown request",
            PowerOperation::PowerOff => "forced power-off",
        }
    }
}

impl Event {
    /// Severity used when the event is rendered into the run log.
    pub fn severity(&self) -> Severity {
        match self {
            Event::HostSkipped { .. }
            | Event::MaintenanceFailed { .. }
            | Event::RunningRecordFailed { .. }
            | Event::PowerOperationFailed { .. }
            | Event::PowerOnFailed { .. } => Severity::Error,
            Event::ForcedOff {
                reason: ForceReason::DrainTimeout,
                ..
            } => Severity::Warning,
            Event::DrainFinished { timed_out, .. } if *timed_out => Severity::Warning,
            _ => Severity::Info,
        }
    }
}
