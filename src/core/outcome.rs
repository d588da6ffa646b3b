use std::path::PathBuf;

use super::diagnostics::Diagnostic;
use super::drain::DrainReport;
use super::events::Event;
use super::inventory::VmId;
use super::transition::ShutdownDisposition;

/// Result wrapper returned by high-level operations.
pub type OperationResult<T> = crate::error::Result<OperationOutput<T>>;

/// Envelope for successful operation outcomes.
#[derive(Debug)]
pub struct OperationOutput<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
    /// Every event reported during the run, in order.
    pub events: Vec<Event>,
}

impl<T> OperationOutput<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events = events;
        self
    }
}

/// Per-host result of enumeration. `error` is set when the host was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOutcome<T> {
    pub host: String,
    pub vms: Vec<T>,
    pub error: Option<String>,
}

impl<T> HostOutcome<T> {
    pub fn skipped(host: &str, error: String) -> Self {
        Self {
            host: host.to_string(),
            vms: Vec::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmShutdownOutcome {
    pub vm: VmId,
    pub disposition: ShutdownDisposition,
}

/// Outcome of `shutdown`.
#[derive(Debug)]
pub struct ShutdownOutcome {
    pub hosts: Vec<HostOutcome<VmShutdownOutcome>>,
    pub running_list: PathBuf,
    /// Names written to the running-VM list, in encounter order.
    pub recorded: Vec<String>,
    pub drain: DrainReport,
}

impl ShutdownOutcome {
    pub fn count(&self, disposition: ShutdownDisposition) -> usize {
        self.hosts
            .iter()
            .flat_map(|host| host.vms.iter())
            .filter(|vm| vm.disposition == disposition)
            .count()
    }

    pub fn skipped_hosts(&self) -> usize {
        self.hosts.iter().filter(|host| host.error.is_some()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerOnOutcome {
    pub name: String,
    pub accepted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmReleaseOutcome {
    pub vm: VmId,
    pub released: bool,
}

/// Outcome of `startup`.
#[derive(Debug)]
pub struct StartupOutcome {
    pub power_ons: Vec<PowerOnOutcome>,
    pub hosts: Vec<HostOutcome<VmReleaseOutcome>>,
}

impl StartupOutcome {
    pub fn powered_on(&self) -> usize {
        self.power_ons.iter().filter(|p| p.accepted).count()
    }

    pub fn released(&self) -> usize {
        self.hosts
            .iter()
            .flat_map(|host| host.vms.iter())
            .filter(|vm| vm.released)
            .count()
    }

    pub fn failures(&self) -> usize {
        let power_on_failures = self.power_ons.iter().filter(|p| !p.accepted).count();
        let release_failures = self
            .hosts
            .iter()
            .flat_map(|host| host.vms.iter())
            .filter(|vm| !vm.released)
            .count();
        power_on_failures + release_failures
    }

    pub fn skipped_hosts(&self) -> usize {
        self.hosts.iter().filter(|host| host.error.is_some()).count()
    }
}
