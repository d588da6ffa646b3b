//! Inventory/power service seam.
//!
//! The workflow only ever sees read-only snapshots. Every query goes back to
//! the service; nothing here caches power or tools state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

use super::selector::NameFilter;

/// Power state reported by the virtualization platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Suspended,
    #[serde(other)]
    Unknown,
}

impl PowerState {
    pub fn is_powered_on(self) -> bool {
        matches!(self, PowerState::PoweredOn)
    }

    pub fn describe(self) -> &'static str {
        match self {
            PowerState::PoweredOn => "powered on",
            PowerState::PoweredOff => "powered off",
            PowerState::Suspended => "suspended",
            PowerState::Unknown => "in an unknown power state",
        }
    }
}

/// Readiness of the guest tools agent, which gates guest-initiated shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolsState {
    Running,
    NotRunning,
    #[serde(other)]
    Unknown,
}

impl ToolsState {
    pub fn is_running(self) -> bool {
        matches!(self, ToolsState::Running)
    }
}

/// Identity of a VM: its name is unique within the host it lives on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VmId {
    pub host: String,
    pub name: String,
}

impl VmId {
    pub fn new(host: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for VmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.host, self.name)
    }
}

/// Point-in-time view of a VM as returned by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmRecord {
    pub name: String,
    pub host: String,
    pub power_state: PowerState,
    pub tools_state: ToolsState,
}

impl VmRecord {
    pub fn id(&self) -> VmId {
        VmId::new(self.host.clone(), self.name.clone())
    }
}

/// Narrow view of the virtualization platform consumed by the workflow.
pub trait PowerService {
    /// Enumerate VMs located on `host` whose names match `filter`.
    fn list_vms(&self, host: &str, filter: &NameFilter) -> Result<Vec<VmRecord>, ServiceError>;

    fn power_state(&self, vm: &VmId) -> Result<PowerState, ServiceError>;

    fn tools_state(&self, vm: &VmId) -> Result<ToolsState, ServiceError>;

    /// Ask the guest OS to shut itself down. Returns once the request is accepted.
    fn shutdown_guest(&self, vm: &VmId) -> Result<(), ServiceError>;

    /// Hard power-off without guest cooperation.
    fn power_off(&self, vm: &VmId) -> Result<(), ServiceError>;

    /// Power on by name; the persisted running-VM list carries names only.
    fn power_on(&self, name: &str) -> Result<(), ServiceError>;
}
