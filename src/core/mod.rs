//! Workflow logic, independent of how the collaborating services are reached.

pub mod diagnostics;
pub mod drain;
pub mod events;
pub mod inventory;
pub mod maintenance;
pub mod operations;
pub mod options;
pub mod outcome;
pub mod reporter;
pub mod running_list;
pub mod selector;
pub mod transition;

pub use diagnostics::{Diagnostic, Severity};
pub use drain::{DrainReport, DrainSettings, SystemTicker, Ticker, TrackedShutdowns};
pub use events::{Event, ForceReason, PowerOperation};
pub use inventory::{PowerService, PowerState, ToolsState, VmId, VmRecord};
pub use maintenance::MaintenanceService;
pub use operations::{shutdown, startup};
pub use options::{ShutdownOptions, StartupOptions};
pub use outcome::{
    HostOutcome, OperationOutput, OperationResult, PowerOnOutcome, ShutdownOutcome,
    StartupOutcome, VmReleaseOutcome, VmShutdownOutcome,
};
pub use reporter::Reporter;
pub use selector::{NameFilter, read_host_list};
pub use transition::{Services, ShutdownDisposition};
