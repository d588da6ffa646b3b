use crate::error::ServiceError;

use super::inventory::VmId;

/// Desktop-broker control plane: toggles the maintenance flag on the managed
/// desktop record that corresponds to a VM.
pub trait MaintenanceService {
    fn set_maintenance(&self, vm: &VmId, enabled: bool) -> Result<(), ServiceError>;
}
