use serde::Deserialize;
use serde_json::json;

use crate::core::inventory::VmId;
use crate::core::maintenance::MaintenanceService;
use crate::error::{Result, ServiceError};

use super::{HttpSession, ServiceSettings};

/// Desktop broker control plane reached over its REST API.
#[derive(Debug)]
pub struct BrokerClient {
    session: HttpSession,
}

/// Managed desktop record as listed by the broker.
#[derive(Debug, Deserialize)]
struct MachineRecord {
    uid: u64,
    in_maintenance_mode: bool,
}

impl BrokerClient {
    pub fn connect(endpoint: &str, settings: &ServiceSettings) -> Result<Self> {
        let session = HttpSession::connect("desktop broker", endpoint, settings)?;
        Ok(Self { session })
    }

    pub fn disconnect(self) -> std::result::Result<(), ServiceError> {
        self.session.disconnect()
    }

    /// The record whose hosted machine name is `vm.name` within the hypervisor
    /// connection `vm.host`. Exactly one must match.
    fn find_machine(&self, vm: &VmId) -> std::result::Result<MachineRecord, ServiceError> {
        let mut machines: Vec<MachineRecord> = self.session.get_json(
            "/api/machines",
            &[
                ("hypervisor", vm.host.as_str()),
                ("hosted_machine_name", vm.name.as_str()),
            ],
        )?;
        match machines.len() {
            0 => Err(ServiceError::NoMatchingRecord { vm: vm.to_string() }),
            1 => Ok(machines.remove(0)),
            count => Err(ServiceError::AmbiguousRecord {
                vm: vm.to_string(),
                count,
            }),
        }
    }
}

impl MaintenanceService for BrokerClient {
    fn set_maintenance(&self, vm: &VmId, enabled: bool) -> std::result::Result<(), ServiceError> {
        let machine = self.find_machine(vm)?;
        if machine.in_maintenance_mode == enabled {
            return Ok(());
        }
        self.session.patch_json(
            &format!("/api/machines/{}", machine.uid),
            &json!({ "in_maintenance_mode": enabled }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::remote::test_support::StubServer;

    fn connect(server: &StubServer) -> BrokerClient {
        let settings = ServiceSettings {
            timeout: Duration::from_secs(5),
            token: None,
        };
        BrokerClient::connect(&server.base_url, &settings).unwrap()
    }

    #[test]
    fn set_maintenance_patches_matching_record() {
        let server = StubServer::spawn(vec![
            (201, r#"{"session_id":"b1"}"#),
            (200, r#"[{"uid":42,"name":"CORP\\desk-001","in_maintenance_mode":false}]"#),
            (200, "{}"),
        ]);

        let client = connect(&server);
        client
            .set_maintenance(&VmId::new("esx01", "desk-001"), true)
            .unwrap();
        let requests = server.finish();

        assert!(requests[1].starts_with("GET /api/machines?"));
        assert!(requests[1].contains("hosted_machine_name=desk-001"));
        assert!(requests[2].starts_with("PATCH /api/machines/42"));
        assert!(requests[2].contains(r#"{"in_maintenance_mode":true}"#));
    }

    #[test]
    fn record_already_in_requested_state_is_left_alone() {
        let server = StubServer::spawn(vec![
            (201, r#"{"session_id":"b1"}"#),
            (200, r#"[{"uid":7,"in_maintenance_mode":false}]"#),
        ]);

        let client = connect(&server);
        client
            .set_maintenance(&VmId::new("esx01", "desk-002"), false)
            .unwrap();
        let requests = server.finish();
        assert_eq!(requests.len(), 2);
    }

    #[test]
    fn missing_and_duplicate_records_are_errors() {
        let server = StubServer::spawn(vec![
            (201, r#"{"session_id":"b1"}"#),
            (200, "[]"),
            (
                200,
                r#"[{"uid":1,"in_maintenance_mode":false},{"uid":2,"in_maintenance_mode":false}]"#,
            ),
        ]);

        let client = connect(&server);
        let vm = VmId::new("esx01", "desk-003");
        let missing = client.set_maintenance(&vm, true).unwrap_err();
        let duplicate = client.set_maintenance(&vm, true).unwrap_err();
        server.finish();

        assert_eq!(
            missing,
            ServiceError::NoMatchingRecord {
                vm: "esx01/desk-003".into()
            }
        );
        assert_eq!(
            duplicate,
            ServiceError::AmbiguousRecord {
                vm: "esx01/desk-003".into(),
                count: 2
            }
        );
    }
}
