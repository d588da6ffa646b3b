use serde::Deserialize;

use crate::core::inventory::{PowerService, PowerState, ToolsState, VmId, VmRecord};
use crate::core::selector::NameFilter;
use crate::error::{Result, ServiceError};

use super::{HttpSession, ServiceSettings};

/// Inventory/power service reached over its REST API.
#[derive(Debug)]
pub struct InventoryClient {
    session: HttpSession,
}

#[derive(Debug, Deserialize)]
struct RawVm {
    name: String,
    #[serde(default)]
    host: Option<String>,
    power_state: PowerState,
    #[serde(default = "unknown_tools")]
    tools_state: ToolsState,
}

fn unknown_tools() -> ToolsState {
    ToolsState::Unknown
}

fn vm_query(vm: &VmId) -> [(&'static str, &str); 2] {
    [("host", vm.host.as_str()), ("name", vm.name.as_str())]
}

#[derive(Debug, Deserialize)]
struct PowerStateBody {
    power_state: PowerState,
}

#[derive(Debug, Deserialize)]
struct ToolsStateBody {
    tools_state: ToolsState,
}

impl InventoryClient {
    pub fn connect(endpoint: &str, settings: &ServiceSettings) -> Result<Self> {
        let session = HttpSession::connect("inventory service", endpoint, settings)?;
        Ok(Self { session })
    }

    pub fn disconnect(self) -> std::result::Result<(), ServiceError> {
        self.session.disconnect()
    }
}

impl PowerService for InventoryClient {
    fn list_vms(
        &self,
        host: &str,
        filter: &NameFilter,
    ) -> std::result::Result<Vec<VmRecord>, ServiceError> {
        let raw: Vec<RawVm> = self
            .session
            .get_json("/api/vms", &[("host", host), ("filter", filter.as_str())])?;
        Ok(raw
            .into_iter()
            .map(|vm| VmRecord {
                name: vm.name,
                host: vm.host.unwrap_or_else(|| host.to_string()),
                power_state: vm.power_state,
                tools_state: vm.tools_state,
            })
            .collect())
    }

    fn power_state(&self, vm: &VmId) -> std::result::Result<PowerState, ServiceError> {
        let body: PowerStateBody = self.session.get_json("/api/vms/power", &vm_query(vm))?;
        Ok(body.power_state)
    }

    fn tools_state(&self, vm: &VmId) -> std::result::Result<ToolsState, ServiceError> {
        let body: ToolsStateBody = self.session.get_json("/api/vms/tools", &vm_query(vm))?;
        Ok(body.tools_state)
    }

    fn shutdown_guest(&self, vm: &VmId) -> std::result::Result<(), ServiceError> {
        self.session.post("/api/vms/shutdown-guest", &vm_query(vm))
    }

    fn power_off(&self, vm: &VmId) -> std::result::Result<(), ServiceError> {
        self.session.post("/api/vms/power-off", &vm_query(vm))
    }

    fn power_on(&self, name: &str) -> std::result::Result<(), ServiceError> {
        self.session.post("/api/vms/power-on", &[("name", name)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::remote::test_support::StubServer;

    fn settings() -> ServiceSettings {
        ServiceSettings {
            timeout: Duration::from_secs(5),
            token: None,
        }
    }

    #[test]
    fn list_vms_fills_missing_host_and_tools() {
        let server = StubServer::spawn(vec![
            (201, r#"{"session_id":"s1"}"#),
            (
                200,
                r#"[{"name":"desk-001","power_state":"powered_on","tools_state":"running"},
                    {"name":"desk-002","host":"esx01","power_state":"suspended"}]"#,
            ),
        ]);

        let client = InventoryClient::connect(&server.base_url, &settings()).unwrap();
        let records = client.list_vms("esx01", &NameFilter::default()).unwrap();
        let requests = server.finish();

        assert_eq!(
            records,
            vec![
                VmRecord {
                    name: "desk-001".into(),
                    host: "esx01".into(),
                    power_state: PowerState::PoweredOn,
                    tools_state: ToolsState::Running,
                },
                VmRecord {
                    name: "desk-002".into(),
                    host: "esx01".into(),
                    power_state: PowerState::Suspended,
                    tools_state: ToolsState::Unknown,
                },
            ]
        );
        assert!(requests[1].starts_with("GET /api/vms?"));
        assert!(requests[1].contains("host=esx01"));
        assert!(requests[1].to_ascii_lowercase().contains("x-session-id: s1"));
    }

    #[test]
    fn power_state_and_operations_use_vm_identity() {
        let server = StubServer::spawn(vec![
            (201, r#"{"session_id":"s1"}"#),
            (200, r#"{"power_state":"powered_off"}"#),
            (202, ""),
            (202, ""),
        ]);

        let client = InventoryClient::connect(&server.base_url, &settings()).unwrap();
        let vm = VmId::new("esx02", "desk-007");
        assert_eq!(client.power_state(&vm).unwrap(), PowerState::PoweredOff);
        client.shutdown_guest(&vm).unwrap();
        client.power_on("desk-007").unwrap();
        let requests = server.finish();

        assert!(requests[1].starts_with("GET /api/vms/power?"));
        assert!(requests[2].starts_with("POST /api/vms/shutdown-guest?"));
        assert!(requests[2].contains("name=desk-007"));
        assert!(requests[3].starts_with("POST /api/vms/power-on?name=desk-007"));
    }

    #[test]
    fn http_errors_become_service_errors() {
        let server = StubServer::spawn(vec![
            (201, r#"{"session_id":"s1"}"#),
            (404, "no such host"),
        ]);

        let client = InventoryClient::connect(&server.base_url, &settings()).unwrap();
        let err = client.list_vms("esx99", &NameFilter::default()).unwrap_err();
        server.finish();

        match err {
            ServiceError::Status { status, body, .. } => {
                assert_eq!(status, 404);
                assert_eq!(body, "no such host");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
