//! HTTP clients for the inventory/power service and the desktop broker.
//!
//! Each client owns one session, opened by `connect` and reused for every call
//! in the run. Sessions are closed best-effort with `disconnect`.

pub mod broker;
pub mod inventory;

#[cfg(test)]
pub(crate) mod test_support;

use std::env;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use ureq::{Agent, AgentBuilder};

use crate::error::{Error, Result, ServiceError};

pub use broker::BrokerClient;
pub use inventory::InventoryClient;

const SESSION_PATH: &str = "/api/session";
const SESSION_HEADER: &str = "X-Session-Id";

/// Connection settings for one remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub timeout: Duration,
    /// Bearer token presented when the session is opened.
    pub token: Option<String>,
}

impl ServiceSettings {
    /// Build settings, reading the token from the environment variable `token_env`.
    pub fn from_env(token_env: &str, timeout: Duration) -> Self {
        let token = env::var(token_env)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self { timeout, token }
    }
}

/// Turn an endpoint identifier (`vc01.corp`, `https://vc01.corp/`) into a base URL.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

#[derive(Debug, Deserialize)]
struct SessionCreated {
    session_id: String,
}

/// An authenticated session against one service.
#[derive(Debug)]
pub(crate) struct HttpSession {
    agent: Agent,
    base_url: String,
    session_id: String,
}

impl HttpSession {
    pub(crate) fn connect(
        service: &'static str,
        endpoint: &str,
        settings: &ServiceSettings,
    ) -> Result<Self> {
        let base_url = normalize_endpoint(endpoint);
        let agent = AgentBuilder::new().timeout(settings.timeout).build();
        let connect_failed = |message: String| Error::ConnectFailed {
            service,
            endpoint: base_url.clone(),
            message,
        };

        let url = format!("{base_url}{SESSION_PATH}");
        let mut request = agent.post(&url);
        if let Some(token) = &settings.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        let body = request
            .call()
            .map_err(|err| connect_failed(describe_ureq_error(err)))?
            .into_string()
            .map_err(|err| connect_failed(format!("failed to read session response: {err}")))?;
        let created: SessionCreated = serde_json::from_str(&body)
            .map_err(|err| connect_failed(format!("malformed session response: {err}")))?;

        Ok(Self {
            agent,
            base_url,
            session_id: created.session_id,
        })
    }

    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> std::result::Result<T, ServiceError> {
        let url = self.url(path);
        let body = self.send("GET", &url, query, None)?;
        serde_json::from_str(&body).map_err(|err| ServiceError::Decode {
            url,
            message: err.to_string(),
        })
    }

    pub(crate) fn post(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> std::result::Result<(), ServiceError> {
        let url = self.url(path);
        self.send("POST", &url, query, None).map(|_| ())
    }

    pub(crate) fn patch_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> std::result::Result<(), ServiceError> {
        let url = self.url(path);
        self.send("PATCH", &url, &[], Some(body)).map(|_| ())
    }

    /// Close the session. Callers treat failure as ignorable cleanup.
    pub(crate) fn disconnect(self) -> std::result::Result<(), ServiceError> {
        let url = self.url(SESSION_PATH);
        self.send("DELETE", &url, &[], None).map(|_| ())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn send(
        &self,
        method: &str,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> std::result::Result<String, ServiceError> {
        let mut request = self
            .agent
            .request(method, url)
            .set(SESSION_HEADER, &self.session_id);
        for (key, value) in query {
            request = request.query(key, value);
        }

        let result = match body {
            Some(body) => request
                .set("Content-Type", "application/json")
                .send_string(&body.to_string()),
            None => request.call(),
        };

        match result {
            Ok(response) => response.into_string().map_err(|err| ServiceError::Decode {
                url: url.to_string(),
                message: err.to_string(),
            }),
            Err(ureq::Error::Status(status, response)) => Err(ServiceError::Status {
                url: url.to_string(),
                status,
                body: response.into_string().unwrap_or_default().trim().to_string(),
            }),
            Err(ureq::Error::Transport(transport)) => Err(ServiceError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            }),
        }
    }
}

fn describe_ureq_error(err: ureq::Error) -> String {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            let body = body.trim();
            if body.is_empty() {
                format!("HTTP {status}")
            } else {
                format!("HTTP {status}: {body}")
            }
        }
        ureq::Error::Transport(transport) => transport.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::test_support::StubServer;

    #[test]
    fn normalize_endpoint_adds_scheme_and_trims_slashes() {
        assert_eq!(normalize_endpoint("vc01.corp"), "https://vc01.corp");
        assert_eq!(normalize_endpoint(" https://vc01.corp/ "), "https://vc01.corp");
        assert_eq!(
            normalize_endpoint("http://127.0.0.1:8080//"),
            "http://127.0.0.1:8080"
        );
    }

    #[test]
    fn settings_read_token_from_environment() {
        temp_env::with_var("VMCYCLE_TEST_TOKEN", Some(" s3cret \n"), || {
            let settings = ServiceSettings::from_env("VMCYCLE_TEST_TOKEN", Duration::from_secs(5));
            assert_eq!(settings.token.as_deref(), Some("s3cret"));
        });
        temp_env::with_var_unset("VMCYCLE_TEST_TOKEN", || {
            let settings = ServiceSettings::from_env("VMCYCLE_TEST_TOKEN", Duration::from_secs(5));
            assert_eq!(settings.token, None);
        });
    }

    #[test]
    fn connect_sends_bearer_token_and_keeps_session_id() {
        let server = StubServer::spawn(vec![
            (201, r#"{"session_id":"abc123"}"#),
            (204, ""),
        ]);
        let settings = ServiceSettings {
            timeout: Duration::from_secs(5),
            token: Some("tok".into()),
        };

        let session = HttpSession::connect("inventory service", &server.base_url, &settings).unwrap();
        session.disconnect().unwrap();

        let requests = server.finish();
        assert!(requests[0].starts_with("POST /api/session"));
        assert!(requests[0].to_ascii_lowercase().contains("authorization: bearer tok"));
        assert!(requests[1].starts_with("DELETE /api/session"));
        assert!(requests[1].to_ascii_lowercase().contains("x-session-id: abc123"));
    }

    #[test]
    fn connect_failure_is_fatal_error() {
        let server = StubServer::spawn(vec![(401, r#"{"error":"bad token"}"#)]);
        let settings = ServiceSettings {
            timeout: Duration::from_secs(5),
            token: None,
        };

        let err = HttpSession::connect("desktop broker", &server.base_url, &settings).unwrap_err();
        server.finish();
        match err {
            Error::ConnectFailed {
                service, message, ..
            } => {
                assert_eq!(service, "desktop broker");
                assert!(message.contains("401"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
