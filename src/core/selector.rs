//! Resolves the host list and name filter into concrete VM records.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use glob::Pattern;

use crate::error::{Error, Result, ServiceError};

use super::diagnostics::Diagnostic;
use super::inventory::{PowerService, VmRecord};

pub const MATCH_ALL: &str = "*";

/// Glob over VM names (`*`, `?`, `[...]`). Defaults to matching everything.
#[derive(Debug, Clone, PartialEq)]
pub struct NameFilter {
    raw: String,
    pattern: Pattern,
}

impl NameFilter {
    pub fn parse(raw: &str) -> Result<Self> {
        let pattern = Pattern::new(raw).map_err(|err| Error::InvalidNameFilter {
            filter: raw.to_string(),
            message: err.msg.to_string(),
        })?;
        Ok(Self {
            raw: raw.to_string(),
            pattern,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, name: &str) -> bool {
        self.pattern.matches(name)
    }
}

impl Default for NameFilter {
    fn default() -> Self {
        Self {
            raw: MATCH_ALL.to_string(),
            pattern: Pattern::new(MATCH_ALL).unwrap_or_default(),
        }
    }
}

impl FromStr for NameFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for NameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Read the newline-delimited host list.
///
/// Blank lines and `#` comments are ignored and duplicate hosts are kept once.
/// A missing or unreadable file is fatal for the run.
pub fn read_host_list(path: &Path, diagnostics: &mut Vec<Diagnostic>) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(|source| Error::HostListUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut seen = HashSet::new();
    let mut hosts = Vec::new();
    for line in contents.lines() {
        let host = line.trim();
        if host.is_empty() || host.starts_with('#') {
            continue;
        }
        if !seen.insert(host.to_string()) {
            diagnostics.push(
                Diagnostic::warning(format!(
                    "Host `{host}` is listed more than once; processing it once."
                ))
                .with_path(path.to_path_buf()),
            );
            continue;
        }
        hosts.push(host.to_string());
    }

    if hosts.is_empty() {
        diagnostics.push(
            Diagnostic::warning("Host list contains no hosts; nothing to do.")
                .with_path(path.to_path_buf()),
        );
    }

    Ok(hosts)
}

/// Enumerate the VMs on `host` matching `filter`.
///
/// Failures propagate so the caller can skip this host and continue with the next.
pub fn select_vms(
    power: &dyn PowerService,
    host: &str,
    filter: &NameFilter,
) -> std::result::Result<Vec<VmRecord>, ServiceError> {
    let mut records = power.list_vms(host, filter)?;
    records.retain(|record| filter.matches(&record.name));
    Ok(records)
}
