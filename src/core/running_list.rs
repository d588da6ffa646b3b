//! Persisted list of VM names that were powered on when shutdown ran.
//!
//! One name per line. Shutdown truncates and rewrites it; startup only reads it.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::diagnostics::Diagnostic;

/// Append handle for the running-VM list during a shutdown run.
#[derive(Debug)]
pub struct RunningListWriter {
    path: PathBuf,
    file: File,
    recorded: Vec<String>,
    seen: HashSet<String>,
}

/// Result of appending a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Appended,
    AlreadyPresent,
}

impl RunningListWriter {
    /// Truncate (or create) the list for a new shutdown run.
    pub fn truncate(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| Error::RunningListUnavailable {
                path: path.to_path_buf(),
                action: "created",
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|source| Error::RunningListUnavailable {
                path: path.to_path_buf(),
                action: "truncated",
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            recorded: Vec::new(),
            seen: HashSet::new(),
        })
    }

    /// Append `name`, flushing immediately. A name is written at most once per run.
    pub fn append(&mut self, name: &str) -> io::Result<Recorded> {
        if self.seen.contains(name) {
            return Ok(Recorded::AlreadyPresent);
        }
        writeln!(self.file, "{name}")?;
        self.file.flush()?;
        self.seen.insert(name.to_string());
        self.recorded.push(name.to_string());
        Ok(Recorded::Appended)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names written so far, in the order they were appended.
    pub fn recorded(&self) -> &[String] {
        &self.recorded
    }

    pub fn into_recorded(self) -> Vec<String> {
        self.recorded
    }
}

/// Read the list written by the most recent shutdown.
///
/// A missing file means there is nothing to power on; the caller gets an empty
/// list and a warning. Any other read failure is fatal.
pub fn read_running_list(path: &Path, diagnostics: &mut Vec<Diagnostic>) -> Result<Vec<String>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            diagnostics.push(
                Diagnostic::warning("No running-VM list found; no VMs will be powered on.")
                    .with_path(path.to_path_buf())
                    .with_help("The list is written by a previous `shutdown` run."),
            );
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(Error::RunningListUnavailable {
                path: path.to_path_buf(),
                action: "read",
                source,
            });
        }
    };

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn truncate_discards_previous_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("running_vms.txt");
        fs::write(&path, "stale-01\nstale-02\n").unwrap();

        let writer = RunningListWriter::truncate(&path).unwrap();
        drop(writer);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn append_writes_each_name_once_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state/running_vms.txt");

        let mut writer = RunningListWriter::truncate(&path).unwrap();
        assert_eq!(writer.append("desk-002").unwrap(), Recorded::Appended);
        assert_eq!(writer.append("desk-001").unwrap(), Recorded::Appended);
        assert_eq!(writer.append("desk-002").unwrap(), Recorded::AlreadyPresent);
        assert_eq!(writer.recorded(), ["desk-002", "desk-001"]);

        assert_eq!(fs::read_to_string(&path).unwrap(), "desk-002\ndesk-001\n");
    }

    #[test]
    fn read_skips_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("running_vms.txt");
        fs::write(&path, "desk-001\n\n  desk-002 \n").unwrap();

        let mut diagnostics = Vec::new();
        let names = read_running_list(&path, &mut diagnostics).unwrap();
        assert_eq!(names, vec!["desk-001", "desk-002"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn read_missing_list_is_empty_with_warning() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.txt");

        let mut diagnostics = Vec::new();
        let names = read_running_list(&path, &mut diagnostics).unwrap();
        assert!(names.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].path.as_deref(), Some(path.as_path()));
    }
}
