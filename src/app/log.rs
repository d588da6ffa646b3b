//! The run log: every event and diagnostic becomes one timestamped line on the
//! console and in an append-only file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::diagnostics::{Diagnostic, Severity};
use crate::core::events::Event;
use crate::core::reporter::Reporter;
use crate::{Error, Result};

use super::render::describe_event;

pub struct RunLog {
    file: File,
    echo: bool,
}

impl RunLog {
    /// Open `path` for appending, creating it and its parent directory if needed.
    pub fn open(path: &Path) -> Result<Self> {
        let unavailable = |source| Error::LogUnavailable {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(unavailable)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(unavailable)?;

        Ok(Self {
            file,
            echo: true,
        })
    }

    /// Stop mirroring lines to stdout/stderr.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn line(&mut self, severity: Severity, message: &str) {
        let line = format_line(OffsetDateTime::now_utc(), severity, message);
        if self.echo {
            match severity {
                Severity::Info => println!("{line}"),
                Severity::Warning | Severity::Error => eprintln!("{line}"),
            }
        }
        // Nowhere left to report a failing log write.
        let _ = writeln!(self.file, "{line}");
    }

    pub fn diagnostics(&mut self, diagnostics: &[Diagnostic]) {
        for diagnostic in diagnostics {
            let mut message = diagnostic.message.clone();
            if let Some(path) = &diagnostic.path {
                message = format!("{message} ({})", path.display());
            }
            if let Some(help) = &diagnostic.help {
                message = format!("{message} {help}");
            }
            self.line(diagnostic.severity, &message);
        }
    }

    pub fn fatal(&mut self, err: &Error) {
        self.line(Severity::Error, &err.to_string());
    }
}

impl Reporter for RunLog {
    fn report(&mut self, event: Event) {
        self.line(event.severity(), &describe_event(&event));
    }
}

fn format_line(now: OffsetDateTime, severity: Severity, message: &str) -> String {
    let timestamp = now
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".into());
    let flattened = message
        .lines()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    format!("[{timestamp}] {:<5} {flattened}", severity.label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use tempfile::tempdir;

    use crate::core::inventory::VmId;

    fn line_pattern() -> Regex {
        Regex::new(r"^\[\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?Z\] (INFO |WARN |ERROR) \S.*$")
            .unwrap()
    }

    #[test]
    fn lines_are_timestamped_and_flattened() {
        let line = format_line(
            OffsetDateTime::UNIX_EPOCH,
            Severity::Error,
            "Configuration validation failed:\n  bad value\n",
        );
        assert_eq!(
            line,
            "[1970-01-01T00:00:00Z] ERROR Configuration validation failed: bad value"
        );
    }

    #[test]
    fn events_and_diagnostics_append_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("vmcycle.log");

        {
            let mut log = RunLog::open(&path).unwrap().quiet();
            log.report(Event::GracefulRequested {
                vm: VmId::new("esx01", "desk-001"),
            });
            log.diagnostics(&[Diagnostic::warning("Running-VM list not found.")
                .with_help("Nothing to power on.")]);
        }
        {
            let mut log = RunLog::open(&path).unwrap().quiet();
            log.fatal(&Error::UnknownAction {
                action: "reboot".into(),
            });
        }

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);

        let pattern = line_pattern();
        for line in &lines {
            assert!(pattern.is_match(line), "unexpected log line: {line}");
        }
        assert!(lines[0].ends_with("INFO  → esx01/desk-001: guest shutdown requested."));
        assert!(lines[1].ends_with("WARN  Running-VM list not found. Nothing to power on."));
        assert!(lines[2].contains("ERROR Unknown action `reboot`"));
    }

    #[test]
    fn unwritable_log_location_is_reported() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let err = RunLog::open(&blocker.join("vmcycle.log")).err().unwrap();
        assert!(matches!(err, Error::LogUnavailable { .. }));
    }
}
