use std::process::ExitCode;

use crate::Error;

pub fn exit_code(err: &Error) -> ExitCode {
    match err {
        Error::HostListUnavailable { .. } => ExitCode::from(2),
        Error::UnknownAction { .. } => ExitCode::from(2),
        Error::ReadConfig { .. } => ExitCode::from(2),
        Error::ParseConfig { .. } => ExitCode::from(2),
        Error::InvalidConfig { .. } => ExitCode::from(2),
        Error::ExplicitConfigMissing { .. } => ExitCode::from(2),
        Error::InvalidNameFilter { .. } => ExitCode::from(2),
        Error::RunningListUnavailable { .. } => ExitCode::from(2),
        Error::LogUnavailable { .. } => ExitCode::from(2),
        Error::ConnectFailed { .. } => ExitCode::from(2),
    }
}
