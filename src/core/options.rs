use std::path::PathBuf;

use super::drain::DrainSettings;
use super::selector::NameFilter;

/// Options for the `shutdown` operation.
#[derive(Debug, Clone)]
pub struct ShutdownOptions {
    /// Hosts to process, in order. Read from the host-list file by the caller.
    pub hosts: Vec<String>,
    pub name_filter: NameFilter,
    /// Running-VM list to truncate and rewrite.
    pub running_list: PathBuf,
    pub drain: DrainSettings,
}

impl ShutdownOptions {
    pub fn new(hosts: Vec<String>, running_list: PathBuf) -> Self {
        Self {
            hosts,
            name_filter: NameFilter::default(),
            running_list,
            drain: DrainSettings::default(),
        }
    }
}

/// Options for the `startup` operation.
#[derive(Debug, Clone)]
pub struct StartupOptions {
    pub hosts: Vec<String>,
    pub name_filter: NameFilter,
    /// Running-VM list written by the previous shutdown.
    pub running_list: PathBuf,
}

impl StartupOptions {
    pub fn new(hosts: Vec<String>, running_list: PathBuf) -> Self {
        Self {
            hosts,
            name_filter: NameFilter::default(),
            running_list,
        }
    }
}
