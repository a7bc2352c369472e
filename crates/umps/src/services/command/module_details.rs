// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Identity of a running module.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::system;

/// Who and where a module is.
///
/// New details are stamped with the calling process: executable name,
/// pid, ppid, and machine. Only the module name must be set by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModuleDetails {
    module_name: String,
    executable: String,
    instance: u16,
    process_identifier: i64,
    parent_process_identifier: i64,
    machine: String,
}

impl Default for ModuleDetails {
    fn default() -> Self {
        let executable = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            module_name: String::new(),
            executable,
            instance: 0,
            process_identifier: system::process_identifier(),
            parent_process_identifier: system::parent_process_identifier(),
            machine: system::host_name(),
        }
    }
}

impl ModuleDetails {
    /// Creates details stamped with the calling process.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the module name, e.g. `"scanner"`.
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument("module name is empty".into()));
        }
        self.module_name = name.trim().to_string();
        Ok(())
    }

    /// The module name.
    pub fn name(&self) -> &str {
        &self.module_name
    }

    /// Sets the executable name.
    pub fn set_executable(&mut self, executable: &str) {
        self.executable = executable.to_string();
    }

    /// The executable name.
    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Sets the instance number, for running several copies of a module.
    pub fn set_instance(&mut self, instance: u16) {
        self.instance = instance;
    }

    /// The instance number.
    pub fn instance(&self) -> u16 {
        self.instance
    }

    /// Sets the process identifier.
    pub fn set_process_identifier(&mut self, pid: i64) {
        self.process_identifier = pid;
    }

    /// The process identifier.
    pub fn process_identifier(&self) -> i64 {
        self.process_identifier
    }

    /// Sets the parent process identifier.
    pub fn set_parent_process_identifier(&mut self, ppid: i64) {
        self.parent_process_identifier = ppid;
    }

    /// The parent process identifier.
    pub fn parent_process_identifier(&self) -> i64 {
        self.parent_process_identifier
    }

    /// Sets the machine name.
    pub fn set_machine(&mut self, machine: &str) {
        self.machine = machine.to_string();
    }

    /// The machine name.
    pub fn machine(&self) -> &str {
        &self.machine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_stamped_from_the_process() {
        let details = ModuleDetails::new();
        assert!(details.process_identifier() > 0);
        assert!(!details.machine().is_empty());
        assert!(!details.executable().is_empty());
        assert!(details.name().is_empty());
    }

    #[test]
    fn name_must_be_nonempty() {
        let mut details = ModuleDetails::new();
        assert!(details.set_name("").is_err());
        details.set_name("scanner").unwrap();
        assert_eq!(details.name(), "scanner");
    }
}
