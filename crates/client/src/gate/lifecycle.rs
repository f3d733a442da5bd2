//! Worker lifecycle states.

use std::fmt;

use serde::Serialize;

/// Where a gatekeeper version is in its lifecycle.
///
/// `uninstalled -> installing -> installed -> activating -> active`, with
/// `install_failed` reachable from `installing`. A failed install leaves an
/// already active worker active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Uninstalled,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    Active,
    InstallFailed,
}

impl WorkerState {
    /// Install may (re)run unless a lifecycle step is already in flight.
    pub fn can_install(self) -> bool {
        !matches!(self, WorkerState::Installing | WorkerState::Activating)
    }

    /// Activation follows a successful install. Re-activating an active
    /// worker re-runs generation cleanup.
    pub fn can_activate(self) -> bool {
        matches!(self, WorkerState::Installed | WorkerState::Active)
    }

    /// State after an install attempt that started from `self`.
    pub fn after_install(self, succeeded: bool) -> WorkerState {
        match (self, succeeded) {
            (WorkerState::Active, _) => WorkerState::Active,
            (_, true) => WorkerState::Installed,
            (_, false) => WorkerState::InstallFailed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Uninstalled => "uninstalled",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::InstallFailed => "install_failed",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
