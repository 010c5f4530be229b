use std::fmt;

/// Lifecycle state of a VM as reported by the hardware driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VmState {
    Running,
    Stopped,
    /// Paused with its memory saved, `start` resumes it
    Suspended,
    Absent,
    /// Any transitional or unknown state (`Starting`, `Deleted`...)
    Other,
}

impl VmState {
    /// Map the driver's free-form state string onto the states the orchestrator
    /// makes decisions on.
    pub fn from_driver(state: &str) -> VmState {
        match state {
            "Running" => VmState::Running,
            "Stopped" => VmState::Stopped,
            "Suspended" => VmState::Suspended,
            _ => VmState::Other,
        }
    }

    /// The VM exists and only needs `start` to run again
    pub fn is_resumable(&self) -> bool {
        matches!(self, VmState::Stopped | VmState::Suspended)
    }
}

impl fmt::Display for VmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VmState::Running => "Running",
            VmState::Stopped => "Stopped",
            VmState::Suspended => "Suspended",
            VmState::Absent => "Absent",
            VmState::Other => "Other",
        };
        write!(f, "{}", s)
    }
}

/// Read-only snapshot of a single VM. It is never cached: every decision
/// point fetches a fresh one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VmRecord {
    pub name: String,
    pub state: VmState,
    pub ipv4: Option<String>,
}

impl VmRecord {
    /// Record standing for a VM the driver does not know about
    pub fn absent(name: &str) -> VmRecord {
        VmRecord {
            name: name.to_string(),
            state: VmState::Absent,
            ipv4: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == VmState::Running
    }
}
