use std::fmt;

/// Where a `LineTail` is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    // Constructed or set up, reader not started
    #[default]
    Idle,
    // Reader task running, drain allowed
    Active,
    // Cancellation fired, reader not yet joined
    Stopping,
    // Reader joined and file handle released
    Stopped,
}

impl LifecycleState {
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
