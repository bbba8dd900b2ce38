use std::fmt;

/// Lifecycle state of a group.
///
/// ```text
/// New --configure--> Configured --start--> Started --stop--> Stopped
///                        ^            |                         |
///                        |            +--(resolution fails)--> Failed
///                        +---------- configure ----------------+
/// ```
///
/// Only `Started` accepts data-path calls. Reconfiguring a running group
/// requires a stop/start cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupState {
    New,
    Configured,
    Started,
    Stopped,
    Failed,
}

impl GroupState {
    pub fn can_configure(self) -> bool {
        matches!(self, Self::New | Self::Configured | Self::Stopped | Self::Failed)
    }

    pub fn can_start(self) -> bool {
        matches!(self, Self::Configured | Self::Stopped)
    }

    pub fn can_stop(self) -> bool {
        self == Self::Started
    }
}

impl fmt::Display for GroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Configured => write!(f, "configured"),
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
