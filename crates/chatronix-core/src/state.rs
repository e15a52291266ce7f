//! Shared cross-platform state types.

use std::fmt;

/// Top-level mode of the sync controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncMode {
    /// Live subscription to the remote message store.
    Online,
    /// Local cache only.
    Offline,
}

impl SyncMode {
    /// Mode implied by the connectivity signal and store availability.
    pub const fn resolve(connected: bool, store_available: bool) -> Self {
        if connected && store_available {
            Self::Online
        } else {
            Self::Offline
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => f.write_str("online"),
            Self::Offline => f.write_str("offline"),
        }
    }
}
