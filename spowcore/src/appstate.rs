use serde::{Deserialize, Serialize};
use std::fmt;

/// App state patch collections synced after login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchName {
    CriticalBlock,
    CriticalUnblockLow,
    RegularHigh,
    Regular,
    RegularLow,
}

impl PatchName {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchName::CriticalBlock => "critical_block",
            PatchName::CriticalUnblockLow => "critical_unblock_low",
            PatchName::RegularHigh => "regular_high",
            PatchName::Regular => "regular",
            PatchName::RegularLow => "regular_low",
        }
    }

    /// The collection carrying the push name; once it is synced presence can
    /// be announced with the right display name.
    pub fn is_critical_block(&self) -> bool {
        matches!(self, PatchName::CriticalBlock)
    }
}

impl fmt::Display for PatchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
