use crate::jid::Jid;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub jid: Jid,
    pub name: String,
}

impl GroupInfo {
    pub fn new(jid: Jid, name: impl Into<String>) -> Self {
        Self {
            jid,
            name: name.into(),
        }
    }

    /// One line of `list` output: `<jid>\t<name>`.
    pub fn to_list_line(&self) -> String {
        format!("{}\t{}", self.jid, self.name)
    }
}
