use serde::{Deserialize, Serialize};

/// Administrator-controlled override lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserList {
    /// Users that bypass every penalty.
    Whitelist,
    /// Users that are always denied.
    Blacklist,
}

impl UserList {
    /// Returns a stable storage value for this list.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whitelist => "whitelist",
            Self::Blacklist => "blacklist",
        }
    }
}
