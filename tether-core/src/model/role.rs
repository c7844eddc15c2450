use serde::{Deserialize, Serialize};
use std::fmt;

/// Which end of a session this process represents.
///
/// The host shares its screen and receives input; the viewer receives the
/// stream and originates input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Viewer,
}

impl Role {
    pub fn counterpart(self) -> Self {
        match self {
            Role::Host => Role::Viewer,
            Role::Viewer => Role::Host,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Host => f.write_str("host"),
            Role::Viewer => f.write_str("viewer"),
        }
    }
}
