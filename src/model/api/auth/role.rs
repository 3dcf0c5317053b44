use std::fmt::Display;

use serde_repr::{Deserialize_repr, Serialize_repr};

/// Different privilege levels.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Role {
    User = 0,
    Admin = 1,
}

impl Display for Role {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::User => "user",
                Self::Admin => "admin",
            }
        )
    }
}
