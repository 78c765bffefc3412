//! Database models split into domain-specific modules.
//!
//! Each module holds the row type, its request/response payloads and the
//! queries that operate on its table.

pub mod achievement;
pub mod developer;
pub mod game;
pub mod genre;
pub mod score;
pub mod session;
pub mod user;

pub use achievement::*;
pub use developer::*;
pub use game::*;
pub use genre::*;
pub use score::*;
pub use session::*;
pub use user::*;

use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize a nullable field so that an absent key (`None`) differs from
/// an explicit `null` (`Some(None)`). Use with `#[serde(default)]`.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Body returned by endpoints that only confirm an action
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
