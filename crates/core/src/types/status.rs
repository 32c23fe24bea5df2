//! Status enums for wishlists.

use serde::{Deserialize, Serialize};

/// Who can see a wishlist.
///
/// Serialized in lowercase to match the backend (`"private"`, `"public"`,
/// `"anonymous"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShareStatus {
    /// Visible to the owner only.
    #[default]
    Private,
    /// Shared with the owner's name attached.
    Public,
    /// Shared without revealing the owner.
    Anonymous,
}

impl std::fmt::Display for ShareStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Private => write!(f, "private"),
            Self::Public => write!(f, "public"),
            Self::Anonymous => write!(f, "anonymous"),
        }
    }
}

impl std::str::FromStr for ShareStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            "anonymous" => Ok(Self::Anonymous),
            _ => Err(format!("invalid share status: {s}")),
        }
    }
}
