//! Console user profile.

use serde::{Deserialize, Serialize};

use super::{AccountStatus, AdminRole, Email, UserId};

/// Profile of the account signed in to the console.
///
/// This is the shape returned by `/api/admin/user-info` and the JSON cached
/// under the `admin_user_info` storage key. `Default` is the zero-value
/// profile held while nobody is logged in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    pub role: AdminRole,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
}

impl UserInfo {
    /// Whether this profile identifies a real account.
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        self.id.is_assigned()
    }

    /// Whether this is the zero-value profile.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub const fn is_super_admin(&self) -> bool {
        matches!(self.role, AdminRole::SuperAdmin)
    }
}
