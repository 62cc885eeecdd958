//! In-memory session state.
//!
//! Fields are private so every reachable value keeps the login invariant:
//! a logged-out state carries the zero-value profile and no pending count,
//! a logged-in state carries a profile with an assigned ID.

use serde::Serialize;

use crate::types::{AdminRole, UserInfo};

/// Who is logged in to the console, plus auxiliary counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    is_logged_in: bool,
    user_info: UserInfo,
    pending_count: u32,
}

impl SessionState {
    /// The logged-out state.
    #[must_use]
    pub fn logged_out() -> Self {
        Self::default()
    }

    /// A logged-in state for `user_info`.
    ///
    /// Returns `None` if the profile has no assigned ID.
    #[must_use]
    pub fn logged_in(user_info: UserInfo) -> Option<Self> {
        user_info.is_assigned().then_some(Self {
            is_logged_in: true,
            user_info,
            pending_count: 0,
        })
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    #[must_use]
    pub const fn user_info(&self) -> &UserInfo {
        &self.user_info
    }

    #[must_use]
    pub const fn pending_count(&self) -> u32 {
        self.pending_count
    }

    /// Role of the logged-in account, `None` when logged out.
    #[must_use]
    pub const fn role(&self) -> Option<AdminRole> {
        if self.is_logged_in {
            Some(self.user_info.role)
        } else {
            None
        }
    }

    /// Replace the profile of a logged-in session.
    ///
    /// Ignored (returns `false`) when logged out or when `user_info` has no
    /// assigned ID.
    pub fn set_profile(&mut self, user_info: UserInfo) -> bool {
        if !self.is_logged_in || !user_info.is_assigned() {
            return false;
        }
        self.user_info = user_info;
        true
    }

    /// Update the pending counter of a logged-in session.
    ///
    /// Ignored (returns `false`) when logged out.
    pub const fn set_pending_count(&mut self, count: u32) -> bool {
        if !self.is_logged_in {
            return false;
        }
        self.pending_count = count;
        true
    }

    /// Whether the login invariant holds.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        if self.is_logged_in {
            self.user_info.is_assigned()
        } else {
            self.user_info.is_zero() && self.pending_count == 0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;

    fn profile(id: i64) -> UserInfo {
        UserInfo {
            id: UserId::new(id),
            username: "lima".to_string(),
            role: AdminRole::SuperAdmin,
            ..UserInfo::default()
        }
    }

    #[test]
    fn test_logged_out_is_consistent() {
        let state = SessionState::logged_out();
        assert!(!state.is_logged_in());
        assert!(state.user_info().is_zero());
        assert_eq!(state.role(), None);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_logged_in_requires_assigned_id() {
        assert!(SessionState::logged_in(profile(0)).is_none());
        let state = SessionState::logged_in(profile(5)).unwrap();
        assert!(state.is_logged_in());
        assert_eq!(state.role(), Some(AdminRole::SuperAdmin));
        assert!(state.is_consistent());
    }

    #[test]
    fn test_mutators_ignored_when_logged_out() {
        let mut state = SessionState::logged_out();
        assert!(!state.set_profile(profile(5)));
        assert!(!state.set_pending_count(3));
        assert!(state.is_consistent());
    }

    #[test]
    fn test_mutators_apply_when_logged_in() {
        let mut state = SessionState::logged_in(profile(5)).unwrap();
        assert!(state.set_pending_count(4));
        assert_eq!(state.pending_count(), 4);

        let mut renamed = profile(5);
        renamed.username = "lima2".to_string();
        assert!(state.set_profile(renamed));
        assert_eq!(state.user_info().username, "lima2");

        assert!(!state.set_profile(UserInfo::default()));
        assert!(state.is_consistent());
    }
}
