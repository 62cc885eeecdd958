//! Route access requirements and the navigation decision.
//!
//! [`decide`] is the whole policy: given the requirement of the route being
//! entered and a snapshot of the session, it yields exactly one
//! [`Navigation`]. Checks run in a fixed order:
//!
//! 1. authentication (anonymous users never reach a role check),
//! 2. super-admin requirement,
//! 3. logged-in users entering the login page,
//! 4. allowed-role list,
//! 5. otherwise proceed.

use url::form_urlencoded;

use crate::session::SessionState;
use crate::types::AdminRole;

/// Query parameter carrying the path to resume after login.
pub const REDIRECT_PARAM: &str = "redirect";

/// Static access metadata attached to a route.
///
/// `Default` is "no constraint".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteRequirement {
    pub requires_auth: bool,
    pub requires_super_admin: bool,
    pub allowed_roles: &'static [AdminRole],
}

impl RouteRequirement {
    /// No constraint.
    pub const PUBLIC: Self = Self {
        requires_auth: false,
        requires_super_admin: false,
        allowed_roles: &[],
    };

    /// Any logged-in account.
    pub const AUTHENTICATED: Self = Self {
        requires_auth: true,
        ..Self::PUBLIC
    };

    /// Logged-in super admins only.
    pub const SUPER_ADMIN: Self = Self {
        requires_super_admin: true,
        ..Self::AUTHENTICATED
    };

    /// Logged-in accounts whose role is in `roles`.
    #[must_use]
    pub const fn roles(roles: &'static [AdminRole]) -> Self {
        Self {
            allowed_roles: roles,
            ..Self::AUTHENTICATED
        }
    }

    /// Whether `role` passes the allowed-role list.
    ///
    /// An empty list admits everyone, including anonymous visitors.
    #[must_use]
    pub fn admits(&self, role: Option<AdminRole>) -> bool {
        self.allowed_roles.is_empty() || role.is_some_and(|r| self.allowed_roles.contains(&r))
    }
}

/// Fixed paths the guard redirects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPaths {
    /// The login page.
    pub login: String,
    /// Where authenticated users without the required role land.
    pub landing: String,
    /// Application root, where logged-in users visiting the login page go.
    pub root: String,
}

impl Default for GuardPaths {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            landing: "/dashboard".to_string(),
            root: "/".to_string(),
        }
    }
}

/// A route being navigated to or from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    /// Path without query string, used for route lookup.
    pub path: String,
    /// Path including the query string, preserved across a login redirect.
    pub full_path: String,
}

impl NavigationTarget {
    /// Build a target from a path with an optional query string.
    #[must_use]
    pub fn new(full_path: &str) -> Self {
        let path = full_path
            .split_once('?')
            .map_or(full_path, |(path, _)| path);
        Self {
            path: path.to_string(),
            full_path: full_path.to_string(),
        }
    }
}

/// A redirect to another route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Redirect {
    /// Redirect to `path` with no query.
    #[must_use]
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// The redirect as a URI reference, e.g. `/login?redirect=%2Fdashboard`.
    #[must_use]
    pub fn to_uri(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{query}", self.path)
    }
}

/// Outcome of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Continue to the target unmodified.
    Proceed,
    /// Go somewhere else instead.
    Redirect(Redirect),
}

/// Decide whether `state` may enter `target`, whose route carries
/// `requirement`.
#[must_use]
pub fn decide(
    requirement: &RouteRequirement,
    target: &NavigationTarget,
    state: &SessionState,
    paths: &GuardPaths,
) -> Navigation {
    if requirement.requires_auth && !state.is_logged_in() {
        return Navigation::Redirect(
            Redirect::to(&paths.login).with_query(REDIRECT_PARAM, &target.full_path),
        );
    }

    if requirement.requires_super_admin && state.role() != Some(AdminRole::SuperAdmin) {
        return Navigation::Redirect(Redirect::to(&paths.landing));
    }

    if target.path == paths.login && state.is_logged_in() {
        return Navigation::Redirect(Redirect::to(&paths.root));
    }

    if !requirement.admits(state.role()) {
        return Navigation::Redirect(Redirect::to(&paths.landing));
    }

    Navigation::Proceed
}
