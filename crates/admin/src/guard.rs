//! Navigation guard: restore the session, look up the route, decide.
//!
//! The decision itself is [`easyhome_core::decide`]; this module supplies the
//! console's route table and the restore step in front of it.

use easyhome_core::{
    AdminRole, GuardPaths, Navigation, NavigationTarget, RouteRequirement, decide,
};

use crate::services::auth::Authenticator;
use crate::session::SessionStore;
use crate::storage::KeyValueStorage;

const STAFF: &[AdminRole] = &[AdminRole::SuperAdmin, AdminRole::Admin];

/// A named console route and its access requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDef {
    pub name: &'static str,
    pub path: &'static str,
    pub title: &'static str,
    pub requirement: RouteRequirement,
}

/// The console's routes.
pub static CONSOLE_ROUTES: &[RouteDef] = &[
    RouteDef {
        name: "Login",
        path: "/login",
        title: "Sign in",
        requirement: RouteRequirement::PUBLIC,
    },
    RouteDef {
        name: "Home",
        path: "/",
        title: "Home",
        requirement: RouteRequirement::AUTHENTICATED,
    },
    RouteDef {
        name: "Dashboard",
        path: "/dashboard",
        title: "Dashboard",
        requirement: RouteRequirement::AUTHENTICATED,
    },
    RouteDef {
        name: "AdminManage",
        path: "/admin-manage",
        title: "Administrators",
        requirement: RouteRequirement::SUPER_ADMIN,
    },
    RouteDef {
        name: "UserManage",
        path: "/user-manage",
        title: "Users",
        requirement: RouteRequirement::roles(STAFF),
    },
    RouteDef {
        name: "HouseManage",
        path: "/house-manage",
        title: "Listings",
        requirement: RouteRequirement::roles(STAFF),
    },
];

/// Find the route registered at `path`.
#[must_use]
pub fn find_route<'a>(routes: &'a [RouteDef], path: &str) -> Option<&'a RouteDef> {
    routes.iter().find(|r| r.path == path)
}

/// Runs the access check for every navigation.
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    paths: GuardPaths,
    routes: &'static [RouteDef],
}

impl Default for NavigationGuard {
    fn default() -> Self {
        Self::new(GuardPaths::default(), CONSOLE_ROUTES)
    }
}

impl NavigationGuard {
    #[must_use]
    pub const fn new(paths: GuardPaths, routes: &'static [RouteDef]) -> Self {
        Self { paths, routes }
    }

    #[must_use]
    pub const fn paths(&self) -> &GuardPaths {
        &self.paths
    }

    #[must_use]
    pub const fn routes(&self) -> &'static [RouteDef] {
        self.routes
    }

    /// Requirement of the route at `path`. Unknown paths carry none.
    #[must_use]
    pub fn requirement(&self, path: &str) -> RouteRequirement {
        find_route(self.routes, path).map_or(RouteRequirement::PUBLIC, |r| r.requirement)
    }

    /// Decide whether the navigation from `from` to `to` may proceed.
    ///
    /// Restores the session first, so a fresh store reflects the persisted
    /// record before the decision.
    pub async fn check<S, A>(
        &self,
        store: &SessionStore<S, A>,
        to: &NavigationTarget,
        from: Option<&NavigationTarget>,
    ) -> Navigation
    where
        S: KeyValueStorage,
        A: Authenticator,
    {
        store.restore().await;
        let state = store.snapshot();
        let navigation = decide(&self.requirement(&to.path), to, &state, &self.paths);

        match &navigation {
            Navigation::Proceed => tracing::debug!(
                to = %to.full_path,
                from = from.map(|f| f.full_path.as_str()),
                "Navigation allowed"
            ),
            Navigation::Redirect(redirect) => tracing::debug!(
                to = %to.full_path,
                from = from.map(|f| f.full_path.as_str()),
                redirect = %redirect.to_uri(),
                logged_in = state.is_logged_in(),
                "Navigation redirected"
            ),
        }
        navigation
    }
}
