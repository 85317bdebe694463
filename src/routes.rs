//! Route-level access control for the admin UI.
//!
//! DESIGN
//! ======
//! Every known route has one [`Access`] level. [`resolve`] answers whether a
//! session may render a path or must be sent elsewhere; [`landing`] follows
//! redirects until a renderable route is reached.

use crate::session::{Role, Session};

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";
pub const ADMIN_HOME_PATH: &str = "/admin";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

const PUBLIC_ROUTES: &[&str] = &["/company", "/login", "/register"];

const USER_ROUTES: &[&str] = &["/", "/plays", "/materials", "/maintenance", "/reports", "/profile"];

const ADMIN_ROUTES: &[&str] = &[
    "/admin",
    "/admin/incidents",
    "/admin/equipment",
    "/admin/inventory",
    "/admin/warehouses",
    "/admin/materials",
    "/admin/suppliers",
    "/admin/material-types",
    "/admin/units",
    "/admin/api-stats",
    "/admin/maintenance-plans",
    "/admin/permissions",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    Render,
    Redirect(&'static str),
}

/// Strip query/fragment and trailing slashes; the root stays `/`.
#[must_use]
pub fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() { HOME_PATH } else { trimmed }
}

/// Access level of a known route, `None` for unknown paths.
#[must_use]
pub fn access_for(path: &str) -> Option<Access> {
    let path = normalize(path);
    if PUBLIC_ROUTES.contains(&path) {
        Some(Access::Public)
    } else if USER_ROUTES.contains(&path) {
        Some(Access::Authenticated)
    } else if ADMIN_ROUTES.contains(&path) {
        Some(Access::Admin)
    } else {
        None
    }
}

/// Decide whether `session` may render `path`.
#[must_use]
pub fn resolve(path: &str, session: Option<&Session>) -> RouteDecision {
    let role = session.map(|s| s.role);

    match (access_for(path), role) {
        (Some(Access::Public), _) => RouteDecision::Render,
        (_, None) => RouteDecision::Redirect(LOGIN_PATH),
        (None, Some(_)) => RouteDecision::Redirect(HOME_PATH),
        (Some(Access::Authenticated), Some(Role::Admin)) if normalize(path) == HOME_PATH => {
            RouteDecision::Redirect(ADMIN_HOME_PATH)
        }
        (Some(Access::Authenticated), Some(_)) => RouteDecision::Render,
        (Some(Access::Admin), Some(Role::Admin)) => RouteDecision::Render,
        (Some(Access::Admin), Some(Role::User)) => RouteDecision::Redirect(HOME_PATH),
    }
}

/// Follow redirects from `path` to the route that actually renders.
#[must_use]
pub fn landing<'a>(path: &'a str, session: Option<&Session>) -> &'a str {
    let mut current = path;
    // Longest chain is unknown -> "/" -> "/admin".
    for _ in 0..4 {
        match resolve(current, session) {
            RouteDecision::Render => return current,
            RouteDecision::Redirect(next) => current = next,
        }
    }
    current
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
