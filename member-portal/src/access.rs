//! Access-control gate: the per-request allow/redirect decision.
//!
//! The decision is a pure function of the request path, whether a session
//! exists, and the caller's role. The middleware in `middleware::auth`
//! resolves those inputs and applies the outcome on every request; nothing
//! here mutates session or profile state.

use crate::models::Role;

pub const LOGIN: &str = "/auth/login";
pub const SIGNUP: &str = "/auth/signup";
pub const PENDING_LANDING: &str = "/auth/pending";
pub const MEMBER_HOME: &str = "/members";
pub const ADMIN_AREA: &str = "/members/admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(&'static str),
}

/// Decide whether a request may proceed.
///
/// `role` is the caller's profile role, `None` when no profile row exists.
/// It is only consulted for protected paths, so callers may skip the
/// profile lookup for everything else.
pub fn authorize(path: &str, authenticated: bool, role: Option<Role>) -> Decision {
    // Signed-in users have no business on the auth entry pages.
    if authenticated && (path == LOGIN || path == SIGNUP) {
        return Decision::Redirect(MEMBER_HOME);
    }

    if !in_area(path, MEMBER_HOME) {
        return Decision::Allow;
    }

    if !authenticated {
        return Decision::Redirect(LOGIN);
    }

    match role {
        None | Some(Role::Pending) => Decision::Redirect(PENDING_LANDING),
        Some(Role::Member) if in_area(path, ADMIN_AREA) => Decision::Redirect(MEMBER_HOME),
        Some(Role::Member) | Some(Role::Admin) => Decision::Allow,
    }
}

/// Prefix match on path segments, so `/membership` is not `/members`.
fn in_area(path: &str, area: &str) -> bool {
    path == area
        || path
            .strip_prefix(area)
            .is_some_and(|rest| rest.starts_with('/'))
}
