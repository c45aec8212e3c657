// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Navigation guard: decides whether a route may be entered with the current
//! session, using only the cached session predicates.

use crate::session::Session;
use crate::termination::{Destination, HOME_ROUTE};

/// Access requirements attached to a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteRequirements {
    pub requires_auth: bool,
    /// Only reachable when signed out (the login page).
    pub requires_guest: bool,
    pub requires_admin: bool,
}

impl RouteRequirements {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn authenticated() -> Self {
        Self { requires_auth: true, ..Self::default() }
    }

    pub fn admin() -> Self {
        Self { requires_auth: true, requires_admin: true, ..Self::default() }
    }

    pub fn guest() -> Self {
        Self { requires_guest: true, ..Self::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(Destination),
}

/// Decide what happens when navigating to `target_path`.
pub fn guard(session: &Session, requirements: RouteRequirements, target_path: &str) -> GuardDecision {
    decide(session.is_authenticated(), session.is_admin(), requirements, target_path)
}

fn decide(
    authenticated: bool,
    admin: bool,
    requirements: RouteRequirements,
    target_path: &str,
) -> GuardDecision {
    if requirements.requires_guest && authenticated {
        return GuardDecision::Redirect(Destination::named(HOME_ROUTE));
    }
    if requirements.requires_auth && !authenticated {
        return GuardDecision::Redirect(Destination::login(Some(target_path)));
    }
    if requirements.requires_admin && !admin {
        return GuardDecision::Redirect(Destination::named(HOME_ROUTE));
    }
    GuardDecision::Allow
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
