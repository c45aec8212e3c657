// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session termination: clear local state, send the user back to login.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::store::TokenStore;

/// Route name of the login entry point.
pub const LOGIN_ROUTE: &str = "login";
/// Route name of the landing page after login.
pub const HOME_ROUTE: &str = "overview";
/// Query key carrying the post-login destination.
pub const REDIRECT_QUERY: &str = "redirect";

/// A named route plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub name: String,
    pub query: BTreeMap<String, String>,
}

impl Destination {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), query: BTreeMap::new() }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// The login route, remembering where the user was headed.
    pub fn login(redirect: Option<&str>) -> Self {
        let dest = Self::named(LOGIN_ROUTE);
        match redirect {
            Some(path) if !path.is_empty() => dest.with_query(REDIRECT_QUERY, path),
            _ => dest,
        }
    }

    pub fn redirect(&self) -> Option<&str> {
        self.query.get(REDIRECT_QUERY).map(String::as_str)
    }
}

/// Programmatic router.
pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: Destination);

    /// Full path of the route currently shown, if known.
    fn current_path(&self) -> Option<String> {
        None
    }
}

/// Navigator for headless use: records the destination in the log only.
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, destination: Destination) {
        tracing::info!(
            route = %destination.name,
            redirect = destination.redirect().unwrap_or(""),
            "navigate"
        );
    }
}

pub struct SessionTerminator {
    store: Arc<TokenStore>,
    navigator: Arc<dyn Navigator>,
}

impl SessionTerminator {
    pub fn new(store: Arc<TokenStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self { store, navigator }
    }

    /// Clear the session and navigate to login.
    ///
    /// `current_path` falls back to the navigator's current route. Repeating
    /// the call is harmless: the store is already clear and the navigation is
    /// simply issued again.
    pub fn terminate(&self, current_path: Option<&str>) {
        let redirect = match current_path {
            Some(path) => Some(path.to_owned()),
            None => self.navigator.current_path(),
        };
        self.store.clear_auth();
        tracing::warn!(redirect = redirect.as_deref().unwrap_or(""), "session terminated");
        self.navigator.navigate(Destination::login(redirect.as_deref()));
    }

    /// Navigate to login after an explicit logout, without a redirect target.
    pub fn signed_out(&self) {
        self.store.clear_auth();
        self.navigator.navigate(Destination::login(None));
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }
}
