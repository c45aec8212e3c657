// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated-session lifecycle for the platform console: token storage,
//! proactive and reactive renewal, and logout on terminal failure.

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod guard;
pub mod model;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod store;
pub mod termination;
pub mod test_support;
pub mod transport;

use std::sync::Arc;

use crate::client::ApiClient;
use crate::config::SessionConfig;
use crate::session::Session;
use crate::storage::{FileStorage, SessionStorage};
use crate::termination::Navigator;
use crate::transport::{ReqwestTransport, Transport};

/// Build a client over HTTP with the session persisted to the configured file.
pub fn connect(config: &SessionConfig, navigator: Arc<dyn Navigator>) -> ApiClient {
    let transport: Arc<dyn Transport> =
        Arc::new(ReqwestTransport::new(config.base_url.clone(), config.request_timeout()));
    let storage: Arc<dyn SessionStorage> = Arc::new(FileStorage::new(config.session_file()));
    let session = Session::new(config.settings(), Arc::clone(&transport), storage, navigator);
    ApiClient::new(session, transport)
}
