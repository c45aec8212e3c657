// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: token builders, a scripted transport and a
//! recording navigator.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;

use crate::error::SessionError;
use crate::model::{Role, UserProfile};
use crate::session::{Session, SessionSettings};
use crate::storage::MemoryStorage;
use crate::termination::{Destination, Navigator};
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// A well-formed `header.payload.signature` token whose payload names `subject`.
pub fn jwt(subject: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({ "sub": subject }).to_string());
    let signature = URL_SAFE_NO_PAD.encode(format!("sig-{subject}"));
    format!("{header}.{payload}.{signature}")
}

pub fn admin_profile() -> UserProfile {
    UserProfile {
        id: "user-1".to_owned(),
        username: "admin".to_owned(),
        nickname: "Administrator".to_owned(),
        email: Some("admin@example.com".to_owned()),
        role: Role::Admin,
        enabled: true,
        created_at: Some("2024-01-01T10:00:00Z".to_owned()),
    }
}

pub fn user_profile() -> UserProfile {
    UserProfile {
        id: "user-2".to_owned(),
        username: "user1".to_owned(),
        nickname: "User One".to_owned(),
        email: None,
        role: Role::User,
        enabled: true,
        created_at: None,
    }
}

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, SessionError> + Send + Sync;

/// Transport answering from a closure and recording every request it sees.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<ApiRequest>>,
    latency: Duration,
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse, SessionError> + Send + Sync + 'static,
    ) -> Self {
        Self { handler: Box::new(handler), requests: Mutex::new(Vec::new()), latency: Duration::ZERO }
    }

    /// Delay every response, so concurrent callers overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests sent to `route`.
    pub fn count(&self, route: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.route() == route).count()
    }
}

impl Transport for ScriptedTransport {
    fn send(
        &self,
        request: ApiRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse, SessionError>> + Send + '_>> {
        Box::pin(async move {
            self.requests.lock().push(request.clone());
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            (self.handler)(&request)
        })
    }
}

/// Navigator that remembers every destination.
#[derive(Default)]
pub struct RecordingNavigator {
    current: Mutex<Option<String>>,
    destinations: Mutex<Vec<Destination>>,
}

impl RecordingNavigator {
    pub fn at(path: &str) -> Self {
        Self { current: Mutex::new(Some(path.to_owned())), destinations: Mutex::new(Vec::new()) }
    }

    pub fn set_current(&self, path: &str) {
        *self.current.lock() = Some(path.to_owned());
    }

    pub fn destinations(&self) -> Vec<Destination> {
        self.destinations.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: Destination) {
        self.destinations.lock().push(destination);
    }

    fn current_path(&self) -> Option<String> {
        self.current.lock().clone()
    }
}

/// Everything a session test needs to inspect.
pub struct Harness {
    pub session: Session,
    pub transport: Arc<ScriptedTransport>,
    pub storage: Arc<MemoryStorage>,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    pub fn new(transport: ScriptedTransport) -> Self {
        Self::with_storage(transport, MemoryStorage::new())
    }

    pub fn with_storage(transport: ScriptedTransport, storage: MemoryStorage) -> Self {
        let transport = Arc::new(transport);
        let storage = Arc::new(storage);
        let navigator = Arc::new(RecordingNavigator::at("/tasks/42"));
        let session = Session::new(
            SessionSettings::default(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&storage) as Arc<dyn crate::storage::SessionStorage>,
            Arc::clone(&navigator) as Arc<dyn Navigator>,
        );
        Self { session, transport, storage, navigator }
    }

    pub fn client(&self) -> crate::client::ApiClient {
        crate::client::ApiClient::new(
            self.session.clone(),
            Arc::clone(&self.transport) as Arc<dyn Transport>,
        )
    }
}
