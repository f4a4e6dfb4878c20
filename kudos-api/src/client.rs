use reqwest::StatusCode;
use secrecy::SecretString;
use tokio::sync::broadcast;

use crate::endpoints::auth::{
    Login, LoginResponse, Logout, NewAccount, RefreshResponse, RefreshToken, Register,
    RegisterResponse, Role,
};
use crate::envelope::Envelope;
use crate::refresh::{RefreshGate, RefreshState, Ticket};
use crate::request::{ApiRequest, Endpoint};
use crate::storage::{MemoryTokenStore, TokenStorage};
use crate::transport::{HttpTransport, RawResponse, Transport};
use crate::{ApiError, ExpiryReason};

const EVENT_CAPACITY: usize = 16;

/// Session transitions, for consumers that react to them (e.g. prompting for login on `Expired`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Authenticated { role: Option<Role> },
    Refreshed,
    Expired { reason: ExpiryReason },
    LoggedOut,
}

/// Authenticated portal client.
///
/// Every request carries the stored bearer token. A 401 on a non-exempt
/// request triggers at most one concurrent refresh; callers arriving while it
/// runs wait for its outcome and replay once with the new token.
pub struct Client<T = HttpTransport, S = MemoryTokenStore> {
    transport: T,
    storage: S,
    gate: RefreshGate,
    events: broadcast::Sender<SessionEvent>,
}

impl<T, S> Client<T, S>
where
    T: Transport,
    S: TokenStorage,
{
    pub fn new(transport: T, storage: S) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            storage,
            gate: RefreshGate::default(),
            events,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.gate.state()
    }

    /// Callers currently waiting on the in-flight refresh.
    pub fn pending_waiters(&self) -> usize {
        self.gate.pending()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_token().is_some()
    }

    pub async fn send<E>(&self, endpoint: E) -> Result<E::Response, ApiError>
    where
        E: Endpoint,
    {
        self.send_enveloped(endpoint).await.map(|envelope| envelope.data)
    }

    /// Like [`Client::send`], keeping the envelope flags (`message`, `isNewUser`).
    pub async fn send_enveloped<E>(&self, endpoint: E) -> Result<Envelope<E::Response>, ApiError>
    where
        E: Endpoint,
    {
        let request = ApiRequest::from_endpoint(&endpoint)?;
        let response = self.execute(&request).await?;
        Envelope::parse(&response.body)
    }

    /// Send a request through the refresh protocol and return the raw success response.
    pub async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        let mut token = self.current_token();
        let mut retried = false;

        loop {
            tracing::debug!(
                method = %request.method,
                path = %request.path,
                retried,
                "Sending request"
            );
            let response = self.transport.execute(request, token.as_deref()).await?;

            if response.status.is_success() {
                return Ok(response);
            }
            if response.status != StatusCode::UNAUTHORIZED {
                return Err(ApiError::from_response(response.status, &response.body));
            }
            if request.is_refresh_exempt() {
                tracing::debug!(path = %request.path, "Unauthorized on exempt request");
                self.discard_token();
                return Err(ApiError::from_response(response.status, &response.body));
            }
            if retried {
                return Err(self.expire(ExpiryReason::RetryExhausted));
            }
            retried = true;

            token = match self.current_token() {
                // A refresh settled while this request was on the wire
                Some(stored) if token.as_deref() != Some(stored.as_str()) => {
                    tracing::debug!(path = %request.path, "Replaying with newer stored token");
                    Some(stored)
                }
                _ => Some(self.refreshed_token().await?),
            };
        }
    }

    async fn refreshed_token(&self) -> Result<String, ApiError> {
        let mut rejoined = false;
        let lease = loop {
            match self.gate.enter() {
                Ticket::Leader(lease) => break lease,
                Ticket::Waiter(receiver) => {
                    tracing::debug!(rejoined, "Waiting on in-flight refresh");
                    let outcome = receiver
                        .await
                        .unwrap_or(Err(ExpiryReason::RefreshAbandoned));
                    match outcome {
                        // The leader was cancelled; the session itself is still good
                        Err(ExpiryReason::RefreshAbandoned) if !rejoined => {
                            tracing::debug!("Refresh leader went away, rejoining");
                            rejoined = true;
                        }
                        Err(ExpiryReason::RefreshAbandoned) => {
                            return Err(self.expire(ExpiryReason::RefreshAbandoned));
                        }
                        outcome => {
                            return outcome.map_err(|reason| ApiError::AuthExpired { reason });
                        }
                    }
                }
            }
        };

        tracing::debug!("Refreshing access token");
        let outcome = self.refresh().await;
        match &outcome {
            Ok(token) => {
                if let Err(e) = self.storage.store(token) {
                    tracing::warn!(error = %e, "Failed to persist refreshed token");
                }
                tracing::info!("Session refreshed");
                self.emit(SessionEvent::Refreshed);
            }
            Err(reason) => {
                tracing::warn!(reason = %reason, "Session refresh failed");
                self.discard_token();
                self.emit(SessionEvent::Expired {
                    reason: reason.clone(),
                });
            }
        }

        lease.settle(outcome.clone());
        outcome.map_err(|reason| ApiError::AuthExpired { reason })
    }

    /// One refresh round trip. Sent without a bearer; the cookie is the credential.
    async fn refresh(&self) -> Result<String, ExpiryReason> {
        let request = ApiRequest::from_endpoint(&RefreshToken::new())
            .map_err(|e| ExpiryReason::RefreshUnavailable(e.to_string()))?;
        let response = self
            .transport
            .execute(&request, None)
            .await
            .map_err(|e| ExpiryReason::RefreshUnavailable(e.to_string()))?;

        if !response.status.is_success() {
            return Err(ExpiryReason::RefreshRejected(response.status));
        }

        Envelope::<RefreshResponse>::parse(&response.body)
            .map_err(|e| ExpiryReason::RefreshUnavailable(e.to_string()))?
            .data
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or(ExpiryReason::MissingToken)
    }

    pub async fn login(
        &self,
        login: impl Into<String>,
        password: SecretString,
    ) -> Result<LoginResponse, ApiError> {
        let response = self.send(Login::new(login, password)).await?;
        self.storage.store(&response.access_token)?;

        tracing::info!(role = ?response.role, "Logged in");
        self.emit(SessionEvent::Authenticated {
            role: response.role,
        });
        Ok(response)
    }

    pub async fn register(&self, account: NewAccount) -> Result<RegisterResponse, ApiError> {
        let response = self.send(Register::new(account)).await?;
        if let Some(token) = response.access_token.as_deref().filter(|t| !t.is_empty()) {
            self.storage.store(token)?;
            tracing::info!(role = ?response.role, "Registered and logged in");
            self.emit(SessionEvent::Authenticated {
                role: response.role,
            });
        }
        Ok(response)
    }

    /// Ends the session. The local token is cleared even if the backend call fails.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self.send(Logout::new()).await;
        // A token left behind outranks whatever the backend said
        self.storage.clear()?;

        tracing::info!("Logged out");
        self.emit(SessionEvent::LoggedOut);

        result?;
        Ok(())
    }

    fn current_token(&self) -> Option<String> {
        match self.storage.load() {
            Ok(token) => token.filter(|token| !token.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored token");
                None
            }
        }
    }

    fn discard_token(&self) {
        if let Err(e) = self.storage.clear() {
            tracing::warn!(error = %e, "Failed to clear stored token");
        }
    }

    fn expire(&self, reason: ExpiryReason) -> ApiError {
        tracing::warn!(reason = %reason, "Session expired");
        self.discard_token();
        self.emit(SessionEvent::Expired {
            reason: reason.clone(),
        });
        ApiError::AuthExpired { reason }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestBody;
    use crate::{StorageError, TransportError};
    use futures::future::join_all;
    use serde::Deserialize;
    use serde_json::json;
    use std::borrow::Cow;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    enum RefreshScript {
        Issue(&'static str),
        Reject(StatusCode),
        NoToken,
    }

    type Hook = Box<dyn FnOnce() + Send>;

    /// In-memory backend with a scripted refresh endpoint.
    struct Backend {
        accepted: Mutex<Option<String>>,
        refresh: Mutex<RefreshScript>,
        /// The refresh answers only after this many 401s were served.
        hold_refresh_for: AtomicUsize,
        refresh_delay: Option<Duration>,
        reject_all: AtomicBool,
        offline: AtomicBool,
        unauthorized: AtomicUsize,
        refresh_calls: AtomicUsize,
        calls: Mutex<Vec<(String, Option<String>)>>,
        on_unauthorized: Mutex<Option<Hook>>,
    }

    impl Backend {
        fn new(accepted: &str, refresh: RefreshScript) -> Arc<Self> {
            Arc::new(Self {
                accepted: Mutex::new(Some(accepted.to_string())),
                refresh: Mutex::new(refresh),
                hold_refresh_for: AtomicUsize::new(0),
                refresh_delay: None,
                reject_all: AtomicBool::new(false),
                offline: AtomicBool::new(false),
                unauthorized: AtomicUsize::new(0),
                refresh_calls: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
                on_unauthorized: Mutex::new(None),
            })
        }

        fn refresh_calls(&self) -> usize {
            self.refresh_calls.load(Ordering::SeqCst)
        }

        fn data_calls(&self) -> Vec<Option<String>> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(path, _)| !path.starts_with("/auth/"))
                .map(|(_, bearer)| bearer.clone())
                .collect()
        }

        async fn handle(
            &self,
            request: &ApiRequest,
            bearer: Option<&str>,
        ) -> Result<RawResponse, TransportError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(TransportError::new("connection refused"));
            }
            self.calls
                .lock()
                .unwrap()
                .push((request.path.clone(), bearer.map(str::to_owned)));

            match request.path.as_str() {
                "/auth/refresh-token" => Ok(self.handle_refresh(bearer).await),
                "/auth/login" => Ok(self.handle_login(request)),
                "/auth/logout" => Ok(RawResponse::new(StatusCode::OK, r#"{"success":true}"#)),
                "/missing" => Ok(RawResponse::new(
                    StatusCode::NOT_FOUND,
                    r#"{"message":"Not found"}"#,
                )),
                path => {
                    let accepted = self.accepted.lock().unwrap().clone();
                    if !self.reject_all.load(Ordering::SeqCst)
                        && bearer.is_some()
                        && bearer.map(str::to_owned) == accepted
                    {
                        let body = json!({"success": true, "data": {"path": path, "served": bearer}});
                        return Ok(RawResponse::new(StatusCode::OK, body.to_string()));
                    }
                    self.unauthorized.fetch_add(1, Ordering::SeqCst);
                    if let Some(hook) = self.on_unauthorized.lock().unwrap().take() {
                        hook();
                    }
                    Ok(RawResponse::new(
                        StatusCode::UNAUTHORIZED,
                        r#"{"message":"Token expired"}"#,
                    ))
                }
            }
        }

        async fn handle_refresh(&self, bearer: Option<&str>) -> RawResponse {
            assert_eq!(bearer, None, "refresh must not carry a bearer token");
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);

            while self.unauthorized.load(Ordering::SeqCst) < self.hold_refresh_for.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
            if let Some(delay) = self.refresh_delay {
                tokio::time::sleep(delay).await;
            }

            match &*self.refresh.lock().unwrap() {
                RefreshScript::Issue(token) => {
                    *self.accepted.lock().unwrap() = Some(token.to_string());
                    RawResponse::new(StatusCode::OK, json!({"accessToken": token}).to_string())
                }
                RefreshScript::Reject(status) => {
                    RawResponse::new(*status, r#"{"message":"Refresh token expired"}"#)
                }
                RefreshScript::NoToken => RawResponse::new(StatusCode::OK, "{}"),
            }
        }

        fn handle_login(&self, request: &ApiRequest) -> RawResponse {
            let password = match &request.body {
                RequestBody::Json(body) => body["password"].as_str().unwrap_or_default().to_string(),
                _ => String::new(),
            };
            if password != "secret" {
                return RawResponse::new(
                    StatusCode::UNAUTHORIZED,
                    r#"{"message":"Invalid credentials"}"#,
                );
            }
            *self.accepted.lock().unwrap() = Some("T0".to_string());
            RawResponse::new(
                StatusCode::OK,
                r#"{"accessToken":"T0","role":"student"}"#,
            )
        }
    }

    struct FakeTransport {
        backend: Arc<Backend>,
    }

    impl Transport for FakeTransport {
        async fn execute(
            &self,
            request: &ApiRequest,
            bearer: Option<&str>,
        ) -> Result<RawResponse, TransportError> {
            // Let concurrent callers interleave at every round trip
            tokio::task::yield_now().await;
            self.backend.handle(request, bearer).await
        }
    }

    #[derive(Debug, Deserialize)]
    struct Served {
        path: String,
        served: String,
    }

    struct Echo(&'static str);

    impl Endpoint for Echo {
        type Data = ();
        type Response = Served;

        fn endpoint(&self) -> Cow<'_, str> {
            self.0.into()
        }
    }

    fn client_with(
        backend: &Arc<Backend>,
        token: Option<&str>,
    ) -> Client<FakeTransport, Arc<MemoryTokenStore>> {
        let storage = Arc::new(match token {
            Some(token) => MemoryTokenStore::with_token(token),
            None => MemoryTokenStore::new(),
        });
        Client::new(
            FakeTransport {
                backend: backend.clone(),
            },
            storage,
        )
    }

    fn stored(client: &Client<FakeTransport, Arc<MemoryTokenStore>>) -> Option<String> {
        client.storage().load().unwrap()
    }

    async fn within<F: std::future::Future>(future: F) -> F::Output {
        tokio::time::timeout(TEST_TIMEOUT, future)
            .await
            .expect("test timed out")
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let backend = Backend::new("T1", RefreshScript::Issue("T1"));
        backend.hold_refresh_for.store(5, Ordering::SeqCst);
        let client = client_with(&backend, Some("T0"));

        let paths = ["/a", "/b", "/c", "/d", "/e"];
        let results = within(join_all(paths.iter().map(|&path| client.send(Echo(path))))).await;

        for (result, path) in results.into_iter().zip(paths) {
            let served = result.unwrap();
            assert_eq!(served.path, path);
            assert_eq!(served.served, "T1");
        }
        assert_eq!(backend.refresh_calls(), 1);
        assert_eq!(stored(&client).as_deref(), Some("T1"));
        assert_eq!(client.refresh_state(), RefreshState::Idle);
        assert_eq!(client.pending_waiters(), 0);

        let bearers = backend.data_calls();
        assert_eq!(bearers.len(), 10);
        assert_eq!(bearers.iter().filter(|b| b.as_deref() == Some("T0")).count(), 5);
        assert_eq!(bearers.iter().filter(|b| b.as_deref() == Some("T1")).count(), 5);
    }

    #[tokio::test]
    async fn test_rejected_refresh_expires_every_caller() {
        let backend = Backend::new("T1", RefreshScript::Reject(StatusCode::UNAUTHORIZED));
        backend.hold_refresh_for.store(5, Ordering::SeqCst);
        let client = client_with(&backend, Some("T0"));
        let mut events = client.subscribe();

        let results = within(join_all((0..5).map(|_| client.send(Echo("/students"))))).await;

        for result in results {
            match result {
                Err(ApiError::AuthExpired { reason }) => assert_eq!(
                    reason,
                    ExpiryReason::RefreshRejected(StatusCode::UNAUTHORIZED)
                ),
                other => panic!("expected AuthExpired, got {other:?}"),
            }
        }
        assert_eq!(backend.refresh_calls(), 1);
        assert_eq!(stored(&client), None);
        assert_eq!(client.refresh_state(), RefreshState::Idle);
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Expired {
                reason: ExpiryReason::RefreshRejected(StatusCode::UNAUTHORIZED)
            }
        );
        // One terminal event per failed refresh, not per caller
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_second_401_is_not_retried_again() {
        let backend = Backend::new("T1", RefreshScript::Issue("T1"));
        backend.reject_all.store(true, Ordering::SeqCst);
        let client = client_with(&backend, Some("T0"));

        let err = within(client.send(Echo("/events"))).await.unwrap_err();

        assert!(matches!(
            err,
            ApiError::AuthExpired {
                reason: ExpiryReason::RetryExhausted
            }
        ));
        assert_eq!(backend.refresh_calls(), 1);
        assert_eq!(
            backend.data_calls(),
            vec![Some("T0".to_string()), Some("T1".to_string())]
        );
        assert_eq!(stored(&client), None);
    }

    #[tokio::test]
    async fn test_login_401_never_refreshes() {
        let backend = Backend::new("T0", RefreshScript::Issue("T1"));
        let client = client_with(&backend, Some("stale"));

        let err = within(client.login("ivanov", SecretString::from("wrong")))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(err.to_string(), "(401 Unauthorized) Invalid credentials");
        assert_eq!(backend.refresh_calls(), 0);
        assert_eq!(stored(&client), None);
    }

    #[tokio::test]
    async fn test_login_stores_token_and_announces_role() {
        let backend = Backend::new("unused", RefreshScript::Issue("T1"));
        let client = client_with(&backend, None);
        let mut events = client.subscribe();
        assert!(!client.is_authenticated());

        let response = within(client.login("ivanov", SecretString::from("secret")))
            .await
            .unwrap();

        assert_eq!(response.role, Some(Role::Student));
        assert!(client.is_authenticated());
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Authenticated {
                role: Some(Role::Student)
            }
        );

        let served = within(client.send(Echo("/students/profile"))).await.unwrap();
        assert_eq!(served.served, "T0");
        assert_eq!(backend.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_network_error_does_not_refresh() {
        let backend = Backend::new("T1", RefreshScript::Issue("T1"));
        backend.offline.store(true, Ordering::SeqCst);
        let client = client_with(&backend, Some("T0"));

        let err = within(client.send(Echo("/events"))).await.unwrap_err();

        assert!(matches!(err, ApiError::Network(_)));
        assert_eq!(backend.refresh_calls(), 0);
        assert_eq!(stored(&client).as_deref(), Some("T0"));
    }

    #[tokio::test]
    async fn test_non_401_errors_pass_through() {
        let backend = Backend::new("T0", RefreshScript::Issue("T1"));
        let client = client_with(&backend, Some("T0"));

        let err = within(client.send(Echo("/missing"))).await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(backend.refresh_calls(), 0);
        assert_eq!(stored(&client).as_deref(), Some("T0"));
    }

    #[tokio::test]
    async fn test_failed_refresh_does_not_wedge_the_next_one() {
        let backend = Backend::new("T1", RefreshScript::Reject(StatusCode::FORBIDDEN));
        let client = client_with(&backend, Some("T0"));

        let first = within(client.send(Echo("/events"))).await.unwrap_err();
        assert!(first.is_auth_expired());
        assert_eq!(client.refresh_state(), RefreshState::Idle);

        *backend.refresh.lock().unwrap() = RefreshScript::Issue("T2");
        let served = within(client.send(Echo("/events"))).await.unwrap();

        assert_eq!(served.served, "T2");
        assert_eq!(backend.refresh_calls(), 2);
        assert_eq!(stored(&client).as_deref(), Some("T2"));
    }

    #[tokio::test]
    async fn test_refresh_without_token_is_missing_token() {
        let backend = Backend::new("T1", RefreshScript::NoToken);
        let client = client_with(&backend, Some("T0"));

        let err = within(client.send(Echo("/events"))).await.unwrap_err();

        assert!(matches!(
            err,
            ApiError::AuthExpired {
                reason: ExpiryReason::MissingToken
            }
        ));
        assert_eq!(stored(&client), None);
    }

    #[tokio::test]
    async fn test_stale_token_replays_without_refresh() {
        let backend = Backend::new("T1", RefreshScript::Issue("never"));
        let client = client_with(&backend, Some("T0"));

        // Another caller refreshed while this request was in flight
        let storage = client.storage().clone();
        *backend.on_unauthorized.lock().unwrap() = Some(Box::new(move || {
            storage.store("T1").unwrap();
        }));

        let served = within(client.send(Echo("/events"))).await.unwrap();

        assert_eq!(served.served, "T1");
        assert_eq!(backend.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_waiter_rejoins_when_refresh_leader_is_cancelled() {
        let backend = Backend::new("T1", RefreshScript::Issue("T1"));
        backend.hold_refresh_for.store(usize::MAX, Ordering::SeqCst);
        let client = Arc::new(client_with(&backend, Some("T0")));
        let mut events = client.subscribe();

        let leader = tokio::spawn({
            let client = client.clone();
            async move { client.send(Echo("/a")).await }
        });
        within(async {
            while client.refresh_state() != RefreshState::RefreshInFlight {
                tokio::task::yield_now().await;
            }
        })
        .await;

        let waiter = tokio::spawn({
            let client = client.clone();
            async move { client.send(Echo("/b")).await }
        });
        within(async {
            while client.pending_waiters() == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await;

        leader.abort();
        // Only the cancelled leader's refresh was held back
        backend.hold_refresh_for.store(0, Ordering::SeqCst);
        let served = within(waiter).await.unwrap().unwrap();

        assert_eq!(served.path, "/b");
        assert_eq!(served.served, "T1");
        assert_eq!(backend.refresh_calls(), 2);
        assert_eq!(stored(&client).as_deref(), Some("T1"));
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Refreshed);
        assert!(events.try_recv().is_err());
        assert_eq!(client.refresh_state(), RefreshState::Idle);
        assert_eq!(client.pending_waiters(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_refresh_across_threads() {
        let backend = Arc::new(Backend {
            refresh_delay: Some(Duration::from_millis(50)),
            ..Arc::into_inner(Backend::new("T1", RefreshScript::Issue("T1"))).unwrap()
        });
        backend.hold_refresh_for.store(8, Ordering::SeqCst);
        let client = Arc::new(client_with(&backend, Some("T0")));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move { client.send(Echo("/students")).await })
            })
            .collect();

        for task in within(join_all(tasks)).await {
            assert_eq!(task.unwrap().unwrap().served, "T1");
        }
        assert_eq!(backend.refresh_calls(), 1);
        assert_eq!(client.refresh_state(), RefreshState::Idle);
    }

    #[tokio::test]
    async fn test_session_events() {
        let backend = Backend::new("unused", RefreshScript::Issue("T1"));
        let client = client_with(&backend, None);
        let mut events = client.subscribe();

        within(client.login("ivanov", SecretString::from("secret")))
            .await
            .unwrap();
        // The backend rotates its key; the next call needs a refresh
        *backend.accepted.lock().unwrap() = Some("T1".to_string());
        within(client.send(Echo("/events"))).await.unwrap();
        within(client.logout()).await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                SessionEvent::Authenticated {
                    role: Some(Role::Student)
                },
                SessionEvent::Refreshed,
                SessionEvent::LoggedOut,
            ]
        );
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_token_even_when_offline() {
        let backend = Backend::new("T0", RefreshScript::Issue("T1"));
        backend.offline.store(true, Ordering::SeqCst);
        let client = client_with(&backend, Some("T0"));

        let err = within(client.logout()).await.unwrap_err();

        assert!(matches!(err, ApiError::Network(_)));
        assert_eq!(stored(&client), None);
    }

    /// Holds its token and refuses to let go of it.
    struct StuckStore;

    impl TokenStorage for StuckStore {
        fn load(&self) -> Result<Option<String>, StorageError> {
            Ok(Some("T0".to_string()))
        }

        fn store(&self, _token: &str) -> Result<(), StorageError> {
            Ok(())
        }

        fn clear(&self) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("read-only".to_string()))
        }
    }

    #[tokio::test]
    async fn test_logout_reports_token_that_could_not_be_cleared() {
        let backend = Backend::new("T0", RefreshScript::Issue("T1"));
        backend.offline.store(true, Ordering::SeqCst);
        let client = Client::new(
            FakeTransport {
                backend: backend.clone(),
            },
            StuckStore,
        );
        let mut events = client.subscribe();

        let err = within(client.logout()).await.unwrap_err();

        assert!(matches!(err, ApiError::Storage(_)));
        assert!(client.is_authenticated());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_invalid_request_is_not_sent() {
        let backend = Backend::new("T0", RefreshScript::Issue("T1"));
        let client = client_with(&backend, Some("T0"));

        let err = within(client.send(crate::endpoints::students::DeleteStudent::new("")))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert!(backend.calls.lock().unwrap().is_empty());
    }
}
