//! The request dispatcher.
//!
//! # Design
//! `Client` owns its configuration (base URL, token, default auth, hooks)
//! and one shared `ResponseEnvelope`. Every method takes `&self`, so one
//! client can be shared across tasks; state sits behind short-lived
//! `std::sync::RwLock`s that are never held across an `.await`.
//!
//! The shared envelope is overwritten by whichever call finishes last.
//! Concurrent callers that need their own result should use
//! [`Client::exchange`], which returns the call's envelope by value.
//! Configuration changes racing an in-flight call may or may not apply to it.

use std::env;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use serde_json::{json, Value};

use crate::auth::{apply_auth, AuthConfig, AUTHORIZATION};
use crate::env::HOST_ENV_VAR;
use crate::envelope::{is_success, ResponseEnvelope};
use crate::error::{ConfigError, DispatchError, HookError};
use crate::hooks::{fire, HookEvent, HookPayload, HookRegistry};
use crate::http::{has_header, set_header, HttpMethod, HttpRequest, Transport};
use crate::profile::ProfileConfig;
use crate::request::RequestOptions;
use crate::store::{CredentialStore, MemoryStore, TOKEN_KEY};

const CONTENT_TYPE: &str = "Content-Type";
const ABSOLUTE_PREFIXES: [&str; 2] = ["http://", "https://"];

#[derive(Debug, Clone, Default)]
struct ClientState {
    base_url: String,
    token: Option<String>,
    auth: Option<AuthConfig>,
}

/// Read-only copy of a client's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSnapshot {
    pub base_url: String,
    /// Active token, falling back to the credential store.
    pub token: Option<String>,
    pub auth: Option<AuthConfig>,
}

/// Builder for [`Client`].
pub struct ClientBuilder<T> {
    transport: T,
    store: Option<Arc<dyn CredentialStore>>,
    host: Option<String>,
    base_url: String,
}

impl<T: Transport> ClientBuilder<T> {
    /// Credential store used for the persisted token. Defaults to a
    /// [`MemoryStore`].
    pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Host hint for environment inference in `configure_profiles`.
    /// Defaults to the `DISPATCH_HOST` environment variable.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn build(self) -> Client<T> {
        let host = self
            .host
            .or_else(|| env::var(HOST_ENV_VAR).ok())
            .unwrap_or_default();
        Client {
            transport: self.transport,
            store: self.store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
            host,
            state: RwLock::new(ClientState {
                base_url: self.base_url,
                ..ClientState::default()
            }),
            hooks: RwLock::new(HookRegistry::new()),
            envelope: RwLock::new(ResponseEnvelope::default()),
        }
    }
}

/// Reusable HTTP request dispatcher.
pub struct Client<T> {
    transport: T,
    store: Arc<dyn CredentialStore>,
    host: String,
    state: RwLock<ClientState>,
    hooks: RwLock<HookRegistry>,
    envelope: RwLock<ResponseEnvelope>,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Self::builder(transport).build()
    }

    pub fn builder(transport: T) -> ClientBuilder<T> {
        ClientBuilder {
            transport,
            store: None,
            host: None,
            base_url: String::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Select the base URL from a profile map.
    ///
    /// Fails without touching the client when the resolved environment has
    /// no usable URL. A token in `config` is persisted via [`Client::set_token`].
    pub fn configure_profiles(&self, config: ProfileConfig) -> Result<&Self, ConfigError> {
        let (env, base_url) = config.resolve(&self.host)?;
        tracing::debug!(env = %env, base_url = %base_url, "resolved profile");
        write(&self.state).base_url = base_url;
        if let Some(token) = &config.token {
            self.set_token(token);
        }
        Ok(self)
    }

    pub fn configure_base_url(&self, base_url: impl Into<String>) -> &Self {
        write(&self.state).base_url = base_url.into();
        self
    }

    /// Set the active token for this client without persisting it.
    pub fn configure_token(&self, token: impl Into<String>) -> &Self {
        write(&self.state).token = Some(token.into());
        self
    }

    /// Persist `token` in the credential store and make it active.
    pub fn set_token(&self, token: &str) -> &Self {
        self.store.set(TOKEN_KEY, token);
        write(&self.state).token = Some(token.to_string());
        self
    }

    /// Replace the default auth strategy.
    pub fn configure_auth(&self, auth: AuthConfig) -> &Self {
        write(&self.state).auth = Some(auth);
        self
    }

    pub fn on<F>(&self, event: HookEvent, callback: F) -> &Self
    where
        F: Fn(&HookPayload<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        write(&self.hooks).on(event, callback);
        self
    }

    pub fn snapshot(&self) -> ClientSnapshot {
        let state = read(&self.state).clone();
        ClientSnapshot {
            token: state.token.or_else(|| self.store.get(TOKEN_KEY)),
            base_url: state.base_url,
            auth: state.auth,
        }
    }

    /// Active token: configured in memory, else persisted.
    pub fn token(&self) -> Option<String> {
        let token = read(&self.state).token.clone();
        token.or_else(|| self.store.get(TOKEN_KEY))
    }

    /// Absolute URLs pass through; anything else is appended to the base
    /// URL verbatim.
    pub fn resolve_url(&self, path: &str) -> String {
        resolve_against(&read(&self.state).base_url, path)
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Run the request pipeline and return this call's envelope.
    ///
    /// The shared envelope is updated as well, so `ok()` / `data()` reflect
    /// this call unless another one finishes later.
    pub async fn exchange(
        &self,
        options: RequestOptions,
    ) -> Result<ResponseEnvelope, DispatchError> {
        let method = options.method;

        let mut headers = Vec::new();
        if method != HttpMethod::Get {
            set_header(&mut headers, CONTENT_TYPE, "application/json");
        }
        for (name, value) in &options.headers {
            set_header(&mut headers, name, value.clone());
        }

        let caller_authorization = has_header(&options.headers, AUTHORIZATION);
        if !options.skip_token && !caller_authorization {
            if let Some(token) = self.token() {
                set_header(&mut headers, AUTHORIZATION, format!("Bearer {token}"));
            }
        }

        self.trigger(HookEvent::Request, &HookPayload::Request(&options));
        self.trigger(
            HookEvent::for_method(method),
            &HookPayload::Verb {
                method,
                url: &options.path,
                body: options.body.as_ref(),
            },
        );

        let (base_url, default_auth) = {
            let state = read(&self.state);
            (state.base_url.clone(), state.auth.clone())
        };
        let url = resolve_against(&base_url, &options.path);
        let url = apply_auth(
            &mut headers,
            options.auth.as_ref(),
            default_auth.as_ref(),
            &url,
            caller_authorization,
        );

        let body = if method.carries_body() {
            let empty = json!({});
            let value = options.body.as_ref().unwrap_or(&empty);
            let encoded = serde_json::to_string(value)
                .map_err(|e| DispatchError::Serialization(e.to_string()))?;
            Some(encoded)
        } else {
            None
        };

        let request = HttpRequest {
            method,
            url,
            headers,
            credentials: options.credentials.unwrap_or_default(),
            body,
        };

        tracing::debug!(method = %method, path = %options.path, "dispatching request");
        let response = self.transport.send(request).await?;

        let envelope = ResponseEnvelope::from_response(response);
        *write(&self.envelope) = envelope.clone();
        tracing::debug!(
            method = %method,
            path = %options.path,
            status = envelope.status,
            body = ?envelope.body,
            "request completed"
        );

        if let Some(raw) = &envelope.raw {
            self.trigger(HookEvent::Response, &HookPayload::Response(raw));
        }
        let outcome = if is_success(envelope.status) {
            HookEvent::Ok
        } else {
            HookEvent::Error
        };
        self.trigger(outcome, &HookPayload::Outcome(&envelope));

        Ok(envelope)
    }

    /// Run the request pipeline and return the client for chaining.
    ///
    /// Results land in the shared envelope; read them with [`Client::ok`],
    /// [`Client::check`], [`Client::data`] or [`Client::envelope`].
    pub async fn send(&self, options: RequestOptions) -> Result<&Self, DispatchError> {
        self.exchange(options).await?;
        Ok(self)
    }

    pub async fn get(&self, path: &str) -> Result<&Self, DispatchError> {
        self.send(RequestOptions::new(HttpMethod::Get, path)).await
    }

    pub async fn post<B>(&self, path: &str, body: &B) -> Result<&Self, DispatchError>
    where
        B: Serialize + ?Sized,
    {
        self.send(with_body(HttpMethod::Post, path, body)?).await
    }

    pub async fn put<B>(&self, path: &str, body: &B) -> Result<&Self, DispatchError>
    where
        B: Serialize + ?Sized,
    {
        self.send(with_body(HttpMethod::Put, path, body)?).await
    }

    pub async fn patch<B>(&self, path: &str, body: &B) -> Result<&Self, DispatchError>
    where
        B: Serialize + ?Sized,
    {
        self.send(with_body(HttpMethod::Patch, path, body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<&Self, DispatchError> {
        self.send(RequestOptions::new(HttpMethod::Delete, path)).await
    }

    pub async fn head(&self, path: &str) -> Result<&Self, DispatchError> {
        self.send(RequestOptions::new(HttpMethod::Head, path)).await
    }

    pub async fn options(&self, path: &str) -> Result<&Self, DispatchError> {
        self.send(RequestOptions::new(HttpMethod::Options, path)).await
    }

    // -----------------------------------------------------------------------
    // Shared envelope
    // -----------------------------------------------------------------------

    pub fn envelope(&self) -> ResponseEnvelope {
        read(&self.envelope).clone()
    }

    pub fn data(&self) -> Option<Value> {
        read(&self.envelope).data.clone()
    }

    pub fn status(&self) -> u16 {
        read(&self.envelope).status
    }

    /// Last recorded status is in `200..300`.
    pub fn ok(&self) -> bool {
        read(&self.envelope).ok()
    }

    /// `ok()` and the last body parsed as JSON.
    pub fn check(&self) -> bool {
        read(&self.envelope).check()
    }

    fn trigger(&self, event: HookEvent, payload: &HookPayload<'_>) {
        let callbacks = read(&self.hooks).callbacks(event);
        fire(&callbacks, event, payload);
    }
}

fn resolve_against(base_url: &str, path: &str) -> String {
    if is_absolute(path) {
        path.to_string()
    } else {
        format!("{base_url}{path}")
    }
}

fn is_absolute(path: &str) -> bool {
    ABSOLUTE_PREFIXES.iter().any(|prefix| {
        path.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    })
}

fn with_body<B>(method: HttpMethod, path: &str, body: &B) -> Result<RequestOptions, DispatchError>
where
    B: Serialize + ?Sized,
{
    let value =
        serde_json::to_value(body).map_err(|e| DispatchError::Serialization(e.to_string()))?;
    Ok(RequestOptions::new(method, path).body(value))
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::error::TransportError;
    use crate::http::{header_value, Credentials, HttpResponse};

    /// In-memory transport: answers by URL, optionally after a delay, and
    /// records every request it sees.
    #[derive(Default)]
    struct ScriptedTransport {
        routes: HashMap<String, (u16, String, Duration)>,
        fail: bool,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn route(mut self, url: &str, status: u16, body: &str) -> Self {
            self.routes
                .insert(url.to_string(), (status, body.to_string(), Duration::ZERO));
            self
        }

        fn delayed(mut self, url: &str, body: &str, delay: Duration) -> Self {
            self.routes.insert(url.to_string(), (200, body.to_string(), delay));
            self
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn last(&self) -> HttpRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            if self.fail {
                return Err(TransportError::Connection("connection refused".to_string()));
            }
            let (status, body, delay) = self
                .routes
                .get(&request.url)
                .cloned()
                .unwrap_or((200, "{}".to_string(), Duration::ZERO));
            self.seen.lock().unwrap().push(request);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.into_bytes(),
            })
        }
    }

    fn client(transport: ScriptedTransport) -> Client<ScriptedTransport> {
        Client::builder(transport)
            .base_url("https://api.example.com")
            .host("localhost")
            .build()
    }

    fn event_log(client: &Client<ScriptedTransport>) -> Arc<Mutex<Vec<&'static str>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for event in [
            HookEvent::Request,
            HookEvent::Get,
            HookEvent::Post,
            HookEvent::Put,
            HookEvent::Delete,
            HookEvent::Patch,
            HookEvent::Head,
            HookEvent::Options,
            HookEvent::Response,
            HookEvent::Ok,
            HookEvent::Error,
        ] {
            let log = Arc::clone(&log);
            client.on(event, move |_| {
                log.lock().unwrap().push(event.as_str());
                Ok(())
            });
        }
        log
    }

    // --- configuration ---

    #[test]
    fn configure_profiles_uses_host_hint() {
        let client = client(ScriptedTransport::default());
        let config =
            ProfileConfig::new([("dev", "http://localhost:8080"), ("prod", "https://prod")]);
        client.configure_profiles(config).unwrap();
        assert_eq!(client.snapshot().base_url, "http://localhost:8080");
    }

    #[test]
    fn configure_profiles_rejects_unknown_env_and_keeps_base() {
        let client = client(ScriptedTransport::default());
        let config = ProfileConfig::new([("dev", "http://a"), ("prod", "http://b")]).env("staging");
        let err = client.configure_profiles(config).err().unwrap();
        assert!(err.to_string().contains("staging"));
        assert_eq!(client.snapshot().base_url, "https://api.example.com");
    }

    #[test]
    fn configure_profiles_persists_token() {
        let store = Arc::new(MemoryStore::new());
        let client = Client::builder(ScriptedTransport::default())
            .store(store.clone())
            .build();
        let config = ProfileConfig::new([("qa", "https://qa")]).env("qa").token("t-1");
        client.configure_profiles(config).unwrap();
        assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("t-1"));
        assert_eq!(client.token().as_deref(), Some("t-1"));
    }

    #[test]
    fn configure_token_does_not_persist() {
        let store = Arc::new(MemoryStore::new());
        let client = Client::builder(ScriptedTransport::default())
            .store(store.clone())
            .build();
        client.configure_token("mem");
        assert_eq!(client.token().as_deref(), Some("mem"));
        assert_eq!(store.get(TOKEN_KEY), None);
    }

    #[test]
    fn token_falls_back_to_store() {
        let store = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, "persisted");
        let client = Client::builder(ScriptedTransport::default()).store(store).build();
        assert_eq!(client.snapshot().token.as_deref(), Some("persisted"));
    }

    #[test]
    fn configure_auth_replaces_default() {
        let client = client(ScriptedTransport::default());
        client
            .configure_auth(AuthConfig::bearer("a"))
            .configure_auth(AuthConfig::api_key_header("X-Key", "b"));
        assert_eq!(client.snapshot().auth, Some(AuthConfig::api_key_header("X-Key", "b")));
    }

    // --- url resolution ---

    #[test]
    fn relative_paths_are_appended_verbatim() {
        let client = client(ScriptedTransport::default());
        assert_eq!(client.resolve_url("/users"), "https://api.example.com/users");
        client.configure_base_url("https://api.example.com/");
        assert_eq!(client.resolve_url("/users"), "https://api.example.com//users");
    }

    #[test]
    fn absolute_urls_ignore_base() {
        let client = client(ScriptedTransport::default());
        for url in ["https://other.host/x?y=1", "http://other.host", "HTTPS://Other.host"] {
            assert_eq!(client.resolve_url(url), url);
        }
    }

    // --- dispatch ---

    #[tokio::test]
    async fn get_sends_no_body_or_content_type() {
        let client = client(ScriptedTransport::default());
        client.get("/items").await.unwrap();
        let req = client.transport.last();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "https://api.example.com/items");
        assert!(req.body.is_none());
        assert!(header_value(&req.headers, CONTENT_TYPE).is_none());
        assert_eq!(req.credentials, Credentials::SameOrigin);
    }

    #[tokio::test]
    async fn post_serializes_body_as_json() {
        let client = client(ScriptedTransport::default());
        client.post("/items", &json!({"name": "a"})).await.unwrap();
        let req = client.transport.last();
        assert_eq!(header_value(&req.headers, CONTENT_TYPE), Some("application/json"));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "a"}));
    }

    #[tokio::test]
    async fn non_get_without_body_sends_empty_object() {
        let client = client(ScriptedTransport::default());
        client.delete("/items/1").await.unwrap();
        assert_eq!(client.transport.last().body.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn head_sends_content_type_but_no_body() {
        let client = client(ScriptedTransport::default());
        client.head("/items").await.unwrap();
        let req = client.transport.last();
        assert!(req.body.is_none());
        assert!(has_header(&req.headers, CONTENT_TYPE));
    }

    #[tokio::test]
    async fn caller_headers_override_defaults() {
        let client = client(ScriptedTransport::default());
        let options = RequestOptions::new(HttpMethod::Put, "/raw")
            .header("content-type", "text/plain")
            .credentials(Credentials::Include);
        client.send(options).await.unwrap();
        let req = client.transport.last();
        assert_eq!(header_value(&req.headers, CONTENT_TYPE), Some("text/plain"));
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.credentials, Credentials::Include);
    }

    #[tokio::test]
    async fn token_is_injected_as_bearer() {
        let client = client(ScriptedTransport::default());
        client.configure_token("abc").get("/me").await.unwrap();
        assert_eq!(
            header_value(&client.transport.last().headers, AUTHORIZATION),
            Some("Bearer abc")
        );
    }

    #[tokio::test]
    async fn skip_token_suppresses_injection() {
        let client = client(ScriptedTransport::default());
        client.configure_token("abc");
        client.send(RequestOptions::get("/public").skip_token()).await.unwrap();
        assert!(!has_header(&client.transport.last().headers, AUTHORIZATION));
    }

    #[tokio::test]
    async fn caller_authorization_is_never_overwritten() {
        let client = client(ScriptedTransport::default());
        client.configure_token("implicit").configure_auth(AuthConfig::bearer("global"));
        let options = RequestOptions::get("/me").header("authorization", "Token mine");
        client.send(options).await.unwrap();
        let req = client.transport.last();
        assert_eq!(header_value(&req.headers, AUTHORIZATION), Some("Token mine"));
        assert_eq!(req.headers.len(), 1);
    }

    #[tokio::test]
    async fn authorization_api_key_keeps_caller_header() {
        let client = client(ScriptedTransport::default());
        client.configure_auth(AuthConfig::api_key_header("Authorization", "key"));
        let options = RequestOptions::get("/me").header("Authorization", "Custom xyz");
        client.send(options).await.unwrap();
        let req = client.transport.last();
        assert_eq!(header_value(&req.headers, AUTHORIZATION), Some("Custom xyz"));
        assert_eq!(req.headers.len(), 1);

        client.get("/me").await.unwrap();
        assert_eq!(
            header_value(&client.transport.last().headers, AUTHORIZATION),
            Some("key")
        );
    }

    #[tokio::test]
    async fn configured_strategy_replaces_implicit_token() {
        let client = client(ScriptedTransport::default());
        client
            .configure_token("implicit")
            .configure_auth(AuthConfig::basic("u", "p"));
        client.get("/me").await.unwrap();
        assert_eq!(
            header_value(&client.transport.last().headers, AUTHORIZATION),
            Some("Basic dTpw")
        );
    }

    #[tokio::test]
    async fn query_auth_applies_to_resolved_url() {
        let client = client(ScriptedTransport::default());
        client.configure_auth(AuthConfig::api_key_query("key", "a b"));
        client.get("/search?q=x").await.unwrap();
        assert_eq!(
            client.transport.last().url,
            "https://api.example.com/search?q=x&key=a%20b"
        );
        let options = RequestOptions::get("https://third.party/feed")
            .auth(AuthConfig::api_key_query("k", "v"));
        client.send(options).await.unwrap();
        assert_eq!(client.transport.last().url, "https://third.party/feed?k=v");
    }

    #[tokio::test]
    async fn envelope_records_json_body() {
        let transport =
            ScriptedTransport::default().route("https://api.example.com/me", 200, r#"{"id":7}"#);
        let client = client(transport);
        assert!(client.get("/me").await.unwrap().check());
        assert_eq!(client.data(), Some(json!({"id": 7})));
        assert_eq!(client.status(), 200);
    }

    #[tokio::test]
    async fn invalid_json_leaves_ok_untouched() {
        let transport = ScriptedTransport::default().route(
            "https://api.example.com/page",
            200,
            "<html></html>",
        );
        let client = client(transport);
        client.get("/page").await.unwrap();
        assert!(client.ok());
        assert!(!client.check());
        assert!(client.data().is_none());
        assert_eq!(client.envelope().body, crate::envelope::BodyKind::NotJson);
    }

    #[tokio::test]
    async fn error_status_is_not_an_error() {
        let transport = ScriptedTransport::default().route(
            "https://api.example.com/gone",
            404,
            r#"{"error":"nope"}"#,
        );
        let client = client(transport);
        let log = event_log(&client);
        client.get("/gone").await.unwrap();
        assert!(!client.ok());
        assert_eq!(client.status(), 404);
        assert_eq!(*log.lock().unwrap(), vec!["request", "get", "response", "error"]);
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let client = client(ScriptedTransport::failing());
        let log = event_log(&client);
        let err = client.get("/x").await.err().unwrap();
        assert!(matches!(err, DispatchError::Transport(TransportError::Connection(_))));
        assert_eq!(client.status(), 0);
        assert_eq!(*log.lock().unwrap(), vec!["request", "get"]);
    }

    // --- hooks ---

    #[tokio::test]
    async fn successful_post_fires_hooks_in_order() {
        let client = client(ScriptedTransport::default());
        let log = event_log(&client);
        client.post("/items", &json!({"a": 1})).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["request", "post", "response", "ok"]);
    }

    #[tokio::test]
    async fn hook_payloads_carry_call_details() {
        let transport = ScriptedTransport::default().route(
            "https://api.example.com/items",
            201,
            r#"{"id":1}"#,
        );
        let client = client(transport);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        client.on(HookEvent::Post, move |payload| {
            if let HookPayload::Verb { url, body, .. } = payload {
                s.lock().unwrap().push(format!("{url} {}", body.cloned().unwrap_or_default()));
            }
            Ok(())
        });
        let s = Arc::clone(&seen);
        client.on(HookEvent::Ok, move |payload| {
            if let HookPayload::Outcome(env) = payload {
                s.lock().unwrap().push(format!("status {}", env.status));
            }
            Ok(())
        });
        client.post("/items", &json!({"a": 1})).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![r#"/items {"a":1}"#, "status 201"]);
    }

    #[tokio::test]
    async fn failing_hooks_do_not_abort_request() {
        let client = client(ScriptedTransport::default());
        client.on(HookEvent::Request, |_| Err("broken observer".into()));
        client.on(HookEvent::Response, |_| panic!("observer panicked"));
        let log = event_log(&client);
        client.get("/x").await.unwrap();
        assert!(client.ok());
        assert_eq!(*log.lock().unwrap(), vec!["request", "get", "response", "ok"]);
    }

    #[tokio::test]
    async fn hooks_may_register_hooks() {
        let client = Arc::new(client(ScriptedTransport::default()));
        let count = Arc::new(Mutex::new(0));
        let inner = Arc::clone(&client);
        let c = Arc::clone(&count);
        client.on(HookEvent::Ok, move |_| {
            let c = Arc::clone(&c);
            inner.on(HookEvent::Ok, move |_| {
                *c.lock().unwrap() += 1;
                Ok(())
            });
            Ok(())
        });
        client.get("/a").await.unwrap();
        assert_eq!(*count.lock().unwrap(), 0);
        client.get("/b").await.unwrap();
        assert_eq!(*count.lock().unwrap(), 1);
    }

    // --- shared envelope race ---

    #[tokio::test]
    async fn envelope_holds_last_completed_call() {
        let transport = ScriptedTransport::default()
            .delayed(
                "https://api.example.com/slow",
                r#"{"call":"slow"}"#,
                Duration::from_millis(60),
            )
            .delayed(
                "https://api.example.com/fast",
                r#"{"call":"fast"}"#,
                Duration::from_millis(5),
            );
        let client = client(transport);

        let (slow, fast) = tokio::join!(
            client.exchange(RequestOptions::get("/slow")),
            client.exchange(RequestOptions::get("/fast"))
        );
        assert_eq!(slow.unwrap().data, Some(json!({"call": "slow"})));
        assert_eq!(fast.unwrap().data, Some(json!({"call": "fast"})));
        assert_eq!(client.data(), Some(json!({"call": "slow"})));

        let (fast, slow) = tokio::join!(
            client.exchange(RequestOptions::get("/fast")),
            client.exchange(RequestOptions::get("/slow"))
        );
        assert!(fast.is_ok() && slow.is_ok());
        assert_eq!(client.data(), Some(json!({"call": "slow"})));
    }
}
