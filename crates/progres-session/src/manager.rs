//! The client session state machine.
//!
//! A [`SessionManager`] holds the current access token and renews it
//! through the gateway's `refresh_token` cookie:
//!
//! - proactively, when a request is about to be sent with an expired token
//! - reactively, when the gateway answers `401`
//! - in the background, shortly before the token expires
//!
//! Only one refresh is ever in flight. Callers that ask for a refresh while
//! one is running wait for it and receive its outcome. A refresh that fails
//! where the user cannot recover ends the session (force logout).
//!
//! Every login and logout starts a new session epoch. A refresh or renewal
//! that began under an older epoch is discarded when it completes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use chrono::Utc;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SessionError};
use crate::store::{PersistedSession, TokenStore};
use crate::token::{self, MIN_RENEWAL_DELAY_SECS, RENEWAL_LEAD_SECS};

pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Gateway API root, e.g. `http://localhost:8080/api`.
    pub base_url: String,
    pub timeout: Duration,
    pub renewal_lead: Duration,
    pub min_renewal_delay: Duration,
}

impl SessionConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            renewal_lead: Duration::from_secs(RENEWAL_LEAD_SECS as u64),
            min_renewal_delay: Duration::from_secs(MIN_RENEWAL_DELAY_SECS as u64),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: Option<String>,
    /// `exp` of the access token, Unix seconds.
    pub expires_at: Option<i64>,
    pub uuid: Option<String>,
    pub student_data: Option<Value>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    fn set_token(&mut self, token: String) {
        self.expires_at = token::decode_expiry(&token);
        self.access_token = Some(token);
    }
}

#[derive(Debug, Deserialize)]
struct TokenReply {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    uuid: Option<String>,
}

struct Inner {
    http: Client,
    jar: Arc<Jar>,
    config: SessionConfig,
    auth_url: Url,
    session: RwLock<Session>,
    store: Arc<dyn TokenStore>,
    refresh_lock: tokio::sync::Mutex<()>,
    refresh_generation: AtomicU64,
    session_epoch: AtomicU64,
    last_refresh: Mutex<Option<String>>,
    renewal: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.renewal.get_mut().ok().and_then(Option::take) {
            handle.abort();
        }
    }
}

/// Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.inner.config.base_url)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

/// Extracts a human-readable message from an error body.
pub(crate) fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .find(|message| !message.trim().is_empty())
        .map(str::to_string)
}

impl SessionManager {
    pub fn new(base_url: impl Into<String>, store: Arc<dyn TokenStore>) -> Result<Self> {
        Self::with_config(SessionConfig::new(base_url), store)
    }

    pub fn with_config(config: SessionConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(config.timeout)
            .build()?;
        let auth_url = Url::parse(&format!("{}/auth/", config.base_url))
            .map_err(|e| SessionError::InvalidResponse(format!("invalid API URL: {e}")))?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                jar,
                config,
                auth_url,
                session: RwLock::new(Session::default()),
                store,
                refresh_lock: tokio::sync::Mutex::new(()),
                refresh_generation: AtomicU64::new(0),
                session_epoch: AtomicU64::new(0),
                last_refresh: Mutex::new(None),
                renewal: Mutex::new(None),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.config.base_url, path)
    }

    pub fn session(&self) -> Session {
        self.inner
            .session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    pub fn token(&self) -> Option<String> {
        self.session().access_token
    }

    pub fn is_renewal_scheduled(&self) -> bool {
        let renewal = self.inner.renewal.lock().unwrap_or_else(|e| e.into_inner());
        renewal.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    fn epoch(&self) -> u64 {
        self.inner.session_epoch.load(Ordering::SeqCst)
    }

    fn update_session(&self, f: impl FnOnce(&mut Session)) {
        let mut session = self
            .inner
            .session
            .write()
            .unwrap_or_else(|e| e.into_inner());
        f(&mut session);
    }

    /// Applies `f` and persists the result, unless the session epoch has
    /// moved past `epoch`. Returns whether the update was applied.
    fn commit(&self, epoch: u64, f: impl FnOnce(&mut Session)) -> bool {
        let mut session = self
            .inner
            .session
            .write()
            .unwrap_or_else(|e| e.into_inner());
        if self.epoch() != epoch {
            return false;
        }
        f(&mut session);
        self.save(&session);
        true
    }

    /// Starts a new epoch with the session built by `f`. Returns the epoch.
    fn begin_session(&self, f: impl FnOnce(&mut Session)) -> u64 {
        let mut session = self
            .inner
            .session
            .write()
            .unwrap_or_else(|e| e.into_inner());
        let epoch = self.inner.session_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *session = Session::default();
        f(&mut session);
        self.save(&session);
        epoch
    }

    fn refresh_cookie(&self) -> Option<String> {
        let header = self.inner.jar.cookies(&self.inner.auth_url)?;
        let header = header.to_str().ok()?;
        header
            .split(';')
            .map(str::trim)
            .find(|pair| pair.starts_with(&format!("{REFRESH_COOKIE}=")))
            .map(str::to_string)
    }

    fn drop_refresh_cookie(&self) {
        let path = self.inner.auth_url.path().trim_end_matches('/');
        self.inner.jar.add_cookie_str(
            &format!("{REFRESH_COOKIE}=; Max-Age=0; Path={path}"),
            &self.inner.auth_url,
        );
    }

    fn restore_refresh_cookie(&self, cookie: &str) {
        let path = self.inner.auth_url.path().trim_end_matches('/');
        self.inner
            .jar
            .add_cookie_str(&format!("{cookie}; Path={path}"), &self.inner.auth_url);
    }

    fn save(&self, session: &Session) {
        let persisted = PersistedSession {
            token: session.access_token.clone(),
            uuid: session.uuid.clone(),
            student_data: session.student_data.clone(),
            refresh_cookie: self.refresh_cookie(),
        };
        if let Err(e) = self.inner.store.save(&persisted) {
            warn!(error = %e, "Failed to persist session");
        }
    }

    /// Ends the current epoch: pending refreshes can no longer commit.
    fn clear_state(&self) {
        {
            let mut session = self
                .inner
                .session
                .write()
                .unwrap_or_else(|e| e.into_inner());
            self.inner.session_epoch.fetch_add(1, Ordering::SeqCst);
            *session = Session::default();
            if let Err(e) = self.inner.store.clear() {
                warn!(error = %e, "Failed to clear stored session");
            }
        }
        self.drop_refresh_cookie();
        self.cancel_renewal();
    }

    /// Restores a persisted session. Returns whether the manager ended up
    /// authenticated.
    #[instrument(skip(self))]
    pub async fn init(&self) -> Result<bool> {
        let persisted = match self.inner.store.load() {
            Ok(Some(persisted)) => persisted,
            Ok(None) => return Ok(false),
            Err(e) => {
                warn!(error = %e, "Stored session unreadable, starting logged out");
                return Ok(false);
            }
        };

        if let Some(cookie) = persisted.refresh_cookie.as_deref() {
            self.restore_refresh_cookie(cookie);
        }

        let (Some(token), Some(student_data)) = (persisted.token, persisted.student_data) else {
            return Ok(false);
        };

        let now = Utc::now().timestamp();
        if !token::is_expired(&token, now) {
            self.update_session(|session| {
                session.set_token(token.clone());
                session.uuid = persisted.uuid;
                session.student_data = Some(student_data);
            });
            self.schedule_renewal(&token);
            info!("Session restored");
            return Ok(true);
        }

        debug!("Stored token expired, refreshing");
        let epoch = self.epoch();
        self.update_session(|session| {
            session.uuid = persisted.uuid;
            session.student_data = Some(student_data);
        });
        match self.refresh().await {
            Some(token) => {
                self.schedule_renewal_for(epoch, &token);
                info!("Session restored after refresh");
                Ok(true)
            }
            None => {
                self.clear_state();
                Ok(false)
            }
        }
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let response = self
            .inner
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message =
                server_message(&body).unwrap_or_else(|| format!("Login failed: {}", status.as_u16()));
            return Err(SessionError::Api { status, message });
        }

        let reply: TokenReply = serde_json::from_str(&body)?;
        let (Some(token), Some(uuid)) = (reply.token, reply.uuid) else {
            return Err(SessionError::InvalidResponse(
                "Login response is missing token or uuid".to_string(),
            ));
        };

        let response = self
            .inner
            .http
            .get(self.url("/student/data"))
            .bearer_auth(&token)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = server_message(&body)
                .unwrap_or_else(|| format!("Failed to fetch student data: {}", status.as_u16()));
            return Err(SessionError::Api { status, message });
        }
        let student_data: Value = if body.trim().is_empty() {
            Value::Array(Vec::new())
        } else {
            serde_json::from_str(&body)?
        };

        let epoch = self.begin_session(|session| {
            session.set_token(token.clone());
            session.uuid = Some(uuid);
            session.student_data = Some(student_data);
        });
        self.schedule_renewal_for(epoch, &token);
        info!("Logged in");

        Ok(self.session())
    }

    async fn request_refresh(&self, epoch: u64) -> Option<String> {
        let response = match self.inner.http.post(self.url("/auth/refresh")).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "Token refresh rejected");
            return None;
        }

        let reply: TokenReply = match response.json().await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Token refresh response unreadable");
                return None;
            }
        };
        let token = reply.token?;

        let committed = self.commit(epoch, |session| {
            session.set_token(token.clone());
            if reply.uuid.is_some() {
                session.uuid = reply.uuid;
            }
        });
        if !committed {
            debug!("Session ended while refreshing, discarding token");
            if !self.is_authenticated() {
                self.drop_refresh_cookie();
            }
            return None;
        }
        Some(token)
    }

    /// Exchanges the refresh cookie for a new access token.
    ///
    /// Concurrent callers share one request. Returns `None` when the
    /// gateway refuses the refresh, or when the session is logged out or
    /// replaced before the refresh completes.
    pub async fn refresh(&self) -> Option<String> {
        let epoch = self.epoch();
        let observed = self.inner.refresh_generation.load(Ordering::SeqCst);
        let _guard = self.inner.refresh_lock.lock().await;

        if self.epoch() != epoch {
            return None;
        }
        if self.inner.refresh_generation.load(Ordering::SeqCst) != observed {
            let last = self.inner.last_refresh.lock().unwrap_or_else(|e| e.into_inner());
            return last.clone();
        }

        let outcome = self.request_refresh(epoch).await;
        if self.epoch() != epoch {
            // Not shared: callers from a newer session run their own refresh.
            return None;
        }
        *self.inner.last_refresh.lock().unwrap_or_else(|e| e.into_inner()) = outcome.clone();
        self.inner.refresh_generation.fetch_add(1, Ordering::SeqCst);

        debug!(success = outcome.is_some(), "Token refresh completed");
        outcome
    }

    fn cancel_renewal(&self) {
        let mut renewal = self.inner.renewal.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = renewal.take() {
            handle.abort();
        }
    }

    /// Schedules the background renewal of `token`, replacing any pending one.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule_renewal(&self, token: &str) {
        self.schedule_renewal_for(self.epoch(), token);
    }

    fn schedule_renewal_for(&self, epoch: u64, token: &str) {
        let delay = token::renewal_delay_with(
            token,
            Utc::now().timestamp(),
            self.inner.config.renewal_lead,
            self.inner.config.min_renewal_delay,
        );
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // Detached so that rescheduling cannot cancel a refresh mid-flight.
            tokio::spawn(async move {
                SessionManager { inner }.renew().await;
            });
        });

        let mut renewal = self.inner.renewal.lock().unwrap_or_else(|e| e.into_inner());
        if self.epoch() != epoch {
            handle.abort();
            return;
        }
        if let Some(previous) = renewal.replace(handle) {
            previous.abort();
        }
        debug!(delay_secs = delay.as_secs(), "Token renewal scheduled");
    }

    async fn renew(&self) {
        let epoch = self.epoch();
        if !self.is_authenticated() {
            return;
        }
        match self.refresh().await {
            Some(token) => self.schedule_renewal_for(epoch, &token),
            None if self.epoch() == epoch => {
                warn!("Background token renewal failed, logging out");
                self.force_logout();
            }
            None => debug!("Session changed during background renewal"),
        }
    }

    /// Ends the session after a refresh failure, unless it was already
    /// replaced since `epoch`.
    fn expire(&self, epoch: u64) -> SessionError {
        if self.epoch() == epoch {
            self.force_logout();
        }
        SessionError::SessionExpired
    }

    /// Ends the session locally without contacting the gateway.
    pub fn force_logout(&self) {
        self.clear_state();
        info!("Session cleared");
    }

    /// Revokes the session on the gateway (best effort) and clears it locally.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.cancel_renewal();

        let mut request = self.inner.http.post(self.url("/auth/logout"));
        if let Some(token) = self.token() {
            request = request.bearer_auth(token);
        }
        match request.send().await {
            Ok(response) if response.status().is_success() => debug!("Gateway session revoked"),
            Ok(response) => debug!(status = response.status().as_u16(), "Logout rejected"),
            Err(e) => debug!(error = %e, "Logout request failed"),
        }

        self.clear_state();
        info!("Logged out");
    }

    async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
        token: &str,
    ) -> Result<Response> {
        let mut request = self
            .inner
            .http
            .request(method.clone(), self.url(path))
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Sends an authenticated request to `path` (relative to the API root).
    ///
    /// # Errors
    ///
    /// [`SessionError::SessionExpired`] when the token could not be renewed.
    /// The session is cleared in that case.
    #[instrument(skip(self, body))]
    pub async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response> {
        let epoch = self.epoch();
        let mut token = self.token().ok_or(SessionError::NotAuthenticated)?;

        if token::is_expired(&token, Utc::now().timestamp()) {
            debug!("Access token expired, refreshing before request");
            token = match self.refresh().await {
                Some(token) => {
                    self.schedule_renewal_for(epoch, &token);
                    token
                }
                None => return Err(self.expire(epoch)),
            };
        }

        let response = self.dispatch(&method, path, body, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("Gateway answered 401, refreshing and retrying once");
        match self.refresh().await {
            Some(token) => {
                self.schedule_renewal_for(epoch, &token);
                self.dispatch(&method, path, body, &token).await
            }
            None => Err(self.expire(epoch)),
        }
    }
}
