//! Admin session manager.
//!
//! Owns the admin session lifecycle: restore on start-up, login with a failed
//! attempt lockout, explicit extension, logout, and a background expiry poll
//! that runs only while a session is active.
//!
//! A session is valid while `now - issued_at < session_duration`. After
//! `max_attempts` consecutive rejected logins every attempt is refused until
//! `locked_until`, without contacting the verifier. Logins run one at a
//! time, so concurrent guesses cannot overtake the attempt counter.

pub mod clock;
pub mod store;
pub mod verifier;

use chrono::{DateTime, Duration, Utc};
use rand::distr::{Alphanumeric, SampleString};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::SessionPolicy;
use crate::error::{AuthError, LockoutReason};

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{JsonFileStore, MemorySessionStore, SessionRecord, SessionStore};
pub use verifier::{AdminIdentity, CredentialVerifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Before `init` has read the persisted record.
    Loading,
    Unauthenticated,
    Authenticated,
}

/// Returned by a successful login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSuccess {
    /// Bearer token for admin requests; only its digest is persisted.
    pub token: String,
    pub admin: AdminIdentity,
    pub expires_at: DateTime<Utc>,
}

/// Point-in-time view of the session for status endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub admin: Option<AdminIdentity>,
    pub remaining_ms: i64,
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    identity: Option<AdminIdentity>,
    issued_at: Option<DateTime<Utc>>,
    token_hash: Option<String>,
    failed_attempts: u32,
    locked_until: Option<DateTime<Utc>>,
    watcher: Option<JoinHandle<()>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: SessionState::Loading,
            identity: None,
            issued_at: None,
            token_hash: None,
            failed_attempts: 0,
            locked_until: None,
            watcher: None,
        }
    }

    fn clear_session(&mut self) {
        self.state = SessionState::Unauthenticated;
        self.identity = None;
        self.issued_at = None;
        self.token_hash = None;
    }

    fn record(&self) -> Option<SessionRecord> {
        let identity = self.identity.as_ref()?;
        Some(SessionRecord {
            authenticated: true,
            timestamp: self.issued_at?.timestamp_millis(),
            admin_id: Some(identity.id.clone()),
            username: Some(identity.username.clone()),
            email: Some(identity.email.clone()),
            full_name: Some(identity.full_name.clone()),
            token_hash: self.token_hash.clone(),
        })
    }
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn generate_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 48)
}

/// Whole minutes left until `until`, rounded up.
fn minutes_until(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (until - now).num_milliseconds().max(0);
    (ms + 59_999) / 60_000
}

pub struct SessionManager {
    policy: SessionPolicy,
    store: Arc<dyn SessionStore>,
    verifier: Arc<dyn CredentialVerifier>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
    /// Held for a whole login, remote verification included.
    login_gate: Mutex<()>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(
        policy: SessionPolicy,
        store: Arc<dyn SessionStore>,
        verifier: Arc<dyn CredentialVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new(Self {
            policy,
            store,
            verifier,
            clock,
            inner: Mutex::new(Inner::new()),
            login_gate: Mutex::new(()),
        })
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    fn is_expired(&self, issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - issued_at >= self.policy.session_duration
    }

    async fn persist(&self, inner: &Inner) {
        if let Some(record) = inner.record() {
            if let Err(e) = self.store.save(&record).await {
                tracing::error!(error = %e, "failed to persist admin session");
            }
        }
    }

    async fn clear_persisted(&self) {
        if let Err(e) = self.store.clear().await {
            tracing::error!(error = %e, "failed to clear admin session record");
        }
    }

    /// Read the persisted record and settle into authenticated or
    /// unauthenticated. Expired or unreadable records are removed.
    pub async fn init(self: &Arc<Self>) -> SessionState {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;

        let restored = match self.store.load().await {
            Ok(Some(record)) => {
                let issued_at = record.issued_at();
                match (record.authenticated, record.admin_id.clone(), issued_at) {
                    (true, Some(id), Some(issued_at)) if !self.is_expired(issued_at, now) => {
                        Some((record, id, issued_at))
                    }
                    _ => {
                        tracing::info!("stored admin session expired or incomplete; removing it");
                        None
                    }
                }
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "stored admin session unreadable; removing it");
                None
            }
        };

        match restored {
            Some((record, id, issued_at)) => {
                inner.state = SessionState::Authenticated;
                inner.identity = Some(AdminIdentity {
                    id,
                    username: record.username.unwrap_or_default(),
                    email: record.email.unwrap_or_default(),
                    full_name: record.full_name.unwrap_or_default(),
                });
                inner.issued_at = Some(issued_at);
                inner.token_hash = record.token_hash;
                self.start_watcher(&mut inner);
                tracing::info!("admin session restored");
            }
            None => {
                self.clear_persisted().await;
                inner.clear_session();
            }
        }

        inner.state
    }

    /// Verify credentials remotely and open a session.
    pub async fn login(
        self: &Arc<Self>,
        username: &str,
        password: &str,
    ) -> Result<LoginSuccess, AuthError> {
        let gate = self.login_gate.lock().await;
        {
            let inner = self.inner.lock().await;
            let now = self.clock.now();
            if let Some(until) = inner.locked_until.filter(|until| now < *until) {
                tracing::warn!(username = %username, "login refused: account locked");
                return Err(AuthError::LockedOut {
                    reason: LockoutReason::StillLocked,
                    remaining_minutes: minutes_until(until, now),
                });
            }
        }

        // Only the gate is held across the remote call; `inner` stays free
        // for authorize and the expiry poll.
        let verified = self.verifier.verify(username, password).await.map_err(|e| {
            tracing::error!(error = %e, "admin credential verification failed");
            AuthError::VerificationFailed(e.to_string())
        })?;

        let mut inner = self.inner.lock().await;
        let now = self.clock.now();

        let Some(identity) = verified else {
            inner.failed_attempts += 1;
            if inner.failed_attempts >= self.policy.max_attempts {
                let until = now + self.policy.lockout_duration;
                inner.locked_until = Some(until);
                tracing::warn!(
                    username = %username,
                    attempts = inner.failed_attempts,
                    locked_until = %until,
                    "too many failed logins; locking"
                );
                return Err(AuthError::LockedOut {
                    reason: LockoutReason::AttemptsExhausted,
                    remaining_minutes: minutes_until(until, now),
                });
            }

            tracing::warn!(
                username = %username,
                attempts = inner.failed_attempts,
                "invalid admin credentials"
            );
            return Err(AuthError::InvalidCredentials {
                remaining_attempts: self.policy.max_attempts - inner.failed_attempts,
            });
        };

        let token = generate_token();
        inner.state = SessionState::Authenticated;
        inner.identity = Some(identity.clone());
        inner.issued_at = Some(now);
        inner.token_hash = Some(hash_token(&token));
        inner.failed_attempts = 0;
        inner.locked_until = None;
        self.persist(&inner).await;
        self.start_watcher(&mut inner);
        drop(inner);
        drop(gate);

        tracing::info!(admin = %identity.username, "admin logged in");

        if let Err(e) = self.verifier.record_login(&identity.id).await {
            tracing::warn!(error = %e, "failed to record admin last login");
        }

        Ok(LoginSuccess {
            token,
            admin: identity,
            expires_at: now + self.policy.session_duration,
        })
    }

    /// Drop the session and reset the lockout. Always succeeds.
    ///
    /// Callers outside the session (the HTTP layer) must check the bearer
    /// token first, or anyone could clear a lockout.
    pub async fn logout(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(watcher) = inner.watcher.take() {
            watcher.abort();
        }
        self.logout_locked(&mut inner).await;
    }

    async fn logout_locked(&self, inner: &mut Inner) {
        self.clear_persisted().await;
        inner.clear_session();
        inner.failed_attempts = 0;
        inner.locked_until = None;
        tracing::info!("admin logged out");
    }

    /// Restart the session window. Returns the new expiry, or `None` when no
    /// session is active.
    pub async fn extend_session(&self) -> Option<DateTime<Utc>> {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Authenticated || inner.identity.is_none() {
            return None;
        }
        let now = self.clock.now();
        inner.issued_at = Some(now);
        self.persist(&inner).await;
        tracing::debug!("admin session extended");
        Some(now + self.policy.session_duration)
    }

    /// `max(0, duration - elapsed)`; zero when not authenticated.
    pub async fn time_remaining(&self) -> Duration {
        let inner = self.inner.lock().await;
        self.remaining_locked(&inner)
    }

    fn remaining_locked(&self, inner: &Inner) -> Duration {
        match (inner.state, inner.issued_at) {
            (SessionState::Authenticated, Some(issued_at)) => {
                let elapsed = self.clock.now() - issued_at;
                (self.policy.session_duration - elapsed).max(Duration::zero())
            }
            _ => Duration::zero(),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        SessionSnapshot {
            state: inner.state,
            admin: inner.identity.clone(),
            remaining_ms: self.remaining_locked(&inner).num_milliseconds(),
            failed_attempts: inner.failed_attempts,
            locked_until: inner.locked_until,
        }
    }

    /// Check a bearer token against the active session. An expired session
    /// is logged out on the spot.
    pub async fn authorize(&self, token: &str) -> Result<AdminIdentity, AuthError> {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Authenticated {
            return Err(AuthError::Unauthenticated);
        }

        let now = self.clock.now();
        let expired = inner
            .issued_at
            .map_or(true, |issued| self.is_expired(issued, now));
        if expired {
            if let Some(watcher) = inner.watcher.take() {
                watcher.abort();
            }
            tracing::info!("admin session expired");
            self.logout_locked(&mut inner).await;
            return Err(AuthError::Unauthenticated);
        }

        match (&inner.token_hash, &inner.identity) {
            (Some(expected), Some(identity)) if *expected == hash_token(token) => {
                Ok(identity.clone())
            }
            _ => Err(AuthError::Unauthenticated),
        }
    }

    /// Stop the background expiry poll; persisted state is kept.
    pub async fn teardown(&self) {
        if let Some(watcher) = self.inner.lock().await.watcher.take() {
            watcher.abort();
        }
    }

    /// One poll of the expiry check. Returns `true` once polling should stop.
    async fn expire_if_due(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Authenticated {
            inner.watcher = None;
            return true;
        }

        let now = self.clock.now();
        match inner.issued_at {
            Some(issued) if !self.is_expired(issued, now) => false,
            _ => {
                // Called from the watcher itself: detach instead of aborting.
                inner.watcher = None;
                tracing::info!("admin session expired; logging out");
                self.logout_locked(&mut inner).await;
                true
            }
        }
    }

    fn start_watcher(self: &Arc<Self>, inner: &mut Inner) {
        if let Some(previous) = inner.watcher.take() {
            previous.abort();
        }

        let manager: Weak<Self> = Arc::downgrade(self);
        let period = self.policy.check_interval;
        inner.watcher = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                if manager.expire_if_due().await {
                    break;
                }
            }
        }));
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(watcher) = self.inner.get_mut().watcher.take() {
            watcher.abort();
        }
    }
}
