use std::sync::{Arc, RwLock};

use crate::auth::cookies::CookieJar;
use crate::config::AuthConfig;
use crate::error::ClientResult;
use crate::models::{TokenPair, User};
use crate::navigation::{Route, Router};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    Authenticated(User),
    Anonymous,
}

struct SessionInner {
    phase: SessionPhase,
    access_token: Option<String>,
}

/// The explicit session context shared by the HTTP client, the session
/// manager and the presentation layer.
pub struct Session {
    jar: CookieJar,
    router: Arc<Router>,
    policy: AuthConfig,
    inner: RwLock<SessionInner>,
}

impl Session {
    /// Start a session in `Loading`, picking up any stored access token.
    pub fn new(jar: CookieJar, router: Arc<Router>, policy: AuthConfig) -> Self {
        let access_token = match jar.get(&policy.access_cookie) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Could not read stored access token: {}", e);
                None
            }
        };

        Self {
            jar,
            router,
            policy,
            inner: RwLock::new(SessionInner {
                phase: SessionPhase::Loading,
                access_token,
            }),
        }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .phase
            .clone()
    }

    pub fn current_user(&self) -> Option<User> {
        match self.phase() {
            SessionPhase::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.phase(), SessionPhase::Authenticated(_))
    }

    /// Token attached as `Authorization: Bearer` to outgoing requests.
    pub fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .access_token
            .clone()
    }

    pub fn refresh_token(&self) -> ClientResult<Option<String>> {
        self.jar.get(&self.policy.refresh_cookie)
    }

    /// Persist a freshly issued token pair and start sending it.
    pub fn store_tokens(&self, tokens: &TokenPair) -> ClientResult<()> {
        self.jar.set_hours(
            &self.policy.access_cookie,
            &tokens.access,
            self.policy.access_ttl_hours,
        )?;
        if let Some(ref refresh) = tokens.refresh {
            self.jar.set_hours(
                &self.policy.refresh_cookie,
                refresh,
                self.policy.refresh_ttl_hours,
            )?;
        }

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.access_token = Some(tokens.access.clone());
        Ok(())
    }

    pub fn authenticate(&self, user: User) {
        tracing::info!("Signed in as {}", user.username);
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.phase = SessionPhase::Authenticated(user);
    }

    pub fn mark_anonymous(&self) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.phase = SessionPhase::Anonymous;
    }

    /// Clear stored tokens and the request header; the session becomes
    /// anonymous. Terminal until the next login.
    pub fn teardown(&self) {
        for name in [&self.policy.access_cookie, &self.policy.refresh_cookie] {
            if let Err(e) = self.jar.remove(name) {
                tracing::error!("Failed to clear cookie {}: {}", name, e);
            }
        }

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.access_token = None;
        inner.phase = SessionPhase::Anonymous;
    }

    /// Teardown after the server rejected our credentials.
    pub fn expire(&self) {
        tracing::warn!("Session rejected by server, signing out");
        self.teardown();
        self.router.redirect(Route::Login);
    }
}
