use std::sync::Arc;

use crate::api::ApiClient;
use crate::auth::session::{Session, SessionPhase};
use crate::error::ClientResult;
use crate::forms::{LoginForm, RegisterForm};
use crate::models::User;
use crate::navigation::Route;

/// Drives the session state machine: `Loading → {Authenticated, Anonymous}`.
pub struct SessionManager {
    api: Arc<ApiClient>,
}

impl SessionManager {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    fn session(&self) -> &Arc<Session> {
        self.api.session()
    }

    /// Restore a stored session on startup.
    pub async fn init(&self) -> SessionPhase {
        let session = self.session();
        if session.access_token().is_none() {
            session.mark_anonymous();
            return session.phase();
        }

        match self.api.current_user().await {
            Ok(user) => session.authenticate(user),
            Err(e) => {
                tracing::info!("Stored session could not be restored: {}", e);
                session.teardown();
            }
        }
        session.phase()
    }

    /// Authenticate, persist the token pair and land on the dashboard.
    pub async fn login(&self, form: &LoginForm) -> ClientResult<User> {
        form.validate()?;

        let response = self.api.login(form).await?;
        let session = self.session();
        session.store_tokens(&response.tokens)?;

        let user = match response.user {
            Some(user) => user,
            None => self.api.current_user().await?,
        };
        session.authenticate(user.clone());
        session.router().redirect(Route::Dashboard);
        Ok(user)
    }

    /// Create an account. Does not sign in; sends the user to the login page.
    pub async fn register(&self, form: &RegisterForm) -> ClientResult<()> {
        form.validate()?;
        self.api.register(form).await?;
        tracing::info!("Registered {}", form.username.trim());
        self.session().router().redirect(Route::Login);
        Ok(())
    }

    pub fn logout(&self) {
        let session = self.session();
        session.teardown();
        session.router().redirect(Route::Login);
    }
}
