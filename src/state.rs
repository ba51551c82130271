use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::api::ApiClient;
use crate::auth::{CookieJar, Session, SessionManager};
use crate::config::Config;
use crate::error::ClientResult;
use crate::navigation::Router;
use crate::votes::{VoteBoard, VoteCache};

pub type DbPool = Pool<SqliteConnectionManager>;

/// Everything a command needs, wired once at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub router: Arc<Router>,
    pub session: Arc<Session>,
    pub api: Arc<ApiClient>,
    pub votes: Arc<VoteBoard>,
}

impl AppState {
    /// `db` must already be migrated.
    pub fn build(config: Config, db: DbPool) -> ClientResult<Self> {
        let router = Arc::new(Router::default());
        let session = Arc::new(Session::new(
            CookieJar::new(db.clone()),
            router.clone(),
            config.auth.clone(),
        ));
        let api = Arc::new(ApiClient::new(&config.api, session.clone())?);
        let votes = Arc::new(VoteBoard::new(VoteCache::new(db.clone())));

        Ok(Self {
            db,
            config,
            router,
            session,
            api,
            votes,
        })
    }

    pub fn sessions(&self) -> SessionManager {
        SessionManager::new(self.api.clone())
    }
}
