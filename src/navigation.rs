use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use crate::auth::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Dashboard,
    Communities,
    Community(String),
    Post(String),
    Projects,
    Project(String),
    Feed,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/auth/login".to_string(),
            Route::Register => "/auth/register".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Communities => "/communities".to_string(),
            Route::Community(slug) => format!("/communities/{slug}"),
            Route::Post(id) => format!("/posts/{id}"),
            Route::Projects => "/projects".to_string(),
            Route::Project(id) => format!("/projects/{id}"),
            Route::Feed => "/feed".to_string(),
        }
    }

    /// Login and registration pages.
    pub fn is_auth_route(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Home | Route::Login | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.trim_matches('/').split('/').collect();
        let route = match segments.as_slice() {
            [""] => Route::Home,
            ["auth", "login"] => Route::Login,
            ["auth", "register"] => Route::Register,
            ["dashboard"] => Route::Dashboard,
            ["communities"] => Route::Communities,
            ["communities", slug] => Route::Community(slug.to_string()),
            ["posts", id] => Route::Post(id.to_string()),
            ["projects"] => Route::Projects,
            ["projects", id] => Route::Project(id.to_string()),
            ["feed"] => Route::Feed,
            _ => return Err(format!("unknown route: {s}")),
        };
        Ok(route)
    }
}

struct RouterState {
    current: Route,
    history: Vec<Route>,
}

/// Tracks the current route and every navigation made.
pub struct Router {
    state: Mutex<RouterState>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Route::Home)
    }
}

impl Router {
    pub fn new(start: Route) -> Self {
        Self {
            state: Mutex::new(RouterState {
                current: start.clone(),
                history: vec![start],
            }),
        }
    }

    pub fn current(&self) -> Route {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .current
            .clone()
    }

    pub fn history(&self) -> Vec<Route> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .history
            .clone()
    }

    /// Navigate without any guard.
    pub fn redirect(&self, route: Route) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.current != route {
            tracing::debug!("Navigating {} -> {}", state.current, route);
        }
        state.current = route.clone();
        state.history.push(route);
    }

    /// Navigate to `route`, applying the session guard. Returns where the
    /// user actually landed.
    pub fn visit(&self, route: Route, session: &Session) -> Route {
        let target = if route.is_protected() && !session.is_authenticated() {
            tracing::info!("{} requires a session, redirecting to login", route);
            Route::Login
        } else if route.is_auth_route() && session.is_authenticated() {
            Route::Dashboard
        } else {
            route
        };
        self.redirect(target.clone());
        target
    }
}
