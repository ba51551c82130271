use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::auth::session::Session;
use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult};

const AUTH_PATHS: &[&str] = &["api/v1/auth/login/", "api/v1/auth/register/"];

/// HTTP wrapper shared by every service module. Attaches the session's
/// bearer token and turns non-2xx responses into [`ClientError`]s; a `401`
/// outside the login/register flow tears the session down.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: Arc<Session>) -> ClientResult<Self> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        let mut builder = self.http.request(method, self.endpoint(path)?);
        if let Some(token) = self.session.access_token() {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        Ok(builder)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.send(path, self.request(Method::GET, path)?).await?;
        Ok(response.json().await?)
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> ClientResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, path)?.query(query);
        let response = self.send(path, builder).await?;
        Ok(response.json().await?)
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::POST, path)?.json(body);
        let response = self.send(path, builder).await?;
        Self::json_or_null(response).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::PUT, path)?.json(body);
        let response = self.send(path, builder).await?;
        Self::json_or_null(response).await
    }

    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        self.send(path, self.request(Method::DELETE, path)?).await?;
        Ok(())
    }

    // ---- private helpers ----

    /// Decode a body that may legitimately be empty (`201`/`204` with no
    /// content decode as JSON `null`).
    async fn json_or_null<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send(&self, path: &str, builder: RequestBuilder) -> ClientResult<Response> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!("Request to {} failed: {}", path, e);
            ClientError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);

        if status == StatusCode::UNAUTHORIZED && !self.on_auth_flow(path) {
            self.session.expire();
            return Err(ClientError::Unauthorized);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }

        tracing::debug!("{} returned {}: {}", path, status, message);
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// A 401 during login or registration is a wrong-credentials answer, not
    /// an expired session.
    fn on_auth_flow(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        self.session.router().current().is_auth_route() || AUTH_PATHS.contains(&path)
    }
}

/// Pull a human-readable message out of an error body.
///
/// Looks at `message`, `detail` and `error`, then at field-error maps such as
/// `{"email": ["already registered"]}`.
pub fn error_message(status: StatusCode, body: &str) -> String {
    let fallback = || format!("Request failed with status {}", status.as_u16());

    let Ok(value) = serde_json::from_str::<Value>(body) else {
        let trimmed = body.trim();
        return if trimmed.is_empty() || trimmed.starts_with('<') {
            fallback()
        } else {
            trimmed.to_string()
        };
    };

    for key in ["message", "detail", "error"] {
        match value.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(Value::Object(inner)) => {
                if let Some(Value::String(s)) = inner.get("message") {
                    return s.clone();
                }
            }
            _ => {}
        }
    }

    if let Value::Object(map) = &value {
        let field_errors: Vec<String> = map
            .iter()
            .filter_map(|(field, v)| {
                let text = match v {
                    Value::Array(items) => items.first()?.as_str()?.to_string(),
                    Value::String(s) => s.clone(),
                    _ => return None,
                };
                Some(format!("{field}: {text}"))
            })
            .collect();
        if !field_errors.is_empty() {
            return field_errors.join("; ");
        }
    }

    fallback()
}
