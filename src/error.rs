use crate::forms::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::InvalidResponse(e.to_string())
        } else {
            ClientError::Network(e)
        }
    }
}

impl From<ValidationErrors> for ClientError {
    fn from(e: ValidationErrors) -> Self {
        ClientError::Validation(e)
    }
}

impl ClientError {
    /// Text shown next to the form or action that triggered the failure.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(errors) => errors.to_string(),
            ClientError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            ClientError::NotFound => "Not found".to_string(),
            ClientError::Api { message, .. } => message.clone(),
            ClientError::Timeout | ClientError::Network(_) => {
                "Could not reach the server. Please try again.".to_string()
            }
            ClientError::InvalidResponse(e) => {
                tracing::error!("Invalid response: {}", e);
                "The server sent an unexpected response.".to_string()
            }
            ClientError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Something went wrong".to_string()
            }
            ClientError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                "Something went wrong".to_string()
            }
            ClientError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                "Something went wrong".to_string()
            }
            ClientError::Url(e) => {
                tracing::error!("URL error: {}", e);
                "Something went wrong".to_string()
            }
            ClientError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Something went wrong".to_string()
            }
        }
    }

    /// Authentication failures cannot be recovered locally.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
