use serde_json::Value;

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::forms::{LoginForm, RegisterForm};
use crate::models::{LoginResponse, User};
use crate::normalize;

impl ApiClient {
    /// `POST /api/v1/auth/register/`
    pub async fn register(&self, form: &RegisterForm) -> ClientResult<()> {
        let _: Value = self.post("api/v1/auth/register/", form).await?;
        Ok(())
    }

    /// `POST /api/v1/auth/login/`
    pub async fn login(&self, form: &LoginForm) -> ClientResult<LoginResponse> {
        let value: Value = self.post("api/v1/auth/login/", form).await?;
        let tokens = normalize::token_pair(&value).ok_or_else(|| {
            ClientError::InvalidResponse("login response did not contain an access token".into())
        })?;
        Ok(LoginResponse {
            tokens,
            user: normalize::embedded_user(&value),
        })
    }

    /// `GET /api/v1/auth/user/`
    pub async fn current_user(&self) -> ClientResult<User> {
        let value: Value = self.get("api/v1/auth/user/").await?;
        Ok(serde_json::from_value(normalize::unwrap_entity(value, "user"))?)
    }
}
