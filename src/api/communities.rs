use serde_json::{json, Value};

use crate::api::ApiClient;
use crate::error::ClientResult;
use crate::forms::CommunityForm;
use crate::models::{Community, Page};
use crate::normalize;

impl ApiClient {
    /// `GET /api/v1/communities/`
    pub async fn list_communities(&self, page: u64, per_page: u64) -> ClientResult<Page<Community>> {
        let value: Value = self
            .get_with_query(
                "api/v1/communities/",
                &[("page", page), ("per_page", per_page)],
            )
            .await?;
        Ok(normalize::normalize_page(value))
    }

    /// `POST /api/v1/communities/`
    pub async fn create_community(&self, form: &CommunityForm) -> ClientResult<Community> {
        let value: Value = self.post("api/v1/communities/", form).await?;
        Ok(serde_json::from_value(normalize::unwrap_entity(
            value,
            "community",
        ))?)
    }

    /// `GET /api/v1/communities/{slug}/`
    pub async fn get_community(&self, slug: &str) -> ClientResult<Community> {
        let value: Value = self.get(&format!("api/v1/communities/{slug}/")).await?;
        Ok(serde_json::from_value(normalize::unwrap_entity(
            value,
            "community",
        ))?)
    }

    /// `POST /api/v1/communities/{slug}/join/`
    pub async fn join_community(&self, slug: &str) -> ClientResult<()> {
        let _: Value = self
            .post(&format!("api/v1/communities/{slug}/join/"), &json!({}))
            .await?;
        Ok(())
    }

    /// `POST /api/v1/communities/{slug}/leave/`
    pub async fn leave_community(&self, slug: &str) -> ClientResult<()> {
        let _: Value = self
            .post(&format!("api/v1/communities/{slug}/leave/"), &json!({}))
            .await?;
        Ok(())
    }
}
