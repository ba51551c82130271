use serde_json::{json, Value};

use crate::api::ApiClient;
use crate::error::ClientResult;
use crate::forms::PostForm;
use crate::models::{Page, Post, PostType, VoteReceipt, VoteValue};
use crate::normalize;

impl ApiClient {
    /// `GET /api/v1/posts/communities/{slug}/posts/?type=`
    pub async fn community_posts(
        &self,
        slug: &str,
        post_type: Option<PostType>,
    ) -> ClientResult<Page<Post>> {
        let path = format!("api/v1/posts/communities/{slug}/posts/");
        let query: Vec<(&str, &str)> = post_type
            .map(|t| vec![("type", t.as_str())])
            .unwrap_or_default();
        let value: Value = self.get_with_query(&path, &query).await?;
        Ok(normalize::normalize_page(value))
    }

    /// `POST /api/v1/posts/communities/{slug}/posts/`
    pub async fn create_post(&self, slug: &str, form: &PostForm) -> ClientResult<Post> {
        let value: Value = self
            .post(&format!("api/v1/posts/communities/{slug}/posts/"), form)
            .await?;
        Ok(serde_json::from_value(normalize::unwrap_entity(value, "post"))?)
    }

    /// `GET /api/v1/posts/{id}/`
    pub async fn get_post(&self, id: &str) -> ClientResult<Post> {
        let value: Value = self.get(&format!("api/v1/posts/{id}/")).await?;
        Ok(serde_json::from_value(normalize::unwrap_entity(value, "post"))?)
    }

    /// `POST /api/v1/votes/posts/{id}/vote/`
    pub async fn vote_post(&self, id: &str, value: VoteValue) -> ClientResult<VoteReceipt> {
        let response: Value = self
            .post(
                &format!("api/v1/votes/posts/{id}/vote/"),
                &json!({ "value": value.as_i64() }),
            )
            .await?;
        Ok(serde_json::from_value(response).unwrap_or_default())
    }
}
