use serde_json::Value;

use crate::api::ApiClient;
use crate::error::ClientResult;
use crate::forms::CommentForm;
use crate::models::Comment;
use crate::normalize;

impl ApiClient {
    /// `GET /api/v1/comments/posts/{post_id}/comments/`: the full forest,
    /// roots with nested replies.
    pub async fn post_comments(&self, post_id: &str) -> ClientResult<Vec<Comment>> {
        let value: Value = self
            .get(&format!("api/v1/comments/posts/{post_id}/comments/"))
            .await?;
        let value = normalize::unwrap_entity(value, "comments");
        Ok(normalize::normalize_list(value))
    }

    /// `POST /api/v1/comments/posts/{post_id}/comments/`
    pub async fn create_comment(&self, post_id: &str, form: &CommentForm) -> ClientResult<Comment> {
        let value: Value = self
            .post(&format!("api/v1/comments/posts/{post_id}/comments/"), form)
            .await?;
        Ok(serde_json::from_value(normalize::unwrap_entity(
            value, "comment",
        ))?)
    }

    /// `DELETE /api/v1/comments/{id}/`
    pub async fn delete_comment(&self, id: &str) -> ClientResult<()> {
        self.delete(&format!("api/v1/comments/{id}/")).await
    }
}
