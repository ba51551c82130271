use serde::Serialize;
use serde_json::{json, Value};

use crate::api::ApiClient;
use crate::error::ClientResult;
use crate::forms::ProjectForm;
use crate::models::{Page, Project, ProjectStatus, VoteReceipt, VoteValue};
use crate::normalize;

/// Filters for `GET /api/v1/projects/`.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectQuery {
    pub page: u64,
    pub per_page: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community: Option<String>,
}

impl Default for ProjectQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
            status: None,
            community: None,
        }
    }
}

impl ApiClient {
    /// `GET /api/v1/projects/`
    pub async fn list_projects(&self, query: &ProjectQuery) -> ClientResult<Page<Project>> {
        let value: Value = self.get_with_query("api/v1/projects/", query).await?;
        Ok(normalize::normalize_page(value))
    }

    /// `POST /api/v1/projects/`
    pub async fn create_project(&self, form: &ProjectForm) -> ClientResult<Project> {
        let value: Value = self.post("api/v1/projects/", form).await?;
        Ok(serde_json::from_value(normalize::unwrap_entity(
            value, "project",
        ))?)
    }

    /// `GET /api/v1/projects/{id}/`
    pub async fn get_project(&self, id: &str) -> ClientResult<Project> {
        let value: Value = self.get(&format!("api/v1/projects/{id}/")).await?;
        Ok(serde_json::from_value(normalize::unwrap_entity(
            value, "project",
        ))?)
    }

    /// `PUT /api/v1/projects/{id}/`
    pub async fn update_project(&self, id: &str, form: &ProjectForm) -> ClientResult<Project> {
        let value: Value = self.put(&format!("api/v1/projects/{id}/"), form).await?;
        Ok(serde_json::from_value(normalize::unwrap_entity(
            value, "project",
        ))?)
    }

    /// `DELETE /api/v1/projects/{id}/`
    pub async fn delete_project(&self, id: &str) -> ClientResult<()> {
        self.delete(&format!("api/v1/projects/{id}/")).await
    }

    /// `POST /api/v1/projects/{id}/vote/` → `{message, new_score, user_vote}`
    pub async fn vote_project(&self, id: &str, value: VoteValue) -> ClientResult<VoteReceipt> {
        let response: Value = self
            .post(
                &format!("api/v1/projects/{id}/vote/"),
                &json!({ "value": value.as_i64() }),
            )
            .await?;
        Ok(serde_json::from_value(response).unwrap_or_default())
    }

    /// `POST /api/v1/projects/{id}/transition/`
    ///
    /// Some deployments answer with the updated project and some with just a
    /// message; in the latter case the project is fetched again.
    pub async fn transition_project(
        &self,
        id: &str,
        status: &ProjectStatus,
    ) -> ClientResult<Project> {
        let value: Value = self
            .post(
                &format!("api/v1/projects/{id}/transition/"),
                &json!({ "status": status }),
            )
            .await?;

        match serde_json::from_value::<Project>(normalize::unwrap_entity(value, "project")) {
            Ok(project) if !project.id.is_empty() => Ok(project),
            _ => self.get_project(id).await,
        }
    }
}
