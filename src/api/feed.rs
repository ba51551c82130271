use serde::Serialize;
use serde_json::Value;

use crate::api::ApiClient;
use crate::error::ClientResult;
use crate::models::{Page, Post, TimeRange};
use crate::normalize;

#[derive(Debug, Clone, Serialize)]
pub struct FeedQuery {
    pub page: u64,
    pub per_page: u64,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

#[derive(Serialize)]
struct TopQuery {
    time_range: &'static str,
    page: u64,
    per_page: u64,
}

impl ApiClient {
    /// `GET /api/v1/feeds/latest/`
    pub async fn latest_feed(&self, query: &FeedQuery) -> ClientResult<Page<Post>> {
        let value: Value = self.get_with_query("api/v1/feeds/latest/", query).await?;
        Ok(normalize::normalize_page(value))
    }

    /// `GET /api/v1/feeds/top/?time_range=&page=&per_page=`
    pub async fn top_feed(&self, range: TimeRange, query: &FeedQuery) -> ClientResult<Page<Post>> {
        let value: Value = self
            .get_with_query(
                "api/v1/feeds/top/",
                &TopQuery {
                    time_range: range.as_str(),
                    page: query.page,
                    per_page: query.per_page,
                },
            )
            .await?;
        Ok(normalize::normalize_page(value))
    }
}
