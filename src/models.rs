use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::normalize::{
    de_count, de_datetime, de_id, de_lenient_vec, de_name, de_opt_count, de_opt_id, de_opt_vote,
    de_text,
};

/// A user's vote on a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "i64")]
pub enum VoteValue {
    Down,
    #[default]
    Neutral,
    Up,
}

impl VoteValue {
    pub fn as_i64(self) -> i64 {
        match self {
            VoteValue::Down => -1,
            VoteValue::Neutral => 0,
            VoteValue::Up => 1,
        }
    }
}

impl From<i64> for VoteValue {
    fn from(v: i64) -> Self {
        match v.signum() {
            1 => VoteValue::Up,
            -1 => VoteValue::Down,
            _ => VoteValue::Neutral,
        }
    }
}

impl From<VoteValue> for i64 {
    fn from(v: VoteValue) -> Self {
        v.as_i64()
    }
}

/// Direction of a vote click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn value(self) -> VoteValue {
        match self {
            VoteDirection::Up => VoteValue::Up,
            VoteDirection::Down => VoteValue::Down,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub username: String,
    #[serde(default, deserialize_with = "de_text")]
    pub email: String,
    #[serde(default = "default_role", deserialize_with = "de_text")]
    pub role: String,
}

fn default_role() -> String {
    "member".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub tokens: TokenPair,
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Community {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub slug: String,
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
    #[serde(default, deserialize_with = "de_text")]
    pub description: String,
    #[serde(default, alias = "members_count", deserialize_with = "de_count")]
    pub member_count: i64,
    #[serde(default)]
    pub is_member: bool,
    #[serde(default, alias = "created_by", deserialize_with = "de_name")]
    pub owner: String,
    #[serde(default, deserialize_with = "de_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    Discussion,
    Question,
    Announcement,
}

impl PostType {
    pub fn as_str(self) -> &'static str {
        match self {
            PostType::Discussion => "discussion",
            PostType::Question => "question",
            PostType::Announcement => "announcement",
        }
    }
}

fn de_post_type<'de, D: serde::Deserializer<'de>>(d: D) -> Result<PostType, D::Error> {
    let raw = de_text(d)?;
    Ok(match raw.as_str() {
        "question" => PostType::Question,
        "announcement" => PostType::Announcement,
        _ => PostType::Discussion,
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Post {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub title: String,
    #[serde(default, alias = "body", deserialize_with = "de_text")]
    pub content: String,
    #[serde(default, rename = "type", alias = "post_type", deserialize_with = "de_post_type")]
    pub post_type: PostType,
    #[serde(default, deserialize_with = "de_name")]
    pub author: String,
    #[serde(default, deserialize_with = "de_name")]
    pub community: String,
    #[serde(default, alias = "vote_score", deserialize_with = "de_count")]
    pub score: i64,
    /// `None` when the payload does not say how this user voted.
    #[serde(default, alias = "vote_status", deserialize_with = "de_opt_vote")]
    pub user_vote: Option<VoteValue>,
    #[serde(default, alias = "comments_count", deserialize_with = "de_count")]
    pub comment_count: i64,
    #[serde(default, deserialize_with = "de_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Lifecycle of a project. Statuses this client does not know are kept
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProjectStatus {
    Draft,
    #[default]
    Proposed,
    Approved,
    InProgress,
    Completed,
    Rejected,
    Other(String),
}

impl ProjectStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Proposed => "proposed",
            ProjectStatus::Approved => "approved",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Rejected => "rejected",
            ProjectStatus::Other(s) => s,
        }
    }
}

impl From<String> for ProjectStatus {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "draft" => ProjectStatus::Draft,
            "proposed" => ProjectStatus::Proposed,
            "approved" => ProjectStatus::Approved,
            "in_progress" => ProjectStatus::InProgress,
            "completed" => ProjectStatus::Completed,
            "rejected" => ProjectStatus::Rejected,
            _ => ProjectStatus::Other(s),
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match ProjectStatus::from(s.to_string()) {
            ProjectStatus::Other(raw) => Err(format!("unknown project status: {raw}")),
            status => Ok(status),
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProjectStatus {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

fn de_status<'de, D: serde::Deserializer<'de>>(d: D) -> Result<ProjectStatus, D::Error> {
    let raw = de_text(d)?;
    if raw.is_empty() {
        return Ok(ProjectStatus::default());
    }
    Ok(ProjectStatus::from(raw))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub title: String,
    #[serde(default, deserialize_with = "de_text")]
    pub description: String,
    #[serde(default, deserialize_with = "de_status")]
    pub status: ProjectStatus,
    #[serde(default, alias = "score", deserialize_with = "de_count")]
    pub vote_score: i64,
    #[serde(default, alias = "vote_status", deserialize_with = "de_opt_vote")]
    pub user_vote: Option<VoteValue>,
    #[serde(default, alias = "created_by", deserialize_with = "de_name")]
    pub owner: String,
    #[serde(default, deserialize_with = "de_name")]
    pub community: String,
    #[serde(default, deserialize_with = "de_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Comment {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, alias = "body", deserialize_with = "de_text")]
    pub content: String,
    #[serde(default, deserialize_with = "de_name")]
    pub author: String,
    #[serde(default, alias = "post", deserialize_with = "de_id")]
    pub post_id: String,
    #[serde(default, alias = "parent", deserialize_with = "de_opt_id")]
    pub parent_id: Option<String>,
    #[serde(default, deserialize_with = "de_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_lenient_vec")]
    pub replies: Vec<Comment>,
}

/// A page of a collection, after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            page: 1,
            per_page: 0,
            total: 0,
            items: Vec::new(),
        }
    }
}

/// Server answer to a vote. Only a response carrying both `new_score` and
/// `user_vote` is authoritative.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VoteReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "score", deserialize_with = "de_opt_count")]
    pub new_score: Option<i64>,
    #[serde(default, alias = "vote_status", deserialize_with = "de_opt_vote")]
    pub user_vote: Option<VoteValue>,
}

impl VoteReceipt {
    pub fn authoritative(&self) -> Option<(i64, VoteValue)> {
        Some((self.new_score?, self.user_vote?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TimeRange {
    Day,
    #[default]
    Week,
    Month,
    Year,
    All,
}

impl TimeRange {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeRange::Day => "day",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::Year => "year",
            TimeRange::All => "all",
        }
    }
}
