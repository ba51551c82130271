use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::models::{Page, TokenPair, User, VoteValue};

const COLLECTION_KEYS: &[&str] = &["results", "items", "data"];
const TOTAL_KEYS: &[&str] = &["total", "count"];
const PAGE_KEYS: &[&str] = &["page", "current_page"];
const PER_PAGE_KEYS: &[&str] = &["per_page", "page_size", "limit"];

/// A reference to another entity, as the API may send it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NameRef {
    Text(String),
    Number(i64),
    Object(NamedObject),
    Other(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NamedObject {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl NameRef {
    /// Resolve to the display string used everywhere downstream.
    pub fn into_display(self) -> String {
        match self {
            NameRef::Text(s) => s,
            NameRef::Number(n) => n.to_string(),
            NameRef::Object(obj) => obj
                .username
                .or(obj.name)
                .or(obj.slug)
                .or(obj.title)
                .unwrap_or_default(),
            NameRef::Other(_) => String::new(),
        }
    }
}

/// Display name of an arbitrary JSON reference.
pub fn name_of(value: &Value) -> String {
    serde_json::from_value::<NameRef>(value.clone())
        .map(NameRef::into_display)
        .unwrap_or_default()
}

/// Identifier of an arbitrary JSON reference (`12`, `"12"` or `{"id": 12}`).
pub fn id_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => map.get("id").map(id_of).unwrap_or_default(),
        _ => String::new(),
    }
}

fn count_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn vote_of(value: &Value) -> VoteValue {
    match value {
        Value::Number(_) => count_of(value).map(VoteValue::from).unwrap_or_default(),
        Value::String(s) => match s.trim() {
            "up" | "upvote" | "1" | "+1" => VoteValue::Up,
            "down" | "downvote" | "-1" => VoteValue::Down,
            _ => VoteValue::Neutral,
        },
        _ => VoteValue::Neutral,
    }
}

fn datetime_of(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

// --- serde field adapters ---

pub fn de_name<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Option::<NameRef>::deserialize(d)?;
    Ok(value.map(NameRef::into_display).unwrap_or_default())
}

pub fn de_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(id_of(&value))
}

pub fn de_opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(Some(id_of(&value)).filter(|id| !id.is_empty()))
}

pub fn de_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

pub fn de_count<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(count_of(&value).unwrap_or(0))
}

pub fn de_opt_vote<'de, D: Deserializer<'de>>(d: D) -> Result<Option<VoteValue>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Null => None,
        other => Some(vote_of(&other)),
    })
}

pub fn de_opt_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(count_of(&value))
}

pub fn de_datetime<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(datetime_of(&value))
}

pub fn de_lenient_vec<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Array(entries) => lenient_items(entries),
        _ => Vec::new(),
    })
}

// --- collections ---

fn lenient_items<T: DeserializeOwned>(entries: Vec<Value>) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("Skipping malformed collection entry: {}", e);
                None
            }
        })
        .collect()
}

fn first_count(map: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find_map(count_of)
        .and_then(|n| u64::try_from(n).ok())
}

/// Normalize a collection payload into `{page, per_page, total, items}`.
/// Items may arrive under `results`, `items` or `data`, or as a bare
/// array. Entries that do not deserialize are skipped.
pub fn normalize_page<T: DeserializeOwned>(value: Value) -> Page<T> {
    let (entries, meta) = match value {
        Value::Array(entries) => (entries, None),
        Value::Object(mut map) => {
            let entries = COLLECTION_KEYS
                .iter()
                .find_map(|k| match map.remove(*k) {
                    Some(Value::Array(entries)) => Some(entries),
                    _ => None,
                })
                .unwrap_or_default();
            (entries, Some(map))
        }
        _ => (Vec::new(), None),
    };

    let items: Vec<T> = lenient_items(entries);
    let len = items.len() as u64;

    let (page, per_page, total) = match meta {
        Some(map) => (
            first_count(&map, PAGE_KEYS).unwrap_or(1),
            first_count(&map, PER_PAGE_KEYS).unwrap_or(len),
            first_count(&map, TOTAL_KEYS).unwrap_or(len),
        ),
        None => (1, len, len),
    };

    Page {
        page,
        per_page,
        total,
        items,
    }
}

/// Normalize a collection payload when only the entries matter.
pub fn normalize_list<T: DeserializeOwned>(value: Value) -> Vec<T> {
    normalize_page(value).items
}

/// Unwrap `{"<key>": {...}}` envelopes the API uses for some single-entity
/// responses.
pub fn unwrap_entity(value: Value, key: &str) -> Value {
    match value {
        Value::Object(mut map) if !map.contains_key("id") && map.contains_key(key) => {
            map.remove(key).unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Extract the token pair from a login response.
///
/// Accepts tokens at the top level, under `tokens`, or under `data`, with
/// either `access`/`refresh` or `access_token`/`refresh_token` names.
pub fn token_pair(value: &Value) -> Option<TokenPair> {
    let candidates = [Some(value), value.get("tokens"), value.get("data")];
    candidates.into_iter().flatten().find_map(|v| {
        let access = ["access", "access_token", "token"]
            .iter()
            .find_map(|k| v.get(*k).and_then(Value::as_str))
            .filter(|s| !s.is_empty())?;
        let refresh = ["refresh", "refresh_token"]
            .iter()
            .find_map(|k| v.get(*k).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Some(TokenPair {
            access: access.to_string(),
            refresh,
        })
    })
}

/// The user embedded in an auth response, if any.
pub fn embedded_user(value: &Value) -> Option<User> {
    [value.get("user"), value.get("data").and_then(|d| d.get("user"))]
        .into_iter()
        .flatten()
        .find_map(|v| serde_json::from_value(v.clone()).ok())
}
