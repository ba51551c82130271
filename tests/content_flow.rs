mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use agora::api::FeedQuery;
use agora::commands::{self, Command, CommunityCommand};
use agora::comments::CommentThread;
use agora::error::ClientError;
use agora::forms::CommunityForm;
use agora::models::{TimeRange, VoteDirection, VoteValue};
use agora::render;
use agora::votes::{Subject, Tally};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::Notify;

use common::{fresh_state, serve, signed_in_state, with_auth};

// ---- votes ----

#[derive(Default)]
struct VoteMock {
    gate: Notify,
    received: Mutex<Vec<Value>>,
}

async fn project(Path(id): Path<String>) -> Json<Value> {
    Json(json!({
        "id": id.parse::<i64>().unwrap_or(0),
        "title": "Community garden",
        "description": "Raised beds behind the library",
        "status": "proposed",
        "vote_score": 5,
        "user_vote": 0,
        "created_by": { "username": "bo" }
    }))
}

async fn vote_project(State(mock): State<Arc<VoteMock>>, Json(body): Json<Value>) -> Json<Value> {
    mock.received.lock().unwrap().push(body);
    mock.gate.notified().await;
    Json(json!({ "message": "Vote recorded", "new_score": 9, "user_vote": 1 }))
}

#[tokio::test]
async fn project_vote_is_optimistic_then_snaps_to_server() {
    let mock = Arc::new(VoteMock::default());
    let app = Router::new()
        .route("/api/v1/projects/{id}/", get(project))
        .route("/api/v1/projects/{id}/vote/", post(vote_project))
        .with_state(mock.clone());
    let state = fresh_state(&serve(app).await);

    let mut garden = state.api.get_project("7").await.unwrap();
    assert_eq!(garden.owner, "bo");
    let observed = state.votes.observe_project(&mut garden);
    assert_eq!(
        observed,
        Tally {
            score: 5,
            user_vote: VoteValue::Neutral
        }
    );

    let subject = Subject::project("7");
    let (settled, ()) = tokio::join!(
        state
            .votes
            .vote(state.api.as_ref(), &subject, VoteDirection::Up),
        async {
            while state.votes.tally(&subject).map(|t| t.user_vote) != Some(VoteValue::Up) {
                tokio::task::yield_now().await;
            }
            // The server has not answered yet
            assert_eq!(
                state.votes.tally(&subject),
                Some(Tally {
                    score: 6,
                    user_vote: VoteValue::Up
                })
            );
            mock.gate.notify_one();
        }
    );

    assert_eq!(
        settled.unwrap(),
        Tally {
            score: 9,
            user_vote: VoteValue::Up
        }
    );
    assert_eq!(*mock.received.lock().unwrap(), vec![json!({ "value": 1 })]);
    assert_eq!(
        state.votes.cache().get(&subject).unwrap(),
        Some(VoteValue::Up)
    );
}

async fn post_detail(Path(id): Path<String>) -> Json<Value> {
    Json(json!({
        "id": id,
        "title": "Bike lanes on Main",
        "content": "Thoughts?",
        "type": "question",
        "score": 2,
        "vote_status": 0
    }))
}

async fn failing_vote() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": "boom" })),
    )
}

#[tokio::test]
async fn failed_post_vote_rolls_back() {
    let app = Router::new()
        .route("/api/v1/posts/{id}/", get(post_detail))
        .route("/api/v1/votes/posts/{id}/vote/", post(failing_vote));
    let state = fresh_state(&serve(app).await);

    let mut bikes = state.api.get_post("3").await.unwrap();
    state.votes.observe_post(&mut bikes);

    let subject = Subject::post("3");
    let tally = state
        .votes
        .vote(state.api.as_ref(), &subject, VoteDirection::Down)
        .await
        .unwrap();

    assert_eq!(
        tally,
        Tally {
            score: 2,
            user_vote: VoteValue::Neutral
        }
    );
    assert_eq!(state.votes.cache().get(&subject).unwrap(), None);
}

async fn accepting_vote() -> Json<Value> {
    Json(json!({ "message": "Vote recorded" }))
}

async fn counted_feed() -> Json<Value> {
    // Aggregate already includes this user's vote; user_vote is left out
    Json(json!({ "results": [{ "id": 3, "title": "Bike lanes on Main", "score": 1 }] }))
}

#[tokio::test]
async fn accepted_vote_is_not_counted_again_by_the_feed() {
    let app = Router::new()
        .route("/api/v1/posts/{id}/", get(post_detail))
        .route("/api/v1/votes/posts/{id}/vote/", post(accepting_vote))
        .route("/api/v1/feeds/latest/", get(counted_feed));
    let state = fresh_state(&serve(app).await);

    let mut bikes = state.api.get_post("3").await.unwrap();
    state.votes.observe_post(&mut bikes);
    let subject = Subject::post("3");
    let tally = state
        .votes
        .vote(state.api.as_ref(), &subject, VoteDirection::Down)
        .await
        .unwrap();
    assert_eq!(
        tally,
        Tally {
            score: 1,
            user_vote: VoteValue::Down
        }
    );
    assert!(state.votes.cache().unconfirmed().unwrap().is_empty());

    let mut feed = state.api.latest_feed(&FeedQuery::default()).await.unwrap();
    let listed = &mut feed.items[0];
    assert_eq!(listed.user_vote, None);
    state.votes.observe_post(listed);
    assert_eq!(listed.score, 1);
    assert_eq!(listed.user_vote, Some(VoteValue::Down));
}

// ---- feed ----

fn feed_posts() -> Value {
    json!([
        { "id": 1, "title": "Library hours", "author": "ana", "score": 4, "comments_count": 2 },
        { "id": 2, "title": "Pothole on 5th", "author": { "username": "bo" }, "vote_score": 1 }
    ])
}

async fn latest_feed() -> Json<Value> {
    Json(json!({ "results": feed_posts(), "count": 2 }))
}

async fn top_feed(Query(query): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    if query.get("time_range").map(String::as_str) != Some("week") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "bad time_range" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({ "items": feed_posts(), "total": 2, "page": 1, "per_page": 20 })),
    )
}

#[tokio::test]
async fn results_and_items_envelopes_normalize_identically() {
    let app = Router::new()
        .route("/api/v1/feeds/latest/", get(latest_feed))
        .route("/api/v1/feeds/top/", get(top_feed));
    let state = fresh_state(&serve(app).await);

    let latest = state.api.latest_feed(&FeedQuery::default()).await.unwrap();
    let top = state
        .api
        .top_feed(TimeRange::Week, &FeedQuery::default())
        .await
        .unwrap();

    assert_eq!(latest.items, top.items);
    assert_eq!(latest.total, 2);
    assert_eq!(top.total, 2);
    assert_eq!(top.items[1].author, "bo");
    assert_eq!(top.items[1].score, 1);
    assert_eq!(top.items[0].comment_count, 2);
}

// ---- comments ----

#[derive(Default)]
struct CommentStore {
    rows: Mutex<Vec<Value>>,
    next_id: Mutex<i64>,
}

fn id_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

async fn list_comments(State(store): State<Arc<CommentStore>>) -> Json<Value> {
    Json(Value::Array(store.rows.lock().unwrap().clone()))
}

async fn create_comment(
    State(store): State<Arc<CommentStore>>,
    Path(post_id): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let id = {
        let mut next = store.next_id.lock().unwrap();
        *next += 1;
        *next
    };
    let row = json!({
        "id": id,
        "content": body["content"],
        "author": "",
        "post": post_id,
        "parent_id": body.get("parent_id").cloned().unwrap_or(Value::Null),
        "created_at": "2026-10-19T09:30:00Z"
    });
    store.rows.lock().unwrap().push(row.clone());
    (StatusCode::CREATED, Json(row))
}

async fn delete_comment(State(store): State<Arc<CommentStore>>, Path(id): Path<String>) -> StatusCode {
    let mut rows = store.rows.lock().unwrap();
    if !rows.iter().any(|r| id_str(&r["id"]) == id) {
        return StatusCode::NOT_FOUND;
    }
    let mut doomed = vec![id];
    loop {
        let more: Vec<String> = rows
            .iter()
            .filter(|r| doomed.contains(&id_str(&r["parent_id"])))
            .map(|r| id_str(&r["id"]))
            .filter(|id| !doomed.contains(id))
            .collect();
        if more.is_empty() {
            break;
        }
        doomed.extend(more);
    }
    rows.retain(|r| !doomed.contains(&id_str(&r["id"])));
    StatusCode::NO_CONTENT
}

fn comment_api(store: Arc<CommentStore>) -> Router {
    Router::new()
        .route(
            "/api/v1/comments/posts/{post_id}/comments/",
            get(list_comments).post(create_comment),
        )
        .route("/api/v1/comments/{id}/", delete(delete_comment))
        .with_state(store)
}

#[tokio::test]
async fn reply_and_delete_keep_the_thread_in_shape() {
    let store = Arc::new(CommentStore::default());
    *store.rows.lock().unwrap() = vec![
        json!({ "id": 1, "content": "Root", "author": "bo", "post_id": 10, "parent_id": null }),
        json!({ "id": 2, "content": "Child", "author": "cy", "post_id": 10, "parent_id": 1 }),
    ];
    *store.next_id.lock().unwrap() = 2;
    let state = fresh_state(&serve(comment_api(store.clone())).await);

    let mut thread = CommentThread::load(state.api.as_ref(), "10", Some("ana".into()))
        .await
        .unwrap();
    assert_eq!(thread.tree().children_of("1"), ["2".to_string()]);

    let reply = thread.reply("2", "  Deeper  ").await.unwrap();
    assert_eq!(reply, "3");
    assert_eq!(thread.tree().parent_of("3"), Some("2"));
    assert_eq!(thread.tree().children_of("1"), ["2".to_string()]);
    let deeper = thread.tree().get("3").unwrap();
    assert_eq!(deeper.content, "Deeper");
    assert_eq!(deeper.author, "ana");

    let top = thread.create_root("Top").await.unwrap();
    assert_eq!(thread.tree().roots()[0], top);

    let removed = thread.delete("1").await.unwrap();
    assert_eq!(removed, 3);
    assert_eq!(thread.tree().len(), 1);
    assert!(!thread.tree().contains("2"));
    assert_eq!(store.rows.lock().unwrap().len(), 1);

    let rendered = render::comment_tree(thread.tree());
    assert!(rendered.contains("Top"));
    assert!(!rendered.contains("Root"));
}

#[tokio::test]
async fn refused_delete_reloads_the_thread() {
    let store = Arc::new(CommentStore::default());
    *store.rows.lock().unwrap() = vec![json!({ "id": 1, "content": "Only", "author": "bo", "post_id": 10 })];
    let state = fresh_state(&serve(comment_api(store)).await);

    let mut thread = CommentThread::load(state.api.as_ref(), "10", None)
        .await
        .unwrap();
    let err = thread.delete("99").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound));
    assert_eq!(thread.tree().len(), 1);
    assert!(thread.tree().contains("1"));
}

// ---- communities ----

async fn community() -> Json<Value> {
    Json(json!({ "community": { "id": 4, "slug": "parks", "name": "Parks", "members_count": 12 } }))
}

async fn community_posts() -> Json<Value> {
    Json(json!({
        "results": [
            { "id": 5, "title": "Fix the swings", "score": 3, "author": { "username": "bo" } }
        ]
    }))
}

async fn create_community() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "name": ["Community with this name already exists."] })),
    )
}

fn community_api() -> Router {
    with_auth(
        Router::new()
            .route("/api/v1/communities/", post(create_community))
            .route("/api/v1/communities/{slug}/", get(community))
            .route(
                "/api/v1/posts/communities/{slug}/posts/",
                get(community_posts),
            ),
    )
}

#[tokio::test]
async fn community_page_joins_details_and_posts() {
    let state = signed_in_state(&serve(community_api()).await).await;

    let output = commands::run(
        &state,
        Command::Communities {
            action: CommunityCommand::Show {
                slug: "parks".into(),
                post_type: None,
            },
        },
    )
    .await
    .unwrap();

    assert!(output.starts_with("Parks [parks]"), "got: {output}");
    assert!(output.contains("12 members"));
    assert!(output.contains("Fix the swings"));
    assert!(output.contains("by bo"));
}

#[tokio::test]
async fn field_errors_surface_as_api_messages() {
    let state = signed_in_state(&serve(community_api()).await).await;

    let err = state
        .api
        .create_community(&CommunityForm {
            name: "Parks".into(),
            description: String::new(),
        })
        .await
        .unwrap_err();
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "name: Community with this name already exists.");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = state.api.get_post("missing").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound));
}

#[tokio::test]
async fn protected_commands_require_a_session() {
    let state = fresh_state(&serve(community_api()).await);
    state.sessions().init().await;

    let err = commands::run(
        &state,
        Command::Communities {
            action: CommunityCommand::List {
                page: 1,
                per_page: 20,
            },
        },
    )
    .await
    .unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(state.router.current(), agora::navigation::Route::Login);
}
