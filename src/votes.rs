use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use crate::api::ApiClient;
use crate::db::models::CachedVote;
use crate::error::ClientResult;
use crate::models::{Post, Project, VoteDirection, VoteReceipt, VoteValue};
use crate::state::DbPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    Post,
    Project,
}

impl SubjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SubjectKind::Post => "post",
            SubjectKind::Project => "project",
        }
    }
}

/// Something that can be voted on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subject {
    pub kind: SubjectKind,
    pub id: String,
}

impl Subject {
    pub fn post(id: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::Post,
            id: id.into(),
        }
    }

    pub fn project(id: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::Project,
            id: id.into(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

/// What the user sees: the aggregate and their own vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub score: i64,
    pub user_vote: VoteValue,
}

/// Durable `{subject: vote}` map that survives restarts. A row stays
/// unconfirmed until the server has accepted the vote.
#[derive(Clone)]
pub struct VoteCache {
    pool: DbPool,
}

impl VoteCache {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn get(&self, subject: &Subject) -> ClientResult<Option<VoteValue>> {
        Ok(self
            .entry(subject)?
            .map(|cached| VoteValue::from(cached.value)))
    }

    pub fn entry(&self, subject: &Subject) -> ClientResult<Option<CachedVote>> {
        let conn = self.pool.get()?;
        let entry = conn
            .query_row(
                "SELECT subject_kind, subject_id, value, confirmed FROM vote_cache
                 WHERE subject_kind = ?1 AND subject_id = ?2",
                params![subject.kind.as_str(), subject.id],
                |row| {
                    Ok(CachedVote {
                        subject_kind: row.get(0)?,
                        subject_id: row.get(1)?,
                        value: row.get(2)?,
                        confirmed: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /// Record a click the server has not accepted yet.
    pub fn put(&self, subject: &Subject, value: VoteValue) -> ClientResult<()> {
        self.write(subject, value, false)
    }

    /// Record a vote the server has accepted.
    pub fn confirm(&self, subject: &Subject, value: VoteValue) -> ClientResult<()> {
        self.write(subject, value, true)
    }

    fn write(&self, subject: &Subject, value: VoteValue, confirmed: bool) -> ClientResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO vote_cache (subject_kind, subject_id, value, confirmed)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(subject_kind, subject_id) DO UPDATE SET
               value = excluded.value,
               confirmed = excluded.confirmed,
               updated_at = datetime('now')",
            params![subject.kind.as_str(), subject.id, value.as_i64(), confirmed],
        )?;
        Ok(())
    }

    /// Put back a row captured earlier with [`VoteCache::entry`].
    pub fn restore(&self, subject: &Subject, previous: Option<&CachedVote>) -> ClientResult<()> {
        match previous {
            Some(cached) => self.write(subject, VoteValue::from(cached.value), cached.confirmed),
            None => self.remove(subject),
        }
    }

    pub fn remove(&self, subject: &Subject) -> ClientResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "DELETE FROM vote_cache WHERE subject_kind = ?1 AND subject_id = ?2",
            params![subject.kind.as_str(), subject.id],
        )?;
        Ok(())
    }

    pub fn all(&self) -> ClientResult<Vec<CachedVote>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT subject_kind, subject_id, value, confirmed FROM vote_cache
             ORDER BY subject_kind, subject_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CachedVote {
                    subject_kind: row.get(0)?,
                    subject_id: row.get(1)?,
                    value: row.get(2)?,
                    confirmed: row.get(3)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Votes the server has not accepted yet.
    pub fn unconfirmed(&self) -> ClientResult<Vec<CachedVote>> {
        Ok(self.all()?.into_iter().filter(|v| !v.confirmed).collect())
    }
}

/// Sends a vote to the server.
#[async_trait]
pub trait VoteSink: Send + Sync {
    async fn submit(&self, subject: &Subject, value: VoteValue) -> ClientResult<VoteReceipt>;
}

#[async_trait]
impl VoteSink for ApiClient {
    async fn submit(&self, subject: &Subject, value: VoteValue) -> ClientResult<VoteReceipt> {
        match subject.kind {
            SubjectKind::Post => self.vote_post(&subject.id, value).await,
            SubjectKind::Project => self.vote_project(&subject.id, value).await,
        }
    }
}

/// A click that has been applied locally but not yet settled.
#[derive(Debug, Clone)]
pub struct PendingVote {
    pub subject: Subject,
    /// The vote value sent to the server.
    pub next: VoteValue,
    /// What the user sees right now.
    pub optimistic: Tally,
    previous: Tally,
    previous_cached: Option<CachedVote>,
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    tally: Tally,
    generation: u64,
}

/// Local tallies of every subject on screen.
///
/// A click is applied to the local tally at once and written to the
/// durable cache, then sent to the server. An authoritative answer
/// (`new_score` + `user_vote`) replaces the local values outright; any
/// other success marks the cached vote confirmed. A failed request rolls
/// the click back, unless a newer click on the same subject has happened
/// in the meantime, in which case that click owns the state.
pub struct VoteBoard {
    cache: VoteCache,
    entries: Mutex<HashMap<Subject, Entry>>,
}

impl VoteBoard {
    pub fn new(cache: VoteCache) -> Self {
        Self {
            cache,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &VoteCache {
        &self.cache
    }

    /// Current local tally, if the subject has been seen.
    pub fn tally(&self, subject: &Subject) -> Option<Tally> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(subject)
            .map(|e| e.tally)
    }

    /// Record server data for a subject, merged with the durable cache.
    ///
    /// An unconfirmed cached vote is not part of the server aggregate yet,
    /// so the aggregate is shifted by its difference to what the server
    /// counted for us (nothing, when the payload does not say). A confirmed
    /// vote is already inside the aggregate and only fills in a missing
    /// `user_vote`.
    pub fn observe(
        &self,
        subject: &Subject,
        server_score: i64,
        server_vote: Option<VoteValue>,
    ) -> Tally {
        let cached = match self.cache.entry(subject) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Vote cache unreadable for {}: {}", subject, e);
                None
            }
        };

        let tally = match cached {
            Some(cached) if !cached.confirmed => {
                let vote = VoteValue::from(cached.value);
                if server_vote == Some(vote) {
                    self.record_confirmed(subject, vote);
                }
                Tally {
                    score: server_score + vote.as_i64() - server_vote.unwrap_or_default().as_i64(),
                    user_vote: vote,
                }
            }
            Some(cached) => {
                let vote = match server_vote {
                    Some(vote) if vote.as_i64() != cached.value => {
                        self.record_confirmed(subject, vote);
                        vote
                    }
                    _ => VoteValue::from(cached.value),
                };
                Tally {
                    score: server_score,
                    user_vote: vote,
                }
            }
            None => Tally {
                score: server_score,
                user_vote: server_vote.unwrap_or_default(),
            },
        };

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.entry(subject.clone()).or_insert(Entry {
            tally,
            generation: 0,
        });
        entry.tally = tally;
        tally
    }

    pub fn observe_post(&self, post: &mut Post) -> Tally {
        let tally = self.observe(&Subject::post(&post.id), post.score, post.user_vote);
        post.score = tally.score;
        post.user_vote = Some(tally.user_vote);
        tally
    }

    pub fn observe_project(&self, project: &mut Project) -> Tally {
        let tally = self.observe(
            &Subject::project(&project.id),
            project.vote_score,
            project.user_vote,
        );
        project.vote_score = tally.score;
        project.user_vote = Some(tally.user_vote);
        tally
    }

    /// Apply a click locally and persist it. Clicking the current direction
    /// again clears the vote.
    pub fn begin(&self, subject: &Subject, direction: VoteDirection) -> ClientResult<PendingVote> {
        let previous_cached = self.cache.entry(subject)?;

        let pending = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            let entry = entries.entry(subject.clone()).or_insert(Entry {
                tally: Tally::default(),
                generation: 0,
            });

            let previous = entry.tally;
            let clicked = direction.value();
            let next = if previous.user_vote == clicked {
                VoteValue::Neutral
            } else {
                clicked
            };
            let delta = next.as_i64() - previous.user_vote.as_i64();

            entry.tally = Tally {
                score: previous.score + delta,
                user_vote: next,
            };
            entry.generation += 1;

            PendingVote {
                subject: subject.clone(),
                next,
                optimistic: entry.tally,
                previous,
                previous_cached,
                generation: entry.generation,
            }
        };

        self.cache.put(subject, pending.next)?;
        tracing::debug!(
            "Optimistic vote on {}: {:?} -> {:?}",
            subject,
            pending.previous.user_vote,
            pending.next
        );
        Ok(pending)
    }

    /// Reconcile a click with the server's answer and return the tally to
    /// display.
    pub fn settle(&self, pending: PendingVote, result: ClientResult<VoteReceipt>) -> Tally {
        match result {
            Ok(receipt) => match receipt.authoritative() {
                Some((score, vote)) => self.snap(&pending, score, vote),
                None => self.accept(&pending),
            },
            Err(e) => {
                tracing::warn!("Vote on {} failed: {}", pending.subject, e);
                self.rollback(pending)
            }
        }
    }

    /// Click, send and reconcile.
    pub async fn vote(
        &self,
        sink: &dyn VoteSink,
        subject: &Subject,
        direction: VoteDirection,
    ) -> ClientResult<Tally> {
        let pending = self.begin(subject, direction)?;
        let result = sink.submit(subject, pending.next).await;
        Ok(self.settle(pending, result))
    }

    fn record_confirmed(&self, subject: &Subject, vote: VoteValue) {
        if let Err(e) = self.cache.confirm(subject, vote) {
            tracing::warn!("Could not update vote cache for {}: {}", subject, e);
        }
    }

    fn snap(&self, pending: &PendingVote, score: i64, vote: VoteValue) -> Tally {
        let tally = Tally {
            score,
            user_vote: vote,
        };
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.entry(pending.subject.clone()).or_insert(Entry {
            tally,
            generation: pending.generation,
        });
        if entry.generation != pending.generation {
            return entry.tally;
        }
        entry.tally = tally;
        self.record_confirmed(&pending.subject, vote);
        tally
    }

    /// The server took the vote without reporting the new aggregate; the
    /// optimistic tally stands.
    fn accept(&self, pending: &PendingVote) -> Tally {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(&pending.subject) {
            Some(entry) if entry.generation != pending.generation => entry.tally,
            current => {
                self.record_confirmed(&pending.subject, pending.next);
                current.map_or(pending.optimistic, |entry| entry.tally)
            }
        }
    }

    fn rollback(&self, pending: PendingVote) -> Tally {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = entries.get_mut(&pending.subject) else {
            return pending.previous;
        };
        if entry.generation != pending.generation {
            return entry.tally;
        }

        entry.tally = pending.previous;
        if let Err(e) = self
            .cache
            .restore(&pending.subject, pending.previous_cached.as_ref())
        {
            tracing::warn!("Could not restore vote cache for {}: {}", pending.subject, e);
        }
        entry.tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::error::ClientError;

    fn board() -> VoteBoard {
        VoteBoard::new(VoteCache::new(db::memory_pool().unwrap()))
    }

    fn receipt(score: i64, vote: i64) -> VoteReceipt {
        VoteReceipt {
            message: Some("ok".into()),
            new_score: Some(score),
            user_vote: Some(VoteValue::from(vote)),
        }
    }

    #[test]
    fn same_direction_twice_clears_vote() {
        let board = board();
        let subject = Subject::post("1");
        board.observe(&subject, 10, Some(VoteValue::Neutral));

        let first = board.begin(&subject, VoteDirection::Up).unwrap();
        assert_eq!(first.optimistic, Tally { score: 11, user_vote: VoteValue::Up });

        let second = board.begin(&subject, VoteDirection::Up).unwrap();
        assert_eq!(second.next, VoteValue::Neutral);
        assert_eq!(
            board.tally(&subject).unwrap(),
            Tally { score: 10, user_vote: VoteValue::Neutral }
        );
    }

    #[test]
    fn switching_direction_moves_by_two() {
        let board = board();
        let subject = Subject::project("p");
        board.observe(&subject, 0, Some(VoteValue::Neutral));

        board.begin(&subject, VoteDirection::Down).unwrap();
        assert_eq!(board.tally(&subject).unwrap().score, -1);

        board.begin(&subject, VoteDirection::Up).unwrap();
        let tally = board.tally(&subject).unwrap();
        assert_eq!(tally.user_vote, VoteValue::Up);
        assert_eq!(tally.score, 1);
    }

    #[test]
    fn optimistic_tally_shows_before_settling() {
        let board = board();
        let subject = Subject::project("7");
        board.observe(&subject, 5, Some(VoteValue::Neutral));

        let pending = board.begin(&subject, VoteDirection::Up).unwrap();
        assert_eq!(pending.optimistic, Tally { score: 6, user_vote: VoteValue::Up });
        assert_eq!(board.cache().get(&subject).unwrap(), Some(VoteValue::Up));
    }

    #[test]
    fn authoritative_receipt_snaps_to_truth() {
        let board = board();
        let subject = Subject::project("7");
        board.observe(&subject, 5, Some(VoteValue::Neutral));

        let pending = board.begin(&subject, VoteDirection::Up).unwrap();
        let tally = board.settle(pending, Ok(receipt(42, -1)));
        assert_eq!(tally, Tally { score: 42, user_vote: VoteValue::Down });
        assert_eq!(board.tally(&subject).unwrap(), tally);
        assert_eq!(board.cache().get(&subject).unwrap(), Some(VoteValue::Down));
    }

    #[test]
    fn receipt_without_score_keeps_optimistic_state() {
        let board = board();
        let subject = Subject::post("3");
        board.observe(&subject, 2, Some(VoteValue::Neutral));

        let pending = board.begin(&subject, VoteDirection::Down).unwrap();
        let tally = board.settle(pending, Ok(VoteReceipt::default()));
        assert_eq!(tally, Tally { score: 1, user_vote: VoteValue::Down });
    }

    #[test]
    fn failure_rolls_back_tally_and_cache() {
        let board = board();
        let subject = Subject::post("3");
        board.observe(&subject, 2, Some(VoteValue::Neutral));

        let pending = board.begin(&subject, VoteDirection::Up).unwrap();
        let tally = board.settle(pending, Err(ClientError::Timeout));
        assert_eq!(tally, Tally { score: 2, user_vote: VoteValue::Neutral });
        assert_eq!(board.cache().get(&subject).unwrap(), None);
    }

    #[test]
    fn stale_failure_does_not_undo_newer_click() {
        let board = board();
        let subject = Subject::post("3");
        board.observe(&subject, 2, Some(VoteValue::Neutral));

        let first = board.begin(&subject, VoteDirection::Up).unwrap();
        let _second = board.begin(&subject, VoteDirection::Down).unwrap();

        let tally = board.settle(first, Err(ClientError::Timeout));
        assert_eq!(tally, Tally { score: 1, user_vote: VoteValue::Down });
        assert_eq!(board.cache().get(&subject).unwrap(), Some(VoteValue::Down));
    }

    #[test]
    fn cached_vote_wins_over_server_on_load() {
        let board = board();
        let subject = Subject::post("9");
        board.cache().put(&subject, VoteValue::Up).unwrap();

        // Server has no memory of the vote.
        let tally = board.observe(&subject, 4, Some(VoteValue::Neutral));
        assert_eq!(tally, Tally { score: 5, user_vote: VoteValue::Up });

        // Server already counted it.
        let tally = board.observe(&subject, 5, Some(VoteValue::Up));
        assert_eq!(tally, Tally { score: 5, user_vote: VoteValue::Up });
    }

    #[test]
    fn observe_post_rewrites_fields() {
        let board = board();
        board.cache().put(&Subject::post("p1"), VoteValue::Down).unwrap();
        let mut post: Post = serde_json::from_value(serde_json::json!({
            "id": "p1", "score": 3, "user_vote": 1
        }))
        .unwrap();
        board.observe_post(&mut post);
        assert_eq!(post.user_vote, Some(VoteValue::Down));
        assert_eq!(post.score, 1);
    }

    struct FixedSink(VoteReceipt);

    #[async_trait]
    impl VoteSink for FixedSink {
        async fn submit(&self, _: &Subject, _: VoteValue) -> ClientResult<VoteReceipt> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn vote_round_trip_through_sink() {
        let board = board();
        let subject = Subject::project("1");
        board.observe(&subject, 5, Some(VoteValue::Neutral));

        let tally = board
            .vote(&FixedSink(receipt(6, 1)), &subject, VoteDirection::Up)
            .await
            .unwrap();
        assert_eq!(tally, Tally { score: 6, user_vote: VoteValue::Up });
    }

    #[test]
    fn cache_lists_entries() {
        let board = board();
        board.cache().put(&Subject::post("1"), VoteValue::Up).unwrap();
        board.cache().confirm(&Subject::project("2"), VoteValue::Down).unwrap();
        let all = board.cache().all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].subject_kind, "post");
        assert!(!all[0].confirmed);
        assert_eq!(all[1].value, -1);
        assert!(all[1].confirmed);

        let pending = board.cache().unconfirmed().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].subject_id, "1");
    }

    #[tokio::test]
    async fn accepted_vote_is_not_counted_twice_on_reload() {
        let cache = VoteCache::new(db::memory_pool().unwrap());
        let board = VoteBoard::new(cache.clone());
        let subject = Subject::post("1");
        board.observe(&subject, 4, Some(VoteValue::Neutral));

        let ok = VoteReceipt {
            message: Some("ok".into()),
            ..VoteReceipt::default()
        };
        let tally = board
            .vote(&FixedSink(ok), &subject, VoteDirection::Up)
            .await
            .unwrap();
        assert_eq!(tally, Tally { score: 5, user_vote: VoteValue::Up });
        assert!(cache.entry(&subject).unwrap().unwrap().confirmed);

        // A later listing already counts the vote but leaves out user_vote.
        let reloaded = VoteBoard::new(cache);
        let mut post: Post =
            serde_json::from_value(serde_json::json!({ "id": 1, "score": 5 })).unwrap();
        reloaded.observe_post(&mut post);
        assert_eq!(post.score, 5);
        assert_eq!(post.user_vote, Some(VoteValue::Up));
    }

    #[test]
    fn unconfirmed_vote_shifts_aggregate_when_server_is_silent() {
        let board = board();
        let subject = Subject::post("8");
        board.cache().put(&subject, VoteValue::Up).unwrap();

        let tally = board.observe(&subject, 4, None);
        assert_eq!(tally, Tally { score: 5, user_vote: VoteValue::Up });
        assert!(!board.cache().entry(&subject).unwrap().unwrap().confirmed);
    }

    #[test]
    fn server_reporting_the_cached_vote_confirms_it() {
        let board = board();
        let subject = Subject::project("3");
        board.cache().put(&subject, VoteValue::Down).unwrap();

        let tally = board.observe(&subject, 7, Some(VoteValue::Down));
        assert_eq!(tally, Tally { score: 7, user_vote: VoteValue::Down });
        assert!(board.cache().entry(&subject).unwrap().unwrap().confirmed);

        // Later payloads that omit user_vote no longer shift the score.
        let tally = board.observe(&subject, 7, None);
        assert_eq!(tally, Tally { score: 7, user_vote: VoteValue::Down });
    }

    #[test]
    fn confirmed_vote_yields_to_a_different_server_vote() {
        let board = board();
        let subject = Subject::post("4");
        board.cache().confirm(&subject, VoteValue::Up).unwrap();

        let tally = board.observe(&subject, 10, Some(VoteValue::Down));
        assert_eq!(tally, Tally { score: 10, user_vote: VoteValue::Down });
        assert_eq!(board.cache().get(&subject).unwrap(), Some(VoteValue::Down));
    }

    #[test]
    fn failed_change_restores_confirmed_vote() {
        let board = board();
        let subject = Subject::post("5");
        board.cache().confirm(&subject, VoteValue::Up).unwrap();
        board.observe(&subject, 3, None);

        let pending = board.begin(&subject, VoteDirection::Down).unwrap();
        assert_eq!(pending.optimistic, Tally { score: 1, user_vote: VoteValue::Down });
        board.settle(pending, Err(ClientError::Timeout));

        let cached = board.cache().entry(&subject).unwrap().unwrap();
        assert_eq!(cached.value, 1);
        assert!(cached.confirmed);
        assert_eq!(board.tally(&subject).unwrap(), Tally { score: 3, user_vote: VoteValue::Up });
    }
}
