use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::models::HistoryEntry;

pub type SessionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Processing,
}

/// Append-only list of successful analyses, oldest first.
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    history: History,
    state: SessionState,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            history: History::default(),
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn begin_processing(&mut self) {
        self.state = SessionState::Processing;
    }

    pub fn finish_processing(&mut self) {
        self.state = SessionState::Idle;
    }

    pub fn record(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }
}

/// A stored session and the last time a request opened it (unix millis).
struct Slot {
    session: Arc<Mutex<Session>>,
    last_seen_ms: AtomicI64,
}

impl Slot {
    fn new(session: Arc<Mutex<Session>>, now: DateTime<Utc>) -> Self {
        Self {
            session,
            last_seen_ms: AtomicI64::new(now.timestamp_millis()),
        }
    }

    /// A request still holds the session between lookup and response.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.session) > 1
    }

    fn is_live(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        let idle_ms = now.timestamp_millis() - self.last_seen_ms.load(Ordering::Acquire);
        self.in_use() || idle_ms <= ttl.num_milliseconds()
    }
}

/// All live sessions. Each session sits behind its own mutex, which is held
/// for the whole of a submission so interactions within a session never overlap.
/// Idle time is measured from the last request that opened the session.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Slot>>,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn new(ttl: std::time::Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn get_or_create(&self, id: Option<SessionId>) -> (SessionId, Arc<Mutex<Session>>) {
        self.get_or_create_at(id, Utc::now()).await
    }

    /// Returns the session for `id` and marks it seen at `now`, or starts a
    /// fresh one when the id is unknown, absent or already past its TTL.
    pub async fn get_or_create_at(
        &self,
        id: Option<SessionId>,
        now: DateTime<Utc>,
    ) -> (SessionId, Arc<Mutex<Session>>) {
        if let Some(id) = id {
            let sessions = self.sessions.read().await;
            if let Some(slot) = sessions.get(&id) {
                if slot.is_live(now, self.ttl) {
                    // Cloned under the map lock, so the sweeper sees it in use.
                    slot.last_seen_ms.store(now.timestamp_millis(), Ordering::Release);
                    return (id, slot.session.clone());
                }
                log::info!("⌛ Session {} expired, starting a new one", id);
            }
        }

        let new_id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(Session::new(new_id)));

        let mut sessions = self.sessions.write().await;
        if let Some(expired) = id {
            if sessions.get(&expired).is_some_and(|slot| !slot.is_live(now, self.ttl)) {
                sessions.remove(&expired);
            }
        }
        sessions.insert(new_id, Slot::new(session.clone(), now));
        log::info!("🆕 New session started: {}", new_id);

        (new_id, session)
    }

    /// Drops sessions idle for longer than the TTL. Sessions a request is
    /// still holding are kept.
    pub async fn prune_idle(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|_, slot| slot.is_live(now, self.ttl));

        let removed = before - sessions.len();
        if removed > 0 {
            log::info!("🧹 Removed {} idle session(s), {} remaining", removed, sessions.len());
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, ImagePayload};
    use std::time::Duration;

    fn entry(prompt: &str) -> HistoryEntry {
        HistoryEntry {
            prompt: prompt.to_string(),
            result: AnalysisResult {
                text: format!("result for {}", prompt),
            },
            image: Arc::new(ImagePayload::new("image/jpeg", vec![0xff, 0xd8])),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_history_keeps_insertion_order() {
        let mut session = Session::new(Uuid::new_v4());
        for prompt in ["first", "second", "third"] {
            session.record(entry(prompt));
        }

        let prompts: Vec<&str> = session.history().iter().map(|e| e.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["first", "second", "third"]);

        // Reading twice yields the same entries.
        let again: Vec<&str> = session.history().iter().map(|e| e.prompt.as_str()).collect();
        assert_eq!(prompts, again);
        assert_eq!(session.history().len(), 3);
    }

    #[test]
    fn test_state_transitions() {
        let mut session = Session::new(Uuid::new_v4());
        assert_eq!(session.state(), SessionState::Idle);
        session.begin_processing();
        assert_eq!(session.state(), SessionState::Processing);
        session.finish_processing();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_known_ids() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (id, session) = store.get_or_create(None).await;
        session.lock().await.record(entry("kept"));

        let (same_id, same) = store.get_or_create(Some(id)).await;
        assert_eq!(id, same_id);
        assert_eq!(same.lock().await.history().len(), 1);

        let (other_id, _) = store.get_or_create(Some(Uuid::new_v4())).await;
        assert_ne!(other_id, id);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_prune_idle_sessions() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (idle_id, _) = store.get_or_create(None).await;
        let (busy_id, busy) = store.get_or_create(None).await;

        let later = Utc::now() + chrono::Duration::minutes(5);
        let _guard = busy.lock().await;

        assert_eq!(store.prune_idle(later).await, 1);
        assert_eq!(store.len().await, 1);

        let (id, _) = store.get_or_create(Some(busy_id)).await;
        assert_eq!(id, busy_id);
        let (id, _) = store.get_or_create(Some(idle_id)).await;
        assert_ne!(id, idle_id);
    }

    #[tokio::test]
    async fn test_sweep_between_lookup_and_lock_keeps_session() {
        let store = SessionStore::new(Duration::from_secs(60));
        let start = Utc::now();
        let (id, session) = store.get_or_create_at(None, start).await;

        // The handler holds the Arc but has not locked it yet.
        assert_eq!(store.prune_idle(start + chrono::Duration::minutes(2)).await, 0);

        session.lock().await.record(entry("dinner"));
        drop(session);

        let (same_id, same) = store
            .get_or_create_at(Some(id), start + chrono::Duration::seconds(30))
            .await;
        assert_eq!(same_id, id);
        assert_eq!(same.lock().await.history().len(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_lookup_refreshes_idle_time() {
        let store = SessionStore::new(Duration::from_secs(60));
        let start = Utc::now();
        let (id, _) = store.get_or_create_at(None, start).await;

        let (same_id, _) = store
            .get_or_create_at(Some(id), start + chrono::Duration::seconds(50))
            .await;
        assert_eq!(same_id, id);

        // 100s after creation but only 50s after the last lookup.
        assert_eq!(store.prune_idle(start + chrono::Duration::seconds(100)).await, 0);
        assert_eq!(store.prune_idle(start + chrono::Duration::seconds(111)).await, 1);
    }

    #[tokio::test]
    async fn test_expired_session_is_not_revived() {
        let store = SessionStore::new(Duration::from_secs(60));
        let start = Utc::now();
        let (id, session) = store.get_or_create_at(None, start).await;
        session.lock().await.record(entry("old"));
        drop(session);

        // Not swept yet, but past its TTL.
        let (new_id, fresh) = store
            .get_or_create_at(Some(id), start + chrono::Duration::minutes(2))
            .await;
        assert_ne!(new_id, id);
        assert!(fresh.lock().await.history().is_empty());
        assert_eq!(store.len().await, 1);
    }
}
