//! Chat exchange pipeline.
//!
//! Executes exactly one conversational round trip per `send`: persist the
//! user turn, invoke inference, persist the assistant turn, keeping the
//! in-memory transcript consistent enough for display at every step. The
//! pipeline favors responsiveness (immediate local echo) over strict
//! server-confirmed consistency; the only writer to a given (clone, user)
//! transcript is its own session.
//!
//! The transcript is split into two containers: `confirmed` holds turns the
//! store has acknowledged, `overlay` holds optimistic local turns that are
//! reconciled into `confirmed` once their write succeeds, or rolled back if
//! it fails.

pub mod handlers;
pub mod store;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::inference::{InferenceGateway, InferenceRequest};
use crate::models::clone::CloneRow;
use crate::models::message::{ChatMessageRow, Role};
use store::{MessageStore, NewMessage};

/// Outcome of one `send` call.
///
/// `Ignored` and `Busy` are no-ops by contract: no gateway call was issued
/// and the transcript was not touched.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    Completed {
        user_message: ChatMessageRow,
        assistant_message: ChatMessageRow,
    },
    /// Input was empty after trimming.
    Ignored,
    /// An exchange for this session is already in flight.
    Busy,
}

#[derive(Default)]
struct Transcript {
    confirmed: Vec<ChatMessageRow>,
    overlay: Vec<ChatMessageRow>,
}

impl Transcript {
    /// Display order: ascending by `created_at` across both containers. An
    /// overlay entry is usually the newest turn, but a reply whose write
    /// failed stays in the overlay across later exchanges and must still
    /// render in its own exchange's position.
    fn messages(&self) -> Vec<ChatMessageRow> {
        let mut all = self.confirmed.clone();
        all.extend(self.overlay.iter().cloned());
        all.sort_by_key(|m| m.created_at);
        all
    }

    fn drop_overlay(&mut self, id: Uuid) {
        self.overlay.retain(|m| m.id != id);
    }

    /// Moves an optimistic turn into the confirmed transcript, replacing it
    /// with the row the store actually wrote (server id and timestamp).
    fn confirm(&mut self, local_id: Uuid, stored: ChatMessageRow) {
        self.drop_overlay(local_id);
        self.confirmed.push(stored);
    }
}

/// One chat session for a (clone, user) pair.
///
/// `pending` is a compare-and-set boolean guard, not a lock: a `send`
/// arriving while another is in flight observes `Busy` and does no work.
/// At most one exchange per session is ever in flight.
pub struct ChatSession {
    clone_id: Uuid,
    user_id: Uuid,
    pending: AtomicBool,
    transcript: Mutex<Transcript>,
}

impl ChatSession {
    pub fn new(clone_id: Uuid, user_id: Uuid) -> Self {
        Self {
            clone_id,
            user_id,
            pending: AtomicBool::new(false),
            transcript: Mutex::new(Transcript::default()),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Current transcript in display order.
    pub async fn transcript(&self) -> Vec<ChatMessageRow> {
        self.transcript.lock().await.messages()
    }

    /// Replaces the confirmed transcript wholesale with the persisted
    /// messages for this session, ascending by `created_at`, and clears any
    /// stale overlay. Idempotent when no writes intervene.
    pub async fn load(&self, store: &dyn MessageStore) -> Result<Vec<ChatMessageRow>, AppError> {
        let rows = store.list(self.clone_id, self.user_id).await?;
        let mut transcript = self.transcript.lock().await;
        transcript.confirmed = rows;
        transcript.overlay.clear();
        Ok(transcript.messages())
    }

    /// Executes one round trip: persist user turn, infer, persist assistant
    /// turn. Strictly sequential; each step observes the prior step's success
    /// before proceeding. No timeout, no retry, no cancellation.
    pub async fn send(
        &self,
        store: &dyn MessageStore,
        inference: &dyn InferenceGateway,
        clone: &CloneRow,
        text: &str,
    ) -> Result<SendOutcome, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SendOutcome::Ignored);
        }
        if self
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(SendOutcome::Busy);
        }

        let result = self.exchange(store, inference, clone, text).await;
        self.pending.store(false, Ordering::Release);
        result
    }

    async fn exchange(
        &self,
        store: &dyn MessageStore,
        inference: &dyn InferenceGateway,
        clone: &CloneRow,
        text: &str,
    ) -> Result<SendOutcome, AppError> {
        // Optimistic local echo of the user turn.
        let local_user = ChatMessageRow::local(self.clone_id, self.user_id, Role::User, text);
        self.transcript.lock().await.overlay.push(local_user.clone());

        // Persist the user turn. On failure the optimistic entry is rolled
        // back, leaving the transcript exactly as before the call.
        let stored_user = match store
            .insert(NewMessage {
                clone_id: self.clone_id,
                user_id: self.user_id,
                role: Role::User,
                message: text,
            })
            .await
        {
            Ok(row) => row,
            Err(e) => {
                self.transcript.lock().await.drop_overlay(local_user.id);
                return Err(e);
            }
        };
        self.transcript
            .lock()
            .await
            .confirm(local_user.id, stored_user.clone());

        // Inference. On failure the user turn stays as a dangling question;
        // retry is a manual resend.
        let reply = inference
            .reply(InferenceRequest {
                clone_id: self.clone_id,
                message: text,
                clone_name: &clone.name,
                personality_description: clone.personality_description.as_deref(),
            })
            .await
            .map_err(|e| AppError::Inference(e.to_string()))?;

        // Persist the assistant turn. A failed write here is logged but not
        // surfaced: the reply is still shown from the overlay, an accepted
        // inconsistency between transcript and storage.
        let assistant_message = match store
            .insert(NewMessage {
                clone_id: self.clone_id,
                user_id: self.user_id,
                role: Role::Assistant,
                message: &reply,
            })
            .await
        {
            Ok(row) => {
                self.transcript.lock().await.confirmed.push(row.clone());
                row
            }
            Err(e) => {
                warn!(
                    "Assistant turn for clone {} not persisted: {e}",
                    self.clone_id
                );
                let local =
                    ChatMessageRow::local(self.clone_id, self.user_id, Role::Assistant, &reply);
                self.transcript.lock().await.overlay.push(local.clone());
                local
            }
        };

        Ok(SendOutcome::Completed {
            user_message: stored_user,
            assistant_message,
        })
    }
}

/// Registry of live chat sessions, keyed by (clone, user).
///
/// Sessions live for the life of the process; nothing is evicted, so the
/// registry grows with the number of distinct (clone, user) pairs chatted
/// with since startup.
// TODO: evict sessions idle past a TTL once a deployment needs it.
#[derive(Clone, Default)]
pub struct ChatSessions {
    inner: Arc<Mutex<HashMap<(Uuid, Uuid), Arc<ChatSession>>>>,
}

impl ChatSessions {
    pub async fn get_or_create(&self, clone_id: Uuid, user_id: Uuid) -> Arc<ChatSession> {
        let mut sessions = self.inner.lock().await;
        sessions
            .entry((clone_id, user_id))
            .or_insert_with(|| Arc::new(ChatSession::new(clone_id, user_id)))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::InferenceError;
    use crate::models::clone::TrainingStatus;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    struct MockStore {
        rows: Mutex<Vec<ChatMessageRow>>,
        insert_calls: AtomicUsize,
        fail_user_insert: AtomicBool,
        fail_assistant_insert: AtomicBool,
    }

    impl MockStore {
        fn new() -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
                insert_calls: AtomicUsize::new(0),
                fail_user_insert: AtomicBool::new(false),
                fail_assistant_insert: AtomicBool::new(false),
            }
        }

        async fn persisted(&self) -> Vec<ChatMessageRow> {
            self.rows.lock().await.clone()
        }
    }

    #[async_trait]
    impl MessageStore for MockStore {
        async fn insert(&self, new: NewMessage<'_>) -> Result<ChatMessageRow, AppError> {
            self.insert_calls.fetch_add(1, Ordering::SeqCst);
            let fail = match new.role {
                Role::User => self.fail_user_insert.load(Ordering::SeqCst),
                Role::Assistant => self.fail_assistant_insert.load(Ordering::SeqCst),
            };
            if fail {
                return Err(AppError::Internal(anyhow::anyhow!("insert refused")));
            }
            let row = ChatMessageRow {
                id: Uuid::new_v4(),
                clone_id: new.clone_id,
                user_id: new.user_id,
                role: new.role,
                message: new.message.to_string(),
                created_at: Utc::now(),
            };
            self.rows.lock().await.push(row.clone());
            Ok(row)
        }

        async fn list(
            &self,
            clone_id: Uuid,
            user_id: Uuid,
        ) -> Result<Vec<ChatMessageRow>, AppError> {
            let mut rows: Vec<_> = self
                .rows
                .lock()
                .await
                .iter()
                .filter(|m| m.clone_id == clone_id && m.user_id == user_id)
                .cloned()
                .collect();
            rows.sort_by_key(|m| m.created_at);
            Ok(rows)
        }
    }

    struct MockInference {
        reply: Option<String>,
        calls: AtomicUsize,
        // When set, `reply` signals `entered` and then waits for `release`,
        // keeping the exchange in flight until the test lets it go.
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
    }

    impl MockInference {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }
    }

    #[async_trait]
    impl InferenceGateway for MockInference {
        async fn reply(&self, _request: InferenceRequest<'_>) -> Result<String, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }
            self.reply.clone().ok_or(InferenceError::EmptyContent)
        }
    }

    fn test_clone(user_id: Uuid) -> CloneRow {
        CloneRow {
            id: Uuid::new_v4(),
            user_id,
            name: "Alex".to_string(),
            personality_description: Some("dry humor".to_string()),
            avatar_url: None,
            training_status: TrainingStatus::Completed,
            accuracy_score: 80,
            uploaded_image_count: 10,
            message_count: 0,
            last_active: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_send_appends_user_then_assistant() {
        let user_id = Uuid::new_v4();
        let clone = test_clone(user_id);
        let session = ChatSession::new(clone.id, user_id);
        let store = MockStore::new();
        let inference = MockInference::replying("hey, what's up");

        let outcome = session.send(&store, &inference, &clone, "hi").await.unwrap();
        assert!(matches!(outcome, SendOutcome::Completed { .. }));

        let transcript = session.transcript().await;
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[0].message, "hi");
        assert_eq!(transcript[1].role, Role::Assistant);
        assert_eq!(transcript[1].message, "hey, what's up");

        // Both turns persisted, user first.
        let persisted = store.persisted().await;
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[0].role, Role::User);
        assert_eq!(persisted[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_empty_and_whitespace_send_is_noop() {
        let user_id = Uuid::new_v4();
        let clone = test_clone(user_id);
        let session = ChatSession::new(clone.id, user_id);
        let store = MockStore::new();
        let inference = MockInference::replying("unused");

        for text in ["", "   ", "\n\t"] {
            let outcome = session.send(&store, &inference, &clone, text).await.unwrap();
            assert!(matches!(outcome, SendOutcome::Ignored));
        }

        assert!(session.transcript().await.is_empty());
        assert_eq!(store.insert_calls.load(Ordering::SeqCst), 0);
        assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_send_while_in_flight_is_busy_noop() {
        let user_id = Uuid::new_v4();
        let clone = test_clone(user_id);
        let session = Arc::new(ChatSession::new(clone.id, user_id));
        let store = Arc::new(MockStore::new());

        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let gated = Arc::new(MockInference {
            reply: Some("slow reply".to_string()),
            calls: AtomicUsize::new(0),
            gate: Some((entered.clone(), release.clone())),
        });

        let first = {
            let session = session.clone();
            let store = store.clone();
            let gated = gated.clone();
            let clone = clone.clone();
            tokio::spawn(async move {
                session
                    .send(store.as_ref(), gated.as_ref(), &clone, "first")
                    .await
            })
        };

        // Wait until the first exchange is parked inside inference.
        entered.notified().await;
        assert!(session.is_pending());

        let second = session
            .send(store.as_ref(), gated.as_ref(), &clone, "second")
            .await
            .unwrap();
        assert!(matches!(second, SendOutcome::Busy));
        // Only the first exchange's user turn reached the store.
        assert_eq!(store.insert_calls.load(Ordering::SeqCst), 1);
        assert_eq!(gated.calls.load(Ordering::SeqCst), 1);

        release.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert!(matches!(outcome, SendOutcome::Completed { .. }));
        assert!(!session.is_pending());

        let transcript = session.transcript().await;
        assert_eq!(transcript.len(), 2);
        assert!(transcript.iter().all(|m| m.message != "second"));
    }

    #[tokio::test]
    async fn test_inference_failure_leaves_dangling_user_turn() {
        let user_id = Uuid::new_v4();
        let clone = test_clone(user_id);
        let session = ChatSession::new(clone.id, user_id);
        let store = MockStore::new();
        let inference = MockInference::failing();

        let result = session.send(&store, &inference, &clone, "anyone there?").await;
        assert!(matches!(result, Err(AppError::Inference(_))));

        let transcript = session.transcript().await;
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(store.persisted().await.len(), 1);
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn test_user_write_failure_rolls_back_optimistic_turn() {
        let user_id = Uuid::new_v4();
        let clone = test_clone(user_id);
        let session = ChatSession::new(clone.id, user_id);
        let store = MockStore::new();
        store.fail_user_insert.store(true, Ordering::SeqCst);
        let inference = MockInference::replying("unused");

        let result = session.send(&store, &inference, &clone, "hello").await;
        assert!(result.is_err());

        // The optimistic entry was rolled back; nothing reached inference.
        assert!(session.transcript().await.is_empty());
        assert!(store.persisted().await.is_empty());
        assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn test_assistant_write_failure_still_shows_reply() {
        let user_id = Uuid::new_v4();
        let clone = test_clone(user_id);
        let session = ChatSession::new(clone.id, user_id);
        let store = MockStore::new();
        store.fail_assistant_insert.store(true, Ordering::SeqCst);
        let inference = MockInference::replying("made it anyway");

        let outcome = session.send(&store, &inference, &clone, "hi").await.unwrap();
        assert!(matches!(outcome, SendOutcome::Completed { .. }));

        // Reply visible locally even though only the user turn is stored.
        let transcript = session.transcript().await;
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].message, "made it anyway");
        let persisted = store.persisted().await;
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_unpersisted_reply_keeps_its_place_across_later_exchanges() {
        let user_id = Uuid::new_v4();
        let clone = test_clone(user_id);
        let session = ChatSession::new(clone.id, user_id);
        let store = MockStore::new();
        let inference = MockInference::replying("same reply");

        // First exchange: the assistant write fails, so its reply stays in
        // the overlay.
        store.fail_assistant_insert.store(true, Ordering::SeqCst);
        session.send(&store, &inference, &clone, "first").await.unwrap();

        // Second exchange persists fully.
        store.fail_assistant_insert.store(false, Ordering::SeqCst);
        session.send(&store, &inference, &clone, "second").await.unwrap();

        let transcript = session.transcript().await;
        assert_eq!(transcript.len(), 4);
        // The stale reply must render inside its own exchange, not after the
        // later one.
        assert_eq!(transcript[0].message, "first");
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[1].role, Role::Assistant);
        assert_eq!(transcript[2].message, "second");
        assert_eq!(transcript[2].role, Role::User);
        assert_eq!(transcript[3].role, Role::Assistant);

        let mut sorted = transcript.clone();
        sorted.sort_by_key(|m| m.created_at);
        assert_eq!(
            transcript.iter().map(|m| m.id).collect::<Vec<_>>(),
            sorted.iter().map(|m| m.id).collect::<Vec<_>>(),
            "transcript must stay ascending by created_at"
        );
    }

    #[tokio::test]
    async fn test_load_reproduces_persisted_order_and_is_idempotent() {
        let user_id = Uuid::new_v4();
        let clone = test_clone(user_id);
        let session = ChatSession::new(clone.id, user_id);
        let store = MockStore::new();
        let inference = MockInference::replying("pong");

        session.send(&store, &inference, &clone, "ping").await.unwrap();
        session.send(&store, &inference, &clone, "ping again").await.unwrap();

        let first = session.load(&store).await.unwrap();
        let second = session.load(&store).await.unwrap();

        let ids: Vec<Uuid> = first.iter().map(|m| m.id).collect();
        let ids_again: Vec<Uuid> = second.iter().map(|m| m.id).collect();
        assert_eq!(ids, ids_again);

        let mut sorted = first.clone();
        sorted.sort_by_key(|m| m.created_at);
        assert_eq!(
            ids,
            sorted.iter().map(|m| m.id).collect::<Vec<_>>(),
            "load must yield ascending created_at order"
        );
        assert_eq!(first.len(), 4);
    }

    #[tokio::test]
    async fn test_sessions_registry_returns_same_session() {
        let sessions = ChatSessions::default();
        let clone_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let a = sessions.get_or_create(clone_id, user_id).await;
        let b = sessions.get_or_create(clone_id, user_id).await;
        assert!(Arc::ptr_eq(&a, &b));

        let other = sessions.get_or_create(Uuid::new_v4(), user_id).await;
        assert!(!Arc::ptr_eq(&a, &other));
    }
}
