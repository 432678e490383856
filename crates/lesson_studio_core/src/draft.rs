//! crates/lesson_studio_core/src/draft.rs
//!
//! Debounced local persistence of an in-progress editor form.
//!
//! Each editor instance owns one [`DraftStore`], keyed by a [`DraftKey`] built
//! from the editing admin and the route identifiers. Edits mark the store dirty and (re)arm a timer;
//! once the form has been quiet for the debounce interval the whole form is
//! serialized and written to a [`DraftSlot`]. Dropping the store cancels any
//! pending timer.
//!
//! ```text
//! Clean --edit--> Dirty --quiet period--> Clean
//! Dirty --begin_submit--> Submitting --ok--> Clean (draft cleared)
//!                                    --err--> Dirty (draft kept, timer re-armed)
//! ```

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ports::{DraftSlot, PortError, PortResult};

/// Bumped whenever the persisted layout changes; older drafts are ignored.
pub const DRAFT_FORMAT_VERSION: u32 = 1;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1200);

//=========================================================================================
// Keys and Payloads
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftKind {
    Lesson,
    Quiz,
}

impl DraftKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DraftKind::Lesson => "lesson",
            DraftKind::Quiz => "quiz",
        }
    }
}

impl fmt::Display for DraftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The route identifiers an editor was opened with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftScope {
    pub topic_id: Option<Uuid>,
    pub lesson_id: Option<Uuid>,
}

/// Versioned slot key, e.g. `lesson-draft:v1:<owner>:<topic>:<lesson>`.
///
/// Drafts belong to the admin editing them; two admins on the same route never
/// share a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DraftKey {
    owner: Uuid,
    kind: DraftKind,
    scope: DraftScope,
    rendered: String,
}

impl DraftKey {
    pub fn new(owner: Uuid, kind: DraftKind, scope: DraftScope) -> Self {
        let kind_name = kind.as_str();
        let id = |v: Option<Uuid>| v.map_or_else(|| "new".to_string(), |u| u.to_string());
        let rendered = format!(
            "{kind_name}-draft:v{DRAFT_FORMAT_VERSION}:{owner}:{}:{}",
            id(scope.topic_id),
            id(scope.lesson_id)
        );
        Self {
            owner,
            kind,
            scope,
            rendered,
        }
    }

    /// The same owner and editor kind, for different route identifiers.
    pub fn with_scope(&self, scope: DraftScope) -> Self {
        Self::new(self.owner, self.kind, scope)
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    pub fn kind(&self) -> DraftKind {
        self.kind
    }

    pub fn scope(&self) -> DraftScope {
        self.scope
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for DraftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// What gets written to the slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft<T> {
    pub version: u32,
    pub owner: Uuid,
    pub kind: DraftKind,
    pub scope: DraftScope,
    pub saved_at: DateTime<Utc>,
    pub form: T,
}

//=========================================================================================
// Store State
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftStatus {
    Clean,
    Dirty,
    Submitting,
}

/// Published to subscribers after every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftState {
    pub status: DraftStatus,
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl DraftState {
    pub fn is_dirty(&self) -> bool {
        self.status != DraftStatus::Clean
    }
}

/// Answer to "may the user leave this editor now?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitGuard {
    Allow,
    ConfirmRequired,
}

#[derive(Debug, Clone, Copy)]
pub struct DraftConfig {
    pub debounce: Duration,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("Failed to serialize draft: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write draft: {0}")]
    Slot(#[from] PortError),
}

struct Inner<T> {
    /// Where the form is persisted. Replaced when a new record gets its id.
    key: DraftKey,
    form: T,
    status: DraftStatus,
    /// Incremented on every edit; lets a finished write tell whether it is stale.
    revision: u64,
    submit_revision: u64,
    last_saved_at: Option<DateTime<Utc>>,
    pending: Option<CancellationToken>,
}

impl<T> Inner<T> {
    fn state(&self) -> DraftState {
        DraftState {
            status: self.status,
            last_saved_at: self.last_saved_at,
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

struct Shared<T> {
    slot: Arc<dyn DraftSlot>,
    inner: Mutex<Inner<T>>,
    /// Serializes slot writes and removals so a late write cannot resurrect a cleared draft.
    io: Mutex<()>,
    state_tx: watch::Sender<DraftState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Debounce,
    Explicit,
}

impl<T: Serialize + Send + 'static> Shared<T> {
    fn publish(&self, inner: &Inner<T>) {
        self.state_tx.send_replace(inner.state());
    }

    async fn key(&self) -> DraftKey {
        self.inner.lock().await.key.clone()
    }

    async fn persist(&self, trigger: Trigger) -> Result<Option<DateTime<Utc>>, DraftError> {
        let _io = self.io.lock().await;
        let (key, payload, revision, saved_at) = {
            let inner = self.inner.lock().await;
            let skip = match trigger {
                Trigger::Debounce => inner.status != DraftStatus::Dirty,
                // A clean form is either saved already or was just submitted.
                Trigger::Explicit => inner.status == DraftStatus::Clean,
            };
            if skip {
                return Ok(None);
            }
            let saved_at = Utc::now();
            let draft = Draft {
                version: DRAFT_FORMAT_VERSION,
                owner: inner.key.owner(),
                kind: inner.key.kind(),
                scope: inner.key.scope(),
                saved_at,
                form: &inner.form,
            };
            (
                inner.key.clone(),
                serde_json::to_string(&draft)?,
                inner.revision,
                saved_at,
            )
        };

        self.slot.write(key.as_str(), &payload).await?;

        let mut inner = self.inner.lock().await;
        inner.last_saved_at = Some(saved_at);
        if inner.status == DraftStatus::Dirty && inner.revision == revision {
            inner.status = DraftStatus::Clean;
        }
        self.publish(&inner);
        debug!(%key, ?trigger, "Draft persisted.");
        Ok(Some(saved_at))
    }
}

//=========================================================================================
// DraftStore
//=========================================================================================

/// Instance-scoped draft persistence for one editor form.
pub struct DraftStore<T> {
    shared: Arc<Shared<T>>,
    debounce: Duration,
    teardown: CancellationToken,
}

impl<T> DraftStore<T>
where
    T: Serialize + Send + 'static,
{
    /// Creates a clean store around a freshly initialized or restored form.
    pub fn new(slot: Arc<dyn DraftSlot>, key: DraftKey, config: DraftConfig, form: T) -> Self {
        let inner = Inner {
            key,
            form,
            status: DraftStatus::Clean,
            revision: 0,
            submit_revision: 0,
            last_saved_at: None,
            pending: None,
        };
        let (state_tx, _) = watch::channel(inner.state());
        Self {
            shared: Arc::new(Shared {
                slot,
                inner: Mutex::new(inner),
                io: Mutex::new(()),
                state_tx,
            }),
            debounce: config.debounce,
            teardown: CancellationToken::new(),
        }
    }

    /// Like [`DraftStore::new`], but remembers when the restored draft was saved.
    pub fn from_draft(slot: Arc<dyn DraftSlot>, key: DraftKey, config: DraftConfig, draft: Draft<T>) -> Self {
        let store = Self::new(slot, key, config, draft.form);
        // Nothing else can hold the lock yet.
        if let Ok(mut inner) = store.shared.inner.try_lock() {
            inner.last_saved_at = Some(draft.saved_at);
            store.shared.publish(&inner);
        }
        store
    }

    pub async fn key(&self) -> DraftKey {
        self.shared.key().await
    }

    pub fn state(&self) -> DraftState {
        *self.shared.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<DraftState> {
        self.shared.state_tx.subscribe()
    }

    pub async fn snapshot(&self) -> T
    where
        T: Clone,
    {
        self.shared.inner.lock().await.form.clone()
    }

    /// Reads the form without marking anything dirty.
    pub async fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let inner = self.shared.inner.lock().await;
        f(&inner.form)
    }

    /// Applies a mutation and marks the form dirty.
    pub async fn edit<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut inner = self.shared.inner.lock().await;
        let out = f(&mut inner.form);
        self.mark_dirty_locked(&mut inner);
        out
    }

    /// Applies a fallible mutation; only a successful one marks the form dirty.
    pub async fn try_edit<R, E>(&self, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E> {
        let mut inner = self.shared.inner.lock().await;
        let out = f(&mut inner.form)?;
        self.mark_dirty_locked(&mut inner);
        Ok(out)
    }

    /// Flags unpersisted changes and restarts the quiet-period timer.
    pub async fn mark_dirty(&self) {
        let mut inner = self.shared.inner.lock().await;
        self.mark_dirty_locked(&mut inner);
    }

    fn mark_dirty_locked(&self, inner: &mut Inner<T>) {
        inner.revision += 1;
        if inner.status == DraftStatus::Clean {
            inner.status = DraftStatus::Dirty;
        }
        self.shared.publish(inner);
        // A submission in flight decides what happens next.
        if inner.status == DraftStatus::Dirty {
            self.arm(inner);
        }
    }

    fn arm(&self, inner: &mut Inner<T>) {
        inner.cancel_pending();
        let token = self.teardown.child_token();
        inner.pending = Some(token.clone());

        let shared = Arc::clone(&self.shared);
        let debounce = self.debounce;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(debounce) => {
                    if let Err(e) = shared.persist(Trigger::Debounce).await {
                        let key = shared.key().await;
                        warn!(%key, "Draft autosave failed; keeping changes in memory: {}", e);
                    }
                }
            }
        });
    }

    /// Writes the current form immediately, bypassing the debounce.
    ///
    /// Returns `None` without writing when there is nothing unsaved, so a
    /// request after a successful submission does not bring the draft back.
    pub async fn save_now(&self) -> Result<Option<DateTime<Utc>>, DraftError> {
        self.shared.inner.lock().await.cancel_pending();
        self.shared.persist(Trigger::Explicit).await
    }

    /// Removes the persisted draft. The in-memory form is kept.
    pub async fn clear(&self) -> PortResult<()> {
        let key = {
            let mut inner = self.shared.inner.lock().await;
            inner.cancel_pending();
            inner.status = DraftStatus::Clean;
            self.shared.publish(&inner);
            inner.key.clone()
        };
        let _io = self.shared.io.lock().await;
        self.shared.slot.remove(key.as_str()).await
    }

    /// Moves the store to the slot for `scope`, e.g. once a new record has an id.
    ///
    /// Later writes go to the new key and the draft under the old key is
    /// removed. A pending autosave is kept and lands under the new key.
    pub async fn rekey(&self, scope: DraftScope) -> PortResult<()> {
        let _io = self.shared.io.lock().await;
        let old = {
            let mut inner = self.shared.inner.lock().await;
            let new = inner.key.with_scope(scope);
            if new == inner.key {
                return Ok(());
            }
            std::mem::replace(&mut inner.key, new)
        };
        debug!(from = %old, "Draft store rekeyed.");
        self.shared.slot.remove(old.as_str()).await
    }

    /// Enters `Submitting` and returns the form to submit.
    pub async fn begin_submit(&self) -> T
    where
        T: Clone,
    {
        let mut inner = self.shared.inner.lock().await;
        inner.cancel_pending();
        inner.status = DraftStatus::Submitting;
        inner.submit_revision = inner.revision;
        self.shared.publish(&inner);
        inner.form.clone()
    }

    /// Leaves `Submitting`.
    ///
    /// On success the draft is cleared; edits made during the submission put
    /// the store back to `Dirty`. On failure the store returns to `Dirty` and
    /// the timer is re-armed so the draft is kept for a retry.
    pub async fn finish_submit(&self, succeeded: bool) -> PortResult<()> {
        if !succeeded {
            let mut inner = self.shared.inner.lock().await;
            if inner.status == DraftStatus::Submitting {
                inner.status = DraftStatus::Dirty;
                self.shared.publish(&inner);
                self.arm(&mut inner);
            }
            return Ok(());
        }

        let key = self.shared.key().await;
        {
            let _io = self.shared.io.lock().await;
            self.shared.slot.remove(key.as_str()).await?;
        }
        let mut inner = self.shared.inner.lock().await;
        if inner.status != DraftStatus::Submitting {
            return Ok(());
        }
        if inner.revision == inner.submit_revision {
            inner.status = DraftStatus::Clean;
            self.shared.publish(&inner);
        } else {
            inner.status = DraftStatus::Dirty;
            self.shared.publish(&inner);
            self.arm(&mut inner);
        }
        Ok(())
    }

    pub fn exit_guard(&self) -> ExitGuard {
        if self.state().is_dirty() {
            ExitGuard::ConfirmRequired
        } else {
            ExitGuard::Allow
        }
    }
}

impl<T> Drop for DraftStore<T> {
    fn drop(&mut self) {
        self.teardown.cancel();
    }
}

/// Looks up a persisted draft for `key`.
///
/// A draft is only returned when it was written in the current format by the
/// same admin, for the same kind of editor and the same route identifiers.
pub async fn restore<T: DeserializeOwned>(
    slot: &dyn DraftSlot,
    key: &DraftKey,
) -> PortResult<Option<Draft<T>>> {
    let Some(payload) = slot.read(key.as_str()).await? else {
        return Ok(None);
    };
    let draft: Draft<T> = match serde_json::from_str(&payload) {
        Ok(d) => d,
        Err(e) => {
            warn!(key = %key, "Ignoring unreadable draft: {}", e);
            return Ok(None);
        }
    };
    if draft.version != DRAFT_FORMAT_VERSION
        || draft.owner != key.owner()
        || draft.kind != key.kind()
        || draft.scope != key.scope()
    {
        warn!(key = %key, "Ignoring draft written for a different editor.");
        return Ok(None);
    }
    Ok(Some(draft))
}

//=========================================================================================
// In-memory Slot
//=========================================================================================

/// A process-local [`DraftSlot`].
#[derive(Default)]
pub struct MemoryDraftSlot {
    entries: std::sync::Mutex<HashMap<String, String>>,
}

impl MemoryDraftSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> PortResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| PortError::Unexpected("draft slot lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl DraftSlot for MemoryDraftSlot {
    async fn read(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    async fn write(&self, key: &str, payload: &str) -> PortResult<()> {
        self.entries()?.insert(key.to_string(), payload.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}
