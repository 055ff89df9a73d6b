//! Persistence coordinator — decides when and where the draft is written.
//!
//! Two independent backends sit behind [`DraftSession`]: a best-effort local
//! snapshot store (debounced auto-save, survives reloads, scoped to one
//! device) and the authoritative server sync (explicit, invoked by
//! navigation). The local cache never participates in conflict resolution;
//! once a server sync succeeds, the server record wins.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{ApiError, ResumeApi};
use crate::models::draft::Draft;

pub mod mapping;
pub mod snapshot;

use self::mapping::{from_server_payload, has_resume_body, profile_payload, to_server_payload};
use self::snapshot::{DraftSnapshot, SnapshotStore, LOCAL_DRAFT_KEY, WIZARD_DRAFT_KEY};

/// Default quiet period between the last edit and the local snapshot write.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(3);

/// Result of one `save_to_backend` call. `None` means the upsert was skipped
/// because its section was empty; the two upserts are independent and partial
/// failure is an accepted state.
#[derive(Debug, Default)]
pub struct SaveOutcome {
    pub profile: Option<Result<(), ApiError>>,
    pub resume: Option<Result<(), ApiError>>,
}

impl SaveOutcome {
    /// True when at least one upsert was attempted.
    pub fn attempted(&self) -> bool {
        self.profile.is_some() || self.resume.is_some()
    }

    /// True when every attempted upsert succeeded.
    pub fn fully_succeeded(&self) -> bool {
        let ok = |r: &Option<Result<(), ApiError>>| r.as_ref().map(Result::is_ok).unwrap_or(true);
        ok(&self.profile) && ok(&self.resume)
    }

    /// Errors to surface as user-visible notifications.
    pub fn failures(&self) -> Vec<&ApiError> {
        [&self.profile, &self.resume]
            .into_iter()
            .filter_map(|r| r.as_ref().and_then(|r| r.as_ref().err()))
            .collect()
    }
}

/// One editing session over one draft. Owned by a single actor; methods take
/// `&self` so the session can be shared with the debounce timer task.
pub struct DraftSession {
    draft: Arc<Mutex<Draft>>,
    store: Arc<dyn SnapshotStore>,
    api: Arc<dyn ResumeApi>,
    debounce: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DraftSession {
    pub fn new(store: Arc<dyn SnapshotStore>, api: Arc<dyn ResumeApi>) -> Self {
        Self::with_debounce(store, api, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(
        store: Arc<dyn SnapshotStore>,
        api: Arc<dyn ResumeApi>,
        debounce: Duration,
    ) -> Self {
        Self {
            draft: Arc::new(Mutex::new(Draft::default())),
            store,
            api,
            debounce,
            pending: Mutex::new(None),
        }
    }

    /// Snapshot of the current draft state.
    pub fn draft(&self) -> Draft {
        lock(&self.draft).clone()
    }

    /// Applies a pure draft operation. If the result is dirty, a local
    /// snapshot write is (re)scheduled after the quiet period, so bursts of
    /// edits coalesce into one write of the final state.
    pub fn apply(&self, op: impl FnOnce(Draft) -> Draft) {
        let is_dirty = {
            let mut guard = lock(&self.draft);
            let current = std::mem::take(&mut *guard);
            *guard = op(current);
            guard.is_dirty
        };
        if is_dirty {
            self.schedule_snapshot();
        }
    }

    /// Writes the wizard snapshot now and cancels any pending timer.
    pub fn flush_snapshot(&self) {
        self.cancel_pending();
        write_snapshot(self.store.as_ref(), &lock(&self.draft));
    }

    /// Restores the wizard draft from the local snapshot, if one exists.
    /// Returns whether a snapshot was installed.
    pub fn resume_from_snapshot(&self) -> bool {
        let Some(snapshot) = read_snapshot(self.store.as_ref(), WIZARD_DRAFT_KEY) else {
            return false;
        };
        *lock(&self.draft) = snapshot.into_draft();
        true
    }

    /// Raw local-only draft for the "continue editing" offer at the creation
    /// entry point. No server traffic.
    pub fn peek_local_draft(&self) -> Option<DraftSnapshot> {
        read_snapshot(self.store.as_ref(), LOCAL_DRAFT_KEY)
    }

    /// Saves the current draft under the independent local-only key.
    pub fn store_local_draft(&self) {
        let snapshot = DraftSnapshot::from(&*lock(&self.draft));
        write_string(self.store.as_ref(), LOCAL_DRAFT_KEY, &snapshot);
    }

    /// Discards only the local-only draft. The server record is untouched.
    pub fn discard_local_draft(&self) {
        self.store.remove(LOCAL_DRAFT_KEY);
    }

    /// Pushes the draft to the server: two independent upserts, each skipped
    /// when its section is empty, each attempted even if the other fails.
    /// The dirty flag is cleared only when every attempted upsert succeeded,
    /// so a retry re-sends the same payload.
    pub async fn save_to_backend(&self, email: &str) -> SaveOutcome {
        let draft = self.draft();
        let mut outcome = SaveOutcome::default();

        if let Some(req) = profile_payload(email, &draft) {
            outcome.profile = Some(self.api.save_profile(&req).await);
        }
        if has_resume_body(&draft) {
            let req = to_server_payload(email, &draft);
            outcome.resume = Some(self.api.save_resume(&req).await);
        }

        for err in outcome.failures() {
            warn!("server sync failed for {email}: {err}");
        }
        if outcome.attempted() && outcome.fully_succeeded() {
            let now = Utc::now();
            self.apply(|d| d.mark_saved(now));
            debug!("server sync completed for {email}");
        }
        outcome
    }

    /// Fetches the profile and résumé bodies and merges them on top of the
    /// current draft through the ordinary section setters.
    pub async fn load_from_backend(&self, email: &str) -> Result<(), ApiError> {
        let (profile, resume) = tokio::join!(
            self.api.get_profile(email),
            self.api.get_resume(email)
        );
        let profile = profile?;
        let resume = resume?;
        self.apply(move |d| from_server_payload(d, profile.as_ref(), resume.as_ref()));
        Ok(())
    }

    fn schedule_snapshot(&self) {
        let draft = Arc::clone(&self.draft);
        let store = Arc::clone(&self.store);
        let debounce = self.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            write_snapshot(store.as_ref(), &lock(&draft));
        });
        if let Some(previous) = lock(&self.pending).replace(handle) {
            previous.abort();
        }
    }

    fn cancel_pending(&self) {
        if let Some(previous) = lock(&self.pending).take() {
            previous.abort();
        }
    }
}

impl Drop for DraftSession {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_snapshot(store: &dyn SnapshotStore, key: &str) -> Option<DraftSnapshot> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            // A corrupt convenience cache is treated as absent.
            warn!("discarding unreadable snapshot '{key}': {e}");
            None
        }
    }
}

fn write_snapshot(store: &dyn SnapshotStore, draft: &Draft) {
    write_string(store, WIZARD_DRAFT_KEY, &DraftSnapshot::from(draft));
}

/// Best-effort: serialization or storage failures are logged and swallowed.
fn write_string(store: &dyn SnapshotStore, key: &str, snapshot: &DraftSnapshot) {
    match serde_json::to_string(snapshot) {
        Ok(json) => {
            if let Err(e) = store.set(key, &json) {
                warn!("local snapshot write failed for '{key}': {e}");
            }
        }
        Err(e) => warn!("local snapshot serialization failed for '{key}': {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::models::draft::{ExperienceEntry, FieldMap, Section};
    use crate::models::resume::{ProfileUpsert, ResumeUpsert};
    use crate::persist::snapshot::MemorySnapshotStore;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Snapshot store that counts writes, for debounce assertions.
    struct CountingStore {
        inner: MemorySnapshotStore,
        writes: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                inner: MemorySnapshotStore::new(),
                writes: AtomicUsize::new(0),
            }
        }

        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    impl SnapshotStore for CountingStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<(), snapshot::SnapshotError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value)
        }
        fn remove(&self, key: &str) {
            self.inner.remove(key)
        }
    }

    #[derive(Default)]
    struct MockApi {
        calls: Mutex<Vec<String>>,
        fail_profile: bool,
        fail_resume: bool,
        profile: Option<Value>,
        resume: Option<Value>,
    }

    impl MockApi {
        fn calls(&self) -> Vec<String> {
            lock(&self.calls).clone()
        }

        fn record(&self, call: impl Into<String>) {
            lock(&self.calls).push(call.into());
        }
    }

    fn failure() -> ApiError {
        ApiError::Api {
            status: 500,
            message: "boom".to_string(),
        }
    }

    #[async_trait]
    impl ResumeApi for MockApi {
        async fn save_profile(&self, req: &ProfileUpsert) -> Result<(), ApiError> {
            self.record(format!("save_profile:{}", req.email));
            if self.fail_profile {
                Err(failure())
            } else {
                Ok(())
            }
        }
        async fn save_resume(&self, req: &ResumeUpsert) -> Result<(), ApiError> {
            self.record(format!("save_resume:{}", req.email));
            if self.fail_resume {
                Err(failure())
            } else {
                Ok(())
            }
        }
        async fn get_profile(&self, _email: &str) -> Result<Option<Value>, ApiError> {
            self.record("get_profile");
            Ok(self.profile.clone())
        }
        async fn get_resume(&self, _email: &str) -> Result<Option<Value>, ApiError> {
            self.record("get_resume");
            Ok(self.resume.clone())
        }
        async fn list_resumes(&self, _user_id: &str) -> Result<Vec<Value>, ApiError> {
            self.record("list_resumes");
            Ok(Vec::new())
        }
        async fn display_name(&self, _user_id: &str) -> Result<Option<String>, ApiError> {
            self.record("display_name");
            Ok(None)
        }
    }

    fn session_with(
        store: Arc<dyn SnapshotStore>,
        api: Arc<dyn ResumeApi>,
    ) -> DraftSession {
        DraftSession::with_debounce(store, api, Duration::from_secs(3))
    }

    fn fields(pairs: &[(&str, Value)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_edits_coalesces_to_one_write() {
        let store = Arc::new(CountingStore::new());
        let session = session_with(store.clone(), Arc::new(MockApi::default()));

        session.apply(|d| d.update_skills("a"));
        session.apply(|d| d.update_skills("ab"));
        session.apply(|d| d.update_skills("abc"));

        tokio::time::sleep(Duration::from_secs(4)).await;

        assert_eq!(store.writes(), 1);
        let raw = store.get(WIZARD_DRAFT_KEY).unwrap();
        let snapshot: DraftSnapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(snapshot.step_data.skills.as_deref(), Some("abc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_write_separately() {
        let store = Arc::new(CountingStore::new());
        let session = session_with(store.clone(), Arc::new(MockApi::default()));

        session.apply(|d| d.update_skills("first"));
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(store.writes(), 1);

        session.apply(|d| d.update_skills("second"));
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_writes_now_and_cancels_timer() {
        let store = Arc::new(CountingStore::new());
        let session = session_with(store.clone(), Arc::new(MockApi::default()));

        session.apply(|d| d.update_skills("x"));
        session.flush_snapshot();
        assert_eq!(store.writes(), 1);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(store.writes(), 1, "cancelled timer must not fire");
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_alone_schedules_nothing() {
        let store = Arc::new(CountingStore::new());
        let session = session_with(store.clone(), Arc::new(MockApi::default()));

        session.apply(|d| d.set_current_step(4));
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_save_clears_dirty_on_full_success() {
        let api = Arc::new(MockApi::default());
        let session = session_with(Arc::new(MemorySnapshotStore::new()), api.clone());
        session.apply(|d| {
            d.update_section(Section::Profile, fields(&[("name", json!("Sato"))]))
                .update_skills("Rust")
        });

        let outcome = session.save_to_backend("a@example.com").await;
        assert!(outcome.attempted());
        assert!(outcome.fully_succeeded());
        assert!(outcome.failures().is_empty());
        assert!(!session.draft().is_dirty);
        assert!(session.draft().last_saved.is_some());
        assert_eq!(
            api.calls(),
            vec!["save_profile:a@example.com", "save_resume:a@example.com"]
        );
    }

    #[tokio::test]
    async fn test_partial_failure_leaves_dirty_and_retries_same_payload() {
        let api = Arc::new(MockApi {
            fail_resume: true,
            ..MockApi::default()
        });
        let session = session_with(Arc::new(MemorySnapshotStore::new()), api.clone());
        session.apply(|d| {
            d.update_section(Section::Profile, fields(&[("name", json!("Sato"))]))
                .update_skills("Rust")
        });

        let outcome = session.save_to_backend("a@example.com").await;
        assert!(outcome.profile.as_ref().unwrap().is_ok());
        assert!(outcome.resume.as_ref().unwrap().is_err());
        assert!(!outcome.fully_succeeded());
        assert_eq!(outcome.failures().len(), 1);
        assert!(session.draft().is_dirty, "failed sync must keep dirty set");

        // Both upserts were attempted despite the resume failure.
        assert_eq!(api.calls().len(), 2);

        // An explicit retry re-sends the same payload.
        let _ = session.save_to_backend("a@example.com").await;
        assert_eq!(api.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_empty_draft_skips_both_upserts() {
        let api = Arc::new(MockApi::default());
        let session = session_with(Arc::new(MemorySnapshotStore::new()), api.clone());

        let outcome = session.save_to_backend("a@example.com").await;
        assert!(!outcome.attempted());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_profile_only_draft_sends_one_upsert() {
        let api = Arc::new(MockApi::default());
        let session = session_with(Arc::new(MemorySnapshotStore::new()), api.clone());
        session.apply(|d| d.update_section(Section::Profile, fields(&[("name", json!("A"))])));

        let outcome = session.save_to_backend("a@example.com").await;
        assert!(outcome.profile.is_some());
        assert!(outcome.resume.is_none());
        assert_eq!(api.calls(), vec!["save_profile:a@example.com"]);
        assert!(!session.draft().is_dirty);
    }

    #[tokio::test]
    async fn test_load_merges_server_data_on_top() {
        let api = Arc::new(MockApi {
            profile: Some(json!({"name": "Sato"})),
            resume: Some(json!({
                "experiences": [{"id": 1, "company": "Acme"}],
                "skill": {"id": 1, "skill": "Rust"}
            })),
            ..MockApi::default()
        });
        let session = session_with(Arc::new(MemorySnapshotStore::new()), api.clone());
        session.apply(|d| {
            d.update_section(Section::Education, fields(&[("school", json!("Kyoto U"))]))
        });

        session.load_from_backend("a@example.com").await.unwrap();

        let draft = session.draft();
        assert_eq!(draft.step_data.profile["name"], json!("Sato"));
        assert_eq!(draft.step_data.experiences[0].id, 1);
        assert_eq!(draft.step_data.skills.as_deref(), Some("Rust"));
        // Pre-existing local sections survive the merge.
        assert_eq!(draft.step_data.education["school"], json!("Kyoto U"));
    }

    #[tokio::test]
    async fn test_resume_from_snapshot_restores_state() {
        let store = Arc::new(MemorySnapshotStore::new());
        let session = session_with(store.clone(), Arc::new(MockApi::default()));
        session.apply(|d| {
            d.update_skills("Rust")
                .mark_step_completed(2)
                .set_current_step(3)
        });
        session.flush_snapshot();

        let fresh = session_with(store, Arc::new(MockApi::default()));
        assert!(fresh.resume_from_snapshot());
        let draft = fresh.draft();
        assert_eq!(draft.current_step, 3);
        assert_eq!(draft.step_data.skills.as_deref(), Some("Rust"));
        assert!(draft.completed_steps.contains(&2));
        assert!(!draft.is_dirty);
    }

    #[tokio::test]
    async fn test_resume_from_snapshot_without_one() {
        let session = session_with(
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(MockApi::default()),
        );
        assert!(!session.resume_from_snapshot());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_reads_as_absent() {
        let store = Arc::new(MemorySnapshotStore::new());
        store.set(WIZARD_DRAFT_KEY, "not json").unwrap();
        let session = session_with(store, Arc::new(MockApi::default()));
        assert!(!session.resume_from_snapshot());
    }

    #[tokio::test]
    async fn test_discard_local_draft_touches_no_server_record() {
        let store = Arc::new(MemorySnapshotStore::new());
        let api = Arc::new(MockApi::default());
        let session = session_with(store.clone(), api.clone());

        session.apply(|d| d.update_skills("draft in progress"));
        session.store_local_draft();
        assert!(session.peek_local_draft().is_some());

        session.discard_local_draft();
        assert!(session.peek_local_draft().is_none());
        assert!(api.calls().is_empty(), "local discard must be offline");
    }

    #[tokio::test]
    async fn test_local_draft_key_is_independent_of_wizard_key() {
        let store = Arc::new(MemorySnapshotStore::new());
        let session = session_with(store.clone(), Arc::new(MockApi::default()));
        session.apply(|d| d.update_skills("x"));
        session.flush_snapshot();
        session.store_local_draft();

        session.discard_local_draft();
        assert!(store.get(WIZARD_DRAFT_KEY).is_some());
        assert!(store.get(LOCAL_DRAFT_KEY).is_none());
    }

    #[tokio::test]
    async fn test_overlapping_saves_are_sent_independently() {
        let api = Arc::new(MockApi::default());
        let session = session_with(Arc::new(MemorySnapshotStore::new()), api.clone());
        session.apply(|d| d.update_skills("Rust"));

        let (a, b) = tokio::join!(
            session.save_to_backend("a@example.com"),
            session.save_to_backend("a@example.com")
        );
        assert!(a.fully_succeeded() && b.fully_succeeded());
        assert_eq!(api.calls().len(), 2);
    }
}
