//! Session context shared by every executor.
//!
//! The session credential itself is a cookie owned by the transport; this
//! module tracks what the client knows *about* the session:
//!
//! - the persisted [`SessionMarkers`] (role, display name, first-login flag)
//! - whether the session has been terminated
//! - a generation counter plus an async gate so that concurrent 401s share a
//!   single refresh round trip
//!
//! Termination wipes the markers and calls the [`Navigator`] exactly once.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};

// ============================================================================
// Markers
// ============================================================================

/// Dashboard role of the logged-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    Nurse,
    Anesthesiologist,
}

/// Client-held markers describing the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMarkers {
    pub role: Role,
    pub display_name: String,
    /// Set until the user changes the initial password.
    #[serde(default)]
    pub first_login: bool,
}

impl SessionMarkers {
    pub fn new(role: Role, display_name: impl Into<String>) -> Self {
        Self {
            role,
            display_name: display_name.into(),
            first_login: false,
        }
    }

    pub fn with_first_login(mut self, first_login: bool) -> Self {
        self.first_login = first_login;
        self
    }
}

/// Storage for session markers.
///
/// `clear` must remove all markers as one step: a reader never observes a
/// partially cleared set.
pub trait MarkerStore: Send + Sync + std::fmt::Debug {
    /// Load the markers, if any.
    fn load(&self) -> Result<Option<SessionMarkers>>;

    /// Replace the markers.
    fn save(&self, markers: &SessionMarkers) -> Result<()>;

    /// Remove all markers.
    fn clear(&self) -> Result<()>;
}

/// Shared marker store.
pub type SharedMarkerStore = Arc<dyn MarkerStore>;

/// In-memory marker store.
#[derive(Debug, Default)]
pub struct InMemoryMarkerStore {
    markers: RwLock<Option<SessionMarkers>>,
}

impl InMemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_markers(markers: SessionMarkers) -> Self {
        Self {
            markers: RwLock::new(Some(markers)),
        }
    }
}

impl MarkerStore for InMemoryMarkerStore {
    fn load(&self) -> Result<Option<SessionMarkers>> {
        Ok(self.markers.read().clone())
    }

    fn save(&self, markers: &SessionMarkers) -> Result<()> {
        *self.markers.write() = Some(markers.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.markers.write() = None;
        Ok(())
    }
}

/// JSON-file marker store, so markers survive a restart.
///
/// Writes go to a sibling temp file that is renamed into place.
#[derive(Debug)]
pub struct FileMarkerStore {
    path: PathBuf,
    cached: RwLock<Option<SessionMarkers>>,
}

impl FileMarkerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<Option<SessionMarkers>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ClientError::Markers(format!("failed to read marker file: {}", e)))?;
        let markers = serde_json::from_str(&content)
            .map_err(|e| ClientError::Markers(format!("failed to parse marker file: {}", e)))?;
        Ok(Some(markers))
    }
}

impl MarkerStore for FileMarkerStore {
    fn load(&self) -> Result<Option<SessionMarkers>> {
        {
            let cache = self.cached.read();
            if cache.is_some() {
                return Ok(cache.clone());
            }
        }

        let mut cache = self.cached.write();
        if cache.is_none() {
            *cache = self.read_file()?;
        }
        Ok(cache.clone())
    }

    fn save(&self, markers: &SessionMarkers) -> Result<()> {
        let mut cache = self.cached.write();

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClientError::Markers(format!("failed to create marker directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(markers)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| ClientError::Markers(format!("failed to write marker file: {}", e)))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| ClientError::Markers(format!("failed to replace marker file: {}", e)))?;

        *cache = Some(markers.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut cache = self.cached.write();
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| {
                ClientError::Markers(format!("failed to delete marker file: {}", e))
            })?;
        }
        *cache = None;
        Ok(())
    }
}

// ============================================================================
// Navigation
// ============================================================================

/// Receives the redirect to the login entry point.
pub trait Navigator: Send + Sync + std::fmt::Debug {
    fn navigate_to_login(&self, login_path: &str);
}

/// Navigator that ignores redirects (headless callers).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate_to_login(&self, login_path: &str) {
        debug!(login_path, "Login navigation ignored");
    }
}

/// Navigator that records every redirect.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.visits.lock().len()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to_login(&self, login_path: &str) {
        self.visits.lock().push(login_path.to_string());
    }
}

// ============================================================================
// SessionContext
// ============================================================================

/// Outcome of a renewal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renewal {
    /// The session is valid again; replay the request.
    Renewed,
    /// The session is gone; the caller was sent to login.
    Terminated,
}

#[derive(Debug, Default)]
struct SessionState {
    generation: u64,
    terminated: bool,
}

/// Session state shared by every executor of one application instance.
#[derive(Debug)]
pub struct SessionContext {
    markers: SharedMarkerStore,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    state: Mutex<SessionState>,
    refresh_gate: tokio::sync::Mutex<()>,
    refresh_attempts: AtomicU64,
}

impl SessionContext {
    /// Create a context over the given marker store and navigator.
    pub fn new(
        markers: SharedMarkerStore,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            markers,
            navigator,
            login_path: login_path.into(),
            state: Mutex::new(SessionState::default()),
            refresh_gate: tokio::sync::Mutex::new(()),
            refresh_attempts: AtomicU64::new(0),
        }
    }

    /// Create a context with in-memory markers.
    pub fn in_memory(navigator: Arc<dyn Navigator>, login_path: impl Into<String>) -> Self {
        Self::new(Arc::new(InMemoryMarkerStore::new()), navigator, login_path)
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Current generation; changes on every refresh, login and termination.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminated
    }

    /// Number of refresh round trips actually issued.
    pub fn refresh_attempts(&self) -> u64 {
        self.refresh_attempts.load(Ordering::SeqCst)
    }

    /// Current session markers.
    pub fn markers(&self) -> Result<Option<SessionMarkers>> {
        self.markers.load()
    }

    /// Record a successful login performed by the caller.
    pub fn login(&self, markers: SessionMarkers) -> Result<()> {
        let mut state = self.state.lock();
        self.markers.save(&markers)?;
        state.terminated = false;
        state.generation += 1;
        info!(role = ?markers.role, "Session established");
        Ok(())
    }

    /// End the session explicitly. Same effects as a failed refresh.
    pub fn logout(&self) {
        self.terminate();
    }

    /// Terminate the session: wipe markers and navigate to login.
    ///
    /// Returns `true` for the call that performed the termination; later
    /// calls are no-ops until the next [`login`](Self::login).
    pub fn terminate(&self) -> bool {
        let mut state = self.state.lock();
        if state.terminated {
            return false;
        }
        state.terminated = true;
        state.generation += 1;

        if let Err(e) = self.markers.clear() {
            warn!(error = %e, "Failed to clear session markers");
        }
        drop(state);

        // Only the call that flipped `terminated` gets here.
        self.navigator.navigate_to_login(&self.login_path);

        info!(login_path = %self.login_path, "Session terminated, redirected to login");
        true
    }

    /// Renew the session after a 401 seen on a request sent at generation
    /// `observed`.
    ///
    /// Only one renewal runs at a time. A caller that waited on the gate
    /// while another caller renewed (the generation moved) replays without a
    /// refresh of its own; a caller that finds the session terminated gives
    /// up. Otherwise `refresh` runs and its outcome decides.
    pub async fn renew<F, Fut>(&self, observed: u64, refresh: F) -> Renewal
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        let _gate = self.refresh_gate.lock().await;

        {
            let state = self.state.lock();
            if state.terminated {
                debug!("Session already terminated, not refreshing");
                return Renewal::Terminated;
            }
            if state.generation != observed {
                debug!(
                    observed,
                    current = state.generation,
                    "Session renewed by a concurrent request"
                );
                return Renewal::Renewed;
            }
        }

        self.refresh_attempts.fetch_add(1, Ordering::SeqCst);
        if refresh().await {
            let mut state = self.state.lock();
            state.generation += 1;
            info!(generation = state.generation, "Session refreshed");
            Renewal::Renewed
        } else {
            self.terminate();
            Renewal::Terminated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn context() -> (SessionContext, Arc<RecordingNavigator>) {
        let navigator = Arc::new(RecordingNavigator::new());
        let ctx = SessionContext::in_memory(navigator.clone(), "/login");
        (ctx, navigator)
    }

    #[test]
    fn test_login_sets_markers() {
        let (ctx, _) = context();
        let markers = SessionMarkers::new(Role::Nurse, "Ana").with_first_login(true);
        ctx.login(markers.clone()).unwrap();

        assert_eq!(ctx.markers().unwrap(), Some(markers));
        assert_eq!(ctx.generation(), 1);
        assert!(!ctx.is_terminated());
    }

    #[test]
    fn test_terminate_clears_and_navigates_once() {
        let (ctx, navigator) = context();
        ctx.login(SessionMarkers::new(Role::Doctor, "Dr. Ruiz"))
            .unwrap();

        assert!(ctx.terminate());
        assert!(!ctx.terminate());
        ctx.logout();

        assert!(ctx.is_terminated());
        assert_eq!(ctx.markers().unwrap(), None);
        assert_eq!(navigator.visits(), vec!["/login".to_string()]);
    }

    /// Navigator that reads the session back while handling the redirect.
    #[derive(Debug, Default)]
    struct ReadBackNavigator {
        session: Mutex<std::sync::Weak<SessionContext>>,
        seen: Mutex<Vec<(bool, Option<SessionMarkers>)>>,
    }

    impl Navigator for ReadBackNavigator {
        fn navigate_to_login(&self, _login_path: &str) {
            if let Some(ctx) = self.session.lock().upgrade() {
                let markers = ctx.markers().unwrap();
                self.seen.lock().push((ctx.is_terminated(), markers));
            }
        }
    }

    #[test]
    fn test_navigator_may_read_session_during_termination() {
        let navigator = Arc::new(ReadBackNavigator::default());
        let ctx = Arc::new(SessionContext::in_memory(navigator.clone(), "/login"));
        *navigator.session.lock() = Arc::downgrade(&ctx);
        ctx.login(SessionMarkers::new(Role::Nurse, "Ana")).unwrap();

        assert!(ctx.terminate());
        assert_eq!(*navigator.seen.lock(), vec![(true, None)]);
    }

    #[test]
    fn test_login_after_termination_rearms() {
        let (ctx, navigator) = context();
        ctx.terminate();
        ctx.login(SessionMarkers::new(Role::Admin, "root")).unwrap();
        assert!(!ctx.is_terminated());

        ctx.terminate();
        assert_eq!(navigator.count(), 2);
    }

    #[tokio::test]
    async fn test_renew_success_bumps_generation() {
        let (ctx, _) = context();
        let observed = ctx.generation();

        let outcome = ctx.renew(observed, || async { true }).await;
        assert_eq!(outcome, Renewal::Renewed);
        assert_eq!(ctx.generation(), observed + 1);
        assert_eq!(ctx.refresh_attempts(), 1);
    }

    #[tokio::test]
    async fn test_renew_failure_terminates() {
        let (ctx, navigator) = context();
        ctx.login(SessionMarkers::new(Role::Nurse, "Ana")).unwrap();
        let observed = ctx.generation();

        let outcome = ctx.renew(observed, || async { false }).await;
        assert_eq!(outcome, Renewal::Terminated);
        assert!(ctx.is_terminated());
        assert_eq!(ctx.markers().unwrap(), None);
        assert_eq!(navigator.count(), 1);
    }

    #[tokio::test]
    async fn test_renew_skips_refresh_when_generation_moved() {
        let (ctx, _) = context();
        let stale = ctx.generation();
        ctx.renew(stale, || async { true }).await;

        let outcome = ctx
            .renew(stale, || async { panic!("second refresh must not run") })
            .await;
        assert_eq!(outcome, Renewal::Renewed);
        assert_eq!(ctx.refresh_attempts(), 1);
    }

    #[tokio::test]
    async fn test_renew_after_termination_does_not_refresh() {
        let (ctx, navigator) = context();
        let observed = ctx.generation();
        ctx.terminate();

        let outcome = ctx
            .renew(observed, || async { panic!("terminated session must not refresh") })
            .await;
        assert_eq!(outcome, Renewal::Terminated);
        assert_eq!(ctx.refresh_attempts(), 0);
        assert_eq!(navigator.count(), 1);
    }

    #[test]
    fn test_file_marker_store_roundtrip() {
        let temp = tempdir().unwrap();
        let store = FileMarkerStore::new(temp.path().join("session").join("markers.json"));

        assert_eq!(store.load().unwrap(), None);

        let markers = SessionMarkers::new(Role::Anesthesiologist, "Dr. Okafor");
        store.save(&markers).unwrap();
        assert!(store.path().exists());

        let reopened = FileMarkerStore::new(store.path().to_path_buf());
        assert_eq!(reopened.load().unwrap(), Some(markers));

        reopened.clear().unwrap();
        assert!(!reopened.path().exists());
        assert_eq!(reopened.load().unwrap(), None);
    }

    #[test]
    fn test_file_marker_store_failed_clear_keeps_markers() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("markers.json");
        let store = FileMarkerStore::new(&path);
        let markers = SessionMarkers::new(Role::Doctor, "Dr. Ruiz");
        store.save(&markers).unwrap();

        // A non-empty directory in place of the file cannot be removed.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        assert!(matches!(store.clear(), Err(ClientError::Markers(_))));
        assert_eq!(store.load().unwrap(), Some(markers));
    }

    #[test]
    fn test_file_marker_store_rejects_garbage() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("markers.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileMarkerStore::new(path);
        assert!(matches!(store.load(), Err(ClientError::Markers(_))));
    }
}
