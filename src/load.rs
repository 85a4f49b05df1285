use std::{
    cell::Cell,
    collections::BTreeMap,
    rc::Rc,
    time::Instant,
};

use crate::{
    error::{StagecueError, StagecueResult},
    retry::RetryPolicy,
};

/// Explicit asset category, carried on the request from issue time.
///
/// Kind never influences coordinator behavior directly; it exists so hosts
/// dispatch on a tag instead of matching substrings of the URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AssetKind {
    Model,
    Texture,
    Video,
}

/// One named load, immutable once issued.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AssetRequest {
    pub id: String,
    pub url: String,
    pub kind: AssetKind,
}

/// Opaque token minted by the external loader. The coordinator stores and
/// returns it without interpreting it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AssetHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Pending,
    Loaded,
    Failed,
}

impl LoadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Loaded | Self::Failed)
    }
}

/// Terminal result delivered to `on_status_change` listeners, exactly once
/// per asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetOutcome {
    Loaded {
        id: String,
        handle: AssetHandle,
    },
    Failed {
        id: String,
        url: String,
        attempts: u32,
        last_error: String,
    },
}

impl AssetOutcome {
    pub fn id(&self) -> &str {
        match self {
            Self::Loaded { id, .. } | Self::Failed { id, .. } => id,
        }
    }
}

/// Mutable per-request record owned by the coordinator's registry.
#[derive(Clone, Debug)]
pub struct AssetAttemptState {
    pub request: AssetRequest,
    pub attempts_made: u32,
    pub status: LoadStatus,
    pub handle: Option<AssetHandle>,
    pub last_error: Option<String>,
    /// An attempt has been begun and its completion not yet observed.
    /// Completions that do not correspond to a begun attempt are dropped,
    /// so one asset can never have two attempts running at once.
    pub in_flight: bool,
}

/// Seam to the external loader. `begin` must not block; the host reports the
/// attempt's result later through [`LoadCoordinator::complete`].
pub trait AssetLoader {
    fn begin(&mut self, request: &AssetRequest, attempt: u32);
}

/// Shared read-only view of the aggregate readiness flag.
///
/// Clones are cheap (`Rc`); choreographers hold one and never write it.
#[derive(Clone, Debug, Default)]
pub struct SceneReadiness(Rc<Cell<bool>>);

impl SceneReadiness {
    pub fn is_ready(&self) -> bool {
        self.0.get()
    }

    fn set(&self, ready: bool) {
        self.0.set(ready);
    }
}

#[derive(Clone, Debug)]
struct RetryTimer {
    due: Instant,
    id: String,
}

type StatusListener = Box<dyn FnMut(&AssetOutcome)>;

/// Owns a registry of named load attempts, retries each under a shared
/// [`RetryPolicy`], and folds per-asset outcomes into one readiness flag.
///
/// The coordinator is single-threaded and runtime-free: the host's event loop
/// feeds it completions and clock readings, and it never sleeps or spawns.
/// Within one asset id attempts are strictly sequential (attempt N+1 is only
/// begun after attempt N's completion was observed); across ids no ordering
/// is assumed, and `is_scene_ready` is a pure fold over terminal states.
pub struct LoadCoordinator {
    loader: Box<dyn AssetLoader>,
    policy: RetryPolicy,
    registry: BTreeMap<String, AssetAttemptState>,
    retry_timers: Vec<RetryTimer>,
    listeners: BTreeMap<String, Vec<StatusListener>>,
    readiness: SceneReadiness,
    disposed: bool,
}

impl LoadCoordinator {
    pub fn new(loader: Box<dyn AssetLoader>, policy: RetryPolicy) -> Self {
        Self {
            loader,
            policy,
            registry: BTreeMap::new(),
            retry_timers: Vec::new(),
            listeners: BTreeMap::new(),
            readiness: SceneReadiness::default(),
            disposed: false,
        }
    }

    /// Register a request and begin its first attempt.
    pub fn issue(&mut self, request: AssetRequest) -> StagecueResult<()> {
        if self.disposed {
            return Err(StagecueError::validation(
                "cannot issue loads on a disposed coordinator",
            ));
        }
        if request.id.is_empty() {
            return Err(StagecueError::validation("asset id must be non-empty"));
        }
        if self.registry.contains_key(&request.id) {
            return Err(StagecueError::validation(format!(
                "duplicate asset id '{}'",
                request.id
            )));
        }

        tracing::debug!(id = %request.id, url = %request.url, "issuing asset load");
        self.loader.begin(&request, 1);
        self.registry.insert(
            request.id.clone(),
            AssetAttemptState {
                request,
                attempts_made: 1,
                status: LoadStatus::Pending,
                handle: None,
                last_error: None,
                in_flight: true,
            },
        );
        // A fresh Pending entry can only lower readiness.
        self.refresh_readiness();
        Ok(())
    }

    /// Report the outcome of the most recently begun attempt for `id`.
    ///
    /// Unknown ids, already-terminal assets, duplicate completions with no
    /// attempt in flight, and disposed coordinators are all silent no-ops:
    /// a stray or racing network completion must never crash, mutate state,
    /// or burn extra retry budget.
    pub fn complete(&mut self, id: &str, outcome: Result<AssetHandle, String>, now: Instant) {
        if self.disposed {
            return;
        }
        let Some(state) = self.registry.get_mut(id) else {
            return;
        };
        if state.status.is_terminal() || !state.in_flight {
            return;
        }
        state.in_flight = false;

        match outcome {
            Ok(handle) => {
                state.status = LoadStatus::Loaded;
                state.handle = Some(handle);
                state.last_error = None;
                tracing::debug!(id, attempts = state.attempts_made, "asset loaded");
                let event = AssetOutcome::Loaded {
                    id: id.to_string(),
                    handle,
                };
                self.finish_terminal(id, event);
            }
            Err(error) => {
                state.last_error = Some(error.clone());
                if self.policy.allows_retry_after(state.attempts_made) {
                    tracing::debug!(
                        id,
                        attempt = state.attempts_made,
                        error = %error,
                        "asset attempt failed, retry scheduled"
                    );
                    self.retry_timers.push(RetryTimer {
                        due: now + self.policy.retry_delay,
                        id: id.to_string(),
                    });
                } else {
                    state.status = LoadStatus::Failed;
                    let event = AssetOutcome::Failed {
                        id: id.to_string(),
                        url: state.request.url.clone(),
                        attempts: state.attempts_made,
                        last_error: error.clone(),
                    };
                    tracing::warn!(
                        id,
                        url = %state.request.url,
                        attempts = state.attempts_made,
                        error = %error,
                        "asset load exhausted retry budget"
                    );
                    self.finish_terminal(id, event);
                }
            }
        }
    }

    /// Begin every retry whose delay has elapsed.
    pub fn poll(&mut self, now: Instant) {
        if self.disposed {
            return;
        }
        let mut due = Vec::new();
        self.retry_timers.retain(|timer| {
            if timer.due <= now {
                due.push(timer.id.clone());
                false
            } else {
                true
            }
        });
        for id in due {
            let Some(state) = self.registry.get_mut(&id) else {
                continue;
            };
            if state.status.is_terminal() {
                continue;
            }
            state.attempts_made += 1;
            state.in_flight = true;
            tracing::debug!(id = %id, attempt = state.attempts_made, "retrying asset load");
            self.loader.begin(&state.request, state.attempts_made);
        }
    }

    /// Earliest pending retry deadline, for host wakeup scheduling.
    pub fn next_retry_due(&self) -> Option<Instant> {
        self.retry_timers.iter().map(|t| t.due).min()
    }

    pub fn status(&self, id: &str) -> Option<LoadStatus> {
        self.registry.get(id).map(|s| s.status)
    }

    pub fn handle(&self, id: &str) -> Option<AssetHandle> {
        self.registry.get(id).and_then(|s| s.handle)
    }

    pub fn attempt_state(&self, id: &str) -> Option<&AssetAttemptState> {
        self.registry.get(id)
    }

    /// The terminal error for a failed asset, in crate error form.
    pub fn failure(&self, id: &str) -> Option<StagecueError> {
        let state = self.registry.get(id)?;
        if state.status != LoadStatus::Failed {
            return None;
        }
        Some(StagecueError::LoadExhausted {
            id: state.request.id.clone(),
            url: state.request.url.clone(),
            attempts: state.attempts_made,
            last_error: state.last_error.clone().unwrap_or_default(),
        })
    }

    /// All requests terminal and at least one loaded.
    ///
    /// Partial success counts as ready: cosmetic assets may fail while the
    /// scene renders with whatever arrived. An empty registry is not ready.
    pub fn is_scene_ready(&self) -> bool {
        !self.registry.is_empty()
            && self.registry.values().all(|s| s.status.is_terminal())
            && self
                .registry
                .values()
                .any(|s| s.status == LoadStatus::Loaded)
    }

    /// True once every request is terminal, regardless of outcomes. Hosts use
    /// this to distinguish "still loading" from "all failed".
    pub fn is_fully_resolved(&self) -> bool {
        !self.registry.is_empty() && self.registry.values().all(|s| s.status.is_terminal())
    }

    /// Shared readiness flag; clones may be handed to choreographers.
    pub fn readiness(&self) -> SceneReadiness {
        self.readiness.clone()
    }

    /// Register a listener fired exactly once when `id` reaches a terminal
    /// status. Listeners registered after the transition fire immediately.
    pub fn on_status_change(
        &mut self,
        id: &str,
        mut listener: impl FnMut(&AssetOutcome) + 'static,
    ) -> StagecueResult<()> {
        if self.disposed {
            return Err(StagecueError::validation(
                "cannot register listeners on a disposed coordinator",
            ));
        }
        let Some(state) = self.registry.get(id) else {
            return Err(StagecueError::validation(format!(
                "unknown asset id '{id}'"
            )));
        };

        match state.status {
            LoadStatus::Pending => {
                self.listeners
                    .entry(id.to_string())
                    .or_default()
                    .push(Box::new(listener));
            }
            LoadStatus::Loaded => {
                let event = AssetOutcome::Loaded {
                    id: id.to_string(),
                    handle: state.handle.unwrap_or(AssetHandle(0)),
                };
                listener(&event);
            }
            LoadStatus::Failed => {
                let event = AssetOutcome::Failed {
                    id: id.to_string(),
                    url: state.request.url.clone(),
                    attempts: state.attempts_made,
                    last_error: state.last_error.clone().unwrap_or_default(),
                };
                listener(&event);
            }
        }
        Ok(())
    }

    /// Cancel pending retries and make every later call a no-op.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.retry_timers.clear();
        self.listeners.clear();
    }

    /// Drop the current load set so a new one may be issued. Readiness falls
    /// back to `false`; the aggregate is never retried implicitly.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.retry_timers.clear();
        self.listeners.clear();
        self.disposed = false;
        self.readiness.set(false);
    }

    fn finish_terminal(&mut self, id: &str, event: AssetOutcome) {
        if let Some(mut listeners) = self.listeners.remove(id) {
            for listener in &mut listeners {
                listener(&event);
            }
        }
        self.retry_timers.retain(|t| t.id != id);
        self.refresh_readiness();
    }

    fn refresh_readiness(&mut self) {
        let ready = self.is_scene_ready();
        if ready != self.readiness.is_ready() {
            if ready {
                tracing::info!(assets = self.registry.len(), "scene is ready");
            }
            self.readiness.set(ready);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, time::Duration};

    #[derive(Default)]
    struct RecordingLoader {
        begun: Rc<RefCell<Vec<(String, u32)>>>,
    }

    impl AssetLoader for RecordingLoader {
        fn begin(&mut self, request: &AssetRequest, attempt: u32) {
            self.begun.borrow_mut().push((request.id.clone(), attempt));
        }
    }

    fn req(id: &str) -> AssetRequest {
        AssetRequest {
            id: id.to_string(),
            url: format!("https://cdn.example/{id}.glb"),
            kind: AssetKind::Model,
        }
    }

    fn coordinator(policy: RetryPolicy) -> (LoadCoordinator, Rc<RefCell<Vec<(String, u32)>>>) {
        let begun = Rc::new(RefCell::new(Vec::new()));
        let loader = RecordingLoader {
            begun: begun.clone(),
        };
        (LoadCoordinator::new(Box::new(loader), policy), begun)
    }

    fn t0() -> Instant {
        Instant::now()
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let (mut coord, _) = coordinator(RetryPolicy::new(0, Duration::ZERO));
        coord.issue(req("a")).unwrap();
        assert!(coord.issue(req("a")).is_err());
    }

    #[test]
    fn success_is_terminal_and_keeps_the_handle() {
        let (mut coord, _) = coordinator(RetryPolicy::new(3, Duration::from_millis(5)));
        let now = t0();
        coord.issue(req("a")).unwrap();
        assert_eq!(coord.status("a"), Some(LoadStatus::Pending));

        coord.complete("a", Ok(AssetHandle(42)), now);
        assert_eq!(coord.status("a"), Some(LoadStatus::Loaded));
        assert_eq!(coord.handle("a"), Some(AssetHandle(42)));

        // A stray duplicate completion must not clobber the handle.
        coord.complete("a", Err("late error".to_string()), now);
        assert_eq!(coord.status("a"), Some(LoadStatus::Loaded));
        assert_eq!(coord.handle("a"), Some(AssetHandle(42)));
    }

    #[test]
    fn failing_asset_is_retried_exactly_budget_plus_one_times() {
        let (mut coord, begun) = coordinator(RetryPolicy::new(3, Duration::from_millis(10)));
        let mut now = t0();
        coord.issue(req("sun")).unwrap();

        for _ in 0..4 {
            coord.complete("sun", Err("503".to_string()), now);
            now += Duration::from_millis(10);
            coord.poll(now);
        }

        let begun = begun.borrow();
        assert_eq!(begun.len(), 4);
        assert_eq!(begun[3], ("sun".to_string(), 4));
        assert_eq!(coord.status("sun"), Some(LoadStatus::Failed));
        let err = coord.failure("sun").unwrap().to_string();
        assert!(err.contains("'sun'"));
        assert!(err.contains("503"));
    }

    #[test]
    fn duplicate_completion_cannot_start_concurrent_retries() {
        let (mut coord, begun) = coordinator(RetryPolicy::new(3, Duration::from_millis(10)));
        let now = t0();
        coord.issue(req("a")).unwrap();

        // The same failed attempt reported twice must schedule one retry,
        // not two running side by side.
        coord.complete("a", Err("502".to_string()), now);
        coord.complete("a", Err("502".to_string()), now);
        coord.poll(now + Duration::from_millis(10));

        assert_eq!(
            *begun.borrow(),
            vec![("a".to_string(), 1), ("a".to_string(), 2)]
        );
        assert_eq!(coord.attempt_state("a").unwrap().attempts_made, 2);
        assert_eq!(coord.next_retry_due(), None);
    }

    #[test]
    fn retry_waits_for_its_delay() {
        let (mut coord, begun) = coordinator(RetryPolicy::new(1, Duration::from_millis(100)));
        let now = t0();
        coord.issue(req("a")).unwrap();
        coord.complete("a", Err("reset".to_string()), now);

        coord.poll(now + Duration::from_millis(50));
        assert_eq!(begun.borrow().len(), 1);
        assert_eq!(coord.next_retry_due(), Some(now + Duration::from_millis(100)));

        coord.poll(now + Duration::from_millis(100));
        assert_eq!(begun.borrow().len(), 2);
        assert_eq!(coord.next_retry_due(), None);
    }

    #[test]
    fn readiness_requires_all_terminal_and_one_loaded() {
        let (mut coord, _) = coordinator(RetryPolicy::new(0, Duration::ZERO));
        let now = t0();
        coord.issue(req("a")).unwrap();
        coord.issue(req("b")).unwrap();
        let readiness = coord.readiness();

        coord.complete("a", Ok(AssetHandle(1)), now);
        assert!(!coord.is_scene_ready());
        assert!(!readiness.is_ready());

        coord.complete("b", Err("404".to_string()), now);
        assert!(coord.is_scene_ready());
        assert!(readiness.is_ready());
    }

    #[test]
    fn all_failed_resolves_but_is_not_ready() {
        let (mut coord, _) = coordinator(RetryPolicy::new(0, Duration::ZERO));
        let now = t0();
        coord.issue(req("a")).unwrap();
        coord.issue(req("b")).unwrap();
        coord.complete("a", Err("404".to_string()), now);
        coord.complete("b", Err("404".to_string()), now);
        assert!(coord.is_fully_resolved());
        assert!(!coord.is_scene_ready());
    }

    #[test]
    fn listeners_fire_once_per_terminal_transition() {
        let (mut coord, _) = coordinator(RetryPolicy::new(1, Duration::from_millis(1)));
        let mut now = t0();
        coord.issue(req("a")).unwrap();

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        coord
            .on_status_change("a", move |e| sink.borrow_mut().push(e.clone()))
            .unwrap();

        coord.complete("a", Err("flaky".to_string()), now);
        assert!(events.borrow().is_empty());

        now += Duration::from_millis(1);
        coord.poll(now);
        coord.complete("a", Ok(AssetHandle(7)), now);
        coord.complete("a", Ok(AssetHandle(8)), now);

        let events = events.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            AssetOutcome::Loaded {
                id: "a".to_string(),
                handle: AssetHandle(7)
            }
        );
    }

    #[test]
    fn listener_registered_after_terminal_fires_immediately() {
        let (mut coord, _) = coordinator(RetryPolicy::new(0, Duration::ZERO));
        let now = t0();
        coord.issue(req("a")).unwrap();
        coord.complete("a", Err("410".to_string()), now);

        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        coord
            .on_status_change("a", move |e| {
                assert!(matches!(e, AssetOutcome::Failed { attempts: 1, .. }));
                flag.set(true);
            })
            .unwrap();
        assert!(fired.get());
    }

    #[test]
    fn dispose_makes_late_completions_inert() {
        let (mut coord, begun) = coordinator(RetryPolicy::new(2, Duration::from_millis(1)));
        let now = t0();
        coord.issue(req("a")).unwrap();
        coord.complete("a", Err("timeout".to_string()), now);
        coord.dispose();

        coord.complete("a", Ok(AssetHandle(9)), now);
        coord.poll(now + Duration::from_secs(1));
        assert_eq!(coord.status("a"), Some(LoadStatus::Pending));
        assert_eq!(begun.borrow().len(), 1);
        assert_eq!(coord.next_retry_due(), None);
    }

    #[test]
    fn reset_clears_readiness_and_accepts_new_loads() {
        let (mut coord, _) = coordinator(RetryPolicy::new(0, Duration::ZERO));
        let now = t0();
        coord.issue(req("a")).unwrap();
        coord.complete("a", Ok(AssetHandle(1)), now);
        let readiness = coord.readiness();
        assert!(readiness.is_ready());

        coord.reset();
        assert!(!readiness.is_ready());
        assert_eq!(coord.status("a"), None);
        coord.issue(req("a")).unwrap();
    }
}
