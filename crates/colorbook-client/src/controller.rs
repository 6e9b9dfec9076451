//! Generation flow state machine.
//!
//! [`GenerationController`] drives one coloring-page generation at a time:
//! submit the prompt, then poll the returned task on a fixed interval until
//! it reaches a terminal state. Observable state is published through a
//! `watch` channel and one-shot toasts through an unbounded mpsc channel, so
//! a UI layer can subscribe to both without touching the controller itself.
//!
//! The recurring poll is an explicit tokio task owned through a single
//! [`PollGuard`]; it is released exactly once per cycle, on whichever comes
//! first of a terminal transition, a replacing submission, or controller
//! teardown. In-flight requests are never cancelled mid-flight; a cycle
//! counter checked under the state lock discards their late results instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use colorbook_types::{AspectRatio, TaskSnapshot, TaskState};

use crate::api::ApiClient;

/// Placeholder shown while no image has been generated yet.
pub const DEFAULT_IMAGE_URL: &str = "https://gencolor.ai/images/home/case/result_01.webp";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

// ── Observable state ─────────────────────────────────────────────────────────

/// Lifecycle phase of the current generation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No generation started yet (or the last cycle was replaced).
    #[default]
    Idle,
    /// The submit request is in flight.
    Submitting,
    /// A task id is known and the poll task is running.
    Polling,
    Succeeded,
    Failed,
}

impl Phase {
    /// `true` once the cycle is over and no poll task remains.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }
}

/// Snapshot of everything a UI needs to render the generation flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationState {
    pub phase: Phase,
    /// The (trimmed) prompt of the current cycle.
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    /// `true` from submission until the terminal transition.
    pub loading: bool,
    /// First result url once the task succeeded.
    pub image_url: Option<String>,
    /// Inline error text once the cycle failed.
    pub error: Option<String>,
    /// Task id of the current cycle, once known.
    pub task_id: Option<String>,
    /// Completed polls in the current cycle.
    pub polls: u64,
}

impl GenerationState {
    /// Url to render in the image area: the generated image when present,
    /// otherwise the given placeholder.
    pub fn display_url(&self, placeholder: &str) -> String {
        self.image_url
            .clone()
            .unwrap_or_else(|| placeholder.to_owned())
    }
}

/// One-shot user-visible notification, emitted exactly once per transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

// ── Configuration ────────────────────────────────────────────────────────────

/// Controller configuration; everything the original page hard-coded as
/// module-level constants is injected here.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Base url of the colorbook server.
    pub base_url: String,
    /// Delay between polls (default 2 s). Tests inject a short interval.
    pub poll_interval: Duration,
    /// Placeholder image shown before the first success.
    pub default_image_url: String,
}

impl ControllerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            default_image_url: DEFAULT_IMAGE_URL.to_owned(),
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn default_image_url(mut self, url: impl Into<String>) -> Self {
        self.default_image_url = url.into();
        self
    }
}

// ── Shared internals ─────────────────────────────────────────────────────────

/// State shared between the controller and its poll task.
#[derive(Debug)]
struct Shared {
    state: Mutex<GenerationState>,
    /// Bumped on every submission; updates tagged with an older cycle are
    /// discarded so a stale in-flight response cannot resurrect UI state.
    cycle: AtomicU64,
    state_tx: watch::Sender<GenerationState>,
    notice_tx: mpsc::UnboundedSender<Notice>,
}

impl Shared {
    /// Writers hold the lock only for plain field assignments, so the state
    /// behind a poisoned guard is still consistent and can be reused.
    fn lock_state(&self) -> std::sync::MutexGuard<'_, GenerationState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Start a new cycle: bump the cycle counter and reset the observable
    /// state, both under the state lock so no poll-task write can interleave
    /// between the two.
    fn begin_cycle(&self, prompt: &str, aspect_ratio: AspectRatio) -> u64 {
        let mut state = self.lock_state();
        let cycle = self.cycle.fetch_add(1, Ordering::SeqCst) + 1;
        *state = GenerationState {
            phase: Phase::Submitting,
            prompt: prompt.to_owned(),
            aspect_ratio,
            loading: true,
            ..GenerationState::default()
        };
        let _ = self.state_tx.send(state.clone());
        cycle
    }

    /// Apply `mutate` and publish the new state, unless `cycle` is no longer
    /// the active cycle. Returns `false` when the update was discarded.
    fn update(&self, cycle: u64, mutate: impl FnOnce(&mut GenerationState)) -> bool {
        let mut state = self.lock_state();
        if self.cycle.load(Ordering::SeqCst) != cycle {
            debug!(cycle, "discarding stale state update");
            return false;
        }
        mutate(&mut state);
        // Receivers may be gone (headless use); that is fine.
        let _ = self.state_tx.send(state.clone());
        true
    }

    fn emit(&self, notice: Notice) {
        let _ = self.notice_tx.send(notice);
    }

    fn succeed(&self, cycle: u64, url: String) {
        let applied = self.update(cycle, |s| {
            s.phase = Phase::Succeeded;
            s.loading = false;
            s.error = None;
            s.image_url = Some(url);
        });
        if applied {
            self.emit(Notice::Success(
                "Coloring page generated successfully".to_owned(),
            ));
        }
    }

    fn fail(&self, cycle: u64, message: String) {
        let applied = self.update(cycle, |s| {
            s.phase = Phase::Failed;
            s.loading = false;
            s.error = Some(message.clone());
        });
        if applied {
            self.emit(Notice::Error(message));
        }
    }
}

/// Owner of the recurring poll task; dropping it aborts the task, so at most
/// one poll loop can exist per controller.
#[derive(Debug)]
struct PollGuard {
    handle: JoinHandle<()>,
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ── Controller ───────────────────────────────────────────────────────────────

/// Drives the submit-then-poll generation flow against a colorbook server.
///
/// # Usage
///
/// ```rust,ignore
/// let (mut controller, mut notices) = GenerationController::new(
///     ControllerConfig::new("http://localhost:3000"),
/// );
/// controller.submit("a cat in a garden", AspectRatio::Square).await;
/// while let Some(notice) = notices.recv().await {
///     println!("{notice:?}");
/// }
/// ```
#[derive(Debug)]
pub struct GenerationController {
    api: ApiClient,
    config: ControllerConfig,
    shared: Arc<Shared>,
    state_rx: watch::Receiver<GenerationState>,
    poll_guard: Option<PollGuard>,
}

impl GenerationController {
    /// Create a controller and the receiver for its one-shot notices.
    pub fn new(config: ControllerConfig) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let api = ApiClient::new(&config.base_url);
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let initial = GenerationState::default();
        let (state_tx, state_rx) = watch::channel(initial.clone());

        let shared = Arc::new(Shared {
            state: Mutex::new(initial),
            cycle: AtomicU64::new(0),
            state_tx,
            notice_tx,
        });

        let controller = Self {
            api,
            config,
            shared,
            state_rx,
            poll_guard: None,
        };
        (controller, notice_rx)
    }

    /// Current state snapshot.
    pub fn state(&self) -> GenerationState {
        self.shared.lock_state().clone()
    }

    /// Subscribe to state changes.
    pub fn watch_state(&self) -> watch::Receiver<GenerationState> {
        self.state_rx.clone()
    }

    /// Url to render right now (generated image or configured placeholder).
    pub fn display_url(&self) -> String {
        self.state().display_url(&self.config.default_image_url)
    }

    /// Number of live poll tasks. By construction this is 0 or 1.
    pub fn active_polls(&self) -> usize {
        match &self.poll_guard {
            Some(guard) if !guard.handle.is_finished() => 1,
            _ => 0,
        }
    }

    /// Start a new generation cycle.
    ///
    /// A whitespace-only prompt is rejected locally with an error notice and
    /// no network call. Otherwise any previous poll task is cancelled, the
    /// state is reset for the new cycle and the prompt is submitted; on
    /// success the poll task starts, on failure the cycle ends `Failed`.
    pub async fn submit(&mut self, prompt: &str, aspect_ratio: AspectRatio) {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            self.shared.emit(Notice::Error("prompt is required".to_owned()));
            return;
        }

        // Replacing the guard aborts the previous loop; the cycle bump
        // invalidates any of its responses still in flight.
        self.poll_guard = None;
        let cycle = self.shared.begin_cycle(prompt, aspect_ratio);

        match self.api.create_task(prompt, aspect_ratio).await {
            Ok(task_id) => {
                info!(task_id = %task_id, aspect_ratio = %aspect_ratio, "generation task submitted");
                self.shared.update(cycle, |s| {
                    s.task_id = Some(task_id.clone());
                    s.phase = Phase::Polling;
                });
                self.poll_guard = Some(self.spawn_poll_task(cycle, task_id));
            }
            Err(error) => {
                warn!(error = %error, "task submission failed");
                self.shared.fail(cycle, error.to_string());
            }
        }
    }

    /// Spawn the recurring poll task for `task_id`.
    ///
    /// The task polls immediately, then on every interval tick, and ends
    /// itself on the first terminal snapshot, poll error, or stale cycle.
    fn spawn_poll_task(&self, cycle: u64, task_id: String) -> PollGuard {
        let api = self.api.clone();
        let shared = Arc::clone(&self.shared);
        let interval = self.config.poll_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match api.query_task(&task_id).await {
                    Ok(snapshot) => {
                        if apply_snapshot(&shared, cycle, &snapshot) {
                            break;
                        }
                    }
                    Err(error) => {
                        warn!(task_id = %task_id, error = %error, "task poll failed");
                        shared.fail(cycle, error.to_string());
                        break;
                    }
                }
            }
        });

        PollGuard { handle }
    }
}

/// Apply one poll result. Returns `true` when the poll loop should stop.
fn apply_snapshot(shared: &Shared, cycle: u64, snapshot: &TaskSnapshot) -> bool {
    // Count the completed poll first; a stale cycle also ends the loop.
    if !shared.update(cycle, |s| s.polls += 1) {
        return true;
    }

    match snapshot.state {
        TaskState::Success => {
            match snapshot.result_urls.first() {
                Some(url) => shared.succeed(cycle, url.clone()),
                // An anomalous success: the provider reported completion but
                // delivered no image.
                None => shared.fail(cycle, "No image URL in result".to_owned()),
            }
            true
        }
        TaskState::Fail => {
            let message = snapshot
                .fail_msg
                .clone()
                .filter(|m| !m.is_empty())
                .or_else(|| snapshot.fail_code.clone().filter(|c| !c.is_empty()))
                .unwrap_or_else(|| "Generation failed".to_owned());
            shared.fail(cycle, message);
            true
        }
        TaskState::Waiting => false,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn test_shared() -> (Arc<Shared>, mpsc::UnboundedReceiver<Notice>) {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let initial = GenerationState::default();
        let (state_tx, _state_rx) = watch::channel(initial.clone());
        let shared = Arc::new(Shared {
            state: Mutex::new(initial),
            cycle: AtomicU64::new(0),
            state_tx,
            notice_tx,
        });
        (shared, notice_rx)
    }

    fn snapshot(state: TaskState, urls: &[&str]) -> TaskSnapshot {
        TaskSnapshot {
            task_id: "T1".to_owned(),
            state,
            result_urls: urls.iter().map(|u| (*u).to_owned()).collect(),
            fail_code: None,
            fail_msg: None,
        }
    }

    #[test]
    fn display_url_falls_back_to_placeholder() {
        let mut state = GenerationState::default();
        assert_eq!(state.display_url("https://p/x.webp"), "https://p/x.webp");
        state.image_url = Some("https://x/img.png".to_owned());
        assert_eq!(state.display_url("https://p/x.webp"), "https://x/img.png");
    }

    #[test]
    fn terminal_phases_are_succeeded_and_failed() {
        assert!(Phase::Succeeded.is_terminal());
        assert!(Phase::Failed.is_terminal());
        assert!(!Phase::Idle.is_terminal());
        assert!(!Phase::Submitting.is_terminal());
        assert!(!Phase::Polling.is_terminal());
    }

    #[tokio::test]
    async fn success_snapshot_stores_first_url_and_notifies_once() {
        let (shared, mut notices) = test_shared();

        let done = apply_snapshot(
            &shared,
            0,
            &snapshot(TaskState::Success, &["https://x/a.png", "https://x/b.png"]),
        );
        assert!(done);

        let state = shared.state.lock().unwrap().clone();
        assert_eq!(state.phase, Phase::Succeeded);
        assert_eq!(state.image_url.as_deref(), Some("https://x/a.png"));
        assert!(!state.loading);
        assert_eq!(state.polls, 1);

        assert!(matches!(notices.try_recv(), Ok(Notice::Success(_))));
        assert!(notices.try_recv().is_err(), "exactly one notice");
    }

    #[tokio::test]
    async fn success_without_urls_fails_the_cycle() {
        let (shared, mut notices) = test_shared();

        let done = apply_snapshot(&shared, 0, &snapshot(TaskState::Success, &[]));
        assert!(done);

        let state = shared.state.lock().unwrap().clone();
        assert_eq!(state.phase, Phase::Failed);
        assert_eq!(state.error.as_deref(), Some("No image URL in result"));
        assert!(state.image_url.is_none());

        assert!(matches!(
            notices.try_recv(),
            Ok(Notice::Error(m)) if m == "No image URL in result"
        ));
    }

    #[tokio::test]
    async fn fail_message_prefers_msg_then_code_then_generic() {
        let cases = [
            (Some("quota exceeded"), Some("422"), "quota exceeded"),
            (Some(""), Some("422"), "422"),
            (None, Some("422"), "422"),
            (None, None, "Generation failed"),
        ];

        for (fail_msg, fail_code, expected) in cases {
            let (shared, mut notices) = test_shared();
            let mut snap = snapshot(TaskState::Fail, &[]);
            snap.fail_msg = fail_msg.map(str::to_owned);
            snap.fail_code = fail_code.map(str::to_owned);

            assert!(apply_snapshot(&shared, 0, &snap));
            let state = shared.state.lock().unwrap().clone();
            assert_eq!(state.error.as_deref(), Some(expected));
            assert!(matches!(
                notices.try_recv(),
                Ok(Notice::Error(m)) if m == expected
            ));
        }
    }

    #[tokio::test]
    async fn waiting_snapshot_only_bumps_poll_count() {
        let (shared, mut notices) = test_shared();

        assert!(!apply_snapshot(&shared, 0, &snapshot(TaskState::Waiting, &[])));
        assert!(!apply_snapshot(&shared, 0, &snapshot(TaskState::Waiting, &[])));

        let state = shared.state.lock().unwrap().clone();
        let expected = GenerationState {
            polls: 2,
            ..GenerationState::default()
        };
        assert_eq!(state, expected, "nothing but the poll count may change");
        assert!(notices.try_recv().is_err(), "no notice for waiting polls");
    }

    #[tokio::test]
    async fn stale_cycle_updates_are_discarded() {
        let (shared, mut notices) = test_shared();
        // The active cycle has moved past the poll task's cycle 0.
        shared.cycle.store(1, Ordering::SeqCst);

        let done = apply_snapshot(&shared, 0, &snapshot(TaskState::Success, &["https://x/a.png"]));
        assert!(done, "a stale poll task must stop itself");

        let state = shared.state.lock().unwrap().clone();
        assert_eq!(state, GenerationState::default(), "state must be untouched");
        assert!(notices.try_recv().is_err(), "no notice from a stale cycle");
    }
}
