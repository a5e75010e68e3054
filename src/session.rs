//! Engine session lifecycle.
//!
//! One model is live at a time. Selecting a model tears down the previous
//! session, then stands up a viewport and session for the new one. Every
//! selection takes a generation number from a monotonic counter; a
//! selection that finds a newer generation after any await abandons its
//! half-built resources instead of installing them, so rapid model
//! switches always converge on the last choice.
//!
//! Teardown order is fixed: session first, viewport second, then the
//! surface handle is released. Close failures are logged and swallowed --
//! teardown must always run to completion.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::ModelConfig;
use crate::engine::{ModelEngine, SurfaceTarget};
use crate::error::EngineError;

/// Ceiling on each engine create call before the selection fails.
pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(15);

/// Observable lifecycle state, published on a watch channel.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleState {
    Idle,
    /// Tearing down the previous session.
    Closing,
    Initializing { model_id: String },
    Ready { model_id: String },
    Failed { message: String },
}

/// How a `select_model` call ended. A superseded selection is not an
/// error: a newer selection took over and this one cleaned up after
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Ready,
    Superseded,
}

struct ActiveSession<E: ModelEngine> {
    generation: u64,
    session: Arc<E::Session>,
    viewport: E::Viewport,
    #[allow(dead_code)]
    surface: SurfaceTarget,
}

/// Owns the single live engine session and serializes model switches.
pub struct SessionManager<E: ModelEngine> {
    engine: E,
    create_timeout: Duration,
    generation: AtomicU64,
    active: Mutex<Option<ActiveSession<E>>>,
    state: watch::Sender<LifecycleState>,
}

impl<E: ModelEngine> SessionManager<E> {
    pub fn new(engine: E) -> Self {
        Self::with_timeout(engine, DEFAULT_CREATE_TIMEOUT)
    }

    pub fn with_timeout(engine: E, create_timeout: Duration) -> Self {
        let (state, _) = watch::channel(LifecycleState::Idle);
        Self {
            engine,
            create_timeout,
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
            state,
        }
    }

    /// Watch the lifecycle state.
    pub fn state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// The live session, if one is installed.
    pub fn session(&self) -> Option<Arc<E::Session>> {
        self.active
            .lock()
            .unwrap()
            .as_ref()
            .map(|a| Arc::clone(&a.session))
    }

    /// Switch to `model`, rendering into `surface`.
    ///
    /// If another selection starts while this one is awaiting the engine,
    /// this one closes whatever it already created and returns
    /// `Superseded`. Engine failures and timeouts tear down partial state
    /// and surface as `Err`; the published state becomes `Failed` only
    /// when no newer selection has taken over.
    pub async fn select_model(
        &self,
        model: &ModelConfig,
        surface: SurfaceTarget,
    ) -> Result<SelectOutcome, EngineError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(model_id = %model.id, generation, "Selecting model");

        let previous = {
            let mut active = self.active.lock().unwrap();
            if self.is_stale(generation) {
                return Ok(SelectOutcome::Superseded);
            }
            active.take()
        };
        if let Some(prev) = previous {
            self.publish(generation, LifecycleState::Closing);
            teardown::<E>(&prev.session, &prev.viewport);
        }
        if self.is_stale(generation) {
            return Ok(SelectOutcome::Superseded);
        }

        self.publish(
            generation,
            LifecycleState::Initializing {
                model_id: model.id.clone(),
            },
        );

        let viewport = match timeout(
            self.create_timeout,
            self.engine.create_viewport(surface.clone()),
        )
        .await
        {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => {
                self.fail(generation, &e);
                return Err(e);
            }
            Err(_) => {
                let e = EngineError::Timeout(self.create_timeout);
                self.fail(generation, &e);
                return Err(e);
            }
        };

        if self.is_stale(generation) {
            close_viewport::<E>(&viewport);
            return Ok(SelectOutcome::Superseded);
        }

        let session = match timeout(
            self.create_timeout,
            self.engine.create_session(&model.ticket, &model.model_view_url),
        )
        .await
        {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => {
                close_viewport::<E>(&viewport);
                self.fail(generation, &e);
                return Err(e);
            }
            Err(_) => {
                close_viewport::<E>(&viewport);
                let e = EngineError::Timeout(self.create_timeout);
                self.fail(generation, &e);
                return Err(e);
            }
        };
        let session = Arc::new(session);

        let mut active = self.active.lock().unwrap();
        if self.is_stale(generation) {
            drop(active);
            teardown::<E>(&session, &viewport);
            return Ok(SelectOutcome::Superseded);
        }
        *active = Some(ActiveSession {
            generation,
            session,
            viewport,
            surface,
        });
        // Sent inline while `active` is held (not via `publish`): the
        // install and its Ready announcement must be one critical section.
        self.state.send_replace(LifecycleState::Ready {
            model_id: model.id.clone(),
        });
        drop(active);

        info!(model_id = %model.id, "Model ready");
        Ok(SelectOutcome::Ready)
    }

    /// Tear down the live session, if any, and return to `Idle`.
    pub fn close(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let previous = self.active.lock().unwrap().take();
        if let Some(prev) = previous {
            teardown::<E>(&prev.session, &prev.viewport);
        }
        self.publish(generation, LifecycleState::Idle);
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    /// Send `state` unless a newer selection has taken over. Serialized on
    /// the active-session lock, so once a newer selection has announced,
    /// nothing stale can land on the channel after it.
    fn publish(&self, generation: u64, state: LifecycleState) {
        let _active = self.active.lock().unwrap();
        if !self.is_stale(generation) {
            self.state.send_replace(state);
        }
    }

    /// Publish `Failed` unless a newer selection already owns the state.
    fn fail(&self, generation: u64, err: &EngineError) {
        warn!(generation, "Model selection failed: {}", err);
        self.publish(
            generation,
            LifecycleState::Failed {
                message: err.to_string(),
            },
        );
    }
}

impl<E: ModelEngine> Drop for SessionManager<E> {
    fn drop(&mut self) {
        if let Some(prev) = self.active.get_mut().unwrap().take() {
            teardown::<E>(&prev.session, &prev.viewport);
        }
    }
}

// Session first, viewport second; the surface handle drops with the
// ActiveSession afterwards.
fn teardown<E: ModelEngine>(session: &E::Session, viewport: &E::Viewport) {
    use crate::engine::EngineSession as _;
    if let Err(e) = session.close() {
        warn!("Session close failed: {}", e);
    }
    close_viewport::<E>(viewport);
}

fn close_viewport<E: ModelEngine>(viewport: &E::Viewport) {
    use crate::engine::EngineViewport as _;
    if let Err(e) = viewport.close() {
        warn!("Viewport close failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineArtifact, EngineSession, EngineViewport, RawParameter};
    use crate::param::ParamValue;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct Counters {
        sessions_opened: AtomicUsize,
        sessions_closed: AtomicUsize,
        viewports_opened: AtomicUsize,
        viewports_closed: AtomicUsize,
    }

    impl Counters {
        fn leaks(&self) -> (usize, usize) {
            (
                self.sessions_opened.load(Ordering::SeqCst)
                    - self.sessions_closed.load(Ordering::SeqCst),
                self.viewports_opened.load(Ordering::SeqCst)
                    - self.viewports_closed.load(Ordering::SeqCst),
            )
        }
    }

    struct FakeSession {
        ticket: String,
        counters: Arc<Counters>,
    }

    impl EngineSession for FakeSession {
        fn parameters(&self) -> Vec<RawParameter> {
            Vec::new()
        }
        fn set_parameter_value(&self, _id: &str, _value: &ParamValue) {}
        async fn customize(&self) -> Result<(), EngineError> {
            Ok(())
        }
        fn exports(&self) -> Vec<EngineArtifact> {
            Vec::new()
        }
        fn outputs(&self) -> Vec<EngineArtifact> {
            Vec::new()
        }
        fn close(&self) -> Result<(), EngineError> {
            self.counters.sessions_closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeViewport {
        counters: Arc<Counters>,
    }

    impl EngineViewport for FakeViewport {
        fn close(&self) -> Result<(), EngineError> {
            self.counters
                .viewports_closed
                .fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Engine double. Session creation can be gated per ticket so tests
    /// control which in-flight selection resolves first.
    #[derive(Default)]
    struct FakeEngine {
        counters: Arc<Counters>,
        gates: HashMap<String, Arc<Notify>>,
        fail_session: bool,
        hang_session: bool,
    }

    impl FakeEngine {
        fn gated(tickets: &[&str]) -> (Self, HashMap<String, Arc<Notify>>) {
            let gates: HashMap<String, Arc<Notify>> = tickets
                .iter()
                .map(|t| (t.to_string(), Arc::new(Notify::new())))
                .collect();
            (
                Self {
                    gates: gates.clone(),
                    ..Default::default()
                },
                gates,
            )
        }
    }

    impl ModelEngine for FakeEngine {
        type Session = FakeSession;
        type Viewport = FakeViewport;

        async fn create_session(
            &self,
            ticket: &str,
            _model_view_url: &str,
        ) -> Result<FakeSession, EngineError> {
            if let Some(gate) = self.gates.get(ticket) {
                gate.notified().await;
            }
            if self.hang_session {
                std::future::pending::<()>().await;
            }
            if self.fail_session {
                return Err(EngineError::ConnectionFailed("ticket rejected".into()));
            }
            self.counters.sessions_opened.fetch_add(1, Ordering::SeqCst);
            Ok(FakeSession {
                ticket: ticket.to_string(),
                counters: Arc::clone(&self.counters),
            })
        }

        async fn create_viewport(
            &self,
            _surface: SurfaceTarget,
        ) -> Result<FakeViewport, EngineError> {
            self.counters
                .viewports_opened
                .fetch_add(1, Ordering::SeqCst);
            Ok(FakeViewport {
                counters: Arc::clone(&self.counters),
            })
        }
    }

    fn model(id: &str, ticket: &str) -> ModelConfig {
        ModelConfig {
            id: id.to_string(),
            name: id.to_string(),
            ticket: ticket.to_string(),
            model_view_url: "https://engine.example.com/view".to_string(),
            description: String::new(),
            thumbnail: None,
        }
    }

    fn surface() -> SurfaceTarget {
        SurfaceTarget("canvas-1".to_string())
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_select_installs_session_and_publishes_ready() {
        let manager = SessionManager::new(FakeEngine::default());

        let outcome = manager.select_model(&model("m1", "t1"), surface()).await;
        assert_eq!(outcome, Ok(SelectOutcome::Ready));
        assert_eq!(
            *manager.state().borrow(),
            LifecycleState::Ready {
                model_id: "m1".to_string()
            }
        );
        assert_eq!(manager.session().unwrap().ticket, "t1");
    }

    #[tokio::test]
    async fn test_switching_models_closes_previous_session_first() {
        let counters = Arc::new(Counters::default());
        let manager = SessionManager::new(FakeEngine {
            counters: Arc::clone(&counters),
            ..Default::default()
        });

        manager
            .select_model(&model("m1", "t1"), surface())
            .await
            .unwrap();
        manager
            .select_model(&model("m2", "t2"), surface())
            .await
            .unwrap();

        assert_eq!(manager.session().unwrap().ticket, "t2");
        // Exactly the first pair was torn down
        assert_eq!(counters.leaks(), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_timeout_fails_and_tears_down() {
        let counters = Arc::new(Counters::default());
        let engine = FakeEngine {
            counters: Arc::clone(&counters),
            hang_session: true,
            ..Default::default()
        };
        let manager = SessionManager::with_timeout(engine, Duration::from_secs(15));

        let selected = model("m1", "t1");
        let fut = manager.select_model(&selected, surface());
        tokio::pin!(fut);
        // Drive until the selection is blocked inside create_session
        assert!(tokio::time::timeout(Duration::from_secs(14), fut.as_mut())
            .await
            .is_err());
        tokio::time::advance(Duration::from_secs(2)).await;

        let outcome = fut.await;
        assert_eq!(outcome, Err(EngineError::Timeout(Duration::from_secs(15))));
        assert!(matches!(
            &*manager.state().borrow(),
            LifecycleState::Failed { message } if message.contains("timed out")
        ));
        // The viewport that was already created must not leak
        assert_eq!(counters.leaks(), (0, 0));
        assert!(manager.session().is_none());
    }

    #[tokio::test]
    async fn test_connection_failure_publishes_failed() {
        let counters = Arc::new(Counters::default());
        let manager = SessionManager::new(FakeEngine {
            counters: Arc::clone(&counters),
            fail_session: true,
            ..Default::default()
        });

        let outcome = manager.select_model(&model("m1", "t1"), surface()).await;
        assert!(matches!(outcome, Err(EngineError::ConnectionFailed(_))));
        assert!(matches!(
            &*manager.state().borrow(),
            LifecycleState::Failed { .. }
        ));
        assert_eq!(counters.leaks(), (0, 0));
    }

    #[tokio::test]
    async fn test_last_selection_wins_when_first_resolves_last() {
        let (mut engine, gates) = FakeEngine::gated(&["ta", "tb"]);
        let counters = Arc::new(Counters::default());
        engine.counters = Arc::clone(&counters);
        let manager = Arc::new(SessionManager::new(engine));

        let m_a = Arc::clone(&manager);
        let task_a = tokio::spawn(async move { m_a.select_model(&model("a", "ta"), surface()).await });
        settle().await;
        let m_b = Arc::clone(&manager);
        let task_b = tokio::spawn(async move { m_b.select_model(&model("b", "tb"), surface()).await });
        settle().await;

        // B resolves first, then the stale A
        gates["tb"].notify_one();
        settle().await;
        gates["ta"].notify_one();
        settle().await;

        assert_eq!(task_a.await.unwrap(), Ok(SelectOutcome::Superseded));
        assert_eq!(task_b.await.unwrap(), Ok(SelectOutcome::Ready));
        assert_eq!(
            *manager.state().borrow(),
            LifecycleState::Ready {
                model_id: "b".to_string()
            }
        );
        assert_eq!(manager.session().unwrap().ticket, "tb");
        // One live pair; everything A created was closed
        assert_eq!(counters.leaks(), (1, 1));
    }

    #[tokio::test]
    async fn test_last_selection_wins_when_first_resolves_first() {
        let (mut engine, gates) = FakeEngine::gated(&["ta", "tb"]);
        let counters = Arc::new(Counters::default());
        engine.counters = Arc::clone(&counters);
        let manager = Arc::new(SessionManager::new(engine));

        let m_a = Arc::clone(&manager);
        let task_a = tokio::spawn(async move { m_a.select_model(&model("a", "ta"), surface()).await });
        settle().await;
        let m_b = Arc::clone(&manager);
        let task_b = tokio::spawn(async move { m_b.select_model(&model("b", "tb"), surface()).await });
        settle().await;

        // A resolves first but is already stale; B then completes normally
        gates["ta"].notify_one();
        settle().await;
        gates["tb"].notify_one();
        settle().await;

        assert_eq!(task_a.await.unwrap(), Ok(SelectOutcome::Superseded));
        assert_eq!(task_b.await.unwrap(), Ok(SelectOutcome::Ready));
        assert_eq!(manager.session().unwrap().ticket, "tb");
        assert_eq!(counters.leaks(), (1, 1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_state_and_session_agree_after_parallel_selects() {
        // Selections racing on real threads: whatever interleaving happens,
        // the published Ready state must name the installed session's model.
        for _ in 0..50 {
            let manager = Arc::new(SessionManager::new(FakeEngine::default()));
            let m_a = Arc::clone(&manager);
            let task_a =
                tokio::spawn(async move { m_a.select_model(&model("a", "ta"), surface()).await });
            let m_b = Arc::clone(&manager);
            let task_b =
                tokio::spawn(async move { m_b.select_model(&model("b", "tb"), surface()).await });
            task_a.await.unwrap().unwrap();
            task_b.await.unwrap().unwrap();

            let state = manager.state().borrow().clone();
            let session = manager.session().expect("a session must be installed");
            match &state {
                LifecycleState::Ready { model_id } => {
                    assert_eq!(
                        session.ticket,
                        format!("t{}", model_id),
                        "published state must match the installed session"
                    );
                }
                other => panic!("expected Ready after both selections, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_close_tears_down_and_returns_to_idle() {
        let counters = Arc::new(Counters::default());
        let manager = SessionManager::new(FakeEngine {
            counters: Arc::clone(&counters),
            ..Default::default()
        });

        manager
            .select_model(&model("m1", "t1"), surface())
            .await
            .unwrap();
        manager.close();

        assert_eq!(*manager.state().borrow(), LifecycleState::Idle);
        assert!(manager.session().is_none());
        assert_eq!(counters.leaks(), (0, 0));
    }

    #[tokio::test]
    async fn test_close_without_session_is_a_no_op() {
        let manager = SessionManager::new(FakeEngine::default());
        manager.close();
        assert_eq!(*manager.state().borrow(), LifecycleState::Idle);
    }
}
