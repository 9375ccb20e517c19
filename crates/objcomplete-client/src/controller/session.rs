//! Event loop that drives an [`AutocompleteController`].
//!
//! One task owns the controller and handles events strictly one at a time.
//! Debounce timers and lookups run as their own tasks and report back
//! through an internal channel, so the controller only ever sees completed
//! results, in the order the loop receives them.

use std::collections::HashMap;
use std::sync::Arc;

use objcomplete_core::SuggestionItem;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use super::{AutocompleteController, AutocompleteHooks, Command, Snapshot};
use crate::backend::{LookupBackend, RequestId};
use crate::error::Result;

/// Events a caller can feed into a running session.
#[derive(Debug)]
pub enum SessionEvent {
    InputChanged(String),
    Select(usize),
    Focus,
    Blur,
    Snapshot(oneshot::Sender<Snapshot>),
    Shutdown,
}

/// Events produced by the session's own timer and lookup tasks.
enum Internal {
    DebounceElapsed(u64),
    Response {
        id: RequestId,
        result: Result<Vec<SuggestionItem>>,
    },
}

/// Cheap, cloneable sender side of a session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    /// Returns `false` once the session has stopped.
    pub fn input_changed(&self, text: impl Into<String>) -> bool {
        self.send(SessionEvent::InputChanged(text.into()))
    }

    pub fn select(&self, index: usize) -> bool {
        self.send(SessionEvent::Select(index))
    }

    pub fn focus(&self) -> bool {
        self.send(SessionEvent::Focus)
    }

    pub fn blur(&self) -> bool {
        self.send(SessionEvent::Blur)
    }

    pub async fn snapshot(&self) -> Option<Snapshot> {
        let (reply, rx) = oneshot::channel();
        if !self.send(SessionEvent::Snapshot(reply)) {
            return None;
        }
        rx.await.ok()
    }

    pub fn shutdown(&self) -> bool {
        self.send(SessionEvent::Shutdown)
    }

    fn send(&self, event: SessionEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

pub struct AutocompleteSession<H: AutocompleteHooks> {
    controller: AutocompleteController<H>,
    backend: Arc<dyn LookupBackend>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    debounce_timer: Option<JoinHandle<()>>,
    in_flight: HashMap<RequestId, JoinHandle<()>>,
}

impl<H> AutocompleteSession<H>
where
    H: AutocompleteHooks + Send + 'static,
{
    /// Start the event loop. It stops on [`SessionHandle::shutdown`] or when
    /// every handle is dropped, and yields the controller back.
    pub fn spawn(
        controller: AutocompleteController<H>,
        backend: Arc<dyn LookupBackend>,
    ) -> (SessionHandle, JoinHandle<AutocompleteController<H>>) {
        let (tx, events) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let session = Self {
            controller,
            backend,
            events,
            internal_tx,
            internal_rx,
            debounce_timer: None,
            in_flight: HashMap::new(),
        };
        let join = tokio::spawn(session.run());
        (SessionHandle { tx }, join)
    }

    async fn run(mut self) -> AutocompleteController<H> {
        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(SessionEvent::Shutdown) | None => break,
                    Some(event) => self.handle_event(event),
                },
                Some(internal) = self.internal_rx.recv() => self.handle_internal(internal),
            }
        }

        if let Some(timer) = self.debounce_timer.take() {
            timer.abort();
        }
        for (_, task) in self.in_flight.drain() {
            task.abort();
        }
        debug!("autocomplete session stopped");
        self.controller
    }

    fn handle_event(&mut self, event: SessionEvent) {
        let commands = match event {
            SessionEvent::InputChanged(text) => self.controller.on_input_changed(text),
            SessionEvent::Select(index) => self.controller.select_index(index),
            SessionEvent::Focus => {
                self.controller.on_focus();
                Vec::new()
            }
            SessionEvent::Blur => self.controller.on_blur(),
            SessionEvent::Snapshot(reply) => {
                let _ = reply.send(self.controller.snapshot());
                Vec::new()
            }
            SessionEvent::Shutdown => Vec::new(),
        };
        self.execute(commands);
    }

    fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::DebounceElapsed(generation) => {
                self.debounce_timer = None;
                let commands = self.controller.on_debounce_elapsed(generation);
                self.execute(commands);
            }
            Internal::Response { id, result } => {
                self.in_flight.remove(&id);
                let outcome = self.controller.on_response(id, result);
                debug!(%id, ?outcome, "lookup response handled");
            }
        }
    }

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::ScheduleDebounce { generation, delay } => {
                    if let Some(old) = self.debounce_timer.take() {
                        old.abort();
                    }
                    let tx = self.internal_tx.clone();
                    self.debounce_timer = Some(tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(Internal::DebounceElapsed(generation));
                    }));
                }
                Command::Issue(query) => {
                    let backend = Arc::clone(&self.backend);
                    let tx = self.internal_tx.clone();
                    let id = query.id;
                    let task = tokio::spawn(async move {
                        let result = backend.lookup(&query).await;
                        let _ = tx.send(Internal::Response { id, result });
                    });
                    self.in_flight.insert(id, task);
                }
                Command::Abort(id) => {
                    if let Some(task) = self.in_flight.remove(&id) {
                        task.abort();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use mockito::{Matcher, Server};
    use objcomplete_core::{EndpointConfig, InputConfig, MatchFeedback};

    use super::*;
    use crate::backend::{BackendStatus, HttpBackend, QueryRequest, closed_port_backend};
    use crate::controller::ControllerState;
    use crate::controller::hooks::recording::{HookEvent, RecordingHooks};
    use crate::error::LookupError;

    /// Answers `{text}-thing` after a per-text delay; texts in `failing` error out.
    #[derive(Default)]
    struct ScriptedBackend {
        calls: Mutex<Vec<String>>,
        delays: HashMap<String, Duration>,
        failing: Vec<String>,
    }

    impl ScriptedBackend {
        fn with_delay(mut self, text: &str, delay: Duration) -> Self {
            self.delays.insert(text.to_string(), delay);
            self
        }

        fn failing_on(mut self, text: &str) -> Self {
            self.failing.push(text.to_string());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LookupBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn lookup(&self, query: &QueryRequest) -> Result<Vec<SuggestionItem>> {
            self.calls.lock().unwrap().push(query.text.clone());
            if let Some(delay) = self.delays.get(&query.text) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing.contains(&query.text) {
                let unsendable = reqwest::Client::new().get("not a url").build();
                return Err(LookupError::Http(unsendable.unwrap_err()));
            }
            Ok(vec![SuggestionItem::new(
                format!("oid-{}", query.text),
                format!("{}-thing", query.text),
            )])
        }

        async fn health_check(&self) -> BackendStatus {
            BackendStatus {
                available: true,
                latency_ms: Some(0),
                last_checked: None,
                error: None,
            }
        }
    }

    fn input_config(debounce_ms: u64) -> InputConfig {
        InputConfig {
            debounce_ms,
            ..InputConfig::default()
        }
    }

    fn labels(snapshot: &Snapshot) -> Vec<String> {
        snapshot
            .suggestions
            .iter()
            .map(|s| s.display_text().to_string())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_typing_issues_one_request() {
        let backend = Arc::new(ScriptedBackend::default());
        let controller = AutocompleteController::new(&input_config(250), RecordingHooks::default());
        let (handle, join) = AutocompleteSession::spawn(controller, backend.clone());

        for text in ["abc", "abcd", "abcde"] {
            handle.input_changed(text);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(backend.calls().is_empty());

        tokio::time::sleep(Duration::from_millis(400)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(backend.calls(), vec!["abcde".to_string()]);
        assert_eq!(labels(&snapshot), vec!["abcde-thing".to_string()]);
        assert_eq!(snapshot.state, ControllerState::Idle);

        handle.shutdown();
        join.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn short_input_never_reaches_backend() {
        let backend = Arc::new(ScriptedBackend::default());
        let controller = AutocompleteController::without_hooks(&input_config(100));
        let (handle, _join) = AutocompleteSession::spawn(controller, backend.clone());

        handle.input_changed("a");
        handle.input_changed("ab");
        tokio::time::sleep(Duration::from_millis(500)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert!(backend.calls().is_empty());
        assert!(snapshot.suggestions.is_empty());
        assert_eq!(snapshot.feedback, MatchFeedback::Incomplete);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_superseded_lookup_never_overwrites() {
        let backend = Arc::new(
            ScriptedBackend::default()
                .with_delay("abc", Duration::from_millis(1000))
                .with_delay("abcd", Duration::from_millis(10)),
        );
        let controller = AutocompleteController::without_hooks(&input_config(100));
        let (handle, _join) = AutocompleteSession::spawn(controller, backend.clone());

        handle.input_changed("abc");
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(handle.snapshot().await.unwrap().state, ControllerState::AwaitingResponse);

        handle.input_changed("abcd");
        tokio::time::sleep(Duration::from_millis(2000)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(backend.calls(), vec!["abc".to_string(), "abcd".to_string()]);
        assert_eq!(labels(&snapshot), vec!["abcd-thing".to_string()]);
        assert_eq!(snapshot.text, "abcd");
    }

    #[tokio::test(start_paused = true)]
    async fn failure_then_fresh_request() {
        let backend = Arc::new(ScriptedBackend::default().failing_on("abc"));
        let hooks = RecordingHooks::default();
        let controller = AutocompleteController::new(&input_config(100), hooks.clone());
        let (handle, _join) = AutocompleteSession::spawn(controller, backend.clone());

        handle.input_changed("abc");
        tokio::time::sleep(Duration::from_millis(200)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state, ControllerState::Idle);
        assert!(snapshot.suggestions.is_empty());
        assert_eq!(snapshot.feedback, MatchFeedback::Unavailable);
        assert!(hooks.events().contains(&HookEvent::Error(
            crate::controller::ErrorIndicator::LookupUnavailable
        )));

        handle.input_changed("abcd");
        tokio::time::sleep(Duration::from_millis(200)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(labels(&snapshot), vec!["abcd-thing".to_string()]);
        assert_eq!(backend.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handles_stops_session() {
        let backend = Arc::new(ScriptedBackend::default());
        let hooks = RecordingHooks::default();
        let controller = AutocompleteController::new(&input_config(100), hooks);
        let (handle, join) = AutocompleteSession::spawn(controller, backend);

        handle.input_changed("abc");
        tokio::time::sleep(Duration::from_millis(200)).await;
        drop(handle);

        let controller = join.await.unwrap();
        assert_eq!(controller.text(), "abc");
        assert_eq!(controller.suggestions().len(), 1);
    }

    async fn wait_for<F>(handle: &SessionHandle, mut done: F) -> Snapshot
    where
        F: FnMut(&Snapshot) -> bool,
    {
        for _ in 0..200 {
            let snapshot = handle.snapshot().await.unwrap();
            if done(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session never reached the expected state");
    }

    #[tokio::test]
    async fn refused_connection_surfaces_lookup_unavailable() {
        let hooks = RecordingHooks::default();
        let controller = AutocompleteController::new(&input_config(20), hooks.clone());
        let (handle, join) = AutocompleteSession::spawn(controller, Arc::new(closed_port_backend()));

        handle.input_changed("abc");
        let snapshot = wait_for(&handle, |s| s.feedback == MatchFeedback::Unavailable).await;
        assert_eq!(snapshot.state, ControllerState::Idle);
        assert!(snapshot.suggestions.is_empty());
        assert!(hooks.events().contains(&HookEvent::Error(
            crate::controller::ErrorIndicator::LookupUnavailable
        )));

        handle.shutdown();
        join.await.unwrap();
    }

    #[tokio::test]
    async fn scenario_against_http_endpoint() {
        let mut server = Server::new_async().await;
        let short = server
            .mock("GET", "/complete_object")
            .match_query(Matcher::UrlEncoded("text".into(), "ab".into()))
            .expect(0)
            .create_async()
            .await;
        let lookup = server
            .mock("GET", "/complete_object")
            .match_query(Matcher::UrlEncoded("text".into(), "abc".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"oid":"42","label":"abc-thing"}]"#)
            .expect(1)
            .create_async()
            .await;

        let backend =
            HttpBackend::from_config(&format!("{}/index.html", server.url()), &EndpointConfig::default())
                .unwrap();
        let hooks = RecordingHooks::default();
        let controller = AutocompleteController::new(&input_config(20), hooks.clone());
        let (handle, join) = AutocompleteSession::spawn(controller, Arc::new(backend));

        handle.input_changed("ab");
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(handle.snapshot().await.unwrap().suggestions.is_empty());

        handle.input_changed("abc");
        let snapshot = wait_for(&handle, |s| !s.suggestions.is_empty()).await;
        assert_eq!(labels(&snapshot), vec!["abc-thing".to_string()]);

        handle.select(0);
        let snapshot = wait_for(&handle, |s| s.text == "abc-thing").await;
        assert!(snapshot.suggestions.is_empty());
        assert!(hooks.events().contains(&HookEvent::Select("42".to_string())));

        handle.shutdown();
        join.await.unwrap();
        short.assert_async().await;
        lookup.assert_async().await;
    }
}
