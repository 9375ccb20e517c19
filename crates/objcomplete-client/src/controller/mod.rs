//! The autocomplete input controller.
//!
//! `AutocompleteController` is a synchronous state machine: it never sleeps
//! and never touches the network. Each operation returns the [`Command`]s a
//! driver must carry out (see [`session`]), and results come back in through
//! [`AutocompleteController::on_debounce_elapsed`] and
//! [`AutocompleteController::on_response`].
//!
//! A response is applied only if its request id is the one outstanding,
//! non-cancelled request. Every new query cancels the previous one, so the
//! displayed list always belongs to the newest live query no matter in
//! which order replies arrive.

pub mod hooks;
pub mod session;
pub mod state;

use std::fmt;
use std::time::Duration;

use objcomplete_core::{InputConfig, MatchFeedback, QueryKind, SuggestionItem};
use tracing::{debug, warn};

use crate::backend::{QueryRequest, RequestId};
use crate::error::{LookupErrorKind, Result};

pub use hooks::{AutocompleteHooks, NoopHooks};
pub use session::{AutocompleteSession, SessionHandle};
pub use state::{ControllerState, InputState, PendingRequest};

/// Work the driver has to do on behalf of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// (Re)arm the debounce timer; report back with this generation.
    ScheduleDebounce { generation: u64, delay: Duration },
    /// Send exactly one lookup request.
    Issue(QueryRequest),
    /// The request was superseded. Aborting the transport is optional.
    Abort(RequestId),
}

/// User-visible failure surfaced through [`AutocompleteHooks::on_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorIndicator {
    LookupUnavailable,
    BackendFailure,
}

impl From<LookupErrorKind> for ErrorIndicator {
    fn from(kind: LookupErrorKind) -> Self {
        match kind {
            LookupErrorKind::Network => Self::LookupUnavailable,
            LookupErrorKind::Backend => Self::BackendFailure,
        }
    }
}

impl fmt::Display for ErrorIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LookupUnavailable => f.write_str("lookup unavailable"),
            Self::BackendFailure => f.write_str("no results / error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    Applied { count: usize },
    Failed(ErrorIndicator),
    /// Superseded or unknown request; dropped silently.
    Stale,
}

/// Point-in-time copy of what the controller displays.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub state: ControllerState,
    pub text: String,
    pub suggestions: Vec<SuggestionItem>,
    pub feedback: MatchFeedback,
}

pub struct AutocompleteController<H: AutocompleteHooks = NoopHooks> {
    input: InputState,
    state: ControllerState,
    feedback: MatchFeedback,
    max_suggestions: usize,
    syntax_gate: bool,
    debounce_generation: u64,
    last_request_id: u64,
    pending: Option<PendingRequest>,
    suggestions: Vec<SuggestionItem>,
    hooks: H,
}

impl<H: AutocompleteHooks> fmt::Debug for AutocompleteController<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutocompleteController")
            .field("input", &self.input)
            .field("state", &self.state)
            .field("feedback", &self.feedback)
            .field("pending", &self.pending)
            .field("suggestions", &self.suggestions)
            .finish_non_exhaustive()
    }
}

impl AutocompleteController<NoopHooks> {
    pub fn without_hooks(config: &InputConfig) -> Self {
        Self::new(config, NoopHooks)
    }
}

impl<H: AutocompleteHooks> AutocompleteController<H> {
    pub fn new(config: &InputConfig, hooks: H) -> Self {
        Self {
            input: InputState::from_config(config),
            state: ControllerState::Idle,
            feedback: MatchFeedback::Idle,
            max_suggestions: config.max_suggestions,
            syntax_gate: config.syntax_gate,
            debounce_generation: 0,
            last_request_id: 0,
            pending: None,
            suggestions: Vec::new(),
            hooks,
        }
    }

    // ─── Accessors ─────────────────────────────────────────

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn text(&self) -> &str {
        &self.input.current_text
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn suggestions(&self) -> &[SuggestionItem] {
        &self.suggestions
    }

    pub fn feedback(&self) -> MatchFeedback {
        self.feedback
    }

    pub fn pending_request(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn into_hooks(self) -> H {
        self.hooks
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            text: self.input.current_text.clone(),
            suggestions: self.suggestions.clone(),
            feedback: self.feedback,
        }
    }

    // ─── Events ────────────────────────────────────────────

    /// Called on every change of the input text. Restarts the debounce
    /// timer and supersedes any request still in flight.
    pub fn on_input_changed(&mut self, new_text: impl Into<String>) -> Vec<Command> {
        self.input.current_text = new_text.into();
        self.debounce_generation += 1;

        let mut commands = Vec::new();
        if let Some(id) = self.cancel_pending() {
            commands.push(Command::Abort(id));
            self.transition(ControllerState::Superseded);
        }
        self.transition(ControllerState::Debouncing);
        commands.push(Command::ScheduleDebounce {
            generation: self.debounce_generation,
            delay: self.input.debounce,
        });
        commands
    }

    /// The debounce timer armed with `generation` fired. Timers that were
    /// re-armed or cancelled since are ignored.
    pub fn on_debounce_elapsed(&mut self, generation: u64) -> Vec<Command> {
        if generation != self.debounce_generation || self.state != ControllerState::Debouncing {
            debug!(generation, current = self.debounce_generation, "ignoring stale debounce timer");
            return Vec::new();
        }
        let text = self.input.current_text.clone();
        self.fire_query_if_eligible(text)
    }

    /// Issue a query for `text` if it is long enough (and, with the opt-in
    /// syntax gate, starts like an oid prefix or a name). Otherwise clear
    /// the list.
    pub fn fire_query_if_eligible(&mut self, text: impl Into<String>) -> Vec<Command> {
        let text = text.into();
        let mut commands = Vec::new();
        if let Some(id) = self.cancel_pending() {
            commands.push(Command::Abort(id));
        }

        let kind = QueryKind::classify(&text);
        let length = InputState::len_of(&text);
        let rejected = if length < self.input.min_length {
            Some(if length == 0 {
                MatchFeedback::Idle
            } else {
                MatchFeedback::Incomplete
            })
        } else if self.syntax_gate && kind.is_none() {
            Some(MatchFeedback::Invalid)
        } else {
            None
        };

        if let Some(feedback) = rejected {
            self.clear_suggestions();
            self.set_feedback(feedback);
            self.transition(ControllerState::Idle);
            return commands;
        }

        self.last_request_id += 1;
        let id = RequestId(self.last_request_id);
        self.pending = Some(PendingRequest {
            request_id: id,
            text: text.clone(),
            cancelled: false,
        });
        self.set_feedback(MatchFeedback::Pending);
        self.transition(ControllerState::AwaitingResponse);
        debug!(%id, %text, "issuing lookup");

        commands.push(Command::Issue(QueryRequest { id, text, kind }));
        commands
    }

    /// A lookup finished. Applied only when `request_id` is the live request.
    ///
    /// Ids only grow and at most one request is live, so the live one is
    /// always newer than whatever list is on display.
    pub fn on_response(
        &mut self,
        request_id: RequestId,
        result: Result<Vec<SuggestionItem>>,
    ) -> ResponseOutcome {
        let live = matches!(
            &self.pending,
            Some(p) if p.request_id == request_id && !p.cancelled
        );
        if !live {
            if matches!(&self.pending, Some(p) if p.request_id == request_id) {
                self.pending = None;
            }
            debug!(%request_id, "dropping stale response");
            return ResponseOutcome::Stale;
        }
        self.pending = None;

        let outcome = match result {
            Ok(mut items) => {
                let count = items.len();
                items.truncate(self.max_suggestions);
                self.replace_suggestions(items);
                self.set_feedback(MatchFeedback::from_count(count, self.max_suggestions));
                ResponseOutcome::Applied { count }
            }
            Err(e) => {
                let indicator = ErrorIndicator::from(e.kind());
                warn!(%request_id, error = %e, "lookup failed");
                self.clear_suggestions();
                self.set_feedback(MatchFeedback::Unavailable);
                self.hooks.on_error(indicator);
                ResponseOutcome::Failed(indicator)
            }
        };
        self.transition(ControllerState::Idle);
        outcome
    }

    /// Put the item's text in the input, close the list and tell collaborators.
    pub fn on_suggestion_selected(&mut self, item: SuggestionItem) -> Vec<Command> {
        self.input.current_text = item.display_text().to_string();
        let commands = self.settle();
        self.set_feedback(MatchFeedback::Unique);
        self.hooks.on_select(&item);
        commands
    }

    /// Select the `index`-th displayed suggestion; out of range does nothing.
    pub fn select_index(&mut self, index: usize) -> Vec<Command> {
        match self.suggestions.get(index).cloned() {
            Some(item) => self.on_suggestion_selected(item),
            None => {
                debug!(index, shown = self.suggestions.len(), "no suggestion at index");
                Vec::new()
            }
        }
    }

    pub fn on_focus(&mut self) {
        self.hooks.on_focus();
    }

    /// Losing focus closes the list and drops pending work; the text stays.
    pub fn on_blur(&mut self) -> Vec<Command> {
        let commands = self.settle();
        self.set_feedback(MatchFeedback::Idle);
        commands
    }

    // ─── Internals ─────────────────────────────────────────

    /// Cancel the timer and any request, clear the list, go idle.
    fn settle(&mut self) -> Vec<Command> {
        self.debounce_generation += 1;
        let commands = self
            .cancel_pending()
            .map(Command::Abort)
            .into_iter()
            .collect();
        self.clear_suggestions();
        self.transition(ControllerState::Idle);
        commands
    }

    /// Mark the outstanding request cancelled, returning its id if it was live.
    fn cancel_pending(&mut self) -> Option<RequestId> {
        match self.pending.as_mut() {
            Some(p) if !p.cancelled => {
                p.cancelled = true;
                debug!(request_id = %p.request_id, "request superseded");
                Some(p.request_id)
            }
            _ => None,
        }
    }

    fn transition(&mut self, to: ControllerState) {
        let from = self.state;
        if from != to {
            self.state = to;
            debug!(%from, %to, "state change");
            self.hooks.on_state_change(from, to);
        }
    }

    fn replace_suggestions(&mut self, items: Vec<SuggestionItem>) {
        if items.is_empty() {
            self.clear_suggestions();
            return;
        }
        self.suggestions = items;
        self.hooks.on_open(&self.suggestions);
    }

    fn clear_suggestions(&mut self) {
        if !self.suggestions.is_empty() {
            self.suggestions.clear();
            self.hooks.on_close();
        }
    }

    fn set_feedback(&mut self, feedback: MatchFeedback) {
        if self.feedback != feedback {
            self.feedback = feedback;
            self.hooks.on_feedback(feedback);
        }
    }
}
