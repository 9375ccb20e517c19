use objcomplete_core::{MatchFeedback, SuggestionItem};

use super::ErrorIndicator;
use super::state::ControllerState;

/// Lifecycle callbacks of an autocomplete controller.
///
/// Every method defaults to doing nothing, so an implementation only
/// overrides the hooks it cares about. The hooks object is also the
/// rendering target: `on_open` receives the whole replacement list each
/// time it is populated.
pub trait AutocompleteHooks {
    /// The suggestion list was (re)populated with at least one item.
    fn on_open(&mut self, _items: &[SuggestionItem]) {}

    /// A non-empty suggestion list was cleared.
    fn on_close(&mut self) {}

    fn on_focus(&mut self) {}

    /// The user picked an item; collaborators typically show that object.
    fn on_select(&mut self, _item: &SuggestionItem) {}

    fn on_error(&mut self, _error: ErrorIndicator) {}

    fn on_feedback(&mut self, _feedback: MatchFeedback) {}

    fn on_state_change(&mut self, _from: ControllerState, _to: ControllerState) {}
}

/// Hooks that ignore every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl AutocompleteHooks for NoopHooks {}
