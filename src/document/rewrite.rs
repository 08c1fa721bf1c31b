//! Build-time rewrite of placeholder deeplinks.
//!
//! The authoring tool calls this after any structural edit to the screen
//! list. `next-screen` / `prev-screen` placeholders are rewritten to the
//! concrete neighbor screen id in document order; placeholders with no such
//! neighbor are left untouched. Idempotent: concrete targets never match a
//! placeholder again.

use tracing::debug;

use crate::document::model::{EventAction, ScreenDocument};
use crate::navigation::{self, NEXT_SCREEN, PREV_SCREEN};

/// Rewrite placeholder deeplinks in every screen's events and element
/// events. Returns the number of rewritten links.
pub fn rewrite_placeholder_deeplinks(document: &mut ScreenDocument) -> usize {
    let order: Vec<String> = document.screens.iter().map(|s| s.id.clone()).collect();
    let mut rewritten = 0;

    for (index, screen) in document.screens.iter_mut().enumerate() {
        let next = order.get(index + 1).cloned();
        let prev = index.checked_sub(1).and_then(|i| order.get(i)).cloned();

        let element_events = screen
            .sections
            .iter_mut()
            .flat_map(|s| s.elements.iter_mut())
            .flat_map(|e| e.events.iter_mut());
        let screen_events = screen.events.iter_mut();

        for event in screen_events.chain(element_events) {
            for action in &mut event.actions {
                rewritten += rewrite_action(action, next.as_deref(), prev.as_deref());
            }
        }
    }

    if rewritten > 0 {
        debug!(count = rewritten, "Rewrote placeholder deeplinks");
    }
    rewritten
}

fn rewrite_action(action: &mut EventAction, next: Option<&str>, prev: Option<&str>) -> usize {
    match action {
        EventAction::Navigation { deeplink, .. } => {
            let target = navigation::resolve_deeplink(deeplink);
            let replacement = match target.as_str() {
                NEXT_SCREEN => next,
                PREV_SCREEN => prev,
                _ => None,
            };
            match replacement {
                Some(id) => {
                    *deeplink = id.to_string();
                    1
                }
                None => 0,
            }
        }
        EventAction::ServiceCall {
            on_success,
            on_error,
            ..
        } => on_success
            .iter_mut()
            .chain(on_error.iter_mut())
            .map(|sub| rewrite_action(sub, next, prev))
            .sum(),
        _ => 0,
    }
}
