//! Navigation history and runtime deeplink resolution.

use tracing::debug;
use url::Url;

/// Placeholder deeplink targets resolved by the build-time rewrite, never at
/// runtime.
pub const NEXT_SCREEN: &str = "next-screen";
pub const PREV_SCREEN: &str = "prev-screen";

/// Resolve a deeplink to a target screen identifier.
///
/// URL-shaped links (`https://<host>/<module>/<screenId>`) resolve to the
/// last non-empty path segment; anything that does not parse as a URL is
/// taken verbatim as the identifier.
pub fn resolve_deeplink(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
            .map(str::to_string)
            .unwrap_or_else(|| raw.to_string()),
        Err(_) => raw.to_string(),
    }
}

/// Ordered history of visited screen identifiers. Never empty once a screen
/// has been activated: the first-activated screen cannot be popped.
#[derive(Debug, Default, Clone)]
pub struct NavigationStack {
    entries: Vec<String>,
}

impl NavigationStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a screen to the history.
    pub fn push(&mut self, id: impl Into<String>) {
        self.entries.push(id.into());
    }

    /// Remove the top entry, unless it is the only one. Returns the popped
    /// id, or `None` for the no-op case.
    pub fn pop(&mut self) -> Option<String> {
        if self.entries.len() > 1 {
            self.entries.pop()
        } else {
            debug!("Ignoring pop on a single-entry navigation stack");
            None
        }
    }

    /// The currently active screen id.
    pub fn current(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full history, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}
