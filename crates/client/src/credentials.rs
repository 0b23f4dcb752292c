use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// Header that forwards the user's own model API key to the backend.
pub const API_KEY_HEADER: &str = "x-user-api-key";

/// Per-session API key, set once at session start and read by every request.
///
/// Clones share the same slot, so clearing it through any handle ends the
/// session for every backend built from it.
#[derive(Clone, Default)]
pub struct SessionCredentials {
    api_key: Arc<ArcSwapOption<String>>,
}

impl SessionCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(api_key: impl AsRef<str>) -> Self {
        let credentials = Self::new();
        credentials.set_api_key(api_key);
        credentials
    }

    /// Stores a trimmed key. Blank input is refused and leaves the slot untouched.
    pub fn set_api_key(&self, api_key: impl AsRef<str>) -> bool {
        let trimmed = api_key.as_ref().trim();
        if trimmed.is_empty() {
            return false;
        }

        self.api_key.store(Some(Arc::new(trimmed.to_string())));
        true
    }

    pub fn api_key(&self) -> Option<Arc<String>> {
        self.api_key.load_full()
    }

    pub fn is_authenticated(&self) -> bool {
        self.api_key.load().is_some()
    }

    pub fn clear(&self) {
        self.api_key.store(None);
    }
}

// Never print the key itself.
impl fmt::Debug for SessionCredentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SessionCredentials")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_refused() {
        let credentials = SessionCredentials::new();
        assert!(!credentials.set_api_key("   "));
        assert!(!credentials.is_authenticated());
    }

    #[test]
    fn clones_share_the_slot() {
        let credentials = SessionCredentials::new();
        let shared = credentials.clone();

        assert!(credentials.set_api_key("  key-123 "));
        assert_eq!(shared.api_key().as_deref().map(String::as_str), Some("key-123"));

        shared.clear();
        assert!(!credentials.is_authenticated());
        assert_eq!(credentials.api_key(), None);
    }
}
