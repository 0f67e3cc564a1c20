use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::bookmark::Bookmark;
use super::settings::Settings;

/// Bookmarks of one dashboard variant, keyed by bookmark name.
pub type BookmarkMap = BTreeMap<String, Bookmark>;

/// Everything the dashboard persists between runs. Gets serialized,
/// encrypted, and saved to the client-state file.
///
/// Contains: the session bearer token, named bookmarks per dashboard variant,
/// and the user's settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientState {
    /// Bearer token of the current session, if logged in
    pub session_token: Option<String>,

    /// Bookmark maps keyed by namespace (see `DashboardVariant::bookmark_namespace`)
    pub bookmarks: BTreeMap<String, BookmarkMap>,

    /// User settings (API URL, variant, refresh period, chart sizes)
    pub settings: Settings,
}

impl ClientState {
    /// Bookmarks stored under `namespace`, if any.
    #[must_use]
    pub fn bookmarks_in(&self, namespace: &str) -> Option<&BookmarkMap> {
        self.bookmarks.get(namespace)
    }

    /// Mutable bookmark map for `namespace`, created on first use.
    pub fn bookmarks_in_mut(&mut self, namespace: &str) -> &mut BookmarkMap {
        self.bookmarks.entry(namespace.to_string()).or_default()
    }

    /// Total number of bookmarks across all namespaces.
    #[must_use]
    pub fn bookmark_count(&self) -> usize {
        self.bookmarks.values().map(BTreeMap::len).sum()
    }
}
