use crate::errors::CoreError;
use crate::models::bookmark::Bookmark;
use crate::models::chart::ChartVisibility;
use crate::models::filter::FilterState;
use crate::models::state::BookmarkMap;

/// Longest accepted bookmark name, in characters.
pub const MAX_BOOKMARK_NAME_LEN: usize = 64;

/// Business logic for named bookmarks within one namespace.
///
/// Operates on a borrowed map so the caller decides which namespace
/// (dashboard variant) is being edited.
pub struct BookmarkService;

impl BookmarkService {
    pub fn new() -> Self {
        Self
    }

    /// Trim and validate a bookmark name.
    pub fn validate_name(&self, name: &str) -> Result<String, CoreError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CoreError::ValidationError(
                "Bookmark name must not be empty".into(),
            ));
        }
        if trimmed.chars().count() > MAX_BOOKMARK_NAME_LEN {
            return Err(CoreError::ValidationError(format!(
                "Bookmark name must be at most {MAX_BOOKMARK_NAME_LEN} characters"
            )));
        }
        Ok(trimmed.to_string())
    }

    /// Save the current filter + chart selection under a new name.
    pub fn save(
        &self,
        bookmarks: &mut BookmarkMap,
        name: &str,
        filter: &FilterState,
        charts: &ChartVisibility,
    ) -> Result<Bookmark, CoreError> {
        let name = self.validate_name(name)?;
        if bookmarks.contains_key(&name) {
            return Err(CoreError::BookmarkExists(name));
        }
        let bookmark = Bookmark::new(name.clone(), filter, charts);
        bookmarks.insert(name, bookmark.clone());
        tracing::info!(bookmark = %bookmark.name, "bookmark saved");
        Ok(bookmark)
    }

    /// Replace the stored selection of an existing bookmark, keeping its id.
    pub fn update(
        &self,
        bookmarks: &mut BookmarkMap,
        name: &str,
        filter: &FilterState,
        charts: &ChartVisibility,
    ) -> Result<Bookmark, CoreError> {
        let key = name.trim();
        let existing = bookmarks
            .get_mut(key)
            .ok_or_else(|| CoreError::BookmarkNotFound(key.to_string()))?;
        existing.product = filter.product.clone();
        existing.store = filter.store.clone();
        existing.charts = charts.clone();
        Ok(existing.clone())
    }

    pub fn rename(&self, bookmarks: &mut BookmarkMap, from: &str, to: &str) -> Result<(), CoreError> {
        let from = from.trim();
        let to = self.validate_name(to)?;
        if from == to {
            return if bookmarks.contains_key(from) {
                Ok(())
            } else {
                Err(CoreError::BookmarkNotFound(from.to_string()))
            };
        }
        if bookmarks.contains_key(&to) {
            return Err(CoreError::BookmarkExists(to));
        }
        let mut bookmark = bookmarks
            .remove(from)
            .ok_or_else(|| CoreError::BookmarkNotFound(from.to_string()))?;
        bookmark.name = to.clone();
        bookmarks.insert(to, bookmark);
        Ok(())
    }

    pub fn delete(&self, bookmarks: &mut BookmarkMap, name: &str) -> Result<Bookmark, CoreError> {
        let name = name.trim();
        bookmarks
            .remove(name)
            .ok_or_else(|| CoreError::BookmarkNotFound(name.to_string()))
    }

    /// Filter and chart visibility stored under `name`.
    pub fn apply(
        &self,
        bookmarks: &BookmarkMap,
        name: &str,
    ) -> Result<(FilterState, ChartVisibility), CoreError> {
        let name = name.trim();
        let bookmark = bookmarks
            .get(name)
            .ok_or_else(|| CoreError::BookmarkNotFound(name.to_string()))?;
        Ok((bookmark.filter(), bookmark.charts.clone()))
    }

    /// All bookmarks, ordered by name.
    #[must_use]
    pub fn list<'a>(&self, bookmarks: &'a BookmarkMap) -> Vec<&'a Bookmark> {
        bookmarks.values().collect()
    }
}

impl Default for BookmarkService {
    fn default() -> Self {
        Self::new()
    }
}
