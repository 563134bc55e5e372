//! Local filtering of already-fetched posts.
//!
//! Filtering never talks to the server: it narrows whatever the pagination
//! controller has accumulated so far. The query text is remembered in the
//! session store so it survives navigating between subjects.

pub mod category;

pub use category::{Category, CATEGORIES};

use crate::feed::Post;
use crate::session::SessionStore;
use crate::util::MAX_SEARCH_QUERY_LENGTH;
use std::collections::BTreeSet;

/// Session key the query is persisted under.
pub const SEARCH_QUERY_KEY: &str = "search-query";

/// Text query plus selected categories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    query: String,
    selected_categories: BTreeSet<String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter whose query is read back from the session store.
    ///
    /// Categories are not persisted and start empty. A stored query longer
    /// than [`MAX_SEARCH_QUERY_LENGTH`] characters is ignored.
    pub fn restore(store: &dyn SessionStore) -> Self {
        let query = match store.get(SEARCH_QUERY_KEY) {
            Some(query) if query.chars().count() > MAX_SEARCH_QUERY_LENGTH => {
                tracing::warn!(
                    max_chars = MAX_SEARCH_QUERY_LENGTH,
                    "Ignoring over-long persisted search query"
                );
                String::new()
            }
            Some(query) => query,
            None => String::new(),
        };
        Self {
            query,
            selected_categories: BTreeSet::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Replace the query and persist it.
    ///
    /// The query is matched exactly as given; input length is capped where
    /// the user types it.
    pub fn set_query(&mut self, query: &str, store: &dyn SessionStore) {
        if query == self.query {
            return;
        }
        store.set(SEARCH_QUERY_KEY, query);
        self.query = query.to_string();
    }

    /// Select `key` if unselected, otherwise unselect it. Returns the new selection state.
    pub fn toggle_category(&mut self, key: &str) -> bool {
        if self.selected_categories.remove(key) {
            false
        } else {
            self.selected_categories.insert(key.to_string());
            true
        }
    }

    pub fn clear_categories(&mut self) {
        self.selected_categories.clear();
    }

    /// Reset query and categories.
    pub fn clear(&mut self, store: &dyn SessionStore) {
        self.set_query("", store);
        self.clear_categories();
    }

    pub fn selected_categories(&self) -> &BTreeSet<String> {
        &self.selected_categories
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected_categories.contains(key)
    }

    /// True when the filter can hide anything.
    pub fn is_active(&self) -> bool {
        !self.query.is_empty() || !self.selected_categories.is_empty()
    }

    pub fn matches(&self, post: &Post) -> bool {
        self.matches_lowered(post, &self.query.to_lowercase())
    }

    fn matches_lowered(&self, post: &Post, needle: &str) -> bool {
        let text_ok = needle.is_empty() || post.text.to_lowercase().contains(needle);
        let category_ok = self.selected_categories.is_empty()
            || post
                .categories
                .iter()
                .any(|c| self.selected_categories.contains(c));
        text_ok && category_ok
    }

    /// Posts passing the filter, in input order.
    pub fn apply<'a, I>(&self, posts: I) -> Vec<&'a Post>
    where
        I: IntoIterator<Item = &'a Post>,
    {
        let needle = self.query.to_lowercase();
        posts
            .into_iter()
            .filter(|post| self.matches_lowered(post, &needle))
            .collect()
    }
}
