use super::types::{Cursor, Page, Post};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    /// The page was requested with a cursor other than the one the chain hands out next.
    #[error("Page cursor {got:?} does not continue the chain (expected {expected:?})")]
    CursorMismatch {
        expected: Option<Cursor>,
        got: Option<Cursor>,
    },
    /// The last page has no next cursor.
    #[error("Chain already holds the last page")]
    Exhausted,
}

/// Ordered pages plus the cursor each page was requested with.
///
/// Invariant: `pages[i]` was fetched with `cursors[i]`, `cursors[0]` is `None`
/// and `cursors[i + 1] == pages[i].next_cursor`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageChain {
    pages: Vec<Page>,
    cursors: Vec<Option<Cursor>>,
}

impl PageChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain holding a pre-fetched first page.
    pub fn seeded(first: Page) -> Self {
        Self {
            pages: vec![first],
            cursors: vec![None],
        }
    }

    /// Append a page fetched with `cursor`.
    pub fn push(&mut self, cursor: Option<Cursor>, page: Page) -> Result<(), ChainError> {
        if !self.has_next_page() {
            return Err(ChainError::Exhausted);
        }
        let expected = self.next_cursor().cloned();
        if cursor != expected {
            return Err(ChainError::CursorMismatch {
                expected,
                got: cursor,
            });
        }

        self.cursors.push(cursor);
        self.pages.push(page);
        Ok(())
    }

    /// True iff the last page has a next cursor, or no page has been fetched yet.
    pub fn has_next_page(&self) -> bool {
        self.pages.last().map_or(true, |page| !page.is_last())
    }

    /// Cursor for the next request; `None` both for the first page and after the last.
    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.pages.last().and_then(|page| page.next_cursor.as_ref())
    }

    /// All posts across pages, in fetch order.
    pub fn posts(&self) -> impl Iterator<Item = &Post> + '_ {
        self.pages.iter().flat_map(|page| page.posts.iter())
    }

    pub fn post_count(&self) -> usize {
        self.pages.iter().map(|page| page.posts.len()).sum()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn cursors(&self) -> &[Option<Cursor>] {
        &self.cursors
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn post(id: &str) -> Post {
        Post {
            id: id.to_string(),
            author: None,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            text: format!("post {id}"),
            file: None,
            has_liked: false,
            categories: BTreeSet::new(),
            edit_at: None,
            likes_count: 0,
            comments_count: 0,
        }
    }

    fn page(ids: &[&str], next: Option<&str>) -> Page {
        Page::new(ids.iter().map(|id| post(id)).collect(), next.map(Cursor::new))
    }

    fn ids(chain: &PageChain) -> Vec<String> {
        chain.posts().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn test_empty_chain_has_next_page() {
        let chain = PageChain::new();
        assert!(chain.has_next_page());
        assert!(chain.next_cursor().is_none());
        assert_eq!(chain.post_count(), 0);
    }

    #[test]
    fn test_seeded_chain() {
        let chain = PageChain::seeded(page(&["a", "b"], Some("c1")));
        assert_eq!(chain.cursors(), &[None]);
        assert_eq!(chain.next_cursor(), Some(&Cursor::new("c1")));
        assert!(chain.has_next_page());
        assert_eq!(ids(&chain), vec!["a", "b"]);
    }

    #[test]
    fn test_push_follows_cursor() {
        let mut chain = PageChain::seeded(page(&["a", "b"], Some("c1")));
        chain
            .push(Some(Cursor::new("c1")), page(&["c"], None))
            .unwrap();

        assert_eq!(ids(&chain), vec!["a", "b", "c"]);
        assert_eq!(chain.cursors(), &[None, Some(Cursor::new("c1"))]);
        assert!(!chain.has_next_page());
    }

    #[test]
    fn test_push_rejects_wrong_cursor() {
        let mut chain = PageChain::seeded(page(&["a"], Some("c1")));
        let err = chain
            .push(Some(Cursor::new("c9")), page(&["z"], None))
            .unwrap_err();
        assert_eq!(
            err,
            ChainError::CursorMismatch {
                expected: Some(Cursor::new("c1")),
                got: Some(Cursor::new("c9")),
            }
        );
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_first_push_requires_null_cursor() {
        let mut chain = PageChain::new();
        assert!(chain
            .push(Some(Cursor::new("c1")), page(&["a"], None))
            .is_err());
        assert!(chain.push(None, page(&["a"], None)).is_ok());
    }

    #[test]
    fn test_push_after_last_page_rejected() {
        let mut chain = PageChain::seeded(page(&["a"], None));
        assert_eq!(
            chain.push(None, page(&["b"], None)),
            Err(ChainError::Exhausted)
        );
    }

    proptest! {
        #[test]
        fn flattened_length_and_order_follow_pages(sizes in prop::collection::vec(0usize..6, 1..8)) {
            let mut chain = PageChain::new();
            let mut expected = Vec::new();
            let last = sizes.len() - 1;

            for (i, size) in sizes.iter().enumerate() {
                let posts: Vec<Post> = (0..*size).map(|j| post(&format!("{i}-{j}"))).collect();
                expected.extend(posts.iter().map(|p| p.id.clone()));
                let next = (i < last).then(|| Cursor::new(format!("c{}", i + 1)));
                let cursor = chain.next_cursor().cloned();
                chain.push(cursor, Page::new(posts, next)).unwrap();
            }

            prop_assert_eq!(chain.post_count(), sizes.iter().sum::<usize>());
            prop_assert_eq!(chain.posts().count(), chain.post_count());
            prop_assert_eq!(ids(&chain), expected);
            prop_assert!(!chain.has_next_page());
            for i in 1..chain.len() {
                prop_assert_eq!(chain.cursors()[i].as_ref(), chain.pages()[i - 1].next_cursor.as_ref());
            }
        }
    }
}
