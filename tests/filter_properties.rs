//! Property tests for the local filter over a multi-page chain.

use chrono::{TimeZone, Utc};
use postfeed::feed::{Cursor, Page, PageChain, Post};
use postfeed::filter::FilterState;
use postfeed::session::MemorySessionStore;
use proptest::prelude::*;

const CATEGORY_KEYS: [&str; 4] = ["tech", "art", "news", "cooking"];

fn arb_post() -> impl Strategy<Value = Post> {
    (
        "[a-z]{1,6}",
        "[a-zA-Z ]{0,16}",
        prop::collection::btree_set(prop::sample::select(CATEGORY_KEYS.to_vec()), 0..3),
    )
        .prop_map(|(id, text, categories)| Post {
            id,
            author: None,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            text,
            file: None,
            has_liked: false,
            categories: categories.into_iter().map(String::from).collect(),
            edit_at: None,
            likes_count: 0,
            comments_count: 0,
        })
}

fn arb_chain() -> impl Strategy<Value = PageChain> {
    prop::collection::vec(prop::collection::vec(arb_post(), 0..5), 1..5).prop_map(|pages| {
        let mut chain = PageChain::new();
        let last = pages.len() - 1;
        for (i, posts) in pages.into_iter().enumerate() {
            let next = (i < last).then(|| Cursor::new(format!("c{}", i + 1)));
            let cursor = chain.next_cursor().cloned();
            chain
                .push(cursor, Page::new(posts, next))
                .expect("cursors follow the chain");
        }
        chain
    })
}

proptest! {
    #[test]
    fn empty_filter_returns_every_post_in_order(chain in arb_chain()) {
        let filter = FilterState::new();
        let all: Vec<&Post> = chain.posts().collect();
        let filtered = filter.apply(chain.posts());
        prop_assert_eq!(filtered, all);
    }

    #[test]
    fn filtered_posts_keep_relative_order(chain in arb_chain(), query in "[a-z]{0,2}") {
        let store = MemorySessionStore::new();
        let mut filter = FilterState::new();
        filter.set_query(&query, &store);

        let positions: Vec<usize> = filter
            .apply(chain.posts())
            .into_iter()
            .map(|kept| chain.posts().position(|p| std::ptr::eq(p, kept)).unwrap())
            .collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn every_result_passes_both_predicates(
        chain in arb_chain(),
        query in "[a-z]{0,2}",
        selected in prop::collection::btree_set(prop::sample::select(CATEGORY_KEYS.to_vec()), 0..3),
    ) {
        let store = MemorySessionStore::new();
        let mut filter = FilterState::new();
        filter.set_query(&query, &store);
        for key in &selected {
            filter.toggle_category(key);
        }

        let kept = filter.apply(chain.posts());
        for post in &kept {
            prop_assert!(post.text.to_lowercase().contains(&query));
            prop_assert!(selected.is_empty() || post.categories.iter().any(|c| selected.contains(c.as_str())));
        }

        let expected = chain
            .posts()
            .filter(|p| p.text.to_lowercase().contains(&query))
            .filter(|p| selected.is_empty() || p.categories.iter().any(|c| selected.contains(c.as_str())))
            .count();
        prop_assert_eq!(kept.len(), expected);
    }
}
