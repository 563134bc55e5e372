//! Cursor-paginated post feed with infinite scroll and local filtering.
//!
//! The [`feed`] module holds the protocol: wire types, the [`feed::FeedSource`]
//! boundary, the page chain, the per-subject cache, the pagination controller,
//! the visibility trigger and the feed view state. [`filter`] narrows loaded
//! posts without refetching; [`session`] remembers the query. [`app`] and
//! [`ui`] make up the terminal client.

pub mod app;
pub mod config;
pub mod feed;
pub mod filter;
pub mod session;
pub mod ui;
pub mod util;
