//! Cursor-paginated post feed.
//!
//! - [`types`] - Wire types: posts, pages and opaque cursors
//! - [`source`] - The [`FeedSource`] boundary and its HTTP implementation
//! - [`chain`] - Ordered pages and the cursors that fetched them
//! - [`cache`] - Per-subject page chains with a freshness window
//! - [`controller`] - Decides when pages are fetched; performs no I/O itself
//! - [`visibility`] - "Load more" trigger driven by sentinel visibility
//! - [`view`] - Loading / error / results / empty state of the feed region
//!
//! # Example
//!
//! ```ignore
//! let (mut controller, request) = PaginationController::mount(subject, &mut cache, seed, Instant::now());
//! if let Some(request) = request {
//!     let response = request.execute(source.as_ref()).await;
//!     controller.complete(response, Instant::now());
//! }
//! ```

pub mod cache;
pub mod chain;
pub mod controller;
pub mod source;
pub mod types;
pub mod view;
pub mod visibility;

pub use cache::{CacheLookup, QueryCache, DEFAULT_CACHE_CAPACITY, DEFAULT_STALE_TIME};
pub use chain::{ChainError, PageChain};
pub use controller::{Completion, FetchKind, PageRequest, PageResponse, PaginationController};
pub use source::{build_http_client, FeedSource, FetchError, HttpFeedSource, GENERIC_ERROR_MESSAGE};
pub use types::{Attachment, Author, Cursor, Page, Post, SubjectId};
pub use view::{evaluate, EmptyGrace, FeedState, FeedView, DEFAULT_EMPTY_GRACE};
pub use visibility::{IntersectionSource, VisibilityTrigger, DEFAULT_VISIBILITY_THRESHOLD};
