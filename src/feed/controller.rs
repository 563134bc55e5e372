//! Cursor-chain pagination controller.
//!
//! The controller owns one subject's [`PageChain`] and decides *when* a page
//! should be fetched, but never performs I/O itself. Every fetch it wants is
//! handed out as a [`PageRequest`]; the caller runs it against a
//! [`FeedSource`] (usually on a spawned task) and feeds the resulting
//! [`PageResponse`] back through [`PaginationController::complete`].
//!
//! At most one request is in flight per controller. Each request carries a
//! process-wide unique ticket, so a response that arrives after the
//! controller was unmounted or remounted is recognized and dropped.

use super::cache::{CacheLookup, QueryCache};
use super::chain::PageChain;
use super::source::{FeedSource, FetchError};
use super::types::{Cursor, Page, Post, SubjectId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

fn next_ticket() -> u64 {
    NEXT_TICKET.fetch_add(1, Ordering::Relaxed)
}

/// Why a page is being fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// First page of an empty chain.
    Initial,
    /// Continuation of a non-empty chain.
    NextPage,
    /// Background refetch of a stale cached chain.
    Revalidate,
}

/// A fetch the controller wants performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub subject: SubjectId,
    pub cursor: Option<Cursor>,
    pub kind: FetchKind,
    pub ticket: u64,
}

impl PageRequest {
    /// Run the request against `source`.
    pub async fn execute(self, source: &dyn FeedSource) -> PageResponse {
        let result = source.fetch_page(&self.subject, self.cursor.as_ref()).await;
        PageResponse {
            request: self,
            result,
        }
    }
}

/// Outcome of a [`PageRequest`].
#[derive(Debug)]
pub struct PageResponse {
    pub request: PageRequest,
    pub result: Result<Page, FetchError>,
}

/// What [`PaginationController::complete`] did with a response.
#[derive(Debug, PartialEq, Eq)]
pub enum Completion {
    /// A page was appended (or a revalidated chain swapped in).
    Applied,
    /// The fetch failed; the error is now observable, the chain is untouched.
    Failed,
    /// Revalidation needs another page; run the contained request.
    Continue(PageRequest),
    /// The response did not belong to the in-flight request.
    Discarded,
}

/// Refetch of a stale chain in progress.
#[derive(Debug)]
struct Revalidation {
    fresh: PageChain,
    target_pages: usize,
}

#[derive(Debug)]
pub struct PaginationController {
    subject: SubjectId,
    chain: PageChain,
    in_flight: Option<PageRequest>,
    revalidation: Option<Revalidation>,
    error: Option<Arc<FetchError>>,
    data_updated_at: Option<Instant>,
}

impl PaginationController {
    /// Controller for `subject`, optionally seeded with a pre-fetched first page.
    ///
    /// A seed counts as data fetched at `now`.
    pub fn new(subject: SubjectId, initial: Option<Page>, now: Instant) -> Self {
        let (chain, data_updated_at) = match initial {
            Some(page) => (PageChain::seeded(page), Some(now)),
            None => (PageChain::new(), None),
        };

        Self {
            subject,
            chain,
            in_flight: None,
            revalidation: None,
            error: None,
            data_updated_at,
        }
    }

    /// Mount a controller, preferring cached data over the supplied seed.
    ///
    /// Returns the request to run right away, if any:
    /// - fresh cache entry: none
    /// - stale cache entry: a revalidation of the first page, cached pages stay visible
    /// - no cache entry, seed given: none
    /// - no cache entry, no seed: the initial fetch
    pub fn mount(
        subject: SubjectId,
        cache: &mut QueryCache,
        initial: Option<Page>,
        now: Instant,
    ) -> (Self, Option<PageRequest>) {
        match cache.lookup(&subject, now) {
            CacheLookup::Fresh { chain, updated_at } => {
                let mut controller = Self::new(subject, None, now);
                controller.chain = chain;
                controller.data_updated_at = Some(updated_at);
                (controller, None)
            }
            CacheLookup::Stale { chain, updated_at } => {
                let mut controller = Self::new(subject, None, now);
                let target_pages = chain.len();
                controller.chain = chain;
                controller.data_updated_at = Some(updated_at);
                controller.revalidation = Some(Revalidation {
                    fresh: PageChain::new(),
                    target_pages,
                });
                let request = controller.issue(FetchKind::Revalidate, None);
                (controller, Some(request))
            }
            CacheLookup::Miss => {
                let seeded = initial.is_some();
                let mut controller = Self::new(subject, initial, now);
                let request = if seeded {
                    None
                } else {
                    controller.request_next_page()
                };
                (controller, request)
            }
        }
    }

    /// Hand the chain to the cache. In-flight requests are abandoned.
    pub fn unmount(self, cache: &mut QueryCache) {
        if let Some(updated_at) = self.data_updated_at {
            tracing::debug!(
                subject = %self.subject,
                pages = self.chain.len(),
                "Caching feed on unmount"
            );
            cache.store(self.subject, self.chain, updated_at);
        }
    }

    /// Request the next page.
    ///
    /// Returns `None` when there is no next page or any fetch is already in
    /// flight, so repeated calls before a response arrive produce one request.
    pub fn request_next_page(&mut self) -> Option<PageRequest> {
        if let Some(pending) = &self.in_flight {
            tracing::trace!(subject = %self.subject, ticket = pending.ticket, "Fetch already in flight");
            return None;
        }
        if !self.chain.has_next_page() {
            return None;
        }

        let kind = if self.chain.is_empty() {
            FetchKind::Initial
        } else {
            FetchKind::NextPage
        };
        let cursor = self.chain.next_cursor().cloned();
        Some(self.issue(kind, cursor))
    }

    fn issue(&mut self, kind: FetchKind, cursor: Option<Cursor>) -> PageRequest {
        let request = PageRequest {
            subject: self.subject.clone(),
            cursor,
            kind,
            ticket: next_ticket(),
        };
        tracing::debug!(
            subject = %request.subject,
            ticket = request.ticket,
            kind = ?request.kind,
            "Issuing page request"
        );
        self.in_flight = Some(request.clone());
        request
    }

    /// Apply the outcome of a request previously handed out by this controller.
    pub fn complete(&mut self, response: PageResponse, now: Instant) -> Completion {
        let PageResponse { request, result } = response;

        match &self.in_flight {
            Some(pending) if pending.ticket == request.ticket => {}
            _ => {
                tracing::debug!(
                    subject = %request.subject,
                    ticket = request.ticket,
                    "Discarding stale page response"
                );
                return Completion::Discarded;
            }
        }
        self.in_flight = None;

        match request.kind {
            FetchKind::Initial | FetchKind::NextPage => match result {
                Ok(page) => match self.chain.push(request.cursor, page) {
                    Ok(()) => {
                        self.error = None;
                        self.data_updated_at = Some(now);
                        Completion::Applied
                    }
                    Err(e) => {
                        tracing::warn!(subject = %self.subject, error = %e, "Dropping page that does not continue the chain");
                        Completion::Discarded
                    }
                },
                Err(e) => {
                    tracing::warn!(subject = %self.subject, kind = ?request.kind, error = %e, "Feed page fetch failed");
                    self.error = Some(Arc::new(e));
                    Completion::Failed
                }
            },
            FetchKind::Revalidate => self.complete_revalidation(request.cursor, result, now),
        }
    }

    fn complete_revalidation(
        &mut self,
        cursor: Option<Cursor>,
        result: Result<Page, FetchError>,
        now: Instant,
    ) -> Completion {
        let Some(mut revalidation) = self.revalidation.take() else {
            return Completion::Discarded;
        };

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(subject = %self.subject, error = %e, "Revalidation failed, keeping cached pages");
                self.error = Some(Arc::new(e));
                return Completion::Failed;
            }
        };

        if let Err(e) = revalidation.fresh.push(cursor, page) {
            tracing::warn!(subject = %self.subject, error = %e, "Revalidated page does not continue the chain");
            return Completion::Discarded;
        }

        if revalidation.fresh.len() < revalidation.target_pages
            && revalidation.fresh.has_next_page()
        {
            let next = revalidation.fresh.next_cursor().cloned();
            self.revalidation = Some(revalidation);
            return Completion::Continue(self.issue(FetchKind::Revalidate, next));
        }

        tracing::debug!(
            subject = %self.subject,
            pages = revalidation.fresh.len(),
            "Revalidation complete"
        );
        self.chain = revalidation.fresh;
        self.error = None;
        self.data_updated_at = Some(now);
        Completion::Applied
    }

    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    pub fn chain(&self) -> &PageChain {
        &self.chain
    }

    /// All loaded posts in fetch order.
    pub fn posts(&self) -> impl Iterator<Item = &Post> + '_ {
        self.chain.posts()
    }

    pub fn post_count(&self) -> usize {
        self.chain.post_count()
    }

    pub fn has_next_page(&self) -> bool {
        self.chain.has_next_page()
    }

    pub fn in_flight(&self) -> Option<&PageRequest> {
        self.in_flight.as_ref()
    }

    /// True only while the very first page of an empty chain is loading.
    pub fn is_loading(&self) -> bool {
        matches!(&self.in_flight, Some(r) if r.kind == FetchKind::Initial)
    }

    pub fn is_fetching_next_page(&self) -> bool {
        matches!(&self.in_flight, Some(r) if r.kind == FetchKind::NextPage)
    }

    pub fn is_revalidating(&self) -> bool {
        self.revalidation.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_deref()
    }

    pub fn data_updated_at(&self) -> Option<Instant> {
        self.data_updated_at
    }
}
