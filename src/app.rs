use crate::config::Config;
use crate::feed::{
    Completion, FeedSource, FeedState, FeedView, IntersectionSource, Page, PageRequest,
    PageResponse, PaginationController, Post, QueryCache, SubjectId, VisibilityTrigger,
};
use crate::filter::{category, FilterState};
use crate::session::SessionStore;
use std::borrow::Cow;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// How long a status message stays in the status bar.
const STATUS_TTL: Duration = Duration::from_secs(3);

/// Events sent from background tasks to the event loop.
#[derive(Debug)]
pub enum AppEvent {
    /// A page fetch finished (successfully or not).
    PageLoaded(PageResponse),
}

/// What keyboard input currently edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Browse,
    /// Editing the filter query. `previous` is restored on cancel.
    Search { previous: String },
    /// Typing a subject id to switch to.
    Subject { input: String },
}

/// Tunables the app needs from the configuration.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub stale_time: Duration,
    pub cache_capacity: NonZeroUsize,
    pub empty_grace: Duration,
    pub visibility_threshold: f32,
}

impl AppSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stale_time: config.stale_time(),
            cache_capacity: config.cache_capacity(),
            empty_grace: config.empty_grace(),
            visibility_threshold: config.visibility_threshold,
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Sentinel visibility as measured by the last render.
#[derive(Debug, Clone, Copy, Default)]
pub struct Viewport {
    pub sentinel_ratio: Option<f32>,
}

impl IntersectionSource for Viewport {
    fn sentinel_ratio(&self) -> Option<f32> {
        self.sentinel_ratio
    }
}

pub struct App {
    pub source: Arc<dyn FeedSource>,
    session: &'static dyn SessionStore,
    cache: QueryCache,
    controller: PaginationController,
    trigger: VisibilityTrigger,
    view: FeedView,
    pub filter: FilterState,
    pub mode: Mode,
    /// Index into the visible (filtered) posts.
    pub selected: usize,
    /// First rendered line of the post list.
    pub scroll_offset: usize,
    pub viewport: Viewport,
    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
}

impl App {
    /// Build the app and mount the feed for `subject`.
    ///
    /// `seed` is a first page fetched before the UI started. Returns the
    /// request to dispatch right away, if the mount needs one.
    pub fn new(
        source: Arc<dyn FeedSource>,
        session: &'static dyn SessionStore,
        settings: &AppSettings,
        subject: SubjectId,
        seed: Option<Page>,
        now: Instant,
    ) -> (Self, Option<PageRequest>) {
        let mut cache = QueryCache::new(settings.cache_capacity, settings.stale_time);
        let (controller, request) = PaginationController::mount(subject, &mut cache, seed, now);

        let mut app = Self {
            source,
            session,
            cache,
            controller,
            trigger: VisibilityTrigger::new(settings.visibility_threshold),
            view: FeedView::new(now, settings.empty_grace),
            filter: FilterState::restore(session),
            mode: Mode::Browse,
            selected: 0,
            scroll_offset: 0,
            viewport: Viewport::default(),
            status_message: None,
            needs_redraw: true,
        };
        app.refresh_state(now);
        (app, request)
    }

    pub fn controller(&self) -> &PaginationController {
        &self.controller
    }

    pub fn subject(&self) -> &SubjectId {
        self.controller.subject()
    }

    pub fn feed_state(&self) -> &FeedState {
        self.view.state()
    }

    pub fn visible_posts(&self) -> Vec<&Post> {
        self.filter.apply(self.controller.posts())
    }

    pub fn selected_post(&self) -> Option<&Post> {
        self.visible_posts().get(self.selected).copied()
    }

    /// Apply a finished fetch. Returns a follow-up request for multi-page revalidation.
    pub fn handle_page_loaded(&mut self, response: PageResponse, now: Instant) -> Option<PageRequest> {
        let follow_up = match self.controller.complete(response, now) {
            Completion::Applied => {
                self.trigger.rearm();
                None
            }
            Completion::Failed => {
                let message = self
                    .controller
                    .error()
                    .filter(|_| self.controller.post_count() > 0)
                    .map(|error| format!("{} (press r to retry)", error.user_message()));
                if let Some(message) = message {
                    self.set_status(message);
                }
                None
            }
            Completion::Continue(request) => Some(request),
            Completion::Discarded => None,
        };
        self.clamp_selection();
        self.refresh_state(now);
        self.needs_redraw = true;
        follow_up
    }

    /// Let the visibility trigger decide whether to load the next page.
    ///
    /// Call after every render, since rendering measures the sentinel.
    pub fn poll_trigger(&mut self) -> Option<PageRequest> {
        let has_next = self.controller.has_next_page();
        self.trigger.sync(true, has_next);
        if !self.trigger.poll(&self.viewport, has_next) {
            return None;
        }
        let request = self.controller.request_next_page();
        if request.is_some() {
            tracing::debug!(subject = %self.subject(), "Sentinel visible, loading next page");
            self.needs_redraw = true;
        }
        request
    }

    /// Explicit retry after a failed fetch.
    pub fn retry(&mut self) -> Option<PageRequest> {
        if !self.controller.is_error() {
            return None;
        }
        let request = self.controller.request_next_page();
        if request.is_some() {
            self.set_status("Retrying...");
        } else if self.controller.in_flight().is_none() {
            self.set_status("Nothing to retry");
        }
        request
    }

    /// Unmount the current feed into the cache and mount `subject`.
    pub fn switch_subject(&mut self, subject: SubjectId, now: Instant) -> Option<PageRequest> {
        tracing::info!(from = %self.subject(), to = %subject, "Switching subject");
        let placeholder = PaginationController::new(subject.clone(), None, now);
        let previous = std::mem::replace(&mut self.controller, placeholder);
        previous.unmount(&mut self.cache);

        let (controller, request) = PaginationController::mount(subject, &mut self.cache, None, now);
        self.controller = controller;
        self.trigger.disconnect();
        self.view.remount(now);
        self.viewport = Viewport::default();
        self.selected = 0;
        self.scroll_offset = 0;
        self.refresh_state(now);
        self.needs_redraw = true;
        request
    }

    /// Re-evaluate the feed state; marks a redraw when it changed.
    pub fn refresh_state(&mut self, now: Instant) {
        let visible = self.visible_posts().len();
        if self.view.refresh(&self.controller, visible, now) {
            self.needs_redraw = true;
        }
    }

    // ========================================================================
    // Filter
    // ========================================================================

    pub fn set_query(&mut self, query: &str, now: Instant) {
        self.filter.set_query(query, self.session);
        self.after_filter_change(now);
    }

    /// Toggle the category bound to number key `n`.
    pub fn toggle_category_number(&mut self, n: usize, now: Instant) {
        let Some(category) = category::by_number(n) else {
            return;
        };
        let selected = self.filter.toggle_category(category.key);
        self.set_status(format!(
            "{} {} {}",
            category.icon,
            category.label,
            if selected { "selected" } else { "cleared" }
        ));
        self.after_filter_change(now);
    }

    pub fn clear_categories(&mut self, now: Instant) {
        self.filter.clear_categories();
        self.after_filter_change(now);
    }

    pub fn clear_filters(&mut self, now: Instant) {
        self.filter.clear(self.session);
        self.after_filter_change(now);
    }

    fn after_filter_change(&mut self, now: Instant) {
        self.selected = 0;
        self.scroll_offset = 0;
        self.refresh_state(now);
        self.needs_redraw = true;
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn select_next(&mut self) {
        let count = self.visible_posts().len();
        if self.selected + 1 < count {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.visible_posts().len().saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        let count = self.visible_posts().len();
        if self.selected >= count {
            self.selected = count.saturating_sub(1);
        }
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Set status message (will auto-expire after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
        self.needs_redraw = true;
    }

    /// Clear status message if expired. Returns true if a message was cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() >= STATUS_TTL {
                self.status_message = None;
                return true;
            }
        }
        false
    }
}
