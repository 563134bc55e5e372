use super::controller::PaginationController;
use std::time::Duration;
use tokio::time::Instant;

/// How long an empty result is shown as "loading" before it counts as empty.
pub const DEFAULT_EMPTY_GRACE: Duration = Duration::from_millis(300);

/// The single visual state the feed region is in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState {
    Loading,
    /// Nothing loaded and the last fetch failed.
    Error { message: String },
    /// At least one post passes the filter.
    HasResults { visible: usize },
    /// Loading finished and nothing is visible. `filtered` is true when posts
    /// exist but the filter hides all of them.
    EmptyConfirmed { filtered: bool },
}

impl FeedState {
    pub fn name(&self) -> &'static str {
        match self {
            FeedState::Loading => "loading",
            FeedState::Error { .. } => "error",
            FeedState::HasResults { .. } => "has_results",
            FeedState::EmptyConfirmed { .. } => "empty",
        }
    }
}

/// Delay before an empty feed may be declared empty, measured from mount.
///
/// Keeps an empty-state message from flashing up while the first results are
/// still settling in.
#[derive(Debug, Clone, Copy)]
pub struct EmptyGrace {
    started_at: Instant,
    delay: Duration,
}

impl EmptyGrace {
    pub fn new(started_at: Instant, delay: Duration) -> Self {
        Self { started_at, delay }
    }

    pub fn elapsed(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) >= self.delay
    }

    /// Instant at which the grace period ends.
    pub fn deadline(&self) -> Instant {
        self.started_at + self.delay
    }
}

/// Derive the feed state from controller status and the filtered post count.
///
/// Precedence: loading, then error (only when nothing is loaded), then
/// results, then the grace delay, then empty.
pub fn evaluate(
    controller: &PaginationController,
    visible: usize,
    grace: &EmptyGrace,
    now: Instant,
) -> FeedState {
    if controller.is_loading() {
        return FeedState::Loading;
    }
    if controller.post_count() == 0 {
        if let Some(error) = controller.error() {
            return FeedState::Error {
                message: error.user_message(),
            };
        }
    }
    if visible > 0 {
        return FeedState::HasResults { visible };
    }
    if !grace.elapsed(now) {
        return FeedState::Loading;
    }
    FeedState::EmptyConfirmed {
        filtered: controller.post_count() > 0,
    }
}

/// Tracks the current [`FeedState`] and logs transitions.
#[derive(Debug)]
pub struct FeedView {
    state: FeedState,
    grace: EmptyGrace,
}

impl FeedView {
    pub fn new(mounted_at: Instant, grace_delay: Duration) -> Self {
        Self {
            state: FeedState::Loading,
            grace: EmptyGrace::new(mounted_at, grace_delay),
        }
    }

    /// Restart the grace period, e.g. after switching subject.
    pub fn remount(&mut self, now: Instant) {
        self.grace = EmptyGrace::new(now, self.grace.delay);
        self.state = FeedState::Loading;
    }

    /// Re-evaluate; returns true if the state changed.
    pub fn refresh(&mut self, controller: &PaginationController, visible: usize, now: Instant) -> bool {
        let next = evaluate(controller, visible, &self.grace, now);
        if next == self.state {
            return false;
        }
        tracing::debug!(
            subject = %controller.subject(),
            from = self.state.name(),
            to = next.name(),
            "Feed state changed"
        );
        self.state = next;
        true
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn grace(&self) -> &EmptyGrace {
        &self.grace
    }
}
