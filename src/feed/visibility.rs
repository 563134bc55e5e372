/// Default fraction of the sentinel that must be visible to count as "reached".
pub const DEFAULT_VISIBILITY_THRESHOLD: f32 = 0.1;

/// Capability: how much of the end-of-list sentinel is currently on screen.
///
/// The terminal client derives this from its scroll position; tests use a
/// simulated viewport.
pub trait IntersectionSource {
    /// Visible fraction of the sentinel in `0.0..=1.0`, or `None` while the
    /// sentinel has not been rendered.
    fn sentinel_ratio(&self) -> Option<f32>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observation {
    Detached,
    /// `intersecting` is `None` until the first reading after (re)attaching.
    Observing { intersecting: Option<bool> },
}

/// Fires a "load more" signal when the sentinel scrolls into view.
///
/// Signals on the transition into view, not continuously while the sentinel
/// stays visible. A freshly attached observation reports the current state
/// once, so a sentinel that is already on screen fires immediately.
#[derive(Debug, Clone)]
pub struct VisibilityTrigger {
    threshold: f32,
    observation: Observation,
}

impl VisibilityTrigger {
    pub fn new(threshold: f32) -> Self {
        let threshold = if threshold.is_finite() {
            threshold.clamp(0.0, 1.0)
        } else {
            DEFAULT_VISIBILITY_THRESHOLD
        };
        Self {
            threshold,
            observation: Observation::Detached,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Attach or detach depending on whether observing makes sense right now.
    ///
    /// Observation exists only while the feed is mounted and has a next page;
    /// a `has_next_page` flip back to true re-attaches.
    pub fn sync(&mut self, mounted: bool, has_next_page: bool) {
        let wanted = mounted && has_next_page;
        match (wanted, self.observation) {
            (true, Observation::Detached) => {
                tracing::trace!("Attaching sentinel observer");
                self.observation = Observation::Observing { intersecting: None };
            }
            (false, Observation::Observing { .. }) => {
                tracing::trace!("Detaching sentinel observer");
                self.observation = Observation::Detached;
            }
            _ => {}
        }
    }

    /// Read the viewport; returns true when the next page should be requested.
    pub fn poll<V: IntersectionSource + ?Sized>(&mut self, viewport: &V, has_next_page: bool) -> bool {
        let threshold = self.threshold;
        let Observation::Observing { intersecting } = &mut self.observation else {
            return false;
        };
        let Some(ratio) = viewport.sentinel_ratio() else {
            return false;
        };

        let visible = ratio > 0.0 && ratio >= threshold;
        let entered = visible && *intersecting != Some(true);
        *intersecting = Some(visible);

        entered && has_next_page
    }

    /// Forget the last reading so a still-visible sentinel fires again.
    ///
    /// Called after a page is appended: if the new page did not push the
    /// sentinel off screen, loading continues.
    pub fn rearm(&mut self) {
        if let Observation::Observing { intersecting } = &mut self.observation {
            *intersecting = None;
        }
    }

    /// Stop observing. No signal fires until `sync` attaches again.
    pub fn disconnect(&mut self) {
        self.observation = Observation::Detached;
    }

    pub fn is_observing(&self) -> bool {
        matches!(self.observation, Observation::Observing { .. })
    }
}

impl Default for VisibilityTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_VISIBILITY_THRESHOLD)
    }
}
