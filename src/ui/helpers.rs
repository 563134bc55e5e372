//! Helpers shared across the UI layer: background fetches and link opening.

use crate::app::{App, AppEvent};
use crate::feed::{FetchError, PageRequest, PageResponse};
use crate::util::validate_url_for_open;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

/// Wraps a future to catch panics and convert them to errors.
///
/// - `Ok(result)` if the future completes normally
/// - `Err(panic_message)` if the future panics
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            }
        })
}

/// Run a page request on a background task; the result arrives as
/// [`AppEvent::PageLoaded`].
///
/// A panicking fetch is reported as a failed fetch so the controller does not
/// wait on it forever.
pub(super) fn dispatch(app: &App, request: Option<PageRequest>, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(request) = request else {
        return;
    };
    let source = app.source.clone();
    let tx = event_tx.clone();

    tracing::debug!(
        subject = %request.subject,
        ticket = request.ticket,
        cursor = ?request.cursor.as_ref().map(|c| c.as_str()),
        "Spawning page fetch"
    );

    tokio::spawn(async move {
        let fallback = request.clone();
        let response = match catch_task_panic(request.execute(source.as_ref())).await {
            Ok(response) => response,
            Err(panic_msg) => {
                tracing::error!(error = %panic_msg, "Page fetch task panicked");
                PageResponse {
                    request: fallback,
                    result: Err(FetchError::TaskFailed(panic_msg)),
                }
            }
        };

        if let Err(e) = tx.send(AppEvent::PageLoaded(response)).await {
            tracing::warn!(error = %e, event = "PageLoaded", "Channel send failed (receiver dropped)");
        }
    });
}

/// Open the selected post's attachment in the system browser.
pub(super) fn open_selected_attachment(app: &mut App) {
    let url = match app.selected_post().and_then(|post| post.attachment()) {
        Some(file) => file.url.clone(),
        None => {
            app.set_status("Selected post has no attachment");
            return;
        }
    };

    // Validate before open::that() so only web URLs reach the system opener
    match validate_url_for_open(&url) {
        Err(e) => app.set_status(format!("Refusing to open attachment: {}", e)),
        Ok(url) => {
            if let Err(e) = open::that(url.as_str()) {
                tracing::warn!(url = %url, error = %e, "Failed to open attachment");
                app.set_status(format!("Failed to open browser: {}", e));
            } else {
                app.set_status("Opened attachment in browser");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catch_task_panic_ok() {
        assert_eq!(catch_task_panic(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_catch_task_panic_message() {
        let result = catch_task_panic(async {
            panic!("boom");
        })
        .await;
        assert_eq!(result, Err::<(), _>("boom".to_string()));
    }
}
