//! Main event loop for the TUI.
//!
//! Multiplexes terminal input, page fetch results, and periodic ticks. All
//! feed state is mutated here, on the loop; fetches run as spawned tasks.

use crate::app::{App, AppEvent};
use crate::feed::PageRequest;
use anyhow::Result;
use crossterm::{
    event::Event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

use super::helpers::dispatch;
use super::input::handle_input;
use super::render::render;

/// Result of handling a key press event.
pub enum Action {
    /// Continue the event loop and process more events.
    Continue,
    /// Exit the application and restore the terminal.
    Quit,
}

/// Runs the TUI application event loop.
///
/// `initial` is the request produced when the feed was mounted, if any.
///
/// A panic hook restores terminal state before unwinding.
pub async fn run(
    app: &mut App,
    initial: Option<PageRequest>,
    event_tx: mpsc::Sender<AppEvent>,
    mut event_rx: mpsc::Receiver<AppEvent>,
) -> Result<()> {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        TerminalSession::restore_modes();
        original_hook(panic_info);
    }));

    let mut session = TerminalSession::enter()?;
    let mut event_stream = crossterm::event::EventStream::new();
    let mut shutdown = ShutdownSignals::install()?;

    // Ticks drive the empty-state grace delay and status expiry
    let mut tick_interval = tokio::time::interval(Duration::from_millis(100));

    dispatch(app, initial, &event_tx);

    loop {
        if app.needs_redraw {
            session.terminal.draw(|f| render(f, app))?;
            app.needs_redraw = false;

            // Rendering re-measured the sentinel
            let request = app.poll_trigger();
            dispatch(app, request, &event_tx);
        }

        if app.clear_expired_status() {
            app.needs_redraw = true;
        }

        // Drain pending fetch results before handling more input
        while let Ok(event) = event_rx.try_recv() {
            handle_app_event(app, event, &event_tx);
        }

        tokio::select! {
            biased;

            name = shutdown.recv() => {
                tracing::info!(signal = name, "Shutting down on signal");
                break;
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        app.needs_redraw = true;
                        match handle_input(app, key.code, key.modifiers, &event_tx) {
                            Ok(Action::Quit) => break,
                            Ok(Action::Continue) => {}
                            Err(e) => app.set_status(format!("Error: {}", e)),
                        }
                    }
                    Some(Ok(Event::Resize(_, _))) => app.needs_redraw = true,
                    Some(Err(e)) => tracing::warn!(error = %e, "Terminal event stream error"),
                    None => break,
                    _ => {}
                }
            }

            Some(event) = event_rx.recv() => {
                handle_app_event(app, event, &event_tx);
            }

            _ = tick_interval.tick() => {
                app.refresh_state(Instant::now());
            }
        }
    }

    session.leave()
}

/// Apply a background event to the app.
fn handle_app_event(app: &mut App, event: AppEvent, event_tx: &mpsc::Sender<AppEvent>) {
    match event {
        AppEvent::PageLoaded(response) => {
            let follow_up = app.handle_page_loaded(response, Instant::now());
            dispatch(app, follow_up, event_tx);
        }
    }
}

/// Raw mode plus alternate screen for the lifetime of the UI.
///
/// Dropping the session restores the terminal, so early returns through `?`
/// do not leave the shell in raw mode.
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    restored: bool,
}

impl TerminalSession {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }
        let terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => terminal,
            Err(e) => {
                Self::restore_modes();
                return Err(e.into());
            }
        };
        Ok(Self {
            terminal,
            restored: false,
        })
    }

    /// Best-effort reset usable from a panic hook.
    fn restore_modes() {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }

    fn leave(mut self) -> Result<()> {
        self.restored = true;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if !self.restored {
            Self::restore_modes();
            let _ = self.terminal.show_cursor();
        }
    }
}

/// SIGTERM/SIGINT on Unix, Ctrl+C elsewhere.
struct ShutdownSignals {
    #[cfg(unix)]
    terminate: Signal,
    #[cfg(unix)]
    interrupt: Signal,
}

impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: signal(SignalKind::terminate())?,
            #[cfg(unix)]
            interrupt: signal(SignalKind::interrupt())?,
        })
    }

    /// Resolves with the signal name once one arrives.
    #[cfg(unix)]
    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.interrupt.recv() => "SIGINT",
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> &'static str {
        let _ = tokio::signal::ctrl_c().await;
        "ctrl-c"
    }
}
