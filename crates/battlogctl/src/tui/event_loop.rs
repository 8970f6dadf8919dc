//! Event Loop - TUI entry point
//!
//! All state changes go through one channel: the refresh timer, the input
//! thread and the navigator observer each send `AppEvent`s, and the loop
//! applies them to the `App` in arrival order.

use anyhow::Result;
use battlog_common::config::BattlogConfig;
use battlog_common::csv_log::CsvLog;
use battlog_common::status::StatusContext;
use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::app::{App, AppEvent};
use super::input::translate;
use super::render::draw_ui;

const INPUT_POLL: Duration = Duration::from_millis(100);

/// Run the TUI until the user quits
pub async fn run(config: BattlogConfig, log: CsvLog, context: StatusContext) -> Result<()> {
    enable_raw_mode().map_err(|e| {
        anyhow::anyhow!("Failed to enable raw mode: {}. Ensure you're running in a real terminal (TTY).", e)
    })?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture).map_err(|e| {
        let _ = disable_raw_mode();
        anyhow::anyhow!("Failed to initialize terminal: {}", e)
    })?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = App::new(config, log, context, Local::now());
    let result = run_event_loop(&mut terminal, app).await;

    // Always attempt cleanup
    let cleanup_result = restore_terminal(&mut terminal);
    result.and(cleanup_result)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    app.forward_window_changes(tx.clone());
    app.reload(Local::now());

    let refresh = app.config().refresh_interval();
    info!("TUI started, refreshing every {}s", refresh.as_secs());
    let timer = tokio::spawn(refresh_timer(refresh, tx.clone(), shutdown_rx.clone()));
    let input = tokio::task::spawn_blocking(move || input_loop(tx, shutdown_rx));

    let result = loop {
        if let Err(e) = terminal.draw(|f| draw_ui(f, &app)) {
            break Err(e.into());
        }

        let Some(event) = rx.recv().await else {
            break Ok(());
        };
        app.dispatch(event, Local::now());
        // Batch whatever else is queued into a single redraw
        while let Ok(event) = rx.try_recv() {
            app.dispatch(event, Local::now());
        }

        if app.should_quit() {
            break Ok(());
        }
    };

    let _ = shutdown_tx.send(true);
    if let Err(e) = timer.await {
        warn!("Refresh timer ended abnormally: {}", e);
    }
    if let Err(e) = input.await {
        warn!("Input thread ended abnormally: {}", e);
    }
    result
}

async fn refresh_timer(
    period: Duration,
    tx: mpsc::UnboundedSender<AppEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    // the first tick fires immediately; the initial load already happened
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if tx.send(AppEvent::RefreshTick).is_err() {
                    break;
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("Refresh timer stopped");
}

/// Blocking crossterm reader; polls so it can notice shutdown
fn input_loop(tx: mpsc::UnboundedSender<AppEvent>, shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        match event::poll(INPUT_POLL) {
            Ok(true) => match event::read() {
                Ok(ev) => {
                    if let Some(app_event) = translate(&ev) {
                        if tx.send(app_event).is_err() {
                            break;
                        }
                    }
                }
                Err(e) => {
                    warn!("Failed to read terminal event: {}", e);
                    break;
                }
            },
            Ok(false) => {}
            Err(e) => {
                warn!("Failed to poll terminal: {}", e);
                break;
            }
        }
    }
    debug!("Input thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refresh_timer_ticks_until_shutdown() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let timer = tokio::spawn(refresh_timer(Duration::from_millis(20), tx, shutdown_rx));

        assert_eq!(rx.recv().await, Some(AppEvent::RefreshTick));
        assert_eq!(rx.recv().await, Some(AppEvent::RefreshTick));

        shutdown_tx.send(true).unwrap();
        timer.await.unwrap();
        // the timer owned the only sender
        while rx.try_recv().is_ok() {}
        assert!(rx.recv().await.is_none());
    }
}
