//! Cubot TUI Application - Terminal User Interface
//!
//! Drives the cube solving robot with a live cube net, progress gauge,
//! log viewer and protocol line view.

mod app;
mod event;
mod ui;

use std::io;
use std::panic;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tracing_subscriber::prelude::*;

use app::App;
use event::{Event, EventHandler};

const TICK_RATE: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    // Setup panic hook to restore terminal on crash
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));

    // Initialize tracing to file (not stdout, since we're using the terminal)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("cubot-tui.log")?;
    let file_appender = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(file_appender)
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Cubot TUI started");

    // Setup terminal
    let terminal = setup_terminal()?;

    // Run app
    let result = run_app(terminal);

    // Restore terminal
    restore_terminal()?;

    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

fn run_app(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    let mut app = App::new();
    let event_handler = EventHandler::new(TICK_RATE);

    loop {
        // Draw UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Handle events
        match event_handler.next()? {
            Event::Tick => {
                app.on_tick();
            }
            Event::Key(key_event) => {
                if app.on_key(key_event) || app.should_quit {
                    break; // Exit requested
                }
            }
            Event::Resize => {}
        }
    }

    Ok(())
}
