//! Terminal event pump for the TUI.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, KeyEvent, KeyEventKind};

/// Terminal events.
#[derive(Debug, Clone)]
pub enum Event {
    /// Periodic tick; session events are drained on each one.
    Tick,
    /// Key press.
    Key(KeyEvent),
    /// Terminal resize.
    Resize,
}

/// Reads terminal input on a background thread and interleaves ticks.
pub struct EventHandler {
    receiver: mpsc::Receiver<Event>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (sender, receiver) = mpsc::channel();

        thread::spawn(move || {
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate.saturating_sub(last_tick.elapsed());

                if event::poll(timeout).unwrap_or(false) {
                    let event = match event::read() {
                        // Windows reports releases too
                        Ok(event::Event::Key(key)) if key.kind == KeyEventKind::Press => {
                            Some(Event::Key(key))
                        }
                        Ok(event::Event::Resize(..)) => Some(Event::Resize),
                        _ => None,
                    };
                    if let Some(e) = event
                        && sender.send(e).is_err()
                    {
                        break;
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    if sender.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self { receiver }
    }

    /// Get the next event, blocking.
    pub fn next(&self) -> Result<Event> {
        Ok(self.receiver.recv()?)
    }
}
