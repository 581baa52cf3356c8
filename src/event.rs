//! Terminal event loop.
//!
//! A background thread polls crossterm and forwards key presses and resizes,
//! emitting a tick whenever the tick rate elapses without input.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use color_eyre::Result;
use crossterm::event::{self, KeyEvent, KeyEventKind};

/// Terminal events delivered to the app.
#[derive(Debug, Clone, Copy)]
pub enum Event {
    Key(KeyEvent),
    Tick,
    Resize(u16, u16),
}

pub struct EventHandler {
    rx: mpsc::Receiver<Event>,
    _thread: thread::JoinHandle<()>,
}

impl EventHandler {
    /// Starts polling with the given tick rate in milliseconds.
    pub fn new(tick_rate: u64) -> Self {
        let tick_rate = Duration::from_millis(tick_rate.max(1));
        let (tx, rx) = mpsc::channel();

        let thread = thread::spawn(move || {
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate.saturating_sub(last_tick.elapsed());
                let polled = match event::poll(timeout) {
                    Ok(true) => match event::read() {
                        Ok(event::Event::Key(key)) if key.kind == KeyEventKind::Press => {
                            Some(Event::Key(key))
                        }
                        Ok(event::Event::Resize(w, h)) => Some(Event::Resize(w, h)),
                        Ok(_) => None,
                        Err(_) => break,
                    },
                    Ok(false) => None,
                    Err(_) => break,
                };

                if let Some(event) = polled {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                if last_tick.elapsed() >= tick_rate {
                    if tx.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self {
            rx,
            _thread: thread,
        }
    }

    /// Blocks until the next event.
    ///
    /// # Errors
    ///
    /// Returns an error if the polling thread has stopped.
    pub fn next(&self) -> Result<Event> {
        Ok(self.rx.recv()?)
    }
}
