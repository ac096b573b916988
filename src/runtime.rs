use std::cell::Cell;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// What the trainer reacts to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrainerEvent {
    Key(KeyEvent),
    Resize,
    /// Nothing arrived in time; deadlines still need checking
    Tick,
}

/// Map a terminal event onto a trainer event.
///
/// Key releases and repeats are dropped (Windows reports both), as are
/// mouse, focus and paste events.
pub fn translate(event: CtEvent) -> Option<TrainerEvent> {
    match event {
        CtEvent::Key(key) if key.kind == KeyEventKind::Press => Some(TrainerEvent::Key(key)),
        CtEvent::Resize(..) => Some(TrainerEvent::Resize),
        _ => None,
    }
}

/// Where the trainer's input comes from
pub trait EventSource {
    /// Wait at most `timeout` for the next event. `None` when nothing came,
    /// including when the source has gone away.
    fn next_event(&self, timeout: Duration) -> Option<TrainerEvent>;
}

/// Terminal input read on a background thread
pub struct CrosstermEventSource {
    rx: Receiver<TrainerEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            while let Ok(raw) = event::read() {
                let Some(ev) = translate(raw) else { continue };
                if tx.send(ev).is_err() {
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn next_event(&self, timeout: Duration) -> Option<TrainerEvent> {
        self.rx.recv_timeout(timeout).ok()
    }
}

/// Scripted input for tests: whatever is pushed into the channel
pub struct TestEventSource {
    rx: Receiver<TrainerEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<TrainerEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn next_event(&self, timeout: Duration) -> Option<TrainerEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(ev) => Some(ev),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// Pulls one event at a time, falling back to `Tick` so the trainer gets to
/// look at the clock at least once per tick period.
pub struct Runner<E: EventSource> {
    source: E,
    tick: Duration,
}

impl<E: EventSource> Runner<E> {
    pub fn new(source: E, tick: Duration) -> Self {
        Self { source, tick }
    }

    pub fn step(&self) -> TrainerEvent {
        self.source.next_event(self.tick).unwrap_or(TrainerEvent::Tick)
    }

    /// Like `step`, but returns by `deadline` at the latest so a shown number
    /// is hidden on time rather than up to a tick late.
    pub fn step_until(&self, deadline: Option<Instant>, now: Instant) -> TrainerEvent {
        let wait = deadline.map_or(self.tick, |at| {
            at.saturating_duration_since(now).min(self.tick)
        });
        self.source.next_event(wait).unwrap_or(TrainerEvent::Tick)
    }
}

/// Time source for the trainer's display deadlines
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}
