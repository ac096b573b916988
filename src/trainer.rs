use std::path::Path;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{parse_answer, Result};
use crate::results::ResultsLog;
use crate::runtime::TrainerEvent;
use crate::session::{Mode, Score, Session, Summary};
use crate::settings::{ScreenSize, SettingsStore};

pub const INVALID_ANSWER_WARNING: &str = "You need to type an integer value!";

/// Longest answer the prompt accepts; six digits is the biggest band
const MAX_ANSWER_LEN: usize = 12;

/// Where the trainer is in the ready / show / answer cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    AwaitingReady,
    Displaying {
        target: u32,
        hide_at: Instant,
    },
    AwaitingAnswer {
        target: u32,
        input: String,
        warning: Option<String>,
    },
    Terminated,
}

/// What the event loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The user left before the last step
    Abort,
    /// The last step was scored
    Finished,
}

/// Drives one session: draws numbers, times their display, takes answers
/// and keeps the settings file and results log in step.
#[derive(Debug)]
pub struct Trainer<S: SettingsStore> {
    store: S,
    session: Session,
    results: ResultsLog,
    rng: StdRng,
    phase: Phase,
    screen: ScreenSize,
}

impl<S: SettingsStore> Trainer<S> {
    pub fn new(
        store: S,
        results: ResultsLog,
        mode: Mode,
        skip: u32,
        seed: Option<u64>,
    ) -> Result<Self> {
        let settings = store.load()?;
        let session = Session::starting_at(mode, settings.speed_view_ms, skip);
        info!(
            "{mode} session: steps {}..{}, display interval {} ms, window {}, nums_count {}",
            session.step(),
            session.max_steps(),
            settings.speed_view_ms,
            settings.screen_size(),
            settings.nums_count
        );

        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let phase = if session.is_finished() {
            Phase::Terminated
        } else {
            Phase::AwaitingReady
        };

        Ok(Self {
            store,
            session,
            results,
            rng,
            phase,
            screen: settings.screen_size(),
        })
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn screen_size(&self) -> ScreenSize {
        self.screen
    }

    pub fn results_path(&self) -> Option<&Path> {
        self.results.path()
    }

    pub fn summary(&self) -> Summary {
        self.session.summary()
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::Terminated
    }

    /// When the displayed number has to be hidden, if one is shown
    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Displaying { hide_at, .. } => Some(hide_at),
            _ => None,
        }
    }

    /// Ready control activated: draw and show the next number
    pub fn ready(&mut self, now: Instant) -> Result<()> {
        if self.phase != Phase::AwaitingReady {
            return Ok(());
        }

        let draw = self.session.next_trial(&mut self.rng);
        if let Some(bonus) = draw.bonus {
            self.store.set_interval(bonus.to_ms)?;
        }

        let shown_for = Duration::from_millis(u64::from(self.session.interval_ms()));
        self.phase = Phase::Displaying {
            target: draw.target,
            hide_at: now + shown_for,
        };
        Ok(())
    }

    /// Hide the number and ask for the answer once its time is up
    pub fn tick(&mut self, now: Instant) {
        if let Phase::Displaying { target, hide_at } = self.phase {
            if now >= hide_at {
                self.phase = Phase::AwaitingAnswer {
                    target,
                    input: String::new(),
                    warning: None,
                };
            }
        }
    }

    pub fn type_char(&mut self, c: char) {
        if let Phase::AwaitingAnswer { input, warning, .. } = &mut self.phase {
            if !c.is_control() && input.chars().count() < MAX_ANSWER_LEN {
                input.push(c);
                *warning = None;
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Phase::AwaitingAnswer { input, .. } = &mut self.phase {
            input.pop();
        }
    }

    /// Score the typed answer.
    ///
    /// A non-numeric answer is rejected in place: the prompt stays up with a
    /// warning and no step is used. Returns the score when one was taken.
    pub fn submit(&mut self) -> Result<Option<Score>> {
        let (target, parsed) = match &self.phase {
            Phase::AwaitingAnswer { target, input, .. } => (*target, parse_answer(input)),
            _ => return Ok(None),
        };

        let answer = match parsed {
            Ok(answer) => answer,
            Err(e) => {
                debug!("answer rejected: {e}");
                if let Phase::AwaitingAnswer { input, warning, .. } = &mut self.phase {
                    input.clear();
                    *warning = Some(INVALID_ANSWER_WARNING.to_string());
                }
                return Ok(None);
            }
        };

        let score = self.session.score_trial(target, answer);
        if let Some(update) = score.interval_update {
            self.store.set_interval(update.to_ms)?;
        }
        self.results.record_trial(target, answer)?;
        info!(
            "step {}/{}: {target} vs {answer} ({}), interval {} ms",
            self.session.step(),
            self.session.max_steps(),
            if score.correct { "correct" } else { "mistake" },
            self.session.interval_ms()
        );

        if score.finished {
            self.finish()?;
        } else {
            self.phase = Phase::AwaitingReady;
        }
        Ok(Some(score))
    }

    fn finish(&mut self) -> Result<()> {
        let summary = self.session.summary();
        self.results.record_summary(&summary)?;
        self.store.set_interval(self.session.baseline_ms())?;
        info!(
            "session done: {}/{} correct, display interval restored to {} ms",
            summary.correct,
            summary.total,
            self.session.baseline_ms()
        );
        self.phase = Phase::Terminated;
        Ok(())
    }

    /// Feed one runtime event through the phase machine
    pub fn handle_event(&mut self, event: TrainerEvent, now: Instant) -> Result<Flow> {
        // Any event past the deadline hides the number, not just a tick
        self.tick(now);

        match event {
            TrainerEvent::Tick | TrainerEvent::Resize => {}
            TrainerEvent::Key(key) => {
                if is_quit(&key) {
                    return Ok(Flow::Abort);
                }
                self.on_key(key, now)?;
            }
        }

        Ok(if self.is_terminated() {
            Flow::Finished
        } else {
            Flow::Continue
        })
    }

    fn on_key(&mut self, key: KeyEvent, now: Instant) -> Result<()> {
        match self.phase {
            Phase::AwaitingReady => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                    self.ready(now)?;
                }
            }
            Phase::AwaitingAnswer { .. } => match key.code {
                KeyCode::Enter => {
                    self.submit()?;
                }
                KeyCode::Backspace => self.backspace(),
                KeyCode::Char(c) => self.type_char(c),
                _ => {}
            },
            Phase::Displaying { .. } | Phase::Terminated => {}
        }
        Ok(())
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    key.code == KeyCode::Esc
        || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
}
