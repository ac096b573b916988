use std::ops::RangeInclusive;

use log::{debug, info};
use rand::Rng;

/// Steps allotted to each band, in order
pub const BAND_STEPS: [u32; 5] = [46, 77, 81, 70, 118];
pub const CALIBRATION_STEPS: u32 = 15;
pub const FULL_STEPS: u32 = 46 + 77 + 81 + 70 + 118;

pub const MIN_INTERVAL_MS: u32 = 50;
pub const CORRECT_STEP_MS: i64 = -50;
pub const MISTAKE_STEP_MS: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Mode {
    Calibration,
    Full,
}

impl Mode {
    pub fn max_steps(&self) -> u32 {
        match self {
            Mode::Calibration => CALIBRATION_STEPS,
            Mode::Full => FULL_STEPS,
        }
    }
}

/// Digit-length band a number is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum_macros::Display)]
pub enum Band {
    TwoDigits,
    ThreeDigits,
    FourDigits,
    FiveDigits,
    SixDigits,
}

impl Band {
    pub const ALL: [Band; 5] = [
        Band::TwoDigits,
        Band::ThreeDigits,
        Band::FourDigits,
        Band::FiveDigits,
        Band::SixDigits,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn digits(&self) -> u32 {
        self.index() as u32 + 2
    }

    pub fn range(&self) -> RangeInclusive<u32> {
        let low = 10u32.pow(self.digits() - 1);
        low..=(low * 10 - 1)
    }

    /// Extra display time granted once when the band is entered
    pub fn bonus_ms(&self) -> u32 {
        match self {
            Band::TwoDigits | Band::ThreeDigits => 0,
            Band::FourDigits | Band::FiveDigits => 10,
            Band::SixDigits => 30,
        }
    }

    /// First step index that belongs to the next band
    pub fn end_step(&self) -> u32 {
        BAND_STEPS[..=self.index()].iter().sum()
    }

    /// Band of a full-session step; steps past the end stay in the last band
    pub fn for_step(step: u32) -> Band {
        Band::ALL
            .into_iter()
            .find(|band| step < band.end_step())
            .unwrap_or(Band::SixDigits)
    }
}

/// One generated number and what drawing it changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    pub target: u32,
    pub band: Band,
    /// Set when entering `band` raised the display interval
    pub bonus: Option<IntervalUpdate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalUpdate {
    pub from_ms: u32,
    pub to_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub correct: bool,
    pub interval_update: Option<IntervalUpdate>,
    pub finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub total: u32,
    pub correct: u32,
    pub mistakes: u32,
    pub percentage: f64,
}

/// A training session: which step we are on, what to draw next and how the
/// display interval moves.
#[derive(Debug, Clone)]
pub struct Session {
    mode: Mode,
    start_step: u32,
    step: u32,
    max_steps: u32,
    mistakes: u32,
    /// Band of the previous draw; a change marks a band transition
    entered: Option<Band>,
    baseline_ms: u32,
    interval_ms: u32,
}

impl Session {
    pub fn new(mode: Mode, baseline_ms: u32) -> Self {
        Self {
            mode,
            start_step: 0,
            step: 0,
            max_steps: mode.max_steps(),
            mistakes: 0,
            entered: None,
            baseline_ms,
            interval_ms: baseline_ms,
        }
    }

    /// Full session that skips the first `step` steps. Calibration always starts at 0.
    pub fn starting_at(mode: Mode, baseline_ms: u32, step: u32) -> Self {
        let mut session = Self::new(mode, baseline_ms);
        if mode == Mode::Full {
            session.step = step.min(session.max_steps);
            session.start_step = session.step;
        }
        session
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    pub fn baseline_ms(&self) -> u32 {
        self.baseline_ms
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn is_finished(&self) -> bool {
        self.step >= self.max_steps
    }

    pub fn current_band(&self) -> Band {
        match self.mode {
            Mode::Calibration => Band::TwoDigits,
            Mode::Full => Band::for_step(self.step),
        }
    }

    /// Draw the number for the current step.
    ///
    /// Does not advance the step; that happens when the answer is scored.
    pub fn next_trial<R: Rng>(&mut self, rng: &mut R) -> Draw {
        let band = self.current_band();

        let bonus = if self.entered != Some(band) {
            self.entered = Some(band);
            debug!("entering band {band} at step {}", self.step);
            match band.bonus_ms() {
                0 => None,
                extra => {
                    let update = IntervalUpdate {
                        from_ms: self.interval_ms,
                        to_ms: self.interval_ms.saturating_add(extra),
                    };
                    self.interval_ms = update.to_ms;
                    info!(
                        "band {band}: display interval {} -> {} ms",
                        update.from_ms, update.to_ms
                    );
                    Some(update)
                }
            }
        } else {
            None
        };

        Draw {
            target: rng.gen_range(band.range()),
            band,
            bonus,
        }
    }

    /// Score an answer against the drawn target and advance one step.
    pub fn score_trial(&mut self, target: u32, answer: u32) -> Score {
        let correct = target == answer;
        if !correct {
            self.mistakes += 1;
        }

        let interval_update = match self.mode {
            Mode::Calibration => {
                let delta = if correct {
                    CORRECT_STEP_MS
                } else {
                    MISTAKE_STEP_MS
                };
                let to_ms = adjusted_interval(self.interval_ms, delta);
                let update = IntervalUpdate {
                    from_ms: self.interval_ms,
                    to_ms,
                };
                self.interval_ms = to_ms;
                Some(update)
            }
            Mode::Full => None,
        };

        self.step += 1;
        debug!(
            "step {}/{}: target {target}, answer {answer}, correct {correct}",
            self.step, self.max_steps
        );

        Score {
            correct,
            interval_update,
            finished: self.is_finished(),
        }
    }

    /// Totals over the steps played so far
    pub fn summary(&self) -> Summary {
        let total = self.step - self.start_step;
        let mistakes = self.mistakes;
        let percentage = if total == 0 {
            0.0
        } else {
            100.0 - 100.0 * mistakes as f64 / total as f64
        };
        Summary {
            total,
            correct: total.saturating_sub(mistakes),
            mistakes,
            percentage,
        }
    }
}

/// Apply a calibration step, never going below the minimum interval
pub fn adjusted_interval(current_ms: u32, delta_ms: i64) -> u32 {
    let next = (current_ms as i64 + delta_ms).max(MIN_INTERVAL_MS as i64);
    next.min(u32::MAX as i64) as u32
}
