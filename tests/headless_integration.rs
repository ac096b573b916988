use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use flashnum::results::ResultsLog;
use flashnum::runtime::{Clock, ManualClock, Runner, TestEventSource, TrainerEvent};
use flashnum::session::{Mode, CALIBRATION_STEPS};
use flashnum::settings::{MemorySettingsStore, SettingsStore};
use flashnum::trainer::{Flow, Phase, Trainer};

fn key(code: KeyCode) -> TrainerEvent {
    TrainerEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

// Headless run of a whole calibration session through Runner/TestEventSource
// with a manual clock standing in for the display timer.
#[test]
fn headless_calibration_session_completes() {
    let dir = tempfile::tempdir().unwrap();
    let mut trainer = Trainer::new(
        MemorySettingsStore::new("speed_view: 1000\n"),
        ResultsLog::new(dir.path()),
        Mode::Calibration,
        0,
        Some(99),
    )
    .unwrap();

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(1));
    let clock = ManualClock::new();

    tx.send(key(KeyCode::Enter)).unwrap();

    let mut flow = Flow::Continue;
    for _ in 0..1000u32 {
        flow = trainer.handle_event(runner.step(), clock.now()).unwrap();
        if flow != Flow::Continue {
            break;
        }

        match trainer.phase().clone() {
            Phase::Displaying { hide_at, .. } => {
                clock.advance(hide_at - clock.now());
            }
            Phase::AwaitingAnswer { target, input, .. } if input.is_empty() => {
                // Answer right on even steps, wrong on odd ones
                let answer = if trainer.session().step() % 2 == 0 {
                    target
                } else {
                    target + 1
                };
                for c in answer.to_string().chars() {
                    tx.send(key(KeyCode::Char(c))).unwrap();
                }
                tx.send(key(KeyCode::Enter)).unwrap();
            }
            Phase::AwaitingReady => {
                if trainer.session().step() > 0 {
                    tx.send(key(KeyCode::Char(' '))).unwrap();
                }
            }
            _ => {}
        }
    }

    assert_eq!(flow, Flow::Finished);
    assert!(trainer.is_terminated());

    let summary = trainer.summary();
    assert_eq!(summary.total, CALIBRATION_STEPS);
    assert_eq!(summary.mistakes, 7);
    assert_eq!(summary.correct, 8);

    // 8 correct (-50 each) and 7 mistakes (+20 each) from 1000
    assert_eq!(trainer.session().interval_ms(), 1000 - 8 * 50 + 7 * 20);
    // The baseline goes back into the settings for the next session
    assert_eq!(trainer.store().interval().unwrap(), 1000);

    let content = std::fs::read_to_string(trainer.results_path().unwrap()).unwrap();
    assert!(content.contains("Answers with mistake: 7\n"));
}

#[test]
fn headless_escape_aborts_mid_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut trainer = Trainer::new(
        MemorySettingsStore::new(""),
        ResultsLog::new(dir.path()),
        Mode::Full,
        0,
        Some(1),
    )
    .unwrap();

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(1));
    let clock = ManualClock::new();

    tx.send(key(KeyCode::Enter)).unwrap();
    tx.send(key(KeyCode::Esc)).unwrap();

    assert_eq!(
        trainer.handle_event(runner.step(), clock.now()).unwrap(),
        Flow::Continue
    );
    assert!(matches!(trainer.phase(), Phase::Displaying { .. }));
    assert_eq!(
        trainer.handle_event(runner.step(), clock.now()).unwrap(),
        Flow::Abort
    );
    assert!(trainer.results_path().is_none());
}

#[test]
fn headless_tick_hides_the_number() {
    let dir = tempfile::tempdir().unwrap();
    let mut trainer = Trainer::new(
        MemorySettingsStore::new("speed_view: 300\n"),
        ResultsLog::new(dir.path()),
        Mode::Full,
        50,
        Some(4),
    )
    .unwrap();
    let clock = ManualClock::new();

    trainer.handle_event(key(KeyCode::Enter), clock.now()).unwrap();
    let target = match trainer.phase() {
        Phase::Displaying { target, .. } => *target,
        other => panic!("unexpected phase {other:?}"),
    };
    assert!((100..=999).contains(&target));

    clock.advance(Duration::from_millis(299));
    trainer.handle_event(TrainerEvent::Tick, clock.now()).unwrap();
    assert!(matches!(trainer.phase(), Phase::Displaying { .. }));

    clock.advance(Duration::from_millis(1));
    trainer.handle_event(TrainerEvent::Tick, clock.now()).unwrap();
    assert!(matches!(trainer.phase(), Phase::AwaitingAnswer { .. }));
}
