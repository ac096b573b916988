use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use flashnum::{
    results::{format_summary, ResultsLog},
    runtime::{Clock, CrosstermEventSource, Runner, SystemClock},
    session::{Mode, FULL_STEPS},
    settings::{FileSettingsStore, SettingsStore},
    trainer::{Flow, Trainer},
};
use log::LevelFilter;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

const TICK_RATE_MS: u64 = 100;

/// remember the number, type it back
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Shows numbers of growing length for a short, configurable time and asks you to type them back. Calibration mode tunes the display time to your memory before a full run."
)]
pub struct Cli {
    /// run a short calibration session that tunes the display interval
    #[clap(short = 'c', long)]
    calibrate: bool,

    /// settings file, created with defaults when missing
    #[clap(long, default_value = FileSettingsStore::DEFAULT_PATH)]
    settings: PathBuf,

    /// directory that receives the Results<N>.txt files
    #[clap(long, default_value = ".")]
    results_dir: PathBuf,

    /// start a full session at this step, skipping the earlier numbers
    #[clap(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..FULL_STEPS as i64))]
    skip: u32,

    /// seed the number generator for a repeatable sequence
    #[clap(long)]
    seed: Option<u64>,

    /// write log records to this file instead of stderr
    #[clap(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.calibrate {
            Mode::Calibration
        } else {
            Mode::Full
        }
    }
}

fn init_logging(cli: &Cli) -> io::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Warn).parse_default_env();
    if let Some(path) = &cli.log_file {
        builder.target(env_logger::Target::Pipe(Box::new(File::create(path)?)));
    }
    builder.init();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging(&cli)?;

    let store = FileSettingsStore::with_path(&cli.settings);
    let results = ResultsLog::new(&cli.results_dir);
    let mut trainer = Trainer::new(store, results, cli.mode(), cli.skip, cli.seed)?;

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut trainer);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    match outcome? {
        Flow::Finished => {
            print!("{}", format_summary(&trainer.summary()));
            if let Some(path) = trainer.results_path() {
                println!("Results written to {}", path.display());
            }
            println!(
                "Display interval in {}: {} ms",
                cli.settings.display(),
                trainer.store().interval()?
            );
        }
        Flow::Abort | Flow::Continue => {
            let session = trainer.session();
            println!(
                "Session stopped at step {}/{}",
                session.step(),
                session.max_steps()
            );
        }
    }

    Ok(())
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    trainer: &mut Trainer<FileSettingsStore>,
) -> Result<Flow, Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );
    let clock = SystemClock;

    loop {
        terminal.draw(|f| f.render_widget(&*trainer, f.area()))?;
        if trainer.is_terminated() {
            return Ok(Flow::Finished);
        }

        // Wake up right when the shown number has to disappear
        let event = runner.step_until(trainer.deadline(), clock.now());
        match trainer.handle_event(event, clock.now())? {
            Flow::Continue => {}
            flow => return Ok(flow),
        }
    }
}
