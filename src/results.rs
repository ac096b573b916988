use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Error, Result};
use crate::session::Summary;

const FILE_PREFIX: &str = "Results";
const FILE_SUFFIX: &str = ".txt";

/// Per-trial outcome label written to the results file
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Outcome {
    Correct,
    Mistake,
}

impl From<bool> for Outcome {
    fn from(correct: bool) -> Self {
        if correct {
            Outcome::Correct
        } else {
            Outcome::Mistake
        }
    }
}

/// Append-only results file for one session.
///
/// The file is named `Results<N>.txt` with the lowest free `N`, picked on the
/// first write so that aborted-before-first-answer sessions leave nothing behind.
#[derive(Debug)]
pub struct ResultsLog {
    dir: PathBuf,
    path: Option<PathBuf>,
}

impl ResultsLog {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            path: None,
        }
    }

    /// The chosen file, once something has been written
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn record_trial(&mut self, target: u32, answer: u32) -> Result<()> {
        let outcome = Outcome::from(target == answer);
        self.append(&format!("{target}\n{answer}\n{outcome}\n\n"))
    }

    pub fn record_summary(&mut self, summary: &Summary) -> Result<()> {
        self.append(&format_summary(summary))
    }

    fn append(&mut self, text: &str) -> Result<()> {
        let path = self.ensure_file()?;
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|source| Error::Results {
                path: path.clone(),
                source,
            })?;
        file.write_all(text.as_bytes())
            .map_err(|source| Error::Results { path, source })
    }

    fn ensure_file(&mut self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }

        fs::create_dir_all(&self.dir).map_err(|source| Error::Results {
            path: self.dir.clone(),
            source,
        })?;

        let path = claim_free_path(&self.dir).map_err(|source| Error::Results {
            path: self.dir.clone(),
            source,
        })?;
        info!("writing results to {}", path.display());
        self.path = Some(path.clone());
        Ok(path)
    }
}

/// Create the first `Results<N>.txt` that does not exist yet
fn claim_free_path(dir: &Path) -> io::Result<PathBuf> {
    for index in 0u32.. {
        let candidate = dir.join(format!("{FILE_PREFIX}{index}{FILE_SUFFIX}"));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(io::ErrorKind::Other, "no free results file name"))
}

pub fn format_summary(summary: &Summary) -> String {
    format!(
        "All numbers count: {}\n\
         Correct answers was: {}\n\
         Answers with mistake: {}\n\
         Percentage of correct answers is: {:.2}%\n",
        summary.total, summary.correct, summary.mistakes, summary.percentage
    )
}
