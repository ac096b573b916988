use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that end a training run
#[derive(Debug, Error)]
pub enum Error {
    #[error("settings file {}: {source}", path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("results file {}: {source}", path.display())]
    Results {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Rejected answer input. The user is re-prompted, nothing is scored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    #[error("no answer was typed")]
    Empty,
    #[error("`{0}` is not an integer")]
    NotANumber(String),
}

/// Parse a typed answer. Only plain ASCII digits are accepted.
pub fn parse_answer(input: &str) -> std::result::Result<u32, AnswerError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AnswerError::Empty);
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AnswerError::NotANumber(trimmed.to_string()));
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| AnswerError::NotANumber(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_plain_digits() {
        assert_eq!(parse_answer("4711"), Ok(4711));
        assert_eq!(parse_answer(" 42 "), Ok(42));
        assert_eq!(parse_answer("007"), Ok(7));
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(parse_answer(""), Err(AnswerError::Empty));
        assert_eq!(parse_answer("   "), Err(AnswerError::Empty));
    }

    #[test]
    fn rejects_non_digits() {
        assert_matches!(parse_answer("12a"), Err(AnswerError::NotANumber(s)) if s == "12a");
        assert_matches!(parse_answer("-5"), Err(AnswerError::NotANumber(_)));
        assert_matches!(parse_answer("+5"), Err(AnswerError::NotANumber(_)));
        assert_matches!(parse_answer("1 2"), Err(AnswerError::NotANumber(_)));
    }

    #[test]
    fn rejects_overflowing_numbers() {
        assert_matches!(
            parse_answer("99999999999999999999"),
            Err(AnswerError::NotANumber(_))
        );
    }

    #[test]
    fn error_messages_name_the_file() {
        let err = Error::Settings {
            path: PathBuf::from("/tmp/settings.ini"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "settings file /tmp/settings.ini: denied");
    }
}
