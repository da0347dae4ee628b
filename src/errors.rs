use crate::ids::HandlerId;

#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    // Errors from external libraries
    Io(std::io::Error),
    Json(serde_json::Error),
    Regex(regex::Error),
    Poison(String),

    // Errors raised by the harness
    NoMatchFound {
        test_id: String,
        method: String,
        path: String,
        recorded: Vec<String>,
    },
    CursorExhausted {
        test_id: String,
        method: String,
        path: String,
        consumed: usize,
    },
    StoreCorrupt {
        test_id: String,
        message: String,
    },
    RecordingMissing(String),
    VariableMissing {
        test_id: String,
        name: String,
    },
    InvalidMode(String),
    SessionSealed(String),
    SessionActive(String),
    RecordDuringPlayback(String),
    HandlerDisposed(HandlerId),
    Transport(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Io(ref err) => err.fmt(f),
            Error::Json(ref err) => err.fmt(f),
            Error::Regex(ref err) => err.fmt(f),
            Error::Poison(ref err) => write!(f, "{}", err),

            Error::NoMatchFound {
                test_id,
                method,
                path,
                recorded,
            } => {
                writeln!(f, "no recorded interaction for {method} {path} in recording '{test_id}'")?;
                writeln!(f, "recorded interactions ({}):", recorded.len())?;
                for key in recorded {
                    writeln!(f, "  {key}")?;
                }
                write!(f, "if the request changed, re-record with HTTP_RECORDER_MODE=record")
            }
            Error::CursorExhausted {
                test_id,
                method,
                path,
                consumed,
            } => write!(
                f,
                "all {consumed} recorded interaction(s) for {method} {path} in recording '{test_id}' were already replayed; re-record with HTTP_RECORDER_MODE=record"
            ),
            Error::StoreCorrupt { test_id, message } => write!(f, "recording '{test_id}' is corrupt: {message}"),
            Error::RecordingMissing(test_id) => write!(f, "playback forced but no recording exists for '{test_id}'"),
            Error::VariableMissing { test_id, name } => write!(f, "variable '{name}' was not recorded in '{test_id}'"),
            Error::InvalidMode(value) => write!(f, "invalid recorder mode: {value}"),
            Error::SessionSealed(test_id) => write!(f, "session '{test_id}' was already flushed"),
            Error::SessionActive(test_id) => write!(f, "session '{test_id}' is already active"),
            Error::RecordDuringPlayback(test_id) => write!(f, "session '{test_id}' is replaying and cannot record new interactions"),
            Error::HandlerDisposed(id) => write!(f, "mock handler {id} was disposed"),
            Error::Transport(message) => write!(f, "transport error: {message}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Error {
        Error::Regex(err)
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(err: std::sync::PoisonError<T>) -> Error {
        Error::Poison(format!("Mutex poison error: {}", err))
    }
}
