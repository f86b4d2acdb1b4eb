use std::fmt;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    Protocol(String),
    InvalidMode(String),
    InvalidTemperature { value: f64, min: f64, max: f64 },
    InvalidConfig(String),
    Json(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Error::InvalidMode(mode) => write!(f, "invalid operation mode: {mode}"),
            Error::InvalidTemperature { value, min, max } => {
                write!(f, "temperature {value} outside {min}..={max}")
            }
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Error::Json(e) => write!(f, "JSON error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
