use std::fmt;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    BadStatus(u16),
    Protocol(String),
    Unsupported(String),
    Closed,
    Io(std::io::Error),
}

impl Error {
    /// True for failures that never reached a device response (refused, DNS, timeout).
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(e) if !e.is_builder())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::BadStatus(status) => write!(f, "unexpected status: {status}"),
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Error::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            Error::Closed => write!(f, "connection closed"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
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

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
