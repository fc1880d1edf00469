//! Error type for instrument profile loading.

use std::fmt;

/// An error that occurred while loading an instrument profile.
#[derive(Debug, Clone)]
pub struct ProfileError {
    pub message: String,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    Io,
    Parse,
}

impl ProfileError {
    pub fn io(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ErrorKind::Io,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ErrorKind::Parse,
        }
    }
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ProfileError {}
