//! Response definitions
//!
//! Represents responses to clients.

use crate::error::ShareError;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Empty = 0x00,
    FileNameList = 0x01,
    FileContent = 0x02,
    Failure = 0x03,
}

impl Status {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Empty),
            0x01 => Some(Status::FileNameList),
            0x02 => Some(Status::FileContent),
            0x03 => Some(Status::Failure),
            _ => None,
        }
    }
}

/// Why the server refused or failed a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FailureKind {
    BadCommand = 0x01,
    PathEscape = 0x02,
    NotFound = 0x03,
    Io = 0x04,
    TooLarge = 0x05,
}

impl FailureKind {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(FailureKind::BadCommand),
            0x02 => Some(FailureKind::PathEscape),
            0x03 => Some(FailureKind::NotFound),
            0x04 => Some(FailureKind::Io),
            0x05 => Some(FailureKind::TooLarge),
            _ => None,
        }
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Names of the regular files in the shared directory, listing order
    FileNameList(Vec<String>),

    /// Raw content of a downloaded file
    FileContent(Vec<u8>),

    /// Upload acknowledgement
    Empty,

    /// The command could not be carried out
    Failure { kind: FailureKind, message: String },
}

impl Response {
    /// Create a FAILURE response
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Response::Failure {
            kind,
            message: message.into(),
        }
    }

    /// The reply to a command that could not be decoded
    pub fn bad_command() -> Self {
        Self::failure(FailureKind::BadCommand, "bad command")
    }

    /// Convert a handler error into the failure reported to the client
    pub fn from_error(err: &ShareError) -> Self {
        match err {
            ShareError::MalformedCommand(_) => Self::bad_command(),
            ShareError::PathEscape(name) => Self::failure(FailureKind::PathEscape, name.clone()),
            ShareError::NotFound(name) => Self::failure(FailureKind::NotFound, name.clone()),
            ShareError::PayloadTooLarge { .. } => {
                Self::failure(FailureKind::TooLarge, err.to_string())
            }
            other => Self::failure(FailureKind::Io, other.to_string()),
        }
    }

    /// Get the status code
    pub fn status(&self) -> Status {
        match self {
            Response::FileNameList(_) => Status::FileNameList,
            Response::FileContent(_) => Status::FileContent,
            Response::Empty => Status::Empty,
            Response::Failure { .. } => Status::Failure,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Response::Failure { .. })
    }

    /// Turn a FAILURE response into the matching error
    pub fn into_result(self) -> Result<Response, ShareError> {
        match self {
            Response::Failure { kind, message } => Err(match kind {
                FailureKind::BadCommand => ShareError::MalformedCommand(message),
                FailureKind::PathEscape => ShareError::PathEscape(message),
                FailureKind::NotFound => ShareError::NotFound(message),
                FailureKind::Io | FailureKind::TooLarge => ShareError::Remote(message),
            }),
            other => Ok(other),
        }
    }

    /// Render a file list one name per line
    ///
    /// Failures render as their message; other responses render empty.
    pub fn to_lines(&self) -> String {
        match self {
            Response::FileNameList(names) => names.join("\n"),
            Response::Failure { message, .. } => message.clone(),
            Response::FileContent(_) | Response::Empty => String::new(),
        }
    }
}
