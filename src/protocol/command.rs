//! Command definitions
//!
//! Represents commands from clients.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    List,
    Upload,
    Download,
}

impl CommandType {
    /// Four-byte wire tag
    pub const fn tag(self) -> [u8; 4] {
        match self {
            CommandType::List => *b"LIST",
            CommandType::Upload => *b"UPLD",
            CommandType::Download => *b"DNLD",
        }
    }

    /// Look up a command type by its wire tag
    pub fn from_tag(tag: [u8; 4]) -> Option<Self> {
        match &tag {
            b"LIST" => Some(CommandType::List),
            b"UPLD" => Some(CommandType::Upload),
            b"DNLD" => Some(CommandType::Download),
            _ => None,
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the regular files in the shared directory
    List,

    /// Store `content` as `filename`, replacing any existing file
    Upload { filename: String, content: Vec<u8> },

    /// Fetch the content of `filename`
    Download { filename: String },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::List => CommandType::List,
            Command::Upload { .. } => CommandType::Upload,
            Command::Download { .. } => CommandType::Download,
        }
    }

    /// The target filename, if the command has one
    pub fn filename(&self) -> Option<&str> {
        match self {
            Command::List => None,
            Command::Upload { filename, .. } | Command::Download { filename } => Some(filename),
        }
    }
}

/// A command whose upload payload has not been read yet
///
/// Lets the server stream upload data straight to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandHeader {
    List,
    Upload { filename: String, len: u64 },
    Download { filename: String },
}

impl CommandHeader {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            CommandHeader::List => CommandType::List,
            CommandHeader::Upload { .. } => CommandType::Upload,
            CommandHeader::Download { .. } => CommandType::Download,
        }
    }
}
