//! Share Module
//!
//! Access to the shared directory, used identically by client and server.
//!
//! ## Rules
//! - Only regular files directly inside the directory are visible
//! - A filename is a single path segment; anything else is a path escape
//! - Writes go through a staging file and an atomic rename

mod files;
mod location;

pub use files::{list_files, open_file, resolve, validate_filename, write_file};
pub use location::SharedLocation;
