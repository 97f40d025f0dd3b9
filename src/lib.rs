//! # fileshare
//!
//! Browse and transfer files in a shared directory on a remote host:
//! - Flat listing of the regular files in a directory
//! - Byte-exact upload and download over a length-prefixed TCP protocol
//! - Thread-per-connection server with graceful shutdown
//! - One-shot client requests (one connection per command)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Client (one request)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ TCP (LIST / UPLD / DNLD frame)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Server (accept loop)                        │
//! │             spawns one handler per socket                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │               Connection (one command)                       │
//! │       decode → dispatch → respond → close                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!               ┌───────────────┐
//!               │ Shared dir    │
//!               │ (list / r / w)│
//!               └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod share;
pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ShareError, Result};
pub use config::{Config, DEFAULT_PORT};
pub use share::{list_files, SharedLocation};
pub use network::{send_request, start_listening, Client, Server, ServerHandle};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of fileshare
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
