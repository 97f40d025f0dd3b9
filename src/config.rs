//! Configuration for fileshare
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// The only port the protocol itself defines
pub const DEFAULT_PORT: u16 = 15421;

/// Main configuration for a fileshare server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Share Configuration
    // -------------------------------------------------------------------------
    /// Directory whose regular files are listed, uploaded to and downloaded from
    pub shared_dir: PathBuf,

    /// Largest upload the server accepts (in bytes)
    pub max_upload_size: u64,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shared_dir: PathBuf::from("."),
            max_upload_size: 1024 * 1024 * 1024, // 1 GiB
            listen_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the shared directory
    pub fn shared_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.shared_dir = path.into();
        self
    }

    /// Set the maximum accepted upload size (in bytes)
    pub fn max_upload_size(mut self, size: u64) -> Self {
        self.config.max_upload_size = size;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
