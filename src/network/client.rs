//! Client request executor
//!
//! Every request opens a fresh connection, sends one command, half-closes,
//! and reads until the server closes.

use std::fs;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, ShareError};
use crate::protocol::{decode_response, encode_command, Command, Response};
use crate::share;

/// Default connect timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-operation read/write timeout
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for one fileshare server
#[derive(Debug, Clone)]
pub struct Client {
    addr: String,
    connect_timeout: Option<Duration>,
    io_timeout: Option<Duration>,
}

impl Client {
    /// Create a client for `addr` (`host:port`)
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            io_timeout: Some(DEFAULT_IO_TIMEOUT),
        }
    }

    /// Create a client for `host` and `port`
    pub fn with_host(host: &str, port: u16) -> Self {
        // Bare IPv6 literals need brackets to carry a port
        if host.contains(':') && !host.starts_with('[') {
            Self::new(format!("[{}]:{}", host, port))
        } else {
            Self::new(format!("{}:{}", host, port))
        }
    }

    /// Set the connect timeout (`None` uses the OS default)
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the read/write timeout (`None` blocks indefinitely)
    pub fn io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send an encoded request and return every byte the server sent back
    ///
    /// An empty request returns an empty response without connecting.
    /// Any socket failure is an error; partial data is never returned.
    /// If the server stops reading early, whatever it already answered is
    /// still returned.
    pub fn send_raw(&self, request: &[u8]) -> Result<Vec<u8>> {
        if request.is_empty() {
            return Ok(Vec::new());
        }

        let mut stream = self.connect()?;
        let conn_err = |e| ShareError::connection(&self.addr, e);

        let sent = stream
            .write_all(request)
            .and_then(|_| stream.flush())
            .and_then(|_| stream.shutdown(Shutdown::Write));

        if let Err(e) = sent {
            if !matches!(e.kind(), io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset) {
                return Err(conn_err(e));
            }

            let mut response = Vec::new();
            let _ = stream.read_to_end(&mut response);
            if response.is_empty() {
                return Err(conn_err(e));
            }
            tracing::debug!("Server stopped reading early; got {} bytes", response.len());
            return Ok(response);
        }

        let mut response = Vec::new();
        stream.read_to_end(&mut response).map_err(conn_err)?;

        tracing::debug!("Received {} bytes from {}", response.len(), self.addr);
        Ok(response)
    }

    fn connect(&self) -> Result<TcpStream> {
        let addrs = self
            .addr
            .to_socket_addrs()
            .map_err(|e| ShareError::connection(&self.addr, e))?;

        let mut last_err = None;
        for addr in addrs {
            let attempt = match self.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    stream
                        .set_read_timeout(self.io_timeout)
                        .and_then(|_| stream.set_write_timeout(self.io_timeout))
                        .map_err(|e| ShareError::connection(&self.addr, e))?;
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(e) => ShareError::connection(&self.addr, e),
            None => ShareError::Connection(format!("{}: no addresses resolved", self.addr)),
        })
    }

    /// Send a command and decode the response
    ///
    /// `Failure` responses are returned as values, not errors.
    pub fn execute(&self, command: &Command) -> Result<Response> {
        tracing::debug!("Sending {:?} to {}", command.command_type(), self.addr);
        let bytes = self.send_raw(&encode_command(command))?;
        decode_response(&bytes)
    }

    /// List the server's shared directory
    pub fn list(&self) -> Result<Vec<String>> {
        match self.execute(&Command::List)?.into_result()? {
            Response::FileNameList(names) => Ok(names),
            other => Err(unexpected("LIST", &other)),
        }
    }

    /// Store `content` on the server as `filename`
    pub fn upload(&self, filename: &str, content: impl Into<Vec<u8>>) -> Result<()> {
        share::validate_filename(filename)?;

        let command = Command::Upload {
            filename: filename.to_string(),
            content: content.into(),
        };
        match self.execute(&command)?.into_result()? {
            Response::Empty => Ok(()),
            other => Err(unexpected("UPLOAD", &other)),
        }
    }

    /// Fetch `filename` from the server
    pub fn download(&self, filename: &str) -> Result<Vec<u8>> {
        let command = Command::Download {
            filename: filename.to_string(),
        };
        match self.execute(&command)?.into_result()? {
            Response::FileContent(content) => Ok(content),
            other => Err(unexpected("DOWNLOAD", &other)),
        }
    }

    /// Upload a local file under its own name; returns that name
    pub fn upload_file(&self, local_path: &Path) -> Result<String> {
        let filename = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ShareError::Config(format!("{} has no usable file name", local_path.display()))
            })?
            .to_string();

        let content = fs::read(local_path)?;
        self.upload(&filename, content)?;
        Ok(filename)
    }

    /// Download `filename` into `local_dir`, replacing any local copy
    pub fn download_to(&self, local_dir: &Path, filename: &str) -> Result<PathBuf> {
        share::validate_filename(filename)?;

        let content = self.download(filename)?;
        let mut reader = content.as_slice();
        share::write_file(local_dir, filename, &mut reader, content.len() as u64)?;

        Ok(local_dir.join(filename))
    }
}

fn unexpected(request: &str, response: &Response) -> ShareError {
    ShareError::Protocol(format!(
        "unexpected {:?} response to {}",
        response.status(),
        request
    ))
}

/// Send one command to `host:port` and return the raw response bytes
pub fn send_request(command: &Command, host: &str, port: u16) -> Result<Vec<u8>> {
    Client::with_host(host, port).send_raw(&encode_command(command))
}
