//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{self, BufReader, BufWriter, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, ShareError};
use crate::protocol::{
    read_command_header, write_response, write_response_header, CommandHeader, Response, Status,
};
use crate::share;

/// Most leftover request bytes discarded while closing
const MAX_DRAIN_BYTES: u64 = 64 * 1024;

/// Read deadline while discarding leftover request bytes
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Shared directory, snapshotted when the connection was accepted
    shared_dir: Arc<PathBuf>,

    /// Largest upload accepted
    max_upload_size: u64,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O over the accepted stream
    pub fn new(stream: TcpStream, shared_dir: Arc<PathBuf>, max_upload_size: u64) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            shared_dir,
            max_upload_size,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 leaves a side unbounded)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Process exactly one command, then close the connection
    ///
    /// The socket is shut down on every exit path. Failures that were
    /// reported to the client return `Ok`; an error means the exchange
    /// itself broke (peer vanished, socket failure).
    pub fn handle(mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let result = self.serve();
        self.close();

        match result {
            Err(ShareError::Io(ref e)) if is_disconnect(e) => {
                tracing::debug!("Client {} went away: {}", self.peer_addr, e);
                Ok(())
            }
            other => other,
        }
    }

    fn serve(&mut self) -> Result<()> {
        let header = match read_command_header(&mut self.reader) {
            Ok(header) => header,
            Err(ShareError::MalformedCommand(reason)) => {
                tracing::warn!("Bad command from {}: {}", self.peer_addr, reason);
                return self.send_response(&Response::bad_command());
            }
            Err(e) => return Err(e),
        };

        tracing::trace!(
            "Received {:?} from {}: {:?}",
            header.command_type(),
            self.peer_addr,
            header
        );

        match header {
            CommandHeader::List => {
                let names = share::list_files(self.shared_dir.as_path());
                tracing::debug!("Listing {} files for {}", names.len(), self.peer_addr);
                self.send_response(&Response::FileNameList(names))
            }
            CommandHeader::Upload { filename, len } => self.upload(&filename, len),
            CommandHeader::Download { filename } => self.download(&filename),
        }
    }

    fn upload(&mut self, filename: &str, len: u64) -> Result<()> {
        let rejection = match share::validate_filename(filename) {
            Err(e) => Some(e),
            Ok(()) if len > self.max_upload_size => Some(ShareError::PayloadTooLarge {
                size: len,
                max: self.max_upload_size,
            }),
            Ok(()) => None,
        };

        if let Some(e) = rejection {
            tracing::warn!("Rejected upload of {:?} from {}: {}", filename, self.peer_addr, e);
            self.discard_payload(len)?;
            return self.send_response(&Response::from_error(&e));
        }

        let dir = Arc::clone(&self.shared_dir);
        let mut payload = (&mut self.reader).take(len);
        let result = share::write_file(&dir, filename, &mut payload, len);
        let unread = payload.limit();

        let response = match result {
            Ok(written) => {
                tracing::info!("Stored {} ({} bytes) from {}", filename, written, self.peer_addr);
                Response::Empty
            }
            Err(e) => {
                tracing::warn!("Upload of {} from {} failed: {}", filename, self.peer_addr, e);
                self.discard_payload(unread)?;
                Response::from_error(&e)
            }
        };

        self.send_response(&response)
    }

    /// Consume an upload payload the server will not store
    ///
    /// The client is still writing it; answering before it is read would
    /// make the close reset the connection and lose the response.
    fn discard_payload(&mut self, len: u64) -> Result<()> {
        if len == 0 {
            return Ok(());
        }

        let discarded = io::copy(&mut (&mut self.reader).take(len), &mut io::sink())?;
        if discarded < len {
            tracing::debug!(
                "Client {} sent {} of {} rejected payload bytes",
                self.peer_addr,
                discarded,
                len
            );
        }
        Ok(())
    }

    fn download(&mut self, filename: &str) -> Result<()> {
        let (file, len) = match share::open_file(&self.shared_dir, filename) {
            Ok(opened) => opened,
            Err(e) => {
                tracing::debug!("Download of {} by {} refused: {}", filename, self.peer_addr, e);
                return self.send_response(&Response::from_error(&e));
            }
        };

        write_response_header(&mut self.writer, Status::FileContent, len)?;
        let sent = io::copy(&mut file.take(len), &mut self.writer)?;
        self.writer.flush()?;

        if sent < len {
            return Err(ShareError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} shrank while sending: {} of {} bytes", filename, sent, len),
            )));
        }

        tracing::info!("Sent {} ({} bytes) to {}", filename, sent, self.peer_addr);
        Ok(())
    }

    /// Send a response to the client
    fn send_response(&mut self, response: &Response) -> Result<()> {
        write_response(&mut self.writer, response)
    }

    /// Flush, signal end of response, discard unread input, and shut down
    fn close(&mut self) {
        let _ = self.writer.flush();
        let _ = self.writer.get_ref().shutdown(Shutdown::Write);

        // Closing with unread input makes the kernel reset the connection,
        // which can destroy a response the client has not read yet
        let stream = self.reader.get_ref();
        let _ = stream.set_read_timeout(Some(DRAIN_TIMEOUT));
        let _ = io::copy(&mut (&mut self.reader).take(MAX_DRAIN_BYTES), &mut io::sink());

        let _ = self.reader.get_ref().shutdown(Shutdown::Both);
        tracing::debug!("Connection closed for {}", self.peer_addr);
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}
