//! TCP Server
//!
//! Accepts connections and hands each one to its own handler thread.
//!
//! ## Lifecycle
//! ```text
//! Created ──listen()──▶ Listening ──close()──▶ Closed
//!    │
//!    └──bind fails──▶ Failed
//! ```

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{Result, ShareError};
use crate::share::SharedLocation;
use super::Connection;

/// Pause after a failed accept so a persistent error does not spin
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// How long close() waits for its wake-up connection
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Listener lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Listening,
    Closed,
    Failed,
}

/// TCP server for one shared directory
pub struct Server {
    config: Config,

    /// Directory handed (as a snapshot) to each new connection
    location: SharedLocation,

    state: Mutex<ServerState>,

    /// Listening socket, present only while Listening
    listener: Mutex<Option<Arc<TcpListener>>>,

    /// Bound address, kept after close for the wake-up connection
    local_addr: Mutex<Option<SocketAddr>>,

    shutdown: AtomicBool,

    /// Handlers currently running
    active: Arc<AtomicUsize>,
}

impl Server {
    /// Create a new server serving `config.shared_dir`
    pub fn new(config: Config) -> Self {
        let location = SharedLocation::new(config.shared_dir.clone());
        Self::with_location(config, location)
    }

    /// Create a new server whose directory is controlled by `location`
    pub fn with_location(config: Config, location: SharedLocation) -> Self {
        Self {
            config,
            location,
            state: Mutex::new(ServerState::Created),
            listener: Mutex::new(None),
            local_addr: Mutex::new(None),
            shutdown: AtomicBool::new(false),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Bind the configured address
    ///
    /// A bind failure moves the server to `Failed` for good.
    pub fn listen(&self) -> Result<SocketAddr> {
        let mut state = self.state.lock();
        match *state {
            ServerState::Created => {}
            ServerState::Listening => {
                return Err(ShareError::Config("server is already listening".to_string()))
            }
            ServerState::Closed | ServerState::Failed => {
                return Err(ShareError::Config("server cannot be restarted".to_string()))
            }
        }

        let listener = match TcpListener::bind(&self.config.listen_addr) {
            Ok(listener) => listener,
            Err(source) => {
                *state = ServerState::Failed;
                tracing::error!("Failed to bind {}: {}", self.config.listen_addr, source);
                return Err(ShareError::Bind {
                    addr: self.config.listen_addr.clone(),
                    source,
                });
            }
        };

        let addr = listener.local_addr()?;
        *self.listener.lock() = Some(Arc::new(listener));
        *self.local_addr.lock() = Some(addr);
        *state = ServerState::Listening;

        tracing::info!(
            "Listening on {} sharing {}",
            addr,
            self.location.snapshot().display()
        );
        Ok(addr)
    }

    /// Run the accept loop (blocking) until `close()` is called
    ///
    /// Each accepted connection is handled on its own thread; the loop
    /// never waits for a handler. Accept errors are logged and skipped.
    pub fn run(&self) -> Result<()> {
        // Release the listener lock before taking the state lock
        let listener = self.listener.lock().clone();
        let listener = match listener {
            Some(listener) => listener,
            None => {
                return match *self.state.lock() {
                    ServerState::Closed => Ok(()),
                    _ => Err(ShareError::Config("run() called before listen()".to_string())),
                }
            }
        };

        for stream in listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            match stream {
                Ok(stream) => self.spawn_handler(stream),
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_BACKOFF);
                }
            }
        }

        drop(listener);
        *self.state.lock() = ServerState::Closed;
        tracing::info!("Accept loop stopped");
        Ok(())
    }

    fn spawn_handler(&self, stream: TcpStream) {
        let shared_dir = self.location.snapshot();
        let max_upload_size = self.config.max_upload_size;
        let read_timeout_ms = self.config.read_timeout_ms;
        let write_timeout_ms = self.config.write_timeout_ms;
        let guard = ActiveGuard::new(Arc::clone(&self.active));

        let spawned = thread::Builder::new()
            .name("fileshare-conn".to_string())
            .spawn(move || {
                let _guard = guard;
                let mut conn = match Connection::new(stream, shared_dir, max_upload_size) {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!("Could not set up connection: {}", e);
                        return;
                    }
                };
                let peer = conn.peer_addr().to_string();

                if let Err(e) = conn.set_timeouts(read_timeout_ms, write_timeout_ms) {
                    tracing::warn!("Could not set timeouts for {}: {}", peer, e);
                    return;
                }
                if let Err(e) = conn.handle() {
                    tracing::warn!("Connection from {} failed: {}", peer, e);
                }
            });

        if let Err(e) = spawned {
            tracing::warn!("Could not spawn connection handler: {}", e);
        }
    }

    /// Stop accepting connections
    ///
    /// Wakes a blocked `run()`, which then drops the listening socket.
    /// In-flight handlers keep running. Calling it again is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        match *state {
            ServerState::Listening => {}
            ServerState::Created => {
                *state = ServerState::Closed;
                return Ok(());
            }
            ServerState::Closed | ServerState::Failed => return Ok(()),
        }

        self.shutdown.store(true, Ordering::SeqCst);
        let listener = self.listener.lock().take();
        *state = ServerState::Closed;
        drop(state);

        // accept() has no cancellation; a throwaway connection unblocks it
        if let Some(addr) = *self.local_addr.lock() {
            let _ = TcpStream::connect_timeout(&wake_addr(addr), WAKE_TIMEOUT);
        }
        drop(listener);

        tracing::info!("Server closed");
        Ok(())
    }

    pub fn state(&self) -> ServerState {
        *self.state.lock()
    }

    /// Address the listener is (or was) bound to
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// Handle used to reconfigure the shared directory
    pub fn location(&self) -> SharedLocation {
        self.location.clone()
    }

    /// Number of connection handlers currently running
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Counts a running handler for as long as it lives
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Loopback equivalent of a wildcard bind address
fn wake_addr(addr: SocketAddr) -> SocketAddr {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, addr.port())
}

// =============================================================================
// Process lifecycle
// =============================================================================

/// A server listening on a background thread
///
/// Dropping the handle stops the server.
pub struct ServerHandle {
    server: Arc<Server>,
    local_addr: SocketAddr,
    accept_thread: Option<JoinHandle<Result<()>>>,
}

/// Bind `config.listen_addr` and start accepting on a background thread
///
/// Bind failures are returned here rather than from the background thread.
pub fn start_listening(config: Config) -> Result<ServerHandle> {
    let server = Arc::new(Server::new(config));
    let local_addr = server.listen()?;

    let runner = Arc::clone(&server);
    let accept_thread = thread::Builder::new()
        .name("fileshare-accept".to_string())
        .spawn(move || runner.run())?;

    Ok(ServerHandle {
        server,
        local_addr,
        accept_thread: Some(accept_thread),
    })
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }

    /// Handle used to reconfigure the shared directory
    pub fn location(&self) -> SharedLocation {
        self.server.location()
    }

    /// Stop listening and wait for the accept loop to exit
    ///
    /// Connections already being handled run to completion on their own.
    pub fn stop(mut self) -> Result<()> {
        self.stop_inner()
    }

    /// Block until the accept loop exits
    pub fn join(mut self) -> Result<()> {
        self.join_inner()
    }

    fn stop_inner(&mut self) -> Result<()> {
        self.server.close()?;
        self.join_inner()
    }

    fn join_inner(&mut self) -> Result<()> {
        match self.accept_thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| ShareError::Connection("accept thread panicked".to_string()))?,
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop_inner() {
            tracing::warn!("Error stopping server: {}", e);
        }
    }
}
