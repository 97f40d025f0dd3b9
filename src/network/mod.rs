//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One handler thread per accepted connection
//! - One command per connection, closed after the response
//! - Client opens a fresh connection for every request

mod server;
mod connection;
mod client;

pub use server::{start_listening, Server, ServerHandle, ServerState};
pub use connection::Connection;
pub use client::{send_request, Client};
