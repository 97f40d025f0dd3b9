//! Tests for the client request executor
//!
//! These tests verify:
//! - Empty requests never open a connection
//! - Socket failures surface as errors, not empty results
//! - Byte-exact upload/download round trips
//! - Typed errors for failure responses

use std::fs;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use fileshare::protocol::{decode_response, Command, Response};
use fileshare::{send_request, start_listening, Client, Config, ServerHandle, ShareError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn start_server(dir: &Path) -> ServerHandle {
    let config = Config::builder()
        .shared_dir(dir)
        .listen_addr("127.0.0.1:0")
        .build();
    start_listening(config).unwrap()
}

fn client_for(handle: &ServerHandle) -> Client {
    Client::new(handle.local_addr().to_string())
}

/// An address nothing is listening on
fn unused_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

// =============================================================================
// Connection Tests
// =============================================================================

#[test]
fn test_empty_request_does_not_connect() {
    let client = Client::new(unused_addr());
    assert_eq!(client.send_raw(&[]).unwrap(), Vec::<u8>::new());
}

#[test]
fn test_connection_refused_is_an_error() {
    let client = Client::new(unused_addr()).connect_timeout(Some(Duration::from_secs(1)));

    let result = client.list();
    assert!(matches!(result, Err(ShareError::Connection(_))));
}

#[test]
fn test_unresolvable_address_is_an_error() {
    let client = Client::new("not a socket address");
    assert!(matches!(client.list(), Err(ShareError::Connection(_))));
}

#[test]
fn test_with_host_formats_addresses() {
    assert_eq!(Client::with_host("127.0.0.1", 15421).addr(), "127.0.0.1:15421");
    assert_eq!(Client::with_host("::1", 15421).addr(), "[::1]:15421");
}

#[test]
fn test_send_request_returns_raw_response() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("only.txt"), b"1").unwrap();
    let handle = start_server(temp.path());
    let addr = handle.local_addr();

    let bytes = send_request(&Command::List, &addr.ip().to_string(), addr.port()).unwrap();
    assert_eq!(
        decode_response(&bytes).unwrap(),
        Response::FileNameList(vec!["only.txt".to_string()])
    );
}

// =============================================================================
// Operation Tests
// =============================================================================

#[test]
fn test_list_empty_directory_is_not_a_failure() {
    let temp = TempDir::new().unwrap();
    let handle = start_server(temp.path());

    assert_eq!(client_for(&handle).list().unwrap(), Vec::<String>::new());
}

#[test]
fn test_list_missing_directory_is_empty() {
    let temp = TempDir::new().unwrap();
    let handle = start_server(&temp.path().join("gone"));

    assert!(client_for(&handle).list().unwrap().is_empty());
}

#[test]
fn test_round_trip_all_byte_values() {
    let temp = TempDir::new().unwrap();
    let handle = start_server(temp.path());
    let client = client_for(&handle);

    let content: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    client.upload("bytes.bin", content.clone()).unwrap();

    assert_eq!(client.download("bytes.bin").unwrap(), content);
    assert_eq!(fs::read(temp.path().join("bytes.bin")).unwrap(), content);
}

#[test]
fn test_round_trip_line_endings_and_nuls() {
    let temp = TempDir::new().unwrap();
    let handle = start_server(temp.path());
    let client = client_for(&handle);

    let content = b"\r\n\n\0first\r\nsecond\n\n\0\r".to_vec();
    client.upload("lines.txt", content.clone()).unwrap();

    assert_eq!(client.download("lines.txt").unwrap(), content);
}

#[test]
fn test_round_trip_empty_file() {
    let temp = TempDir::new().unwrap();
    let handle = start_server(temp.path());
    let client = client_for(&handle);

    client.upload("empty.txt", Vec::new()).unwrap();
    assert!(client.download("empty.txt").unwrap().is_empty());
}

#[test]
fn test_round_trip_large_file() {
    let temp = TempDir::new().unwrap();
    let handle = start_server(temp.path());
    let client = client_for(&handle);

    let content: Vec<u8> = (0..2 * 1024 * 1024u32).map(|i| (i.wrapping_mul(31) >> 3) as u8).collect();
    client.upload("large.bin", content.clone()).unwrap();

    assert_eq!(client.download("large.bin").unwrap(), content);
}

#[test]
fn test_upload_twice_overwrites() {
    let temp = TempDir::new().unwrap();
    let handle = start_server(temp.path());
    let client = client_for(&handle);

    client.upload("report.txt", b"first payload that is longer".to_vec()).unwrap();
    client.upload("report.txt", b"second".to_vec()).unwrap();

    assert_eq!(client.download("report.txt").unwrap(), b"second");
    assert_eq!(client.list().unwrap(), vec!["report.txt".to_string()]);
}

#[test]
fn test_download_missing_is_not_found() {
    let temp = TempDir::new().unwrap();
    let handle = start_server(temp.path());

    let result = client_for(&handle).download("nonexistent.txt");
    assert!(matches!(result, Err(ShareError::NotFound(ref name)) if name == "nonexistent.txt"));
}

#[test]
fn test_download_escape_is_rejected() {
    let temp = TempDir::new().unwrap();
    let handle = start_server(temp.path());

    let result = client_for(&handle).download("../Cargo.toml");
    assert!(matches!(result, Err(ShareError::PathEscape(_))));
}

#[test]
fn test_upload_escape_is_rejected() {
    let temp = TempDir::new().unwrap();
    let handle = start_server(temp.path());

    let result = client_for(&handle).upload("../outside.txt", b"x".to_vec());
    assert!(matches!(result, Err(ShareError::PathEscape(_))));
}

// =============================================================================
// Local File Helpers
// =============================================================================

#[test]
fn test_upload_file_and_download_to() {
    let remote = TempDir::new().unwrap();
    let local = TempDir::new().unwrap();
    let saved = TempDir::new().unwrap();
    let handle = start_server(remote.path());
    let client = client_for(&handle);

    let source = local.path().join("photo.raw");
    fs::write(&source, [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();

    assert_eq!(client.upload_file(&source).unwrap(), "photo.raw");

    let path = client.download_to(saved.path(), "photo.raw").unwrap();
    assert_eq!(path, saved.path().join("photo.raw"));
    assert_eq!(fs::read(path).unwrap(), fs::read(&source).unwrap());
}

#[test]
fn test_upload_file_missing_local_file() {
    let local = TempDir::new().unwrap();
    let client = Client::new(unused_addr());

    let result = client.upload_file(&local.path().join("absent.txt"));
    assert!(matches!(result, Err(ShareError::Io(_))));
}

#[test]
fn test_download_to_missing_leaves_no_file() {
    let remote = TempDir::new().unwrap();
    let saved = TempDir::new().unwrap();
    let handle = start_server(remote.path());

    let result = client_for(&handle).download_to(saved.path(), "ghost.txt");
    assert!(matches!(result, Err(ShareError::NotFound(_))));
    assert!(!saved.path().join("ghost.txt").exists());
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_uploads_never_expose_torn_files() {
    let temp = TempDir::new().unwrap();
    let handle = start_server(temp.path());
    let client = client_for(&handle);

    let first: Vec<u8> = vec![0xAA; 256 * 1024];
    let second: Vec<u8> = (0..300 * 1024u32).map(|i| (i % 251) as u8).collect();
    client.upload("shared.bin", first.clone()).unwrap();

    crossbeam::thread::scope(|s| {
        for writer in 0..2 {
            let client = client.clone();
            let payload = if writer == 0 { first.clone() } else { second.clone() };
            s.spawn(move |_| {
                for _ in 0..20 {
                    client.upload("shared.bin", payload.clone()).unwrap();
                }
            });
        }

        for _ in 0..4 {
            let client = client.clone();
            let (first, second) = (&first, &second);
            s.spawn(move |_| {
                for _ in 0..20 {
                    let content = client.download("shared.bin").unwrap();
                    assert!(
                        content == *first || content == *second,
                        "download returned a torn file of {} bytes",
                        content.len()
                    );
                }
            });
        }
    })
    .unwrap();

    // Only the target remains; no staging files leak into the listing
    assert_eq!(client.list().unwrap(), vec!["shared.bin".to_string()]);
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}
