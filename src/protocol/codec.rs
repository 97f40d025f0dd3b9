//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! Slice functions (`encode_*`/`decode_*`) work on complete frames. Stream
//! functions (`read_*`/`write_*`) work on sockets; `read_command_header`
//! stops before the upload payload so it can be copied straight to disk.

use std::io::{self, Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, ShareError};
use super::{Command, CommandHeader, CommandType, FailureKind, Response, Status};

/// Command tag size
pub const TAG_SIZE: usize = 4;

/// Response header size: 1 byte status + 8 bytes length
pub const RESPONSE_HEADER_SIZE: usize = 9;

/// Maximum filename length in bytes
pub const MAX_FILENAME_LEN: usize = 4096;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
pub fn encode_command(command: &Command) -> Vec<u8> {
    let tag = command.command_type().tag();

    match command {
        Command::List => tag.to_vec(),
        Command::Upload { filename, content } => {
            let mut buf = BytesMut::with_capacity(TAG_SIZE + 12 + filename.len() + content.len());
            buf.put_slice(&tag);
            put_filename(&mut buf, filename);
            buf.put_u64(content.len() as u64);
            buf.put_slice(content);
            buf.to_vec()
        }
        Command::Download { filename } => {
            let mut buf = BytesMut::with_capacity(TAG_SIZE + 12 + filename.len());
            buf.put_slice(&tag);
            put_filename(&mut buf, filename);
            buf.put_u64(0);
            buf.to_vec()
        }
    }
}

fn put_filename(buf: &mut BytesMut, filename: &str) {
    buf.put_u32(filename.len() as u32);
    buf.put_slice(filename.as_bytes());
}

/// Decode a command from one complete frame
///
/// Trailing bytes after the frame are rejected.
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let mut buf = bytes;

    if buf.remaining() < TAG_SIZE {
        return Err(malformed(format!(
            "Incomplete tag: expected {} bytes, got {}",
            TAG_SIZE,
            buf.remaining()
        )));
    }
    let mut tag = [0u8; TAG_SIZE];
    buf.copy_to_slice(&mut tag);

    let command = match parse_tag(tag)? {
        CommandType::List => Command::List,
        CommandType::Upload => {
            let filename = take_filename(&mut buf)?;
            let len = take_payload_len(&mut buf)?;
            if (buf.remaining() as u64) < len {
                return Err(malformed(format!(
                    "UPLOAD command: incomplete payload (expected {}, got {})",
                    len,
                    buf.remaining()
                )));
            }
            let content = buf[..len as usize].to_vec();
            buf.advance(len as usize);
            Command::Upload { filename, content }
        }
        CommandType::Download => {
            let filename = take_filename(&mut buf)?;
            let len = take_payload_len(&mut buf)?;
            check_download_len(len)?;
            Command::Download { filename }
        }
    };

    if buf.has_remaining() {
        return Err(malformed(format!(
            "{} trailing bytes after command",
            buf.remaining()
        )));
    }

    Ok(command)
}

fn take_filename(buf: &mut &[u8]) -> Result<String> {
    if buf.remaining() < 4 {
        return Err(malformed("missing filename length".to_string()));
    }
    let len = buf.get_u32() as usize;
    check_filename_len(len)?;

    if buf.remaining() < len {
        return Err(malformed(format!(
            "incomplete filename (expected {}, got {})",
            len,
            buf.remaining()
        )));
    }
    let raw = buf[..len].to_vec();
    buf.advance(len);

    filename_from_bytes(raw)
}

fn take_payload_len(buf: &mut &[u8]) -> Result<u64> {
    if buf.remaining() < 8 {
        return Err(malformed("missing payload length".to_string()));
    }
    Ok(buf.get_u64())
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (8) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response_payload(response);

    let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_SIZE + payload.len());
    buf.put_u8(response.status() as u8);
    buf.put_u64(payload.len() as u64);
    buf.put_slice(&payload);

    buf.to_vec()
}

fn response_payload(response: &Response) -> Vec<u8> {
    match response {
        Response::Empty => Vec::new(),
        Response::FileContent(content) => content.clone(),
        Response::FileNameList(names) => {
            let size = 4 + names.iter().map(|n| 4 + n.len()).sum::<usize>();
            let mut buf = BytesMut::with_capacity(size);
            buf.put_u32(names.len() as u32);
            for name in names {
                buf.put_u32(name.len() as u32);
                buf.put_slice(name.as_bytes());
            }
            buf.to_vec()
        }
        Response::Failure { kind, message } => {
            let mut buf = BytesMut::with_capacity(1 + message.len());
            buf.put_u8(*kind as u8);
            buf.put_slice(message.as_bytes());
            buf.to_vec()
        }
    }
}

/// Decode a response from one complete frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let mut buf = bytes;

    if buf.remaining() < RESPONSE_HEADER_SIZE {
        return Err(ShareError::Protocol(format!(
            "Incomplete response header: expected {} bytes, got {}",
            RESPONSE_HEADER_SIZE,
            buf.remaining()
        )));
    }

    let status_byte = buf.get_u8();
    let payload_len = buf.get_u64();

    if buf.remaining() as u64 != payload_len {
        return Err(ShareError::Protocol(format!(
            "Response payload length mismatch: header says {}, got {}",
            payload_len,
            buf.remaining()
        )));
    }

    decode_payload(status_byte, buf.to_vec())
}

fn decode_payload(status_byte: u8, payload: Vec<u8>) -> Result<Response> {
    let status = Status::from_u8(status_byte).ok_or_else(|| {
        ShareError::Protocol(format!("Unknown response status: 0x{:02x}", status_byte))
    })?;

    match status {
        Status::Empty => {
            if !payload.is_empty() {
                return Err(ShareError::Protocol(format!(
                    "EMPTY response: unexpected payload of {} bytes",
                    payload.len()
                )));
            }
            Ok(Response::Empty)
        }
        Status::FileContent => Ok(Response::FileContent(payload)),
        Status::FileNameList => decode_name_list(&payload).map(Response::FileNameList),
        Status::Failure => {
            let mut buf = payload.as_slice();
            if !buf.has_remaining() {
                return Err(ShareError::Protocol("FAILURE response: missing kind".to_string()));
            }
            let kind_byte = buf.get_u8();
            let kind = FailureKind::from_u8(kind_byte).ok_or_else(|| {
                ShareError::Protocol(format!("Unknown failure kind: 0x{:02x}", kind_byte))
            })?;
            let message = String::from_utf8_lossy(buf).into_owned();
            Ok(Response::Failure { kind, message })
        }
    }
}

fn decode_name_list(payload: &[u8]) -> Result<Vec<String>> {
    let mut buf = payload;

    if buf.remaining() < 4 {
        return Err(ShareError::Protocol("FILE_LIST response: missing count".to_string()));
    }
    let count = buf.get_u32() as usize;

    // Every name costs at least its 4-byte length
    if count > buf.remaining() / 4 {
        return Err(ShareError::Protocol(format!(
            "FILE_LIST response: {} names cannot fit in {} bytes",
            count,
            buf.remaining()
        )));
    }

    let mut names = Vec::with_capacity(count);
    for _ in 0..count {
        if buf.remaining() < 4 {
            return Err(ShareError::Protocol("FILE_LIST response: truncated".to_string()));
        }
        let len = buf.get_u32() as usize;
        if buf.remaining() < len {
            return Err(ShareError::Protocol("FILE_LIST response: truncated name".to_string()));
        }
        let name = String::from_utf8(buf[..len].to_vec()).map_err(|_| {
            ShareError::Protocol("FILE_LIST response: name is not UTF-8".to_string())
        })?;
        buf.advance(len);
        names.push(name);
    }

    if buf.has_remaining() {
        return Err(ShareError::Protocol(format!(
            "FILE_LIST response: {} trailing bytes",
            buf.remaining()
        )));
    }

    Ok(names)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a command up to (not including) its upload payload
///
/// A stream that ends before a complete header is a malformed command.
pub fn read_command_header<R: Read>(reader: &mut R) -> Result<CommandHeader> {
    let mut tag = [0u8; TAG_SIZE];
    read_field(reader, &mut tag, "command tag")?;

    match parse_tag(tag)? {
        CommandType::List => Ok(CommandHeader::List),
        CommandType::Upload => {
            let filename = read_filename(reader)?;
            let len = read_payload_len(reader)?;
            Ok(CommandHeader::Upload { filename, len })
        }
        CommandType::Download => {
            let filename = read_filename(reader)?;
            let len = read_payload_len(reader)?;
            check_download_len(len)?;
            Ok(CommandHeader::Download { filename })
        }
    }
}

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    match read_command_header(reader)? {
        CommandHeader::List => Ok(Command::List),
        CommandHeader::Download { filename } => Ok(Command::Download { filename }),
        CommandHeader::Upload { filename, len } => {
            let mut content = Vec::new();
            reader.take(len).read_to_end(&mut content)?;
            if (content.len() as u64) < len {
                return Err(malformed(format!(
                    "UPLOAD command: incomplete payload (expected {}, got {})",
                    len,
                    content.len()
                )));
            }
            Ok(Command::Upload { filename, content })
        }
    }
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let mut header = [0u8; RESPONSE_HEADER_SIZE];
    if let Err(e) = reader.read_exact(&mut header) {
        return Err(match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                ShareError::Protocol("Connection closed before response header".to_string())
            }
            _ => e.into(),
        });
    }

    let mut head = &header[..];
    let status_byte = head.get_u8();
    let payload_len = head.get_u64();

    // Grow with the data actually received rather than trusting the header
    let mut payload = Vec::new();
    reader.take(payload_len).read_to_end(&mut payload)?;
    if (payload.len() as u64) < payload_len {
        return Err(ShareError::Protocol(format!(
            "Incomplete response payload: expected {} bytes, got {}",
            payload_len,
            payload.len()
        )));
    }

    decode_payload(status_byte, payload)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Write only a response header; the caller streams `len` payload bytes after it
pub fn write_response_header<W: Write>(writer: &mut W, status: Status, len: u64) -> Result<()> {
    let mut header = [0u8; RESPONSE_HEADER_SIZE];
    let mut buf = &mut header[..];
    buf.put_u8(status as u8);
    buf.put_u64(len);
    writer.write_all(&header)?;
    Ok(())
}

fn read_field<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => malformed(format!("connection closed before {}", what)),
        _ => e.into(),
    })
}

fn read_filename<R: Read>(reader: &mut R) -> Result<String> {
    let mut len_bytes = [0u8; 4];
    read_field(reader, &mut len_bytes, "filename length")?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    check_filename_len(len)?;

    let mut raw = vec![0u8; len];
    read_field(reader, &mut raw, "filename")?;
    filename_from_bytes(raw)
}

fn read_payload_len<R: Read>(reader: &mut R) -> Result<u64> {
    let mut len_bytes = [0u8; 8];
    read_field(reader, &mut len_bytes, "payload length")?;
    Ok(u64::from_be_bytes(len_bytes))
}

// =============================================================================
// Shared validation
// =============================================================================

fn parse_tag(tag: [u8; TAG_SIZE]) -> Result<CommandType> {
    CommandType::from_tag(tag).ok_or_else(|| {
        malformed(format!("Unknown command tag: {:?}", String::from_utf8_lossy(&tag)))
    })
}

fn check_filename_len(len: usize) -> Result<()> {
    if len > MAX_FILENAME_LEN {
        return Err(malformed(format!(
            "Filename too long: {} bytes (max {})",
            len, MAX_FILENAME_LEN
        )));
    }
    Ok(())
}

fn check_download_len(len: u64) -> Result<()> {
    if len != 0 {
        return Err(malformed(format!(
            "DOWNLOAD command: unexpected payload of {} bytes",
            len
        )));
    }
    Ok(())
}

fn filename_from_bytes(raw: Vec<u8>) -> Result<String> {
    String::from_utf8(raw).map_err(|_| malformed("filename is not valid UTF-8".to_string()))
}

fn malformed(message: String) -> ShareError {
    ShareError::MalformedCommand(message)
}
