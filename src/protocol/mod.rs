//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! Every connection carries exactly one command and one response. All
//! integers are big-endian and every variable-length field is length
//! prefixed, so file content travels byte-exact.
//!
//! ### Command Format
//! ```text
//! LIST:         ┌─────────┐
//!               │ Tag (4) │
//!               └─────────┘
//! UPLD / DNLD:  ┌─────────┬─────────────┬──────────┬────────────┬─────────┐
//!               │ Tag (4) │ NameLen (4) │   Name   │ DataLen (8)│  Data   │
//!               └─────────┴─────────────┴──────────┴────────────┴─────────┘
//! ```
//!
//! ### Command Tags
//! - `LIST`: list the shared directory
//! - `UPLD`: store Data as Name
//! - `DNLD`: fetch Name (DataLen is 0)
//!
//! ### Response Format
//! ```text
//! ┌───────────┬─────────────┬─────────────────────────────┐
//! │Status (1) │ Len (8)     │         Payload             │
//! └───────────┴─────────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: EMPTY      - upload acknowledged
//! - 0x01: FILE_LIST  - Payload: count (4) + (len (4) + name)*
//! - 0x02: CONTENT    - Payload: raw file bytes
//! - 0x03: FAILURE    - Payload: kind (1) + message

mod command;
mod response;
mod codec;

pub use command::{Command, CommandHeader, CommandType};
pub use response::{FailureKind, Response, Status};
pub use codec::{
    encode_command, decode_command, encode_response, decode_response,
    read_command, read_command_header, write_command,
    read_response, write_response, write_response_header,
    TAG_SIZE, RESPONSE_HEADER_SIZE, MAX_FILENAME_LEN,
};
