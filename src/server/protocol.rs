// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Wire protocol: length-prefixed JSON frames.
//!
//! Every frame is a 4-byte big-endian length followed by that many bytes
//! of UTF-8 JSON. Requests arrive as [`Request`]; the server answers with
//! [`Response`] frames, and pushes [`Event`] frames to connections that
//! issued `StartListen`.

use crate::error::{FlowError, FlowResult};
use crate::record::{FieldValue, Record};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};

/// Client → server frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    Query(QueryEnvelope),
    StartListen(StartListen),
}

/// A query with its client-minted correlation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryEnvelope {
    pub request_id: String,
    pub query: Query,
}

/// The query family.
///
/// `column` on the search queries names the key column; the primary
/// index is the only index, so lookups always run against the table key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Query {
    InsertData {
        table: String,
        key: FieldValue,
        entry: Record,
    },
    FindOne {
        table: String,
        column: String,
        key: FieldValue,
    },
    LessThan {
        table: String,
        column: String,
        key: FieldValue,
    },
    GreaterThan {
        table: String,
        column: String,
        key: FieldValue,
    },
}

/// Subscription request: push events for one table to this connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartListen {
    pub table_name: String,
    pub event: EventKind,
}

/// Change kinds a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Insert,
    Delete,
}

/// Server → client frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    QueryResult {
        request_id: String,
        rows: Vec<ResultRow>,
    },
    Error {
        request_id: Option<String>,
        message: String,
    },
    Event(Event),
}

/// One row of a query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    pub key: FieldValue,
    pub entry: Record,
}

/// A change notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub table_name: String,
    pub event: EventKind,
    pub value: Record,
}

/// Upper bound on a frame payload. A length prefix beyond this is a
/// broken or hostile peer, not a query.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Read one frame. `Ok(None)` means the peer closed the connection
/// cleanly at a frame boundary.
pub fn read_frame<R: Read>(reader: &mut R) -> FlowResult<Option<Vec<u8>>> {
    let mut length_bytes = [0u8; 4];
    match reader.read_exact(&mut length_bytes) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(io_error(e)),
    }

    let length = u32::from_be_bytes(length_bytes) as usize;
    if length > MAX_FRAME_SIZE {
        return Err(FlowError::DeserializationError {
            reason: format!("frame of {} bytes exceeds the limit", length),
        });
    }
    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).map_err(io_error)?;
    Ok(Some(payload))
}

/// Write one frame.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> FlowResult<()> {
    writer
        .write_all(&(payload.len() as u32).to_be_bytes())
        .map_err(io_error)?;
    writer.write_all(payload).map_err(io_error)?;
    writer.flush().map_err(io_error)?;
    Ok(())
}

/// Serialise and send a response frame.
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> FlowResult<()> {
    let payload = serde_json::to_vec(response).map_err(|e| FlowError::SerializationError {
        reason: e.to_string(),
    })?;
    write_frame(writer, &payload)
}

fn io_error(e: std::io::Error) -> FlowError {
    FlowError::IoError {
        operation: "frame".to_string(),
        reason: e.to_string(),
    }
}
