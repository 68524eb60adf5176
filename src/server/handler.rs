// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Per-connection request handling.
//!
//! Reads are serviced in-line under the shared lock. Inserts are
//! acknowledged immediately and applied by the storage worker in accepted
//! order, so within one connection the client's request order is
//! preserved.

use crate::error::FlowResult;
use crate::server::protocol::{
    self, Query, QueryEnvelope, Request, Response, ResultRow, StartListen,
};
use crate::server::{QueuedInsert, Shared};
use std::net::TcpStream;
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// Service one connection until it closes or a frame error occurs.
pub fn handle_connection(mut stream: TcpStream, shared: Arc<Shared>, queue: Sender<QueuedInsert>) {
    loop {
        let payload = match protocol::read_frame(&mut stream) {
            Ok(Some(payload)) => payload,
            Ok(None) => break,
            Err(_) => break,
        };

        let request: Request = match serde_json::from_slice(&payload) {
            Ok(request) => request,
            Err(e) => {
                let response = Response::Error {
                    request_id: None,
                    message: format!("malformed request: {}", e),
                };
                if protocol::write_response(&mut stream, &response).is_err() {
                    break;
                }
                continue;
            }
        };

        match request {
            Request::Query(envelope) => {
                let response = execute_query(&shared, &queue, envelope);
                if protocol::write_response(&mut stream, &response).is_err() {
                    break;
                }
            }
            Request::StartListen(listen) => {
                if !register_listener(&shared, &listen, &stream) {
                    break;
                }
            }
        }
    }
}

/// Run one query and build its response.
fn execute_query(shared: &Shared, queue: &Sender<QueuedInsert>, envelope: QueryEnvelope) -> Response {
    let request_id = envelope.request_id;
    let result = match envelope.query {
        Query::InsertData { table, key, entry } => {
            // Accepted, not yet applied: the storage worker owns writes.
            match queue.send(QueuedInsert { table, key, entry }) {
                Ok(()) => Ok(Vec::new()),
                Err(e) => Err(crate::error::FlowError::IoError {
                    operation: "enqueue_insert".to_string(),
                    reason: e.to_string(),
                }),
            }
        }
        Query::FindOne { table, key, .. } => find_one(shared, &table, key),
        Query::LessThan { table, key, .. } => search(shared, &table, key, false),
        Query::GreaterThan { table, key, .. } => search(shared, &table, key, true),
    };

    match result {
        Ok(rows) => Response::QueryResult { request_id, rows },
        Err(e) => Response::Error {
            request_id: Some(request_id),
            message: e.to_string(),
        },
    }
}

fn find_one(
    shared: &Shared,
    table: &str,
    key: crate::record::FieldValue,
) -> FlowResult<Vec<ResultRow>> {
    let datastore = shared
        .datastore()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let row = datastore.get_data(table, &key)?;
    Ok(row
        .map(|entry| ResultRow { key, entry })
        .into_iter()
        .collect())
}

fn search(
    shared: &Shared,
    table: &str,
    key: crate::record::FieldValue,
    greater: bool,
) -> FlowResult<Vec<ResultRow>> {
    let datastore = shared
        .datastore()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let table = datastore.get_table(table)?;
    let rows = if greater {
        table.search_greater_than(&key, false)?
    } else {
        table.search_less_than(&key, false)?
    };
    Ok(rows
        .into_iter()
        .map(|(key, entry)| ResultRow { key, entry })
        .collect())
}

/// Register a listener; the subscription keeps a clone of the stream.
fn register_listener(shared: &Shared, listen: &StartListen, stream: &TcpStream) -> bool {
    match stream.try_clone() {
        Ok(clone) => {
            shared.subscribe(listen, clone);
            true
        }
        Err(_) => false,
    }
}
