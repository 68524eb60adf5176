// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! TCP server for ReedFlow.
//!
//! ```text
//! ┌─────────────┐  frames   ┌──────────────────┐
//! │ connection  │──────────▶│ handler thread   │── reads (shared lock)
//! │ connection  │──────────▶│ handler thread   │── inserts → queue
//! └─────────────┘           └────────┬─────────┘
//!                                    │ mpsc
//!                           ┌────────▼─────────┐
//!                           │ storage worker   │── writes (exclusive lock)
//!                           │ (one thread)     │── drains event log
//!                           └────────┬─────────┘
//!                                    │ events
//!                           ┌────────▼─────────┐
//!                           │ subscribers      │◀─ StartListen connections
//!                           └──────────────────┘
//! ```
//!
//! One thread per connection services reads in-line under a shared lock.
//! All inserts flow through one background worker, so a mutation and its
//! entire cascade run under the exclusive lock before the next one
//! starts. Once an insert is accepted from the queue it runs to
//! completion; there is no cancellation and no timeout at this layer.

pub mod handler;
pub mod protocol;
pub mod worker;


// Re-export public API
pub use protocol::{
    Event, EventKind, Query, QueryEnvelope, Request, Response, ResultRow, StartListen,
};

use crate::datastore::{Datastore, Transaction, TransactionMethod};
use crate::error::{FlowError, FlowResult};
use crate::record::{FieldValue, Record};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;

/// An insert accepted from a client, waiting for the storage worker.
#[derive(Debug)]
pub struct QueuedInsert {
    pub table: String,
    pub key: FieldValue,
    pub entry: Record,
}

/// State shared by every connection thread and the storage worker.
#[derive(Debug)]
pub struct Shared {
    /// The process-wide datastore. Readers share; a writer excludes
    /// everything for the duration of its cascade.
    datastore: RwLock<Datastore>,

    /// Registered change listeners.
    subscribers: Mutex<Vec<Subscriber>>,
}

#[derive(Debug)]
struct Subscriber {
    table_name: String,
    event: EventKind,
    stream: TcpStream,
}

impl Shared {
    pub fn new(datastore: Datastore) -> Self {
        Self {
            datastore: RwLock::new(datastore),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Datastore handle for readers.
    pub fn datastore(&self) -> &RwLock<Datastore> {
        &self.datastore
    }

    /// Register a change listener for a table.
    pub fn subscribe(&self, listen: &StartListen, stream: TcpStream) {
        let mut subscribers = lock_unpoisoned(&self.subscribers);
        subscribers.push(Subscriber {
            table_name: listen.table_name.clone(),
            event: listen.event,
            stream,
        });
    }

    /// Push matching events to every subscriber, dropping the ones whose
    /// connection has gone away.
    pub fn publish(&self, events: &[Transaction]) {
        let mut subscribers = lock_unpoisoned(&self.subscribers);
        subscribers.retain_mut(|subscriber| {
            for transaction in events {
                if transaction.table != subscriber.table_name {
                    continue;
                }
                let kind = match transaction.method {
                    TransactionMethod::Add => EventKind::Insert,
                    TransactionMethod::Remove => EventKind::Delete,
                };
                if kind != subscriber.event {
                    continue;
                }

                let event = Response::Event(Event {
                    table_name: transaction.table.clone(),
                    event: kind,
                    value: transaction.value.clone().unwrap_or_default(),
                });
                if protocol::write_response(&mut subscriber.stream, &event).is_err() {
                    return false;
                }
            }
            true
        });
    }
}

/// The ReedFlow TCP server.
pub struct Server {
    listener: TcpListener,
    shared: Arc<Shared>,
    queue: Sender<QueuedInsert>,
}

impl Server {
    /// Bind an address and start the storage worker.
    ///
    /// ## Input
    /// - `addr`: listen address, e.g. `127.0.0.1:1108` (port 0 picks one)
    /// - `datastore`: the datastore to serve
    ///
    /// ## Output
    /// - `Ok(Server)`: listening; call [`Server::serve`] to accept
    /// - `Err(FlowError::IoError)`: bind failure
    pub fn bind(addr: &str, datastore: Datastore) -> FlowResult<Self> {
        let listener = TcpListener::bind(addr).map_err(|e| FlowError::IoError {
            operation: "bind".to_string(),
            reason: e.to_string(),
        })?;

        let shared = Arc::new(Shared::new(datastore));
        let (queue, receiver) = mpsc::channel();

        let worker_shared = Arc::clone(&shared);
        thread::spawn(move || worker::run(receiver, worker_shared));

        Ok(Self {
            listener,
            shared,
            queue,
        })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> FlowResult<SocketAddr> {
        self.listener.local_addr().map_err(|e| FlowError::IoError {
            operation: "local_addr".to_string(),
            reason: e.to_string(),
        })
    }

    /// Accept connections forever, one handler thread each.
    pub fn serve(&self) -> FlowResult<()> {
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    eprintln!("reedflow: accept failed: {}", e);
                    continue;
                }
            };
            if let Ok(peer) = stream.peer_addr() {
                println!("reedflow: connection from {}", peer);
            }

            let shared = Arc::clone(&self.shared);
            let queue = self.queue.clone();
            thread::spawn(move || handler::handle_connection(stream, shared, queue));
        }
        Ok(())
    }
}

/// Take a mutex, recovering from a poisoned peer: a handler that died
/// mid-publish must not wedge every other connection.
pub(crate) fn lock_unpoisoned<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
