// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The storage worker: the only writer.
//!
//! Drains the insert queue one transaction at a time. Each insert and its
//! full cascade run under the exclusive datastore lock, then the applied
//! events feed the subscribers. A failed cascade is reported and the
//! events it did apply are still published — there is no rollback.

use crate::server::{QueuedInsert, Shared};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Run until every queue sender is gone.
pub fn run(receiver: Receiver<QueuedInsert>, shared: Arc<Shared>) {
    while let Ok(insert) = receiver.recv() {
        let events = {
            let mut datastore = shared
                .datastore()
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Err(e) = datastore.add_data(&insert.table, insert.key, insert.entry) {
                eprintln!("reedflow: insert into {} failed: {}", insert.table, e);
            }
            datastore.drain_events()
        };
        shared.publish(&events);
    }
}
