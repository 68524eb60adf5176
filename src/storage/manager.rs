// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Block storage manager.
//!
//! A storage file is a concatenation of fixed-size blocks. Each block holds
//! a payload region followed by a big-endian next-pointer, so a logical
//! record is a chain of blocks identified by the block number of its head.
//!
//! ```text
//! ┌────────────────────────────┬──────────────┐
//! │ payload (500 bytes)        │ next (32 B)  │  block n
//! ├────────────────────────────┼──────────────┤
//! │ payload                    │ next         │  block n+1
//! └────────────────────────────┴──────────────┘
//! ```
//!
//! Block numbers are 1-based; 0 is the nil reference that terminates a
//! chain. Deallocated blocks are zeroed on disk and collected in an
//! in-memory min-heap so the lowest-numbered block is reused first,
//! keeping files compact. File handles are opened per operation; reads
//! take `&self` and may run concurrently under an outer shared lock.
//!
//! ## Known Boundary
//!
//! Short payload chunks are left-padded with zero bytes to fill the block,
//! and reads strip leading zeros from every payload segment. A record whose
//! final chunk begins with a zero byte therefore loses those bytes. Callers
//! store self-delimiting encodings whose chunks never start with zero.

use crate::error::{FlowError, FlowResult};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Payload bytes per block.
pub const BLOCK_DATA_SIZE: usize = 500;

/// Next-pointer bytes per block (big-endian unsigned integer).
pub const REFERENCE_SIZE: usize = 32;

/// Total block size on disk.
pub const BLOCK_SIZE: usize = BLOCK_DATA_SIZE + REFERENCE_SIZE;

/// Paged block storage over a single file.
///
/// The file is assumed to be exclusively owned by this process; the
/// datastore takes an advisory lock on its directory to enforce that.
/// Allocation state is in-memory only: the free list starts empty on open
/// and the high-water mark is derived from the file length.
#[derive(Debug)]
pub struct StorageManager {
    /// Path to the storage file.
    path: PathBuf,

    /// High-water mark: highest block number handed out by allocation.
    number_of_blocks: u64,

    /// Min-heap of deallocated block numbers, lowest first.
    free_list: BinaryHeap<Reverse<u64>>,
}

impl StorageManager {
    /// Open or create a storage file.
    ///
    /// ## Input
    /// - `path`: storage file location (created empty if missing)
    ///
    /// ## Output
    /// - `Ok(StorageManager)`: ready for block operations
    /// - `Err(FlowError::IoError)`: open or metadata failure
    ///
    /// ## Side Effects
    /// - Creates the file if it does not exist
    pub fn open<P: AsRef<Path>>(path: P) -> FlowResult<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| FlowError::IoError {
                operation: "open_storage".to_string(),
                reason: e.to_string(),
            })?;

        let len = file
            .metadata()
            .map_err(|e| FlowError::IoError {
                operation: "stat_storage".to_string(),
                reason: e.to_string(),
            })?
            .len();

        Ok(Self {
            path,
            number_of_blocks: len / BLOCK_SIZE as u64,
            free_list: BinaryHeap::new(),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Allocate a block number.
    ///
    /// Pops the minimum of the free list if one is available, otherwise
    /// bumps the high-water mark. Blocks handed out this way are not
    /// written until the caller does so.
    pub fn allocate_block(&mut self) -> u64 {
        if let Some(Reverse(block)) = self.free_list.pop() {
            block
        } else {
            self.number_of_blocks += 1;
            self.number_of_blocks
        }
    }

    /// Write a record, chunked across as many blocks as needed.
    ///
    /// ## Input
    /// - `data`: record bytes
    /// - `block`: explicit root block, or `None` to allocate a fresh one.
    ///   An explicit block currently on the free list is removed from it.
    ///
    /// ## Output
    /// - `Ok(u64)`: root block number of the written chain
    /// - `Err(FlowError::IoError)`: write failure (fatal for the record)
    ///
    /// ## Side Effects
    /// - Continuation blocks are allocated as the chunks are laid down;
    ///   every chunk except the last points at the next one, the last
    ///   carries the nil reference. Chunks shorter than the payload region
    ///   are left-padded with zeros.
    pub fn write_data(&mut self, data: &[u8], block: Option<u64>) -> FlowResult<u64> {
        let mut file = self.open_handle(true)?;

        let mut block = match block {
            Some(block) => {
                self.free_list.retain(|Reverse(b)| *b != block);
                block
            }
            None => self.allocate_block(),
        };

        let root_block = block;
        let mut chunks = data.chunks(BLOCK_DATA_SIZE).peekable();
        while let Some(chunk) = chunks.next() {
            let mut to_write = Vec::with_capacity(chunk.len() + REFERENCE_SIZE);
            to_write.extend_from_slice(chunk);
            if chunks.peek().is_some() {
                let next_block = self.allocate_block();
                to_write.extend_from_slice(&reference_bytes(next_block));
                write_block(&mut file, block, &to_write)?;
                block = next_block;
            } else {
                to_write.extend_from_slice(&[0u8; REFERENCE_SIZE]);
                write_block(&mut file, block, &to_write)?;
            }
        }
        if data.is_empty() {
            // A zero-length record still occupies its root block.
            write_block(&mut file, block, &[0u8; REFERENCE_SIZE])?;
        }

        Ok(root_block)
    }

    /// Read a record by following its chain from the root block.
    ///
    /// Strips leading zero bytes from each payload segment (the inverse of
    /// the left-padding applied on write) and stops at the nil reference.
    pub fn read_data(&self, root_block: u64) -> FlowResult<Vec<u8>> {
        let mut file = self.open_handle(false)?;

        let mut output = Vec::new();
        let mut block = root_block;
        loop {
            let raw = read_block(&mut file, block)?;
            let next = reference_value(&raw[BLOCK_DATA_SIZE..]);
            let payload = &raw[..BLOCK_DATA_SIZE];
            let start = payload.iter().position(|b| *b != 0).unwrap_or(payload.len());
            output.extend_from_slice(&payload[start..]);
            if next == 0 {
                break;
            }
            block = next;
        }
        Ok(output)
    }

    /// Delete a record chain, zeroing each block and adding it to the
    /// free list.
    pub fn delete_data(&mut self, root_block: u64) -> FlowResult<()> {
        let mut file = self.open_handle(true)?;

        let mut block = root_block;
        loop {
            let raw = read_block(&mut file, block)?;
            let next = reference_value(&raw[BLOCK_DATA_SIZE..]);
            self.free_list.push(Reverse(block));
            write_block(&mut file, block, &[])?;
            if next == 0 {
                break;
            }
            block = next;
        }
        Ok(())
    }

    /// Blocks currently on the free list, lowest first.
    pub fn free_blocks(&self) -> Vec<u64> {
        let mut blocks: Vec<u64> = self.free_list.iter().map(|Reverse(b)| *b).collect();
        blocks.sort_unstable();
        blocks
    }

    /// Current high-water mark.
    pub fn block_count(&self) -> u64 {
        self.number_of_blocks
    }

    /// Open a fresh handle on the storage file.
    fn open_handle(&self, writable: bool) -> FlowResult<File> {
        OpenOptions::new()
            .read(true)
            .write(writable)
            .open(&self.path)
            .map_err(|e| FlowError::IoError {
                operation: "open_storage".to_string(),
                reason: e.to_string(),
            })
    }
}

/// Write one block, left-padding short buffers to the full block size.
fn write_block(file: &mut File, block_number: u64, to_write: &[u8]) -> FlowResult<()> {
    file.seek(SeekFrom::Start(block_number * BLOCK_SIZE as u64))
        .map_err(|e| FlowError::IoError {
            operation: "seek_block".to_string(),
            reason: e.to_string(),
        })?;

    let mut padded = vec![0u8; BLOCK_SIZE.saturating_sub(to_write.len())];
    padded.extend_from_slice(to_write);
    file.write_all(&padded).map_err(|e| FlowError::IoError {
        operation: "write_block".to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

/// Read one block. Regions beyond the end of the file read as zeros, so
/// freshly allocated blocks look like empty blocks.
fn read_block(file: &mut File, block_number: u64) -> FlowResult<[u8; BLOCK_SIZE]> {
    file.seek(SeekFrom::Start(block_number * BLOCK_SIZE as u64))
        .map_err(|e| FlowError::IoError {
            operation: "seek_block".to_string(),
            reason: e.to_string(),
        })?;

    let mut buffer = [0u8; BLOCK_SIZE];
    let mut filled = 0;
    while filled < BLOCK_SIZE {
        let n = file.read(&mut buffer[filled..]).map_err(|e| FlowError::IoError {
            operation: "read_block".to_string(),
            reason: e.to_string(),
        })?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(buffer)
}

/// Encode a block number as a big-endian next-pointer.
fn reference_bytes(block: u64) -> [u8; REFERENCE_SIZE] {
    let mut bytes = [0u8; REFERENCE_SIZE];
    bytes[REFERENCE_SIZE - 8..].copy_from_slice(&block.to_be_bytes());
    bytes
}

/// Decode a big-endian next-pointer. Only the low 8 bytes are significant;
/// the pointer region is wider than any reachable block number.
fn reference_value(bytes: &[u8]) -> u64 {
    let mut low = [0u8; 8];
    low.copy_from_slice(&bytes[bytes.len() - 8..]);
    u64::from_be_bytes(low)
}
