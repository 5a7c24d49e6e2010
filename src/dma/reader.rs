// Memory reader - issues one read per address and streams the words back
//
// The reader forwards accepted addresses to the `MemoryBus` and returns the
// responses in request order. It remembers which request closed an address
// sequence so the matching word carries the `last` marker.

use std::collections::VecDeque;

use super::{MemoryBus, Word};
use crate::stream::StreamElement;

/// Order-preserving read engine in front of a `MemoryBus`
#[derive(Debug)]
pub struct MemoryReader<M: MemoryBus> {
    bus: M,
    pending_last: VecDeque<bool>,
    issued: u64,
    completed: u64,
}

impl<M: MemoryBus> MemoryReader<M> {
    /// Create a reader in front of `bus`
    pub fn new(bus: M) -> Self {
        MemoryReader {
            bus,
            pending_last: VecDeque::new(),
            issued: 0,
            completed: 0,
        }
    }

    /// Shared access to the memory collaborator
    pub fn bus(&self) -> &M {
        &self.bus
    }

    /// Mutable access to the memory collaborator
    pub fn bus_mut(&mut self) -> &mut M {
        &mut self.bus
    }

    /// Reads issued so far
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Reads returned downstream so far
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Reads issued but not yet returned downstream
    pub fn outstanding(&self) -> usize {
        self.pending_last.len()
    }

    /// Whether an address is accepted on this step
    pub fn sink_ready(&self) -> bool {
        self.bus.request_ready()
    }

    /// Word offered downstream on this step
    pub fn source(&self) -> Option<StreamElement<Word>> {
        let word = self.bus.response()?;
        let last = self.pending_last.front().copied().unwrap_or(false);
        Some(StreamElement::with_last(word, last))
    }

    /// Commit one step
    ///
    /// # Arguments
    /// * `request` - Address accepted on this step, if any
    /// * `source_ready` - Whether the consumer accepts the offered word
    pub fn tick(&mut self, request: Option<StreamElement<u32>>, source_ready: bool) {
        let taken = source_ready && self.bus.response().is_some();
        if taken {
            self.pending_last.pop_front();
            self.completed += 1;
        }
        if let Some(request) = request {
            self.pending_last.push_back(request.last);
            self.issued += 1;
        }
        self.bus.tick(request.map(|r| r.payload), taken);
    }
}
