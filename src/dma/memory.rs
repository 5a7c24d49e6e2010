// Simulated framebuffer memory
//
// Word-addressed backing store with a fixed read latency and a bounded number of
// reads in flight. Addresses wrap modulo the memory size, the same way a small
// physical RAM is mirrored across a larger address window.
//
// Either side of the bus can be stalled on demand to exercise backpressure.

use std::collections::VecDeque;

use super::{MemoryBus, Word};

/// Default read latency in steps
const DEFAULT_LATENCY: u32 = 4;

/// Default number of reads that may be in flight
const DEFAULT_MAX_OUTSTANDING: usize = 8;

/// In-process memory collaborator
///
/// # Examples
///
/// ```
/// use scanout::dma::{MemoryBus, SimMemory};
///
/// let mut mem = SimMemory::new(16).with_latency(1);
/// mem.write(3, 0xABCD);
///
/// mem.tick(Some(3), false);
/// assert_eq!(mem.response(), Some(0xABCD));
/// ```
#[derive(Debug, Clone)]
pub struct SimMemory {
    memory: Vec<Word>,
    latency: u32,
    max_outstanding: usize,
    in_flight: VecDeque<(Word, u64)>,
    now: u64,
    request_stall: bool,
    response_stall: bool,
}

impl SimMemory {
    /// Create a zero-filled memory of `words` bus words
    ///
    /// # Panics
    /// Panics if `words` is zero
    pub fn new(words: usize) -> Self {
        assert!(words > 0, "memory must hold at least one word");
        SimMemory {
            memory: vec![0; words],
            latency: DEFAULT_LATENCY,
            max_outstanding: DEFAULT_MAX_OUTSTANDING,
            in_flight: VecDeque::new(),
            now: 0,
            request_stall: false,
            response_stall: false,
        }
    }

    /// Set the read latency (at least one step)
    pub fn with_latency(mut self, latency: u32) -> Self {
        self.latency = latency.max(1);
        self
    }

    /// Set how many reads may be in flight (at least one)
    pub fn with_max_outstanding(mut self, max_outstanding: usize) -> Self {
        self.max_outstanding = max_outstanding.max(1);
        self
    }

    /// Size in bus words
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Always false; a memory holds at least one word
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    #[inline]
    fn index(&self, addr: u32) -> usize {
        addr as usize % self.memory.len()
    }

    /// Read a word directly, bypassing the bus timing
    pub fn read(&self, addr: u32) -> Word {
        self.memory[self.index(addr)]
    }

    /// Write a word directly
    pub fn write(&mut self, addr: u32, data: Word) {
        let index = self.index(addr);
        self.memory[index] = data;
    }

    /// Copy a block of words starting at `addr`
    pub fn load(&mut self, addr: u32, data: &[Word]) {
        for (i, &word) in data.iter().enumerate() {
            self.write(addr.wrapping_add(i as u32), word);
        }
    }

    /// Fill the whole memory with one value
    pub fn fill(&mut self, data: Word) {
        self.memory.fill(data);
    }

    /// Refuse new requests while `stall` is set
    pub fn set_request_stall(&mut self, stall: bool) {
        self.request_stall = stall;
    }

    /// Withhold responses while `stall` is set
    pub fn set_response_stall(&mut self, stall: bool) {
        self.response_stall = stall;
    }

    /// Reads currently in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl MemoryBus for SimMemory {
    fn request_ready(&self) -> bool {
        !self.request_stall && self.in_flight.len() < self.max_outstanding
    }

    fn response(&self) -> Option<Word> {
        if self.response_stall {
            return None;
        }
        match self.in_flight.front() {
            Some(&(data, ready_at)) if ready_at <= self.now => Some(data),
            _ => None,
        }
    }

    fn tick(&mut self, request: Option<u32>, response_taken: bool) {
        if response_taken {
            self.in_flight.pop_front();
        }
        if let Some(addr) = request {
            let data = self.read(addr);
            self.in_flight
                .push_back((data, self.now + self.latency as u64));
        }
        self.now += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_wraps_modulo_size() {
        let mut mem = SimMemory::new(8);
        mem.write(2, 0x42);
        assert_eq!(mem.read(10), 0x42);
        assert_eq!(mem.read(2), 0x42);
    }

    #[test]
    fn test_response_after_latency() {
        let mut mem = SimMemory::new(8).with_latency(3);
        mem.write(1, 0x11);

        mem.tick(Some(1), false);
        assert_eq!(mem.response(), None);
        mem.tick(None, false);
        assert_eq!(mem.response(), None);
        mem.tick(None, false);
        assert_eq!(mem.response(), Some(0x11));
    }

    #[test]
    fn test_outstanding_limit_applies_backpressure() {
        let mut mem = SimMemory::new(8).with_latency(10).with_max_outstanding(2);
        mem.tick(Some(0), false);
        mem.tick(Some(1), false);
        assert!(!mem.request_ready());
        assert_eq!(mem.in_flight(), 2);
    }

    #[test]
    fn test_response_stall_withholds_data() {
        let mut mem = SimMemory::new(8).with_latency(1);
        mem.write(0, 7);
        mem.tick(Some(0), false);
        mem.set_response_stall(true);
        assert_eq!(mem.response(), None);
        mem.set_response_stall(false);
        assert_eq!(mem.response(), Some(7));
    }

    #[test]
    fn test_load_block() {
        let mut mem = SimMemory::new(4);
        mem.load(3, &[1, 2]);
        assert_eq!(mem.read(3), 1);
        assert_eq!(mem.read(0), 2);
    }
}
