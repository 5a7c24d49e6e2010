// Asynchronous FIFO - the only state shared between the two clock domains
//
// Single producer in the write (memory-side) domain, single consumer in the
// read (display-side) domain. Each side only moves its own pointer and sees the
// other side's pointer through a two-stage synchronizer, so it learns about a
// push or pop two of its own clock edges late. Full and empty are therefore
// conservative: the writer may see the FIFO as fuller than it is and the reader
// as emptier, never the other way round.

/// Synchronizer depth for pointers crossing domains
const SYNC_STAGES: usize = 2;

/// Bounded dual-clock ring buffer
#[derive(Debug, Clone)]
pub struct AsyncFifo<T> {
    slots: Vec<Option<T>>,
    write_ptr: usize,
    read_ptr: usize,
    // read_ptr as seen from the write domain, newest stage first
    read_ptr_sync: [usize; SYNC_STAGES],
    // write_ptr as seen from the read domain, newest stage first
    write_ptr_sync: [usize; SYNC_STAGES],
    high_water: usize,
}

impl<T> AsyncFifo<T> {
    /// Create an empty FIFO holding at most `capacity` elements
    ///
    /// # Panics
    /// Panics if `capacity` is zero
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "FIFO capacity must be non-zero");
        AsyncFifo {
            slots: (0..capacity).map(|_| None).collect(),
            write_ptr: 0,
            read_ptr: 0,
            read_ptr_sync: [0; SYNC_STAGES],
            write_ptr_sync: [0; SYNC_STAGES],
            high_water: 0,
        }
    }

    /// Maximum number of elements
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    // Pointers run over twice the capacity so full and empty stay distinct
    fn advance(&self, ptr: usize) -> usize {
        (ptr + 1) % (2 * self.capacity())
    }

    fn distance(&self, from: usize, to: usize) -> usize {
        (to + 2 * self.capacity() - from) % (2 * self.capacity())
    }

    /// Occupancy as seen by the writer
    pub fn write_level(&self) -> usize {
        self.distance(self.read_ptr_sync[SYNC_STAGES - 1], self.write_ptr)
    }

    /// Occupancy as seen by the reader
    pub fn read_level(&self) -> usize {
        self.distance(self.read_ptr, self.write_ptr_sync[SYNC_STAGES - 1])
    }

    /// Whether the writer must hold off (write domain)
    pub fn is_full(&self) -> bool {
        self.write_level() >= self.capacity()
    }

    /// Whether the reader has nothing to take (read domain)
    pub fn is_empty(&self) -> bool {
        self.read_level() == 0
    }

    /// Highest writer-side occupancy observed
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Push from the write domain
    ///
    /// Returns the value back if the FIFO is full.
    pub fn try_push(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        let slot = self.write_ptr % self.capacity();
        self.slots[slot] = Some(value);
        self.write_ptr = self.advance(self.write_ptr);
        self.high_water = self.high_water.max(self.write_level());
        Ok(())
    }

    /// Pop from the read domain
    pub fn try_pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let slot = self.read_ptr % self.capacity();
        let value = self.slots[slot].take();
        self.read_ptr = self.advance(self.read_ptr);
        value
    }

    /// Clock edge in the write domain: sample the reader's pointer
    pub fn tick_write(&mut self) {
        self.read_ptr_sync.rotate_right(1);
        self.read_ptr_sync[0] = self.read_ptr;
    }

    /// Clock edge in the read domain: sample the writer's pointer
    pub fn tick_read(&mut self) {
        self.write_ptr_sync.rotate_right(1);
        self.write_ptr_sync[0] = self.write_ptr;
    }
}
