// DMA module - framebuffer fetch path
//
// This module turns a frame's memory descriptor into a stream of bus words:
//
// ```text
// FrameGeometry --(offset, maximum)--> AddressSequencer --address--> MemoryReader --word-->
// ```
//
// The memory itself is an external collaborator reached through the `MemoryBus`
// trait. `SimMemory` is the in-process implementation used by the binary, the
// benches and the tests.

mod memory;
mod reader;
mod sequencer;

pub use memory::SimMemory;
pub use reader::MemoryReader;
pub use sequencer::AddressSequencer;

/// One memory bus word
///
/// Wide enough for every supported bus width (up to 128 bits). Narrower buses
/// use the low-order bits only.
pub type Word = u128;

/// Trait for the memory collaborator behind the reader
///
/// Follows the same two-phase discipline as the pipeline stages: the query
/// methods report what the memory presents on the current step and must not
/// change state, `tick` commits the step.
///
/// Implementations must answer requests in the order they were issued. They may
/// stall either side for any number of steps.
pub trait MemoryBus {
    /// Whether a read request would be accepted on this step
    fn request_ready(&self) -> bool;

    /// Oldest completed read, if one is presented on this step
    fn response(&self) -> Option<Word>;

    /// Commit one step
    ///
    /// # Arguments
    /// * `request` - Address accepted on this step, if any
    /// * `response_taken` - Whether the presented response was consumed
    fn tick(&mut self, request: Option<u32>, response_taken: bool);
}
