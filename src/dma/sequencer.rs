// Address sequencer - expands (offset, maximum) into consecutive addresses
//
// The sequencer idles until it sees a valid geometry token, loads the window for
// its DMA port, then emits `offset, offset + 1, ..., offset + maximum - 1`, one
// address per accepted step. After the last address it returns to idle and
// reloads from whatever token is current, so a held geometry is streamed again
// frame after frame. Loading costs one step.

use crate::geometry::FrameGeometry;
use crate::stream::StreamElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequencerState {
    Idle,
    Active,
}

/// Address generator for one DMA port
#[derive(Debug, Clone)]
pub struct AddressSequencer {
    port: usize,
    state: SequencerState,
    offset: u32,
    maximum: u32,
    counter: u32,
    sequences: u64,
}

impl AddressSequencer {
    /// Create a sequencer reading the window of `port`
    pub fn new(port: usize) -> Self {
        AddressSequencer {
            port,
            state: SequencerState::Idle,
            offset: 0,
            maximum: 0,
            counter: 0,
            sequences: 0,
        }
    }

    /// DMA port this sequencer is bound to
    pub fn port(&self) -> usize {
        self.port
    }

    /// Number of sequences loaded so far
    pub fn sequences(&self) -> u64 {
        self.sequences
    }

    /// Whether the sequencer is waiting for a descriptor
    pub fn is_idle(&self) -> bool {
        self.state == SequencerState::Idle
    }

    /// Whether a descriptor would be sampled on this step
    pub fn sink_ready(&self) -> bool {
        self.is_idle()
    }

    /// Address offered on this step
    ///
    /// The offer is held unchanged for as long as the consumer is not ready.
    pub fn source(&self) -> Option<StreamElement<u32>> {
        match self.state {
            SequencerState::Idle => None,
            SequencerState::Active => Some(StreamElement::with_last(
                self.offset.wrapping_add(self.counter),
                self.is_last(),
            )),
        }
    }

    fn is_last(&self) -> bool {
        self.counter + 1 == self.maximum
    }

    /// Commit one step
    ///
    /// # Arguments
    /// * `token` - Geometry token offered on this step
    /// * `source_ready` - Whether the consumer accepts the offered address
    pub fn tick(&mut self, token: Option<&FrameGeometry>, source_ready: bool) {
        match self.state {
            SequencerState::Idle => {
                let descriptor = token.and_then(|g| g.dma_descriptor(self.port));
                if let Some(descriptor) = descriptor {
                    // An empty window emits nothing
                    if descriptor.maximum == 0 {
                        return;
                    }
                    self.offset = descriptor.offset;
                    self.maximum = descriptor.maximum;
                    self.counter = 0;
                    self.state = SequencerState::Active;
                    self.sequences += 1;
                    log::debug!(
                        "dma port {}: sequence {} at {:#x} (+{})",
                        self.port,
                        self.sequences,
                        self.offset,
                        self.maximum
                    );
                }
            }
            SequencerState::Active => {
                if !source_ready {
                    return;
                }
                if self.is_last() {
                    self.state = SequencerState::Idle;
                    self.counter = 0;
                } else {
                    self.counter += 1;
                }
            }
        }
    }

    /// Abandon the current sequence
    ///
    /// Only used on explicit reconfiguration; normal operation always runs a
    /// sequence to completion.
    pub fn reset(&mut self) {
        self.state = SequencerState::Idle;
        self.counter = 0;
    }
}
