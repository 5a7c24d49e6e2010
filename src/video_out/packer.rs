// Beat packer - groups timed pixels into beats for the driver
//
// The core produces one `TimedPixel` per step, the driver consumes one beat of
// `pack_factor` lanes per memory-side edge. A completed beat sits in an output
// register until the driver takes it; the next beat may fill meanwhile.

use crate::driver::{PhyBeat, PhyLane, SideSignals};
use crate::stream::StreamElement;
use crate::timing::TimedPixel;

impl From<TimedPixel> for PhyLane {
    fn from(px: TimedPixel) -> Self {
        PhyLane {
            pixel: px.pixel,
            side: SideSignals {
                de: px.de,
                hsync: px.hsync,
                vsync: px.vsync,
            },
        }
    }
}

/// Collects `pack_factor` lanes per beat
#[derive(Debug, Clone)]
pub struct BeatPacker {
    pack_factor: usize,
    filling: Vec<PhyLane>,
    full: Option<StreamElement<PhyBeat>>,
}

impl BeatPacker {
    /// Create a packer emitting beats of `pack_factor` lanes
    ///
    /// # Panics
    /// Panics if `pack_factor` is zero
    pub fn new(pack_factor: usize) -> Self {
        assert!(pack_factor > 0, "pack factor must be non-zero");
        BeatPacker {
            pack_factor,
            filling: Vec::with_capacity(pack_factor),
            full: None,
        }
    }

    /// Lanes per beat
    pub fn pack_factor(&self) -> usize {
        self.pack_factor
    }

    /// Lanes collected towards the next beat
    pub fn pending_lanes(&self) -> usize {
        self.filling.len()
    }

    /// Beat offered on this step
    pub fn source(&self) -> Option<StreamElement<PhyBeat>> {
        self.full.clone()
    }

    /// Whether a pixel is accepted on this step
    ///
    /// Refuses only when taking the pixel would complete a beat while the
    /// previous one is still waiting.
    pub fn sink_ready(&self, source_ready: bool) -> bool {
        self.full.is_none() || source_ready || self.filling.len() + 1 < self.pack_factor
    }

    /// Commit one step
    ///
    /// # Arguments
    /// * `input` - Pixel accepted on this step, if any
    /// * `source_ready` - Whether the consumer takes the offered beat
    pub fn tick(&mut self, input: Option<StreamElement<TimedPixel>>, source_ready: bool) {
        if source_ready {
            self.full = None;
        }
        if let Some(px) = input {
            self.filling.push(px.payload.into());
            if self.filling.len() == self.pack_factor {
                let lanes = std::mem::take(&mut self.filling);
                self.full = Some(StreamElement::with_last(PhyBeat { lanes }, px.last));
            }
        }
    }
}
