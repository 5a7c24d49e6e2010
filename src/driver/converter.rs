// Stride narrower - one packed beat in, `pack_factor` single pixels out
//
// A beat carries one lane per pixel, each with its own side signals. All
// pixels leaving for a beat present one common set of side signals, taken from
// the first lane asserting data enable, or from the final lane if none does.

use super::{PhyBeat, PhyLane, SideSignals};
use crate::stream::StreamElement;

/// Pick the side signals presented for a whole beat
pub fn select_side_signals(beat: &PhyBeat) -> SideSignals {
    beat.lanes
        .iter()
        .find(|lane| lane.side.de)
        .or_else(|| beat.lanes.last())
        .map(|lane| lane.side)
        .unwrap_or_default()
}

/// Width converter from packed beats to single-pixel transfers
#[derive(Debug, Clone, Default)]
pub struct StrideNarrower {
    current: Option<StreamElement<PhyBeat>>,
    selected: SideSignals,
    index: usize,
}

impl StrideNarrower {
    pub fn new() -> Self {
        Self::default()
    }

    fn on_final_lane(&self) -> bool {
        self.current
            .as_ref()
            .map(|beat| self.index + 1 >= beat.payload.lanes.len())
            .unwrap_or(false)
    }

    /// Pixel offered on this step
    pub fn source(&self) -> Option<StreamElement<PhyLane>> {
        let beat = self.current.as_ref()?;
        let lane = beat.payload.lanes.get(self.index)?;
        Some(StreamElement::with_last(
            PhyLane {
                pixel: lane.pixel,
                side: self.selected,
            },
            beat.last && self.on_final_lane(),
        ))
    }

    /// Whether a beat is accepted on this step
    pub fn sink_ready(&self, source_ready: bool) -> bool {
        self.current.is_none() || (self.on_final_lane() && source_ready)
    }

    /// Commit one step
    ///
    /// # Arguments
    /// * `input` - Beat accepted on this step, if any
    /// * `source_ready` - Whether the consumer takes the offered pixel
    pub fn tick(&mut self, input: Option<StreamElement<PhyBeat>>, source_ready: bool) {
        if self.current.is_some() && source_ready {
            if self.on_final_lane() {
                self.current = None;
                self.index = 0;
            } else {
                self.index += 1;
            }
        }
        if let Some(beat) = input {
            if beat.payload.lanes.is_empty() {
                return;
            }
            self.selected = select_side_signals(&beat.payload);
            self.current = Some(beat);
            self.index = 0;
        }
    }
}
