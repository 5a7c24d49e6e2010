// Video output core - memory-side half of the scan-out pipeline
//
// ```text
// FrameProgram --token--> AddressSequencer --> MemoryReader --> WordToPixelCaster
//      |                                                               |
//      +--------------token--------------> TimingGenerator <--pixel----+
//                                                 |
//                                             BeatPacker --> PhyBeat
// ```
//
// `step` runs one memory-side clock edge in two phases: every stage's offer and
// ready are evaluated from pre-step registers, then every stage commits with
// the handshake outcome it was given.

use serde::Serialize;

use super::BeatPacker;
use crate::cast::{PixelLayout, WordToPixelCaster};
use crate::dma::{AddressSequencer, MemoryBus, MemoryReader};
use crate::driver::PhyBeat;
use crate::geometry::FrameProgram;
use crate::stream::{fires, transfer, StreamElement};
use crate::timing::{TimingGenerator, TimingState};

/// Counters kept by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CoreStats {
    /// Memory-side edges run
    pub steps: u64,
    /// Edges on which the timing generator advanced
    pub timing_steps: u64,
    /// Edges on which a valid token was present but timing could not advance
    pub timing_stalls: u64,
    /// Beats handed to the driver
    pub beats_out: u64,
    /// Frames completed by the timing generator
    pub frames: u64,
}

/// Geometry fan-out, DMA, pixel casting and raster timing
#[derive(Debug)]
pub struct VideoOutCore<M: MemoryBus> {
    program: FrameProgram,
    sequencer: AddressSequencer,
    reader: MemoryReader<M>,
    cast: WordToPixelCaster,
    timing: TimingGenerator,
    packer: BeatPacker,
    stats: CoreStats,
}

impl<M: MemoryBus> VideoOutCore<M> {
    /// Create a core reading through `memory`
    ///
    /// # Arguments
    /// * `program` - Geometry source
    /// * `memory` - Framebuffer memory collaborator
    /// * `layout` - How pixels sit in a bus word
    /// * `port` - DMA port whose base address this core reads
    pub fn new(program: FrameProgram, memory: M, layout: PixelLayout, port: usize) -> Self {
        VideoOutCore {
            program,
            sequencer: AddressSequencer::new(port),
            reader: MemoryReader::new(memory),
            packer: BeatPacker::new(layout.pack_factor() as usize),
            cast: WordToPixelCaster::new(layout),
            timing: TimingGenerator::new(),
            stats: CoreStats::default(),
        }
    }

    /// Geometry source
    pub fn program(&self) -> &FrameProgram {
        &self.program
    }

    /// Geometry source, for reprogramming
    pub fn program_mut(&mut self) -> &mut FrameProgram {
        &mut self.program
    }

    /// Memory collaborator
    pub fn memory(&self) -> &M {
        self.reader.bus()
    }

    /// Memory collaborator, for loading framebuffer contents
    pub fn memory_mut(&mut self) -> &mut M {
        self.reader.bus_mut()
    }

    /// Raster timing state machine
    pub fn timing(&self) -> &TimingGenerator {
        &self.timing
    }

    /// Current timing registers
    pub fn timing_state(&self) -> &TimingState {
        self.timing.state()
    }

    /// Address sequencer
    pub fn sequencer(&self) -> &AddressSequencer {
        &self.sequencer
    }

    /// Memory reader
    pub fn reader(&self) -> &MemoryReader<M> {
        &self.reader
    }

    /// Counters so far
    pub fn stats(&self) -> CoreStats {
        CoreStats {
            frames: self.timing.frames(),
            ..self.stats
        }
    }

    /// Run one memory-side edge
    ///
    /// # Arguments
    /// * `sink_ready` - Whether the driver accepts a beat on this edge
    ///
    /// # Returns
    /// The beat transferred to the driver on this edge, if any
    pub fn step(&mut self, sink_ready: bool) -> Option<StreamElement<PhyBeat>> {
        let token = self.program.token();

        // Phase 1: offers and readies from pre-step registers, downstream first
        let beat = self.packer.source();
        let packer_ready = self.packer.sink_ready(sink_ready);

        let pixel = self.cast.source();
        let timed = self.timing.source(token.as_ref(), pixel.as_ref());
        let pixel_ready = self.timing.pixel_ready(token.as_ref(), packer_ready);

        let cast_ready = self.cast.sink_ready(pixel_ready);
        let word = self.reader.source();

        let reader_ready = self.reader.sink_ready();
        let address = self.sequencer.source();

        // Phase 2: commit
        let beat_out = transfer(&beat, sink_ready);
        let timing_fires = fires(&timed, packer_ready);

        self.packer.tick(transfer(&timed, packer_ready), sink_ready);
        self.timing
            .tick(token.as_ref(), pixel.as_ref(), packer_ready);
        self.cast.tick(transfer(&word, cast_ready), pixel_ready);
        self.reader.tick(transfer(&address, reader_ready), cast_ready);
        self.sequencer.tick(token.as_deref(), reader_ready);

        self.stats.steps += 1;
        if timing_fires {
            self.stats.timing_steps += 1;
        } else if token.is_some() {
            self.stats.timing_stalls += 1;
        }
        if beat_out.is_some() {
            self.stats.beats_out += 1;
        }
        beat_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::{LaneOrder, PixelSample};
    use crate::dma::{SimMemory, Word};
    use crate::geometry::{FrameGeometry, ScanTiming};

    // 4x2 active in an 8x4 raster, 32-bit bus
    fn geometry() -> FrameGeometry {
        FrameGeometry::new(
            ScanTiming::new(4, 4, 6, 7),
            ScanTiming::new(2, 2, 3, 3),
            0x10,
            4,
        )
    }

    fn core_with(memory: SimMemory) -> VideoOutCore<SimMemory> {
        let layout = PixelLayout::new(32, LaneOrder::LowFirst);
        VideoOutCore::new(FrameProgram::running(geometry()), memory, layout, 0)
    }

    fn framebuffer() -> SimMemory {
        let layout = PixelLayout::new(32, LaneOrder::LowFirst);
        let pixels: Vec<PixelSample> = (1..=8).map(PixelSample).collect();
        let mut mem = SimMemory::new(64).with_latency(3);
        mem.load(0x10, &layout.pack(&pixels));
        mem
    }

    fn collect_frame(core: &mut VideoOutCore<SimMemory>) -> Vec<PhyBeat> {
        let mut beats = Vec::new();
        for _ in 0..500 {
            if let Some(beat) = core.step(true) {
                let last = beat.last;
                beats.push(beat.payload);
                if last {
                    return beats;
                }
            }
        }
        panic!("frame did not complete");
    }

    #[test]
    fn test_frame_carries_framebuffer_in_raster_order() {
        let mut core = core_with(framebuffer());
        let beats = collect_frame(&mut core);
        assert_eq!(beats.len(), 16, "32 positions in pairs");

        let active: Vec<u16> = beats
            .iter()
            .flat_map(|b| b.lanes.iter())
            .filter(|l| l.side.de)
            .map(|l| l.pixel.0)
            .collect();
        assert_eq!(active, (1..=8).collect::<Vec<u16>>());
        assert_eq!(core.stats().frames, 1);
    }

    #[test]
    fn test_second_frame_rereads_memory() {
        let mut core = core_with(framebuffer());
        collect_frame(&mut core);
        let beats = collect_frame(&mut core);
        let active: Vec<u16> = beats
            .iter()
            .flat_map(|b| b.lanes.iter())
            .filter(|l| l.side.de)
            .map(|l| l.pixel.0)
            .collect();
        assert_eq!(active, (1..=8).collect::<Vec<u16>>());
        assert!(core.sequencer().sequences() >= 2);
    }

    #[test]
    fn test_driver_stall_holds_everything() {
        let mut core = core_with(framebuffer());
        for _ in 0..20 {
            core.step(true);
        }
        // Let the packer and the read queue fill up behind the stall
        for _ in 0..20 {
            core.step(false);
        }
        let state = *core.timing_state();
        let issued = core.reader().issued();

        for _ in 0..50 {
            assert!(core.step(false).is_none());
        }
        assert_eq!(*core.timing_state(), state);
        assert_eq!(core.reader().issued(), issued);
    }

    #[test]
    fn test_memory_stall_delays_but_keeps_order() {
        let mut mem = framebuffer();
        mem.set_response_stall(true);
        let mut core = core_with(mem);
        for _ in 0..30 {
            core.step(true);
        }
        assert!(core.stats().timing_stalls > 0);
        assert_eq!(core.timing_state().hcounter, 0, "waiting for the first pixel");

        core.memory_mut().set_response_stall(false);
        let beats = collect_frame(&mut core);
        let active: Vec<u16> = beats
            .iter()
            .flat_map(|b| b.lanes.iter())
            .filter(|l| l.side.de)
            .map(|l| l.pixel.0)
            .collect();
        assert_eq!(active, (1..=8).collect::<Vec<u16>>());
    }

    #[test]
    fn test_disabled_program_emits_nothing() {
        let mut core = core_with(framebuffer());
        core.program_mut().disable();
        for _ in 0..40 {
            assert!(core.step(true).is_none());
        }
        assert_eq!(core.stats().timing_stalls, 0);
        assert_eq!(core.memory().read(0x10), 0x0002_0001 as Word);
    }
}
