// Driver module - display-side half of the scan-out pipeline
//
// ```text
//  sys domain           |  pix domain
//  PhyBeat --> AsyncFifo --> StrideNarrower --> ChromaUpsampler --> YcbcrToRgb --> VideoSample
//                       |         |                                                  ^
//                       |         +--- side signals ---> DelayLine -----------------+
// ```
//
// Beats cross into the display domain through the FIFO, are narrowed to one
// pixel per display edge, then colour converted. Side signals bypass the colour
// stages through a delay line whose depth equals the sum of their latencies, so
// every output sample pairs a pixel with the flags it was produced with.

mod converter;
mod csc;
mod delay;
mod fifo;

pub use converter::{select_side_signals, StrideNarrower};
pub use csc::{ChromaUpsampler, Pipelined, Rgb, Ycbcr444, YcbcrToRgb};
pub use delay::DelayLine;
pub use fifo::AsyncFifo;

use serde::Serialize;

use crate::cast::PixelSample;
use crate::stream::StreamElement;

/// Reference FIFO sizing between the two clock domains
pub const DEFAULT_FIFO_DEPTH: usize = 512;

/// Depth of the side-signal delay line
pub const SIDE_SIGNAL_DELAY: usize = ChromaUpsampler::LATENCY + YcbcrToRgb::LATENCY;

/// Data enable and sync flags travelling alongside a pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct SideSignals {
    pub de: bool,
    pub hsync: bool,
    pub vsync: bool,
}

/// One pixel of a packed beat with its own side signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhyLane {
    pub pixel: PixelSample,
    pub side: SideSignals,
}

/// `pack_factor` lanes transferred together from the core
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhyBeat {
    pub lanes: Vec<PhyLane>,
}

/// One display-clock sample at the physical output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub de: bool,
    pub hsync: bool,
    pub vsync: bool,
}

impl VideoSample {
    /// Sample emitted when nothing is available: black, all flags low
    pub const BLANK: VideoSample = VideoSample {
        r: 0,
        g: 0,
        b: 0,
        de: false,
        hsync: false,
        vsync: false,
    };

    /// Side signals of this sample
    pub fn side(&self) -> SideSignals {
        SideSignals {
            de: self.de,
            hsync: self.hsync,
            vsync: self.vsync,
        }
    }

    /// Colour of this sample
    pub fn rgb(&self) -> Rgb {
        Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

/// Consumer of the physical video output
pub trait PhySink {
    /// Receive the sample produced on one display edge
    fn accept(&mut self, sample: &VideoSample);
}

impl PhySink for Vec<VideoSample> {
    fn accept(&mut self, sample: &VideoSample) {
        self.push(*sample);
    }
}

// Side signals plus the frame-end marker, delayed together
#[derive(Debug, Clone, Copy, Default)]
struct Delayed {
    side: SideSignals,
    last: bool,
}

/// Counters kept by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DriverStats {
    /// Beats accepted from the core
    pub beats_in: u64,
    /// Beats offered while the FIFO was full
    pub beats_dropped: u64,
    /// Samples emitted on the display side
    pub samples_out: u64,
    /// Frames whose final pixel has left the pipeline
    pub frames_out: u64,
    /// Display edges with no pixel available after output started
    pub underflow_samples: u64,
    /// Separate underflow episodes
    pub underflow_runs: u64,
    /// Highest FIFO occupancy seen by the writer
    pub fifo_high_water: usize,
}

/// Clock-domain crossing, narrowing and colour conversion
#[derive(Debug, Clone)]
pub struct Driver {
    fifo: AsyncFifo<StreamElement<PhyBeat>>,
    narrower: StrideNarrower,
    upsampler: ChromaUpsampler,
    csc: YcbcrToRgb,
    side_delay: DelayLine<Delayed>,
    started: bool,
    underflowing: bool,
    stats: DriverStats,
}

impl Driver {
    /// Create a driver with a FIFO of `fifo_depth` beats
    pub fn new(fifo_depth: usize) -> Self {
        Driver {
            fifo: AsyncFifo::new(fifo_depth),
            narrower: StrideNarrower::new(),
            upsampler: ChromaUpsampler::new(),
            csc: YcbcrToRgb::new(),
            side_delay: DelayLine::new(SIDE_SIGNAL_DELAY),
            started: false,
            underflowing: false,
            stats: DriverStats::default(),
        }
    }

    /// Counters so far
    pub fn stats(&self) -> DriverStats {
        DriverStats {
            fifo_high_water: self.fifo.high_water(),
            ..self.stats
        }
    }

    /// Crossing FIFO
    pub fn fifo(&self) -> &AsyncFifo<StreamElement<PhyBeat>> {
        &self.fifo
    }

    /// Whether the display side has received its first beat
    pub fn started(&self) -> bool {
        self.started
    }

    /// Whether a beat is accepted on this memory-side edge
    pub fn sink_ready(&self) -> bool {
        !self.fifo.is_full()
    }

    /// Memory-side clock edge
    ///
    /// # Arguments
    /// * `input` - Beat transferred from the core on this edge, if any
    pub fn tick_write(&mut self, input: Option<StreamElement<PhyBeat>>) {
        if let Some(beat) = input {
            match self.fifo.try_push(beat) {
                Ok(()) => self.stats.beats_in += 1,
                Err(_) => {
                    self.stats.beats_dropped += 1;
                    log::error!("driver: beat offered to a full FIFO was dropped");
                }
            }
        }
        self.fifo.tick_write();
    }

    /// Display-side clock edge
    ///
    /// Returns the sample leaving the pipeline on this edge.
    pub fn tick_read(&mut self) -> VideoSample {
        let offered = self.narrower.source();
        let beat = if self.narrower.sink_ready(true) {
            self.fifo.try_pop()
        } else {
            None
        };

        let (pixel_in, delayed_in) = match offered {
            Some(lane) => {
                self.underflowing = false;
                let side = lane.payload.side;
                let delayed = Delayed {
                    side,
                    last: lane.last,
                };
                (side.de.then_some(lane.payload.pixel), delayed)
            }
            None => {
                self.note_underflow();
                (None, Delayed::default())
            }
        };
        if beat.is_some() {
            self.started = true;
        }

        let rgb = self.csc.output().unwrap_or(Rgb::BLACK);
        let Delayed { side, last } = self.side_delay.shift(delayed_in);
        let chroma = self.upsampler.output();
        self.csc.tick(chroma);
        self.upsampler.tick(pixel_in);
        self.narrower.tick(beat, true);
        self.fifo.tick_read();

        self.stats.samples_out += 1;
        if last {
            self.stats.frames_out += 1;
        }
        if side.de {
            VideoSample {
                r: rgb.r,
                g: rgb.g,
                b: rgb.b,
                de: true,
                hsync: side.hsync,
                vsync: side.vsync,
            }
        } else {
            VideoSample {
                hsync: side.hsync,
                vsync: side.vsync,
                ..VideoSample::BLANK
            }
        }
    }

    fn note_underflow(&mut self) {
        if !self.started {
            return;
        }
        self.stats.underflow_samples += 1;
        if !self.underflowing {
            self.underflowing = true;
            self.stats.underflow_runs += 1;
            log::warn!(
                "driver: display underflow after {} samples, emitting blanking",
                self.stats.samples_out
            );
        }
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new(DEFAULT_FIFO_DEPTH)
    }
}
