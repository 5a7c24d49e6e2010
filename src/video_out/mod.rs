// Video output module - complete scan-out pipeline across two clock domains
//
// `VideoOutCore` runs on the memory-side clock and hands packed beats to the
// `Driver`, which crosses into the display clock and emits one `VideoSample`
// per display edge into a `PhySink`. `ClockDomains` decides which side steps
// at each instant.

mod clock;
mod memory_side;
mod packer;

pub use clock::{ClockDomains, Edges};
pub use memory_side::{CoreStats, VideoOutCore};
pub use packer::BeatPacker;

use serde::Serialize;

use crate::cast::PixelLayout;
use crate::config::{ConfigError, ScanoutConfig};
use crate::debug::{LogLevel, Logger, TimingSnapshot};
use crate::dma::MemoryBus;
use crate::driver::{Driver, DriverStats, PhySink};
use crate::geometry::FrameProgram;

/// Counters for a whole pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PipelineStats {
    pub sys_edges: u64,
    pub pix_edges: u64,
    pub core: CoreStats,
    pub driver: DriverStats,
}

/// Scan-out pipeline from framebuffer memory to display samples
pub struct VideoOut<M: MemoryBus> {
    core: VideoOutCore<M>,
    driver: Driver,
    clocks: ClockDomains,
    logger: Option<Logger>,
}

impl<M: MemoryBus> VideoOut<M> {
    /// Assemble a pipeline
    ///
    /// # Arguments
    /// * `program` - Geometry source
    /// * `memory` - Framebuffer memory collaborator
    /// * `layout` - How pixels sit in a bus word
    /// * `port` - DMA port to read
    /// * `fifo_depth` - Beats buffered between the clock domains
    /// * `clocks` - Memory-side and display-side clock rates
    pub fn new(
        program: FrameProgram,
        memory: M,
        layout: PixelLayout,
        port: usize,
        fifo_depth: usize,
        clocks: ClockDomains,
    ) -> Self {
        VideoOut {
            core: VideoOutCore::new(program, memory, layout, port),
            driver: Driver::new(fifo_depth),
            clocks,
            logger: None,
        }
    }

    /// Assemble a pipeline from a validated configuration
    ///
    /// # Errors
    /// Returns the first configuration constraint that does not hold
    pub fn from_config(config: &ScanoutConfig, memory: M) -> Result<Self, ConfigError> {
        let geometry = config.frame_geometry()?;
        let layout = PixelLayout::new(config.bus.width, config.bus.lane_order);
        log::info!(
            "video out: {}x{} from port {}, {}-bit bus, {} pixels per word",
            geometry.horizontal.res,
            geometry.vertical.res,
            config.framebuffer.port,
            config.bus.width,
            layout.pack_factor()
        );
        Ok(Self::new(
            FrameProgram::running(geometry),
            memory,
            layout,
            config.framebuffer.port,
            config.fifo_depth,
            ClockDomains::new(config.bus.sys_clock_hz, config.timing.pixel_clock_hz),
        ))
    }

    /// Memory-side half
    pub fn core(&self) -> &VideoOutCore<M> {
        &self.core
    }

    /// Memory-side half, for reprogramming and memory access
    pub fn core_mut(&mut self) -> &mut VideoOutCore<M> {
        &mut self.core
    }

    /// Display-side half
    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Attach a signal trace logger
    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = Some(logger);
    }

    /// Detach and return the signal trace logger
    pub fn take_logger(&mut self) -> Option<Logger> {
        self.logger.take()
    }

    /// Counters so far
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            sys_edges: self.clocks.sys_edges(),
            pix_edges: self.clocks.pix_edges(),
            core: self.core.stats(),
            driver: self.driver.stats(),
        }
    }

    /// Advance to the next clock edge and run whichever domains rise on it
    pub fn step<S: PhySink>(&mut self, sink: &mut S) -> Edges {
        let edges = self.clocks.advance();

        if edges.sys {
            let ready = self.driver.sink_ready();
            let before = self.core.stats().timing_steps;
            let beat = self.core.step(ready);
            if self.core.stats().timing_steps != before {
                self.trace_timing();
            }
            self.driver.tick_write(beat);
        }
        if edges.pix {
            let sample = self.driver.tick_read();
            if let Some(logger) = self.logger.as_mut() {
                logger.log_output(self.clocks.pix_edges(), &sample);
            }
            sink.accept(&sample);
        }
        edges
    }

    fn trace_timing(&mut self) {
        let Some(logger) = self.logger.as_mut() else {
            return;
        };
        if logger.is_timing_trace_enabled() {
            let snapshot = TimingSnapshot::capture(self.core.timing());
            logger.log_timing(&snapshot);
        }
    }

    /// Run until `frames` more frames have left the display side
    ///
    /// Gives up after `max_edges` scheduler ticks.
    ///
    /// # Returns
    /// Whether the requested frames were produced
    pub fn run_frames<S: PhySink>(
        &mut self,
        frames: u64,
        sink: &mut S,
        max_edges: u64,
    ) -> bool {
        let target = self.driver.stats().frames_out + frames;
        for _ in 0..max_edges {
            if self.driver.stats().frames_out >= target {
                return true;
            }
            self.step(sink);
        }
        let done = self.driver.stats().frames_out >= target;
        if !done {
            log::warn!(
                "video out: stopped after {} edges with {} of {} frames",
                max_edges,
                self.driver.stats().frames_out,
                target
            );
            if let Some(logger) = self.logger.as_mut() {
                logger.log_message(LogLevel::Warning, "run stopped before frame target".into());
            }
        }
        done
    }
}

#[cfg(test)]
mod tests;
