//! Timing generator unit tests
//!
//! This module contains the tests for the raster state machine, organized by
//! functionality.

use super::*;
use crate::geometry::FrameProgram;

// ========================================
// Test Geometries
// ========================================

/// 4x2 active inside a 7x4 raster
pub(crate) fn small_geometry() -> FrameGeometry {
    FrameGeometry::new(
        ScanTiming::new(4, 1, 2, 6),
        ScanTiming::new(2, 0, 1, 3),
        0,
        4,
    )
}

/// 640x480 at 60 Hz, one pixel per step
pub(crate) fn vga_geometry() -> FrameGeometry {
    FrameGeometry::new(
        ScanTiming::new(640, 656, 752, 799),
        ScanTiming::new(480, 490, 492, 524),
        0,
        640 * 480 / 2,
    )
}

// ========================================
// Test Harness
// ========================================

/// Drives a generator with an always-available pixel source
///
/// Pixels are numbered in the order they are consumed, so tests can check that
/// none is skipped or repeated.
pub(crate) struct Harness {
    pub(crate) generator: TimingGenerator,
    pub(crate) program: FrameProgram,
    pub(crate) pixels_consumed: u16,
    pub(crate) pixel_available: bool,
}

impl Harness {
    pub(crate) fn new(geometry: FrameGeometry) -> Self {
        Harness {
            generator: TimingGenerator::new(),
            program: FrameProgram::running(geometry),
            pixels_consumed: 0,
            pixel_available: true,
        }
    }

    /// Run one step and return the element transferred downstream, if any
    pub(crate) fn step(&mut self, ready: bool) -> Option<StreamElement<TimedPixel>> {
        let token = self.program.token();
        let pixel = self
            .pixel_available
            .then(|| StreamElement::new(PixelSample(self.pixels_consumed)));

        let offered = self.generator.source(token.as_ref(), pixel.as_ref());
        let pixel_ready = self.generator.pixel_ready(token.as_ref(), ready);
        if pixel_ready && pixel.is_some() {
            self.pixels_consumed = self.pixels_consumed.wrapping_add(1);
        }
        self.generator.tick(token.as_ref(), pixel.as_ref(), ready);

        if ready {
            offered
        } else {
            None
        }
    }

    /// Run `steps` always-ready steps and collect the output
    pub(crate) fn run(&mut self, steps: u64) -> Vec<StreamElement<TimedPixel>> {
        (0..steps).filter_map(|_| self.step(true)).collect()
    }

    /// Collect exactly one frame starting at the current frame start
    pub(crate) fn frame(&mut self) -> Vec<StreamElement<TimedPixel>> {
        let mut out = Vec::new();
        loop {
            if let Some(e) = self.step(true) {
                let last = e.last;
                out.push(e);
                if last {
                    return out;
                }
            }
        }
    }
}

// ========================================
// Test Modules
// ========================================
