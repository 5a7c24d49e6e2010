// Timing generator - horizontal/vertical counters and sync generation
//
// The generator walks a (hcounter, vcounter) raster defined by the current
// `FrameGeometry`. Each accepted step it offers one `TimedPixel` carrying the
// active/sync flags for the current raster position and, inside the active
// region, one pixel taken from the upstream pixel stream.
//
// Register updates are two-phase: `TimingState::next` reads only the pre-step
// snapshot and builds a fresh state, which replaces the old one on commit. No
// comparison ever sees a value written during the same step.
//
// # Step rules (all comparisons on the pre-step snapshot)
//
// ```text
// hcounter == 0           -> hactive on
// hcounter == hres        -> hactive off      (wins over "on" when hres == 0)
// hcounter == hsync_start -> hsync on
// hcounter == hsync_end   -> hsync off        (wins over "on" when equal)
// hcounter == hscan       -> hcounter = 0, vcounter advances or wraps
// vcounter rules mirror the horizontal ones
// ```
//
// The offered element reports the pre-step raster position together with the
// flags committed on that step, so the flags describe the position they were
// derived from.

use std::rc::Rc;

use crate::cast::PixelSample;
use crate::geometry::{FrameGeometry, ScanTiming};
use crate::stream::StreamElement;

/// One step of timed video leaving the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimedPixel {
    /// Pixel payload, `PixelSample::BLANK` outside the active region
    pub pixel: PixelSample,
    /// Active video (data enable)
    pub de: bool,
    /// Horizontal sync
    pub hsync: bool,
    /// Vertical sync
    pub vsync: bool,
    /// Horizontal raster position of this step
    pub h: u32,
    /// Vertical raster position of this step
    pub v: u32,
}

/// Registers owned by the timing generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimingState {
    /// Horizontal counter, in `[0, hscan]`
    pub hcounter: u32,
    /// Vertical counter, in `[0, vscan]`
    pub vcounter: u32,
    /// Inside the horizontal active window
    pub hactive: bool,
    /// Inside the vertical active window
    pub vactive: bool,
    /// Latched horizontal sync output
    pub hsync: bool,
    /// Latched vertical sync output
    pub vsync: bool,
    /// Set for exactly the step that closes a frame
    pub frame_boundary: bool,
}

impl TimingState {
    /// Compute the post-step registers from this snapshot
    pub fn next(&self, h: &ScanTiming, v: &ScanTiming) -> TimingState {
        let mut next = *self;
        next.frame_boundary = false;
        next.hcounter = self.hcounter.wrapping_add(1);

        if self.hcounter == 0 {
            next.hactive = true;
        }
        if self.hcounter == h.res {
            next.hactive = false;
        }
        if self.hcounter == h.sync_start {
            next.hsync = true;
        }
        if self.hcounter == h.sync_end {
            next.hsync = false;
        }
        if self.hcounter == h.scan {
            next.hcounter = 0;
            if self.vcounter == v.scan {
                next.vcounter = 0;
                next.frame_boundary = true;
            } else {
                next.vcounter = self.vcounter + 1;
            }
        }

        if self.vcounter == 0 {
            next.vactive = true;
        }
        if self.vcounter == v.res {
            next.vactive = false;
        }
        if self.vcounter == v.sync_start {
            next.vsync = true;
        }
        if self.vcounter == v.sync_end {
            next.vsync = false;
        }

        next
    }

    /// Active video for this register set
    #[inline]
    pub fn active(&self) -> bool {
        self.hactive && self.vactive
    }
}

/// Raster timing state machine
///
/// A geometry is latched on the first step of every frame (after reset and
/// after each frame boundary) and held until that frame completes, so a
/// replacement published by `FrameProgram` mid-frame takes effect on the next
/// frame only.
#[derive(Debug, Default)]
pub struct TimingGenerator {
    state: TimingState,
    geometry: Option<Rc<FrameGeometry>>,
    frame_open: bool,
    frames: u64,
    steps: u64,
}

impl TimingGenerator {
    /// Create a generator in the reset state
    pub fn new() -> Self {
        Self::default()
    }

    /// Return to the reset state; the next step latches a fresh geometry
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Current registers
    pub fn state(&self) -> &TimingState {
        &self.state
    }

    /// Geometry of the frame in progress (or of the last frame)
    pub fn geometry(&self) -> Option<&Rc<FrameGeometry>> {
        self.geometry.as_ref()
    }

    /// Completed frames since reset
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Accepted steps since reset
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Whether the next step starts a frame and therefore loads the token
    pub fn at_frame_start(&self) -> bool {
        !self.frame_open
    }

    /// Geometry used for this step, if the token is valid
    fn effective<'a>(
        &'a self,
        token: Option<&'a Rc<FrameGeometry>>,
    ) -> Option<&'a Rc<FrameGeometry>> {
        let token = token?;
        if self.frame_open {
            self.geometry.as_ref().or(Some(token))
        } else {
            Some(token)
        }
    }

    /// Whether loading `geometry` replaces the one held from the last frame
    fn is_new_geometry(&self, geometry: &Rc<FrameGeometry>) -> bool {
        match &self.geometry {
            Some(previous) => !Rc::ptr_eq(previous, geometry) && **previous != **geometry,
            None => true,
        }
    }

    /// Registers the step reads: a new geometry starts from the reset state
    fn base_state(&self, geometry: &Rc<FrameGeometry>) -> TimingState {
        if !self.frame_open && self.is_new_geometry(geometry) {
            TimingState::default()
        } else {
            self.state
        }
    }

    fn next_state(&self, geometry: &Rc<FrameGeometry>) -> TimingState {
        self.base_state(geometry)
            .next(&geometry.horizontal, &geometry.vertical)
    }

    /// Whether the current position needs a pixel from upstream
    pub fn wants_pixel(&self, token: Option<&Rc<FrameGeometry>>) -> bool {
        self.effective(token)
            .map(|g| self.next_state(g).active())
            .unwrap_or(false)
    }

    /// Element offered downstream on this step
    ///
    /// `None` when the token is invalid, or when the position is active and no
    /// pixel is offered upstream.
    pub fn source(
        &self,
        token: Option<&Rc<FrameGeometry>>,
        pixel: Option<&StreamElement<PixelSample>>,
    ) -> Option<StreamElement<TimedPixel>> {
        let geometry = self.effective(token)?;
        let base = self.base_state(geometry);
        let next = base.next(&geometry.horizontal, &geometry.vertical);
        let de = next.active();
        let sample = if de {
            pixel?.payload
        } else {
            PixelSample::BLANK
        };

        Some(StreamElement::with_last(
            TimedPixel {
                pixel: sample,
                de,
                hsync: next.hsync,
                vsync: next.vsync,
                h: base.hcounter,
                v: base.vcounter,
            },
            next.frame_boundary,
        ))
    }

    /// Whether the upstream pixel is consumed on this step
    pub fn pixel_ready(&self, token: Option<&Rc<FrameGeometry>>, source_ready: bool) -> bool {
        source_ready && self.wants_pixel(token)
    }

    /// Whether the geometry token is consumed on this step
    pub fn geometry_ready(
        &self,
        token: Option<&Rc<FrameGeometry>>,
        pixel: Option<&StreamElement<PixelSample>>,
        source_ready: bool,
    ) -> bool {
        source_ready && !self.frame_open && self.source(token, pixel).is_some()
    }

    /// Commit one step
    ///
    /// # Arguments
    /// * `token` - Geometry token offered on this step
    /// * `pixel` - Pixel offered upstream on this step
    /// * `source_ready` - Whether the consumer accepts the offered element
    pub fn tick(
        &mut self,
        token: Option<&Rc<FrameGeometry>>,
        pixel: Option<&StreamElement<PixelSample>>,
        source_ready: bool,
    ) {
        if !source_ready || self.source(token, pixel).is_none() {
            return;
        }
        let Some(geometry) = self.effective(token).cloned() else {
            return;
        };

        let next = self.next_state(&geometry);
        if !self.frame_open {
            self.load(geometry);
        }
        self.state = next;
        self.steps += 1;

        if next.frame_boundary {
            self.frame_open = false;
            self.frames += 1;
        }
    }

    fn load(&mut self, geometry: Rc<FrameGeometry>) {
        if self.is_new_geometry(&geometry) {
            log::info!(
                "timing: loading {}x{} frame ({}x{} total)",
                geometry.horizontal.res,
                geometry.vertical.res,
                geometry.horizontal.total(),
                geometry.vertical.total()
            );
        }
        self.geometry = Some(geometry);
        self.frame_open = true;
    }
}

#[cfg(test)]
mod tests;
