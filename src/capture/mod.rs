// Capture module - display-side frame reconstruction
//
// `FrameCapture` sits where a monitor would and rebuilds frames from the
// physical signals alone: a rising vsync closes the frame in progress, a rising
// data enable starts a new line. Streams without a vsync pulse still split into
// frames: a data enable run resuming after more than one line period of
// blanking starts a new frame. Besides the pixels it measures the geometry a
// display would perceive, which is how misaligned side signals show up.

mod screenshot;

pub use screenshot::{save_png, save_screenshot, CaptureError};

use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::driver::{PhySink, Rgb, SideSignals, VideoSample};

/// Complete frames kept by default
const DEFAULT_RETAIN: usize = 4;

/// Lines a frame may gather before it is closed regardless of sync
pub const MAX_LINES_IN_PROGRESS: usize = 4096;

/// Geometry as seen from the display side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PerceivedGeometry {
    /// Pixels in the first active line
    pub width: u32,
    /// Active lines
    pub height: u32,
    /// Whether every active line had the same length
    pub uniform: bool,
    /// Edges between hsync rising edges
    pub hsync_period: Option<u64>,
    /// Edges hsync stayed high
    pub hsync_width: Option<u64>,
    /// Edges between this frame's vsync and the previous one
    pub frame_period: Option<u64>,
}

/// One frame rebuilt from the output signals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    /// Frames completed before this one
    pub index: u64,
    /// Geometry measured while capturing
    pub geometry: PerceivedGeometry,
    /// Active lines, top to bottom
    pub lines: Vec<Vec<Rgb>>,
}

impl CapturedFrame {
    /// Widest line in pixels
    pub fn width(&self) -> u32 {
        self.lines.iter().map(Vec::len).max().unwrap_or(0) as u32
    }

    /// Number of lines
    pub fn height(&self) -> u32 {
        self.lines.len() as u32
    }

    /// Pixel at `(x, y)`, if that line reached it
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        self.lines.get(y).and_then(|line| line.get(x)).copied()
    }

    /// Row-major RGB888 bytes, short lines padded with black
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let width = self.width() as usize;
        let mut data = Vec::with_capacity(width * self.lines.len() * 3);
        for line in &self.lines {
            for x in 0..width {
                let px = line.get(x).copied().unwrap_or(Rgb::BLACK);
                data.extend_from_slice(&[px.r, px.g, px.b]);
            }
        }
        data
    }
}

/// Monitor model collecting frames from a `PhySink` stream
#[derive(Debug, Clone)]
pub struct FrameCapture {
    previous: SideSignals,
    edge: u64,
    lines: Vec<Vec<Rgb>>,
    line: Vec<Rgb>,
    last_hsync_rise: Option<u64>,
    hsync_period: Option<u64>,
    hsync_width: Option<u64>,
    last_vsync_rise: Option<u64>,
    frame_period: Option<u64>,
    last_de_rise: Option<u64>,
    line_period: Option<u64>,
    completed: VecDeque<CapturedFrame>,
    frames: u64,
    retain: usize,
}

impl FrameCapture {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETAIN)
    }

    /// Create a capture keeping the last `retain` complete frames (at least one)
    pub fn with_retention(retain: usize) -> Self {
        FrameCapture {
            previous: SideSignals::default(),
            edge: 0,
            lines: Vec::new(),
            line: Vec::new(),
            last_hsync_rise: None,
            hsync_period: None,
            hsync_width: None,
            last_vsync_rise: None,
            frame_period: None,
            last_de_rise: None,
            line_period: None,
            completed: VecDeque::new(),
            frames: 0,
            retain: retain.max(1),
        }
    }

    /// Frames completed so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Samples seen so far
    pub fn samples(&self) -> u64 {
        self.edge
    }

    /// Most recent complete frame
    pub fn last_frame(&self) -> Option<&CapturedFrame> {
        self.completed.back()
    }

    /// Retained complete frames, oldest first
    pub fn retained(&self) -> impl Iterator<Item = &CapturedFrame> {
        self.completed.iter()
    }

    /// Lines gathered for the frame in progress
    pub fn lines_in_progress(&self) -> usize {
        self.lines.len()
    }

    /// Save the most recent complete frame as a timestamped PNG
    pub fn save_last(&self, directory: &Path) -> Result<PathBuf, CaptureError> {
        let frame = self.last_frame().ok_or(CaptureError::NoFrame)?;
        save_screenshot(frame, directory)
    }

    fn push_line(&mut self) {
        if !self.line.is_empty() {
            self.lines.push(std::mem::take(&mut self.line));
        }
    }

    fn close_line(&mut self) {
        self.push_line();
        if self.lines.len() >= MAX_LINES_IN_PROGRESS {
            log::warn!(
                "capture: {} lines without a frame boundary, closing frame {}",
                self.lines.len(),
                self.frames
            );
            self.close_frame();
        }
    }

    // A data enable run starting more than half a line later than the
    // measured line period is the first line after vertical blanking
    fn start_line(&mut self) {
        let gap = self.last_de_rise.map(|rise| self.edge - rise);
        self.last_de_rise = Some(self.edge);
        let Some(gap) = gap else {
            return;
        };
        match self.line_period {
            Some(period) if gap > period + period / 2 => self.close_frame(),
            _ => self.line_period = Some(gap),
        }
    }

    fn close_frame(&mut self) {
        self.push_line();
        if self.lines.is_empty() {
            return;
        }
        let lines = std::mem::take(&mut self.lines);
        let width = lines.first().map(Vec::len).unwrap_or(0);
        let geometry = PerceivedGeometry {
            width: width as u32,
            height: lines.len() as u32,
            uniform: lines.iter().all(|l| l.len() == width),
            hsync_period: self.hsync_period,
            hsync_width: self.hsync_width,
            frame_period: self.frame_period,
        };
        log::debug!(
            "capture: frame {} is {}x{}",
            self.frames,
            geometry.width,
            geometry.height
        );

        self.completed.push_back(CapturedFrame {
            index: self.frames,
            geometry,
            lines,
        });
        while self.completed.len() > self.retain {
            self.completed.pop_front();
        }
        self.frames += 1;
    }
}

impl Default for FrameCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl PhySink for FrameCapture {
    fn accept(&mut self, sample: &VideoSample) {
        let side = sample.side();
        let prev = self.previous;

        if side.hsync && !prev.hsync {
            if let Some(rise) = self.last_hsync_rise {
                self.hsync_period = Some(self.edge - rise);
            }
            self.last_hsync_rise = Some(self.edge);
        }
        if !side.hsync && prev.hsync {
            if let Some(rise) = self.last_hsync_rise {
                self.hsync_width = Some(self.edge - rise);
            }
        }

        if side.vsync && !prev.vsync {
            if let Some(rise) = self.last_vsync_rise {
                self.frame_period = Some(self.edge - rise);
            }
            self.last_vsync_rise = Some(self.edge);
            self.close_frame();
        }

        if side.de && !prev.de {
            self.close_line();
            self.start_line();
        }
        if side.de {
            self.line.push(sample.rgb());
        } else if prev.de {
            self.close_line();
        }

        self.previous = side;
        self.edge += 1;
    }
}
