// Timing snapshot - point-in-time view of the raster state machine

use std::fmt;

use crate::timing::TimingGenerator;

/// Timing generator state snapshot
///
/// Contains the registers and counters of the timing generator at a specific
/// step, plus the size of the geometry it is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSnapshot {
    /// Accepted steps since reset
    pub step: u64,

    /// Completed frames since reset
    pub frame: u64,

    /// Horizontal counter
    pub hcounter: u32,

    /// Vertical counter
    pub vcounter: u32,

    /// Inside the horizontal active window
    pub hactive: bool,

    /// Inside the vertical active window
    pub vactive: bool,

    /// Horizontal sync output
    pub hsync: bool,

    /// Vertical sync output
    pub vsync: bool,

    /// Frame boundary pulse
    pub frame_boundary: bool,

    /// Active size of the running geometry, if one is loaded
    pub active_size: Option<(u32, u32)>,
}

impl TimingSnapshot {
    /// Capture the current state of `timing`
    pub fn capture(timing: &TimingGenerator) -> Self {
        let state = timing.state();
        TimingSnapshot {
            step: timing.steps(),
            frame: timing.frames(),
            hcounter: state.hcounter,
            vcounter: state.vcounter,
            hactive: state.hactive,
            vactive: state.vactive,
            hsync: state.hsync,
            vsync: state.vsync,
            frame_boundary: state.frame_boundary,
            active_size: timing
                .geometry()
                .map(|g| (g.horizontal.res, g.vertical.res)),
        }
    }

    /// Format the flag registers
    ///
    /// # Returns
    ///
    /// A string with one mnemonic per asserted flag, or `-` if none
    pub fn format_flags(&self) -> String {
        let mut flags = Vec::new();

        if self.hactive && self.vactive {
            flags.push("DE");
        } else {
            if self.hactive {
                flags.push("HACT");
            }
            if self.vactive {
                flags.push("VACT");
            }
        }
        if self.hsync {
            flags.push("HS");
        }
        if self.vsync {
            flags.push("VS");
        }
        if self.frame_boundary {
            flags.push("LAST");
        }

        if flags.is_empty() {
            "-".to_string()
        } else {
            flags.join(" ")
        }
    }
}

impl fmt::Display for TimingSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step:{:>8} frame:{:>4} h:{:>5} v:{:>5} [{}]",
            self.step,
            self.frame,
            self.hcounter,
            self.vcounter,
            self.format_flags()
        )?;
        if let Some((w, h)) = self.active_size {
            write!(f, " {}x{}", w, h)?;
        }
        Ok(())
    }
}
