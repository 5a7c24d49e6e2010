// Frame geometry - the parameter set that describes one video frame
//
// A `FrameGeometry` is produced once per configuration change and never mutated
// afterwards. `FrameProgram` republishes the current geometry as a token on every
// step for as long as it is enabled, so the address sequencer and the timing
// generator can each read it independently through their own `Rc` handle.

use std::rc::Rc;

/// Horizontal or vertical scan parameters
///
/// All values are counter positions. A scan runs from position 0 to `scan`
/// inclusive; positions `[0, res)` are active and `[sync_start, sync_end)` carry
/// the sync pulse. Callers keep `res <= scan` and
/// `sync_start <= sync_end <= scan`; nothing here enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanTiming {
    /// Active resolution
    pub res: u32,
    /// First position of the sync pulse
    pub sync_start: u32,
    /// First position after the sync pulse
    pub sync_end: u32,
    /// Last counter position before wrapping to 0
    pub scan: u32,
}

impl ScanTiming {
    /// Create scan parameters
    pub const fn new(res: u32, sync_start: u32, sync_end: u32, scan: u32) -> Self {
        ScanTiming {
            res,
            sync_start,
            sync_end,
            scan,
        }
    }

    /// Number of counter positions in one scan (`scan + 1`)
    pub fn total(&self) -> u64 {
        self.scan as u64 + 1
    }

    /// Whether the ordering invariant holds
    pub fn is_ordered(&self) -> bool {
        self.res <= self.scan && self.sync_start <= self.sync_end && self.sync_end <= self.scan
    }
}

/// Memory window read for one DMA port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaDescriptor {
    /// First bus-word address
    pub offset: u32,
    /// Number of bus words in the window
    pub maximum: u32,
}

/// Complete description of one frame
///
/// Horizontal values are in timing-generator steps (one pixel per step),
/// memory values are in bus words. One base address exists per DMA port; all
/// ports share the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameGeometry {
    /// Horizontal scan parameters
    pub horizontal: ScanTiming,
    /// Vertical scan parameters
    pub vertical: ScanTiming,
    /// Framebuffer base address, one per DMA port
    pub memory_base: Vec<u32>,
    /// Framebuffer length in bus words
    pub memory_length: u32,
}

impl FrameGeometry {
    /// Create a geometry backed by a single DMA port
    pub fn new(
        horizontal: ScanTiming,
        vertical: ScanTiming,
        memory_base: u32,
        memory_length: u32,
    ) -> Self {
        FrameGeometry {
            horizontal,
            vertical,
            memory_base: vec![memory_base],
            memory_length,
        }
    }

    /// Replace the per-port base addresses
    pub fn with_ports(mut self, memory_base: Vec<u32>) -> Self {
        self.memory_base = memory_base;
        self
    }

    /// Number of DMA ports backing this frame
    pub fn ports(&self) -> usize {
        self.memory_base.len()
    }

    /// Read window for a DMA port, `None` if the port does not exist
    pub fn dma_descriptor(&self, port: usize) -> Option<DmaDescriptor> {
        self.memory_base.get(port).map(|&offset| DmaDescriptor {
            offset,
            maximum: self.memory_length,
        })
    }

    /// Steps in one complete frame, blanking included
    pub fn steps_per_frame(&self) -> u64 {
        self.horizontal.total() * self.vertical.total()
    }

    /// Active pixels in one frame
    pub fn active_pixels(&self) -> u64 {
        self.horizontal.res as u64 * self.vertical.res as u64
    }
}

/// Republishes one `FrameGeometry` as a continuously available token
///
/// The token is valid while the program is enabled and a geometry has been
/// programmed. Replacing the geometry swaps the `Rc`; consumers that already
/// hold the previous handle keep seeing the old value.
#[derive(Debug, Default)]
pub struct FrameProgram {
    geometry: Option<Rc<FrameGeometry>>,
    enabled: bool,
    revision: u64,
}

impl FrameProgram {
    /// Create an empty, disabled program
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an enabled program publishing `geometry`
    pub fn running(geometry: FrameGeometry) -> Self {
        let mut program = Self::new();
        program.program(geometry);
        program.enable();
        program
    }

    /// Replace the published geometry
    pub fn program(&mut self, geometry: FrameGeometry) {
        self.geometry = Some(Rc::new(geometry));
        self.revision += 1;
    }

    /// Start publishing the token
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Stop publishing the token
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Whether the token is currently published
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of times a geometry has been programmed
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The token offered this step
    pub fn token(&self) -> Option<Rc<FrameGeometry>> {
        if self.enabled {
            self.geometry.clone()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> FrameGeometry {
        FrameGeometry::new(
            ScanTiming::new(4, 1, 2, 6),
            ScanTiming::new(2, 0, 1, 3),
            0x100,
            4,
        )
    }

    #[test]
    fn test_scan_timing_totals() {
        let g = small();
        assert_eq!(g.horizontal.total(), 7);
        assert_eq!(g.vertical.total(), 4);
        assert_eq!(g.steps_per_frame(), 28);
        assert_eq!(g.active_pixels(), 8);
        assert!(g.horizontal.is_ordered());
        assert!(!ScanTiming::new(4, 3, 2, 6).is_ordered());
    }

    #[test]
    fn test_dma_descriptor_per_port() {
        let g = small().with_ports(vec![0x100, 0x800]);
        assert_eq!(g.ports(), 2);
        assert_eq!(
            g.dma_descriptor(1),
            Some(DmaDescriptor {
                offset: 0x800,
                maximum: 4
            })
        );
        assert_eq!(g.dma_descriptor(2), None);
    }

    #[test]
    fn test_program_token_requires_enable() {
        let mut program = FrameProgram::new();
        assert!(program.token().is_none());

        program.program(small());
        assert!(program.token().is_none(), "disabled program publishes nothing");

        program.enable();
        assert_eq!(program.token().as_deref(), Some(&small()));

        program.disable();
        assert!(program.token().is_none());
    }

    #[test]
    fn test_reprogram_leaves_old_handles_intact() {
        let mut program = FrameProgram::running(small());
        let before = program.token().expect("token");

        let mut next = small();
        next.horizontal.res = 2;
        program.program(next);

        assert_eq!(before.horizontal.res, 4);
        assert_eq!(program.token().expect("token").horizontal.res, 2);
        assert_eq!(program.revision(), 2);
    }
}
