// Configuration management
//
// Loads and saves the scan-out configuration as TOML, provides the standard
// video mode presets, and validates a configuration before turning it into the
// `FrameGeometry` the pipeline runs on.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use crate::cast::{LaneOrder, BITS_PER_PIXEL};
use crate::dma::Word;
use crate::geometry::{FrameGeometry, ScanTiming};

/// Default configuration file path
pub const DEFAULT_CONFIG_FILE: &str = "scanout.toml";

/// Errors that can occur while loading or validating a configuration
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error
    Io(io::Error),

    /// TOML parse error
    Parse(toml::de::Error),

    /// TOML serialization error
    Serialize(toml::ser::Error),

    /// Timing or clock parameters that cannot produce a valid raster
    InvalidTiming(String),

    /// Values that do not line up with the bus or pixel packing
    Misaligned(String),

    /// Framebuffer ports that do not exist
    InvalidFramebuffer(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::Parse(e) => write!(f, "TOML parse error: {}", e),
            ConfigError::Serialize(e) => write!(f, "TOML serialization error: {}", e),
            ConfigError::InvalidTiming(msg) => write!(f, "Invalid timing: {}", msg),
            ConfigError::Misaligned(msg) => write!(f, "Misaligned value: {}", msg),
            ConfigError::InvalidFramebuffer(msg) => write!(f, "Invalid framebuffer: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Serialize(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(e: toml::ser::Error) -> Self {
        ConfigError::Serialize(e)
    }
}

/// A named display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoMode {
    /// Preset name, as accepted on the command line
    pub name: &'static str,
    /// Pixel clock in Hz
    pub pixel_clock_hz: u64,
    /// Horizontal timing in pixels
    pub horizontal: ScanTiming,
    /// Vertical timing in lines
    pub vertical: ScanTiming,
}

impl VideoMode {
    /// 640x480 at 60 Hz
    pub const VGA_640X480_60: VideoMode = VideoMode {
        name: "640x480@60",
        pixel_clock_hz: 25_175_000,
        horizontal: ScanTiming::new(640, 656, 752, 799),
        vertical: ScanTiming::new(480, 490, 492, 524),
    };

    /// 800x600 at 60 Hz
    pub const SVGA_800X600_60: VideoMode = VideoMode {
        name: "800x600@60",
        pixel_clock_hz: 40_000_000,
        horizontal: ScanTiming::new(800, 840, 968, 1055),
        vertical: ScanTiming::new(600, 601, 605, 627),
    };

    /// 1280x720 at 60 Hz
    pub const HD_1280X720_60: VideoMode = VideoMode {
        name: "1280x720@60",
        pixel_clock_hz: 74_250_000,
        horizontal: ScanTiming::new(1280, 1390, 1430, 1649),
        vertical: ScanTiming::new(720, 725, 730, 749),
    };

    /// 16x8 raster for quick runs and tests
    pub const TEST_16X8: VideoMode = VideoMode {
        name: "test",
        pixel_clock_hz: 1_000_000,
        horizontal: ScanTiming::new(16, 18, 20, 23),
        vertical: ScanTiming::new(8, 9, 10, 11),
    };

    /// All presets
    pub const ALL: [VideoMode; 4] = [
        Self::VGA_640X480_60,
        Self::SVGA_800X600_60,
        Self::HD_1280X720_60,
        Self::TEST_16X8,
    ];

    /// Look up a preset by name
    pub fn by_name(name: &str) -> Option<VideoMode> {
        Self::ALL.iter().copied().find(|mode| mode.name == name)
    }

    /// Refresh rate in Hz
    pub fn refresh_hz(&self) -> f64 {
        let steps = self.horizontal.total() * self.vertical.total();
        self.pixel_clock_hz as f64 / steps as f64
    }
}

/// Raster timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Pixel clock in Hz
    pub pixel_clock_hz: u64,

    /// Horizontal: active, sync start, sync end, last position (pixels)
    pub horizontal: ScanTimingConfig,

    /// Vertical: active, sync start, sync end, last position (lines)
    pub vertical: ScanTimingConfig,
}

/// One axis of raster timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTimingConfig {
    pub res: u32,
    pub sync_start: u32,
    pub sync_end: u32,
    pub scan: u32,
}

impl From<ScanTiming> for ScanTimingConfig {
    fn from(t: ScanTiming) -> Self {
        ScanTimingConfig {
            res: t.res,
            sync_start: t.sync_start,
            sync_end: t.sync_end,
            scan: t.scan,
        }
    }
}

impl From<ScanTimingConfig> for ScanTiming {
    fn from(t: ScanTimingConfig) -> Self {
        ScanTiming::new(t.res, t.sync_start, t.sync_end, t.scan)
    }
}

/// Memory bus configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Data width in bits (16 to 128, multiple of the pixel size)
    pub width: u32,

    /// Order in which pixels are taken out of a word
    pub lane_order: LaneOrder,

    /// Memory-side clock in Hz
    pub sys_clock_hz: u64,

    /// Read latency of the simulated memory, in memory-side edges
    pub memory_latency: u32,

    /// Reads allowed in flight
    pub max_outstanding: usize,
}

/// Framebuffer placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramebufferConfig {
    /// Byte address of the framebuffer for each DMA port
    pub bases: Vec<u32>,

    /// Framebuffer size in bytes, shared by all ports
    pub length: u32,

    /// Port the pipeline reads
    pub port: usize,
}

/// Scan-out configuration
///
/// Stores every setting needed to build and run the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanoutConfig {
    /// Bits per pixel in memory
    pub pixel_bits: u32,

    /// Beats buffered between the clock domains
    pub fifo_depth: usize,

    /// Raster timing
    pub timing: TimingConfig,

    /// Memory bus
    pub bus: BusConfig,

    /// Framebuffer placement
    pub framebuffer: FramebufferConfig,
}

impl Default for ScanoutConfig {
    fn default() -> Self {
        Self::for_mode(&VideoMode::VGA_640X480_60)
    }
}

impl ScanoutConfig {
    /// Configuration for `mode` with a 100 MHz memory clock
    ///
    /// Picks the widest bus up to 64 bits whose pixel packing lines up with
    /// the horizontal timing.
    pub fn for_mode(mode: &VideoMode) -> Self {
        let length = mode.horizontal.res * mode.vertical.res * (BITS_PER_PIXEL / 8);
        let h = mode.horizontal;
        let width = [64, 32]
            .into_iter()
            .find(|&width| {
                let pack = width / BITS_PER_PIXEL;
                [h.res, h.sync_start, h.sync_end, h.scan + 1]
                    .iter()
                    .all(|v| v.is_multiple_of(pack))
            })
            .unwrap_or(BITS_PER_PIXEL);
        ScanoutConfig {
            timing: TimingConfig {
                pixel_clock_hz: mode.pixel_clock_hz,
                horizontal: mode.horizontal.into(),
                vertical: mode.vertical.into(),
            },
            bus: BusConfig {
                width,
                lane_order: LaneOrder::LowFirst,
                sys_clock_hz: 100_000_000,
                memory_latency: 4,
                max_outstanding: 8,
            },
            framebuffer: FramebufferConfig {
                bases: vec![0],
                length,
                port: 0,
            },
            pixel_bits: BITS_PER_PIXEL,
            fifo_depth: crate::driver::DEFAULT_FIFO_DEPTH,
        }
    }

    /// Load configuration from `path`, falling back to the defaults
    ///
    /// If the file doesn't exist or cannot be parsed, the default
    /// configuration is returned and written to `path`.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|e| {
            log::info!("config: using defaults ({})", e);
            let config = Self::default();
            // Try to save the default config, but don't fail if we can't
            let _ = config.save(path);
            config
        })
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Save configuration to a TOML file
    ///
    /// # Example
    ///
    /// ```no_run
    /// use scanout::config::ScanoutConfig;
    ///
    /// let config = ScanoutConfig::default();
    /// config.save("scanout.toml").expect("Failed to save configuration");
    /// ```
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Pixels per bus word
    pub fn pack_factor(&self) -> u32 {
        self.bus.width / self.pixel_bits.max(1)
    }

    fn bytes_per_word(&self) -> u32 {
        self.bus.width / 8
    }

    /// Bus words of simulated memory needed to back every port
    pub fn memory_words(&self) -> usize {
        let end = self
            .framebuffer
            .bases
            .iter()
            .map(|&base| base as u64 + self.framebuffer.length as u64)
            .max()
            .unwrap_or(0);
        let words = end.div_ceil(self.bytes_per_word().max(1) as u64);
        (words as usize).max(1)
    }

    /// Check every constraint the pipeline relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pixel_bits != BITS_PER_PIXEL {
            return Err(ConfigError::Misaligned(format!(
                "{} bits per pixel, only {} is supported",
                self.pixel_bits, BITS_PER_PIXEL
            )));
        }
        let width = self.bus.width;
        let supported = (BITS_PER_PIXEL..=Word::BITS).contains(&width);
        if !supported || !width.is_multiple_of(BITS_PER_PIXEL) {
            return Err(ConfigError::Misaligned(format!(
                "bus width {} must be a multiple of {} between {} and {}",
                width,
                BITS_PER_PIXEL,
                BITS_PER_PIXEL,
                Word::BITS
            )));
        }

        let h: ScanTiming = self.timing.horizontal.into();
        let v: ScanTiming = self.timing.vertical.into();
        for (axis, t) in [("horizontal", h), ("vertical", v)] {
            if !t.is_ordered() {
                return Err(ConfigError::InvalidTiming(format!(
                    "{} timing {:?} must satisfy res <= scan and sync_start <= sync_end <= scan",
                    axis, t
                )));
            }
        }

        let pack = self.pack_factor();
        let fields = [
            ("horizontal res", h.res),
            ("horizontal sync_start", h.sync_start),
            ("horizontal sync_end", h.sync_end),
            ("line length", h.scan + 1),
        ];
        for (name, value) in fields {
            if !value.is_multiple_of(pack) {
                return Err(ConfigError::Misaligned(format!(
                    "{} {} is not a multiple of {} pixels per word",
                    name, value, pack
                )));
            }
        }

        if self.timing.pixel_clock_hz == 0 || self.bus.sys_clock_hz == 0 {
            return Err(ConfigError::InvalidTiming("clock rates must be non-zero".into()));
        }
        if self.bus.sys_clock_hz < self.timing.pixel_clock_hz {
            return Err(ConfigError::InvalidTiming(format!(
                "memory clock {} Hz is slower than pixel clock {} Hz",
                self.bus.sys_clock_hz, self.timing.pixel_clock_hz
            )));
        }
        if self.fifo_depth == 0 {
            return Err(ConfigError::InvalidTiming("fifo_depth must be non-zero".into()));
        }

        let fb = &self.framebuffer;
        if fb.bases.is_empty() {
            return Err(ConfigError::InvalidFramebuffer("no base addresses".into()));
        }
        if fb.port >= fb.bases.len() {
            return Err(ConfigError::InvalidFramebuffer(format!(
                "port {} selected but only {} configured",
                fb.port,
                fb.bases.len()
            )));
        }
        let align = self.bytes_per_word();
        for (port, &base) in fb.bases.iter().enumerate() {
            if !base.is_multiple_of(align) {
                return Err(ConfigError::Misaligned(format!(
                    "port {} base {:#x} is not {}-byte aligned",
                    port, base, align
                )));
            }
        }
        if !fb.length.is_multiple_of(align) {
            return Err(ConfigError::Misaligned(format!(
                "framebuffer length {} is not a multiple of {} bytes",
                fb.length, align
            )));
        }

        let frame_bytes = h.res as u64 * v.res as u64 * (self.pixel_bits / 8) as u64;
        if fb.length as u64 != frame_bytes {
            log::warn!(
                "config: framebuffer holds {} bytes but one frame uses {}",
                fb.length,
                frame_bytes
            );
        }
        Ok(())
    }

    /// Validate and build the geometry the pipeline runs on
    ///
    /// Byte addresses become bus-word addresses; horizontal values stay in
    /// pixels, which is one timing-generator step each.
    pub fn frame_geometry(&self) -> Result<FrameGeometry, ConfigError> {
        self.validate()?;
        let align = self.bytes_per_word();
        let bases = self.framebuffer.bases.iter().map(|&b| b / align).collect();
        Ok(FrameGeometry::new(
            self.timing.horizontal.into(),
            self.timing.vertical.into(),
            0,
            self.framebuffer.length / align,
        )
        .with_ports(bases))
    }
}
