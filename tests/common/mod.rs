// Common test utilities for end-to-end scan-out tests
//
// This module provides shared setup for running the complete pipeline on the
// small test raster and the expected signal levels for every raster position.

#![allow(dead_code)]

use scanout::config::{ScanoutConfig, VideoMode};
use scanout::driver::SideSignals;
use scanout::{pattern, PixelLayout, ScanTiming, SimMemory, VideoOut};

/// Upper bound on scheduler edges for any single run
pub const MAX_EDGES: u64 = 200_000;

/// Test raster with a memory clock twice the pixel clock
pub fn test_config() -> ScanoutConfig {
    let mut config = ScanoutConfig::for_mode(&VideoMode::TEST_16X8);
    config.bus.sys_clock_hz = 2_000_000;
    config.fifo_depth = 16;
    config
}

/// Pixel layout described by `config`
pub fn layout(config: &ScanoutConfig) -> PixelLayout {
    PixelLayout::new(config.bus.width, config.bus.lane_order)
}

/// Memory of `words` bus words with colour bars at address 0
pub fn colour_bar_memory(config: &ScanoutConfig, words: usize) -> SimMemory {
    let mut memory = SimMemory::new(words)
        .with_latency(config.bus.memory_latency)
        .with_max_outstanding(config.bus.max_outstanding);
    let h = config.timing.horizontal.res;
    let v = config.timing.vertical.res;
    pattern::load_pixels(&mut memory, &layout(config), 0, &pattern::colour_bars(h, v));
    memory
}

/// Complete pipeline showing colour bars
pub fn pipeline(config: &ScanoutConfig) -> VideoOut<SimMemory> {
    let memory = colour_bar_memory(config, config.memory_words());
    VideoOut::from_config(config, memory).expect("test config is valid")
}

/// Side signals a display should see at raster position `(h, v)`
pub fn expected_side(h_timing: &ScanTiming, v_timing: &ScanTiming, h: u32, v: u32) -> SideSignals {
    SideSignals {
        de: h < h_timing.res && v < v_timing.res,
        hsync: h_timing.sync_start <= h && h < h_timing.sync_end,
        vsync: v_timing.sync_start <= v && v < v_timing.sync_end,
    }
}

/// Raster positions of one frame in scan order
pub fn raster(h_timing: &ScanTiming, v_timing: &ScanTiming) -> Vec<(u32, u32)> {
    (0..=v_timing.scan)
        .flat_map(|v| (0..=h_timing.scan).map(move |h| (h, v)))
        .collect()
}
