//! Pipeline tests across both clock domains

use super::*;
use crate::cast::{LaneOrder, PixelSample};
use crate::config::VideoMode;
use crate::dma::SimMemory;
use crate::driver::{Rgb, VideoSample};
use crate::pattern;

// ========================================
// Helpers
// ========================================

fn test_config() -> ScanoutConfig {
    let mut config = ScanoutConfig::for_mode(&VideoMode::TEST_16X8);
    config.bus.sys_clock_hz = 2_000_000;
    config.fifo_depth = 16;
    config
}

fn pipeline(config: &ScanoutConfig) -> VideoOut<SimMemory> {
    let layout = PixelLayout::new(config.bus.width, config.bus.lane_order);
    let mut memory = SimMemory::new(config.memory_words()).with_latency(config.bus.memory_latency);
    let pixels = pattern::colour_bars(16, 8);
    pattern::load_pixels(&mut memory, &layout, 0, &pixels);
    VideoOut::from_config(config, memory).expect("valid config")
}

// ========================================
// Tests
// ========================================

#[test]
fn test_run_frames_stops_on_final_pixel() {
    let config = test_config();
    let mut video = pipeline(&config);
    let mut out: Vec<VideoSample> = Vec::new();

    assert!(video.run_frames(2, &mut out, 100_000));
    assert_eq!(out.iter().filter(|s| s.de).count(), 2 * 16 * 8);
    assert_eq!(video.stats().driver.frames_out, 2);
    assert_eq!(video.stats().driver.underflow_samples, 0);
}

#[test]
fn test_colour_bars_reach_the_output() {
    let config = test_config();
    let mut video = pipeline(&config);
    let mut out: Vec<VideoSample> = Vec::new();
    video.run_frames(1, &mut out, 100_000);

    let active: Vec<Rgb> = out.iter().filter(|s| s.de).map(|s| s.rgb()).collect();
    for (i, rgb) in active.iter().enumerate() {
        let x = (i % 16) as u32;
        assert_eq!(*rgb, pattern::colour_bar_rgb(x, 16), "pixel {}", i);
    }
}

#[test]
fn test_display_side_line_length() {
    let config = test_config();
    let mut video = pipeline(&config);
    let mut out: Vec<VideoSample> = Vec::new();
    video.run_frames(2, &mut out, 100_000);

    let rises: Vec<usize> = (1..out.len())
        .filter(|&i| out[i].hsync && !out[i - 1].hsync)
        .collect();
    assert!(rises.len() > 2);
    for pair in rises.windows(2) {
        assert_eq!(pair[1] - pair[0], 24);
    }
}

#[test]
fn test_equal_clocks_keep_up() {
    let mut config = test_config();
    config.bus.sys_clock_hz = config.timing.pixel_clock_hz;
    let mut video = pipeline(&config);
    let mut out: Vec<VideoSample> = Vec::new();

    assert!(video.run_frames(3, &mut out, 100_000));
    assert_eq!(video.stats().driver.underflow_samples, 0);
}

#[test]
fn test_fast_memory_clock_fills_fifo() {
    let mut config = test_config();
    config.bus.sys_clock_hz = 8_000_000;
    let mut video = pipeline(&config);
    let mut out: Vec<VideoSample> = Vec::new();
    video.run_frames(2, &mut out, 100_000);

    let stats = video.stats();
    assert_eq!(stats.driver.fifo_high_water, 16);
    assert_eq!(stats.driver.beats_dropped, 0);
    assert!(stats.sys_edges > stats.pix_edges);
}

#[test]
fn test_trace_records_timing_and_output() {
    let config = test_config();
    let mut video = pipeline(&config);
    let logger = Logger::new()
        .with_level(LogLevel::Trace)
        .trace_timing()
        .trace_output()
        .keep_last(0);
    video.set_logger(logger);

    let mut out: Vec<VideoSample> = Vec::new();
    video.run_frames(1, &mut out, 100_000);

    let logger = video.take_logger().expect("logger");
    let timing = logger
        .entries()
        .filter(|e| matches!(e, crate::debug::TraceEntry::Timing(_)))
        .count();
    let output = logger
        .entries()
        .filter(|e| matches!(e, crate::debug::TraceEntry::Output { .. }))
        .count();
    assert_eq!(timing as u64, video.stats().core.timing_steps);
    assert_eq!(output, out.len());
}

#[test]
fn test_reprogram_takes_effect_on_next_frame() {
    let config = test_config();
    let mut video = pipeline(&config);
    let mut out: Vec<VideoSample> = Vec::new();
    video.run_frames(1, &mut out, 100_000);

    let mut geometry = config.frame_geometry().expect("geometry");
    geometry.horizontal.sync_start = 16;
    geometry.horizontal.sync_end = 22;
    video.core_mut().program_mut().program(geometry);

    let mut later: Vec<VideoSample> = Vec::new();
    video.run_frames(3, &mut later, 100_000);
    let widest = later
        .split(|s| !s.hsync)
        .map(<[VideoSample]>::len)
        .max()
        .unwrap_or(0);
    assert_eq!(widest, 6);
}

#[test]
fn test_from_config_rejects_invalid() {
    let mut config = test_config();
    config.framebuffer.port = 1;
    let memory = SimMemory::new(8);
    assert!(VideoOut::from_config(&config, memory).is_err());
}

#[test]
fn test_high_first_lane_order() {
    let mut config = test_config();
    config.bus.lane_order = LaneOrder::HighFirst;
    let layout = PixelLayout::new(config.bus.width, config.bus.lane_order);
    let mut memory = SimMemory::new(config.memory_words());
    let pixels: Vec<PixelSample> = (0..128u8)
        .map(|i| PixelSample::from_ycbcr(16 + i, 128))
        .collect();
    pattern::load_pixels(&mut memory, &layout, 0, &pixels);
    let mut video = VideoOut::from_config(&config, memory).expect("valid config");

    let mut out: Vec<VideoSample> = Vec::new();
    video.run_frames(1, &mut out, 100_000);
    let greys: Vec<u8> = out.iter().filter(|s| s.de).map(|s| s.g).collect();
    assert_eq!(greys.len(), 128);
    assert!(greys.windows(2).all(|w| w[0] <= w[1]), "luma ramp stays in order");
}
