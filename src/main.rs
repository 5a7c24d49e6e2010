// Scan-out - Main Entry Point
//
// Runs the pipeline on a colour-bar framebuffer for a number of frames,
// captures the display output like a monitor would and reports what it saw.

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

use scanout::capture::{FrameCapture, PerceivedGeometry};
use scanout::config::{ScanoutConfig, VideoMode};
use scanout::debug::{LogLevel, Logger};
use scanout::dma::SimMemory;
use scanout::pattern;
use scanout::video_out::{PipelineStats, VideoOut};
use scanout::PixelLayout;

#[derive(Parser)]
#[command(name = "scanout-rs", version)]
#[command(about = "Simulate a framebuffer scan-out pipeline clock edge by clock edge")]
struct Cli {
    /// TOML configuration file (overrides --mode)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Video mode preset
    #[arg(short, long, default_value = "640x480@60")]
    mode: String,

    /// Frames to run
    #[arg(short = 'n', long, default_value_t = 2)]
    frames: u64,

    /// Save the last captured frame as PNG into this directory
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Write a JSON run report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write a signal trace to this file
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Save the effective configuration to this file and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// List the video mode presets and exit
    #[arg(long)]
    list_modes: bool,
}

/// Summary of one run, written by `--report`
#[derive(Debug, Serialize)]
struct RunReport {
    resolution: (u32, u32),
    pixel_clock_hz: u64,
    sys_clock_hz: u64,
    bus_width: u32,
    frames_requested: u64,
    frames_completed: bool,
    frames_captured: u64,
    perceived: Option<PerceivedGeometry>,
    stats: PipelineStats,
    screenshot: Option<PathBuf>,
    elapsed_ms: u64,
}

fn load_config(cli: &Cli) -> Result<ScanoutConfig, Box<dyn std::error::Error>> {
    if let Some(path) = &cli.config {
        return Ok(ScanoutConfig::load(path)?);
    }
    let mode = VideoMode::by_name(&cli.mode)
        .ok_or_else(|| format!("unknown mode '{}' (see --list-modes)", cli.mode))?;
    Ok(ScanoutConfig::for_mode(&mode))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.list_modes {
        for mode in VideoMode::ALL {
            println!(
                "{:<12} {:>5}x{:<5} {:>7.3} MHz {:>6.2} Hz",
                mode.name,
                mode.horizontal.res,
                mode.vertical.res,
                mode.pixel_clock_hz as f64 / 1e6,
                mode.refresh_hz()
            );
        }
        return Ok(());
    }

    let config = load_config(&cli)?;
    if let Some(path) = &cli.write_config {
        config.save(path)?;
        println!("Configuration written to '{}'", path.display());
        return Ok(());
    }

    let geometry = config.frame_geometry()?;
    let (width, height) = (geometry.horizontal.res, geometry.vertical.res);

    println!("Scan-out (scanout-rs) v{}", env!("CARGO_PKG_VERSION"));
    println!("==============================");
    println!(
        "{}x{} active, {}x{} total, {}-bit bus, pixel clock {} Hz, memory clock {} Hz",
        width,
        height,
        geometry.horizontal.total(),
        geometry.vertical.total(),
        config.bus.width,
        config.timing.pixel_clock_hz,
        config.bus.sys_clock_hz
    );

    // Framebuffer with colour bars on the selected port
    let layout = PixelLayout::new(config.bus.width, config.bus.lane_order);
    let mut memory = SimMemory::new(config.memory_words())
        .with_latency(config.bus.memory_latency)
        .with_max_outstanding(config.bus.max_outstanding);
    let base = geometry.memory_base[config.framebuffer.port];
    pattern::load_pixels(
        &mut memory,
        &layout,
        base,
        &pattern::colour_bars(width, height),
    );

    let mut video = VideoOut::from_config(&config, memory)?;
    if let Some(path) = &cli.trace {
        let logger = Logger::new()
            .with_level(LogLevel::Trace)
            .trace_timing()
            .trace_output()
            .keep_last(1)
            .write_to(path)?;
        video.set_logger(logger);
    }

    let ratio = config.bus.sys_clock_hz.div_ceil(config.timing.pixel_clock_hz);
    let max_edges = (cli.frames + 1) * geometry.steps_per_frame() * (2 + ratio);

    let mut capture = FrameCapture::new();
    let start = Instant::now();
    let completed = video.run_frames(cli.frames, &mut capture, max_edges);
    let elapsed = start.elapsed();

    if let Some(mut logger) = video.take_logger() {
        logger.finish()?;
    }

    let stats = video.stats();
    println!();
    println!("Frames out:       {}", stats.driver.frames_out);
    println!("Frames captured:  {}", capture.frames());
    println!("Memory edges:     {}", stats.sys_edges);
    println!("Display edges:    {}", stats.pix_edges);
    println!("Timing stalls:    {}", stats.core.timing_stalls);
    println!("FIFO high water:  {}/{}", stats.driver.fifo_high_water, config.fifo_depth);
    println!("Underflow:        {} samples", stats.driver.underflow_samples);
    println!("Elapsed:          {:.2}s", elapsed.as_secs_f64());

    let perceived = capture.last_frame().map(|frame| frame.geometry);
    if let Some(g) = perceived {
        println!(
            "Perceived:        {}x{}, line period {:?}",
            g.width, g.height, g.hsync_period
        );
    }

    let screenshot = match &cli.screenshot {
        Some(dir) => {
            let path = capture.save_last(dir)?;
            println!("Screenshot saved to: {}", path.display());
            Some(path)
        }
        None => None,
    };

    if let Some(path) = &cli.report {
        let report = RunReport {
            resolution: (width, height),
            pixel_clock_hz: config.timing.pixel_clock_hz,
            sys_clock_hz: config.bus.sys_clock_hz,
            bus_width: config.bus.width,
            frames_requested: cli.frames,
            frames_completed: completed,
            frames_captured: capture.frames(),
            perceived,
            stats,
            screenshot,
            elapsed_ms: elapsed.as_millis() as u64,
        };
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("Report written to '{}'", path.display());
    }

    if !completed {
        return Err("pipeline did not produce the requested frames".into());
    }
    Ok(())
}
