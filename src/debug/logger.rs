// Logger - Signal trace recording for the scan-out pipeline
//
// Records timing generator steps and display output samples, either into a
// bounded in-memory ring or streamed to a text file. A logger is configured
// once when it is built and then attached to a `VideoOut`.

use super::timing::TimingSnapshot;
use crate::driver::VideoSample;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Entries kept in memory unless `keep_last` says otherwise
const DEFAULT_KEEP: usize = 10_000;

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// No logging
    None,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warning,
    /// Info, warnings, and errors
    Info,
    /// Debug information
    Debug,
    /// Verbose signal tracing
    Trace,
}

/// One recorded trace line
#[derive(Debug, Clone)]
pub enum TraceEntry {
    /// Timing generator state after a step
    Timing(TimingSnapshot),
    /// Sample leaving the display side
    Output {
        /// Display edge number
        edge: u64,
        /// Sample emitted on that edge
        sample: VideoSample,
    },
    /// Run loop message
    Message(String),
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceEntry::Timing(snapshot) => write!(f, "TG:  {}", snapshot),
            TraceEntry::Output { edge, sample } => write!(
                f,
                "PHY: edge:{:>9} rgb:{:02X}{:02X}{:02X} {}{}{}",
                edge,
                sample.r,
                sample.g,
                sample.b,
                if sample.de { 'D' } else { '.' },
                if sample.hsync { 'H' } else { '.' },
                if sample.vsync { 'V' } else { '.' },
            ),
            TraceEntry::Message(msg) => write!(f, "{}", msg),
        }
    }
}

/// Trace recorder for the timing generator and the display output
///
/// Signal traces are only recorded at `LogLevel::Trace`, and only for the
/// sources switched on with `trace_timing` and `trace_output`.
pub struct Logger {
    level: LogLevel,
    timing: bool,
    output: bool,
    entries: VecDeque<TraceEntry>,
    // 0 keeps everything
    keep: usize,
    file: Option<BufWriter<File>>,
}

impl Logger {
    /// Create a silent logger
    pub fn new() -> Self {
        Logger {
            level: LogLevel::None,
            timing: false,
            output: false,
            entries: VecDeque::new(),
            keep: DEFAULT_KEEP,
            file: None,
        }
    }

    /// Record messages up to `level`
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Record one entry per timing generator step
    pub fn trace_timing(mut self) -> Self {
        self.timing = true;
        self
    }

    /// Record one entry per display edge
    pub fn trace_output(mut self) -> Self {
        self.output = true;
        self
    }

    /// Keep only the newest `count` entries in memory
    ///
    /// # Arguments
    ///
    /// * `count` - Entries to keep, 0 keeps everything
    pub fn keep_last(mut self, count: usize) -> Self {
        self.keep = count;
        self
    }

    /// Also stream every entry to `path`, truncating it
    pub fn write_to<P: AsRef<Path>>(mut self, path: P) -> std::io::Result<Self> {
        self.file = Some(BufWriter::new(File::create(path)?));
        Ok(self)
    }

    /// Whether timing steps are being recorded
    pub fn is_timing_trace_enabled(&self) -> bool {
        self.timing && self.level >= LogLevel::Trace
    }

    /// Whether display samples are being recorded
    pub fn is_output_trace_enabled(&self) -> bool {
        self.output && self.level >= LogLevel::Trace
    }

    /// Record a timing generator snapshot
    pub fn log_timing(&mut self, snapshot: &TimingSnapshot) {
        if self.is_timing_trace_enabled() {
            self.record(TraceEntry::Timing(*snapshot));
        }
    }

    /// Record a display output sample
    ///
    /// # Arguments
    ///
    /// * `edge` - Display edge number
    /// * `sample` - The sample emitted on that edge
    pub fn log_output(&mut self, edge: u64, sample: &VideoSample) {
        if self.is_output_trace_enabled() {
            self.record(TraceEntry::Output {
                edge,
                sample: *sample,
            });
        }
    }

    /// Record a message if `level` is enabled
    pub fn log_message(&mut self, level: LogLevel, message: String) {
        if level <= self.level {
            self.record(TraceEntry::Message(message));
        }
    }

    fn record(&mut self, entry: TraceEntry) {
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = writeln!(file, "{}", entry) {
                log::warn!("trace: dropping file output: {}", e);
                self.file = None;
            }
        }

        self.entries.push_back(entry);
        if self.keep > 0 && self.entries.len() > self.keep {
            self.entries.pop_front();
        }
    }

    /// Entries held in memory, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter()
    }

    /// Flush and close the trace file, if any
    pub fn finish(&mut self) -> std::io::Result<()> {
        match self.file.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(step: u64) -> TimingSnapshot {
        TimingSnapshot {
            step,
            frame: 0,
            hcounter: step as u32,
            vcounter: 0,
            hactive: true,
            vactive: true,
            hsync: false,
            vsync: false,
            frame_boundary: false,
            active_size: None,
        }
    }

    #[test]
    fn test_new_logger_is_silent() {
        let mut logger = Logger::new();
        assert!(!logger.is_timing_trace_enabled());
        assert!(!logger.is_output_trace_enabled());

        logger.log_timing(&snapshot(1));
        logger.log_message(LogLevel::Error, "dropped".to_string());
        assert_eq!(logger.entries().count(), 0);
    }

    #[test]
    fn test_trace_requires_trace_level() {
        let mut logger = Logger::new().with_level(LogLevel::Debug).trace_timing();
        assert!(!logger.is_timing_trace_enabled());
        logger.log_timing(&snapshot(1));
        assert_eq!(logger.entries().count(), 0);

        let mut logger = logger.with_level(LogLevel::Trace);
        assert!(logger.is_timing_trace_enabled());
        assert!(!logger.is_output_trace_enabled());
        logger.log_timing(&snapshot(2));
        assert_eq!(logger.entries().count(), 1);
    }

    #[test]
    fn test_output_entry_format() {
        let mut logger = Logger::new().with_level(LogLevel::Trace).trace_output();

        let sample = VideoSample {
            r: 0xFF,
            g: 0x80,
            b: 0x00,
            de: true,
            hsync: false,
            vsync: true,
        };
        logger.log_output(42, &sample);
        let line = logger.entries().next().expect("entry").to_string();
        assert_eq!(line, "PHY: edge:       42 rgb:FF8000 D.V");
    }

    #[test]
    fn test_log_message_respects_level() {
        let mut logger = Logger::new().with_level(LogLevel::Warning);

        logger.log_message(LogLevel::Info, "hidden".to_string());
        logger.log_message(LogLevel::Error, "shown".to_string());

        let kept: Vec<String> = logger.entries().map(|e| e.to_string()).collect();
        assert_eq!(kept, vec!["shown".to_string()]);
    }

    #[test]
    fn test_keep_last_drops_oldest() {
        let mut logger = Logger::new()
            .with_level(LogLevel::Trace)
            .trace_timing()
            .keep_last(3);

        for step in 1..=4 {
            logger.log_timing(&snapshot(step));
        }

        let steps: Vec<u64> = logger
            .entries()
            .map(|e| match e {
                TraceEntry::Timing(s) => s.step,
                _ => panic!("Expected Timing entry"),
            })
            .collect();
        assert_eq!(steps, vec![2, 3, 4]);
    }

    #[test]
    fn test_file_receives_every_entry() {
        let path = std::env::temp_dir().join(format!("scanout_trace_{}.log", std::process::id()));
        let mut logger = Logger::new()
            .with_level(LogLevel::Info)
            .keep_last(1)
            .write_to(&path)
            .expect("create trace file");

        logger.log_message(LogLevel::Info, "first".to_string());
        logger.log_message(LogLevel::Info, "second".to_string());
        logger.finish().expect("flush trace file");

        let contents = std::fs::read_to_string(&path).expect("read trace file");
        let _ = std::fs::remove_file(&path);
        assert_eq!(contents, "first\nsecond\n");
        assert_eq!(logger.entries().count(), 1);
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::None < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }
}
