// Screenshot functionality
//
// Saves a captured frame as a PNG file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::CapturedFrame;

/// Errors that can occur while saving a capture
#[derive(Debug)]
pub enum CaptureError {
    /// I/O error
    Io(io::Error),

    /// PNG encoding error
    PngEncoding(png::EncodingError),

    /// No complete, non-empty frame has been captured
    NoFrame,
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::Io(e) => write!(f, "I/O error: {}", e),
            CaptureError::PngEncoding(e) => write!(f, "PNG encoding error: {}", e),
            CaptureError::NoFrame => write!(f, "no complete frame captured"),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<io::Error> for CaptureError {
    fn from(e: io::Error) -> Self {
        CaptureError::Io(e)
    }
}

impl From<png::EncodingError> for CaptureError {
    fn from(e: png::EncodingError) -> Self {
        CaptureError::PngEncoding(e)
    }
}

/// Save a captured frame into `directory` under a timestamped name
///
/// # Arguments
///
/// * `frame` - The frame to save
/// * `directory` - Output directory, created if missing
///
/// # Returns
///
/// Result containing the path to the saved screenshot or an error
pub fn save_screenshot(frame: &CapturedFrame, directory: &Path) -> Result<PathBuf, CaptureError> {
    fs::create_dir_all(directory)?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let filename = format!("scanout_{}_f{}.png", timestamp, frame.index);
    let file_path = directory.join(filename);

    save_png(&file_path, frame)?;

    Ok(file_path)
}

/// Save a captured frame as an RGB PNG file
///
/// Short lines are padded with black up to the widest line.
pub fn save_png(path: &Path, frame: &CapturedFrame) -> Result<(), CaptureError> {
    let width = frame.width();
    let height = frame.height();
    if width == 0 || height == 0 {
        return Err(CaptureError::NoFrame);
    }

    let file = fs::File::create(path)?;
    let w = io::BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(&frame.to_rgb_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PerceivedGeometry;
    use crate::driver::Rgb;

    fn frame(lines: Vec<Vec<Rgb>>) -> CapturedFrame {
        CapturedFrame {
            index: 3,
            geometry: PerceivedGeometry::default(),
            lines,
        }
    }

    #[test]
    fn test_empty_frame_is_rejected() {
        let dir = std::env::temp_dir();
        let err = save_png(&dir.join("scanout_empty.png"), &frame(Vec::new())).unwrap_err();
        assert!(matches!(err, CaptureError::NoFrame));
    }

    #[test]
    fn test_screenshot_written() {
        let red = Rgb { r: 255, g: 0, b: 0 };
        let dir = std::env::temp_dir().join(format!("scanout_shot_{}", std::process::id()));
        let path = save_screenshot(&frame(vec![vec![red; 4]; 2]), &dir).expect("save");

        assert!(path.exists());
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("scanout_") && n.ends_with("_f3.png")));
        let _ = fs::remove_dir_all(&dir);
    }
}
