// Test patterns - framebuffer contents for exercising the pipeline
//
// Patterns are produced as 4:2:2 pixel samples in raster order, ready to be
// packed into bus words with `PixelLayout::pack`.

use crate::cast::{PixelLayout, PixelSample};
use crate::dma::SimMemory;
use crate::driver::{Rgb, Ycbcr444, YcbcrToRgb};

/// 100% colour bars in BT.601 studio range: white, yellow, cyan, green,
/// magenta, red, blue, black
pub const COLOUR_BARS: [Ycbcr444; 8] = [
    Ycbcr444 { y: 235, cb: 128, cr: 128 },
    Ycbcr444 { y: 210, cb: 16, cr: 146 },
    Ycbcr444 { y: 170, cb: 166, cr: 16 },
    Ycbcr444 { y: 145, cb: 54, cr: 34 },
    Ycbcr444 { y: 106, cb: 202, cr: 222 },
    Ycbcr444 { y: 81, cb: 90, cr: 240 },
    Ycbcr444 { y: 41, cb: 240, cr: 110 },
    Ycbcr444 { y: 16, cb: 128, cr: 128 },
];

/// Subsample a full-resolution line to 4:2:2
///
/// Each pixel pair keeps the Cb of its even pixel and the Cr of its odd pixel.
pub fn subsample_line(line: &[Ycbcr444]) -> Vec<PixelSample> {
    line.iter()
        .enumerate()
        .map(|(x, px)| {
            let chroma = if x % 2 == 0 { px.cb } else { px.cr };
            PixelSample::from_ycbcr(px.y, chroma)
        })
        .collect()
}

/// Bar index for column `x` of a `width`-pixel line
///
/// Bars start on even columns so a pixel pair never straddles two bars.
pub fn bar_at(x: u32, width: u32) -> usize {
    let bar_width = ((width / 8) & !1).max(2);
    ((x / bar_width) as usize).min(COLOUR_BARS.len() - 1)
}

/// Vertical colour bars filling a `width` x `height` frame
pub fn colour_bars(width: u32, height: u32) -> Vec<PixelSample> {
    let line: Vec<Ycbcr444> = (0..width).map(|x| COLOUR_BARS[bar_at(x, width)]).collect();
    let line = subsample_line(&line);
    (0..height).flat_map(|_| line.iter().copied()).collect()
}

/// Expected display colour of column `x` in a colour-bar frame
pub fn colour_bar_rgb(x: u32, width: u32) -> Rgb {
    YcbcrToRgb::convert(COLOUR_BARS[bar_at(x, width)])
}

/// Pack `pixels` and store them at bus-word address `base`
pub fn load_pixels(
    memory: &mut SimMemory,
    layout: &PixelLayout,
    base: u32,
    pixels: &[PixelSample],
) {
    memory.load(base, &layout.pack(pixels));
}
