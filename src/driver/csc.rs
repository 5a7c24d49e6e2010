// Color space conversion - YCbCr 4:2:2 to RGB
//
// Two fixed-latency stages run back to back in the display domain:
//
// ```text
// PixelSample (Y + Cb|Cr) --> ChromaUpsampler (4:2:2 -> 4:4:4) --> YcbcrToRgb --> Rgb
// ```
//
// Both stages advance on every display clock edge whether or not they hold a
// pixel, so the time from input to output is exactly their declared `LATENCY`.

use std::collections::VecDeque;

use crate::cast::PixelSample;

/// Stage with a statically known processing latency in clock edges
pub trait Pipelined {
    /// Edges between an input and its output
    const LATENCY: usize;
}

/// Chroma value used when a pixel has no partner to borrow from
const NEUTRAL_CHROMA: u8 = 128;

/// Full-resolution YCbCr pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ycbcr444 {
    pub y: u8,
    pub cb: u8,
    pub cr: u8,
}

/// 8-bit RGB pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
}

#[derive(Debug, Clone, Copy)]
struct Chroma422 {
    y: u8,
    cb_cr: u8,
    // Odd pixels carry Cr, even pixels carry Cb
    odd: bool,
}

/// 4:2:2 to 4:4:4 chroma upsampler
///
/// Each pixel pair shares one Cb (on the even pixel) and one Cr (on the odd
/// pixel). Both pixels of a pair leave with the pair's Cb and Cr. Parity flips
/// on every pixel that enters, blanking steps leave it untouched.
#[derive(Debug, Clone)]
pub struct ChromaUpsampler {
    // Newest input first; holds LATENCY + 1 edges so both neighbours of the
    // outgoing pixel are still available
    history: VecDeque<Option<Chroma422>>,
    odd: bool,
}

impl Pipelined for ChromaUpsampler {
    const LATENCY: usize = 4;
}

impl ChromaUpsampler {
    pub fn new() -> Self {
        ChromaUpsampler {
            history: std::iter::repeat_n(None, Self::LATENCY + 1).collect(),
            odd: false,
        }
    }

    fn at(&self, age: usize) -> Option<Chroma422> {
        self.history.get(age).copied().flatten()
    }

    /// Pixel leaving on this edge
    pub fn output(&self) -> Option<Ycbcr444> {
        let target = self.at(Self::LATENCY - 1)?;
        let (cb, cr) = if target.odd {
            let cb = match self.at(Self::LATENCY) {
                Some(prev) if !prev.odd => prev.cb_cr,
                _ => NEUTRAL_CHROMA,
            };
            (cb, target.cb_cr)
        } else {
            let cr = match self.at(Self::LATENCY - 2) {
                Some(next) if next.odd => next.cb_cr,
                _ => NEUTRAL_CHROMA,
            };
            (target.cb_cr, cr)
        };
        Some(Ycbcr444 { y: target.y, cb, cr })
    }

    /// Clock one edge
    ///
    /// # Arguments
    /// * `input` - Pixel entering on this edge, `None` during blanking
    pub fn tick(&mut self, input: Option<PixelSample>) {
        let entry = input.map(|px| Chroma422 {
            y: px.y(),
            cb_cr: px.cb_cr(),
            odd: self.odd,
        });
        if entry.is_some() {
            self.odd = !self.odd;
        }
        self.history.push_front(entry);
        self.history.truncate(Self::LATENCY + 1);
    }
}

impl Default for ChromaUpsampler {
    fn default() -> Self {
        Self::new()
    }
}

// BT.601 studio-swing coefficients, scaled by 256
const COEF_Y: i32 = 298;
const COEF_R_CR: i32 = 409;
const COEF_G_CB: i32 = 100;
const COEF_G_CR: i32 = 208;
const COEF_B_CB: i32 = 516;

const Y_OFFSET: i32 = 16;
const C_OFFSET: i32 = 128;
const ROUND: i32 = 128;

#[derive(Debug, Clone, Copy)]
struct Offsets {
    y: i32,
    cb: i32,
    cr: i32,
}

#[derive(Debug, Clone, Copy)]
struct Products {
    y: i32,
    r_cr: i32,
    g_cb: i32,
    g_cr: i32,
    b_cb: i32,
}

#[derive(Debug, Clone, Copy)]
struct Sums {
    r: i32,
    g: i32,
    b: i32,
}

fn saturate(v: i32) -> u8 {
    (v >> 8).clamp(0, 255) as u8
}

/// YCbCr to RGB converter, four register stages
///
/// offset removal -> multiply -> sum -> saturate
#[derive(Debug, Clone, Default)]
pub struct YcbcrToRgb {
    offsets: Option<Offsets>,
    products: Option<Products>,
    sums: Option<Sums>,
    rgb: Option<Rgb>,
}

impl Pipelined for YcbcrToRgb {
    const LATENCY: usize = 4;
}

impl YcbcrToRgb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pixel leaving on this edge
    pub fn output(&self) -> Option<Rgb> {
        self.rgb
    }

    /// Clock one edge; every stage reads its predecessor's pre-edge value
    pub fn tick(&mut self, input: Option<Ycbcr444>) {
        let rgb = self.sums.map(|s| Rgb {
            r: saturate(s.r),
            g: saturate(s.g),
            b: saturate(s.b),
        });
        let sums = self.products.map(|p| Sums {
            r: p.y + p.r_cr + ROUND,
            g: p.y - p.g_cb - p.g_cr + ROUND,
            b: p.y + p.b_cb + ROUND,
        });
        let products = self.offsets.map(|o| Products {
            y: COEF_Y * o.y,
            r_cr: COEF_R_CR * o.cr,
            g_cb: COEF_G_CB * o.cb,
            g_cr: COEF_G_CR * o.cr,
            b_cb: COEF_B_CB * o.cb,
        });
        let offsets = input.map(|px| Offsets {
            y: px.y as i32 - Y_OFFSET,
            cb: px.cb as i32 - C_OFFSET,
            cr: px.cr as i32 - C_OFFSET,
        });

        self.rgb = rgb;
        self.sums = sums;
        self.products = products;
        self.offsets = offsets;
    }

    /// Convert one pixel without pipelining
    pub fn convert(px: Ycbcr444) -> Rgb {
        let mut csc = Self::new();
        csc.tick(Some(px));
        for _ in 1..Self::LATENCY {
            csc.tick(None);
        }
        csc.output().unwrap_or(Rgb::BLACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ycbcr(y: u8, cb: u8, cr: u8) -> Ycbcr444 {
        Ycbcr444 { y, cb, cr }
    }

    #[test]
    fn test_reference_colors() {
        assert_eq!(YcbcrToRgb::convert(ycbcr(16, 128, 128)), Rgb::BLACK);
        assert_eq!(
            YcbcrToRgb::convert(ycbcr(235, 128, 128)),
            Rgb { r: 255, g: 255, b: 255 }
        );
        assert_eq!(
            YcbcrToRgb::convert(ycbcr(81, 90, 240)),
            Rgb { r: 255, g: 0, b: 0 }
        );
    }

    #[test]
    fn test_out_of_range_saturates() {
        assert_eq!(YcbcrToRgb::convert(ycbcr(0, 128, 128)), Rgb::BLACK);
        assert_eq!(
            YcbcrToRgb::convert(ycbcr(255, 128, 128)),
            Rgb { r: 255, g: 255, b: 255 }
        );
    }

    #[test]
    fn test_converter_latency() {
        let mut csc = YcbcrToRgb::new();
        csc.tick(Some(ycbcr(235, 128, 128)));
        for edge in 1..YcbcrToRgb::LATENCY {
            assert_eq!(csc.output(), None, "edge {}", edge);
            csc.tick(None);
        }
        assert!(csc.output().is_some());
        csc.tick(None);
        assert_eq!(csc.output(), None);
    }

    #[test]
    fn test_upsampler_latency_and_pairing() {
        let mut up = ChromaUpsampler::new();
        let pixels = [
            PixelSample::from_ycbcr(10, 0x20),
            PixelSample::from_ycbcr(11, 0x30),
            PixelSample::from_ycbcr(12, 0x40),
            PixelSample::from_ycbcr(13, 0x50),
        ];

        let mut out = Vec::new();
        for edge in 0..pixels.len() + ChromaUpsampler::LATENCY {
            out.push(up.output());
            up.tick(pixels.get(edge).copied());
        }

        assert!(out[..ChromaUpsampler::LATENCY].iter().all(|o| o.is_none()));
        let got: Vec<Ycbcr444> = out[ChromaUpsampler::LATENCY..]
            .iter()
            .map(|o| o.expect("pixel"))
            .collect();
        assert_eq!(
            got,
            vec![
                ycbcr(10, 0x20, 0x30),
                ycbcr(11, 0x20, 0x30),
                ycbcr(12, 0x40, 0x50),
                ycbcr(13, 0x40, 0x50),
            ]
        );
    }

    #[test]
    fn test_upsampler_parity_skips_blanking() {
        let mut up = ChromaUpsampler::new();
        let inputs = [
            Some(PixelSample::from_ycbcr(1, 0x11)),
            None,
            Some(PixelSample::from_ycbcr(2, 0x22)),
        ];
        let mut out = Vec::new();
        for edge in 0..inputs.len() + ChromaUpsampler::LATENCY {
            out.push(up.output());
            up.tick(inputs.get(edge).copied().flatten());
        }
        // The pair is split by a blanking edge, so neither pixel finds a partner
        assert_eq!(out[4], Some(ycbcr(1, 0x11, NEUTRAL_CHROMA)));
        assert_eq!(out[5], None);
        assert_eq!(out[6], Some(ycbcr(2, NEUTRAL_CHROMA, 0x22)));
    }

    #[test]
    fn test_unpaired_pixel_uses_neutral_chroma() {
        let mut up = ChromaUpsampler::new();
        up.tick(Some(PixelSample::from_ycbcr(50, 0x70)));
        for _ in 1..ChromaUpsampler::LATENCY {
            up.tick(None);
        }
        assert_eq!(up.output(), Some(ycbcr(50, 0x70, NEUTRAL_CHROMA)));
    }
}
