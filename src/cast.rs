// Word-to-pixel caster
//
// Reinterprets each memory bus word as `pack_factor` packed 16-bit pixels and
// hands them out one per accepted step. A word is released only after its last
// pixel has been taken, and the next word may be accepted on that same step.
//
// Pixels are stored as YCbCr 4:2:2: luma in the high byte, the shared chroma
// sample (Cb on even pixels, Cr on odd pixels) in the low byte.

use crate::dma::Word;
use crate::stream::StreamElement;

/// Bits per pixel in memory
pub const BITS_PER_PIXEL: u32 = 16;

/// One packed pixel as stored in the framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PixelSample(pub u16);

impl PixelSample {
    /// Value carried during blanking
    pub const BLANK: PixelSample = PixelSample(0);

    /// Build a sample from luma and its chroma byte
    pub fn from_ycbcr(y: u8, cb_cr: u8) -> Self {
        PixelSample(((y as u16) << 8) | cb_cr as u16)
    }

    /// Luma
    #[inline]
    pub fn y(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Chroma byte (Cb or Cr depending on pixel parity)
    #[inline]
    pub fn cb_cr(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

/// Order in which pixels are taken out of a bus word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneOrder {
    /// Lowest-order pixel first
    #[default]
    LowFirst,
    /// Highest-order pixel first
    HighFirst,
}

/// How pixels sit inside a bus word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLayout {
    bus_width: u32,
    order: LaneOrder,
}

impl PixelLayout {
    /// Create a layout for a bus of `bus_width` bits
    ///
    /// # Panics
    /// Panics unless `bus_width` is a multiple of 16 between 16 and 128
    pub fn new(bus_width: u32, order: LaneOrder) -> Self {
        assert!(
            (BITS_PER_PIXEL..=Word::BITS).contains(&bus_width)
                && bus_width.is_multiple_of(BITS_PER_PIXEL),
            "unsupported bus width {}",
            bus_width
        );
        PixelLayout { bus_width, order }
    }

    /// Bus width in bits
    pub fn bus_width(&self) -> u32 {
        self.bus_width
    }

    /// Lane order
    pub fn order(&self) -> LaneOrder {
        self.order
    }

    /// Pixels per bus word
    pub fn pack_factor(&self) -> u32 {
        self.bus_width / BITS_PER_PIXEL
    }

    /// Bit lane holding the `index`-th emitted pixel
    fn lane(&self, index: u32) -> u32 {
        match self.order {
            LaneOrder::LowFirst => index,
            LaneOrder::HighFirst => self.pack_factor() - 1 - index,
        }
    }

    /// Extract the `index`-th emitted pixel from `word`
    pub fn extract(&self, word: Word, index: u32) -> PixelSample {
        let shift = self.lane(index) * BITS_PER_PIXEL;
        PixelSample((word >> shift) as u16)
    }

    /// Pack pixels into bus words, the inverse of repeated `extract`
    ///
    /// A trailing partial word is padded with blank pixels.
    pub fn pack(&self, pixels: &[PixelSample]) -> Vec<Word> {
        pixels
            .chunks(self.pack_factor() as usize)
            .map(|chunk| {
                chunk.iter().enumerate().fold(0 as Word, |word, (i, px)| {
                    word | ((px.0 as Word) << (self.lane(i as u32) * BITS_PER_PIXEL))
                })
            })
            .collect()
    }
}

/// Splits bus words into single pixels
#[derive(Debug, Clone)]
pub struct WordToPixelCaster {
    layout: PixelLayout,
    current: Option<StreamElement<Word>>,
    index: u32,
}

impl WordToPixelCaster {
    /// Create a caster for `layout`
    pub fn new(layout: PixelLayout) -> Self {
        WordToPixelCaster {
            layout,
            current: None,
            index: 0,
        }
    }

    /// Pixel layout in use
    pub fn layout(&self) -> &PixelLayout {
        &self.layout
    }

    fn on_final_pixel(&self) -> bool {
        self.index + 1 == self.layout.pack_factor()
    }

    /// Pixel offered on this step
    pub fn source(&self) -> Option<StreamElement<PixelSample>> {
        self.current.map(|word| {
            StreamElement::with_last(
                self.layout.extract(word.payload, self.index),
                word.last && self.on_final_pixel(),
            )
        })
    }

    /// Whether a word is accepted on this step
    ///
    /// # Arguments
    /// * `source_ready` - Whether the consumer takes the offered pixel
    pub fn sink_ready(&self, source_ready: bool) -> bool {
        self.current.is_none() || (self.on_final_pixel() && source_ready)
    }

    /// Commit one step
    ///
    /// # Arguments
    /// * `input` - Word accepted on this step, if any
    /// * `source_ready` - Whether the consumer takes the offered pixel
    pub fn tick(&mut self, input: Option<StreamElement<Word>>, source_ready: bool) {
        if self.current.is_some() && source_ready {
            if self.on_final_pixel() {
                self.current = None;
                self.index = 0;
            } else {
                self.index += 1;
            }
        }
        if let Some(word) = input {
            self.current = Some(word);
            self.index = 0;
        }
    }
}
