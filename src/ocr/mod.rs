//! Interface to the external OCR collaborator.

pub mod tesseract;

pub use tesseract::TesseractEngine;

use image::GrayImage;

use crate::error::OcrError;
use crate::imageutil::Rect;

/// One recognized word with its pixel box in the read image.
#[derive(Clone, Debug)]
pub struct OcrWord {
    pub text: String,
    pub confidence: f32,
    pub bounds: Rect,
}

/// Result of a word-granularity read: the full recognized text plus the
/// word boxes in reading order.
#[derive(Clone, Debug, Default)]
pub struct OcrOutput {
    pub text: String,
    pub words: Vec<OcrWord>,
}

/// One recognized text block from a paragraph-granularity read.
#[derive(Clone, Debug)]
pub struct OcrBlock {
    pub text: String,
    pub confidence: f32,
}

/// Minimum confidence for a block to survive a paragraph read.
pub const MIN_BLOCK_CONFIDENCE: f32 = 60.0;

/// Text + word-box extraction service. Implementations block until the
/// engine finishes; there are no internal retries.
pub trait OcrEngine: Send + Sync {
    /// Reads `img` at word granularity.
    fn read_words(&self, img: &GrayImage) -> Result<OcrOutput, OcrError>;

    /// Reads `img` at paragraph granularity with per-block confidence.
    fn read_blocks(&self, img: &GrayImage) -> Result<Vec<OcrBlock>, OcrError>;
}

/// Concatenates the blocks that clear the confidence floor.
pub fn text_from_blocks(blocks: &[OcrBlock]) -> String {
    blocks
        .iter()
        .filter(|b| b.confidence >= MIN_BLOCK_CONFIDENCE)
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
