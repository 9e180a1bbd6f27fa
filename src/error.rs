//! Error types for the pipeline and the stores.

use thiserror::Error;

/// A failure while turning a screenshot into a record.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The source image cannot be normalized to the native frame.
    #[error("bad frame geometry: {0}")]
    Geometry(String),

    /// No reference template matched well enough to trust.
    #[error("classification confidence {confidence:.3} is below the acceptance floor")]
    LowConfidence { confidence: f64 },

    /// OCR came back with nothing after trimming.
    #[error("ocr produced no usable text")]
    EmptyText,

    /// The screen shows the game's placeholder for text the player cannot
    /// read yet.
    #[error("screen content has not been translated in-game")]
    UntranslatedGlyph,

    /// The mailer's mandatory message number did not survive OCR.
    #[error("mailer index {0:?} is not numeric")]
    BadIndex(String),

    /// A reference template could not be loaded.
    #[error("reference template unavailable: {0}")]
    Template(String),

    #[error("ocr engine failure: {0}")]
    Ocr(#[from] OcrError),

    #[error("image codec failure: {0}")]
    Codec(#[from] image::ImageError),
}

/// A failure in the record or image store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Only native-resolution frames are stored.
    #[error("image size {width}x{height} was not the expected 640x480")]
    SizeMismatch { width: u32, height: u32 },

    /// The file name does not carry a capture timestamp.
    #[error("{0:?} is not a properly formatted screenshot name")]
    FilenameFormat(String),

    /// The frame could not be encoded for storage.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// No image blob is stored under the hash, or the stored bytes do not
    /// decode.
    #[error("no image stored under {0:?}")]
    NotFound(String),

    /// A stored row no longer parses.
    #[error("malformed row in store: {0}")]
    Corrupt(String),

    #[error("database failure: {0}")]
    Db(#[from] rusqlite::Error),
}

/// An opaque failure of the external OCR collaborator.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("failed to run the ocr engine: {0}")]
    Launch(#[from] std::io::Error),

    #[error("ocr engine exited with an error: {0}")]
    Engine(String),

    #[error("unreadable ocr output: {0}")]
    BadOutput(String),
}
