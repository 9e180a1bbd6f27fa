//! Screenshot ingestion and archival for the game's in-fiction computer
//! surfaces.
//!
//! The pipeline normalizes a raw screenshot to the game's native 640×480
//! frame, classifies which UI surface it shows against reference templates,
//! OCRs the informative region, aggregates color-keyed keyphrases, and
//! archives the frame in a content-addressed image store.

pub mod config;
pub mod error;
pub mod imageutil;
pub mod ingest;
pub mod model;
pub mod ocr;
pub mod service;
pub mod store;

pub use error::{IngestError, OcrError, StoreError};
pub use ingest::{Ingestor, PipelineConfig};
pub use model::{ImageMetadata, KeyphraseClass, Record, SurfaceType};
pub use service::{AddOutcome, Codex};
pub use store::Database;
