//! Shared data types for extraction records and stored images.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The in-game UI surface a screenshot depicts.
///
/// Declaration order doubles as the classifier's tie-break order: on an
/// exact score tie the first-declared type wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceType {
    Tent,
    Mailer,
    Scanner,
}

impl SurfaceType {
    pub const ALL: [SurfaceType; 3] = [SurfaceType::Tent, SurfaceType::Mailer, SurfaceType::Scanner];

    pub fn name(&self) -> &'static str {
        match self {
            SurfaceType::Tent => "tent",
            SurfaceType::Mailer => "mailer",
            SurfaceType::Scanner => "scanner",
        }
    }

    pub fn from_name(name: &str) -> Option<SurfaceType> {
        match name {
            "tent" => Some(SurfaceType::Tent),
            "mailer" => Some(SurfaceType::Mailer),
            "scanner" => Some(SurfaceType::Scanner),
            _ => None,
        }
    }
}

/// Color class of an OCR word. `None` marks ordinary body text and never
/// appears as a key in a record's keyphrase map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyphraseClass {
    None,
    Blue,
    Green,
}

/// One structured extraction result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned identifier; 0 means the record was never persisted.
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "type")]
    pub surface_type: SurfaceType,
    /// Free text of the surface's main region, trimmed.
    pub text: String,
    /// Mailer subject line; absent for other surfaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Mailer message number; mandatory for mailer records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    /// Merged keyphrase runs per color class; empty classes are absent.
    #[serde(default)]
    pub keyphrases: BTreeMap<KeyphraseClass, Vec<String>>,
}

/// One imported occurrence of a screenshot file.
///
/// Several metadata rows may share a `hash`; the pixel bytes behind it are
/// stored exactly once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub id: i64,
    /// Content hash of the normalized frame, `sha256-<hex>`.
    pub hash: String,
    /// Capture time parsed from the source file name.
    pub captured_at: NaiveDateTime,
    /// Base name of the imported file, unique per store.
    pub file_name: String,
    /// Associated record id, or 0 when extraction failed.
    pub record: i64,
}
