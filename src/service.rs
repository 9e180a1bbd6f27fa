//! Ties the pipeline and the stores together for the front end.

use std::path::Path;

use anyhow::Result;
use image::RgbaImage;
use log::{info, warn};

use crate::ingest::Ingestor;
use crate::store::Database;

/// Outcome of importing one screenshot file.
#[derive(Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// The file name was already in the store; nothing was touched.
    AlreadyImported,
    /// Extraction succeeded and the stored frame links to this record.
    Ingested { record_id: i64 },
    /// Extraction failed; the frame was stored under record id 0.
    StoredWithoutRecord,
}

/// One running instance: database plus pipeline context.
pub struct Codex {
    db: Database,
    ingestor: Ingestor,
}

impl Codex {
    pub fn new(db: Database, ingestor: Ingestor) -> Self {
        Self { db, ingestor }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// Ingests one screenshot.
    ///
    /// Record extraction and frame storage are independent failure domains:
    /// a screenshot that cannot be classified or read is still archived,
    /// linked to record id 0, so it can be revisited later.
    pub fn add_image(&self, file_name: &str, img: &RgbaImage) -> Result<AddOutcome> {
        let base_name = Path::new(file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(file_name);

        if self.db.lookup_file(base_name)?.is_some() {
            info!("already have {base_name}");
            return Ok(AddOutcome::AlreadyImported);
        }

        info!("adding {base_name}");
        if let Some(sink) = self.ingestor.intermediates() {
            let stem = base_name.strip_suffix(".png").unwrap_or(base_name);
            sink.set_prefix(stem);
        }

        let frame = self.ingestor.normalize(img)?;
        let record_id = match self.ingestor.ingest_frame(&frame) {
            Ok(mut record) => {
                self.db.save_record(&mut record)?;
                record.id
            }
            Err(err) => {
                warn!("could not extract a record from {base_name}: {err}");
                0
            }
        };

        self.db.import_screenshot(base_name, record_id, &frame)?;

        Ok(if record_id == 0 {
            AddOutcome::StoredWithoutRecord
        } else {
            AddOutcome::Ingested { record_id }
        })
    }
}
