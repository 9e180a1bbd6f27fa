//! SQLite-backed record store and content-addressed image store.
//!
//! Image pixel data is stored once per content hash; a metadata row is
//! written for every imported file, so repeated screenshots of the same
//! screen share one blob.

mod migrations;

use std::path::Path;
use std::sync::{Mutex, MutexGuard, OnceLock};

use chrono::{NaiveDate, NaiveDateTime};
use image::RgbaImage;
use log::debug;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use sha2::{Digest, Sha256};

use crate::error::StoreError;
use crate::ingest::{NATIVE_HEIGHT, NATIVE_WIDTH};
use crate::model::{ImageMetadata, Record, SurfaceType};

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Steam names screenshots like `230700_20190517183348_1.png`.
fn screenshot_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d+_(\d{4})(\d{2})(\d{2})(\d{2})(\d{2})(\d{2})_\d+\.png$")
            .expect("screenshot name pattern")
    })
}

/// Parses the capture time out of a screenshot file name.
fn screenshot_time(file_name: &str) -> Result<NaiveDateTime, StoreError> {
    let bad = || StoreError::FilenameFormat(file_name.to_string());
    let caps = screenshot_name_regex().captures(file_name).ok_or_else(bad)?;
    let field = |i: usize| caps[i].parse::<u32>().map_err(|_| bad());

    let (year, month, day) = (field(1)? as i32, field(2)?, field(3)?);
    let (hour, min, sec) = (field(4)?, field(5)?, field(6)?);
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, min, sec))
        .ok_or_else(bad)
}

/// Content hash of the raw frame pixels, stable across re-encodes.
pub fn image_hash(img: &RgbaImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(img.as_raw());
    format!("sha256-{}", hex::encode(hasher.finalize()))
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens (creating if needed) the database and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    // One writer at a time; readers queue behind it.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Saves a record, assigning its store id.
    pub fn save_record(&self, record: &mut Record) -> Result<(), StoreError> {
        let keyphrases = serde_json::to_string(&record.keyphrases)
            .map_err(|err| StoreError::Corrupt(format!("unencodable keyphrases: {err}")))?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO records (surface, text, subject, idx, keyphrases)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.surface_type.name(),
                record.text,
                record.subject,
                record.index,
                keyphrases,
            ],
        )?;
        record.id = conn.last_insert_rowid();
        Ok(())
    }

    pub fn list_records(&self) -> Result<Vec<Record>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, surface, text, subject, idx, keyphrases FROM records ORDER BY id",
        )?;

        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(row_to_record(row)?);
        }
        Ok(records)
    }

    /// Stores one screenshot occurrence, deduplicating identical pixel
    /// content. Importing a file name that is already present is a no-op.
    pub fn import_screenshot(
        &self,
        file_name: &str,
        record_id: i64,
        img: &RgbaImage,
    ) -> Result<(), StoreError> {
        if img.width() != NATIVE_WIDTH || img.height() != NATIVE_HEIGHT {
            return Err(StoreError::SizeMismatch { width: img.width(), height: img.height() });
        }

        let base_name = base_name(file_name);
        let captured_at = screenshot_time(base_name)?;

        if self.lookup_file(base_name)?.is_some() {
            debug!("already have {base_name}");
            return Ok(());
        }

        let hash = image_hash(img);
        let conn = self.conn();

        let stored: Option<String> = conn
            .query_row("SELECT hash FROM images WHERE hash = ?1", params![hash], |row| row.get(0))
            .optional()?;
        if stored.is_none() {
            let mut data = Vec::new();
            img.write_to(&mut std::io::Cursor::new(&mut data), image::ImageFormat::Png)
                .map_err(StoreError::Encode)?;
            conn.execute("INSERT INTO images (hash, data) VALUES (?1, ?2)", params![hash, data])?;
        }

        conn.execute(
            "INSERT INTO image_metadata (hash, captured_at, file_name, record)
             VALUES (?1, ?2, ?3, ?4)",
            params![hash, captured_at.format(TIME_FORMAT).to_string(), base_name, record_id],
        )?;
        Ok(())
    }

    pub fn lookup_file(&self, file_name: &str) -> Result<Option<ImageMetadata>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, hash, captured_at, file_name, record
             FROM image_metadata WHERE file_name = ?1",
        )?;

        let mut rows = stmt.query(params![file_name])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_metadata(row)?)),
            None => Ok(None),
        }
    }

    pub fn list_images(&self) -> Result<Vec<ImageMetadata>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, hash, captured_at, file_name, record
             FROM image_metadata ORDER BY id",
        )?;

        let mut rows = stmt.query([])?;
        let mut images = Vec::new();
        while let Some(row) = rows.next()? {
            images.push(row_to_metadata(row)?);
        }
        Ok(images)
    }

    /// Returns the stored (encoded) bytes under a content hash.
    pub fn get_image_data(&self, hash: &str) -> Result<Vec<u8>, StoreError> {
        let conn = self.conn();
        conn.query_row("SELECT data FROM images WHERE hash = ?1", params![hash], |row| row.get(0))
            .optional()?
            .ok_or_else(|| StoreError::NotFound(hash.to_string()))
    }

    /// Decodes the stored blob back into pixels.
    pub fn get_image(&self, hash: &str) -> Result<RgbaImage, StoreError> {
        let data = self.get_image_data(hash)?;
        let img = image::load_from_memory(&data)
            .map_err(|_| StoreError::NotFound(hash.to_string()))?;
        Ok(img.to_rgba8())
    }
}

fn base_name(file_name: &str) -> &str {
    Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file_name)
}

fn row_to_record(row: &Row) -> Result<Record, StoreError> {
    let surface: String = row.get(1)?;
    let keyphrases: String = row.get(5)?;

    Ok(Record {
        id: row.get(0)?,
        surface_type: SurfaceType::from_name(&surface)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown surface type {surface:?}")))?,
        text: row.get(2)?,
        subject: row.get(3)?,
        index: row.get(4)?,
        keyphrases: serde_json::from_str(&keyphrases)
            .map_err(|err| StoreError::Corrupt(format!("bad keyphrase payload: {err}")))?,
    })
}

fn row_to_metadata(row: &Row) -> Result<ImageMetadata, StoreError> {
    let captured_at: String = row.get(2)?;

    Ok(ImageMetadata {
        id: row.get(0)?,
        hash: row.get(1)?,
        captured_at: NaiveDateTime::parse_from_str(&captured_at, TIME_FORMAT)
            .map_err(|err| StoreError::Corrupt(format!("bad timestamp {captured_at:?}: {err}")))?,
        file_name: row.get(3)?,
        record: row.get(4)?,
    })
}
