//! Schema setup, applied on every open.

use rusqlite::Connection;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    surface    TEXT NOT NULL,
    text       TEXT NOT NULL,
    subject    TEXT,
    idx        INTEGER,
    keyphrases TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS images (
    hash TEXT PRIMARY KEY,
    data BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS image_metadata (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    hash        TEXT NOT NULL,
    captured_at TEXT NOT NULL,
    file_name   TEXT NOT NULL UNIQUE,
    record      INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_image_metadata_hash ON image_metadata(hash);
";

pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
