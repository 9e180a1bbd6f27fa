//! Settings loading.
//!
//! Settings come from an optional JSON file; every field has a sensible
//! default so a bare invocation works out of the box.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TesseractSettings {
    /// Tesseract executable; resolved from PATH when not absolute.
    #[serde(default = "default_tesseract_executable")]
    pub executable: PathBuf,
    /// Language data to load.
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Explicit tessdata directory, for installs that need one.
    #[serde(default)]
    pub tessdata: Option<PathBuf>,
}

impl Default for TesseractSettings {
    fn default() -> Self {
        Self {
            executable: default_tesseract_executable(),
            lang: default_lang(),
            tessdata: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Directory with one `<surface>.png` reference image per type.
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,
    /// Dump per-stage pipeline artifacts here when set.
    #[serde(default)]
    pub intermediates_dir: Option<PathBuf>,
    #[serde(default)]
    pub tesseract: TesseractSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            template_dir: default_template_dir(),
            intermediates_dir: None,
            tesseract: TesseractSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = fs::read_to_string(path)
            .with_context(|| format!("can't read {}", path.display()))?;
        let settings = serde_json::from_str(&contents)
            .with_context(|| format!("can't parse {}", path.display()))?;
        Ok(settings)
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ruins-codex")
}

fn default_db_path() -> PathBuf {
    data_dir().join("codex.db")
}

fn default_template_dir() -> PathBuf {
    data_dir().join("reference")
}

fn default_tesseract_executable() -> PathBuf {
    PathBuf::from("tesseract")
}

fn default_lang() -> String {
    "eng".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_a_file() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.tesseract.lang, "eng");
        assert!(settings.intermediates_dir.is_none());
    }

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"db_path": "/tmp/other.db"}"#).unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.db_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(settings.tesseract.executable, PathBuf::from("tesseract"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/config.json"))).is_err());
    }
}
