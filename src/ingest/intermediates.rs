//! Optional per-stage artifact dump for pipeline debugging.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::{GrayImage, RgbaImage};
use log::warn;
use serde::Serialize;

/// Writes per-stage artifacts (`<prefix>-<tag>.{png,txt,json}`) into a
/// directory. Every write is best-effort: a failed dump is logged and the
/// pipeline carries on.
pub struct IntermediateSink {
    dir: PathBuf,
    prefix: Mutex<String>,
}

impl IntermediateSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), prefix: Mutex::new(String::new()) }
    }

    /// Tags every subsequent artifact with `prefix` (usually the source
    /// file's stem).
    pub fn set_prefix(&self, prefix: &str) {
        *self.prefix.lock().unwrap_or_else(|p| p.into_inner()) = prefix.to_string();
    }

    fn path(&self, tag: &str, ext: &str) -> PathBuf {
        let prefix = self.prefix.lock().unwrap_or_else(|p| p.into_inner());
        if prefix.is_empty() {
            self.dir.join(format!("{tag}.{ext}"))
        } else {
            self.dir.join(format!("{prefix}-{tag}.{ext}"))
        }
    }

    fn ensure_dir(&self) -> bool {
        if let Err(err) = fs::create_dir_all(&self.dir) {
            warn!("can't create intermediates dir {}: {err}", self.dir.display());
            return false;
        }
        true
    }

    fn save_image(&self, tag: &str, save: impl FnOnce(&Path) -> image::ImageResult<()>) {
        if !self.ensure_dir() {
            return;
        }
        let path = self.path(tag, "png");
        if let Err(err) = save(&path) {
            warn!("failed to write intermediate image {}: {err}", path.display());
        }
    }

    pub fn image(&self, tag: &str, img: &RgbaImage) {
        self.save_image(tag, |path| img.save(path));
    }

    pub fn gray(&self, tag: &str, img: &GrayImage) {
        self.save_image(tag, |path| img.save(path));
    }

    pub fn text(&self, tag: &str, text: &str) {
        if !self.ensure_dir() {
            return;
        }
        let path = self.path(tag, "txt");
        if let Err(err) = fs::write(&path, text) {
            warn!("failed to write intermediate file {}: {err}", path.display());
        }
    }

    pub fn json<T: Serialize>(&self, tag: &str, value: &T) {
        if !self.ensure_dir() {
            return;
        }
        let path = self.path(tag, "json");
        match serde_json::to_vec_pretty(value) {
            Ok(bytes) => {
                if let Err(err) = fs::write(&path, bytes) {
                    warn!("failed to write intermediate file {}: {err}", path.display());
                }
            }
            Err(err) => warn!("failed to encode intermediate {}: {err}", path.display()),
        }
    }
}
