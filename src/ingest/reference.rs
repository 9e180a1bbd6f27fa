//! Reference template loading and memoization.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use image::RgbaImage;

use crate::error::IngestError;
use crate::model::SurfaceType;

/// Lazily loaded canonical screen images, one per surface type.
///
/// Templates are immutable once loaded and cached for the lifetime of the
/// cache. `reset` drops everything so tests can swap template files on disk.
pub struct TemplateCache {
    dir: PathBuf,
    cache: Mutex<HashMap<SurfaceType, Arc<RgbaImage>>>,
}

impl TemplateCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), cache: Mutex::new(HashMap::new()) }
    }

    /// Returns the reference image for `surface`, loading
    /// `<dir>/<name>.png` on first use.
    pub fn get(&self, surface: SurfaceType) -> Result<Arc<RgbaImage>, IngestError> {
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(img) = cache.get(&surface) {
            return Ok(img.clone());
        }

        let path = self.dir.join(format!("{}.png", surface.name()));
        let img = image::open(&path)
            .map_err(|err| IngestError::Template(format!("{}: {}", path.display(), err)))?
            .to_rgba8();

        let img = Arc::new(img);
        cache.insert(surface, img.clone());
        Ok(img)
    }

    /// Drops every cached template; the next lookup reloads from disk.
    pub fn reset(&self) {
        self.cache.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }
}
