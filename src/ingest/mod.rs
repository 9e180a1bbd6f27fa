//! The ingestion pipeline: normalize, classify, extract.

pub mod intermediates;
pub mod keyphrase;
pub mod reference;
pub mod regions;

use std::path::PathBuf;

use image::{RgbaImage, imageops};
use log::debug;

use crate::error::IngestError;
use crate::imageutil::{self, Rect, middle_crop};
use crate::model::{Record, SurfaceType};
use crate::ocr::{self, OcrEngine};

use intermediates::IntermediateSink;
use reference::TemplateCache;
use regions::BodyRegion;

/// The game's native render size; every region rect is defined in this
/// coordinate space.
pub const NATIVE_WIDTH: u32 = 640;
pub const NATIVE_HEIGHT: u32 = 480;

/// Likeness a frame must reach against some template to be accepted.
pub const CONFIDENCE_FLOOR: f64 = 0.9;

/// What the game renders in place of text the player cannot read yet.
const UNTRANSLATED_TEXT: &str = "Cannot be deciphered.";

/// Everything the pipeline needs besides the frame itself.
pub struct PipelineConfig {
    /// Directory holding one `<surface>.png` reference image per type.
    pub template_dir: PathBuf,
    /// When set, per-stage artifacts are dumped here.
    pub intermediates: Option<IntermediateSink>,
}

/// The pipeline context: reference templates plus the OCR collaborator.
pub struct Ingestor {
    templates: TemplateCache,
    intermediates: Option<IntermediateSink>,
    ocr: Box<dyn OcrEngine>,
}

impl Ingestor {
    pub fn new(config: PipelineConfig, ocr: Box<dyn OcrEngine>) -> Self {
        Self {
            templates: TemplateCache::new(config.template_dir),
            intermediates: config.intermediates,
            ocr,
        }
    }

    pub fn templates(&self) -> &TemplateCache {
        &self.templates
    }

    pub fn intermediates(&self) -> Option<&IntermediateSink> {
        self.intermediates.as_ref()
    }

    /// Runs the whole pipeline on a raw screenshot.
    pub fn ingest(&self, img: &RgbaImage) -> Result<Record, IngestError> {
        let frame = self.normalize(img)?;
        self.ingest_frame(&frame)
    }

    /// Rescales a screenshot to native resolution and crops the centered
    /// game frame.
    pub fn normalize(&self, img: &RgbaImage) -> Result<RgbaImage, IngestError> {
        normalize_frame_with(img, self.intermediates.as_ref())
    }

    /// Classifies an already-normalized frame and extracts its record.
    pub fn ingest_frame(&self, frame: &RgbaImage) -> Result<Record, IngestError> {
        let (surface, confidence) = self.classify(frame)?;
        debug!("classified as {} ({confidence:.3})", surface.name());
        if confidence < CONFIDENCE_FLOOR {
            return Err(IngestError::LowConfidence { confidence });
        }
        self.extract(surface, frame)
    }

    /// Scores `frame` against every reference template and returns the best
    /// match. Exact ties go to the first-declared surface type.
    pub fn classify(&self, frame: &RgbaImage) -> Result<(SurfaceType, f64), IngestError> {
        let mut best = (SurfaceType::ALL[0], f64::NEG_INFINITY);
        for surface in SurfaceType::ALL {
            let template = self.templates.get(surface)?;
            let score = imageutil::image_compare(frame, &template);
            debug!("{} likeness {score:.3}", surface.name());
            if score > best.1 {
                best = (surface, score);
            }
        }
        Ok(best)
    }

    fn extract(&self, surface: SurfaceType, frame: &RgbaImage) -> Result<Record, IngestError> {
        let layout = regions::layout(surface);

        let body = match layout.body {
            BodyRegion::Centered { width, height } => middle_crop(frame, width, height),
            BodyRegion::Fixed(rect) => rect.crop(frame),
        };
        self.dump_image("cropped-content", &body);

        let gray = if layout.invert {
            let mut inverted = body.clone();
            imageops::invert(&mut inverted);
            self.dump_image("ocrprep-inverted", &inverted);
            imageops::grayscale(&inverted)
        } else {
            imageops::grayscale(&body)
        };
        if let Some(sink) = &self.intermediates {
            sink.gray("ocrprep-grayscale", &gray);
        }

        let read = self.ocr.read_words(&gray)?;
        if let Some(sink) = &self.intermediates {
            sink.text("ocr", &read.text);
        }

        // The mailer body is read again at paragraph granularity so garbage
        // blocks can be dropped by confidence.
        let text = match surface {
            SurfaceType::Mailer => ocr::text_from_blocks(&self.ocr.read_blocks(&gray)?),
            _ => read.text.clone(),
        };
        let text = text.trim();
        if text.is_empty() {
            return Err(IngestError::EmptyText);
        }
        if text == UNTRANSLATED_TEXT {
            return Err(IngestError::UntranslatedGlyph);
        }

        let keyphrases = keyphrase::aggregate(&body, &read.words);

        let (subject, index) = match (layout.subject, layout.index) {
            (Some(subject_rect), Some(index_rect)) => (
                Some(self.read_region_text(frame, subject_rect)?),
                Some(self.read_index(frame, index_rect)?),
            ),
            _ => (None, None),
        };

        let record = Record {
            id: 0,
            surface_type: surface,
            text: text.to_string(),
            subject,
            index,
            keyphrases,
        };
        if let Some(sink) = &self.intermediates {
            sink.json("ocr-record", &record);
        }
        Ok(record)
    }

    /// Confidence-filtered paragraph read of one fixed region.
    fn read_region_text(&self, frame: &RgbaImage, rect: Rect) -> Result<String, IngestError> {
        let gray = imageops::grayscale(&rect.crop(frame));
        let blocks = self.ocr.read_blocks(&gray)?;
        Ok(ocr::text_from_blocks(&blocks).trim().to_string())
    }

    /// Reads the mailer's message number, correcting the usual OCR
    /// confusions first.
    fn read_index(&self, frame: &RgbaImage, rect: Rect) -> Result<u32, IngestError> {
        let raw = self.read_region_text(frame, rect)?;
        let corrected: String = raw
            .chars()
            .map(|c| match c {
                'o' => '0',
                'l' => '1',
                c => c,
            })
            .collect();
        corrected.trim().parse().map_err(|_| IngestError::BadIndex(raw))
    }

    fn dump_image(&self, tag: &str, img: &RgbaImage) {
        if let Some(sink) = &self.intermediates {
            sink.image(tag, img);
        }
    }
}

/// Rescales an arbitrary-resolution screenshot to the game's native
/// resolution and crops the stable playfield rectangle.
pub fn normalize_frame(img: &RgbaImage) -> Result<RgbaImage, IngestError> {
    normalize_frame_with(img, None)
}

fn normalize_frame_with(
    img: &RgbaImage,
    sink: Option<&IntermediateSink>,
) -> Result<RgbaImage, IngestError> {
    let scale = img.height() / NATIVE_HEIGHT;
    if scale == 0 {
        return Err(IngestError::Geometry(format!(
            "source height {} is shorter than the native {NATIVE_HEIGHT}",
            img.height()
        )));
    }

    let resized = imageops::resize(
        img,
        img.width() / scale,
        img.height() / scale,
        imageops::FilterType::Nearest,
    );
    if let Some(sink) = sink {
        sink.image("resized", &resized);
    }

    if resized.width() < NATIVE_WIDTH || resized.height() < NATIVE_HEIGHT {
        return Err(IngestError::Geometry(format!(
            "resized image {}x{} cannot contain the {NATIVE_WIDTH}x{NATIVE_HEIGHT} frame",
            resized.width(),
            resized.height()
        )));
    }

    let frame = middle_crop(&resized, NATIVE_WIDTH, NATIVE_HEIGHT);
    if let Some(sink) = sink {
        sink.image("cropped-game", &frame);
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::ocr::{OcrBlock, OcrOutput};
    use image::{GrayImage, Rgba};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Engine that replays canned outputs; block reads pop from a queue.
    struct StubOcr {
        words: OcrOutput,
        blocks: Mutex<VecDeque<Vec<OcrBlock>>>,
    }

    impl StubOcr {
        fn text(text: &str) -> Self {
            Self {
                words: OcrOutput { text: text.to_string(), words: Vec::new() },
                blocks: Mutex::new(VecDeque::new()),
            }
        }

        fn with_blocks(mut self, queue: Vec<Vec<OcrBlock>>) -> Self {
            self.blocks = Mutex::new(queue.into());
            self
        }
    }

    impl OcrEngine for StubOcr {
        fn read_words(&self, _img: &GrayImage) -> Result<OcrOutput, OcrError> {
            Ok(self.words.clone())
        }

        fn read_blocks(&self, _img: &GrayImage) -> Result<Vec<OcrBlock>, OcrError> {
            Ok(self.blocks.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    fn block(text: &str, confidence: f32) -> OcrBlock {
        OcrBlock { text: text.to_string(), confidence }
    }

    const TENT_COLOR: [u8; 4] = [40, 40, 40, 255];
    const MAILER_COLOR: [u8; 4] = [200, 200, 200, 255];
    const SCANNER_COLOR: [u8; 4] = [90, 90, 90, 255];

    /// Writes one uniform template per surface into a fresh directory.
    fn template_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (surface, color) in [
            (SurfaceType::Tent, TENT_COLOR),
            (SurfaceType::Mailer, MAILER_COLOR),
            (SurfaceType::Scanner, SCANNER_COLOR),
        ] {
            let img = RgbaImage::from_pixel(NATIVE_WIDTH, NATIVE_HEIGHT, Rgba(color));
            img.save(dir.path().join(format!("{}.png", surface.name()))).unwrap();
        }
        dir
    }

    fn ingestor(dir: &tempfile::TempDir, ocr: StubOcr) -> Ingestor {
        Ingestor::new(
            PipelineConfig { template_dir: dir.path().to_path_buf(), intermediates: None },
            Box::new(ocr),
        )
    }

    fn frame(color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(NATIVE_WIDTH, NATIVE_HEIGHT, Rgba(color))
    }

    #[test]
    fn normalize_downscales_and_crops() {
        // Constant 2x2 blocks survive nearest-neighbor halving unchanged.
        let src = RgbaImage::from_fn(1280, 960, |x, y| {
            Rgba([(x / 2) as u8, (y / 2) as u8, 0, 255])
        });

        let frame = normalize_frame(&src).unwrap();
        assert_eq!(frame.dimensions(), (NATIVE_WIDTH, NATIVE_HEIGHT));
        assert_eq!(frame.get_pixel(5, 7), &Rgba([5, 7, 0, 255]));
        assert_eq!(frame.get_pixel(300, 400), &Rgba([300u32 as u8, 400u32 as u8, 0, 255]));
    }

    #[test]
    fn normalize_centers_wider_sources() {
        let src = RgbaImage::from_fn(1400, 960, |x, y| {
            Rgba([(x / 2) as u8, (y / 2) as u8, 0, 255])
        });

        let frame = normalize_frame(&src).unwrap();
        assert_eq!(frame.dimensions(), (NATIVE_WIDTH, NATIVE_HEIGHT));
        // 700-wide resize leaves a 30-pixel inset on the left.
        assert_eq!(frame.get_pixel(0, 0), &Rgba([30, 0, 0, 255]));
    }

    #[test]
    fn normalize_rejects_short_sources() {
        let src = RgbaImage::new(640, 200);
        assert!(matches!(normalize_frame(&src), Err(IngestError::Geometry(_))));
    }

    #[test]
    fn normalize_rejects_narrow_sources() {
        let src = RgbaImage::new(300, 960);
        assert!(matches!(normalize_frame(&src), Err(IngestError::Geometry(_))));
    }

    #[test]
    fn classifies_the_closest_template() {
        let dir = template_dir();
        let ingestor = ingestor(&dir, StubOcr::text(""));

        let (surface, confidence) = ingestor.classify(&frame(TENT_COLOR)).unwrap();
        assert_eq!(surface, SurfaceType::Tent);
        assert!((confidence - 1.0).abs() < 1e-9);

        let (surface, _) = ingestor.classify(&frame(SCANNER_COLOR)).unwrap();
        assert_eq!(surface, SurfaceType::Scanner);
    }

    #[test]
    fn exact_ties_pick_the_first_declared_surface() {
        let dir = tempfile::tempdir().unwrap();
        for surface in SurfaceType::ALL {
            let img = frame(TENT_COLOR);
            img.save(dir.path().join(format!("{}.png", surface.name()))).unwrap();
        }

        let ingestor = ingestor(&dir, StubOcr::text(""));
        let (surface, confidence) = ingestor.classify(&frame(TENT_COLOR)).unwrap();
        assert_eq!(surface, SurfaceType::Tent);
        assert!((confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn low_confidence_fails_instead_of_guessing() {
        let dir = template_dir();
        let ingestor = ingestor(&dir, StubOcr::text("something"));

        let err = ingestor.ingest_frame(&frame([128, 128, 128, 255])).unwrap_err();
        match err {
            IngestError::LowConfidence { confidence } => assert!(confidence < CONFIDENCE_FLOOR),
            other => panic!("expected LowConfidence, got {other:?}"),
        }
    }

    #[test]
    fn tent_extraction_trims_text() {
        let dir = template_dir();
        let ingestor = ingestor(&dir, StubOcr::text("Offer 3 lights to the heavens.\n"));

        let record = ingestor.ingest_frame(&frame(TENT_COLOR)).unwrap();
        assert_eq!(record.id, 0);
        assert_eq!(record.surface_type, SurfaceType::Tent);
        assert_eq!(record.text, "Offer 3 lights to the heavens.");
        assert_eq!(record.subject, None);
        assert_eq!(record.index, None);
        assert!(record.keyphrases.is_empty());
    }

    #[test]
    fn empty_text_is_rejected() {
        let dir = template_dir();
        let ingestor = ingestor(&dir, StubOcr::text("  \n "));
        assert!(matches!(
            ingestor.ingest_frame(&frame(TENT_COLOR)),
            Err(IngestError::EmptyText)
        ));
    }

    #[test]
    fn untranslated_placeholder_is_rejected() {
        let dir = template_dir();
        let ingestor = ingestor(&dir, StubOcr::text("Cannot be deciphered.\n"));
        assert!(matches!(
            ingestor.ingest_frame(&frame(TENT_COLOR)),
            Err(IngestError::UntranslatedGlyph)
        ));
    }

    #[test]
    fn mailer_extraction_reads_header_fields() {
        let dir = template_dir();
        // Block reads happen in body, subject, index order.
        let ocr = StubOcr::text("ignored word pass").with_blocks(vec![
            vec![block("The winged horse awaits.", 88.0), block("l|;:", 20.0)],
            vec![block("From the elder", 92.0)],
            vec![block("1o", 90.0)],
        ]);
        let ingestor = ingestor(&dir, ocr);

        let record = ingestor.ingest_frame(&frame(MAILER_COLOR)).unwrap();
        assert_eq!(record.surface_type, SurfaceType::Mailer);
        assert_eq!(record.text, "The winged horse awaits.");
        assert_eq!(record.subject, Some("From the elder".to_string()));
        assert_eq!(record.index, Some(10));
    }

    #[test]
    fn mailer_with_garbage_index_fails() {
        let dir = template_dir();
        let ocr = StubOcr::text("body").with_blocks(vec![
            vec![block("body text", 95.0)],
            vec![block("subject", 95.0)],
            vec![block("#?", 95.0)],
        ]);
        let ingestor = ingestor(&dir, ocr);

        assert!(matches!(
            ingestor.ingest_frame(&frame(MAILER_COLOR)),
            Err(IngestError::BadIndex(_))
        ));
    }

    #[test]
    fn missing_template_surfaces_as_template_error() {
        let dir = tempfile::tempdir().unwrap();
        let ingestor = ingestor(&dir, StubOcr::text(""));
        assert!(matches!(
            ingestor.classify(&frame(TENT_COLOR)),
            Err(IngestError::Template(_))
        ));
    }
}
