//! Tesseract-backed OCR engine.
//!
//! Shells out to the Tesseract executable with TSV output and parses the
//! word rows back into structured data.

use std::path::PathBuf;
use std::process::Command;

use image::GrayImage;
use tempfile::NamedTempFile;

use crate::error::OcrError;
use crate::imageutil::Rect;

use super::{OcrBlock, OcrEngine, OcrOutput, OcrWord};

pub struct TesseractEngine {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
    lang: String,
}

impl TesseractEngine {
    pub fn new(executable: impl Into<PathBuf>, lang: impl Into<String>) -> Self {
        Self { executable: executable.into(), tessdata: None, lang: lang.into() }
    }

    /// Points the engine at an explicit tessdata directory.
    pub fn with_tessdata(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tessdata = Some(dir.into());
        self
    }

    /// Runs Tesseract over `img` and returns the raw TSV output.
    fn run_tsv(&self, img: &GrayImage) -> Result<String, OcrError> {
        let input = NamedTempFile::with_suffix(".png")?;
        img.save(input.path())
            .map_err(|err| OcrError::Engine(format!("failed to stage input image: {err}")))?;

        // Tesseract appends .tsv to the output base itself.
        let output_base = NamedTempFile::new()?;
        let base = output_base.path().to_string_lossy().to_string();

        let mut cmd = Command::new(&self.executable);
        cmd.arg(input.path()).arg(&base);
        if let Some(dir) = &self.tessdata {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.arg("-l")
            .arg(&self.lang)
            .arg("--psm")
            .arg("6") // Assume a single uniform block of text.
            .arg("tsv");

        let output = cmd.output()?;
        if !output.status.success() {
            return Err(OcrError::Engine(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        let tsv_path = format!("{base}.tsv");
        let tsv = std::fs::read_to_string(&tsv_path)?;
        let _ = std::fs::remove_file(&tsv_path);
        Ok(tsv)
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

impl OcrEngine for TesseractEngine {
    fn read_words(&self, img: &GrayImage) -> Result<OcrOutput, OcrError> {
        Ok(words_to_output(parse_tsv(&self.run_tsv(img)?)?))
    }

    fn read_blocks(&self, img: &GrayImage) -> Result<Vec<OcrBlock>, OcrError> {
        Ok(words_to_blocks(parse_tsv(&self.run_tsv(img)?)?))
    }
}

/// A single word (level 5) row of Tesseract's TSV output.
struct TsvWord {
    block: i32,
    par: i32,
    line: i32,
    conf: f32,
    bounds: Rect,
    text: String,
}

fn parse_tsv(tsv: &str) -> Result<Vec<TsvWord>, OcrError> {
    let mut words = Vec::new();

    for line in tsv.lines().skip(1) {
        // TSV fields: level, page_num, block_num, par_num, line_num,
        //             word_num, left, top, width, height, conf, text
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }

        let text = fields[11].trim();
        if text.is_empty() {
            continue;
        }

        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        if conf < 0.0 {
            continue;
        }

        let geom: Vec<u32> = fields[6..10]
            .iter()
            .map(|f| f.parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|err| OcrError::BadOutput(format!("bad word geometry {fields:?}: {err}")))?;

        words.push(TsvWord {
            block: fields[2].parse().unwrap_or(0),
            par: fields[3].parse().unwrap_or(0),
            line: fields[4].parse().unwrap_or(0),
            conf,
            bounds: Rect::new(geom[0], geom[1], geom[2], geom[3]),
            text: text.to_string(),
        });
    }

    Ok(words)
}

/// Rebuilds the page text line by line and keeps the word boxes.
fn words_to_output(words: Vec<TsvWord>) -> OcrOutput {
    let mut text = String::new();
    let mut out_words = Vec::with_capacity(words.len());
    let mut prev_line: Option<(i32, i32, i32)> = None;

    for word in words {
        let key = (word.block, word.par, word.line);
        match prev_line {
            None => {}
            Some(prev) if prev == key => text.push(' '),
            Some(_) => text.push('\n'),
        }
        text.push_str(&word.text);
        prev_line = Some(key);

        out_words.push(OcrWord {
            text: word.text,
            confidence: word.conf,
            bounds: word.bounds,
        });
    }

    OcrOutput { text, words: out_words }
}

/// Groups words into paragraphs; a paragraph's confidence is the mean of
/// its word confidences.
fn words_to_blocks(words: Vec<TsvWord>) -> Vec<OcrBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<(i32, i32)> = None;
    let mut parts: Vec<String> = Vec::new();
    let mut conf_sum = 0.0f32;

    let flush = |blocks: &mut Vec<OcrBlock>, parts: &mut Vec<String>, conf_sum: &mut f32| {
        if parts.is_empty() {
            return;
        }
        blocks.push(OcrBlock {
            text: parts.join(" "),
            confidence: *conf_sum / parts.len() as f32,
        });
        parts.clear();
        *conf_sum = 0.0;
    };

    for word in words {
        let key = (word.block, word.par);
        if current != Some(key) {
            flush(&mut blocks, &mut parts, &mut conf_sum);
            current = Some(key);
        }
        conf_sum += word.conf;
        parts.push(word.text);
    }
    flush(&mut blocks, &mut parts, &mut conf_sum);

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out
    }

    #[test]
    fn parses_word_rows_only() {
        let tsv = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t300\t40\t-1\t",
            "5\t1\t1\t1\t1\t1\t10\t5\t50\t12\t91.5\tOffer",
            "5\t1\t1\t1\t1\t2\t70\t5\t20\t12\t88.0\t3",
            "4\t1\t1\t1\t0\t0\t0\t0\t300\t20\t-1\t",
            "5\t1\t1\t1\t2\t1\t10\t20\t60\t12\t85.0\tlights",
        ]);

        let words = parse_tsv(&tsv).unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(words[0].text, "Offer");
        assert_eq!(words[0].bounds, Rect::new(10, 5, 50, 12));
        assert!((words[0].conf - 91.5).abs() < f32::EPSILON);
    }

    #[test]
    fn negative_confidence_words_are_skipped() {
        let tsv = tsv(&["5\t1\t1\t1\t1\t1\t10\t5\t50\t12\t-1\tghost"]);
        assert!(parse_tsv(&tsv).unwrap().is_empty());
    }

    #[test]
    fn output_text_preserves_line_breaks() {
        let tsv = tsv(&[
            "5\t1\t1\t1\t1\t1\t10\t5\t50\t12\t91.0\tOffer",
            "5\t1\t1\t1\t1\t2\t70\t5\t20\t12\t88.0\t3",
            "5\t1\t1\t1\t2\t1\t10\t20\t60\t12\t85.0\tlights",
            "5\t1\t2\t1\t1\t1\t10\t40\t30\t12\t80.0\tOK",
        ]);

        let out = words_to_output(parse_tsv(&tsv).unwrap());
        assert_eq!(out.text, "Offer 3\nlights\nOK");
        assert_eq!(out.words.len(), 4);
    }

    #[test]
    fn blocks_group_by_paragraph_and_average_confidence() {
        let tsv = tsv(&[
            "5\t1\t1\t1\t1\t1\t10\t5\t50\t12\t90.0\tfirst",
            "5\t1\t1\t1\t2\t1\t10\t20\t50\t12\t70.0\tparagraph",
            "5\t1\t1\t2\t1\t1\t10\t40\t50\t12\t50.0\tsecond",
        ]);

        let blocks = words_to_blocks(parse_tsv(&tsv).unwrap());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "first paragraph");
        assert!((blocks[0].confidence - 80.0).abs() < 0.01);
        assert_eq!(blocks[1].text, "second");
        assert!((blocks[1].confidence - 50.0).abs() < 0.01);
    }

    #[test]
    fn malformed_geometry_is_an_error() {
        let tsv = tsv(&["5\t1\t1\t1\t1\t1\tx\t5\t50\t12\t90.0\tword"]);
        assert!(matches!(parse_tsv(&tsv), Err(OcrError::BadOutput(_))));
    }
}
