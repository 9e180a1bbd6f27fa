//! Color-keyed phrase extraction from OCR word boxes.

use std::collections::BTreeMap;

use image::{Rgba, RgbaImage};

use crate::imageutil::{color_delta, dominant_color};
use crate::model::KeyphraseClass;
use crate::ocr::OcrWord;

/// Text color the game uses for location keyphrases.
const BLUE_SWATCH: Rgba<u8> = Rgba([100, 182, 227, 255]);
/// Text color the game uses for item keyphrases.
const GREEN_SWATCH: Rgba<u8> = Rgba([96, 229, 147, 255]);
/// Channel brightness a pixel needs before it counts toward the word color.
const BRIGHTNESS_FLOOR: u8 = 0xc0;
/// Maximum distance from a swatch for a word to take its class.
const SWATCH_DELTA: u32 = 20;

/// Classifies one cropped word image by its dominant color.
pub fn word_class(word_img: &RgbaImage) -> KeyphraseClass {
    let Some(color) = dominant_color(word_img, BRIGHTNESS_FLOOR) else {
        return KeyphraseClass::None;
    };

    if color_delta(color, BLUE_SWATCH) < SWATCH_DELTA {
        KeyphraseClass::Blue
    } else if color_delta(color, GREEN_SWATCH) < SWATCH_DELTA {
        KeyphraseClass::Green
    } else {
        KeyphraseClass::None
    }
}

/// Merges consecutive same-class words into phrases.
///
/// Word boxes are cropped out of `region`, the same non-inverted image the
/// OCR pass read. A word ending in "." has the dot trimmed from its text and
/// resets the merge state afterward, so phrases never span sentences.
pub fn aggregate(region: &RgbaImage, words: &[OcrWord]) -> BTreeMap<KeyphraseClass, Vec<String>> {
    let mut phrases: BTreeMap<KeyphraseClass, Vec<String>> = BTreeMap::new();
    let mut prev = KeyphraseClass::None;

    for word in words {
        let class = word_class(&word.bounds.crop(region));
        let trimmed = word.text.trim_end_matches('.');

        if class != KeyphraseClass::None {
            let list = phrases.entry(class).or_default();
            match list.last_mut() {
                Some(last) if class == prev => {
                    last.push(' ');
                    last.push_str(trimmed);
                }
                _ => list.push(trimmed.to_string()),
            }
        }

        prev = if trimmed != word.text { KeyphraseClass::None } else { class };
    }

    phrases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imageutil::Rect;

    const WORD_WIDTH: u32 = 40;
    const WORD_HEIGHT: u32 = 14;

    /// Paints one word box per entry on a dark strip and returns the strip
    /// plus matching OCR words.
    fn strip(words: &[(&str, Rgba<u8>)]) -> (RgbaImage, Vec<OcrWord>) {
        let mut img = RgbaImage::from_pixel(
            WORD_WIDTH * words.len() as u32,
            WORD_HEIGHT,
            Rgba([20, 20, 20, 255]),
        );
        let mut out = Vec::new();
        for (i, (text, color)) in words.iter().enumerate() {
            let bounds = Rect::new(WORD_WIDTH * i as u32, 0, WORD_WIDTH, WORD_HEIGHT);
            for dy in 0..bounds.height {
                for dx in 0..bounds.width {
                    img.put_pixel(bounds.x + dx, bounds.y + dy, *color);
                }
            }
            out.push(OcrWord { text: text.to_string(), confidence: 90.0, bounds });
        }
        (img, out)
    }

    const BLUE: Rgba<u8> = Rgba([100, 182, 227, 255]);
    const GREEN: Rgba<u8> = Rgba([96, 229, 147, 255]);
    const PLAIN: Rgba<u8> = Rgba([230, 232, 236, 255]);

    #[test]
    fn classifies_word_colors() {
        let blue = RgbaImage::from_pixel(8, 8, BLUE);
        assert_eq!(word_class(&blue), KeyphraseClass::Blue);

        let green = RgbaImage::from_pixel(8, 8, GREEN);
        assert_eq!(word_class(&green), KeyphraseClass::Green);

        let plain = RgbaImage::from_pixel(8, 8, PLAIN);
        assert_eq!(word_class(&plain), KeyphraseClass::None);

        let dark = RgbaImage::from_pixel(8, 8, Rgba([30, 30, 30, 255]));
        assert_eq!(word_class(&dark), KeyphraseClass::None);
    }

    #[test]
    fn near_swatch_colors_still_classify() {
        let near_blue = RgbaImage::from_pixel(8, 8, Rgba([105, 178, 230, 255]));
        assert_eq!(word_class(&near_blue), KeyphraseClass::Blue);

        let off_blue = RgbaImage::from_pixel(8, 8, Rgba([115, 170, 230, 255]));
        assert_eq!(word_class(&off_blue), KeyphraseClass::None);
    }

    #[test]
    fn merges_consecutive_words_and_resets_on_sentence_end() {
        let (img, words) = strip(&[
            ("Blue1", BLUE),
            ("Blue2", BLUE),
            ("plain", PLAIN),
            ("Green1.", GREEN),
        ]);

        let phrases = aggregate(&img, &words);
        assert_eq!(phrases[&KeyphraseClass::Blue], vec!["Blue1 Blue2"]);
        assert_eq!(phrases[&KeyphraseClass::Green], vec!["Green1"]);
        assert!(!phrases.contains_key(&KeyphraseClass::None));
    }

    #[test]
    fn sentence_boundary_splits_same_class_runs() {
        let (img, words) = strip(&[("Sacred.", BLUE), ("Orb", BLUE)]);

        let phrases = aggregate(&img, &words);
        assert_eq!(phrases[&KeyphraseClass::Blue], vec!["Sacred", "Orb"]);
    }

    #[test]
    fn interleaved_classes_start_new_phrases() {
        let (img, words) = strip(&[
            ("Grail", BLUE),
            ("weights", GREEN),
            ("Shrine", BLUE),
        ]);

        let phrases = aggregate(&img, &words);
        assert_eq!(phrases[&KeyphraseClass::Blue], vec!["Grail", "Shrine"]);
        assert_eq!(phrases[&KeyphraseClass::Green], vec!["weights"]);
    }

    #[test]
    fn plain_words_produce_no_phrases() {
        let (img, words) = strip(&[("just", PLAIN), ("text", PLAIN)]);
        assert!(aggregate(&img, &words).is_empty());
    }
}
