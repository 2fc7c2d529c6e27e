use std::collections::HashMap;
use std::path::Path;

use image::imageops::FilterType;
use image::RgbaImage;

use hljt_core::{Hand, Sex, StimulusKey};

use crate::error::StimulusError;

/// Prepared hand images keyed by sex, hand and view angle.
///
/// Every image is trimmed to its visible bounding box and resized to a
/// common height before it is stored, so downstream compositing can treat
/// all hands as same-scale sprites.
#[derive(Debug)]
pub struct StimulusBank {
    images: HashMap<StimulusKey, RgbaImage>,
    target_height: u32,
}

impl StimulusBank {
    /// Loads and prepares one image per key from `dir`. Files are named
    /// `{sex}_{hand}_{angle}.png`, e.g. `F_L_60.png`; a missing or broken
    /// file fails the whole load.
    pub fn load(dir: &Path, angles: &[u32], target_height: u32) -> Result<Self, StimulusError> {
        let mut images = HashMap::new();
        for sex in [Sex::Female, Sex::Male] {
            for hand in [Hand::Left, Hand::Right] {
                for &angle in angles {
                    let key = StimulusKey::new(sex, hand, angle);
                    let path = dir.join(format!("{}.png", key.file_stem()));
                    let raw = load_rgba(&path)?;
                    let prepared = prepare(&raw, target_height)
                        .ok_or(StimulusError::FullyTransparent { key })?;
                    tracing::debug!(
                        key = %key,
                        width = prepared.width(),
                        height = prepared.height(),
                        "prepared stimulus"
                    );
                    images.insert(key, prepared);
                }
            }
        }
        Ok(Self {
            images,
            target_height,
        })
    }

    pub fn get(&self, key: &StimulusKey) -> Option<&RgbaImage> {
        self.images.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &StimulusKey> {
        self.images.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StimulusKey, &RgbaImage)> {
        self.images.iter()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn target_height(&self) -> u32 {
        self.target_height
    }
}

fn load_rgba(path: &Path) -> Result<RgbaImage, StimulusError> {
    let bytes = std::fs::read(path).map_err(|source| StimulusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let img = image::load_from_memory(&bytes).map_err(|source| StimulusError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.into_rgba8())
}

/// Trims to the visible bounding box, then resizes to `target_height`
/// keeping aspect ratio. `None` when the image has no visible pixels.
pub fn prepare(img: &RgbaImage, target_height: u32) -> Option<RgbaImage> {
    let trimmed = trim(img)?;
    Some(scale_to_height(&trimmed, target_height))
}

/// Tight crop to the bounding box of pixels with non-zero alpha.
pub fn trim(img: &RgbaImage) -> Option<RgbaImage> {
    let (w, h) = img.dimensions();
    let mut min_x = w;
    let mut min_y = h;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut seen = false;

    for (x, y, px) in img.enumerate_pixels() {
        if px[3] > 0 {
            seen = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !seen {
        return None;
    }

    let cropped = image::imageops::crop_imm(img, min_x, min_y, max_x - min_x + 1, max_y - min_y + 1);
    Some(cropped.to_image())
}

/// Resizes to `height`, deriving the width from the source aspect ratio.
pub fn scale_to_height(img: &RgbaImage, height: u32) -> RgbaImage {
    let (w0, h0) = img.dimensions();
    let width = ((height as f64 * w0 as f64 / h0 as f64).round() as u32).max(1);
    image::imageops::resize(img, width, height.max(1), FilterType::Lanczos3)
}

/// Resizes to `width`, deriving the height from the source aspect ratio.
pub fn scale_to_width(img: &RgbaImage, width: u32) -> RgbaImage {
    let (w0, h0) = img.dimensions();
    let height = ((width as f64 * h0 as f64 / w0 as f64).round() as u32).max(1);
    image::imageops::resize(img, width.max(1), height, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn blob(w: u32, h: u32, x0: u32, x1: u32, y0: u32, y1: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
                Rgba([200, 180, 160, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn trim_finds_tight_alpha_bounding_box() {
        let img = blob(10, 10, 2, 5, 3, 7);
        let trimmed = trim(&img).unwrap();
        assert_eq!(trimmed.dimensions(), (3, 4));
        assert_eq!(trimmed.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn trim_rejects_fully_transparent_images() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
        assert!(trim(&img).is_none());
    }

    #[test]
    fn scale_to_height_rounds_width_from_aspect_ratio() {
        let img = blob(64, 48, 0, 64, 0, 48);
        let scaled = scale_to_height(&img, 100);
        assert_eq!(scaled.dimensions(), (133, 100));
    }

    #[test]
    fn scale_to_width_rounds_height_from_aspect_ratio() {
        let img = blob(64, 48, 0, 64, 0, 48);
        let scaled = scale_to_width(&img, 32);
        assert_eq!(scaled.dimensions(), (32, 24));
    }

    #[test]
    fn load_prepares_every_sex_hand_angle_combination() {
        let dir = tempfile::tempdir().unwrap();
        let angles = [60, 90, 120];
        for sex in [Sex::Female, Sex::Male] {
            for hand in [Hand::Left, Hand::Right] {
                for angle in angles {
                    let key = StimulusKey::new(sex, hand, angle);
                    blob(40, 60, 8, 32, 10, 50)
                        .save(dir.path().join(format!("{}.png", key.file_stem())))
                        .unwrap();
                }
            }
        }

        let bank = StimulusBank::load(dir.path(), &angles, 100).unwrap();
        assert_eq!(bank.len(), 12);
        for sex in [Sex::Female, Sex::Male] {
            for hand in [Hand::Left, Hand::Right] {
                for angle in angles {
                    let key = StimulusKey::new(sex, hand, angle);
                    // visible blob is 24x40, so height 100 gives width 60
                    let img = bank.get(&key).unwrap();
                    assert_eq!(img.dimensions(), (60, 100));
                }
            }
        }
    }

    #[test]
    fn load_reports_the_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let angles = [60];
        for sex in [Sex::Female, Sex::Male] {
            let key = StimulusKey::new(sex, Hand::Left, 60);
            blob(40, 60, 8, 32, 10, 50)
                .save(dir.path().join(format!("{}.png", key.file_stem())))
                .unwrap();
        }
        // both right-hand files are absent
        let err = StimulusBank::load(dir.path(), &angles, 100).unwrap_err();
        match err {
            StimulusError::Io { path, .. } => {
                assert!(path.to_string_lossy().contains("F_R_60"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
