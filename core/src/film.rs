//! Film

use crate::base::*;
use crate::error::*;
use crate::spectrum::*;
use exr::prelude::{
    Encoding, Image, ImageAttributes, IntegerBounds, Layer, LayerAttributes, SpecificChannels, Vec2, WritableImage,
};
use image::{ImageBuffer, ImageFormat, Rgb};
use std::ops::{Index, IndexMut};
use std::result::Result;
use std::sync::{Arc, Mutex};

/// A row-major RGB image.
#[derive(Clone, Debug, PartialEq)]
pub struct Bitmap {
    /// Width in pixels.
    pub width: usize,

    /// Height in pixels.
    pub height: usize,

    /// Pixel values.
    pub pixels: Vec<Spectrum>,
}

impl Bitmap {
    /// Returns a black bitmap.
    ///
    /// * `width`  - Width in pixels.
    /// * `height` - Height in pixels.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Spectrum::ZERO; width * height],
        }
    }

    /// Returns a bitmap with every channel replaced by its absolute value.
    pub fn abs(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(|p| p.abs()).collect(),
        }
    }

    /// Returns the pixels as interleaved RGB values.
    pub fn to_rgb(&self) -> Vec<Float> {
        self.pixels.iter().flat_map(|p| p.c).collect()
    }
}

impl Index<(usize, usize)> for Bitmap {
    type Output = Spectrum;

    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.pixels[y * self.width + x]
    }
}

impl IndexMut<(usize, usize)> for Bitmap {
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        &mut self.pixels[y * self.width + x]
    }
}

/// Film interface receiving bitmaps to export.
pub trait Film: Send {
    /// Replaces the image held by the film.
    ///
    /// * `bitmap` - The image.
    fn set_bitmap(&mut self, bitmap: &Bitmap);

    /// Writes the held image. The film's extension is appended to `path`.
    ///
    /// * `path` - Output path without extension.
    fn develop(&mut self, path: &str) -> Result<(), GVPMError>;

    /// Returns the file extension including the dot.
    fn extension(&self) -> &str;
}

/// Film writing OpenEXR files.
#[derive(Clone, Debug, Default)]
pub struct ExrFilm {
    bitmap: Option<Bitmap>,
}

impl ExrFilm {
    /// Returns a new `ExrFilm`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Film for ExrFilm {
    fn set_bitmap(&mut self, bitmap: &Bitmap) {
        self.bitmap = Some(bitmap.clone());
    }

    fn develop(&mut self, path: &str) -> Result<(), GVPMError> {
        let bitmap = match self.bitmap.as_ref() {
            Some(b) => b,
            None => return Ok(()),
        };
        let path = format!("{}{}", path, self.extension());
        info!("Writing image {} with resolution {}x{}", path, bitmap.width, bitmap.height);

        let width = bitmap.width;
        let size = Vec2(bitmap.width, bitmap.height);
        let layer = Layer::new(
            size,
            LayerAttributes::named("render"),
            Encoding::SMALL_LOSSLESS,
            SpecificChannels::rgb(|pos: Vec2<usize>| {
                let p = bitmap.pixels[pos.1 * width + pos.0];
                (p[0], p[1], p[2])
            }),
        );

        let attributes = ImageAttributes::new(IntegerBounds::from_dimensions(size));
        Image::empty(attributes)
            .with_layer(layer)
            .write()
            .to_file(&path)
            .map_err(|err| GVPMError::Image(format!("Error saving output image {path}: {err}")))
    }

    fn extension(&self) -> &str {
        ".exr"
    }
}

/// Film writing gamma corrected 8-bit PNG files.
#[derive(Clone, Debug, Default)]
pub struct PngFilm {
    bitmap: Option<Bitmap>,
}

impl PngFilm {
    /// Returns a new `PngFilm`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Film for PngFilm {
    fn set_bitmap(&mut self, bitmap: &Bitmap) {
        self.bitmap = Some(bitmap.clone());
    }

    fn develop(&mut self, path: &str) -> Result<(), GVPMError> {
        let bitmap = match self.bitmap.as_ref() {
            Some(b) => b,
            None => return Ok(()),
        };
        let path = format!("{}{}", path, self.extension());
        info!("Writing image {path} with resolution {}x{}", bitmap.width, bitmap.height);

        let mut imgbuf = ImageBuffer::new(bitmap.width as u32, bitmap.height as u32);
        for (x, y, pixel) in imgbuf.enumerate_pixels_mut() {
            let p = bitmap[(x as usize, y as usize)];
            *pixel = Rgb([clamp_byte(p[0]), clamp_byte(p[1]), clamp_byte(p[2])]);
        }
        imgbuf
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|err| GVPMError::Image(format!("Error saving output image {path}: {err}.")))
    }

    fn extension(&self) -> &str {
        ".png"
    }
}

/// Film keeping developed images in memory. Clones share the same storage.
#[derive(Clone, Debug, Default)]
pub struct MemoryFilm {
    bitmap: Option<Bitmap>,
    developed: Arc<Mutex<Vec<(String, Bitmap)>>>,
}

impl MemoryFilm {
    /// Returns a new `MemoryFilm`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the developed images as `(path, bitmap)` pairs in order.
    pub fn developed(&self) -> Vec<(String, Bitmap)> {
        match self.developed.lock() {
            Ok(d) => d.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns the last image developed with the given path.
    ///
    /// * `path` - Path including extension.
    pub fn find(&self, path: &str) -> Option<Bitmap> {
        self.developed().into_iter().rev().find(|(p, _)| p == path).map(|(_, b)| b)
    }
}

impl Film for MemoryFilm {
    fn set_bitmap(&mut self, bitmap: &Bitmap) {
        self.bitmap = Some(bitmap.clone());
    }

    fn develop(&mut self, path: &str) -> Result<(), GVPMError> {
        if let Some(b) = self.bitmap.as_ref() {
            let path = format!("{}{}", path, self.extension());
            let mut developed = self
                .developed
                .lock()
                .map_err(|_| GVPMError::Image(format!("film storage poisoned while writing {path}")))?;
            developed.push((path, b.clone()));
        }
        Ok(())
    }

    fn extension(&self) -> &str {
        ".mem"
    }
}

/// Clamp floating point value to 8-bit range [0, 255] after gamma correction.
///
/// * `v` - Value to clamp.
#[inline]
fn clamp_byte(v: Float) -> u8 {
    clamp(255.0 * gamma_correct(v) + 0.5, 0.0, 255.0) as u8
}

/// sRGB transfer curve.
///
/// * `value` - Linear value.
#[inline]
fn gamma_correct(value: Float) -> Float {
    if value <= 0.0031308 {
        12.92 * value
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> Bitmap {
        let mut b = Bitmap::new(4, 3);
        for y in 0..3 {
            for x in 0..4 {
                b[(x, y)] = Spectrum::rgb(x as Float * 0.25, y as Float * 0.5, -0.5);
            }
        }
        b
    }

    #[test]
    fn bitmap_indexing_is_row_major() {
        let b = gradient();
        assert_eq!(b.pixels[4 + 1], b[(1, 1)]);
        assert_eq!(b.to_rgb().len(), 36);
        assert_eq!(b.abs()[(0, 0)][2], 0.5);
    }

    #[test]
    fn memory_film_records_paths() {
        let mut film = MemoryFilm::new();
        let shared = film.clone();
        film.develop("nothing").unwrap();
        assert!(shared.developed().is_empty());

        film.set_bitmap(&gradient());
        film.develop("out_recons_1").unwrap();
        assert!(shared.find("out_recons_1.mem").is_some());
    }

    #[test]
    fn exr_and_png_files_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("image").to_string_lossy().to_string();

        let mut exr = ExrFilm::new();
        exr.set_bitmap(&gradient());
        exr.develop(&base).unwrap();
        assert!(dir.path().join("image.exr").exists());

        let mut png = PngFilm::new();
        png.set_bitmap(&gradient());
        png.develop(&base).unwrap();
        assert!(dir.path().join("image.png").exists());
    }

    #[test]
    fn bytes_are_clamped() {
        assert_eq!(clamp_byte(-1.0), 0);
        assert_eq!(clamp_byte(10.0), 255);
    }
}
