//! Photo description: one source image in, one metadata record out.
//!
//! The [`PhotoDescriptor`] trait is the seam between the tree builder and
//! the pixel work. The builder only knows the contract: given a source
//! image, produce a [`PhotoRecord`] or signal "skip" (`Ok(None)`) when the
//! file is itself a generated derivative. Everything about decoding,
//! resizing and encoding stays behind the trait, so traversal logic tests
//! run against [`tests::MockDescriptor`] without touching pixels.
//!
//! The production implementation, [`ImageDescriptor`], is pure Rust on the
//! `image` crate:
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF, BMP) | `image` crate (pure Rust decoders) |
//! | Resize | `DynamicImage::resize` with `Lanczos3` filter |
//! | Encode derivative → AVIF | `image::codecs::avif::AvifEncoder` |
//! | EXIF metadata | custom [`exif`](crate::exif) parser (JPEG APP1 + TIFF IFD) |
//!
//! Derivatives are written next to the source as `<stem>.min.avif`. The
//! `.min.` infix is what marks a file as generated — both the builder's
//! candidate filter and the skip signal here key off it, case-insensitively.

use crate::config::DerivativesConfig;
use crate::exif::{self, ExifSummary};
use crate::types::{IsoSpeed, PhotoRecord};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Filename infix marking a generated derivative.
pub const DERIVATIVE_MARKER: &str = ".min.";

/// True when the filename carries the derivative marker (case-insensitive).
pub fn is_derivative(file_name: &str) -> bool {
    file_name.to_lowercase().contains(DERIVATIVE_MARKER)
}

/// Trait for photo description backends.
///
/// `Sync` so one descriptor can serve rayon workers describing an album's
/// photos in parallel.
pub trait PhotoDescriptor: Sync {
    /// Produce the metadata record for one source image.
    ///
    /// `Ok(None)` is the skip signal: the file is a derivative that was
    /// placed in the folder directly (generated ones never reach the
    /// candidate set) and must be omitted from the album.
    fn describe(&self, path: &Path) -> Result<Option<PhotoRecord>, DescriptorError>;
}

/// Production descriptor on the `image` crate.
pub struct ImageDescriptor {
    site_root: PathBuf,
    min_width: u32,
    quality: u8,
}

impl ImageDescriptor {
    pub fn new(site_root: &Path, config: &DerivativesConfig) -> Self {
        Self {
            site_root: site_root.to_path_buf(),
            min_width: config.min_width,
            quality: config.quality.clamp(1, 100) as u8,
        }
    }

    /// Site-root-relative path with explicit `./` prefix.
    fn relative(&self, path: &Path) -> Result<String, DescriptorError> {
        let rel = path.strip_prefix(&self.site_root).map_err(|_| {
            DescriptorError::ProcessingFailed(format!(
                "{} is outside the site root",
                path.display()
            ))
        })?;
        Ok(format!("./{}", rel.display()))
    }

    /// Write the `<stem>.min.avif` derivative unless it already exists.
    fn ensure_derivative(
        &self,
        image: &DynamicImage,
        min_path: &Path,
    ) -> Result<(), DescriptorError> {
        if min_path.exists() {
            return Ok(());
        }

        // Never upscale: sources narrower than min_width are encoded as-is.
        let resized = if image.width() > self.min_width {
            let height =
                (image.height() as f64 * self.min_width as f64 / image.width() as f64).round();
            image.resize(self.min_width, height as u32, FilterType::Lanczos3)
        } else {
            image.clone()
        };

        let writer = BufWriter::new(File::create(min_path)?);
        let encoder =
            image::codecs::avif::AvifEncoder::new_with_speed_quality(writer, 6, self.quality);
        DynamicImage::ImageRgb8(resized.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(|e| {
                DescriptorError::ProcessingFailed(format!(
                    "Failed to encode {}: {}",
                    min_path.display(),
                    e
                ))
            })
    }
}

impl PhotoDescriptor for ImageDescriptor {
    fn describe(&self, path: &Path) -> Result<Option<PhotoRecord>, DescriptorError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if is_derivative(&file_name) {
            return Ok(None);
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let min_path = path.with_file_name(format!("{stem}.min.avif"));

        let image = ImageReader::open(path)?.decode().map_err(|e| {
            DescriptorError::ProcessingFailed(format!(
                "Failed to decode {}: {}",
                path.display(),
                e
            ))
        })?;

        self.ensure_derivative(&image, &min_path)?;

        let summary = exif::read_exif(path);
        Ok(Some(PhotoRecord {
            width: image.width(),
            height: image.height(),
            camera: format_camera(&summary),
            aperture: format_aperture(summary.f_number),
            exposure: format_exposure(summary.exposure),
            iso: summary
                .iso
                .map(IsoSpeed::Rating)
                .unwrap_or_default(),
            focal: format_focal(summary.focal),
            path: self.relative(path)?,
            min_path: self.relative(&min_path)?,
        }))
    }
}

// ---------------------------------------------------------------------------
// EXIF value formatting
// ---------------------------------------------------------------------------

const UNKNOWN: &str = "Unknown";

/// `"Make Model"` from whichever parts EXIF provides, `"Unknown"` otherwise.
fn format_camera(summary: &ExifSummary) -> String {
    let parts: Vec<&str> = [summary.make.as_deref(), summary.model.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if parts.is_empty() {
        UNKNOWN.to_string()
    } else {
        parts.join(" ")
    }
}

fn format_aperture(f_number: Option<(u32, u32)>) -> String {
    match rational_value(f_number) {
        Some(value) => format!("f/{}", trim_decimal(value)),
        None => UNKNOWN.to_string(),
    }
}

/// Shutter speed: fractions of a second render as `1/Ns`, longer exposures
/// as whole seconds.
fn format_exposure(exposure: Option<(u32, u32)>) -> String {
    let Some((num, den)) = exposure else {
        return UNKNOWN.to_string();
    };
    if num == 0 || den == 0 {
        return UNKNOWN.to_string();
    }
    let value = num as f64 / den as f64;
    if value < 1.0 {
        format!("1/{}s", (den as f64 / num as f64).round() as u64)
    } else {
        format!("{}s", value.trunc() as u64)
    }
}

fn format_focal(focal: Option<(u32, u32)>) -> String {
    match rational_value(focal) {
        Some(value) => format!("{}mm", trim_decimal(value)),
        None => UNKNOWN.to_string(),
    }
}

fn rational_value(rational: Option<(u32, u32)>) -> Option<f64> {
    let (num, den) = rational?;
    (den != 0).then(|| num as f64 / den as f64)
}

/// Render with at most one decimal place, dropping a trailing `.0`.
fn trim_decimal(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as u64)
    } else {
        format!("{rounded:.1}")
    }
}
