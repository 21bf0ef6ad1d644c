//! Image upload processing
//!
//! Validates, normalizes and stores uploaded images. Every stored file gets
//! a random name so uploads can never collide or clobber each other, alpha
//! is flattened onto white, oversized images are scaled down and a square
//! bounded thumbnail can be produced alongside the main file.
//!
//! All functions here do blocking filesystem and CPU work; async callers
//! run them inside `spawn_blocking`.

use std::fs;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::upload::thumbnail_path_for;

/// Extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Images larger than this on either axis are scaled down.
pub const MAX_DIMENSION: u32 = 2000;

/// Thumbnails fit within this square, preserving aspect ratio.
pub const THUMBNAIL_DIMENSION: u32 = 300;

const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("file type not allowed, allowed types: {}", ALLOWED_EXTENSIONS.join(", "))]
    TypeNotAllowed,

    #[error("no file selected")]
    NoFile,

    #[error("file too large, maximum size: {max_mb}MB")]
    TooLarge { max_mb: u64 },

    #[error("invalid image file: {0}")]
    InvalidImage(String),

    #[error("image storage failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A successfully stored upload.
#[derive(Debug, Clone)]
pub struct SavedImage {
    pub filename: String,
    pub original_filename: String,
    pub filepath: PathBuf,
    pub file_size: u64,
    pub thumbnail_path: Option<PathBuf>,
}

/// Lowercased extension of a filename, if it has one.
fn extension_of(filename: &str) -> Option<String> {
    filename.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

/// Whether a filename carries an allowed image extension.
pub fn allowed_file(filename: &str) -> bool {
    extension_of(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Validate an upload before any processing happens.
///
/// Checks the filename extension, the size bound and that the bytes decode
/// as an image at all.
pub fn validate_upload(filename: &str, data: &[u8], max_size_mb: u64) -> Result<(), ImageError> {
    if filename.is_empty() {
        return Err(ImageError::NoFile);
    }
    if !allowed_file(filename) {
        return Err(ImageError::TypeNotAllowed);
    }
    let max_bytes = max_size_mb * 1024 * 1024;
    if data.len() as u64 > max_bytes {
        return Err(ImageError::TooLarge { max_mb: max_size_mb });
    }
    image::load_from_memory(data).map_err(|e| ImageError::InvalidImage(e.to_string()))?;
    Ok(())
}

/// Process and store an uploaded image.
///
/// The raw bytes go to a `.tmp` sidecar first; the decoded image is
/// flattened, optionally downscaled, re-encoded into place and the sidecar
/// removed. Any failure cleans up every partial file before returning.
pub fn save_image(
    original_filename: &str,
    data: &[u8],
    upload_dir: &Path,
    resize: bool,
    create_thumbnail: bool,
) -> Result<SavedImage, ImageError> {
    if original_filename.is_empty() {
        return Err(ImageError::NoFile);
    }
    let ext = extension_of(original_filename)
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .ok_or(ImageError::TypeNotAllowed)?;

    fs::create_dir_all(upload_dir)?;

    let unique_filename = format!("{}.{}", Uuid::new_v4().simple(), ext);
    let filepath = upload_dir.join(&unique_filename);
    let temp_path = upload_dir.join(format!("{}.tmp", unique_filename));

    let result = process_and_store(data, &filepath, &temp_path, resize, create_thumbnail)
        .and_then(|thumbnail_path| {
            let file_size = fs::metadata(&filepath)?.len();
            Ok((thumbnail_path, file_size))
        });

    match result {
        Ok((thumbnail_path, file_size)) => {
            info!(filename = %unique_filename, size = file_size, "stored uploaded image");
            Ok(SavedImage {
                filename: unique_filename,
                original_filename: original_filename.to_string(),
                filepath,
                file_size,
                thumbnail_path,
            })
        }
        Err(e) => {
            // Never leave partial files behind
            let _ = fs::remove_file(&temp_path);
            let _ = fs::remove_file(&filepath);
            let _ = fs::remove_file(thumbnail_path_for(&filepath));
            warn!(filename = %original_filename, error = %e, "image processing failed");
            Err(e)
        }
    }
}

fn process_and_store(
    data: &[u8],
    filepath: &Path,
    temp_path: &Path,
    resize: bool,
    create_thumbnail: bool,
) -> Result<Option<PathBuf>, ImageError> {
    fs::write(temp_path, data)?;

    let decoded =
        image::load_from_memory(data).map_err(|e| ImageError::InvalidImage(e.to_string()))?;
    let mut img = flatten_onto_white(decoded);

    if resize && (img.width() > MAX_DIMENSION || img.height() > MAX_DIMENSION) {
        img = img.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3);
        info!(width = img.width(), height = img.height(), "resized oversized image");
    }

    encode_to_file(&img, filepath)?;

    let thumbnail_path = if create_thumbnail {
        let thumb_path = thumbnail_path_for(filepath);
        let thumb = img.resize(THUMBNAIL_DIMENSION, THUMBNAIL_DIMENSION, FilterType::Lanczos3);
        encode_to_file(&thumb, &thumb_path)?;
        Some(thumb_path)
    } else {
        None
    };

    fs::remove_file(temp_path)?;
    Ok(thumbnail_path)
}

/// Composite transparent pixels onto a white background.
///
/// Keeps JPEG re-encoding from turning transparency into black and makes
/// every stored image a plain RGB raster.
fn flatten_onto_white(img: DynamicImage) -> DynamicImage {
    if !img.color().has_alpha() {
        return img;
    }
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut flat = RgbImage::new(width, height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        flat.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    DynamicImage::ImageRgb8(flat)
}

fn encode_to_file(img: &DynamicImage, path: &Path) -> Result<(), ImageError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if ext == "jpg" || ext == "jpeg" {
        let file = fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
        img.write_with_encoder(encoder)
            .map_err(|e| ImageError::InvalidImage(e.to_string()))?;
    } else {
        img.save(path)
            .map_err(|e| ImageError::InvalidImage(e.to_string()))?;
    }
    Ok(())
}

/// Delete a stored image and its thumbnail if one exists.
///
/// Returns `true` only when the main file existed and was removed. Never
/// returns an error; failures are logged and reported as `false`.
pub fn delete_image(filepath: &Path, delete_thumbnail: bool) -> bool {
    if !filepath.exists() {
        return false;
    }
    match fs::remove_file(filepath) {
        Ok(()) => {
            info!(path = %filepath.display(), "deleted image");
            if delete_thumbnail {
                let thumb = thumbnail_path_for(filepath);
                if thumb.exists() {
                    if let Err(e) = fs::remove_file(&thumb) {
                        warn!(path = %thumb.display(), error = %e, "failed to delete thumbnail");
                    }
                }
            }
            true
        }
        Err(e) => {
            warn!(path = %filepath.display(), error = %e, "failed to delete image");
            false
        }
    }
}
