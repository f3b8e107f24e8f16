use image::{imageops::FilterType, DynamicImage, ImageError, ImageFormat, ImageReader};
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;

use crate::staging::list_regular_files;

/// Long side of every published picture, in pixels
pub const DEFAULT_TARGET_LONG_SIDE: u32 = 1500;

/// Error type for resize operations
#[derive(Debug)]
pub enum TranscodeError {
    /// Input is not a picture we can decode
    Decode(String),
    /// Resized picture could not be encoded
    Encode(String),
    IoError(std::io::Error),
}

impl std::fmt::Display for TranscodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscodeError::Decode(msg) => write!(f, "Image decode error: {}", msg),
            TranscodeError::Encode(msg) => write!(f, "Image encode error: {}", msg),
            TranscodeError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for TranscodeError {}

impl From<std::io::Error> for TranscodeError {
    fn from(err: std::io::Error) -> Self {
        TranscodeError::IoError(err)
    }
}

/// Computes the output geometry for a picture of `width` x `height`
///
/// The longer side becomes `target`, the shorter one follows the aspect
/// ratio and never drops below one pixel. Square pictures become
/// `target` x `target`.
pub fn target_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (target, target);
    }

    let scale = |short: u32, long: u32| -> u32 {
        let scaled = (short as f64 * target as f64 / long as f64).round() as u32;
        scaled.max(1)
    };

    if width >= height {
        (target, scale(height, width))
    } else {
        (scale(width, height), target)
    }
}

/// Resizes one picture so its longer side equals `target` and writes it as JPEG
///
/// The input format is sniffed from the content, not the file name.
/// Returns the dimensions of the written picture.
pub fn resize_image(
    input: &Path,
    output: &Path,
    target: u32,
) -> Result<(u32, u32), TranscodeError> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let img = ImageReader::open(input)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| match e {
            ImageError::IoError(io) => TranscodeError::IoError(io),
            other => TranscodeError::Decode(format!("{}: {}", input.display(), other)),
        })?;

    let (width, height) = target_dimensions(img.width(), img.height(), target);
    let resized = img.resize_exact(width, height, FilterType::CatmullRom);

    // JPEG has no alpha channel
    DynamicImage::ImageRgb8(resized.to_rgb8())
        .save_with_format(output, ImageFormat::Jpeg)
        .map_err(|e| match e {
            ImageError::IoError(io) => TranscodeError::IoError(io),
            other => TranscodeError::Encode(format!("{}: {}", output.display(), other)),
        })?;

    log::debug!(
        "Resized {} -> {} ({}x{})",
        input.display(),
        output.display(),
        width,
        height
    );
    Ok((width, height))
}

/// Resizes every regular file of `input_dir` into `output_dir`
///
/// Files are processed in parallel on blocking worker threads. Output files
/// keep the input stem with a `.jpg` extension, so the sorted listing of
/// `output_dir` matches the sorted listing of `input_dir`. The first failure
/// aborts the batch; remaining workers are cancelled.
pub async fn resize_directory(
    input_dir: &Path,
    output_dir: &Path,
    target: u32,
) -> Result<Vec<PathBuf>, TranscodeError> {
    std::fs::create_dir_all(output_dir)?;
    let inputs = list_regular_files(input_dir)?;

    let mut join_set = JoinSet::new();
    for (index, input) in inputs.into_iter().enumerate() {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{:04}", index));
        let output = output_dir.join(format!("{}.jpg", stem));

        join_set.spawn_blocking(move || {
            resize_image(&input, &output, target).map(|_| (index, output))
        });
    }

    let mut outputs = Vec::with_capacity(join_set.len());
    while let Some(joined) = join_set.join_next().await {
        let result = joined.map_err(|e| {
            TranscodeError::IoError(std::io::Error::other(format!("Resize task failed: {}", e)))
        })?;
        outputs.push(result?);
    }

    outputs.sort_by_key(|(index, _)| *index);
    Ok(outputs.into_iter().map(|(_, path)| path).collect())
}
