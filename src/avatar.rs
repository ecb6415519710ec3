//! Avatar upload handling: file name filter, size-limited multipart read and the
//! resize-to-PNG step.

use std::io::Cursor;

use actix_multipart::Multipart;
use futures::StreamExt;
use image::io::{Limits, Reader as ImageReader};
use image::{imageops::FilterType, ImageFormat};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

/// Uploads larger than this are rejected while streaming.
pub const MAX_AVATAR_BYTES: usize = 1_000_000;

/// Stored avatars are always this many pixels wide and high.
pub const AVATAR_SIZE: u32 = 250;

/// Uploads wider or taller than this are refused before their pixels are allocated.
pub const MAX_AVATAR_DIMENSION: u32 = 4096;

/// Multipart field carrying the file.
pub const AVATAR_FIELD: &str = "avatar";

lazy_static! {
    static ref SUPPORTED_FILENAME: Regex = Regex::new(r"(?i)\.(jpg|jpeg|png)$").unwrap();
}

pub fn is_supported_filename(filename: &str) -> bool {
    SUPPORTED_FILENAME.is_match(filename)
}

/// Decodes the upload, crops it to a square covering `AVATAR_SIZE` and re-encodes as PNG.
/// Images larger than `MAX_AVATAR_DIMENSION` on either side are rejected.
pub fn process_avatar(bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AppError::BadRequest(format!("Unable to process image: {}", e)))?;
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_AVATAR_DIMENSION);
    limits.max_image_height = Some(MAX_AVATAR_DIMENSION);
    reader.limits(limits);

    let img = reader.decode()?;
    let resized = img.resize_to_fill(AVATAR_SIZE, AVATAR_SIZE, FilterType::Lanczos3);

    let mut png = Vec::new();
    resized.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// Pulls the `avatar` field out of a multipart body.
///
/// Other fields are drained and ignored. The file name is checked before any bytes are
/// buffered and the read stops as soon as the size limit is crossed.
pub async fn read_avatar_field(mut payload: Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(item) = payload.next().await {
        let mut field = item?;
        if field.name() != AVATAR_FIELD {
            while let Some(chunk) = field.next().await {
                chunk?;
            }
            continue;
        }

        let filename = field
            .content_disposition()
            .get_filename()
            .map(str::to_string)
            .unwrap_or_default();
        if !is_supported_filename(&filename) {
            return Err(AppError::BadRequest(
                "Only image files (jpg, jpeg, png) are supported".into(),
            ));
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > MAX_AVATAR_BYTES {
                return Err(AppError::BadRequest("File too large".into()));
            }
            data.extend_from_slice(&chunk);
        }
        return Ok(data);
    }

    Err(AppError::BadRequest("No avatar file provided".into()))
}
