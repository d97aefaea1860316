//! Saving rendered media to local files.

use std::{
    io,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::domain::{GenerationItem, ItemId, MediaKind, MediaPayload};
use thiserror::Error;
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::info;

pub const FILE_NAME_BUDGET: usize = 10;
const MAX_NAME_ATTEMPTS: u32 = 1000;
const UNSAFE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("item {0} has no rendered media")]
    NoMedia(ItemId),
    #[error("item {0} carries a malformed media reference")]
    MalformedMedia(ItemId),
    #[error("media payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// File name derived from the first contributing headline, or `None` when the
/// item has no headline.
pub fn suggested_file_name(item: &GenerationItem) -> Option<String> {
    let stem = file_stem(item)?;
    Some(format!("{stem}.{}", extension(item)))
}

fn file_stem(item: &GenerationItem) -> Option<String> {
    let first = item.sources.first()?;
    let safe: String = first
        .title
        .chars()
        .filter(|c| !UNSAFE_CHARS.contains(c))
        .take(FILE_NAME_BUDGET)
        .collect();
    Some(match safe.trim() {
        "" => item.id.as_str().to_string(),
        trimmed => trimmed.to_string(),
    })
}

fn extension(item: &GenerationItem) -> &'static str {
    match item.media_kind {
        Some(MediaKind::Video) => "mp4",
        _ => "png",
    }
}

/// Decodes the item's media and writes it into `dir`, returning the written path.
/// Existing files are never replaced: a taken name gets a ` (n)` suffix.
pub async fn export_media(item: &GenerationItem, dir: &Path) -> Result<PathBuf, ExportError> {
    let url = item
        .media_url
        .as_deref()
        .ok_or_else(|| ExportError::NoMedia(item.id.clone()))?;
    let payload = MediaPayload::parse_data_url(url)
        .ok_or_else(|| ExportError::MalformedMedia(item.id.clone()))?;
    let bytes = STANDARD.decode(payload.data_b64.as_bytes())?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ExportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let stem = file_stem(item).unwrap_or_else(|| item.id.as_str().to_string());
    let (path, mut file) = create_free_file(dir, &stem, extension(item)).await?;
    file.write_all(&bytes)
        .await
        .map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
    file.flush().await.map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;

    info!(item = %item.id, path = %path.display(), bytes = bytes.len(), "exported media");
    Ok(path)
}

async fn create_free_file(
    dir: &Path,
    stem: &str,
    extension: &str,
) -> Result<(PathBuf, File), ExportError> {
    let mut last_taken = dir.join(format!("{stem}.{extension}"));
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let path = match attempt {
            0 => dir.join(format!("{stem}.{extension}")),
            n => dir.join(format!("{stem} ({n}).{extension}")),
        };
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return Ok((path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => last_taken = path,
            Err(source) => return Err(ExportError::Io { path, source }),
        }
    }
    Err(ExportError::Io {
        path: last_taken,
        source: io::Error::new(io::ErrorKind::AlreadyExists, "no free file name left"),
    })
}
