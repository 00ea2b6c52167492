//! Content-addressed storage for bucket-list photos.
//!
//! Photos arrive base64-encoded in JSON bodies and are written once under
//! `<root>/bucket_list/<sha256>.<ext>`. Identical uploads share a file.

use std::path::PathBuf;

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use bytes::Bytes;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use stair_core::bucket::PhotoRef;

use crate::error::ApiError;

const PHOTO_DIR: &str = "bucket_list";

/// A photo upload as it appears in a request body.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoUpload {
  /// e.g. `image/jpeg`.
  pub media_type: String,
  /// Base64 (standard alphabet, padded).
  pub data:       String,
}

/// A photo written by [`PhotoStore::save`].
#[derive(Debug, Clone, PartialEq)]
pub struct SavedPhoto {
  pub photo:          PhotoRef,
  /// This call wrote the file; no earlier upload shares it.
  pub(crate) created: bool,
}

#[derive(Debug, Clone)]
pub struct PhotoStore {
  root:      PathBuf,
  base_url:  String,
  max_bytes: usize,
}

fn extension(media_type: &str) -> Option<&'static str> {
  match media_type {
    "image/jpeg" | "image/jpg" => Some("jpg"),
    "image/png" => Some("png"),
    "image/gif" => Some("gif"),
    "image/webp" => Some("webp"),
    "image/heic" => Some("heic"),
    _ => None,
  }
}

impl PhotoStore {
  pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>, max_bytes: usize) -> Self {
    Self { root: root.into(), base_url: base_url.into(), max_bytes }
  }

  /// Public URL of a stored photo.
  pub fn url(&self, photo: &PhotoRef) -> String {
    format!("{}/{}", self.base_url.trim_end_matches('/'), photo.path)
  }

  /// Validate and decode an upload without touching the disk.
  pub fn decode(&self, upload: &PhotoUpload) -> Result<(Bytes, &'static str), ApiError> {
    let media_type = upload.media_type.trim().to_ascii_lowercase();
    let ext = extension(&media_type).ok_or_else(|| {
      ApiError::BadRequest(format!("unsupported photo type: {}", upload.media_type))
    })?;
    // Base64 inflates by 4/3; reject obviously oversized payloads before decoding.
    if upload.data.len() / 4 * 3 > self.max_bytes + 3 {
      return Err(ApiError::PayloadTooLarge(self.max_bytes));
    }
    let bytes = B64
      .decode(upload.data.trim())
      .map_err(|e| ApiError::BadRequest(format!("photo is not valid base64: {e}")))?;
    if bytes.len() > self.max_bytes {
      return Err(ApiError::PayloadTooLarge(self.max_bytes));
    }
    if bytes.is_empty() {
      return Err(ApiError::BadRequest("photo is empty".to_owned()));
    }
    Ok((Bytes::from(bytes), ext))
  }

  /// Store an upload and return its reference.
  pub async fn save(&self, upload: &PhotoUpload) -> Result<SavedPhoto, ApiError> {
    let (bytes, ext) = self.decode(upload)?;
    let hash = hex::encode(Sha256::digest(&bytes));
    let relative = format!("{PHOTO_DIR}/{hash}.{ext}");

    let dir = self.root.join(PHOTO_DIR);
    tokio::fs::create_dir_all(&dir).await?;
    let path = self.root.join(&relative);
    let created = !tokio::fs::try_exists(&path).await?;
    if !created {
      tracing::debug!(%hash, "photo already stored");
    } else {
      // Write to a temporary name first so readers never see a partial file.
      let tmp = dir.join(format!(".{hash}.tmp"));
      tokio::fs::write(&tmp, &bytes).await?;
      tokio::fs::rename(&tmp, &path).await?;
      tracing::info!(%hash, size = bytes.len(), "stored photo");
    }

    let photo = PhotoRef {
      path:         relative,
      content_hash: hash,
      media_type:   upload.media_type.trim().to_ascii_lowercase(),
    };
    Ok(SavedPhoto { photo, created })
  }

  /// Remove a photo whose item update did not go through. Files that
  /// predate the upload are left alone.
  pub async fn discard(&self, saved: &SavedPhoto) {
    if !saved.created {
      return;
    }
    let path = self.root.join(&saved.photo.path);
    match tokio::fs::remove_file(&path).await {
      Ok(()) => tracing::debug!(hash = %saved.photo.content_hash, "discarded photo"),
      Err(e) => tracing::warn!(?path, error = %e, "failed to discard photo"),
    }
  }
}
