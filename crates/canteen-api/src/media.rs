// crates/canteen-api/src/media.rs
// ============================================================================
// Module: Image Store
// Description: Local filesystem storage for category and menu images.
// Purpose: Persist uploads and serve them back by opaque file name.
// Dependencies: canteen-core
// ============================================================================

//! ## Overview
//! Images are written as `<dir>/<id>.<ext>` where the id is generated and the
//! extension follows the declared content type. Only JPEG, PNG, WebP, and GIF
//! are accepted. File names read back from requests are validated so they can
//! never escape the media directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use canteen_config::MediaConfig;
use canteen_core::ImageBlob;
use canteen_core::ImageError;
use canteen_core::ImageStore;
use canteen_core::StoredImage;
use canteen_core::generate_record_id;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Accepted content types and their file extensions.
const IMAGE_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];
/// Longest accepted file name.
const MAX_FILE_NAME_LENGTH: usize = 128;

// ============================================================================
// SECTION: Store
// ============================================================================

/// Filesystem-backed image store.
pub struct FileImageStore {
    /// Directory holding images.
    dir: PathBuf,
    /// Public URL prefix for served images.
    url_prefix: String,
    /// Maximum image size in bytes.
    max_bytes: usize,
}

impl FileImageStore {
    /// Opens (creating when needed) the media directory.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Io`] when the directory cannot be created.
    pub fn new(config: &MediaConfig, public_base_url: &str) -> Result<Self, ImageError> {
        fs::create_dir_all(&config.dir).map_err(|err| ImageError::Io(err.to_string()))?;
        Ok(Self {
            dir: config.dir.clone(),
            url_prefix: format!("{}/media", public_base_url.trim_end_matches('/')),
            max_bytes: config.max_image_bytes,
        })
    }

    /// Resolves a validated file name inside the media directory.
    fn path_for(&self, id: &str) -> Result<PathBuf, ImageError> {
        validate_file_name(id)?;
        Ok(self.dir.join(id))
    }
}

impl ImageStore for FileImageStore {
    fn put(&self, bytes: &[u8], content_type: &str) -> Result<StoredImage, ImageError> {
        let extension = extension_for(content_type)
            .ok_or_else(|| ImageError::UnsupportedType(content_type.to_string()))?;
        if bytes.is_empty() {
            return Err(ImageError::UnsupportedType("empty upload".to_string()));
        }
        if bytes.len() > self.max_bytes {
            return Err(ImageError::TooLarge {
                max_bytes: self.max_bytes,
                actual_bytes: bytes.len(),
            });
        }
        let id = format!("{}.{extension}", generate_record_id());
        fs::write(self.dir.join(&id), bytes).map_err(|err| ImageError::Io(err.to_string()))?;
        Ok(StoredImage {
            url: format!("{}/{id}", self.url_prefix),
            id,
        })
    }

    fn get(&self, id: &str) -> Result<ImageBlob, ImageError> {
        let path = self.path_for(id)?;
        let content_type = content_type_for(id).ok_or_else(|| ImageError::NotFound(id.to_string()))?;
        let bytes = fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => ImageError::NotFound(id.to_string()),
            _ => ImageError::Io(err.to_string()),
        })?;
        Ok(ImageBlob {
            bytes,
            content_type,
        })
    }

    fn delete(&self, id: &str) -> Result<(), ImageError> {
        let path = self.path_for(id)?;
        fs::remove_file(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => ImageError::NotFound(id.to_string()),
            _ => ImageError::Io(err.to_string()),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a content type (parameters ignored) to a file extension.
fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    IMAGE_TYPES.iter().find(|(mime, _)| *mime == essence).map(|(_, extension)| *extension)
}

/// Maps a stored file name back to its content type.
fn content_type_for(file_name: &str) -> Option<&'static str> {
    let (_, extension) = file_name.rsplit_once('.')?;
    IMAGE_TYPES.iter().find(|(_, known)| *known == extension).map(|(mime, _)| *mime)
}

/// Rejects names that are empty, too long, hidden, or contain separators.
fn validate_file_name(name: &str) -> Result<(), ImageError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_FILE_NAME_LENGTH
        && !name.starts_with('.')
        && !name.contains("..")
        && name.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_'));
    if valid { Ok(()) } else { Err(ImageError::InvalidName(name.to_string())) }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    fn store(dir: &std::path::Path, max_image_bytes: usize) -> FileImageStore {
        let config = MediaConfig {
            dir: dir.join("media"),
            max_image_bytes,
        };
        FileImageStore::new(&config, "http://127.0.0.1:8080/").unwrap()
    }

    #[test]
    fn put_get_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(dir.path(), 1024);
        let stored = images.put(b"\x89PNG fake", "image/png").unwrap();
        assert!(stored.id.ends_with(".png"));
        assert_eq!(stored.url, format!("http://127.0.0.1:8080/media/{}", stored.id));
        let blob = images.get(&stored.id).unwrap();
        assert_eq!(blob.content_type, "image/png");
        assert_eq!(blob.bytes, b"\x89PNG fake");
        images.delete(&stored.id).unwrap();
        assert!(matches!(images.get(&stored.id), Err(ImageError::NotFound(_))));
    }

    #[test]
    fn rejects_unsupported_and_oversized_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(dir.path(), 4);
        assert!(matches!(images.put(b"abc", "text/plain"), Err(ImageError::UnsupportedType(_))));
        assert!(matches!(
            images.put(b"too large", "image/jpeg; charset=binary"),
            Err(ImageError::TooLarge {
                max_bytes: 4,
                actual_bytes: 9
            })
        ));
    }

    #[test]
    fn traversal_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(dir.path(), 1024);
        for name in ["../secret.png", "a/b.png", ".hidden.png", "", "x\\y.png"] {
            assert!(matches!(images.get(name), Err(ImageError::InvalidName(_))), "{name}");
        }
    }
}
