use std::path::Path;

use crate::error::{MediaError, MediaResult};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp", "tiff", "tif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "mkv", "avi", "m4v", "ogv"];

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MediaFileKind {
    Image,
    Video,
}

/// Decides how to load `path` from its extension, case-insensitively.
pub fn classify(path: &Path) -> MediaResult<MediaFileKind> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| MediaError::UnsupportedFileType(path.to_path_buf()))?;

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(MediaFileKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(MediaFileKind::Video)
    } else {
        Err(MediaError::UnsupportedFileType(path.to_path_buf()))
    }
}
