use std::path::Path;

use log::info;
use quadmap_core::ImageFrame;

use crate::error::{MediaError, MediaResult};

/// Decodes an encoded image into a straight-alpha RGBA8 frame.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<ImageFrame, String> {
    let img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    let rgba = img.into_rgba8();
    let (width, height) = rgba.dimensions();
    ImageFrame::new(width, height, rgba.into_raw())
        .ok_or_else(|| format!("image has no pixels ({width}x{height})"))
}

/// Reads and decodes the image at `path`.
pub fn load_image(path: &Path) -> MediaResult<ImageFrame> {
    let bytes = std::fs::read(path).map_err(|e| MediaError::io(path, e))?;
    let frame = decode_image_bytes(&bytes).map_err(|msg| MediaError::decode(path, msg))?;
    info!(
        "media: decoded image '{}' ({}x{})",
        path.display(),
        frame.width(),
        frame.height()
    );
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png(width: u32, height: u32, px: [u8; 4]) -> Vec<u8> {
        let raw: Vec<u8> = px.iter().copied().cycle().take((width * height * 4) as usize).collect();
        let img = image::RgbaImage::from_raw(width, height, raw).unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decodes_png_dimensions_and_pixels() {
        let frame = decode_image_bytes(&png(3, 2, [10, 20, 30, 128])).unwrap();
        assert_eq!((frame.width(), frame.height()), (3, 2));
        assert_eq!(&frame.pixels()[..4], &[10, 20, 30, 128]);
        assert_eq!(frame.pixels().len(), 3 * 2 * 4);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(decode_image_bytes(b"definitely not an image").is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_image(Path::new("/nonexistent/quadmap/poster.png")).unwrap_err();
        assert!(matches!(err, MediaError::Io { .. }));
    }
}
