//! Decoding decrypted bytes into displayable assets.

use image::DynamicImage;

use crate::error::FetchError;

/// Turns plaintext bytes into the asset type the cache stores.
///
/// Decoding is CPU-bound and synchronous; the prefetcher runs it on the
/// blocking pool.
pub trait AssetDecoder: Send + Sync + 'static {
    /// Decoded asset type.
    type Asset: Send + Sync + 'static;

    /// Decode one asset.
    ///
    /// # Errors
    ///
    /// `FetchError::Decode` if the bytes are not a valid asset.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Asset, FetchError>;
}

/// Image decoder backed by the `image` crate.
///
/// Accepts PNG, JPEG, GIF and WebP. Optionally downsizes large images so the
/// cache does not hold full-resolution avatars.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder {
    max_dimension: Option<u32>,
}

impl ImageDecoder {
    /// Decoder that keeps images at their original size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that scales images down (preserving aspect ratio) so neither
    /// side exceeds `max_dimension`. Smaller images are left untouched.
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self { max_dimension: Some(max_dimension.max(1)) }
    }

    /// Configured size limit.
    pub fn max_dimension(&self) -> Option<u32> {
        self.max_dimension
    }
}

impl AssetDecoder for ImageDecoder {
    type Asset = DynamicImage;

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, FetchError> {
        let image = image::load_from_memory(bytes).map_err(|e| FetchError::Decode(e.to_string()))?;

        match self.max_dimension {
            Some(limit) if image.width() > limit || image.height() > limit => {
                Ok(image.thumbnail(limit, limit))
            },
            _ => Ok(image),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgba, RgbaImage};

    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_png() {
        let image = ImageDecoder::new().decode(&png(3, 2)).unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let result = ImageDecoder::new().decode(b"definitely not an image");
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[test]
    fn large_images_are_downsized() {
        let image = ImageDecoder::with_max_dimension(16).decode(&png(64, 32)).unwrap();
        assert_eq!((image.width(), image.height()), (16, 8));
    }

    #[test]
    fn small_images_are_kept() {
        let image = ImageDecoder::with_max_dimension(16).decode(&png(8, 8)).unwrap();
        assert_eq!((image.width(), image.height()), (8, 8));
    }
}
