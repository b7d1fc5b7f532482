//! Output format selection.
//!
//! The encoder is picked per call from the decoded image, not from a request
//! parameter: a PNG whose every pixel is fully opaque gains nothing from PNG's
//! alpha support, so it is written as JPEG instead.
//!
//! | Source | Opaque | Output |
//! |---|---|---|
//! | PNG | yes | JPEG |
//! | PNG | no | PNG |
//! | JPEG | any | JPEG |

use image::{DynamicImage, ImageFormat};

/// Format the image was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Png,
    Jpeg,
}

impl SourceFormat {
    /// Map a detected container format. Only PNG and JPEG are supported.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Png => Some(SourceFormat::Png),
            ImageFormat::Jpeg => Some(SourceFormat::Jpeg),
            _ => None,
        }
    }
}

/// Format the image will be encoded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
}

/// Choose the output encoder for an image.
pub fn select_output_format(source: SourceFormat, opaque: bool) -> OutputFormat {
    match source {
        SourceFormat::Png if !opaque => OutputFormat::Png,
        _ => OutputFormat::Jpeg,
    }
}

/// True iff every pixel's alpha is at its maximum.
///
/// Images without an alpha channel are opaque by definition.
pub fn is_opaque(img: &DynamicImage) -> bool {
    if !img.color().has_alpha() {
        return true;
    }
    match img {
        DynamicImage::ImageLumaA8(buf) => buf.pixels().all(|p| p[1] == u8::MAX),
        DynamicImage::ImageRgba8(buf) => buf.pixels().all(|p| p[3] == u8::MAX),
        DynamicImage::ImageLumaA16(buf) => buf.pixels().all(|p| p[1] == u16::MAX),
        DynamicImage::ImageRgba16(buf) => buf.pixels().all(|p| p[3] == u16::MAX),
        DynamicImage::ImageRgba32F(buf) => buf.pixels().all(|p| p[3] >= 1.0),
        other => other.to_rgba16().pixels().all(|p| p[3] == u16::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgba, RgbaImage};

    #[test]
    fn opaque_png_becomes_jpeg() {
        assert_eq!(
            select_output_format(SourceFormat::Png, true),
            OutputFormat::Jpeg
        );
    }

    #[test]
    fn translucent_png_stays_png() {
        assert_eq!(
            select_output_format(SourceFormat::Png, false),
            OutputFormat::Png
        );
    }

    #[test]
    fn jpeg_stays_jpeg() {
        assert_eq!(
            select_output_format(SourceFormat::Jpeg, true),
            OutputFormat::Jpeg
        );
        assert_eq!(
            select_output_format(SourceFormat::Jpeg, false),
            OutputFormat::Jpeg
        );
    }

    #[test]
    fn no_alpha_channel_is_opaque() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(4, 4));
        assert!(is_opaque(&img));
    }

    #[test]
    fn full_alpha_is_opaque() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])));
        assert!(is_opaque(&img));
    }

    #[test]
    fn single_translucent_pixel_is_not_opaque() {
        let mut buf = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        buf.put_pixel(3, 3, Rgba([1, 2, 3, 254]));
        assert!(!is_opaque(&DynamicImage::ImageRgba8(buf)));
    }

    #[test]
    fn only_png_and_jpeg_are_sources() {
        assert_eq!(
            SourceFormat::from_image_format(ImageFormat::Png),
            Some(SourceFormat::Png)
        );
        assert_eq!(
            SourceFormat::from_image_format(ImageFormat::Jpeg),
            Some(SourceFormat::Jpeg)
        );
        assert_eq!(SourceFormat::from_image_format(ImageFormat::Gif), None);
    }
}
