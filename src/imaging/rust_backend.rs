//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG) | `image::ImageReader` with content sniffing |
//! | Resize | `DynamicImage::resize_exact` with the bilinear (`Triangle`) filter |
//! | Crop | cover resize + `DynamicImage::crop_imm` |
//! | Grayscale | per-row luminance over `rayon::par_chunks_mut` |
//! | Watermark | bilinear overlay resize + uniform-mask "over" blend |
//! | Encode | `PngEncoder` / `JpegEncoder`, picked by [`select_output_format`] |
//!
//! Decode, the transform itself and encode are timed separately through
//! [`timed`], with an empty scope.

use super::backend::{ImageProcessor, ProcessorError};
use super::calculations::{
    centered_offset, contain_dimensions, cover_dimensions, crop_box, crop_origin,
    watermark_dimensions, within_pixel_budget,
};
use super::format::{OutputFormat, SourceFormat, is_opaque, select_output_format};
use super::params::{CropPoint, EncodeSettings};
use crate::metrics::{
    CROP_DURATION, DECODE_DURATION, ENCODE_DURATION, GRAYSCALE_DURATION, MetricsSink, NoopSink,
    RESIZE_DURATION, WATERMARK_DURATION, timed,
};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{FilterType as PngFilter, PngEncoder};
use image::error::ImageFormatHint;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageError, ImageReader, Rgba, RgbaImage};
use rayon::prelude::*;
use std::borrow::Cow;
use std::io::Cursor;
use std::sync::Arc;

/// Scope attached to backend-level metrics.
const BACKEND_SCOPE: &str = "";

/// Filter used for every resize: bilinear.
const RESIZE_FILTER: FilterType = FilterType::Triangle;

fn ensure_within_budget(dims: (u32, u32)) -> Result<(), ProcessorError> {
    if within_pixel_budget(dims) {
        Ok(())
    } else {
        tracing::warn!(?dims, "requested dimensions exceed the pixel budget");
        Err(ProcessorError::dimensions_too_large())
    }
}

/// A decoded image and the container it came from.
#[derive(Debug)]
struct Decoded {
    image: DynamicImage,
    format: SourceFormat,
}

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustProcessor {
    settings: EncodeSettings,
    metrics: Arc<dyn MetricsSink>,
}

impl RustProcessor {
    pub fn new() -> Self {
        Self::with_settings(EncodeSettings::default(), Arc::new(NoopSink))
    }

    pub fn with_settings(settings: EncodeSettings, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { settings, metrics }
    }

    pub fn settings(&self) -> EncodeSettings {
        self.settings
    }

    fn decode(&self, data: &[u8]) -> Result<Decoded, ProcessorError> {
        timed(self.metrics.as_ref(), DECODE_DURATION, BACKEND_SCOPE, || {
            decode_image(data)
        })
    }

    fn encode(&self, img: &DynamicImage, source: SourceFormat) -> Result<Vec<u8>, ProcessorError> {
        timed(self.metrics.as_ref(), ENCODE_DURATION, BACKEND_SCOPE, || {
            encode_image(img, source, &self.settings)
        })
    }
}

impl Default for RustProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Sniff the container and decode. Anything but PNG or JPEG is rejected.
fn decode_image(data: &[u8]) -> Result<Decoded, ProcessorError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ProcessorError::Decode(ImageError::IoError(e)))?;

    let detected = reader.format();
    let format = detected
        .and_then(SourceFormat::from_image_format)
        .ok_or_else(|| {
            ProcessorError::unsupported_format(
                detected.map_or(ImageFormatHint::Unknown, ImageFormatHint::Exact),
            )
        })?;

    let image = reader.decode().map_err(ProcessorError::Decode)?;
    Ok(Decoded { image, format })
}

/// Encode with the format chosen from the source and the image's opacity.
fn encode_image(
    img: &DynamicImage,
    source: SourceFormat,
    settings: &EncodeSettings,
) -> Result<Vec<u8>, ProcessorError> {
    let output = select_output_format(source, is_opaque(img));
    tracing::trace!(?source, ?output, "encoding");

    let mut buf = Vec::new();
    match output {
        OutputFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut buf,
                settings.png_compression.into(),
                PngFilter::Adaptive,
            );
            img.write_with_encoder(encoder)
        }
        OutputFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, settings.jpeg_quality.value());
            jpeg_compatible(img).write_with_encoder(encoder)
        }
    }
    .map_err(ProcessorError::Encode)?;

    Ok(buf)
}

/// JPEG has no alpha and only 8-bit samples; drop down to what it can hold.
fn jpeg_compatible(img: &DynamicImage) -> Cow<'_, DynamicImage> {
    match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => Cow::Borrowed(img),
        DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_) => Cow::Owned(DynamicImage::ImageLuma8(img.to_luma8())),
        _ => Cow::Owned(DynamicImage::ImageRgb8(img.to_rgb8())),
    }
}

/// Luminance weights 0.3 / 0.6 / 0.1, rounded. A gray input maps to itself.
#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((3 * r as u32 + 6 * g as u32 + b as u32 + 5) / 10) as u8
}

/// Convert every pixel to gray in place, one rayon task per row chunk.
pub(crate) fn grayscale_rgba(mut buf: RgbaImage) -> RgbaImage {
    let row_len = buf.width() as usize * 4;
    if row_len == 0 {
        return buf;
    }
    let samples: &mut [u8] = &mut buf;
    samples.par_chunks_mut(row_len).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            let gray = luma(px[0], px[1], px[2]);
            px[0] = gray;
            px[1] = gray;
            px[2] = gray;
        }
    });
    buf
}

/// "Over" blend of `src` onto `dst`, with `src` alpha scaled by `opacity`.
fn blend_pixel(dst: Rgba<u8>, src: Rgba<u8>, opacity: u8) -> Rgba<u8> {
    let src_a = (src[3] as f32 / 255.0) * (opacity as f32 / 255.0);
    if src_a <= 0.0 {
        return dst;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (src[c] as f32 * src_a + dst[c] as f32 * dst_a * (1.0 - src_a)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}

/// Composite `mark` onto `canvas` with its top-left at `(x, y)`.
///
/// Pixels falling outside the canvas are clipped.
pub(crate) fn overlay_with_opacity(
    canvas: &mut RgbaImage,
    mark: &RgbaImage,
    x: i64,
    y: i64,
    opacity: u8,
) {
    if opacity == 0 {
        return;
    }
    let (cw, ch) = canvas.dimensions();
    for (mx, my, px) in mark.enumerate_pixels() {
        let cx = x + mx as i64;
        let cy = y + my as i64;
        if cx < 0 || cy < 0 || cx >= cw as i64 || cy >= ch as i64 {
            continue;
        }
        let dst = canvas.get_pixel_mut(cx as u32, cy as u32);
        *dst = blend_pixel(*dst, *px, opacity);
    }
}

impl ImageProcessor for RustProcessor {
    fn crop(
        &self,
        input: &[u8],
        width: u32,
        height: u32,
        point: CropPoint,
    ) -> Result<Vec<u8>, ProcessorError> {
        let Decoded { image, format } = self.decode(input)?;
        let original = image.dimensions();
        let target = crop_box((width, height), original);

        let cropped = timed(self.metrics.as_ref(), CROP_DURATION, BACKEND_SCOPE, || {
            let cover = cover_dimensions(target, original);
            ensure_within_budget(cover)?;
            tracing::debug!(?original, ?cover, ?target, ?point, "crop");
            let resized = if cover == original {
                image
            } else {
                image.resize_exact(cover.0, cover.1, RESIZE_FILTER)
            };
            let (x0, y0) = crop_origin(cover, target, point);
            Ok::<_, ProcessorError>(resized.crop_imm(x0, y0, target.0, target.1))
        })?;

        self.encode(&cropped, format)
    }

    fn resize(&self, input: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ProcessorError> {
        let Decoded { image, format } = self.decode(input)?;
        let original = image.dimensions();
        let (w, h) = contain_dimensions((width, height), original);

        let image = if (w, h) == original {
            tracing::debug!(?original, "resize skipped, dimensions unchanged");
            image
        } else {
            ensure_within_budget((w, h))?;
            timed(self.metrics.as_ref(), RESIZE_DURATION, BACKEND_SCOPE, || {
                tracing::debug!(?original, target = ?(w, h), "resize");
                Ok::<_, ProcessorError>(image.resize_exact(w, h, RESIZE_FILTER))
            })?
        };

        self.encode(&image, format)
    }

    fn watermark(
        &self,
        base: &[u8],
        overlay: &[u8],
        opacity: u8,
    ) -> Result<Vec<u8>, ProcessorError> {
        let Decoded {
            image: base_img,
            format,
        } = self.decode(base)?;
        let Decoded {
            image: overlay_img, ..
        } = self.decode(overlay)?;

        let composed = timed(self.metrics.as_ref(), WATERMARK_DURATION, BACKEND_SCOPE, || {
            let mut canvas = base_img.to_rgba8();
            let (w, h) = watermark_dimensions(canvas.dimensions(), overlay_img.dimensions());
            tracing::debug!(base = ?canvas.dimensions(), overlay = ?(w, h), opacity, "watermark");
            if w > 0 && h > 0 {
                ensure_within_budget((w, h))?;
                let mark =
                    image::imageops::resize(&overlay_img.to_rgba8(), w, h, RESIZE_FILTER);
                let (x, y) = centered_offset(canvas.dimensions(), (w, h));
                overlay_with_opacity(&mut canvas, &mark, x, y, opacity);
            }
            Ok::<_, ProcessorError>(DynamicImage::ImageRgba8(canvas))
        })?;

        self.encode(&composed, format)
    }

    fn grayscale(&self, input: &[u8]) -> Result<Vec<u8>, ProcessorError> {
        let Decoded { image, format } = self.decode(input)?;

        let gray = timed(self.metrics.as_ref(), GRAYSCALE_DURATION, BACKEND_SCOPE, || {
            tracing::debug!(dimensions = ?image.dimensions(), "grayscale");
            Ok::<_, ProcessorError>(DynamicImage::ImageRgba8(grayscale_rgba(image.to_rgba8())))
        })?;

        self.encode(&gray, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MemorySink;
    use image::{ImageFormat, Rgb, RgbImage};

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn jpeg_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .unwrap();
        buf
    }

    /// Opaque gradient, 8-bit RGB.
    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    /// RGBA with one fully transparent pixel in the top-left corner.
    fn translucent(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        let [r, g, b] = color;
        let mut buf = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]));
        buf.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        DynamicImage::ImageRgba8(buf)
    }

    fn sniff(bytes: &[u8]) -> ImageFormat {
        image::guess_format(bytes).unwrap()
    }

    #[test]
    fn luma_weights() {
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(100, 100, 100), 100);
        // 0.3 * 200 = 60
        assert_eq!(luma(200, 0, 0), 60);
    }

    #[test]
    fn grayscale_rgba_keeps_alpha() {
        let buf = RgbaImage::from_pixel(3, 2, Rgba([200, 0, 0, 17]));
        let gray = grayscale_rgba(buf);
        assert!(gray.pixels().all(|p| p.0 == [60, 60, 60, 17]));
    }

    #[test]
    fn blend_extremes() {
        let dst = Rgba([10, 20, 30, 255]);
        let src = Rgba([200, 100, 50, 255]);
        assert_eq!(blend_pixel(dst, src, 0), dst);
        assert_eq!(blend_pixel(dst, src, 255), src);
    }

    #[test]
    fn blend_half_opacity_mixes() {
        let out = blend_pixel(Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 255]), 128);
        assert!(out[0] > 120 && out[0] < 135, "{out:?}");
        assert_eq!(out[3], 255);
    }

    #[test]
    fn overlay_clips_outside_canvas() {
        let mut canvas = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let mark = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        overlay_with_opacity(&mut canvas, &mark, 2, -2, 255);

        assert_eq!(canvas.get_pixel(3, 0).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(3, 1).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(3, 2).0, [0, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(1, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ProcessorError::Decode(_)));
    }

    #[test]
    fn crop_produces_exact_box() {
        let processor = RustProcessor::new();
        let input = png_bytes(&gradient(120, 80));

        let out = processor.crop(&input, 50, 50, CropPoint::Center).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (50, 50));
    }

    #[test]
    fn crop_with_missing_side_keeps_aspect() {
        let processor = RustProcessor::new();
        let input = png_bytes(&gradient(120, 80));

        let out = processor.crop(&input, 60, 0, CropPoint::Top).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (60, 40));
    }

    #[test]
    fn resize_skips_when_nothing_requested() {
        let sink = Arc::new(MemorySink::new());
        let processor = RustProcessor::with_settings(EncodeSettings::default(), sink.clone());
        let input = png_bytes(&gradient(30, 20));

        let out = processor.resize(&input, 0, 0).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (30, 20));
        assert_eq!(sink.names(), vec![DECODE_DURATION, ENCODE_DURATION]);
    }

    #[test]
    fn resize_records_each_stage() {
        let sink = Arc::new(MemorySink::new());
        let processor = RustProcessor::with_settings(EncodeSettings::default(), sink.clone());
        let input = png_bytes(&gradient(30, 20));

        processor.resize(&input, 15, 0).unwrap();
        assert_eq!(
            sink.names(),
            vec![DECODE_DURATION, RESIZE_DURATION, ENCODE_DURATION]
        );
        assert!(sink.updates().iter().all(|u| u.scope.is_empty()));
    }

    #[test]
    fn resize_rejects_runaway_derived_height() {
        let sink = Arc::new(MemorySink::new());
        let processor = RustProcessor::with_settings(EncodeSettings::default(), sink.clone());
        let input = png_bytes(&gradient(1, 2000));

        let err = processor.resize(&input, 9999, 0).unwrap_err();
        assert!(matches!(err, ProcessorError::Decode(ImageError::Limits(_))));
        assert_eq!(sink.names(), vec![DECODE_DURATION]);
    }

    #[test]
    fn crop_rejects_runaway_cover() {
        let processor = RustProcessor::new();
        let input = png_bytes(&gradient(1, 10000));

        let err = processor.crop(&input, 9999, 9999, CropPoint::Center).unwrap_err();
        assert!(matches!(err, ProcessorError::Decode(ImageError::Limits(_))));
    }

    #[test]
    fn failed_decode_records_nothing() {
        let sink = Arc::new(MemorySink::new());
        let processor = RustProcessor::with_settings(EncodeSettings::default(), sink.clone());

        assert!(processor.grayscale(b"nope").is_err());
        assert!(sink.updates().is_empty());
    }

    #[test]
    fn opaque_png_is_reencoded_as_jpeg() {
        let processor = RustProcessor::new();
        let input = png_bytes(&gradient(16, 16));

        let out = processor.resize(&input, 8, 0).unwrap();
        assert_eq!(sniff(&out), ImageFormat::Jpeg);
    }

    #[test]
    fn translucent_png_stays_png() {
        let processor = RustProcessor::new();
        let input = png_bytes(&translucent(16, 16, [1, 2, 3]));

        let out = processor.grayscale(&input).unwrap();
        assert_eq!(sniff(&out), ImageFormat::Png);
    }

    #[test]
    fn jpeg_input_stays_jpeg() {
        let processor = RustProcessor::new();
        let input = jpeg_bytes(&gradient(16, 16));

        let out = processor.crop(&input, 4, 4, CropPoint::BottomRight).unwrap();
        assert_eq!(sniff(&out), ImageFormat::Jpeg);
    }

    #[test]
    fn watermark_extremes() {
        let processor = RustProcessor::new();
        let base = png_bytes(&translucent(100, 100, [0, 0, 255]));
        let overlay = png_bytes(&DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            40,
            20,
            Rgba([255, 0, 0, 255]),
        )));

        // overlay becomes 50x25 at (25, 37)
        let untouched = processor.watermark(&base, &overlay, 0).unwrap();
        let untouched = image::load_from_memory(&untouched).unwrap().to_rgba8();
        assert_eq!(untouched.get_pixel(50, 50).0, [0, 0, 255, 255]);

        let covered = processor.watermark(&base, &overlay, 255).unwrap();
        let covered = image::load_from_memory(&covered).unwrap().to_rgba8();
        assert_eq!(covered.get_pixel(25, 37).0, [255, 0, 0, 255]);
        assert_eq!(covered.get_pixel(74, 61).0, [255, 0, 0, 255]);
        assert_eq!(covered.get_pixel(24, 50).0, [0, 0, 255, 255]);
        assert_eq!(covered.get_pixel(75, 50).0, [0, 0, 255, 255]);
        assert_eq!(covered.get_pixel(50, 62).0, [0, 0, 255, 255]);
    }
}
