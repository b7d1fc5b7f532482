//! Image processing backend trait and shared types.
//!
//! The [`ImageProcessor`] trait defines the four operations every backend must
//! support: crop, resize, watermark, and grayscale. Each takes encoded image
//! bytes and returns encoded image bytes.
//!
//! The production implementation is
//! [`RustProcessor`](super::rust_backend::RustProcessor), built on the `image`
//! crate. The trait is the seam for substituting another provider.

use super::params::CropPoint;
use image::ImageError;
use image::error::{ImageFormatHint, LimitError, LimitErrorKind, UnsupportedError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] ImageError),
    #[error("Failed to encode image: {0}")]
    Encode(#[source] ImageError),
}

impl ProcessorError {
    /// Decode error for input whose container format is not handled.
    pub fn unsupported_format(hint: ImageFormatHint) -> Self {
        ProcessorError::Decode(ImageError::Unsupported(UnsupportedError::from(hint)))
    }

    /// Decode error for a requested output too large to allocate.
    pub fn dimensions_too_large() -> Self {
        ProcessorError::Decode(ImageError::Limits(LimitError::from_kind(
            LimitErrorKind::DimensionError,
        )))
    }
}

/// Trait for image processing backends.
///
/// Every backend must implement all four operations so the dispatcher is
/// backend-agnostic.
pub trait ImageProcessor: Send + Sync {
    /// Cover-resize to `width`×`height`, then crop exactly that box at `point`.
    fn crop(
        &self,
        input: &[u8],
        width: u32,
        height: u32,
        point: CropPoint,
    ) -> Result<Vec<u8>, ProcessorError>;

    /// Aspect-preserving resize; a zero side is derived from the other.
    fn resize(&self, input: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ProcessorError>;

    /// Composite `overlay` centered on `base` at half its width.
    ///
    /// `opacity` scales the overlay: 0 leaves the base untouched, 255 applies
    /// the overlay at its own alpha.
    fn watermark(
        &self,
        base: &[u8],
        overlay: &[u8],
        opacity: u8,
    ) -> Result<Vec<u8>, ProcessorError>;

    /// Convert to gray, keeping alpha.
    fn grayscale(&self, input: &[u8]) -> Result<Vec<u8>, ProcessorError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock processor that records operations without touching pixels.
    ///
    /// Each operation returns its input with a `|op` suffix so tests can see
    /// which bytes flowed into which step.
    #[derive(Default)]
    pub struct MockProcessor {
        pub operations: Mutex<Vec<RecordedOp>>,
        pub fail_on: Option<&'static str>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Crop {
            input: Vec<u8>,
            width: u32,
            height: u32,
            point: CropPoint,
        },
        Resize {
            input: Vec<u8>,
            width: u32,
            height: u32,
        },
        Watermark {
            base: Vec<u8>,
            overlay: Vec<u8>,
            opacity: u8,
        },
        GrayScale {
            input: Vec<u8>,
        },
    }

    impl MockProcessor {
        pub fn new() -> Self {
            Self::default()
        }

        /// A mock whose `op` ("crop", "resize", ...) fails with a decode error.
        pub fn failing_on(op: &'static str) -> Self {
            Self {
                fail_on: Some(op),
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn finish(&self, op: &'static str, input: &[u8]) -> Result<Vec<u8>, ProcessorError> {
            if self.fail_on == Some(op) {
                return Err(ProcessorError::unsupported_format(ImageFormatHint::Unknown));
            }
            let mut out = input.to_vec();
            out.push(b'|');
            out.extend_from_slice(op.as_bytes());
            Ok(out)
        }
    }

    impl ImageProcessor for MockProcessor {
        fn crop(
            &self,
            input: &[u8],
            width: u32,
            height: u32,
            point: CropPoint,
        ) -> Result<Vec<u8>, ProcessorError> {
            self.operations.lock().unwrap().push(RecordedOp::Crop {
                input: input.to_vec(),
                width,
                height,
                point,
            });
            self.finish("crop", input)
        }

        fn resize(
            &self,
            input: &[u8],
            width: u32,
            height: u32,
        ) -> Result<Vec<u8>, ProcessorError> {
            self.operations.lock().unwrap().push(RecordedOp::Resize {
                input: input.to_vec(),
                width,
                height,
            });
            self.finish("resize", input)
        }

        fn watermark(
            &self,
            base: &[u8],
            overlay: &[u8],
            opacity: u8,
        ) -> Result<Vec<u8>, ProcessorError> {
            self.operations.lock().unwrap().push(RecordedOp::Watermark {
                base: base.to_vec(),
                overlay: overlay.to_vec(),
                opacity,
            });
            self.finish("watermark", base)
        }

        fn grayscale(&self, input: &[u8]) -> Result<Vec<u8>, ProcessorError> {
            self.operations.lock().unwrap().push(RecordedOp::GrayScale {
                input: input.to_vec(),
            });
            self.finish("grayscale", input)
        }
    }

    #[test]
    fn mock_records_crop() {
        let processor = MockProcessor::new();

        let out = processor.crop(b"img", 400, 500, CropPoint::TopLeft).unwrap();
        assert_eq!(out, b"img|crop");

        let ops = processor.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::Crop {
                width: 400,
                height: 500,
                point: CropPoint::TopLeft,
                ..
            }
        ));
    }

    #[test]
    fn mock_fails_on_request() {
        let processor = MockProcessor::failing_on("grayscale");

        assert!(processor.resize(b"img", 10, 0).is_ok());
        let err = processor.grayscale(b"img").unwrap_err();
        assert!(matches!(err, ProcessorError::Decode(_)));
        assert_eq!(processor.get_operations().len(), 2);
    }

    #[test]
    fn unsupported_format_is_a_decode_error() {
        let err = ProcessorError::unsupported_format(ImageFormatHint::Unknown);
        assert!(err.to_string().starts_with("Failed to decode image"));
    }

    #[test]
    fn oversized_dimensions_are_a_limits_error() {
        assert!(matches!(
            ProcessorError::dimensions_too_large(),
            ProcessorError::Decode(ImageError::Limits(_))
        ));
    }
}
