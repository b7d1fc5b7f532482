//! Request dispatch.
//!
//! A [`ProcessSpec`] carries image bytes and a loose parameter map. The
//! [`Dispatcher`] normalizes the map into [`ProcessParams`] and runs, in order:
//!
//! 1. **Crop** when `fit=crop`, or else **Resize** when `fit` is empty and a
//!    dimension is given. Never both.
//! 2. **GrayScale** when `mono=000000`, on whatever bytes step 1 produced.
//!
//! The first failing step aborts the pass and its error is returned as-is.
//! Each successful step is recorded under the caller's scope.

pub mod params;

use crate::imaging::{ImageProcessor, ProcessorError};
use crate::metrics::{
    CROP_DURATION, GRAYSCALE_DURATION, MetricsSink, NoopSink, RESIZE_DURATION, timed,
};
use std::collections::HashMap;
use std::sync::Arc;

pub use params::{FitMode, ProcessParams, clean_int};

/// One image manipulation job.
#[derive(Debug, Clone, Default)]
pub struct ProcessSpec {
    /// Telemetry tag attached to this job's metrics.
    pub scope: String,
    /// Encoded source image.
    pub image_data: Vec<u8>,
    /// Request parameters: `w`, `h`, `fit`, `crop`, `mono`. Others are ignored.
    pub params: HashMap<String, String>,
}

/// Contract for running a [`ProcessSpec`].
pub trait Manipulator {
    fn process(&self, spec: &ProcessSpec) -> Result<Vec<u8>, ProcessorError>;
}

/// Maps request parameters onto [`ImageProcessor`] calls.
pub struct Dispatcher<P> {
    processor: P,
    metrics: Arc<dyn MetricsSink>,
}

impl<P: ImageProcessor> Dispatcher<P> {
    pub fn new(processor: P) -> Self {
        Self::with_metrics(processor, Arc::new(NoopSink))
    }

    pub fn with_metrics(processor: P, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { processor, metrics }
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Run the pipeline with already-typed parameters.
    pub fn process_params(
        &self,
        scope: &str,
        image_data: &[u8],
        params: &ProcessParams,
    ) -> Result<Vec<u8>, ProcessorError> {
        let sink = self.metrics.as_ref();
        tracing::debug!(scope, ?params, "processing");

        let data = match params.fit {
            FitMode::Crop => Some(timed(sink, CROP_DURATION, scope, || {
                self.processor
                    .crop(image_data, params.width, params.height, params.crop_point)
            })?),
            FitMode::None if params.has_dimensions() => {
                Some(timed(sink, RESIZE_DURATION, scope, || {
                    self.processor
                        .resize(image_data, params.width, params.height)
                })?)
            }
            FitMode::None | FitMode::Other => None,
        };

        let data = if params.grayscale {
            let current = data.as_deref().unwrap_or(image_data);
            Some(timed(sink, GRAYSCALE_DURATION, scope, || {
                self.processor.grayscale(current)
            })?)
        } else {
            data
        };

        Ok(data.unwrap_or_else(|| image_data.to_vec()))
    }
}

impl<P: ImageProcessor> Manipulator for Dispatcher<P> {
    fn process(&self, spec: &ProcessSpec) -> Result<Vec<u8>, ProcessorError> {
        let params = ProcessParams::from_params(&spec.params);
        self.process_params(&spec.scope, &spec.image_data, &params)
    }
}
