//! # Darkroom
//!
//! The image manipulation core of an image proxy: given encoded image bytes and
//! a loose set of request parameters, produce transformed image bytes plus
//! timing telemetry.
//!
//! # Architecture: Dispatcher Over a Swappable Backend
//!
//! ```text
//! ProcessSpec ──► Dispatcher ──► ProcessParams (normalized once)
//!                     │
//!                     ▼
//!             ImageProcessor::{crop | resize} ──► grayscale?
//!                     │
//!                     ▼  decode → geometry → encode (format chosen by opacity)
//!                 output bytes
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`manipulator`] | Request dispatch and parameter normalization |
//! | [`imaging`] | Geometry, format selection, the backend trait and its `image` implementation |
//! | [`metrics`] | Recording contract, the `timed` wrapper, stock sinks |
//! | [`config`] | `config.toml` loading and validation |
//!
//! # Design Decisions
//!
//! ## Permissive Parameters
//!
//! Request parameters never fail a request. Bad numbers become 0, unknown crop
//! anchors become center, unknown fit modes skip geometry. A malformed request
//! therefore yields a *different* image, not an error.
//!
//! ## Content-Driven Output Format
//!
//! A PNG with no transparent pixel is re-encoded as JPEG. The check runs on
//! every encode, after the transform, so it always sees the final pixels.
//!
//! ## Example
//!
//! ```no_run
//! use darkroom::imaging::RustProcessor;
//! use darkroom::manipulator::{Dispatcher, Manipulator, ProcessSpec};
//!
//! let dispatcher = Dispatcher::new(RustProcessor::new());
//! let spec = ProcessSpec {
//!     scope: "avatars".into(),
//!     image_data: std::fs::read("in.png").unwrap(),
//!     params: [("w".to_string(), "200".to_string())].into_iter().collect(),
//! };
//! let resized = dispatcher.process(&spec).unwrap();
//! ```

pub mod config;
pub mod imaging;
pub mod manipulator;
pub mod metrics;
