//! # sampleset-core
//!
//! Shared types for sampleset.
//!
//! This crate provides:
//! - [`Sample`] / [`Annotation`]: keyed mapping describing one dataset item
//! - [`Value`]: a single slot of a sample (path, text, number, or image)
//! - [`ImageData`]: decoded pixels in `[C, H, W]` layout
//! - [`Error`] / [`Result`]: the error type used across the workspace

pub mod error;
pub mod sample;

pub use error::{Error, Result};
pub use sample::{Annotation, ImageData, Sample, Value};
