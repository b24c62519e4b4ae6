//! # sampleset-data
//!
//! Directory scanning, processing pipelines, and indexable datasets.
//!
//! This crate provides:
//! - [`scandir`] / [`scan_folder`]: lazy, filter-aware directory scanning
//! - [`Transform`] / [`Pipeline`]: processing steps built from [`StepConfig`] lists
//! - [`Dataset`] trait: length plus per-index access
//! - [`SampleDataset`]: annotations from an [`AnnotationSource`], resolved through
//!   an optional load pipeline and an optional transform pipeline
//! - [`FolderDataset`]: every image under a folder, one sample each
//
//   Built-in load steps: LoadImageFromFile
//   Built-in transform steps: Resize, RandomHorizontalFlip, Normalize

pub mod augment;
pub mod config;
pub mod dataset;
pub mod folder;
pub mod load;
pub mod scan;
pub mod transform;

pub use augment::{Normalize, RandomHorizontalFlip, Resize};
pub use config::DatasetConfig;
pub use dataset::{AnnotationSource, Dataset, SampleDataset};
pub use folder::{FolderDataset, FolderSource};
pub use load::LoadImageFromFile;
pub use scan::{scan_folder, scandir, ScanDir, Suffixes, IMG_EXTENSIONS};
pub use transform::{
    build_load_pipeline, build_transforms, Pipeline, StepConfig, StepRegistry, Transform,
};

pub use sampleset_core::{Annotation, Error, ImageData, Result, Sample, Value};
