// Dataset: indexed collections of samples
//
// `Dataset` is the capability generic iteration/batching code relies on:
// a length and per-index access. `SampleDataset` implements it for any
// `AnnotationSource`, resolving an index by running the stored annotation
// through an optional load pipeline and then an optional transform pipeline.

use std::path::{Path, PathBuf};

use log::{info, trace};

use sampleset_core::{Annotation, Error, Result, Sample};

use crate::config::DatasetConfig;
use crate::scan;
use crate::transform::{Pipeline, StepRegistry};

/// A dataset is an indexed collection of samples.
///
/// Implementations must be `Send + Sync` so a data loader can read from
/// multiple threads.
pub trait Dataset: Send + Sync {
    /// Total number of samples in the dataset.
    fn len(&self) -> usize;

    /// Whether the dataset is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve the sample at position `index`.
    fn get(&self, index: usize) -> Result<Sample>;

    /// Optional human-readable name.
    fn name(&self) -> &str {
        "dataset"
    }
}

/// Produces the annotation list of a concrete dataset.
///
/// This is the one operation every concrete dataset has to supply. Each
/// returned annotation maps semantic keys to file paths; list order defines
/// dataset indices.
pub trait AnnotationSource: Send + Sync {
    fn load_annotations(&self) -> Result<Vec<Annotation>>;

    fn name(&self) -> &str {
        "dataset"
    }
}

/// Base dataset: annotations from an [`AnnotationSource`], resolved lazily
/// through the configured pipelines.
///
/// Nothing is cached: every `get` starts again from the stored annotation, so
/// random steps produce a fresh result on each call.
#[derive(Debug)]
pub struct SampleDataset<S> {
    source: S,
    annotations: Vec<Annotation>,
    load_pipeline: Option<Pipeline>,
    transforms: Option<Pipeline>,
}

impl<S: AnnotationSource> SampleDataset<S> {
    /// Build the pipelines named in `config` from the default registries,
    /// then load the annotations.
    pub fn new(source: S, config: &DatasetConfig) -> Result<Self> {
        Self::with_registries(
            source,
            config,
            &StepRegistry::loaders(),
            &StepRegistry::transforms(),
        )
    }

    /// Like [`SampleDataset::new`], resolving step names in custom registries.
    pub fn with_registries(
        source: S,
        config: &DatasetConfig,
        loaders: &StepRegistry,
        transformers: &StepRegistry,
    ) -> Result<Self> {
        let load_pipeline = config
            .load_steps()
            .map(|steps| loaders.build(steps))
            .transpose()?;
        let transforms = config
            .transform_steps()
            .map(|steps| transformers.build(steps))
            .transpose()?;
        Self::from_parts(source, load_pipeline, transforms)
    }

    /// Assemble a dataset from already-built pipelines.
    pub fn from_parts(
        source: S,
        load_pipeline: Option<Pipeline>,
        transforms: Option<Pipeline>,
    ) -> Result<Self> {
        let annotations = source.load_annotations()?;
        info!(
            "{}: {} annotations (load pipeline: {}, transforms: {})",
            source.name(),
            annotations.len(),
            describe(load_pipeline.as_ref()),
            describe(transforms.as_ref()),
        );
        Ok(Self {
            source,
            annotations,
            load_pipeline,
            transforms,
        })
    }
}

fn describe(pipeline: Option<&Pipeline>) -> String {
    match pipeline {
        Some(p) => p.step_names().join(" -> "),
        None => "none".to_string(),
    }
}

impl<S> SampleDataset<S> {
    /// Every image under `path` (recursively), as paths prefixed by `path`.
    ///
    /// See [`scan::scan_folder`].
    pub fn scan_folder<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
        scan::scan_folder(path)
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn load_pipeline(&self) -> Option<&Pipeline> {
        self.load_pipeline.as_ref()
    }

    pub fn transforms(&self) -> Option<&Pipeline> {
        self.transforms.as_ref()
    }
}

impl<S: AnnotationSource> Dataset for SampleDataset<S> {
    fn len(&self) -> usize {
        self.annotations.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let mut datas = self
            .annotations
            .get(index)
            .cloned()
            .ok_or(Error::IndexOutOfRange {
                index,
                len: self.annotations.len(),
            })?;
        trace!("{}: resolving index {index}", self.source.name());

        if let Some(load) = &self.load_pipeline {
            datas = load.apply(datas)?;
        }
        if let Some(transforms) = &self.transforms {
            datas = transforms.apply(datas)?;
        }
        Ok(datas)
    }

    fn name(&self) -> &str {
        self.source.name()
    }
}
