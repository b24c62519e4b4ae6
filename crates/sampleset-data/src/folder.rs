// FolderDataset: one sample per image found under a root folder
//
// The simplest concrete dataset: scan a folder (recursively) for images and
// expose each one under a single key, e.g. for unconditional generation or
// inference over a directory of inputs.

use std::path::{Path, PathBuf};

use sampleset_core::{Annotation, Result, Sample};

use crate::config::DatasetConfig;
use crate::dataset::{AnnotationSource, SampleDataset};
use crate::scan::scan_folder;

/// Key used when none is given.
pub const DEFAULT_KEY: &str = "A";

/// Annotation source backed by [`scan_folder`].
#[derive(Debug, Clone)]
pub struct FolderSource {
    root: PathBuf,
    key: String,
}

impl FolderSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            key: DEFAULT_KEY.to_string(),
        }
    }

    /// Store each image path under `key` instead of [`DEFAULT_KEY`].
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AnnotationSource for FolderSource {
    fn load_annotations(&self) -> Result<Vec<Annotation>> {
        let paths = scan_folder(&self.root)?;
        Ok(paths
            .into_iter()
            .map(|p| Sample::from_paths([(self.key.as_str(), p)]))
            .collect())
    }

    fn name(&self) -> &str {
        "FolderDataset"
    }
}

/// Dataset of every image under a folder.
pub type FolderDataset = SampleDataset<FolderSource>;

impl SampleDataset<FolderSource> {
    /// Scan `root` and build the dataset with the pipelines in `config`.
    ///
    /// Fails with [`Error::NoImages`](sampleset_core::Error::NoImages) if the
    /// folder holds no image.
    pub fn open<P: AsRef<Path>>(root: P, config: &DatasetConfig) -> Result<Self> {
        Self::open_with_key(root, DEFAULT_KEY, config)
    }

    /// Like [`open`](Self::open), storing each image path under `key`.
    pub fn open_with_key<P: AsRef<Path>>(
        root: P,
        key: impl Into<String>,
        config: &DatasetConfig,
    ) -> Result<Self> {
        SampleDataset::new(FolderSource::new(root).key(key), config)
    }
}
