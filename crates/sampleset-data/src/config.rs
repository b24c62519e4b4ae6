// DatasetConfig: which load and transform steps a dataset runs

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use sampleset_core::Result;

use crate::transform::StepConfig;

/// Pipeline configuration for a [`SampleDataset`](crate::dataset::SampleDataset).
///
/// Both lists are optional. An absent or empty list means the corresponding
/// pipeline is not built at all.
///
/// ```json
/// {
///   "load_pipeline": [{"name": "LoadImageFromFile", "keys": ["A"]}],
///   "transforms": [
///     {"name": "Resize", "keys": ["A"], "size": [256, 256]},
///     {"name": "RandomHorizontalFlip", "keys": ["A"], "prob": 0.5}
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_pipeline: Option<Vec<StepConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transforms: Option<Vec<StepConfig>>,
}

impl DatasetConfig {
    pub fn load_pipeline(mut self, steps: Vec<StepConfig>) -> Self {
        self.load_pipeline = Some(steps);
        self
    }

    pub fn transforms(mut self, steps: Vec<StepConfig>) -> Self {
        self.transforms = Some(steps);
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// The load steps, if any are configured.
    pub(crate) fn load_steps(&self) -> Option<&[StepConfig]> {
        non_empty(self.load_pipeline.as_deref())
    }

    /// The transform steps, if any are configured.
    pub(crate) fn transform_steps(&self) -> Option<&[StepConfig]> {
        non_empty(self.transforms.as_deref())
    }
}

fn non_empty(steps: Option<&[StepConfig]>) -> Option<&[StepConfig]> {
    steps.filter(|s| !s.is_empty())
}
