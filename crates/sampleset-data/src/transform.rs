// Transform: processing steps and the pipelines built from them
//
// A Pipeline is an ordered list of steps, each mapping a Sample to a Sample.
// Pipelines are assembled once from a list of StepConfig entries, looked up
// by name in a StepRegistry. Two default registries exist: one for the load
// stage (paths -> decoded data) and one for the transform stage (decoded data
// -> augmented data).

use std::collections::HashMap;
use std::fmt;

use log::trace;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use sampleset_core::{Error, Result, Sample};

use crate::augment::{Normalize, RandomHorizontalFlip, Resize};
use crate::load::LoadImageFromFile;

/// A single processing step applied to each sample.
///
/// Steps are shared by every index of a dataset and may be called from
/// several threads at once, so they must be `Send + Sync`. Steps with random
/// behaviour own their RNG behind a lock.
pub trait Transform: Send + Sync {
    /// Apply the step to a sample, returning the modified sample.
    fn apply(&self, sample: Sample) -> Result<Sample>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "transform"
    }
}

// Pipeline

/// Chain of steps run in order.
pub struct Pipeline {
    steps: Vec<Box<dyn Transform>>,
}

impl Pipeline {
    pub fn new(steps: Vec<Box<dyn Transform>>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order. The first failing step aborts the sample.
    pub fn apply(&self, mut sample: Sample) -> Result<Sample> {
        for step in &self.steps {
            trace!("applying {}", step.name());
            sample = step.apply(sample)?;
        }
        Ok(sample)
    }
}

impl Transform for Pipeline {
    fn apply(&self, sample: Sample) -> Result<Sample> {
        Pipeline::apply(self, sample)
    }

    fn name(&self) -> &str {
        "Pipeline"
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.step_names())
            .finish()
    }
}

// StepConfig

/// Configuration of one step: its registered `name` plus free-form parameters.
///
/// In JSON the parameters sit next to the name:
/// `{"name": "Resize", "keys": ["A"], "size": [256, 256]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    pub name: String,
    #[serde(flatten)]
    pub params: Map<String, JsonValue>,
}

impl StepConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Map::new(),
        }
    }

    /// Builder-style parameter setter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Deserialize the parameters into a step's typed parameter struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(JsonValue::Object(self.params.clone()))
            .map_err(|e| Error::invalid_step(&self.name, e.to_string()))
    }
}

// StepRegistry

type StepFactory = Box<dyn Fn(&StepConfig) -> Result<Box<dyn Transform>> + Send + Sync>;

/// Maps step names to constructors.
#[derive(Default)]
pub struct StepRegistry {
    factories: HashMap<String, StepFactory>,
}

impl StepRegistry {
    /// A registry with nothing in it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Default steps for the load stage.
    pub fn loaders() -> Self {
        let mut reg = Self::empty();
        reg.register("LoadImageFromFile", |cfg| {
            Ok(Box::new(LoadImageFromFile::from_config(cfg)?))
        });
        reg
    }

    /// Default steps for the transform stage.
    pub fn transforms() -> Self {
        let mut reg = Self::empty();
        reg.register("Resize", |cfg| Ok(Box::new(Resize::from_config(cfg)?)));
        reg.register("RandomHorizontalFlip", |cfg| {
            Ok(Box::new(RandomHorizontalFlip::from_config(cfg)?))
        });
        reg.register("Normalize", |cfg| Ok(Box::new(Normalize::from_config(cfg)?)));
        reg
    }

    /// Register (or replace) the constructor for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&StepConfig) -> Result<Box<dyn Transform>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Sorted names of all registered steps.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build a pipeline from step configurations, in order.
    pub fn build(&self, configs: &[StepConfig]) -> Result<Pipeline> {
        let steps = configs
            .iter()
            .map(|cfg| match self.factories.get(&cfg.name) {
                Some(factory) => factory(cfg),
                None => Err(Error::UnknownStep {
                    name: cfg.name.clone(),
                }),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Pipeline::new(steps))
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("steps", &self.names())
            .finish()
    }
}

/// Build a load-stage pipeline using the default loader registry.
pub fn build_load_pipeline(configs: &[StepConfig]) -> Result<Pipeline> {
    StepRegistry::loaders().build(configs)
}

/// Build a transform-stage pipeline using the default transform registry.
pub fn build_transforms(configs: &[StepConfig]) -> Result<Pipeline> {
    StepRegistry::transforms().build(configs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sampleset_core::Value;

    struct Tag(String);

    impl Transform for Tag {
        fn apply(&self, mut sample: Sample) -> Result<Sample> {
            let prev = match sample.get("trail") {
                Some(Value::Text(t)) => t.clone(),
                _ => String::new(),
            };
            sample.insert("trail", format!("{prev}{}", self.0));
            Ok(sample)
        }
    }

    fn tag(s: &str) -> Box<dyn Transform> {
        Box::new(Tag(s.to_string()))
    }

    struct Fail;

    impl Transform for Fail {
        fn apply(&self, _sample: Sample) -> Result<Sample> {
            Err(Error::msg("boom"))
        }
    }

    #[test]
    fn pipeline_runs_steps_in_order() {
        let p = Pipeline::new(vec![tag("a"), tag("b"), tag("c")]);
        let out = p.apply(Sample::new()).unwrap();
        assert_eq!(out.get("trail"), Some(&Value::Text("abc".into())));
    }

    #[test]
    fn pipeline_stops_at_first_error() {
        let steps: Vec<Box<dyn Transform>> = vec![tag("a"), Box::new(Fail), tag("b")];
        let p = Pipeline::new(steps);
        assert!(matches!(p.apply(Sample::new()), Err(Error::Msg(_))));
    }

    #[test]
    fn step_config_flattens_params() {
        let cfg: StepConfig =
            serde_json::from_str(r#"{"name": "Resize", "keys": ["A"], "size": [4, 8]}"#).unwrap();
        assert_eq!(cfg.name, "Resize");
        assert_eq!(cfg.params.len(), 2);
        assert_eq!(cfg.params["size"], serde_json::json!([4, 8]));
    }

    #[test]
    fn unknown_step_is_rejected() {
        let err = StepRegistry::transforms()
            .build(&[StepConfig::new("Sharpen")])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownStep { name } if name == "Sharpen"));
    }

    #[test]
    fn default_registries_are_disjoint() {
        let loaders = StepRegistry::loaders();
        let transforms = StepRegistry::transforms();
        assert_eq!(loaders.names(), vec!["LoadImageFromFile"]);
        assert_eq!(
            transforms.names(),
            vec!["Normalize", "RandomHorizontalFlip", "Resize"]
        );
        assert!(!transforms.contains("LoadImageFromFile"));
    }

    #[test]
    fn custom_steps_can_be_registered() {
        let mut reg = StepRegistry::empty();
        reg.register("Tag", |cfg| {
            let mut p: HashMap<String, String> = cfg.parse()?;
            let label = p.remove("label").unwrap_or_default();
            Ok(Box::new(Tag(label)))
        });
        let pipeline = reg
            .build(&[StepConfig::new("Tag").param("label", "x")])
            .unwrap();
        assert_eq!(pipeline.len(), 1);
        let out = pipeline.apply(Sample::new()).unwrap();
        assert_eq!(out.get("trail"), Some(&Value::Text("x".into())));
    }
}
