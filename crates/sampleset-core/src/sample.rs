// Sample: keyed data flowing through load and transform pipelines
//
// A dataset index resolves to one Sample. Before loading, every slot of it is
// usually a file path (that form is called an Annotation). Load steps replace
// paths with decoded data; transform steps rewrite that data in place.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// An Annotation is a Sample whose slots still point at files on disk.
pub type Annotation = Sample;

// ImageData

/// A decoded image stored as planar `f32` pixels in `[C, H, W]` layout.
///
/// The buffer length always equals `channels * height * width`; fields are
/// only reachable through accessors so that cannot be broken.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    channels: usize,
    height: usize,
    width: usize,
    /// Pixel values, channel-first, row-major.
    pixels: Vec<f32>,
}

impl ImageData {
    /// Wrap a pixel buffer, checking that its length matches the shape.
    pub fn new(channels: usize, height: usize, width: usize, pixels: Vec<f32>) -> Result<Self> {
        let expected = channels * height * width;
        if pixels.len() != expected {
            return Err(Error::msg(format!(
                "image buffer has {} values, shape [{channels}, {height}, {width}] needs {expected}",
                pixels.len()
            )));
        }
        Ok(Self {
            channels,
            height,
            width,
            pixels,
        })
    }

    /// An all-zero image of the given shape.
    pub fn zeros(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
            pixels: vec![0.0; channels * height * width],
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// Mutable pixel access. The slice can be rewritten but not resized.
    pub fn pixels_mut(&mut self) -> &mut [f32] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<f32> {
        self.pixels
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }

    /// Flat offset of pixel `(c, y, x)`.
    #[inline]
    pub fn offset(&self, c: usize, y: usize, x: usize) -> usize {
        c * self.height * self.width + y * self.width + x
    }

    pub fn at(&self, c: usize, y: usize, x: usize) -> f32 {
        self.pixels[self.offset(c, y, x)]
    }
}

// Value

/// One slot of a [`Sample`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Path(PathBuf),
    Text(String),
    Number(f64),
    Image(ImageData),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Path(_) => "path",
            Value::Text(_) => "text",
            Value::Number(_) => "number",
            Value::Image(_) => "image",
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageData> {
        match self {
            Value::Image(img) => Some(img),
            _ => None,
        }
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::Path(p)
    }
}

impl From<&Path> for Value {
    fn from(p: &Path) -> Self {
        Value::Path(p.to_path_buf())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<ImageData> for Value {
    fn from(img: ImageData) -> Self {
        Value::Image(img)
    }
}

// Sample

/// An ordered mapping from semantic key (e.g. `"A"`, `"gt"`) to [`Value`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    fields: BTreeMap<String, Value>,
}

impl Sample {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an annotation from `(key, path)` pairs.
    pub fn from_paths<K, P, I>(pairs: I) -> Self
    where
        K: Into<String>,
        P: Into<PathBuf>,
        I: IntoIterator<Item = (K, P)>,
    {
        pairs
            .into_iter()
            .map(|(k, p)| (k.into(), Value::Path(p.into())))
            .collect()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value, returning the previous one under that key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The value at `key`, or [`Error::MissingKey`].
    pub fn require(&self, key: &str) -> Result<&Value> {
        self.get(key).ok_or_else(|| Error::MissingKey {
            key: key.to_string(),
        })
    }

    /// The path stored at `key`.
    pub fn path(&self, key: &str) -> Result<&Path> {
        match self.require(key)? {
            Value::Path(p) => Ok(p),
            other => Err(unexpected(key, "path", other)),
        }
    }

    /// The image stored at `key`.
    pub fn image(&self, key: &str) -> Result<&ImageData> {
        match self.require(key)? {
            Value::Image(img) => Ok(img),
            other => Err(unexpected(key, "image", other)),
        }
    }

    /// Mutable access to the image stored at `key`.
    pub fn image_mut(&mut self, key: &str) -> Result<&mut ImageData> {
        match self.fields.get_mut(key) {
            Some(Value::Image(img)) => Ok(img),
            Some(other) => Err(unexpected(key, "image", other)),
            None => Err(Error::MissingKey {
                key: key.to_string(),
            }),
        }
    }
}

fn unexpected(key: &str, expected: &'static str, got: &Value) -> Error {
    Error::UnexpectedValue {
        key: key.to_string(),
        expected,
        got: got.kind(),
    }
}

impl FromIterator<(String, Value)> for Sample {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Sample {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
