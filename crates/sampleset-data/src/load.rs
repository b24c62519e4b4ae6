// Load steps: turn the file paths of an annotation into decoded data
//
// These run in the load pipeline, before any transform step.

use std::path::Path;

use image::DynamicImage;
use serde::Deserialize;

use sampleset_core::{Error, ImageData, Result, Sample};

use crate::transform::{StepConfig, Transform};

fn default_keys() -> Vec<String> {
    vec!["A".to_string()]
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoadImageParams {
    #[serde(default = "default_keys")]
    keys: Vec<String>,
    #[serde(default)]
    grayscale: bool,
}

/// Decode the image files referenced by `keys`.
///
/// For every key the path is replaced by the decoded [`ImageData`] (`[C, H, W]`,
/// values scaled to `[0, 1]`, 3 channels or 1 if `grayscale`), and the original
/// path is kept under `"{key}_path"`.
#[derive(Debug, Clone)]
pub struct LoadImageFromFile {
    pub keys: Vec<String>,
    pub grayscale: bool,
}

impl LoadImageFromFile {
    pub fn new(keys: Vec<String>, grayscale: bool) -> Self {
        Self { keys, grayscale }
    }

    pub fn from_config(cfg: &StepConfig) -> Result<Self> {
        let p: LoadImageParams = cfg.parse()?;
        if p.keys.is_empty() {
            return Err(Error::invalid_step(&cfg.name, "`keys` must not be empty"));
        }
        Ok(Self::new(p.keys, p.grayscale))
    }

    fn decode(&self, path: &Path) -> Result<ImageData> {
        let img = image::open(path).map_err(|e| Error::ImageDecode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        to_planar(&img, self.grayscale)
    }
}

/// Convert interleaved `[H, W, C]` 8-bit pixels to planar `[C, H, W]` floats.
fn to_planar(img: &DynamicImage, grayscale: bool) -> Result<ImageData> {
    let (raw, c, w, h) = if grayscale {
        let gray = img.to_luma8();
        let (w, h) = gray.dimensions();
        (gray.into_raw(), 1usize, w as usize, h as usize)
    } else {
        let rgb = img.to_rgb8();
        let (w, h) = rgb.dimensions();
        (rgb.into_raw(), 3usize, w as usize, h as usize)
    };

    let npix = w * h;
    let mut pixels = vec![0.0f32; c * npix];
    for i in 0..npix {
        for ch in 0..c {
            pixels[ch * npix + i] = raw[i * c + ch] as f32 / 255.0;
        }
    }
    ImageData::new(c, h, w, pixels)
}

impl Transform for LoadImageFromFile {
    fn apply(&self, mut sample: Sample) -> Result<Sample> {
        for key in &self.keys {
            let path = sample.path(key)?.to_path_buf();
            let img = self.decode(&path)?;
            sample.insert(key.as_str(), img);
            sample.insert(format!("{key}_path"), path);
        }
        Ok(sample)
    }

    fn name(&self) -> &str {
        "LoadImageFromFile"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use sampleset_core::Value;

    fn write_png(dir: &Path, name: &str) -> std::path::PathBuf {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 255]));
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn decodes_into_planar_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "x.png");
        let step = LoadImageFromFile::new(vec!["A".into()], false);

        let out = step.apply(Sample::from_paths([("A", &path)])).unwrap();
        let img = out.image("A").unwrap();
        assert_eq!(img.shape(), [3, 1, 2]);
        // R plane, G plane, B plane
        assert_eq!(img.pixels().to_vec(), vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(out.get("A_path"), Some(&Value::Path(path)));
    }

    #[test]
    fn grayscale_has_one_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "x.png");
        let step = LoadImageFromFile::new(vec!["A".into()], true);
        let out = step.apply(Sample::from_paths([("A", &path)])).unwrap();
        assert_eq!(out.image("A").unwrap().shape(), [1, 1, 2]);
    }

    #[test]
    fn missing_key_fails() {
        let step = LoadImageFromFile::new(vec!["B".into()], false);
        let err = step
            .apply(Sample::from_paths([("A", "/tmp/a.png")]))
            .unwrap_err();
        assert!(matches!(err, Error::MissingKey { key } if key == "B"));
    }

    #[test]
    fn undecodable_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        let step = LoadImageFromFile::new(vec!["A".into()], false);
        let err = step.apply(Sample::from_paths([("A", &path)])).unwrap_err();
        assert!(matches!(err, Error::ImageDecode { .. }));
    }

    #[test]
    fn config_defaults_to_key_a() {
        let step = LoadImageFromFile::from_config(&StepConfig::new("LoadImageFromFile")).unwrap();
        assert_eq!(step.keys, vec!["A".to_string()]);
        assert!(!step.grayscale);

        let bad = StepConfig::new("LoadImageFromFile").param("keys", serde_json::json!([]));
        assert!(LoadImageFromFile::from_config(&bad).is_err());
    }
}
