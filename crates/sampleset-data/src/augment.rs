// Image transforms: geometric and photometric steps for the transform stage
//
// All steps operate on the `Image` slots named by `keys`, in [C, H, W] layout.
// When a sample carries several images (e.g. an input and its ground truth),
// every random decision is drawn once per sample and applied to all of them.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use sampleset_core::{Error, ImageData, Result, Sample};

use crate::transform::{StepConfig, Transform};

fn default_keys() -> Vec<String> {
    vec!["A".to_string()]
}

fn default_prob() -> f64 {
    0.5
}

// Resize

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResizeParams {
    #[serde(default = "default_keys")]
    keys: Vec<String>,
    /// `[height, width]`
    size: [usize; 2],
}

/// Resize images to a fixed `height x width` with nearest-neighbour sampling.
#[derive(Debug, Clone)]
pub struct Resize {
    pub keys: Vec<String>,
    pub height: usize,
    pub width: usize,
}

impl Resize {
    pub fn new(keys: Vec<String>, height: usize, width: usize) -> Self {
        Self {
            keys,
            height,
            width,
        }
    }

    pub fn from_config(cfg: &StepConfig) -> Result<Self> {
        let p: ResizeParams = cfg.parse()?;
        let [height, width] = p.size;
        if height == 0 || width == 0 {
            return Err(Error::invalid_step(&cfg.name, "`size` must be non-zero"));
        }
        Ok(Self::new(p.keys, height, width))
    }

    fn resize(&self, img: &ImageData) -> ImageData {
        let [c, h, w] = img.shape();
        let mut out = ImageData::zeros(c, self.height, self.width);
        if h == 0 || w == 0 {
            return out;
        }
        for ch in 0..c {
            for y in 0..self.height {
                let sy = y * h / self.height;
                for x in 0..self.width {
                    let sx = x * w / self.width;
                    let dst = out.offset(ch, y, x);
                    out.pixels_mut()[dst] = img.at(ch, sy, sx);
                }
            }
        }
        out
    }
}

impl Transform for Resize {
    fn apply(&self, mut sample: Sample) -> Result<Sample> {
        for key in &self.keys {
            let img = sample.image_mut(key)?;
            *img = self.resize(img);
        }
        Ok(sample)
    }

    fn name(&self) -> &str {
        "Resize"
    }
}

// RandomHorizontalFlip

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FlipParams {
    #[serde(default = "default_keys")]
    keys: Vec<String>,
    #[serde(default = "default_prob")]
    prob: f64,
    #[serde(default)]
    seed: Option<u64>,
}

/// Mirror images left-to-right with probability `prob`.
///
/// Pass a `seed` for a reproducible sequence of decisions.
#[derive(Debug)]
pub struct RandomHorizontalFlip {
    pub keys: Vec<String>,
    pub prob: f64,
    rng: Mutex<StdRng>,
}

impl RandomHorizontalFlip {
    pub fn new(keys: Vec<String>, prob: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            keys,
            prob,
            rng: Mutex::new(rng),
        }
    }

    pub fn from_config(cfg: &StepConfig) -> Result<Self> {
        let p: FlipParams = cfg.parse()?;
        if !(0.0..=1.0).contains(&p.prob) {
            return Err(Error::invalid_step(&cfg.name, "`prob` must be in [0, 1]"));
        }
        Ok(Self::new(p.keys, p.prob, p.seed))
    }

    fn coin(&self) -> bool {
        // StdRng has no invariant a panic can break, so a poisoned lock is still usable.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen::<f64>() < self.prob
    }
}

fn hflip(img: &mut ImageData) {
    let [c, h, w] = img.shape();
    for ch in 0..c {
        for y in 0..h {
            let start = img.offset(ch, y, 0);
            img.pixels_mut()[start..start + w].reverse();
        }
    }
}

impl Transform for RandomHorizontalFlip {
    fn apply(&self, mut sample: Sample) -> Result<Sample> {
        // Validate every key before deciding, so a missing key fails regardless of the coin.
        for key in &self.keys {
            sample.image(key)?;
        }
        if self.coin() {
            for key in &self.keys {
                hflip(sample.image_mut(key)?);
            }
        }
        Ok(sample)
    }

    fn name(&self) -> &str {
        "RandomHorizontalFlip"
    }
}

// Normalize

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NormalizeParams {
    #[serde(default = "default_keys")]
    keys: Vec<String>,
    mean: Vec<f32>,
    std: Vec<f32>,
}

/// Per-channel standardization: `(x - mean[c]) / std[c]`.
///
/// A single `mean`/`std` value is broadcast to every channel.
#[derive(Debug, Clone)]
pub struct Normalize {
    pub keys: Vec<String>,
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl Normalize {
    pub fn new(keys: Vec<String>, mean: Vec<f32>, std: Vec<f32>) -> Self {
        Self { keys, mean, std }
    }

    pub fn from_config(cfg: &StepConfig) -> Result<Self> {
        let p: NormalizeParams = cfg.parse()?;
        if p.mean.is_empty() || p.mean.len() != p.std.len() {
            return Err(Error::invalid_step(
                &cfg.name,
                "`mean` and `std` must be non-empty and of equal length",
            ));
        }
        if p.std.iter().any(|&s| s == 0.0) {
            return Err(Error::invalid_step(&cfg.name, "`std` must be non-zero"));
        }
        Ok(Self::new(p.keys, p.mean, p.std))
    }

    fn stats(&self, channel: usize) -> (f32, f32) {
        if self.mean.len() == 1 {
            (self.mean[0], self.std[0])
        } else {
            (self.mean[channel], self.std[channel])
        }
    }
}

impl Transform for Normalize {
    fn apply(&self, mut sample: Sample) -> Result<Sample> {
        for key in &self.keys {
            let img = sample.image_mut(key)?;
            let [c, h, w] = img.shape();
            if self.mean.len() != 1 && self.mean.len() != c {
                return Err(Error::msg(format!(
                    "Normalize: {} channel stats for `{key}` with {} channels",
                    self.mean.len(),
                    c
                )));
            }
            let plane = h * w;
            for ch in 0..c {
                let (mean, std) = self.stats(ch);
                for v in &mut img.pixels_mut()[ch * plane..(ch + 1) * plane] {
                    *v = (*v - mean) / std;
                }
            }
        }
        Ok(sample)
    }

    fn name(&self) -> &str {
        "Normalize"
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn make_image(c: usize, h: usize, w: usize) -> ImageData {
        let n = c * h * w;
        ImageData::new(c, h, w, (0..n).map(|i| i as f32).collect()).unwrap()
    }

    fn sample_with(keys: &[&str], img: ImageData) -> Sample {
        keys.iter()
            .fold(Sample::new(), |s, k| s.with(*k, img.clone()))
    }

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resize_nearest_upsample() {
        let step = Resize::new(keys(&["A"]), 2, 4);
        let out = step.apply(sample_with(&["A"], make_image(1, 1, 2))).unwrap();
        let img = out.image("A").unwrap();
        assert_eq!(img.shape(), [1, 2, 4]);
        assert_eq!(img.pixels().to_vec(), vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn resize_nearest_downsample() {
        let step = Resize::new(keys(&["A"]), 1, 2);
        let out = step.apply(sample_with(&["A"], make_image(1, 2, 4))).unwrap();
        assert_eq!(out.image("A").unwrap().pixels().to_vec(), vec![0.0, 2.0]);
    }

    #[test]
    fn flip_p1_mirrors_rows() {
        let step = RandomHorizontalFlip::new(keys(&["A"]), 1.0, Some(0));
        let out = step.apply(sample_with(&["A"], make_image(1, 2, 3))).unwrap();
        // Original: [0,1,2, 3,4,5]
        assert_eq!(
            out.image("A").unwrap().pixels().to_vec(),
            vec![2.0, 1.0, 0.0, 5.0, 4.0, 3.0]
        );
    }

    #[test]
    fn flip_p0_is_identity() {
        let step = RandomHorizontalFlip::new(keys(&["A"]), 0.0, None);
        let img = make_image(2, 2, 2);
        let out = step.apply(sample_with(&["A"], img.clone())).unwrap();
        assert_eq!(out.image("A").unwrap(), &img);
    }

    #[test]
    fn flip_keeps_paired_images_aligned() {
        let step = RandomHorizontalFlip::new(keys(&["A", "B"]), 0.5, Some(7));
        for _ in 0..20 {
            let out = step
                .apply(sample_with(&["A", "B"], make_image(1, 1, 3)))
                .unwrap();
            assert_eq!(out.image("A").unwrap(), out.image("B").unwrap());
        }
    }

    #[test]
    fn flip_is_reproducible_with_seed() {
        let run = || {
            let step = RandomHorizontalFlip::new(keys(&["A"]), 0.5, Some(42));
            (0..16)
                .map(|_| {
                    let out = step.apply(sample_with(&["A"], make_image(1, 1, 2))).unwrap();
                    out.image("A").unwrap().pixels()[0] == 1.0
                })
                .collect::<Vec<bool>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn normalize_per_channel() {
        let step = Normalize::new(keys(&["A"]), vec![0.0, 4.0], vec![1.0, 2.0]);
        let out = step.apply(sample_with(&["A"], make_image(2, 2, 2))).unwrap();
        // channel 0 unchanged, channel 1: (v - 4) / 2
        assert_eq!(
            out.image("A").unwrap().pixels().to_vec(),
            vec![0.0, 1.0, 2.0, 3.0, 0.0, 0.5, 1.0, 1.5]
        );
    }

    #[test]
    fn normalize_channel_mismatch_fails() {
        let step = Normalize::new(keys(&["A"]), vec![0.5, 0.5], vec![0.5, 0.5]);
        assert!(step.apply(sample_with(&["A"], make_image(3, 1, 1))).is_err());
    }

    #[test]
    fn steps_reject_non_image_slots() {
        let step = Resize::new(keys(&["A"]), 2, 2);
        let sample = Sample::from_paths([("A", "/tmp/a.png")]);
        assert!(matches!(
            step.apply(sample),
            Err(Error::UnexpectedValue { .. })
        ));
    }

    #[test]
    fn configs_are_validated() {
        let resize = StepConfig::new("Resize").param("size", serde_json::json!([0, 4]));
        assert!(Resize::from_config(&resize).is_err());

        let flip = StepConfig::new("RandomHorizontalFlip").param("prob", 1.5);
        assert!(RandomHorizontalFlip::from_config(&flip).is_err());

        let norm = StepConfig::new("Normalize")
            .param("mean", serde_json::json!([0.5, 0.5]))
            .param("std", serde_json::json!([0.5]));
        assert!(Normalize::from_config(&norm).is_err());

        let typo = StepConfig::new("Resize")
            .param("size", serde_json::json!([4, 4]))
            .param("sise", 1);
        assert!(matches!(
            Resize::from_config(&typo),
            Err(Error::InvalidStepConfig { .. })
        ));
    }
}
