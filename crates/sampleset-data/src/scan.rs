// Directory scanning: lazy enumeration of files under a root
//
// `scandir` walks a directory tree and yields paths relative to the root it
// was started from. Hidden entries (name starting with '.') are never yielded
// nor descended into. Subdirectories are only entered when `recursive` is set.
//
// Entries come out in whatever order the OS hands them back: no sorting is
// done here. Callers that need a stable order sort the result themselves (as
// `scan_folder` does).

use std::ffi::OsStr;
use std::fs::{self, ReadDir};
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, trace};
use sampleset_core::{Error, Result};

/// File extensions accepted by [`scan_folder`]. Matching is case-sensitive.
pub const IMG_EXTENSIONS: [&str; 10] = [
    ".jpg", ".JPG", ".jpeg", ".JPEG", ".png", ".PNG", ".ppm", ".PPM", ".bmp", ".BMP",
];

// Suffixes

/// Suffix filter applied to the relative path of every candidate file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Suffixes {
    /// No filtering.
    #[default]
    Any,
    /// Path must end with this string.
    One(String),
    /// Path must end with at least one of these strings.
    AnyOf(Vec<String>),
}

impl Suffixes {
    /// Whether `rel_path` passes the filter.
    pub fn matches(&self, rel_path: &Path) -> bool {
        let s = rel_path.to_string_lossy();
        match self {
            Suffixes::Any => true,
            Suffixes::One(suffix) => s.ends_with(suffix.as_str()),
            Suffixes::AnyOf(list) => list.iter().any(|suffix| s.ends_with(suffix.as_str())),
        }
    }
}

impl From<&str> for Suffixes {
    fn from(s: &str) -> Self {
        Suffixes::One(s.to_string())
    }
}

impl From<String> for Suffixes {
    fn from(s: String) -> Self {
        Suffixes::One(s)
    }
}

impl From<&[&str]> for Suffixes {
    fn from(list: &[&str]) -> Self {
        Suffixes::AnyOf(list.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Suffixes {
    fn from(list: [&str; N]) -> Self {
        Suffixes::AnyOf(list.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<String>> for Suffixes {
    fn from(list: Vec<String>) -> Self {
        Suffixes::AnyOf(list)
    }
}

impl From<Vec<&str>> for Suffixes {
    fn from(list: Vec<&str>) -> Self {
        list.as_slice().into()
    }
}

impl<T: Into<Suffixes>> From<Option<T>> for Suffixes {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or_default()
    }
}

// ScanDir

/// Lazy, forward-only iterator over the files under a directory.
///
/// Created by [`scandir`]. Each item is either a path relative to the scan
/// root or the I/O error hit while reading a directory; iteration can
/// continue past an error. Nothing touches the filesystem until the first
/// call to `next`. To scan again, build a new `ScanDir`.
#[derive(Debug)]
pub struct ScanDir {
    root: PathBuf,
    suffixes: Suffixes,
    recursive: bool,
    started: bool,
    /// One open directory handle per level currently being walked.
    stack: Vec<ReadDir>,
}

impl ScanDir {
    /// Scan `root` non-recursively with no suffix filter.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            suffixes: Suffixes::Any,
            recursive: false,
            started: false,
            stack: Vec::new(),
        }
    }

    /// Only yield files whose relative path ends with one of `suffix`.
    pub fn suffix(mut self, suffix: impl Into<Suffixes>) -> Self {
        self.suffixes = suffix.into();
        self
    }

    /// Descend into subdirectories.
    pub fn recursive(mut self, yes: bool) -> Self {
        self.recursive = yes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn open(&mut self, dir: &Path) -> Result<()> {
        debug!("scanning {}", dir.display());
        self.stack.push(fs::read_dir(dir)?);
        Ok(())
    }
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

impl Iterator for ScanDir {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            let root = self.root.clone();
            if let Err(e) = self.open(&root) {
                return Some(Err(e));
            }
        }

        loop {
            let entry = match self.stack.last_mut()?.next() {
                None => {
                    self.stack.pop();
                    continue;
                }
                Some(Err(e)) => return Some(Err(Error::Io(e))),
                Some(Ok(entry)) => entry,
            };

            if is_hidden(&entry.file_name()) {
                continue;
            }

            let path = entry.path();
            // fs::metadata follows symlinks. Only dangling links are skipped;
            // loops and permission errors are reported.
            let meta = match fs::metadata(&path) {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    trace!("skipping dangling link {}", path.display());
                    continue;
                }
                Err(e) => return Some(Err(Error::Io(e))),
            };

            if meta.is_file() {
                let rel = match path.strip_prefix(&self.root) {
                    Ok(rel) => rel.to_path_buf(),
                    Err(_) => continue,
                };
                if self.suffixes.matches(&rel) {
                    return Some(Ok(rel));
                }
            } else if meta.is_dir() && self.recursive {
                if let Err(e) = self.open(&path) {
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Scan a directory for files of interest.
///
/// Returns a lazy iterator of paths relative to `dir_path`. `suffix` accepts
/// a single string, a list of strings, or [`Suffixes::Any`].
///
/// # Example
/// ```ignore
/// for rel in scandir("data/train", [".png", ".jpg"], true) {
///     println!("{}", rel?.display());
/// }
/// ```
pub fn scandir<P: AsRef<Path>>(
    dir_path: P,
    suffix: impl Into<Suffixes>,
    recursive: bool,
) -> ScanDir {
    ScanDir::new(dir_path).suffix(suffix).recursive(recursive)
}

/// Collect every image under `path`, including sub-folders.
///
/// Each returned path is `path` joined with the file's relative path. The list
/// is sorted so that dataset indices are reproducible across runs.
///
/// Finding no image at all is reported as [`Error::NoImages`]: an image
/// dataset rooted at an empty folder is a configuration mistake.
pub fn scan_folder<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    let mut samples = scandir(path, IMG_EXTENSIONS, true)
        .map(|rel| rel.map(|rel| path.join(rel)))
        .collect::<Result<Vec<_>>>()?;

    if samples.is_empty() {
        return Err(Error::NoImages {
            path: path.to_path_buf(),
        });
    }
    samples.sort();
    debug!("found {} images under {}", samples.len(), path.display());
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_any_matches_everything() {
        assert!(Suffixes::Any.matches(Path::new("x/y.bin")));
        assert!(Suffixes::from(None::<&str>).matches(Path::new("noext")));
    }

    #[test]
    fn suffix_matches_whole_relative_path() {
        let s = Suffixes::from("sub/a.png");
        assert!(s.matches(Path::new("root/sub/a.png")));
        assert!(!s.matches(Path::new("root/other/a.png")));
    }

    #[test]
    fn suffix_is_case_sensitive() {
        let s = Suffixes::from([".png"]);
        assert!(s.matches(Path::new("a.png")));
        assert!(!s.matches(Path::new("a.PNG")));
    }

    #[test]
    fn empty_suffix_list_matches_nothing() {
        let s = Suffixes::from(Vec::<String>::new());
        assert!(!s.matches(Path::new("a.png")));
    }

    #[test]
    fn image_extensions_cover_both_cases() {
        for ext in ["jpg", "jpeg", "png", "ppm", "bmp"] {
            assert!(IMG_EXTENSIONS.contains(&format!(".{ext}").as_str()));
            assert!(IMG_EXTENSIONS.contains(&format!(".{}", ext.to_uppercase()).as_str()));
        }
        assert!(!IMG_EXTENSIONS.contains(&".gif"));
    }

    #[test]
    fn missing_root_yields_error() {
        let mut it = scandir("/definitely/not/here", Suffixes::Any, false);
        assert!(matches!(it.next(), Some(Err(Error::Io(_)))));
        assert!(it.next().is_none());
    }
}
