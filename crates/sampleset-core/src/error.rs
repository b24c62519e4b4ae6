use std::path::PathBuf;

/// All errors that can occur within sampleset.
///
/// One error type is shared by scanning, pipeline construction, and
/// per-sample resolution so that `?` works across the whole stack.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A folder scan found no file with a supported image extension.
    #[error("{} has no valid image file", path.display())]
    NoImages { path: PathBuf },

    /// Dataset index past the end of the annotation list.
    #[error("index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A step configuration names a step that is not registered.
    #[error("unknown pipeline step `{name}`")]
    UnknownStep { name: String },

    /// A step configuration is missing a parameter or has one of the wrong type.
    #[error("invalid config for step `{step}`: {reason}")]
    InvalidStepConfig { step: String, reason: String },

    /// A step expected a key that the sample does not contain.
    #[error("sample has no key `{key}`")]
    MissingKey { key: String },

    /// A sample slot holds a value of the wrong kind.
    #[error("sample key `{key}`: expected {expected}, got {got}")]
    UnexpectedValue {
        key: String,
        expected: &'static str,
        got: &'static str,
    },

    /// Image decoding failed.
    #[error("failed to decode {}: {reason}", path.display())]
    ImageDecode { path: PathBuf, reason: String },

    /// Underlying filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration.
    #[error("config error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic message for cases not covered above.
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Msg(s.into())
    }

    /// Shorthand for [`Error::InvalidStepConfig`].
    pub fn invalid_step(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidStepConfig {
            step: step.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience Result type used throughout sampleset.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_images_message_names_path() {
        let err = Error::NoImages {
            path: PathBuf::from("/data/imgs"),
        };
        assert_eq!(err.to_string(), "/data/imgs has no valid image file");
    }

    #[test]
    fn io_errors_convert() {
        fn fails() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(Error::Io(_))));
    }
}
