use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// How the buffering subsystem identifies a dataset: the file's leaf name plus the dataset
/// name.
///
/// Only the leaf name of the file path is kept, so `a/run.h5` and `b/run.h5` share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatasetKey {
    file: String,
    dataset: String,
}

impl DatasetKey {
    /// Builds a key from a full file path, stripping directory components.
    #[must_use]
    pub fn from_path(path: &str, dataset: impl Into<String>) -> Self {
        Self { file: base_name(path).to_owned(), dataset: dataset.into() }
    }

    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.dataset)
    }
}

/// Leaf component of `path`; the path itself when it has no usable leaf (e.g. `"/"` or `".."`).
#[must_use]
pub fn base_name(path: &str) -> &str {
    Path::new(path).file_name().and_then(|name| name.to_str()).unwrap_or(path)
}
