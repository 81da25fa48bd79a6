//! Dataset sources: fetching raw dataset text by name.

use std::collections::HashMap;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};

/// Dataset could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid dataset name {0:?}")]
    InvalidName(String),
    #[error("Dataset {0:?} not found")]
    NotFound(String),
    #[error("Dataset {name:?} request failed with status {status}")]
    Status { name: String, status: u16 },
    #[error("Dataset {name:?} could not be read: {message}")]
    Io { name: String, message: String },
    /// Failure already described by the fetcher, e.g. from the browser.
    #[error("{0}")]
    Other(String),
}

/// Name of a dataset, restricted to characters safe in paths and query strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetRef {
    name: String,
}

impl DatasetRef {
    /// Query key used in shareable location references.
    pub const QUERY_KEY: &'static str = "dataset";

    /// Validate a dataset name: `[A-Za-z0-9._-]+`, not starting with `.`.
    pub fn new(name: impl Into<String>) -> Result<Self, FetchError> {
        let name = name.into();
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(FetchError::InvalidName(name));
        }
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `dataset=<name>`, for embedding in a location.
    pub fn to_query(&self) -> String {
        format!("{}={}", Self::QUERY_KEY, self.name)
    }

    /// Find the dataset entry in a query string (leading `?` allowed).
    ///
    /// Returns `None` when absent or invalid.
    pub fn from_query(query: &str) -> Option<Self> {
        query
            .trim_start_matches('?')
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == Self::QUERY_KEY)
            .and_then(|(_, value)| Self::new(value).ok())
    }
}

impl std::fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Something that can produce raw dataset text by name.
pub trait DatasetSource {
    fn fetch(&self, dataset: &DatasetRef) -> Result<String, FetchError>;
}

/// In-memory datasets, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    datasets: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.datasets.insert(name.into(), text.into());
    }
}

impl DatasetSource for MemorySource {
    fn fetch(&self, dataset: &DatasetRef) -> Result<String, FetchError> {
        self.datasets
            .get(dataset.name())
            .cloned()
            .ok_or_else(|| FetchError::NotFound(dataset.name().to_string()))
    }
}

/// Datasets stored as files in one directory.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl DirectorySource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path_of(&self, dataset: &DatasetRef) -> PathBuf {
        self.root.join(dataset.name())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl DatasetSource for DirectorySource {
    fn fetch(&self, dataset: &DatasetRef) -> Result<String, FetchError> {
        let path = self.path_of(dataset);
        log::debug!("Reading dataset from {}", path.display());
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FetchError::NotFound(dataset.name().to_string()),
            _ => FetchError::Io {
                name: dataset.name().to_string(),
                message: e.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_dataset_names() {
        assert!(DatasetRef::new("drosophila.csv").is_ok());
        assert!(DatasetRef::new("zebrafish_v2-final.csv").is_ok());
        for bad in ["", "../secret", "a/b.csv", ".hidden", "a b.csv", "x?y"] {
            assert_eq!(
                DatasetRef::new(bad),
                Err(FetchError::InvalidName(bad.to_string()))
            );
        }
    }

    #[test]
    fn test_query_roundtrip() {
        let dataset = DatasetRef::new("mouse.csv").unwrap();
        assert_eq!(dataset.to_query(), "dataset=mouse.csv");
        assert_eq!(DatasetRef::from_query(&dataset.to_query()), Some(dataset));
    }

    #[test]
    fn test_from_query() {
        assert_eq!(
            DatasetRef::from_query("?view=full&dataset=a.csv").map(|d| d.to_string()),
            Some("a.csv".to_string())
        );
        assert_eq!(DatasetRef::from_query("?view=full"), None);
        assert_eq!(DatasetRef::from_query("dataset=../etc/passwd"), None);
        assert_eq!(DatasetRef::from_query(""), None);
    }

    #[test]
    fn test_memory_source() {
        let mut source = MemorySource::new();
        source.insert("a.csv", "1\n0,0,0\n");
        let a = DatasetRef::new("a.csv").unwrap();
        let b = DatasetRef::new("b.csv").unwrap();
        assert_eq!(source.fetch(&a).unwrap(), "1\n0,0,0\n");
        assert_eq!(source.fetch(&b), Err(FetchError::NotFound("b.csv".to_string())));
    }

    #[test]
    fn test_other_error_passes_message_through() {
        let message = "Dataset \"a.csv\" request failed with status 404";
        assert_eq!(FetchError::Other(message.to_string()).to_string(), message);
        assert_eq!(
            crate::Error::from(FetchError::Other(message.to_string())).to_string(),
            format!("Could not fetch dataset: {message}")
        );
    }

    #[test]
    fn test_directory_source() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("cells.csv"), "1\n1,2,3\n").unwrap();

        let source = DirectorySource::new(dir.path());
        let cells = DatasetRef::new("cells.csv").unwrap();
        assert_eq!(source.fetch(&cells).unwrap(), "1\n1,2,3\n");

        let missing = DatasetRef::new("missing.csv").unwrap();
        assert_eq!(
            source.fetch(&missing),
            Err(FetchError::NotFound("missing.csv".to_string()))
        );
    }
}
