//! Files on disk: wheel and target documents, saved results, text outputs.
//!
//! Structured files are YAML when their extension is `.yaml`/`.yml` and JSON
//! otherwise.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use upwheel_engine::{Document, DocumentLoader, ResultsStorage, SavedResults, strip_bom};

/// Serialization picked from a file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|v| v.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Self::Yaml,
            _ => Self::Json,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("JSON"),
            Self::Yaml => f.write_str("YAML"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yml::Error),
}

#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not valid {format}", .path.display())]
    Parse {
        path: PathBuf,
        format: Format,
        #[source]
        source: CodecError,
    },
    #[error("failed to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode {} as {format}", .path.display())]
    Encode {
        path: PathBuf,
        format: Format,
        #[source]
        source: CodecError,
    },
    #[error("{} already exists and overwriting is disabled", .path.display())]
    Exists { path: PathBuf },
}

fn decode<T: DeserializeOwned>(format: Format, raw: &str) -> Result<T, CodecError> {
    Ok(match format {
        Format::Json => serde_json::from_str(raw)?,
        Format::Yaml => serde_yml::from_str(raw)?,
    })
}

fn encode<T: Serialize>(format: Format, value: &T) -> Result<String, CodecError> {
    let mut encoded = match format {
        Format::Json => serde_json::to_string_pretty(value)?,
        Format::Yaml => serde_yml::to_string(value)?,
    };
    if !encoded.ends_with('\n') {
        encoded.push('\n');
    }
    Ok(encoded)
}

/// Parse a JSON or YAML file, tolerating a leading byte order mark.
///
/// # Errors
///
/// Returns [`FileError::Read`] or [`FileError::Parse`].
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, FileError> {
    let raw = fs::read_to_string(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let format = Format::from_path(path);
    decode(format, strip_bom(&raw)).map_err(|source| FileError::Parse {
        path: path.to_path_buf(),
        format,
        source,
    })
}

/// Write `contents` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`FileError::Exists`] when `overwrite` is false and the file is
/// already there, or [`FileError::Write`].
pub fn write_text(path: &Path, contents: &str, overwrite: bool) -> Result<(), FileError> {
    if !overwrite && path.exists() {
        return Err(FileError::Exists {
            path: path.to_path_buf(),
        });
    }
    let write_err = |source| FileError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, contents).map_err(write_err)?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

/// Encode `value` in the format named by `path`, keeping its key order.
///
/// # Errors
///
/// Returns [`FileError::Encode`], or see [`write_text`].
pub fn write_document<T: Serialize>(
    path: &Path,
    value: &T,
    overwrite: bool,
) -> Result<(), FileError> {
    let format = Format::from_path(path);
    let encoded = encode(format, value).map_err(|source| FileError::Encode {
        path: path.to_path_buf(),
        format,
        source,
    })?;
    write_text(path, &encoded, overwrite)
}

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Output name for an upgraded copy of `source`.
pub fn prefixed_file_name(prefix: &str, source: &Path) -> String {
    let name = source
        .file_name()
        .map_or_else(|| source.display().to_string(), |n| n.to_string_lossy().into_owned());
    format!("{prefix}{name}")
}

/// Reads the wheel document from a JSON or YAML file.
#[derive(Debug, Clone)]
pub struct FileWheelLoader {
    path: PathBuf,
}

impl FileWheelLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentLoader for FileWheelLoader {
    type Error = FileError;

    fn load_wheel_document(&self) -> Result<Document, Self::Error> {
        read_document(&self.path)
    }
}

/// Saved results kept as files in one directory, named by file name.
#[derive(Debug, Clone)]
pub struct FileResultsStorage {
    dir: PathBuf,
    overwrite: bool,
}

impl FileResultsStorage {
    pub fn new(dir: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            dir: dir.into(),
            overwrite,
        }
    }

    /// Storage and name addressing an existing results file.
    pub fn for_file(path: &Path) -> (Self, String) {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        (Self::new(dir, false), name)
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl ResultsStorage for FileResultsStorage {
    type Error = FileError;

    fn save_results(&self, name: &str, results: &SavedResults) -> Result<(), Self::Error> {
        write_document(&self.path_for(name), results, self.overwrite)
    }

    fn load_results(&self, name: &str) -> Result<Option<SavedResults>, Self::Error> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        read_document(&path).map(Some)
    }

    fn delete_results(&self, name: &str) -> Result<(), Self::Error> {
        let path = self.path_for(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(FileError::Write { path, source }),
        }
    }
}
