//! Saving and loading trained anomaly models
//!
//! Artifacts are a bincode-encoded [`ModelArtifact`] envelope, optionally
//! gzip-compressed. Files are named `{stem}.iforest` or `{stem}.iforest.gz`.

use crate::engine::AnomalyModel;
use crate::error::{AnomalyError, Result};
use chrono::{DateTime, Utc};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Current artifact format version
pub const MODEL_ARTIFACT_VERSION: u32 = 1;
/// File stem used when the caller gives a directory
pub const DEFAULT_MODEL_STEM: &str = "isolation_forest_model";
/// Extension of uncompressed artifacts
pub const MODEL_EXTENSION: &str = "iforest";
/// Extension of compressed artifacts
pub const COMPRESSED_MODEL_EXTENSION: &str = "iforest.gz";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const COMPRESSION_LEVEL: u32 = 3;

/// On-disk envelope around a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub model: AnomalyModel,
}

impl ModelArtifact {
    pub fn new(model: AnomalyModel) -> Self {
        Self {
            version: MODEL_ARTIFACT_VERSION,
            created_at: Utc::now(),
            model,
        }
    }
}

/// Path with the artifact extension matching `compress`
///
/// A path ending in a separator or naming an existing directory gets the
/// default stem appended. Any `.iforest`/`.iforest.gz` suffix is replaced.
pub fn artifact_path<P: AsRef<Path>>(path: P, compress: bool) -> PathBuf {
    let path = path.as_ref();
    let raw = path.to_string_lossy();
    let base = if path.is_dir() || raw.ends_with('/') || raw.ends_with(std::path::MAIN_SEPARATOR) {
        path.join(DEFAULT_MODEL_STEM)
    } else {
        path.to_path_buf()
    };

    let stem = strip_model_extension(&base);
    let extension = if compress {
        COMPRESSED_MODEL_EXTENSION
    } else {
        MODEL_EXTENSION
    };
    PathBuf::from(format!("{}.{}", stem.to_string_lossy(), extension))
}

fn strip_model_extension(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    for suffix in [".iforest.gz", ".iforest", ".gz"] {
        if let Some(stripped) = raw.strip_suffix(suffix) {
            return PathBuf::from(stripped);
        }
    }
    path.to_path_buf()
}

/// Write `model` and return the final artifact path
pub fn save_model<P: AsRef<Path>>(model: &AnomalyModel, path: P, compress: bool) -> Result<PathBuf> {
    let target = artifact_path(path, compress);
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let artifact = ModelArtifact::new(model.clone());
    let encoded =
        bincode::serialize(&artifact).map_err(|e| AnomalyError::Persistence(e.to_string()))?;

    let bytes = if compress {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(COMPRESSION_LEVEL));
        encoder.write_all(&encoded)?;
        encoder.finish()?
    } else {
        encoded
    };

    fs::write(&target, &bytes)?;
    info!(
        path = %target.display(),
        bytes = bytes.len(),
        compressed = compress,
        "Saved anomaly model"
    );
    Ok(target)
}

/// Read a model written by [`save_model`]
///
/// When `path` does not exist, the `.iforest` and `.iforest.gz` variants of
/// it are tried in turn. Compression is detected from the file contents.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<AnomalyModel> {
    Ok(load_artifact(path)?.model)
}

/// Like [`load_model`] but keeps the envelope
pub fn load_artifact<P: AsRef<Path>>(path: P) -> Result<ModelArtifact> {
    let source = resolve_existing(path.as_ref())?;
    let bytes = fs::read(&source)?;

    let decoded = if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoder = GzDecoder::new(&bytes[..]);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| AnomalyError::Persistence(format!("Corrupt compressed model: {}", e)))?;
        out
    } else {
        bytes
    };

    let artifact: ModelArtifact =
        bincode::deserialize(&decoded).map_err(|e| AnomalyError::Persistence(e.to_string()))?;
    if artifact.version > MODEL_ARTIFACT_VERSION {
        return Err(AnomalyError::UnsupportedVersion {
            found: artifact.version,
            max_supported: MODEL_ARTIFACT_VERSION,
        });
    }

    debug!(
        path = %source.display(),
        version = artifact.version,
        created_at = %artifact.created_at,
        "Loaded anomaly model"
    );
    Ok(artifact)
}

fn resolve_existing(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    for candidate in [artifact_path(path, false), artifact_path(path, true)] {
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(AnomalyError::NotFound(format!(
        "No model at {} or its .{} / .{} variants",
        path.display(),
        MODEL_EXTENSION,
        COMPRESSED_MODEL_EXTENSION
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_artifact_path_normalisation() {
        assert_eq!(
            artifact_path("models/forest", true),
            PathBuf::from("models/forest.iforest.gz")
        );
        assert_eq!(
            artifact_path("models/forest.iforest.gz", false),
            PathBuf::from("models/forest.iforest")
        );
        assert_eq!(
            artifact_path("models/", false),
            PathBuf::from("models/isolation_forest_model.iforest")
        );
    }
}
