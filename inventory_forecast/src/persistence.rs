//! Saving and loading trained forecast models
//!
//! One artifact per product, named `forecast_model_{product}.fmodel` or
//! `forecast_model_{product}.fmodel.gz`. The file holds a bincode-encoded
//! [`ForecastArtifact`], gzip-compressed when requested.

use crate::batch::ForecastBatch;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Current artifact format version
pub const FORECAST_ARTIFACT_VERSION: u32 = 1;
/// Prefix of per-product artifact names
pub const FORECAST_MODEL_PREFIX: &str = "forecast_model";
pub const FORECAST_MODEL_EXTENSION: &str = "fmodel";
pub const COMPRESSED_FORECAST_MODEL_EXTENSION: &str = "fmodel.gz";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const COMPRESSION_LEVEL: u32 = 3;

/// On-disk envelope around one product's trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastArtifact<T> {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub product_id: String,
    pub model: T,
}

/// Artifact path of `product_id` inside `dir`
///
/// Characters other than ASCII letters, digits, `-` and `_` become `_`.
pub fn forecast_model_path<P: AsRef<Path>>(dir: P, product_id: &str, compress: bool) -> PathBuf {
    let safe: String = product_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let extension = if compress {
        COMPRESSED_FORECAST_MODEL_EXTENSION
    } else {
        FORECAST_MODEL_EXTENSION
    };
    dir.as_ref()
        .join(format!("{}_{}.{}", FORECAST_MODEL_PREFIX, safe, extension))
}

/// Write one product's model to `path`, replacing any model extension
pub fn save_forecast_model<T: Serialize, P: AsRef<Path>>(
    model: &T,
    product_id: &str,
    path: P,
    compress: bool,
) -> Result<PathBuf> {
    let target = with_extension(&strip_extension(path.as_ref()), compress);
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let artifact = ForecastArtifact {
        version: FORECAST_ARTIFACT_VERSION,
        created_at: Utc::now(),
        product_id: product_id.to_string(),
        model,
    };
    let encoded =
        bincode::serialize(&artifact).map_err(|e| ForecastError::Persistence(e.to_string()))?;
    let bytes = if compress {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(COMPRESSION_LEVEL));
        encoder.write_all(&encoded)?;
        encoder.finish()?
    } else {
        encoded
    };

    fs::write(&target, &bytes)?;
    debug!(product = product_id, path = %target.display(), "Saved forecast model");
    Ok(target)
}

/// Read a model written by [`save_forecast_model`]
pub fn load_forecast_model<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    Ok(load_forecast_artifact(path)?.model)
}

/// Like [`load_forecast_model`] but keeps the envelope
///
/// When `path` does not exist, its `.fmodel` and `.fmodel.gz` variants are
/// tried in turn.
pub fn load_forecast_artifact<T: DeserializeOwned, P: AsRef<Path>>(
    path: P,
) -> Result<ForecastArtifact<T>> {
    let source = resolve_existing(path.as_ref())?;
    let bytes = fs::read(&source)?;

    let decoded = if bytes.starts_with(&GZIP_MAGIC) {
        let mut out = Vec::new();
        GzDecoder::new(&bytes[..])
            .read_to_end(&mut out)
            .map_err(|e| ForecastError::Persistence(format!("Corrupt compressed model: {}", e)))?;
        out
    } else {
        bytes
    };

    let artifact: ForecastArtifact<T> =
        bincode::deserialize(&decoded).map_err(|e| ForecastError::Persistence(e.to_string()))?;
    if artifact.version > FORECAST_ARTIFACT_VERSION {
        return Err(ForecastError::UnsupportedVersion {
            found: artifact.version,
            max_supported: FORECAST_ARTIFACT_VERSION,
        });
    }
    Ok(artifact)
}

/// Save every model of `batch` into `dir`, keyed by product
pub fn save_models_by_product<T: Serialize, P: AsRef<Path>>(
    batch: &ForecastBatch<T>,
    dir: P,
    compress: bool,
) -> Result<BTreeMap<String, PathBuf>> {
    let dir = dir.as_ref();
    let mut paths = BTreeMap::new();
    for (product_id, model) in &batch.models {
        let path = save_forecast_model(
            model,
            product_id,
            forecast_model_path(dir, product_id, compress),
            compress,
        )?;
        paths.insert(product_id.clone(), path);
    }
    info!(
        dir = %dir.display(),
        models = paths.len(),
        compressed = compress,
        "Saved forecast models"
    );
    Ok(paths)
}

/// Load the saved model of each product in `product_ids` from `dir`
///
/// Fails with `NotFound` on the first product without an artifact.
pub fn load_models_by_product<T: DeserializeOwned, P: AsRef<Path>, S: AsRef<str>>(
    dir: P,
    product_ids: &[S],
) -> Result<BTreeMap<String, T>> {
    let dir = dir.as_ref();
    product_ids
        .iter()
        .map(|id| {
            let id = id.as_ref();
            let model = load_forecast_model(forecast_model_path(dir, id, false))?;
            Ok((id.to_string(), model))
        })
        .collect()
}

fn strip_extension(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    for suffix in [".fmodel.gz", ".fmodel", ".gz"] {
        if let Some(stripped) = raw.strip_suffix(suffix) {
            return PathBuf::from(stripped);
        }
    }
    path.to_path_buf()
}

fn with_extension(stem: &Path, compress: bool) -> PathBuf {
    let extension = if compress {
        COMPRESSED_FORECAST_MODEL_EXTENSION
    } else {
        FORECAST_MODEL_EXTENSION
    };
    PathBuf::from(format!("{}.{}", stem.to_string_lossy(), extension))
}

fn resolve_existing(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    let stem = strip_extension(path);
    for candidate in [with_extension(&stem, false), with_extension(&stem, true)] {
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(ForecastError::NotFound(format!(
        "No forecast model at {} or its .{} / .{} variants",
        path.display(),
        FORECAST_MODEL_EXTENSION,
        COMPRESSED_FORECAST_MODEL_EXTENSION
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_ids_become_safe_file_names() {
        assert_eq!(
            forecast_model_path("models", "SKU-01", true),
            PathBuf::from("models/forecast_model_SKU-01.fmodel.gz")
        );
        assert_eq!(
            forecast_model_path("models", "a/b c", false),
            PathBuf::from("models/forecast_model_a_b_c.fmodel")
        );
    }
}
