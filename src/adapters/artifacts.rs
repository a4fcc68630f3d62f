//! Artifact loading: the fitted encoders, scaler and classifier.
//!
//! A model directory holds three JSON exports from the training pipeline:
//!
//! - `fertilizer_model.json`: the classifier
//! - `scaler.json`: per-feature normalization
//! - `label_encoders.json`: Soil, Crop and Fertilizer vocabularies
//!
//! # Integrity
//!
//! An optional `manifest.json` binds the exports by SHA-256:
//!
//! ```json
//! { "version": 1, "created_at": 1760000000, "files": { "scaler.json": "<sha256 hex>", "...": "..." } }
//! ```
//!
//! When the manifest exists every artifact must be listed and match its hash.
//! Loading without one is allowed unless the caller requires it. The
//! `write_manifest` binary produces the manifest.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::CategoricalField;
use crate::ports::{CategoryEncoder, FeatureScaler, RecommendationModel};

use super::classifier::Classifier;
use super::label_encoder::LabelEncoders;
use super::scaler::FittedScaler;

pub const MODEL_FILE: &str = "fertilizer_model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const ENCODERS_FILE: &str = "label_encoders.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Every artifact a model directory must contain.
pub const ARTIFACT_FILES: [&str; 3] = [MODEL_FILE, SCALER_FILE, ENCODERS_FILE];

const MANIFEST_VERSION: u32 = 1;

/// Error type for artifact loading.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid artifact: {0}")]
    Invalid(String),

    #[error("Artifact integrity check failed: {0}")]
    Integrity(String),

    #[error("Artifacts are inconsistent: {0}")]
    Inconsistent(String),
}

/// Read and deserialize a JSON artifact.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let content = fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&content).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// SHA-256 digests of the artifacts in a model directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    #[serde(default)]
    pub created_at: Option<i64>,
    pub files: BTreeMap<String, String>,
}

fn sha256_hex_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn hash_file(path: &Path) -> Result<String, ArtifactError> {
    let bytes = fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(sha256_hex_bytes(&bytes))
}

impl ArtifactManifest {
    /// Hash every artifact in `dir` into a fresh manifest.
    ///
    /// # Errors
    /// Returns `ArtifactError::Io` if an artifact cannot be read.
    pub fn build(dir: &Path) -> Result<Self, ArtifactError> {
        let mut files = BTreeMap::new();
        for name in ARTIFACT_FILES {
            files.insert(name.to_string(), hash_file(&dir.join(name))?);
        }
        Ok(Self {
            version: MANIFEST_VERSION,
            created_at: Some(unix_now()),
            files,
        })
    }

    /// Check this manifest against the artifacts in `dir`.
    ///
    /// # Errors
    /// Returns `ArtifactError::Integrity` on an unsupported version, an
    /// unlisted artifact, or a hash mismatch.
    pub fn verify(&self, dir: &Path) -> Result<(), ArtifactError> {
        if self.version != MANIFEST_VERSION {
            return Err(ArtifactError::Integrity(format!(
                "Unsupported manifest version: {}",
                self.version
            )));
        }

        if let Some(missing) = ARTIFACT_FILES
            .iter()
            .find(|name| !self.files.contains_key(**name))
        {
            return Err(ArtifactError::Integrity(format!(
                "{MANIFEST_FILE} does not list {missing}"
            )));
        }

        for (rel, expected_hex) in &self.files {
            let actual = hash_file(&dir.join(rel))?;
            if !actual.eq_ignore_ascii_case(expected_hex.trim()) {
                return Err(ArtifactError::Integrity(format!(
                    "SHA-256 mismatch for {rel}"
                )));
            }
        }

        Ok(())
    }
}

/// Verify `dir` against its manifest, if it has one.
///
/// Returns the manifest when it exists and matches.
///
/// # Errors
/// Returns `ArtifactError::Integrity` if the manifest is required but absent,
/// or if verification fails.
pub fn verify_manifest(
    dir: &Path,
    require_manifest: bool,
) -> Result<Option<ArtifactManifest>, ArtifactError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        if require_manifest {
            tracing::error!("Artifact manifest not found at {:?}", manifest_path);
            return Err(ArtifactError::Integrity(format!(
                "{MANIFEST_FILE} required but not found in {dir:?}"
            )));
        }
        tracing::warn!(
            "No {} in {:?}; loading artifacts without integrity check",
            MANIFEST_FILE,
            dir
        );
        return Ok(None);
    }

    let manifest: ArtifactManifest = read_json(&manifest_path)?;
    manifest.verify(dir)?;

    tracing::info!("Artifact hashes verified against {:?}", manifest_path);
    Ok(Some(manifest))
}

/// The three fitted artifacts, loaded and cross-checked.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub encoders: LabelEncoders,
    pub scaler: FittedScaler,
    pub model: Classifier,
}

impl ArtifactBundle {
    /// Load all artifacts from a model directory.
    ///
    /// # Errors
    /// Returns error if any artifact is missing, unreadable, invalid, fails the
    /// manifest check, or does not agree with the others.
    pub fn load(dir: &Path, require_manifest: bool) -> Result<Self, ArtifactError> {
        tracing::info!("Loading artifacts from {:?}", dir);

        verify_manifest(dir, require_manifest)?;

        let encoders = LabelEncoders::load(&dir.join(ENCODERS_FILE))?;
        let scaler = FittedScaler::load(&dir.join(SCALER_FILE))?;
        let model = Classifier::load(&dir.join(MODEL_FILE))?;

        Self::from_parts(encoders, scaler, model)
    }

    /// Combine already-built artifacts, checking that they fit together.
    ///
    /// # Errors
    /// Returns `ArtifactError::Inconsistent` if the model's feature count
    /// differs from the scaler's, or its class count from the fertilizer
    /// vocabulary size.
    pub fn from_parts(
        encoders: LabelEncoders,
        scaler: FittedScaler,
        model: Classifier,
    ) -> Result<Self, ArtifactError> {
        let n_scaled = scaler.layout().len();
        if model.n_features() != n_scaled {
            return Err(ArtifactError::Inconsistent(format!(
                "model expects {} features, scaler produces {n_scaled}",
                model.n_features()
            )));
        }

        let n_labels = encoders.classes(CategoricalField::Fertilizer).len();
        if model.n_classes() != n_labels {
            return Err(ArtifactError::Inconsistent(format!(
                "model predicts {} classes, fertilizer encoder has {n_labels}",
                model.n_classes()
            )));
        }

        Ok(Self {
            encoders,
            scaler,
            model,
        })
    }
}
