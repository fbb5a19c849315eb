//! Filesystem artifact store.
//!
//! Reads `<model_dir>/<disease>.json` and, when a manifest is present or
//! required, checks the file against the SHA-256 digest recorded in
//! `manifest.json`. If a verifying key is configured, the manifest itself must
//! carry a valid Ed25519 signature in `manifest.sig`.
//!
//! # Key Rotation
//!
//! 1. Generate a new key: `cargo run --bin sign_artifacts -- --keygen`
//! 2. Point `MEDIPREDICT_ARTIFACT_PUBKEY_B64_FILE` at the new public key
//! 3. Re-sign the model directory with the new private key

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{Disease, PipelineArtifact};
use crate::ports::{ArtifactError, ArtifactStore};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "manifest.sig";

/// Manifest format version written by `sign_artifacts`.
pub const MANIFEST_VERSION: u32 = 1;

/// Signed list of artifact digests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    /// Monotonic build number of the artifact set.
    pub serial: u64,
    /// Unix timestamp (seconds) of signing.
    pub created_at: i64,
    /// File name → lowercase hex SHA-256.
    pub files: BTreeMap<String, String>,
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Decode a base64 Ed25519 public key.
///
/// # Errors
/// Returns [`ArtifactError::Signature`] for bad base64 or a wrong key length.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ArtifactError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|_| ArtifactError::Signature("invalid public key base64".into()))?;
    let key: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| ArtifactError::Signature("public key must be 32 bytes".into()))?;
    VerifyingKey::from_bytes(&key)
        .map_err(|_| ArtifactError::Signature("invalid verifying key".into()))
}

// Compare hex digests without early exit.
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Artifact store over a local model directory.
///
/// The manifest is read and authenticated once; every artifact is checked
/// against that same copy.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
    verifying_key: Option<VerifyingKey>,
    require_manifest: bool,
    manifest: OnceLock<Option<ArtifactManifest>>,
}

impl FsArtifactStore {
    /// Store without mandatory integrity checks. A manifest, if present, is
    /// still enforced.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            verifying_key: None,
            require_manifest: false,
            manifest: OnceLock::new(),
        }
    }

    /// Require a manifest signed by `key`.
    #[must_use]
    pub fn with_verifying_key(mut self, key: VerifyingKey) -> Self {
        self.verifying_key = Some(key);
        self.require_manifest = true;
        self
    }

    /// Require a manifest even without a signing key.
    #[must_use]
    pub fn require_manifest(mut self, require: bool) -> Self {
        self.require_manifest = self.require_manifest || require;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Authenticated manifest, read on first use. Failures are not cached.
    fn manifest(&self) -> Result<Option<&ArtifactManifest>, ArtifactError> {
        if let Some(cached) = self.manifest.get() {
            return Ok(cached.as_ref());
        }
        let loaded = self.load_manifest()?;
        Ok(self.manifest.get_or_init(|| loaded).as_ref())
    }

    /// Read and authenticate the manifest, if one applies.
    fn load_manifest(&self) -> Result<Option<ArtifactManifest>, ArtifactError> {
        let manifest_path = self.dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            if self.require_manifest {
                return Err(ArtifactError::Manifest(format!(
                    "{MANIFEST_FILE} is required but missing in {:?}",
                    self.dir
                )));
            }
            return Ok(None);
        }

        let content = fs::read(&manifest_path)?;

        if let Some(key) = &self.verifying_key {
            let sig_bytes = fs::read(self.dir.join(SIGNATURE_FILE)).map_err(|e| {
                ArtifactError::Signature(format!("cannot read {SIGNATURE_FILE}: {e}"))
            })?;
            let sig: [u8; 64] = sig_bytes
                .as_slice()
                .try_into()
                .map_err(|_| ArtifactError::Signature("signature must be 64 bytes".into()))?;
            key.verify(&content, &Signature::from_bytes(&sig))
                .map_err(|_| ArtifactError::Signature("manifest signature is invalid".into()))?;
        }

        let manifest: ArtifactManifest = serde_json::from_slice(&content)
            .map_err(|e| ArtifactError::Manifest(format!("invalid {MANIFEST_FILE}: {e}")))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ArtifactError::Manifest(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }
        Ok(Some(manifest))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn load(&self, disease: Disease) -> Result<PipelineArtifact, ArtifactError> {
        let file = disease.artifact_file();
        let path = self.dir.join(&file);
        if !path.exists() {
            return Err(ArtifactError::Missing(path.display().to_string()));
        }

        let manifest = self.manifest()?;
        let bytes = fs::read(&path)?;

        if let Some(manifest) = manifest {
            let expected = manifest.files.get(&file).ok_or_else(|| {
                ArtifactError::Manifest(format!("{file} is not listed in {MANIFEST_FILE}"))
            })?;
            if !constant_time_eq_str(&sha256_hex(&bytes), &expected.to_ascii_lowercase()) {
                return Err(ArtifactError::Integrity(file));
            }
            tracing::debug!(
                "Verified {} against manifest serial {}",
                file,
                manifest.serial
            );
        }

        let artifact: PipelineArtifact = serde_json::from_slice(&bytes)?;
        tracing::info!(
            "Read {} artifact from {:?} (model_version={}, format_version={})",
            disease,
            path,
            artifact.model_version,
            artifact.format_version
        );
        Ok(artifact)
    }
}
