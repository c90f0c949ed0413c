//! # Artifact Output
//!
//! Every artifact is pretty-printed JSON written to a temporary file in
//! the output directory and renamed into place, so a run that dies midway
//! leaves the previous artifacts intact. The run manifest is written last
//! and records each artifact's SHA-256 over its canonical JSON bytes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use privcheck_core::{sha256_digest, CanonicalBytes, Timestamp};

/// File name of the manifest.
pub const MANIFEST_FILE: &str = "run_manifest.json";

/// One written artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactEntry {
    /// File name within the output directory.
    pub file: String,
    /// `sha256:<hex>` of the canonical JSON.
    pub digest: String,
    /// Records in the artifact.
    pub records: u64,
}

/// Summary of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunManifest {
    pub tool_version: &'static str,
    pub as_of: Timestamp,
    pub taxonomy_version: Option<String>,
    pub rules: Vec<&'static str>,
    pub artifacts: BTreeMap<String, ArtifactEntry>,
}

/// Writes artifacts into one directory.
#[derive(Debug)]
pub struct ArtifactWriter {
    dir: PathBuf,
    written: BTreeMap<String, ArtifactEntry>,
}

impl ArtifactWriter {
    /// Create the directory if needed.
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory: {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: BTreeMap::new(),
        })
    }

    /// Write one artifact and remember its digest.
    pub fn write<T: Serialize>(&mut self, file: &str, value: &T, records: usize) -> Result<()> {
        let canonical =
            CanonicalBytes::new(value).with_context(|| format!("failed to canonicalize {file}"))?;
        let digest = sha256_digest(&canonical);
        let mut pretty =
            serde_json::to_vec_pretty(value).with_context(|| format!("failed to serialize {file}"))?;
        pretty.push(b'\n');
        write_atomic(&self.dir.join(file), &pretty)?;
        tracing::info!(file, records, digest = %digest, "wrote artifact");
        self.written.insert(
            file.to_string(),
            ArtifactEntry {
                file: file.to_string(),
                digest: digest.to_string(),
                records: records as u64,
            },
        );
        Ok(())
    }

    /// Artifacts written so far.
    pub fn written(&self) -> &BTreeMap<String, ArtifactEntry> {
        &self.written
    }

    /// Write the manifest covering every artifact written so far.
    pub fn finish(self, as_of: Timestamp, taxonomy_version: Option<String>, rules: Vec<&'static str>) -> Result<RunManifest> {
        let manifest = RunManifest {
            tool_version: env!("CARGO_PKG_VERSION"),
            as_of,
            taxonomy_version,
            rules,
            artifacts: self.written,
        };
        let mut bytes = serde_json::to_vec_pretty(&manifest).context("failed to serialize run manifest")?;
        bytes.push(b'\n');
        write_atomic(&self.dir.join(MANIFEST_FILE), &bytes)?;
        Ok(manifest)
    }
}

/// Write `bytes` to a sibling temp file, then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let name = path
        .file_name()
        .with_context(|| format!("not a file path: {}", path.display()))?
        .to_string_lossy();
    let tmp = path.with_file_name(format!(".{name}.tmp"));
    std::fs::write(&tmp, bytes).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move {} into place", path.display()))?;
    Ok(())
}
