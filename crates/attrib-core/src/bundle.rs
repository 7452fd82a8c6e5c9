//! Bundled-license extraction from artifact archives.
//!
//! Artifacts from the bundling groups may embed a license index
//! ([`INDEX_ENTRY`], mapping license keys to byte ranges) together with a
//! companion text document ([`TEXT_ENTRY`]) holding the concatenated
//! license texts. The index is produced by an upstream packaging tool and
//! treated as opaque input here.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

/// Archive entry holding the bundled license index.
pub const INDEX_ENTRY: &str = "third_party_licenses.json";
/// Archive entry holding the concatenated bundled license texts.
pub const TEXT_ENTRY: &str = "third_party_licenses.txt";

/// Byte range of one bundled license inside the text entry.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BundledRange {
    /// Offset of the first byte within the text document.
    pub start: u64,
    /// Length in bytes; zero or negative means "the rest of the document".
    pub length: i64,
}

/// Failure reading bundled license data out of an artifact archive.
///
/// All variants are fatal for the run: artifacts are local,
/// already-resolved inputs, so a read failure is unrecoverable rather
/// than retryable.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The artifact could not be opened as an archive.
    #[error("Failed to open artifact archive {path}: {source}")]
    OpenArchive {
        /// Artifact path as supplied by the dependency record.
        path: String,
        /// Underlying archive error.
        #[source]
        source: zip::result::ZipError,
    },

    /// The license-index entry could not be read out of the archive.
    #[error("Failed to read bundled license index in {path}: {source}")]
    ReadIndex {
        /// Artifact path as supplied by the dependency record.
        path: String,
        /// Underlying read error.
        #[source]
        source: io::Error,
    },

    /// The license-index entry is not a valid index document.
    #[error("Malformed bundled license index in {path}: {source}")]
    MalformedIndex {
        /// Artifact path as supplied by the dependency record.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A license text slice could not be read out of the text entry.
    #[error("Failed to read license text for `{key}` in {path}: {source}")]
    ReadLicenseText {
        /// Bundled license key whose extraction failed.
        key: String,
        /// Artifact path as supplied by the dependency record.
        path: String,
        /// Underlying read error.
        #[source]
        source: io::Error,
    },
}

/// Extract bundled licenses from `artifact`, skipping keys already
/// present in `already_bundled`.
///
/// Returns raw `(key, content)` pairs in index order. An artifact missing
/// either license entry, or whose index parses to an empty or null
/// document, contributes nothing -- it simply carries no bundled
/// licenses.
///
/// # Errors
///
/// Any archive or read failure past entry lookup is a [`BundleError`] and
/// aborts the run.
pub fn bundled_licenses(
    artifact: &Path,
    already_bundled: &HashSet<String>,
) -> Result<Vec<(String, Vec<u8>)>, BundleError> {
    let display_path = artifact.display().to_string();

    let file = File::open(artifact).map_err(|e| BundleError::OpenArchive {
        path: display_path.clone(),
        source: e.into(),
    })?;
    let mut archive = ZipArchive::new(file).map_err(|e| BundleError::OpenArchive {
        path: display_path.clone(),
        source: e,
    })?;

    let has_index = archive.file_names().any(|n| n == INDEX_ENTRY);
    let has_text = archive.file_names().any(|n| n == TEXT_ENTRY);
    if !has_index || !has_text {
        debug!("{}: no bundled license entries", display_path);
        return Ok(Vec::new());
    }

    let mut raw = String::new();
    archive
        .by_name(INDEX_ENTRY)
        .map_err(io::Error::other)
        .and_then(|mut entry| entry.read_to_string(&mut raw).map(|_| ()))
        .map_err(|e| BundleError::ReadIndex {
            path: display_path.clone(),
            source: e,
        })?;

    // Sorted map, so identical inputs always slice in the same order
    let index: Option<BTreeMap<String, BundledRange>> =
        serde_json::from_str(&raw).map_err(|e| BundleError::MalformedIndex {
            path: display_path.clone(),
            source: e,
        })?;
    let Some(index) = index else {
        debug!("{}: null bundled license index", display_path);
        return Ok(Vec::new());
    };
    if index.is_empty() {
        debug!("{}: empty bundled license index", display_path);
        return Ok(Vec::new());
    }

    let mut licenses = Vec::with_capacity(index.len());
    for (key, range) in index {
        if already_bundled.contains(&key) {
            debug!("{}: `{key}` already bundled by an earlier artifact", display_path);
            continue;
        }
        let mut entry = archive.by_name(TEXT_ENTRY).map_err(|e| BundleError::ReadLicenseText {
            key: key.clone(),
            path: display_path.clone(),
            source: io::Error::other(e),
        })?;
        let content =
            read_range(&mut entry, range).map_err(|e| BundleError::ReadLicenseText {
                key: key.clone(),
                path: display_path.clone(),
                source: e,
            })?;
        licenses.push((key, content));
    }
    Ok(licenses)
}

/// Slice `range` out of a sequential reader.
///
/// The skip is driven through `io::copy` over a bounded `Take`, which
/// loops until the full amount is consumed or the stream ends -- a single
/// read is never assumed to honor the whole request. A start past
/// end-of-stream yields empty content; a non-positive length reads the
/// remainder of the stream.
fn read_range<R: Read>(reader: &mut R, range: BundledRange) -> io::Result<Vec<u8>> {
    let skipped = io::copy(&mut (&mut *reader).take(range.start), &mut io::sink())?;
    if skipped < range.start {
        return Ok(Vec::new());
    }
    let mut content = Vec::new();
    if range.length <= 0 {
        reader.read_to_end(&mut content)?;
    } else {
        (&mut *reader).take(range.length as u64).read_to_end(&mut content)?;
    }
    Ok(content)
}
