//! Resolved-dependency records and aggregation-role classification.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Dependency groups whose artifacts may bundle transitive third-party
/// license data. Matched case-insensitively.
const BUNDLING_GROUPS: &[&str] = &["com.google.android.gms", "com.google.firebase"];

/// First major version at which bundling-group artifacts embed their own
/// license data instead of relying on a companion `-license` artifact.
const GRANULAR_BASE_VERSION: u64 = 14;

/// Name suffix marking a companion artifact that carries bundled license
/// data for a pre-granular version line.
const LICENSE_ARTIFACT_SUFFIX: &str = "-license";

/// One resolved library from the project's dependency graph.
///
/// Produced wholesale by an upstream resolution step; the engine never
/// mutates these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedDependency {
    /// Group identifier (e.g. `com.squareup.okhttp3`).
    pub group: String,
    /// Artifact name within the group.
    pub name: String,
    /// Resolved version string.
    pub version: String,
    /// Path to the resolved artifact file on the local filesystem.
    pub artifact: PathBuf,
}

impl ResolvedDependency {
    /// `group:name` coordinates, the base form of every license key.
    pub fn coordinates(&self) -> String {
        format!("{}:{}", self.group, self.name)
    }
}

/// Load a resolved dependency list from a JSON array document.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a JSON array of
/// dependency records.
pub fn load_dependency_list(path: &Path) -> Result<Vec<ResolvedDependency>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dependency list {}", path.display()))?;
    let deps: Vec<ResolvedDependency> =
        serde_json::from_str(&content).context("Failed to parse dependency list JSON")?;
    Ok(deps)
}

/// How a dependency participates in license aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// Licenses come from the package metadata document only.
    Ordinary,
    /// Member of a bundling group. Package metadata is always consulted;
    /// granular versions additionally embed their own bundled data.
    Primary {
        /// Whether the artifact embeds its own bundled license data.
        granular: bool,
    },
    /// Companion `-license` artifact carrying the bundled data for a
    /// pre-granular sibling. Contributes bundled licenses only.
    LicenseCarrier,
}

/// Failure to classify a dependency.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// The leading dotted version component was absent or non-numeric.
    #[error("Unparseable leading version component in `{version}` for {coordinates}")]
    BadVersion {
        /// `group:name` of the offending dependency.
        coordinates: String,
        /// The version string that failed to parse.
        version: String,
    },
}

/// Classify a dependency once, ahead of dispatch.
///
/// The version is only inspected for bundling-group members that are not
/// `-license` carriers; everything else classifies without parsing it.
///
/// # Errors
///
/// Returns [`ClassifyError::BadVersion`] when granularity must be decided
/// but the leading dotted version component does not parse as an integer.
pub fn classify(dep: &ResolvedDependency) -> Result<DependencyKind, ClassifyError> {
    let bundling = BUNDLING_GROUPS
        .iter()
        .any(|g| g.eq_ignore_ascii_case(&dep.group));
    if !bundling {
        return Ok(DependencyKind::Ordinary);
    }
    if dep.name.ends_with(LICENSE_ARTIFACT_SUFFIX) {
        return Ok(DependencyKind::LicenseCarrier);
    }
    let leading = dep.version.split('.').next().unwrap_or("");
    let major: u64 = leading.parse().map_err(|_| ClassifyError::BadVersion {
        coordinates: dep.coordinates(),
        version: dep.version.clone(),
    })?;
    Ok(DependencyKind::Primary {
        granular: major >= GRANULAR_BASE_VERSION,
    })
}
