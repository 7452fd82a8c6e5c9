//! Package-metadata documents and declared-license extraction.
//!
//! A metadata document declares zero or more licenses as `[[licenses]]`
//! tables. The engine stores the declared *reference* (a URL string, or
//! inline text) as the license content; it never fetches the document the
//! reference points at.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::types::ResolvedDependency;

/// Package-metadata document for one dependency.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageMetadata {
    /// Licenses declared by the package, in declaration order.
    #[serde(default)]
    pub licenses: Vec<LicenseDecl>,
}

/// One declared license.
#[derive(Debug, Clone, Deserialize)]
pub struct LicenseDecl {
    /// Display name (e.g. `The Apache Software License, Version 2.0`).
    pub name: String,
    /// Reference URL of the license text.
    pub url: Option<String>,
    /// Inline license text, for packages that declare it directly.
    pub text: Option<String>,
}

impl LicenseDecl {
    /// The declared reference stored as content: the URL when present,
    /// otherwise the inline text.
    fn content(&self) -> Option<&str> {
        self.url.as_deref().or(self.text.as_deref())
    }
}

/// Resolution capability for package-metadata documents.
///
/// Implementations locate and parse the document for a dependency's
/// coordinates; the engine treats `Ok(None)` as "no licenses declared"
/// rather than an error.
pub trait MetadataSource {
    /// Resolve the metadata document for `dep`, or `None` if there is no
    /// document for those coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error only for a malformed resolution result, e.g. a
    /// document that exists but cannot be read or parsed.
    fn lookup(&self, dep: &ResolvedDependency) -> Result<Option<PackageMetadata>>;
}

/// Metadata documents laid out on disk as `<root>/<group>/<name>/<version>.toml`.
#[derive(Debug, Clone)]
pub struct DirMetadataSource {
    root: PathBuf,
}

impl DirMetadataSource {
    /// Source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn document_path(&self, dep: &ResolvedDependency) -> PathBuf {
        self.root
            .join(&dep.group)
            .join(&dep.name)
            .join(format!("{}.toml", dep.version))
    }
}

impl MetadataSource for DirMetadataSource {
    fn lookup(&self, dep: &ResolvedDependency) -> Result<Option<PackageMetadata>> {
        let path = self.document_path(dep);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read metadata document {}", path.display()))?;
        let metadata = toml::from_str(&content)
            .with_context(|| format!("Failed to parse metadata document {}", path.display()))?;
        Ok(Some(metadata))
    }
}

/// Expand a metadata document into `(key, content)` license entries.
///
/// A sole declaration is keyed `group:name`; multiple declarations get one
/// entry each, disambiguated as `group:name <display-name>`. A declaration
/// with neither URL nor inline text is skipped with a warning.
pub fn declared_licenses(
    dep: &ResolvedDependency,
    metadata: &PackageMetadata,
) -> Vec<(String, Vec<u8>)> {
    let coordinates = dep.coordinates();
    let mut entries = Vec::with_capacity(metadata.licenses.len());
    for decl in &metadata.licenses {
        let Some(content) = decl.content() else {
            warn!(
                "{coordinates}: license `{}` declares neither url nor text, skipping",
                decl.name
            );
            continue;
        };
        let key = if metadata.licenses.len() == 1 {
            coordinates.clone()
        } else {
            format!("{coordinates} {}", decl.name)
        };
        entries.push((key, content.as_bytes().to_vec()));
    }
    entries
}
