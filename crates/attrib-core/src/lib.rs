//! attrib-core - license aggregation engine.
//!
//! Turns a resolved dependency list into two artifacts: a concatenated
//! license-text blob and an index mapping each license key to its byte
//! range within the blob. License text is discovered two ways: from a
//! dependency's package-metadata document (the declared URL or inline
//! text), and from license data bundled inside the artifact archives of
//! a small family of dependency groups.
//!
//! Dependency resolution, network retrieval, and display of the results
//! all live with external collaborators; this crate only consumes an
//! already-resolved list plus a [`metadata::MetadataSource`] and the
//! artifact files on disk.

/// The aggregation driver.
pub mod aggregate;
/// Blob appending, dedup, and index serialization.
pub mod blob;
/// Bundled-license extraction from artifact archives.
pub mod bundle;
/// Package-metadata documents and declared-license extraction.
pub mod metadata;
/// Resolved-dependency records and classification.
pub mod types;

pub use aggregate::{AggregateError, Aggregator};
pub use blob::{ByteRange, LicenseIndex, LicenseSink};
pub use types::{DependencyKind, ResolvedDependency, classify, load_dependency_list};
