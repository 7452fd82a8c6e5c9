//! The aggregation driver: classify, extract, dedup, append.

use std::collections::HashSet;
use std::io::{self, Write};

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::blob::{LicenseIndex, LicenseSink};
use crate::bundle::{self, BundleError};
use crate::metadata::{MetadataSource, declared_licenses};
use crate::types::{DependencyKind, ResolvedDependency, classify};

/// Fatal aggregation failure.
///
/// Everything recoverable (missing metadata, unparseable documents,
/// unclassifiable dependencies) is logged and the dependency skipped;
/// only blob writes and bundled extraction abort the run.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// Bundled-license extraction failed.
    #[error(transparent)]
    Bundle(#[from] BundleError),

    /// The output blob could not be written.
    #[error("Failed to write license blob: {0}")]
    Blob(#[from] io::Error),
}

/// Drives license aggregation over one resolved dependency list.
///
/// Owns the run's accumulation state: the blob sink (write cursor plus
/// dedup map) and the cross-artifact set of bundled keys already
/// extracted. Processing is sequential, one dependency at a time, in
/// input order; the final key order in the index is first-insertion
/// order across the whole run.
#[derive(Debug)]
pub struct Aggregator<W: Write> {
    sink: LicenseSink<W>,
    bundled: HashSet<String>,
}

impl<W: Write> Aggregator<W> {
    /// Aggregator writing blob content to `out`.
    pub fn new(out: W) -> Self {
        Self {
            sink: LicenseSink::new(out),
            bundled: HashSet::new(),
        }
    }

    /// Process every dependency in input order.
    ///
    /// Re-running over the same list is idempotent: duplicate license
    /// keys never append bytes twice.
    ///
    /// # Errors
    ///
    /// Only fatal failures surface here ([`AggregateError`]); missing or
    /// malformed per-dependency inputs are reported and skipped.
    pub fn run<M: MetadataSource>(
        &mut self,
        deps: &[ResolvedDependency],
        metadata: &M,
    ) -> Result<(), AggregateError> {
        for dep in deps {
            self.process(dep, metadata)?;
        }
        Ok(())
    }

    fn process<M: MetadataSource>(
        &mut self,
        dep: &ResolvedDependency,
        metadata: &M,
    ) -> Result<(), AggregateError> {
        let kind = match classify(dep) {
            Ok(kind) => kind,
            Err(e) => {
                error!("Skipping {}: {e}", dep.coordinates());
                return Ok(());
            }
        };
        match kind {
            DependencyKind::Ordinary => self.add_declared(dep, metadata)?,
            DependencyKind::Primary { granular } => {
                // The library's own primary license is declared in its
                // metadata, independent of any bundled transitive data.
                self.add_declared(dep, metadata)?;
                if granular {
                    self.add_bundled(dep)?;
                }
            }
            DependencyKind::LicenseCarrier => self.add_bundled(dep)?,
        }
        Ok(())
    }

    fn add_declared<M: MetadataSource>(
        &mut self,
        dep: &ResolvedDependency,
        metadata: &M,
    ) -> Result<(), AggregateError> {
        let document = match metadata.lookup(dep) {
            Ok(Some(document)) => document,
            Ok(None) => {
                warn!("No metadata document for {}", dep.coordinates());
                return Ok(());
            }
            Err(e) => {
                warn!("Unusable metadata document for {}: {e:#}", dep.coordinates());
                return Ok(());
            }
        };
        for (key, content) in declared_licenses(dep, &document) {
            if !self.sink.insert(&key, &content)? {
                debug!("`{key}` already recorded");
            }
        }
        Ok(())
    }

    fn add_bundled(&mut self, dep: &ResolvedDependency) -> Result<(), AggregateError> {
        let coordinates = dep.coordinates();
        for (raw_key, content) in bundle::bundled_licenses(&dep.artifact, &self.bundled)? {
            // Tracking is by raw key so sibling artifacts re-embedding the
            // same shared set dedup; the indexed key is namespaced under
            // the artifact that first carried it.
            let key = format!("{coordinates} {raw_key}");
            self.bundled.insert(raw_key);
            if !self.sink.insert(&key, &content)? {
                debug!("`{key}` already recorded");
            }
        }
        Ok(())
    }

    /// The index recorded so far.
    pub fn index(&self) -> &LicenseIndex {
        self.sink.index()
    }

    /// Flush the blob and return the writer together with the final index.
    ///
    /// # Errors
    ///
    /// Returns the flush failure, if any.
    pub fn finish(self) -> io::Result<(W, LicenseIndex)> {
        self.sink.finish()
    }
}
