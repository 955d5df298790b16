//! Ingesting existing on-disk outputs into the store.
//!
//! A single ingest is put-then-upsert under the shared sweep lock, so GC
//! can never observe the blob without its entry. Batch ingest isolates
//! failures per request and reports each outcome.

use camino::Utf8PathBuf;
use relic_core::error::RelicError;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::index::store::new_entry;
use crate::index::IndexEntry;
use crate::store::ArtifactStore;
use crate::StoreResult;

/// One artifact to ingest
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub kind: String,
    /// Fingerprint of the inputs that produced the artifact, computed
    /// externally with the same function the restorer uses
    pub input_key: String,
    /// Workspace file to ingest
    pub source: Utf8PathBuf,
    /// Declared format; defaults to the source file extension
    pub format: Option<String>,
    pub meta: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Stored,
    Skipped,
    Failed,
}

/// Per-kind outcome of a batch ingest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub kind: String,
    pub status: IngestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl IngestReport {
    fn stored(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            status: IngestStatus::Stored,
            detail: None,
        }
    }

    fn skipped(kind: &str, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            status: IngestStatus::Skipped,
            detail: Some(detail.into()),
        }
    }

    fn failed(kind: &str, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            status: IngestStatus::Failed,
            detail: Some(detail.into()),
        }
    }
}

impl ArtifactStore {
    /// Ingest one workspace file, replacing any entry for (kind, input_key)
    pub fn ingest_file(&self, req: &IngestRequest) -> StoreResult<IndexEntry> {
        if req.input_key.is_empty() {
            return Err(RelicError::invalid_argument("input_key must not be empty"));
        }

        // Held across put + upsert so GC never sees an entry-less blob.
        let _sweep = self.locks.sweep_shared()?;
        let kind_lock = self.locks.kind(&req.kind);
        let _k = kind_lock.write();

        let outcome = self.blobs.put_file(&req.source)?;
        let format = req
            .format
            .clone()
            .or_else(|| req.source.extension().map(|s| s.to_string()))
            .unwrap_or_else(|| "bin".to_string());

        let mut entry = new_entry(
            &req.kind,
            &req.input_key,
            outcome.digest,
            format,
            outcome.size_bytes,
            outcome.hardlinked,
            req.meta.clone(),
        );
        self.index.upsert(&mut entry)?;

        info!(
            kind = %entry.kind,
            input_key = %entry.input_key,
            blob = %entry.blob_sha256,
            deduped = outcome.deduped,
            hardlinked = entry.hardlinked,
            "ingested artifact"
        );
        Ok(entry)
    }

    /// Ingest a batch of artifacts; one failure never aborts the others.
    /// Requests whose (kind, input_key) is already stored are skipped.
    pub fn ingest_batch(&self, requests: &[IngestRequest]) -> Vec<IngestReport> {
        let mut reports = Vec::with_capacity(requests.len());
        for req in requests {
            let report = match self.get(&req.kind, &req.input_key) {
                Ok(Some(_)) => IngestReport::skipped(&req.kind, "already stored"),
                Ok(None) => match self.ingest_file(req) {
                    Ok(_) => IngestReport::stored(&req.kind),
                    Err(e) => IngestReport::failed(&req.kind, e.to_string()),
                },
                Err(e) => IngestReport::failed(&req.kind, e.to_string()),
            };
            reports.push(report);
        }
        reports
    }
}
