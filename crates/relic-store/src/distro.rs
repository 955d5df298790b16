//! Workspace ("distro") catalog and per-distro operations.
//!
//! A distro is an externally built output tree. The catalog describes,
//! per distro, which artifact kinds it produces, where each lives under
//! the distro's output root, and which key files carry the input
//! fingerprints the build system wrote. The store never creates workspace
//! files except through restore.

use camino::{Utf8Path, Utf8PathBuf};
use relic_core::error::RelicError;
use relic_core::Digest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::time::UNIX_EPOCH;

use crate::blob::Materialized;
use crate::ingest::{IngestReport, IngestRequest, IngestStatus};
use crate::restore::{Fingerprinter, KeyFiles};
use crate::store::ArtifactStore;
use crate::StoreResult;

/// All known distros
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistroCatalog {
    #[serde(default, rename = "distro")]
    pub distros: Vec<DistroSpec>,
}

/// One distro's output layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistroSpec {
    /// Directory name under the repo root, e.g. "leviso"
    pub dir: String,
    /// Human-readable name, e.g. "LevitateOS"
    pub label: String,
    /// Output root relative to the repo root; defaults to
    /// `<dir>/.artifacts/out`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<Utf8PathBuf>,
    #[serde(default, rename = "artifact")]
    pub artifacts: Vec<ArtifactSpec>,
}

/// One artifact kind within a distro
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub kind: String,
    /// Output file relative to the distro's output root
    pub rel_path: Utf8PathBuf,
    /// Fingerprint key files relative to the output root; several files
    /// combine into one key (composite artifacts like ISOs)
    #[serde(default)]
    pub key_files: Vec<Utf8PathBuf>,
    /// Declared format; defaults to the output file extension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// How a workspace artifact is represented in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorePresence {
    pub present: bool,
    pub blob_sha256: Option<Digest>,
    pub format: Option<String>,
    pub hardlinked: Option<bool>,
}

/// One row of a per-distro artifact summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactRow {
    pub kind: String,
    pub rel_path: String,
    pub exists: bool,
    pub size_bytes: Option<u64>,
    pub mtime_unix: Option<u64>,
    pub input_key: Option<String>,
    pub store: Option<StorePresence>,
}

impl DistroCatalog {
    /// Parse a catalog from TOML text
    pub fn parse(path: &str, text: &str) -> StoreResult<Self> {
        toml::from_str(text).map_err(|e| RelicError::ConfigParse {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Load a catalog from a TOML file
    pub fn load(path: &Utf8Path) -> StoreResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| RelicError::io(format!("Failed to read {}", path), e))?;
        Self::parse(path.as_str(), &text)
    }

    pub fn find(&self, dir: &str) -> Option<&DistroSpec> {
        self.distros.iter().find(|d| d.dir == dir)
    }
}

impl DistroSpec {
    /// Absolute output root for this distro
    pub fn out_root(&self, repo_root: &Utf8Path) -> Utf8PathBuf {
        match &self.out_dir {
            Some(dir) => repo_root.join(dir),
            None => repo_root.join(&self.dir).join(".artifacts").join("out"),
        }
    }

    pub fn artifact(&self, kind: &str) -> Option<&ArtifactSpec> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    pub fn kinds(&self) -> Vec<String> {
        self.artifacts.iter().map(|a| a.kind.clone()).collect()
    }

    /// Per-kind view of this distro's outputs against the store
    pub fn summary(
        &self,
        store: &ArtifactStore,
        repo_root: &Utf8Path,
    ) -> StoreResult<Vec<ArtifactRow>> {
        let out_root = self.out_root(repo_root);
        let mut rows = Vec::with_capacity(self.artifacts.len());

        for spec in &self.artifacts {
            let path = spec.path(&out_root);
            let (exists, size_bytes, mtime_unix) = file_info(&path);
            let input_key = spec.fingerprinter(&out_root).input_key()?;

            let presence = match &input_key {
                None => None,
                Some(key) => {
                    let found = store.get(&spec.kind, key)?;
                    Some(StorePresence {
                        present: found.is_some(),
                        blob_sha256: found.as_ref().map(|e| e.blob_sha256),
                        format: found.as_ref().map(|e| e.format.clone()),
                        hardlinked: found.as_ref().map(|e| e.hardlinked),
                    })
                }
            };

            rows.push(ArtifactRow {
                kind: spec.kind.clone(),
                rel_path: spec.rel_path.to_string(),
                exists,
                size_bytes,
                mtime_unix,
                input_key,
                store: presence,
            });
        }

        Ok(rows)
    }

    /// Ingest whatever this distro already has on disk, one report per
    /// kind. Missing files/keys and already-stored artifacts are skipped.
    pub fn ingest_existing(
        &self,
        store: &ArtifactStore,
        repo_root: &Utf8Path,
        kinds: Option<&[String]>,
    ) -> StoreResult<Vec<IngestReport>> {
        let out_root = self.out_root(repo_root);
        let selected: Vec<&ArtifactSpec> = match kinds {
            None => self.artifacts.iter().collect(),
            Some(kinds) => kinds
                .iter()
                .filter_map(|k| self.artifact(k))
                .collect(),
        };

        let mut requests = vec![];
        let mut reports = vec![];

        if let Some(kinds) = kinds {
            for kind in kinds {
                if self.artifact(kind).is_none() {
                    reports.push(IngestReport {
                        kind: kind.clone(),
                        status: IngestStatus::Skipped,
                        detail: Some("unknown kind".to_string()),
                    });
                }
            }
        }

        for spec in selected {
            let source = spec.path(&out_root);
            if !source.exists() {
                reports.push(IngestReport {
                    kind: spec.kind.clone(),
                    status: IngestStatus::Skipped,
                    detail: Some("missing file".to_string()),
                });
                continue;
            }
            let Some(input_key) = spec.fingerprinter(&out_root).input_key()? else {
                reports.push(IngestReport {
                    kind: spec.kind.clone(),
                    status: IngestStatus::Skipped,
                    detail: Some("missing input key".to_string()),
                });
                continue;
            };

            let mut meta = BTreeMap::new();
            meta.insert(
                "distro".to_string(),
                serde_json::Value::String(self.dir.clone()),
            );
            requests.push(IngestRequest {
                kind: spec.kind.clone(),
                input_key,
                source,
                format: spec.format.clone(),
                meta,
            });
        }

        reports.extend(store.ingest_batch(&requests));
        Ok(reports)
    }

    /// Restore one kind into this distro's output tree, matching the
    /// artifact's current input key
    pub fn restore_kind(
        &self,
        store: &ArtifactStore,
        repo_root: &Utf8Path,
        kind: &str,
    ) -> StoreResult<Materialized> {
        let Some(spec) = self.artifact(kind) else {
            return Err(RelicError::invalid_argument(format!(
                "unknown kind '{}' for distro '{}'",
                kind, self.dir
            )));
        };
        let out_root = self.out_root(repo_root);
        let dest = spec.path(&out_root);
        store.restore_current(kind, &spec.fingerprinter(&out_root), &dest)
    }
}

impl ArtifactSpec {
    /// Absolute path of the output file
    pub fn path(&self, out_root: &Utf8Path) -> Utf8PathBuf {
        out_root.join(&self.rel_path)
    }

    /// Fingerprinter over this artifact's key files
    pub fn fingerprinter(&self, out_root: &Utf8Path) -> KeyFiles {
        KeyFiles::new(self.key_files.iter().map(|f| out_root.join(f)).collect())
    }
}

fn file_info(path: &Utf8Path) -> (bool, Option<u64>, Option<u64>) {
    let Ok(md) = fs::metadata(path) else {
        return (false, None, None);
    };
    let mtime = md
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs());
    (true, Some(md.len()), mtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::open_store;
    use tempfile::tempdir;

    const CATALOG_TOML: &str = r#"
[[distro]]
dir = "leviso"
label = "LevitateOS"

[[distro.artifact]]
kind = "rootfs_erofs"
rel_path = "filesystem.erofs"
key_files = [".rootfs-inputs.hash"]
format = "erofs"

[[distro.artifact]]
kind = "iso"
rel_path = "leviso.iso"
key_files = [".kernel-inputs.hash", ".rootfs-inputs.hash"]
"#;

    fn catalog() -> DistroCatalog {
        DistroCatalog::parse("test.toml", CATALOG_TOML).unwrap()
    }

    fn seed_outputs(repo: &Utf8Path, distro: &DistroSpec) -> Utf8PathBuf {
        let out = distro.out_root(repo);
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("filesystem.erofs"), b"rootfs bytes").unwrap();
        fs::write(out.join("leviso.iso"), b"iso bytes").unwrap();
        fs::write(out.join(".rootfs-inputs.hash"), b"rk\n").unwrap();
        fs::write(out.join(".kernel-inputs.hash"), b"kk\n").unwrap();
        out
    }

    #[test]
    fn test_catalog_parse_and_defaults() {
        let catalog = catalog();
        let distro = catalog.find("leviso").unwrap();
        assert_eq!(distro.label, "LevitateOS");
        assert_eq!(distro.kinds(), vec!["rootfs_erofs", "iso"]);

        let repo = Utf8PathBuf::from("/repo");
        assert_eq!(
            distro.out_root(&repo),
            Utf8PathBuf::from("/repo/leviso/.artifacts/out")
        );
        assert!(catalog.find("unknown").is_none());
    }

    #[test]
    fn test_catalog_parse_error() {
        let err = DistroCatalog::parse("bad.toml", "not [ valid").unwrap_err();
        assert!(matches!(err, RelicError::ConfigParse { .. }));
    }

    #[test]
    fn test_ingest_existing_then_summary() {
        let dir = tempdir().unwrap();
        let repo = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let store = open_store(&dir);

        let catalog = catalog();
        let distro = catalog.find("leviso").unwrap();
        seed_outputs(&repo, distro);

        let reports = distro.ingest_existing(&store, &repo, None).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.status == IngestStatus::Stored));

        let rows = distro.summary(&store, &repo).unwrap();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert!(row.exists);
            assert!(row.input_key.is_some());
            let presence = row.store.as_ref().unwrap();
            assert!(presence.present);
            assert!(presence.blob_sha256.is_some());
        }
        assert_eq!(rows[0].store.as_ref().unwrap().format.as_deref(), Some("erofs"));

        // Second pass: everything already stored.
        let reports = distro.ingest_existing(&store, &repo, None).unwrap();
        assert!(reports.iter().all(|r| r.status == IngestStatus::Skipped));
    }

    #[test]
    fn test_ingest_existing_skips_missing() {
        let dir = tempdir().unwrap();
        let repo = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let store = open_store(&dir);

        let catalog = catalog();
        let distro = catalog.find("leviso").unwrap();
        // No outputs on disk at all.
        let reports = distro.ingest_existing(&store, &repo, None).unwrap();
        assert!(reports.iter().all(|r| r.status == IngestStatus::Skipped));
        assert_eq!(reports[0].detail.as_deref(), Some("missing file"));
    }

    #[test]
    fn test_ingest_existing_unknown_kind_reported() {
        let dir = tempdir().unwrap();
        let repo = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let store = open_store(&dir);

        let catalog = catalog();
        let distro = catalog.find("leviso").unwrap();
        let kinds = vec!["bogus".to_string()];
        let reports = distro.ingest_existing(&store, &repo, Some(&kinds)).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, IngestStatus::Skipped);
        assert_eq!(reports[0].detail.as_deref(), Some("unknown kind"));
    }

    #[test]
    fn test_restore_kind_round_trip() {
        let dir = tempdir().unwrap();
        let repo = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let store = open_store(&dir);

        let catalog = catalog();
        let distro = catalog.find("leviso").unwrap();
        let out = seed_outputs(&repo, distro);

        distro.ingest_existing(&store, &repo, None).unwrap();

        // Simulate a lost output; key files survive.
        fs::remove_file(out.join("filesystem.erofs")).unwrap();
        distro.restore_kind(&store, &repo, "rootfs_erofs").unwrap();
        assert_eq!(fs::read(out.join("filesystem.erofs")).unwrap(), b"rootfs bytes");

        let err = distro.restore_kind(&store, &repo, "bogus").unwrap_err();
        assert!(matches!(err, RelicError::InvalidArgument { .. }));
    }
}
