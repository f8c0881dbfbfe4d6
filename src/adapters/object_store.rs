//! Level-2 content-addressed blob store with manifests and a global index.
//!
//! Layout under `{base}/level2`:
//!
//! ```text
//! objects/{digest[0:2]}/{digest[2:]}.blob           zstd-compressed canonical JSON
//! manifests/history/{ticker}/{run_id}_{digest12}.json
//! manifests/index.csv                                one row per recorded manifest
//! ```
//!
//! The digest is the SHA-256 of the compressed bytes. Blobs are written once and never
//! modified; writing content that already exists is a no-op.

use crate::domain::error::PipelineError;
use crate::domain::payload::RunPayload;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const COMPRESSION_LEVEL: i32 = 19;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub run_id: String,
    pub ticker: String,
    pub period: String,
    pub interval: String,
    /// Blob path relative to the level-2 root.
    pub object_ref: String,
    pub digest: String,
    pub size: u64,
    pub created_utc: DateTime<Utc>,
}

impl ManifestRecord {
    fn row_text(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{}",
            self.run_id,
            self.ticker,
            self.period,
            self.interval,
            self.object_ref,
            self.digest,
            self.size,
            self.created_utc.to_rfc3339()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PutOutcome {
    pub digest: String,
    pub object_path: PathBuf,
    pub object_ref: String,
    /// Compressed size in bytes.
    pub size: u64,
    /// The blob already existed and nothing was written.
    pub deduplicated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IndexFilter {
    pub ticker: Option<String>,
    /// Substring matched against the whole comma-joined row.
    pub contains: Option<String>,
    pub limit: Option<usize>,
}

impl IndexFilter {
    fn matches(&self, record: &ManifestRecord) -> bool {
        let ticker_ok = self
            .ticker
            .as_deref()
            .is_none_or(|t| record.ticker.eq_ignore_ascii_case(t));
        let text_ok = self
            .contains
            .as_deref()
            .is_none_or(|needle| record.row_text().contains(needle));
        ticker_ok && text_ok
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn is_valid_digest(digest: &str) -> bool {
    digest.len() == 64
        && digest
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Writes `bytes` to a temp file in the target directory, fsyncs, then renames over
/// `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let parent = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(PipelineError::at(parent))?;
    let mut tmp = NamedTempFile::new_in(parent).map_err(PipelineError::at(parent))?;
    tmp.write_all(bytes).map_err(PipelineError::at(path))?;
    tmp.as_file().sync_all().map_err(PipelineError::at(path))?;
    tmp.persist(path)
        .map_err(|e| PipelineError::at(path)(e.error))?;
    Ok(())
}

pub struct ObjectStore {
    root: PathBuf,
    index_writer: Mutex<()>,
}

impl ObjectStore {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            root: base_dir.join("level2"),
            index_writer: Mutex::new(()),
        }
    }

    /// Creates the object and manifest directories. A failure here is a
    /// [`PipelineError::Layout`], which aborts the run.
    pub fn prepare(&self) -> Result<(), PipelineError> {
        for dir in [self.objects_dir(), self.manifests_dir().join("history")] {
            fs::create_dir_all(&dir).map_err(|source| PipelineError::Layout {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    fn objects_dir(&self) -> PathBuf {
        self.root.join("objects")
    }

    fn manifests_dir(&self) -> PathBuf {
        self.root.join("manifests")
    }

    pub fn index_path(&self) -> PathBuf {
        self.manifests_dir().join("index.csv")
    }

    pub fn object_ref(digest: &str) -> String {
        format!("objects/{}/{}.blob", &digest[..2], &digest[2..])
    }

    pub fn object_path(&self, digest: &str) -> PathBuf {
        self.root.join(Self::object_ref(digest))
    }

    /// Compresses and stores `canonical` unless a blob with the same digest exists.
    pub fn put(&self, canonical: &[u8]) -> Result<PutOutcome, PipelineError> {
        let compressed = zstd::stream::encode_all(canonical, COMPRESSION_LEVEL)?;
        let digest = sha256_hex(&compressed);
        let object_path = self.object_path(&digest);
        let size = compressed.len() as u64;

        let deduplicated = object_path.exists();
        if deduplicated {
            debug!(digest = %digest, "blob already stored");
        } else {
            write_atomic(&object_path, &compressed)?;
            debug!(digest = %digest, size, "stored blob");
        }

        Ok(PutOutcome {
            object_ref: Self::object_ref(&digest),
            digest,
            object_path,
            size,
            deduplicated,
        })
    }

    pub fn put_payload(&self, payload: &RunPayload) -> Result<PutOutcome, PipelineError> {
        self.put(&payload.canonical_bytes()?)
    }

    /// Appends the index row, then writes the manifest file. Returns the manifest path.
    ///
    /// A failed index append is a [`PipelineError::Index`] and no manifest is written.
    pub fn record(&self, record: &ManifestRecord) -> Result<PathBuf, PipelineError> {
        let manifest_path = self
            .manifests_dir()
            .join("history")
            .join(&record.ticker)
            .join(format!("{}_{}.json", record.run_id, &record.digest[..12]));
        let manifest = serde_json::to_vec_pretty(record)?;

        self.append_index(record)?;
        write_atomic(&manifest_path, &manifest)?;

        info!(
            ticker = %record.ticker,
            digest = %record.digest,
            manifest = %manifest_path.display(),
            "recorded manifest"
        );
        Ok(manifest_path)
    }

    fn append_index(&self, record: &ManifestRecord) -> Result<(), PipelineError> {
        let index_path = self.index_path();
        let failed = |reason: String| PipelineError::Index {
            path: index_path.clone(),
            reason,
        };

        let _guard = self.index_writer.lock();
        fs::create_dir_all(self.manifests_dir()).map_err(|e| failed(e.to_string()))?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&index_path)
            .map_err(|e| failed(e.to_string()))?;
        let needs_header = file.metadata().map_err(|e| failed(e.to_string()))?.len() == 0;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        wtr.serialize(record).map_err(|e| failed(e.to_string()))?;
        wtr.flush().map_err(|e| failed(e.to_string()))?;
        Ok(())
    }

    /// Raw canonical JSON of a blob, after checking its hash.
    pub fn fetch_bytes(&self, digest: &str) -> Result<Vec<u8>, PipelineError> {
        let not_found = || PipelineError::ObjectNotFound {
            digest: digest.to_string(),
        };
        let corrupt = |reason: String| PipelineError::CorruptObject {
            digest: digest.to_string(),
            reason,
        };

        if !is_valid_digest(digest) {
            return Err(not_found());
        }
        let path = self.object_path(digest);
        let compressed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(PipelineError::at(&path)(e)),
        };

        let actual = sha256_hex(&compressed);
        if actual != digest {
            return Err(corrupt(format!("content hashes to {}", actual)));
        }
        zstd::stream::decode_all(compressed.as_slice())
            .map_err(|e| corrupt(format!("decompression failed: {}", e)))
    }

    pub fn fetch(&self, digest: &str) -> Result<RunPayload, PipelineError> {
        let bytes = self.fetch_bytes(digest)?;
        serde_json::from_slice(&bytes).map_err(|e| PipelineError::CorruptObject {
            digest: digest.to_string(),
            reason: format!("invalid payload: {}", e),
        })
    }

    /// Index rows matching `filter`, most recent first.
    pub fn scan_index(&self, filter: &IndexFilter) -> Result<Vec<ManifestRecord>, PipelineError> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::Reader::from_path(&path)?;
        let mut rows = Vec::new();
        for result in rdr.deserialize::<ManifestRecord>() {
            let record = result?;
            if filter.matches(&record) {
                rows.push(record);
            }
        }
        rows.reverse();
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    pub fn object_count(&self) -> Result<usize, PipelineError> {
        let dir = self.objects_dir();
        if !dir.exists() {
            return Ok(0);
        }
        let mut count = 0;
        for fanout in fs::read_dir(dir)? {
            let fanout = fanout?;
            if !fanout.file_type()?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(fanout.path())? {
                if entry?.path().extension().is_some_and(|ext| ext == "blob") {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    /// Manifest files recorded for `ticker`, oldest first.
    pub fn history(&self, ticker: &str) -> Result<Vec<PathBuf>, PipelineError> {
        let dir = self.manifests_dir().join("history").join(ticker);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}
