use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, info, warn};

use crate::config::settings::StorageSettings;
use crate::element::element_model::{ElementFeatures, ElementRecord, Locator};
use crate::store::element_row::{COLUMNS, ElementRow};
use crate::store::error::StoreError;

// ============================================================================
// Corpus store
// ============================================================================

/// Persistence for the success corpus and the current-page snapshot.
///
/// The corpus is an append-only CSV shared across workers; every append runs
/// under an exclusive lock on `<corpus>.lock` so the dedup check and the write
/// are atomic with respect to other processes. The snapshot is per-worker and
/// replaced wholesale through a rename.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    corpus_path: PathBuf,
    snapshot_path: PathBuf,
}

/// Summary of the persisted corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusStats {
    pub rows: usize,
    pub locators: usize,
    pub pages: usize,
}

impl CorpusStore {
    pub fn new(corpus_path: impl Into<PathBuf>, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            corpus_path: corpus_path.into(),
            snapshot_path: snapshot_path.into(),
        }
    }

    pub fn from_settings(storage: &StorageSettings) -> Self {
        Self::new(storage.corpus_path.clone(), storage.snapshot_path())
    }

    pub fn corpus_path(&self) -> &Path {
        &self.corpus_path
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .corpus_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.corpus_path.with_file_name(name)
    }

    fn open_lock(&self) -> Result<File, StoreError> {
        let path = self.lock_path();
        ensure_parent(&path)?;
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))
    }

    // ------------------------------------------------------------------
    // Success corpus
    // ------------------------------------------------------------------

    /// Append `record` unless a row with the same fingerprint already exists
    /// anywhere in the corpus.
    ///
    /// Returns whether a row was appended.
    pub fn record_success(&self, record: &ElementRecord) -> Result<bool, StoreError> {
        let lock = self.open_lock()?;
        lock.lock_exclusive().map_err(|e| StoreError::Lock {
            path: self.lock_path(),
            source: e,
        })?;

        let result = self.append_if_new(record);

        if let Err(e) = lock.unlock() {
            warn!(path = %self.lock_path().display(), error = %e, "failed to release corpus lock");
        }
        result
    }

    fn append_if_new(&self, record: &ElementRecord) -> Result<bool, StoreError> {
        let known: BTreeSet<String> = read_rows(&self.corpus_path)?
            .into_iter()
            .map(|row| row.fingerprint)
            .collect();
        if known.contains(&record.fingerprint) {
            debug!(locator = %record.locator, "element already in corpus");
            return Ok(false);
        }

        ensure_parent(&self.corpus_path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.corpus_path)
            .map_err(|e| StoreError::io(&self.corpus_path, e))?;
        let len = file
            .metadata()
            .map_err(|e| StoreError::io(&self.corpus_path, e))?
            .len();
        if len > 0 {
            terminate_partial_row(&mut file).map_err(|e| StoreError::io(&self.corpus_path, e))?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if len == 0 {
            writer
                .write_record(COLUMNS)
                .map_err(|e| StoreError::csv(&self.corpus_path, e))?;
        }
        writer
            .serialize(ElementRow::from_record(record))
            .map_err(|e| StoreError::csv(&self.corpus_path, e))?;
        writer
            .flush()
            .map_err(|e| StoreError::io(&self.corpus_path, e))?;

        info!(locator = %record.locator, "web element data inserted in corpus");
        Ok(true)
    }

    /// Every corpus record in append order. Malformed rows are skipped and an
    /// unreadable file reads as empty.
    pub fn load_corpus(&self) -> Vec<ElementRecord> {
        if !self.corpus_path.exists() {
            return Vec::new();
        }
        let _guard = self.shared_lock();
        match read_rows(&self.corpus_path) {
            Ok(rows) => rows_to_records(&self.corpus_path, rows),
            Err(e) => {
                warn!(error = %e, "unable to read corpus");
                Vec::new()
            }
        }
    }

    /// Features of the most recent corpus record for `locator_value`.
    ///
    /// `None` when the locator was never recorded or the corpus is missing
    /// or unreadable.
    pub fn load_success_by_locator(&self, locator_value: &str) -> Option<ElementFeatures> {
        if !self.corpus_path.exists() {
            info!(path = %self.corpus_path.display(), "corpus does not exist yet");
            return None;
        }
        let _guard = self.shared_lock();
        let rows = match read_rows(&self.corpus_path) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "unable to read corpus");
                return None;
            }
        };
        let found = rows
            .into_iter()
            .rev()
            .find(|row| row.loc == locator_value)
            .map(|row| row.features());
        if found.is_some() {
            info!(locator = locator_value, "last successful element read from corpus");
        }
        found
    }

    pub fn stats(&self) -> CorpusStats {
        let records = self.load_corpus();
        CorpusStats {
            rows: records.len(),
            locators: records
                .iter()
                .map(|r| r.locator.value.as_str())
                .collect::<BTreeSet<_>>()
                .len(),
            pages: records
                .iter()
                .map(|r| r.source_url.as_str())
                .collect::<BTreeSet<_>>()
                .len(),
        }
    }

    fn shared_lock(&self) -> Option<SharedLock> {
        let file = self.open_lock().ok()?;
        match file.lock_shared() {
            Ok(()) => Some(SharedLock { file }),
            Err(e) => {
                warn!(error = %e, "reading corpus without a lock");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Page snapshot
    // ------------------------------------------------------------------

    /// Replace the snapshot with `records`.
    ///
    /// Writes a sibling temp file and renames it over the snapshot, so a
    /// reader sees either the old or the new table.
    pub fn write_snapshot(&self, records: &[ElementRecord]) -> Result<(), StoreError> {
        ensure_parent(&self.snapshot_path)?;
        let tmp = self.snapshot_path.with_extension("csv.tmp");

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp)
            .map_err(|e| StoreError::csv(&tmp, e))?;
        writer
            .write_record(COLUMNS)
            .map_err(|e| StoreError::csv(&tmp, e))?;
        for record in records {
            writer
                .serialize(ElementRow::from_record(record))
                .map_err(|e| StoreError::csv(&tmp, e))?;
        }
        writer.flush().map_err(|e| StoreError::io(&tmp, e))?;
        drop(writer);

        std::fs::rename(&tmp, &self.snapshot_path)
            .map_err(|e| StoreError::io(&self.snapshot_path, e))?;
        debug!(count = records.len(), path = %self.snapshot_path.display(), "snapshot written");
        Ok(())
    }

    /// Snapshot features and their locators, row-aligned.
    pub fn load_snapshot(&self) -> (Vec<ElementFeatures>, Vec<Locator>) {
        let rows = match read_rows(&self.snapshot_path) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "unable to read page snapshot");
                return (Vec::new(), Vec::new());
            }
        };
        let records = rows_to_records(&self.snapshot_path, rows);
        info!(count = records.len(), "page elements read from snapshot");
        records
            .into_iter()
            .map(|r| (r.features, r.locator))
            .unzip()
    }
}

struct SharedLock {
    file: File,
}

impl Drop for SharedLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Read every row of a table. A missing file is an empty table.
fn read_rows(path: &Path) -> Result<Vec<ElementRow>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
    let mut rows = Vec::new();
    for result in reader.deserialize::<ElementRow>() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) if e.is_io_error() => return Err(StoreError::csv(path, e)),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping malformed row"),
        }
    }
    Ok(rows)
}

/// End a row left without its newline by an interrupted writer, so the next
/// append starts on a line of its own.
fn terminate_partial_row(file: &mut File) -> std::io::Result<()> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
    }
    Ok(())
}

/// Convert rows, skipping (and logging) any that do not form a valid record.
fn rows_to_records(path: &Path, rows: Vec<ElementRow>) -> Vec<ElementRecord> {
    rows.into_iter()
        .enumerate()
        .filter_map(|(i, row)| match row.into_record() {
            Ok(record) => Some(record),
            Err(reason) => {
                let error = StoreError::InvalidRow {
                    path: path.to_path_buf(),
                    reason: format!("row {}: {}", i + 1, reason),
                };
                warn!(%error, "skipping row");
                None
            }
        })
        .collect()
}
