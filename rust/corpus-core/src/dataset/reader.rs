// rust/corpus-core/src/dataset/reader.rs

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::{ReaderConfig, StorageConfig};
use crate::error::{CorpusError, Result};
use crate::storage::{LocalStorage, StorageBackend};

use super::source::StorageShardSource;
use super::traits::{MaterializationUnit, Pair, ShardSource, ShardStream};

/// Options for a [`ShardedCorpusReader`].
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    /// Shuffle shard order once at construction and row order per unit.
    pub shuffle: bool,
    /// Seed for the shuffle; entropy is used when unset.
    pub seed: Option<u64>,
    /// How many rows are materialized at once.
    pub unit: MaterializationUnit,
}

impl From<&ReaderConfig> for ReaderOptions {
    fn from(config: &ReaderConfig) -> Self {
        Self {
            shuffle: config.shuffle,
            seed: config.seed,
            unit: config.unit(),
        }
    }
}

/// A shard and the number of rows the pre-scan found in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardInfo {
    pub path: PathBuf,
    pub rows: u64,
}

/// The ordered shard list with per-shard row counts.
///
/// Built once per reader; shard order and counts never change afterwards.
#[derive(Debug, Clone, Default)]
pub struct ShardManifest {
    shards: Vec<ShardInfo>,
    total_rows: u64,
}

impl ShardManifest {
    /// Count the rows of every shard, in the given order.
    fn scan(source: &dyn ShardSource, paths: Vec<PathBuf>) -> Result<Self> {
        let mut shards = Vec::with_capacity(paths.len());
        let mut total_rows = 0u64;

        for path in paths {
            let rows = source.count_rows(&path)?;
            total_rows += rows;
            shards.push(ShardInfo { path, rows });
        }

        Ok(Self { shards, total_rows })
    }

    /// Shards in visitation order.
    pub fn shards(&self) -> &[ShardInfo] {
        &self.shards
    }

    /// Number of shards.
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Sum of all shard row counts.
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    /// Row count recorded for a shard path.
    pub fn row_count(&self, path: &Path) -> Option<u64> {
        self.shards.iter().find(|s| s.path == path).map(|s| s.rows)
    }

    pub fn get(&self, index: usize) -> Option<&ShardInfo> {
        self.shards.get(index)
    }
}

type RecordReader = csv::Reader<Box<dyn Read + Send>>;

/// The shard currently being read.
struct OpenShard {
    /// CSV reader over the shard; `None` once every row has been read and
    /// the handle released.
    records: Option<RecordReader>,
    /// Rows parsed from this shard so far.
    rows_read: u64,
}

/// Streams (source, target) pairs from a directory of two-column CSV shards.
///
/// Shards are read strictly one after another. Only the current unit (a
/// whole shard by default, or a bounded chunk of it) is held in memory, and
/// only the current shard is open. With shuffling enabled the shard order is
/// permuted once at construction and each unit's rows are permuted when the
/// unit is materialized; there is no global shuffle.
///
/// Row counts for every shard are computed eagerly at construction, which
/// costs one full read of the corpus but makes [`len`](ShardStream::len) free.
pub struct ShardedCorpusReader {
    source: Arc<dyn ShardSource>,
    manifest: ShardManifest,
    options: ReaderOptions,
    rng: StdRng,

    /// Index of the current shard; `None` before the first pull.
    shard_index: Option<usize>,
    open: Option<OpenShard>,
    unit: Vec<Pair>,
    row_index: usize,
    emitted: u64,
    finished: bool,
    halted: Option<(PathBuf, u64)>,
}

impl ShardedCorpusReader {
    /// Create a reader over the shards of `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shards cannot be listed or counted.
    pub fn new(source: Arc<dyn ShardSource>, options: ReaderOptions) -> Result<Self> {
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut paths = source.list_shards()?;
        if options.shuffle {
            paths.shuffle(&mut rng);
        }

        let manifest = ShardManifest::scan(source.as_ref(), paths)?;

        tracing::info!(
            "Indexed {} shards with {} rows from {} (shuffle: {}, unit: {:?})",
            manifest.len(),
            manifest.total_rows(),
            source.describe(),
            options.shuffle,
            options.unit
        );

        Ok(Self {
            source,
            manifest,
            options,
            rng,
            shard_index: None,
            open: None,
            unit: Vec::new(),
            row_index: 0,
            emitted: 0,
            finished: false,
            halted: None,
        })
    }

    /// Create a reader over a local directory of shard files.
    pub fn open_dir(dir: impl AsRef<Path>, shuffle: bool) -> Result<Self> {
        let config = StorageConfig {
            base_path: PathBuf::from("."),
            ..Default::default()
        };
        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(&config)?);
        let source = Arc::new(StorageShardSource::new(storage, dir.as_ref()));

        Self::new(
            source,
            ReaderOptions {
                shuffle,
                ..Default::default()
            },
        )
    }

    pub fn manifest(&self) -> &ShardManifest {
        &self.manifest
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// The shard the cursor is on, if reading has started and not finished.
    pub fn current_shard(&self) -> Option<&ShardInfo> {
        self.shard_index.and_then(|i| self.manifest.get(i))
    }

    /// Pairs returned since construction or the last reset.
    pub fn position(&self) -> u64 {
        self.emitted
    }

    /// Rows of the current unit still held in memory.
    pub fn buffered_rows(&self) -> usize {
        self.unit.len() - self.row_index
    }

    /// Fraction of the stream consumed, between 0.0 and 1.0.
    pub fn progress(&self) -> f64 {
        let total = self.manifest.total_rows();
        if total == 0 {
            return 1.0;
        }
        (self.emitted as f64 / total as f64).min(1.0)
    }

    /// Replace the exhausted unit with the next one, moving to the next shard
    /// when the current one has no rows left.
    fn materialize_next_unit(&mut self) -> Result<()> {
        self.unit.clear();
        self.row_index = 0;

        let shard_exhausted = self.open.as_ref().map_or(true, |s| s.records.is_none());
        if shard_exhausted {
            // Release the previous shard before opening the next one
            self.open = None;

            let next = self.shard_index.map_or(0, |i| i + 1);
            self.shard_index = Some(next.min(self.manifest.len()));

            let Some(info) = self.manifest.get(next) else {
                self.finished = true;
                tracing::debug!("All {} shards consumed", self.manifest.len());
                return Ok(());
            };

            let reader = self.source.open_shard(&info.path)?;
            let records = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_reader(reader);

            self.open = Some(OpenShard {
                records: Some(records),
                rows_read: 0,
            });
        }

        let index = self.shard_index.unwrap_or(0);
        let (Some(info), Some(open)) = (self.manifest.shards.get(index), self.open.as_mut()) else {
            return Ok(());
        };

        read_unit(info, open, &mut self.unit, self.options.unit.max_rows())?;

        if self.options.shuffle {
            self.unit.shuffle(&mut self.rng);
        }

        tracing::debug!(
            "Materialized {} rows from shard {}/{} ({})",
            self.unit.len(),
            index + 1,
            self.manifest.len(),
            info.path.display()
        );

        Ok(())
    }

    /// Drop everything read from the failing shard and refuse further pulls
    /// until reset.
    fn halt(&mut self, err: &CorpusError) {
        let location = match err.record_location() {
            Some((shard, row)) => (shard.to_path_buf(), row),
            None => {
                let shard = self
                    .current_shard()
                    .map(|s| s.path.clone())
                    .unwrap_or_default();
                let row = self.open.as_ref().map_or(0, |s| s.rows_read);
                (shard, row)
            }
        };

        tracing::warn!(
            "Halting reader at shard {} row {}: {}",
            location.0.display(),
            location.1,
            err
        );

        self.unit.clear();
        self.row_index = 0;
        self.open = None;
        self.halted = Some(location);
    }
}

/// Read rows from an open shard into `unit`, up to `limit` rows.
///
/// When the shard runs out its handle is released and the number of parsed
/// rows is checked against the pre-scan.
fn read_unit(
    shard: &ShardInfo,
    open: &mut OpenShard,
    unit: &mut Vec<Pair>,
    limit: Option<usize>,
) -> Result<()> {
    let Some(records) = open.records.as_mut() else {
        return Ok(());
    };

    let mut record = csv::StringRecord::new();
    loop {
        if limit.is_some_and(|max| unit.len() >= max) {
            return Ok(());
        }

        let row = open.rows_read;
        let more = records
            .read_record(&mut record)
            .map_err(|e| record_error(&shard.path, row, e))?;
        if !more {
            break;
        }

        if record.len() != 2 {
            return Err(CorpusError::malformed(
                &shard.path,
                row,
                format!("expected 2 fields, found {}", record.len()),
            ));
        }

        unit.push(Pair::new(&record[0], &record[1]));
        open.rows_read += 1;
    }

    open.records = None;

    if open.rows_read != shard.rows {
        return Err(CorpusError::malformed(
            &shard.path,
            open.rows_read,
            format!(
                "pre-scan counted {} rows but {} were parsed",
                shard.rows, open.rows_read
            ),
        ));
    }

    Ok(())
}

fn record_error(shard: &Path, row: u64, err: csv::Error) -> CorpusError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => {
            CorpusError::storage_with_source(shard, format!("failed to read row {row}"), e)
        }
        _ => CorpusError::malformed(shard, row, message),
    }
}

impl ShardStream for ShardedCorpusReader {
    fn len(&self) -> u64 {
        self.manifest.total_rows()
    }

    fn next_pair(&mut self) -> Result<Option<Pair>> {
        if let Some((shard, row)) = &self.halted {
            return Err(CorpusError::halted(shard.clone(), *row));
        }

        while self.row_index >= self.unit.len() {
            if self.finished {
                return Ok(None);
            }
            if let Err(err) = self.materialize_next_unit() {
                self.halt(&err);
                return Err(err);
            }
        }

        let pair = std::mem::take(&mut self.unit[self.row_index]);
        self.row_index += 1;
        self.emitted += 1;
        Ok(Some(pair))
    }

    fn reset(&mut self) {
        self.open = None;
        self.unit.clear();
        self.shard_index = None;
        self.row_index = 0;
        self.emitted = 0;
        self.finished = false;
        self.halted = None;
    }
}

impl std::fmt::Debug for ShardedCorpusReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedCorpusReader")
            .field("source", &self.source.describe())
            .field("num_shards", &self.manifest.len())
            .field("total_rows", &self.manifest.total_rows())
            .field("shard_index", &self.shard_index)
            .field("position", &self.emitted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{Cursor, Write};
    use std::num::NonZeroUsize;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Write shard `i` with `rows` lines of the form `s{i}-{r},t{i}-{r}`.
    fn write_shards(dir: &Path, row_counts: &[usize]) {
        std::fs::create_dir_all(dir).unwrap();
        for (i, &rows) in row_counts.iter().enumerate() {
            let mut file = std::fs::File::create(dir.join(format!("part-{i:04}.csv"))).unwrap();
            for r in 0..rows {
                writeln!(file, "s{i}-{r},t{i}-{r}").unwrap();
            }
        }
    }

    fn reader_for(dir: &Path, options: ReaderOptions) -> ShardedCorpusReader {
        let config = StorageConfig {
            base_path: dir.to_path_buf(),
            ..Default::default()
        };
        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(&config).unwrap());
        let source = Arc::new(StorageShardSource::new(storage, "shards"));
        ShardedCorpusReader::new(source, options).unwrap()
    }

    fn drain(reader: &mut ShardedCorpusReader) -> Vec<Pair> {
        reader.pairs().map(|p| p.unwrap()).collect()
    }

    /// Shard number encoded in a pair's source text (`s{shard}-{row}`).
    fn shard_of(pair: &Pair) -> usize {
        pair.source[1..].split('-').next().unwrap().parse().unwrap()
    }

    fn visitation_order(pairs: &[Pair]) -> Vec<usize> {
        let mut order: Vec<usize> = Vec::new();
        for pair in pairs {
            let shard = shard_of(pair);
            if order.last() != Some(&shard) {
                order.push(shard);
            }
        }
        order
    }

    fn shuffled(seed: Option<u64>) -> ReaderOptions {
        ReaderOptions {
            shuffle: true,
            seed,
            ..Default::default()
        }
    }

    #[test]
    fn test_len_matches_row_counts() {
        let temp = TempDir::new().unwrap();
        write_shards(&temp.path().join("shards"), &[2, 3, 1]);

        for options in [ReaderOptions::default(), shuffled(None)] {
            let mut reader = reader_for(temp.path(), options);
            assert_eq!(reader.len(), 6);
            assert_eq!(reader.manifest().len(), 3);

            let pairs = drain(&mut reader);
            assert_eq!(pairs.len(), 6);
            assert!(reader.next_pair().unwrap().is_none());
            assert!(reader.next_pair().unwrap().is_none());
            assert_eq!(reader.len(), 6);
        }
    }

    #[test]
    fn test_file_order_without_shuffle() {
        let temp = TempDir::new().unwrap();
        write_shards(&temp.path().join("shards"), &[2, 1]);

        let mut reader = reader_for(temp.path(), ReaderOptions::default());
        let pairs = drain(&mut reader);
        assert_eq!(
            pairs,
            vec![
                Pair::new("s0-0", "t0-0"),
                Pair::new("s0-1", "t0-1"),
                Pair::new("s1-0", "t1-0"),
            ]
        );
    }

    #[test]
    fn test_reset_replays_sequence() {
        let temp = TempDir::new().unwrap();
        write_shards(&temp.path().join("shards"), &[3, 0, 4, 2]);

        let mut reader = reader_for(temp.path(), ReaderOptions::default());
        let first = drain(&mut reader);

        reader.reset();
        assert_eq!(reader.position(), 0);
        assert!(reader.current_shard().is_none());
        let second = drain(&mut reader);

        assert_eq!(first.len(), 9);
        assert_eq!(first, second);
    }

    #[test]
    fn test_reset_mid_stream() {
        let temp = TempDir::new().unwrap();
        write_shards(&temp.path().join("shards"), &[3, 3]);

        let mut reader = reader_for(temp.path(), ReaderOptions::default());
        for _ in 0..4 {
            reader.next_pair().unwrap();
        }
        reader.reset();

        assert_eq!(reader.next_pair().unwrap(), Some(Pair::new("s0-0", "t0-0")));
        assert_eq!(drain(&mut reader).len(), 5);
    }

    #[test]
    fn test_shuffled_shard_order_fixed_across_resets() {
        let temp = TempDir::new().unwrap();
        write_shards(&temp.path().join("shards"), &[3, 2, 4, 1, 5, 2]);

        let mut reader = reader_for(temp.path(), shuffled(None));
        let manifest_order: Vec<usize> = reader
            .manifest()
            .shards()
            .iter()
            .map(|s| {
                let name = s.path.file_name().unwrap().to_str().unwrap();
                name["part-".len().."part-".len() + 4].parse().unwrap()
            })
            .collect();

        for _ in 0..3 {
            let pairs = drain(&mut reader);
            assert_eq!(pairs.len(), 17);
            assert_eq!(visitation_order(&pairs), manifest_order);
            reader.reset();
        }
    }

    #[test]
    fn test_shuffle_is_a_permutation_within_each_shard() {
        let temp = TempDir::new().unwrap();
        write_shards(&temp.path().join("shards"), &[20, 20]);

        let mut reader = reader_for(temp.path(), shuffled(Some(7)));
        let pairs = drain(&mut reader);

        let mut expected: Vec<Pair> = (0..2)
            .flat_map(|i| (0..20).map(move |r| Pair::new(format!("s{i}-{r}"), format!("t{i}-{r}"))))
            .collect();
        let mut sorted = pairs.clone();
        sorted.sort_by(|a, b| a.source.cmp(&b.source));
        expected.sort_by(|a, b| a.source.cmp(&b.source));
        assert_eq!(sorted, expected);

        // Shards are never interleaved
        assert_eq!(visitation_order(&pairs).len(), 2);
    }

    #[test]
    fn test_seed_reproduces_order() {
        let temp = TempDir::new().unwrap();
        write_shards(&temp.path().join("shards"), &[5, 5, 5, 5]);

        let a = drain(&mut reader_for(temp.path(), shuffled(Some(42))));
        let b = drain(&mut reader_for(temp.path(), shuffled(Some(42))));
        assert_eq!(a, b);
    }

    #[test]
    fn test_row_units_bound_memory() {
        let temp = TempDir::new().unwrap();
        write_shards(&temp.path().join("shards"), &[7, 3, 5]);

        let whole = drain(&mut reader_for(temp.path(), ReaderOptions::default()));

        let options = ReaderOptions {
            unit: MaterializationUnit::Rows(NonZeroUsize::new(2).unwrap()),
            ..Default::default()
        };
        let mut reader = reader_for(temp.path(), options);
        assert_eq!(reader.len(), 15);

        let mut chunked = Vec::new();
        while let Some(pair) = reader.next_pair().unwrap() {
            assert!(reader.buffered_rows() < 2);
            chunked.push(pair);
        }

        assert_eq!(chunked, whole);
    }

    #[test]
    fn test_row_units_with_shuffle_stay_within_chunks() {
        let temp = TempDir::new().unwrap();
        write_shards(&temp.path().join("shards"), &[6]);

        let options = ReaderOptions {
            shuffle: true,
            seed: Some(3),
            unit: MaterializationUnit::Rows(NonZeroUsize::new(3).unwrap()),
        };
        let pairs = drain(&mut reader_for(temp.path(), options));
        assert_eq!(pairs.len(), 6);

        let rows: Vec<usize> = pairs
            .iter()
            .map(|p| p.source.rsplit('-').next().unwrap().parse().unwrap())
            .collect();
        assert!(rows[..3].iter().all(|&r| r < 3));
        assert!(rows[3..].iter().all(|&r| r >= 3));
    }

    #[test]
    fn test_empty_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("shards")).unwrap();

        let mut reader = reader_for(temp.path(), ReaderOptions::default());
        assert!(reader.is_empty());
        assert!(reader.next_pair().unwrap().is_none());
        assert_eq!(reader.progress(), 1.0);
    }

    #[test]
    fn test_blank_lines_and_quoting() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("shards");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("a.csv"),
            "\"hello, world\",\"bonjour, le monde\"\n\nthe cat,le chat\r\n",
        )
        .unwrap();

        let mut reader = reader_for(temp.path(), ReaderOptions::default());
        assert_eq!(reader.len(), 2);
        assert_eq!(
            drain(&mut reader),
            vec![
                Pair::new("hello, world", "bonjour, le monde"),
                Pair::new("the cat", "le chat"),
            ]
        );
    }

    #[test]
    fn test_malformed_row_reports_location_and_halts() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("shards");
        write_shards(&dir, &[2]);
        std::fs::write(dir.join("part-0001.csv"), "ok,fine\nonly one field\nmore,rows\n").unwrap();

        let mut reader = reader_for(temp.path(), ReaderOptions::default());
        pull_ok(&mut reader, 2);

        match reader.next_pair() {
            Err(CorpusError::MalformedRecord { shard, row, .. }) => {
                assert!(shard.ends_with("part-0001.csv"));
                assert_eq!(row, 1);
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }

        // Halted until reset; nothing from the bad shard leaks out
        match reader.next_pair() {
            Err(CorpusError::StreamHalted { shard, row }) => {
                assert!(shard.ends_with("part-0001.csv"));
                assert_eq!(row, 1);
            }
            other => panic!("expected StreamHalted, got {other:?}"),
        }
        assert_eq!(reader.buffered_rows(), 0);

        reader.reset();
        pull_ok(&mut reader, 2);
        assert!(matches!(
            reader.next_pair(),
            Err(CorpusError::MalformedRecord { .. })
        ));
    }

    fn pull_ok(reader: &mut ShardedCorpusReader, n: usize) {
        for _ in 0..n {
            assert!(reader.next_pair().unwrap().is_some());
        }
    }

    #[test]
    fn test_too_many_fields_is_malformed() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("shards");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.csv"), "a,b\nc,d,e\n").unwrap();

        let mut reader = reader_for(temp.path(), ReaderOptions::default());
        let err = reader.next_pair().unwrap_err();
        assert_eq!(err.record_location().unwrap().1, 1);
        assert!(err.to_string().contains("found 3"));
    }

    #[test]
    fn test_missing_directory() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig {
            base_path: temp.path().to_path_buf(),
            ..Default::default()
        };
        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(&config).unwrap());
        let source = Arc::new(StorageShardSource::new(storage, "shards"));

        let err = ShardedCorpusReader::new(source, ReaderOptions::default()).unwrap_err();
        assert!(matches!(err, CorpusError::Storage { .. }));
    }

    #[test]
    fn test_shard_vanishes_after_indexing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("shards");
        write_shards(&dir, &[1, 1]);

        let mut reader = reader_for(temp.path(), ReaderOptions::default());
        std::fs::remove_file(dir.join("part-0001.csv")).unwrap();

        assert!(reader.next_pair().unwrap().is_some());
        assert!(matches!(
            reader.next_pair(),
            Err(CorpusError::Storage { .. })
        ));
        assert!(matches!(
            reader.next_pair(),
            Err(CorpusError::StreamHalted { .. })
        ));
    }

    #[test]
    fn test_open_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("shards");
        write_shards(&dir, &[2, 2]);

        let mut reader = ShardedCorpusReader::open_dir(&dir, false).unwrap();
        assert_eq!(reader.len(), 4);
        assert_eq!(drain(&mut reader).len(), 4);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_shard_names_are_read() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("shards");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.csv"), b"a0,x0\n").unwrap();
        std::fs::write(dir.join(OsStr::from_bytes(b"b\xff.csv")), b"b0,y0\nb1,y1\n").unwrap();

        let mut reader = ShardedCorpusReader::open_dir(&dir, false).unwrap();
        assert_eq!(reader.manifest().len(), 2);
        assert_eq!(reader.len(), 3);
        assert_eq!(drain(&mut reader).len(), 3);
    }

    #[test]
    fn test_quoted_field_spanning_lines() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("shards");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("part-0000.csv"), b"\"hello\nworld\",bonjour\nb,c\n").unwrap();

        let mut reader = ShardedCorpusReader::open_dir(&dir, false).unwrap();
        assert_eq!(reader.len(), 2);
        assert_eq!(
            drain(&mut reader),
            vec![Pair::new("hello\nworld", "bonjour"), Pair::new("b", "c")]
        );
    }

    #[test]
    fn test_progress_and_position() {
        let temp = TempDir::new().unwrap();
        write_shards(&temp.path().join("shards"), &[2, 2]);

        let mut reader = reader_for(temp.path(), ReaderOptions::default());
        assert_eq!(reader.progress(), 0.0);

        reader.next_pair().unwrap();
        assert_eq!(reader.position(), 1);
        assert!((reader.progress() - 0.25).abs() < f64::EPSILON);
        assert!(reader.current_shard().unwrap().path.ends_with("part-0000.csv"));

        drain(&mut reader);
        assert!((reader.progress() - 1.0).abs() < f64::EPSILON);
    }

    /// In-memory shard source for exercising the reader against a non-file
    /// backend.
    struct MemorySource {
        shards: Mutex<HashMap<PathBuf, Vec<u8>>>,
        claimed_rows: Option<u64>,
    }

    impl MemorySource {
        fn new(shards: &[(&str, &str)]) -> Self {
            Self {
                shards: Mutex::new(
                    shards
                        .iter()
                        .map(|(name, data)| (PathBuf::from(name), data.as_bytes().to_vec()))
                        .collect(),
                ),
                claimed_rows: None,
            }
        }
    }

    impl ShardSource for MemorySource {
        fn list_shards(&self) -> Result<Vec<PathBuf>> {
            let mut names: Vec<PathBuf> = self.shards.lock().unwrap().keys().cloned().collect();
            names.sort();
            Ok(names)
        }

        fn open_shard(&self, shard: &Path) -> Result<Box<dyn Read + Send>> {
            let data = self
                .shards
                .lock()
                .unwrap()
                .get(shard)
                .cloned()
                .ok_or_else(|| CorpusError::storage(shard, "not found"))?;
            Ok(Box::new(Cursor::new(data)))
        }

        fn count_rows(&self, shard: &Path) -> Result<u64> {
            match self.claimed_rows {
                Some(rows) => Ok(rows),
                None => {
                    let reader = self.open_shard(shard)?;
                    Ok(crate::dataset::count_records(reader).unwrap())
                }
            }
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    #[test]
    fn test_custom_source() {
        let source = Arc::new(MemorySource::new(&[
            ("b", "b0,y0\n"),
            ("a", "a0,x0\na1,x1\n"),
        ]));
        let mut reader = ShardedCorpusReader::new(source, ReaderOptions::default()).unwrap();

        assert_eq!(reader.len(), 3);
        assert_eq!(reader.manifest().row_count(Path::new("a")), Some(2));
        let sources: Vec<String> = drain(&mut reader).into_iter().map(|p| p.source).collect();
        assert_eq!(sources, vec!["a0", "a1", "b0"]);
    }

    #[test]
    fn test_row_count_mismatch_is_malformed() {
        let mut source = MemorySource::new(&[("a", "a0,x0\na1,x1\n")]);
        source.claimed_rows = Some(3);
        let mut reader =
            ShardedCorpusReader::new(Arc::new(source), ReaderOptions::default()).unwrap();

        assert_eq!(reader.len(), 3);
        let err = reader.next_pair().unwrap_err();
        assert!(matches!(err, CorpusError::MalformedRecord { row: 2, .. }));
        assert!(err.to_string().contains("pre-scan counted 3"));
    }
}
