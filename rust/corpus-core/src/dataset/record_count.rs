// rust/corpus-core/src/dataset/record_count.rs

use std::io::Read;

/// Buffer size used while scanning a shard for records
const SCAN_BUFFER_SIZE: usize = 64 * 1024; // 64KB

/// Count the records in a comma-delimited stream.
///
/// Records are split with the same CSV rules the reader parses shards with,
/// so quoted fields spanning several lines count once and blank lines are
/// skipped. A final record without a trailing newline counts.
pub fn count_records(reader: impl Read) -> std::io::Result<u64> {
    let mut records = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .buffer_capacity(SCAN_BUFFER_SIZE)
        .from_reader(reader);

    let mut record = csv::ByteRecord::new();
    let mut count = 0u64;
    while records.read_byte_record(&mut record)? {
        count += 1;
    }

    Ok(count)
}
