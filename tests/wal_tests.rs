//! Tests for the write-ahead log
//!
//! These tests verify:
//! - Entry encoding (one JSON object per line)
//! - Appending entries and byte offsets
//! - Sync strategies (EveryWrite, EveryNEntries)
//! - Truncation
//! - Reader handling of blank, corrupt and torn records

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use docstore::config::WalSyncStrategy;
use docstore::store::Record;
use docstore::wal::{Operation, WalReader, WalRecord, WalWriter, RECORD_DELIMITER};
use docstore::DocStoreError;
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.mem");
    (temp_dir, wal_path)
}

fn object(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

fn insert_op(id: &str, n: i64) -> Operation {
    Operation::Insert {
        collection: "items".to_string(),
        record: object(json!({"n": n})),
        id: Some(id.to_string()),
    }
}

fn append_raw(path: &PathBuf, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}

// =============================================================================
// Entry Encoding Tests
// =============================================================================

#[test]
fn test_encode_is_one_json_line() {
    let bytes = insert_op("a", 1).encode().unwrap();

    assert_eq!(*bytes.last().unwrap(), RECORD_DELIMITER);
    assert_eq!(bytes.iter().filter(|&&b| b == RECORD_DELIMITER).count(), 1);

    let value: Value = serde_json::from_slice(&bytes[..bytes.len() - 1]).unwrap();
    assert_eq!(value["op"], json!("insert"));
    assert_eq!(value["collection"], json!("items"));
    assert_eq!(value["id"], json!("a"));
    assert_eq!(value["record"], json!({"n": 1}));
}

#[test]
fn test_encode_escapes_newlines_in_values() {
    let op = Operation::Insert {
        collection: "notes".to_string(),
        record: object(json!({"text": "line one\nline two"})),
        id: Some("x".to_string()),
    };

    let bytes = op.encode().unwrap();
    assert_eq!(bytes.iter().filter(|&&b| b == RECORD_DELIMITER).count(), 1);
    assert_eq!(Operation::decode(&bytes[..bytes.len() - 1]).unwrap(), op);
}

#[test]
fn test_update_and_delete_tags() {
    let update = Operation::Update {
        collection: "c".to_string(),
        filter: object(json!({"a": 1})),
        patch: object(json!({"b": 2})),
    };
    let delete = Operation::Delete {
        collection: "c".to_string(),
        filter: object(json!({})),
    };

    let update_json: Value = serde_json::from_slice(&update.encode().unwrap()).unwrap();
    let delete_json: Value = serde_json::from_slice(&delete.encode().unwrap()).unwrap();

    assert_eq!(update_json["op"], json!("update"));
    assert_eq!(delete_json["op"], json!("delete"));
    assert_eq!(update.kind(), "update");
    assert_eq!(delete.collection(), "c");
}

#[test]
fn test_decode_garbage_is_corruption() {
    let err = Operation::decode(b"{\"op\": \"insert\", \"collec").unwrap_err();
    assert!(matches!(err, DocStoreError::WalCorruption(_)));

    let err = Operation::decode(br#"{"op": "explode", "collection": "c"}"#).unwrap_err();
    assert!(matches!(err, DocStoreError::WalCorruption(_)));
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_write_single_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert!(writer.is_empty());

    let offset = writer.append(&insert_op("a", 1)).unwrap();

    assert_eq!(offset, 0);
    assert_eq!(writer.entries_written(), 1);
    assert_eq!(writer.len(), fs::metadata(&wal_path).unwrap().len());
}

#[test]
fn test_offsets_are_byte_positions() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    let first_len = insert_op("a", 1).encode().unwrap().len() as u64;
    let first = writer.append(&insert_op("a", 1)).unwrap();
    let second = writer.append(&insert_op("b", 2)).unwrap();

    assert_eq!(first, 0);
    assert_eq!(second, first_len);
}

#[test]
fn test_reopen_continues_at_end() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(&insert_op("a", 1)).unwrap();
        writer.close().unwrap();
    }

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let offset = writer.append(&insert_op("b", 2)).unwrap();
    assert!(offset > 0);
    assert_eq!(writer.entries_written(), 1);

    let ops = WalReader::read_operations(&wal_path).unwrap();
    assert_eq!(ops, vec![insert_op("a", 1), insert_op("b", 2)]);
}

#[test]
fn test_open_creates_parent_directory() {
    let temp = TempDir::new().unwrap();
    let wal_path = temp.path().join("nested").join("dir").join("data.mem");

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(&insert_op("a", 1)).unwrap();

    assert!(wal_path.exists());
}

#[test]
fn test_open_seals_undelimited_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::write(&wal_path, br#"{"op":"insert","collec"#).unwrap();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(&insert_op("a", 1)).unwrap();

    // The garbage is its own (corrupt) record; the new entry stays intact
    let records: Vec<_> = WalReader::open(&wal_path).unwrap().collect();
    assert_eq!(records.len(), 2);
    assert!(matches!(records[0], WalRecord::Corrupt { .. }));
    assert!(matches!(&records[1], WalRecord::Entry { operation, .. } if *operation == insert_op("a", 1)));
}

#[test]
#[cfg(target_os = "linux")]
fn test_failed_append_is_not_counted_and_blocks_later_appends() {
    // Every write to /dev/full fails with ENOSPC, and it cannot be truncated
    let dev_full = Path::new("/dev/full");
    if !dev_full.exists() {
        return;
    }

    let mut writer = WalWriter::open(dev_full, WalSyncStrategy::EveryWrite).unwrap();

    let err = writer.append(&insert_op("a", 1)).unwrap_err();
    assert!(matches!(err, DocStoreError::WalWrite(_)), "{:?}", err);
    assert_eq!(writer.len(), 0);
    assert_eq!(writer.entries_written(), 0);
    assert_eq!(writer.uncommitted_count(), 0);

    // The rollback failed, so appends stay refused until it succeeds
    let err = writer.append(&insert_op("b", 2)).unwrap_err();
    assert!(matches!(err, DocStoreError::WalWrite(_)), "{:?}", err);
    assert_eq!(writer.entries_written(), 0);
}

// =============================================================================
// Sync Strategy Tests
// =============================================================================

#[test]
fn test_every_write_leaves_nothing_uncommitted() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    for i in 0..5 {
        writer.append(&insert_op(&format!("id{}", i), i)).unwrap();
        assert_eq!(writer.uncommitted_count(), 0);
    }
}

#[test]
fn test_every_n_entries_batches_syncs() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer =
        WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 3 }).unwrap();

    writer.append(&insert_op("a", 1)).unwrap();
    assert_eq!(writer.uncommitted_count(), 1);
    writer.append(&insert_op("b", 2)).unwrap();
    assert_eq!(writer.uncommitted_count(), 2);
    writer.append(&insert_op("c", 3)).unwrap();
    assert_eq!(writer.uncommitted_count(), 0);

    writer.append(&insert_op("d", 4)).unwrap();
    assert_eq!(writer.uncommitted_count(), 1);
    writer.sync().unwrap();
    assert_eq!(writer.uncommitted_count(), 0);
}

// =============================================================================
// Truncation Tests
// =============================================================================

#[test]
fn test_truncate_empties_log() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    writer.append(&insert_op("a", 1)).unwrap();
    writer.append(&insert_op("b", 2)).unwrap();
    writer.truncate().unwrap();

    assert!(writer.is_empty());
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);
    assert!(WalReader::read_operations(&wal_path).unwrap().is_empty());
}

#[test]
fn test_append_after_truncate_starts_at_zero() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    writer.append(&insert_op("a", 1)).unwrap();
    writer.truncate().unwrap();
    let offset = writer.append(&insert_op("b", 2)).unwrap();

    assert_eq!(offset, 0);
    assert_eq!(
        WalReader::read_operations(&wal_path).unwrap(),
        vec![insert_op("b", 2)]
    );
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_read_missing_file_is_empty() {
    let (_temp, wal_path) = setup_temp_wal();

    let reader = WalReader::open(&wal_path).unwrap();
    assert_eq!(reader.total_len(), 0);
    assert_eq!(reader.count(), 0);
}

#[test]
fn test_read_entries_in_order() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let ops: Vec<_> = (0..10).map(|i| insert_op(&format!("id{}", i), i)).collect();
    let mut offsets = vec![];
    for op in &ops {
        offsets.push(writer.append(op).unwrap());
    }

    let records: Vec<_> = WalReader::open(&wal_path).unwrap().collect();
    assert_eq!(records.len(), 10);
    for (i, record) in records.into_iter().enumerate() {
        assert_eq!(
            record,
            WalRecord::Entry {
                offset: offsets[i],
                operation: ops[i].clone(),
            }
        );
    }
}

#[test]
fn test_reader_skips_blank_lines() {
    let line = insert_op("a", 1).encode().unwrap();
    let mut data = b"\n   \n".to_vec();
    data.extend_from_slice(&line);
    data.extend_from_slice(b"\n");

    let records: Vec<_> = WalReader::from_bytes(data).collect();
    assert_eq!(records.len(), 1);
    assert!(matches!(records[0], WalRecord::Entry { offset: 5, .. }));
}

#[test]
fn test_reader_reports_corrupt_middle_record() {
    let mut data = insert_op("a", 1).encode().unwrap();
    let corrupt_offset = data.len() as u64;
    data.extend_from_slice(b"{not json at all\n");
    data.extend_from_slice(&insert_op("b", 2).encode().unwrap());

    let records: Vec<_> = WalReader::from_bytes(data).collect();
    assert_eq!(records.len(), 3);
    assert!(matches!(records[0], WalRecord::Entry { .. }));
    assert!(matches!(records[1], WalRecord::Corrupt { offset, .. } if offset == corrupt_offset));
    assert!(matches!(&records[2], WalRecord::Entry { operation, .. } if *operation == insert_op("b", 2)));
}

#[test]
fn test_reader_reports_torn_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(&insert_op("a", 1)).unwrap();
    let good_len = writer.len();
    drop(writer);

    append_raw(&wal_path, br#"{"op":"insert","collection":"it"#);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert_eq!(reader.delimited_len(), good_len);
    assert!(reader.total_len() > good_len);

    assert!(matches!(reader.next_record(), Some(WalRecord::Entry { .. })));
    match reader.next_record() {
        Some(WalRecord::TornTail { offset, len }) => {
            assert_eq!(offset, good_len);
            assert_eq!(offset + len, reader.total_len());
        }
        other => panic!("expected torn tail, got {:?}", other),
    }
    assert!(reader.next_record().is_none());
}

#[test]
fn test_read_operations_skips_damage() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(&insert_op("a", 1)).unwrap();
    drop(writer);
    append_raw(&wal_path, b"garbage\n");
    append_raw(&wal_path, &insert_op("b", 2).encode().unwrap());
    append_raw(&wal_path, b"{\"op\":");

    let ops = WalReader::read_operations(&wal_path).unwrap();
    assert_eq!(ops, vec![insert_op("a", 1), insert_op("b", 2)]);
}
