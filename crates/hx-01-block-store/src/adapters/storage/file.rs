use super::memory::scan;
use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// File magic: identifies a Helix key-value log.
const MAGIC: &[u8; 4] = b"HXKV";
/// `[payload_len:u32][crc32:u32]` in front of every record.
const RECORD_HEADER_LENGTH: usize = 8;
const TAG_DELETE: u8 = 0;
const TAG_PUT: u8 = 1;
/// Logs with fewer records than this are never compacted.
const COMPACTION_MIN_RECORDS: usize = 64;

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

/// File-backed key-value store for nodes built without RocksDB.
///
/// Every mutation appends one CRC-framed record and syncs it, so a write
/// costs the size of the change rather than the size of the store. The full
/// map lives in memory and is rebuilt by replaying the log on open.
///
/// Format: `HXKV`, then records of `[payload_len:u32][crc32:u32][payload]`.
/// A payload is a sequence of `[tag:u8][key_len:u32][key]`, with
/// `[value_len:u32][value]` following put tags. Integers are little-endian.
///
/// On open:
/// - a record that runs past the end of the file is a torn append and is cut off
/// - a complete record that fails its checksum makes the store `Corrupted`
/// - a log holding mostly overwritten entries is compacted into a single
///   snapshot record through a temp file and a rename
#[derive(Debug)]
pub struct FileBackedKVStore {
    data: Map,
    path: PathBuf,
    file: File,
    /// Length of the valid log; a failed append is truncated back to it.
    len: u64,
}

impl FileBackedKVStore {
    /// Open the store at `path`, creating an empty log if the file does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KVStoreError> {
        let path = path.as_ref().to_path_buf();

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("[hx-01] 📁 No existing storage file at {}", path.display());
                return Self::rewrite(path, Map::new());
            }
            Err(e) => return Err(KVStoreError::io(e)),
        };

        let replay = replay(&bytes).map_err(|reason| KVStoreError::Corrupted {
            path: path.display().to_string(),
            reason: reason.to_string(),
        })?;
        tracing::info!(
            "[hx-01] 💾 Replayed {} records into {} keys from {} ({} bytes)",
            replay.records,
            replay.data.len(),
            path.display(),
            bytes.len()
        );

        let torn = replay.valid_len < bytes.len();
        if torn {
            tracing::warn!(
                "[hx-01] ⚠️ Dropping {} bytes of a torn record at the end of {}",
                bytes.len() - replay.valid_len,
                path.display()
            );
        }
        if torn || replay.wants_compaction() {
            return Self::rewrite(path, replay.data);
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(KVStoreError::io)?;
        Ok(Self {
            data: replay.data,
            path,
            file,
            len: replay.valid_len as u64,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the log at `path` with one snapshot record of `data`.
    fn rewrite(path: PathBuf, data: Map) -> Result<Self, KVStoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(KVStoreError::io)?;
        }

        let mut bytes = MAGIC.to_vec();
        if !data.is_empty() {
            bytes.extend(encode_record(
                data.iter().map(|(k, v)| (k.as_slice(), Some(v.as_slice()))),
            ));
        }

        let temp_path = path.with_extension("tmp");
        let mut temp = File::create(&temp_path).map_err(KVStoreError::io)?;
        temp.write_all(&bytes).map_err(KVStoreError::io)?;
        temp.sync_all().map_err(KVStoreError::io)?;
        std::fs::rename(&temp_path, &path).map_err(KVStoreError::io)?;

        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(KVStoreError::io)?;
        Ok(Self {
            data,
            path,
            file,
            len: bytes.len() as u64,
        })
    }

    fn append(&mut self, record: &[u8]) -> Result<(), KVStoreError> {
        let written = self
            .file
            .write_all(record)
            .and_then(|()| self.file.sync_data());
        if let Err(e) = written {
            // Whatever part of the record landed must not be replayed.
            if let Err(cut) = self.file.set_len(self.len) {
                tracing::warn!(
                    "[hx-01] ⚠️ Could not cut a partial record from {}: {}",
                    self.path.display(),
                    cut
                );
            }
            return Err(KVStoreError::io(e));
        }
        self.len += record.len() as u64;
        Ok(())
    }
}

struct Replay {
    data: Map,
    records: usize,
    valid_len: usize,
}

impl Replay {
    /// Compact once the log is more than twice the size of its snapshot.
    fn wants_compaction(&self) -> bool {
        let live: usize = self
            .data
            .iter()
            .map(|(k, v)| 1 + 4 + k.len() + 4 + v.len())
            .sum();
        let snapshot = MAGIC.len() + RECORD_HEADER_LENGTH + live;
        self.records >= COMPACTION_MIN_RECORDS && self.valid_len > 2 * snapshot
    }
}

fn encode_record<'a, I>(entries: I) -> Vec<u8>
where
    I: IntoIterator<Item = (&'a [u8], Option<&'a [u8]>)>,
{
    let mut payload = Vec::new();
    for (key, value) in entries {
        match value {
            Some(value) => {
                payload.push(TAG_PUT);
                put_chunk(&mut payload, key);
                put_chunk(&mut payload, value);
            }
            None => {
                payload.push(TAG_DELETE);
                put_chunk(&mut payload, key);
            }
        }
    }

    let mut record = Vec::with_capacity(RECORD_HEADER_LENGTH + payload.len());
    record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    record.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    record.extend_from_slice(&payload);
    record
}

fn put_chunk(buffer: &mut Vec<u8>, chunk: &[u8]) {
    buffer.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
    buffer.extend_from_slice(chunk);
}

fn replay(bytes: &[u8]) -> Result<Replay, &'static str> {
    let mut cursor = bytes.strip_prefix(MAGIC.as_slice()).ok_or("bad magic")?;
    let mut replay = Replay {
        data: Map::new(),
        records: 0,
        valid_len: MAGIC.len(),
    };

    while cursor.len() >= RECORD_HEADER_LENGTH {
        let (header, rest) = cursor.split_at(RECORD_HEADER_LENGTH);
        let len = read_u32(&header[..4])? as usize;
        let checksum = read_u32(&header[4..])?;
        if rest.len() < len {
            break;
        }
        let (payload, rest) = rest.split_at(len);
        if crc32fast::hash(payload) != checksum {
            return Err("record checksum mismatch");
        }
        apply_payload(&mut replay.data, payload)?;

        cursor = rest;
        replay.records += 1;
        replay.valid_len += RECORD_HEADER_LENGTH + len;
    }
    Ok(replay)
}

fn apply_payload(data: &mut Map, mut payload: &[u8]) -> Result<(), &'static str> {
    while let Some((&tag, rest)) = payload.split_first() {
        payload = rest;
        let key = take_chunk(&mut payload)?;
        match tag {
            TAG_PUT => {
                let value = take_chunk(&mut payload)?;
                data.insert(key, value);
            }
            TAG_DELETE => {
                data.remove(&key);
            }
            _ => return Err("unknown record tag"),
        }
    }
    Ok(())
}

fn read_u32(bytes: &[u8]) -> Result<u32, &'static str> {
    Ok(u32::from_le_bytes(
        bytes.try_into().map_err(|_| "truncated length prefix")?,
    ))
}

fn take_chunk(cursor: &mut &[u8]) -> Result<Vec<u8>, &'static str> {
    if cursor.len() < 4 {
        return Err("truncated length prefix");
    }
    let (len, rest) = cursor.split_at(4);
    let len = read_u32(len)? as usize;
    if rest.len() < len {
        return Err("truncated entry");
    }
    let (chunk, rest) = rest.split_at(len);
    *cursor = rest;
    Ok(chunk.to_vec())
}

impl KeyValueStore for FileBackedKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.append(&encode_record([(key, Some(value))]))?;
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        if self.data.contains_key(key) {
            self.append(&encode_record([(key, None)]))?;
            self.data.remove(key);
        }
        Ok(())
    }

    /// One record per batch: replay applies all of it or none of it.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        if operations.is_empty() {
            return Ok(());
        }
        let record = encode_record(operations.iter().map(|op| match op {
            BatchOperation::Put { key, value } => (key.as_slice(), Some(value.as_slice())),
            BatchOperation::Delete { key } => (key.as_slice(), None),
        }));
        self.append(&record)?;

        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.data.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        Ok(scan(&self.data, prefix))
    }

    fn flush(&mut self) -> Result<(), KVStoreError> {
        self.file.sync_all().map_err(KVStoreError::io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_len(path: &Path) -> u64 {
        std::fs::metadata(path).unwrap().len()
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.db");

        let mut store = FileBackedKVStore::open(&path).unwrap();
        store
            .atomic_batch_write(vec![
                BatchOperation::put(b"b:1".as_slice(), b"one".as_slice()),
                BatchOperation::put(b"b:2".as_slice(), b"two".as_slice()),
            ])
            .unwrap();
        store.delete(b"b:1").unwrap();
        drop(store);

        let reopened = FileBackedKVStore::open(&path).unwrap();
        assert_eq!(reopened.get(b"b:1").unwrap(), None);
        assert_eq!(reopened.get(b"b:2").unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn test_missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBackedKVStore::open(dir.path().join("absent.db")).unwrap();
        assert!(store.prefix_scan(b"").unwrap().is_empty());
    }

    #[test]
    fn test_writes_append_to_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.db");
        let mut store = FileBackedKVStore::open(&path).unwrap();
        for i in 0..50u32 {
            store.put(format!("b:{i}").as_bytes(), &[1u8; 256]).unwrap();
        }
        let before = file_len(&path);

        store.put(b"m:last", &[9u8; 64]).unwrap();

        let record = encode_record([(b"m:last".as_slice(), Some([9u8; 64].as_slice()))]);
        assert_eq!(file_len(&path), before + record.len() as u64);
    }

    #[test]
    fn test_many_overwrites_compact_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.db");
        let mut store = FileBackedKVStore::open(&path).unwrap();
        for height in 0..200u64 {
            store.put(b"m:last", &height.to_le_bytes()).unwrap();
            store.put(b"m:processing", &[1]).unwrap();
            store.delete(b"m:processing").unwrap();
        }
        drop(store);
        let grown = file_len(&path);

        let mut reopened = FileBackedKVStore::open(&path).unwrap();

        assert!(file_len(&path) < grown / 10);
        assert_eq!(
            reopened.get(b"m:last").unwrap(),
            Some(199u64.to_le_bytes().to_vec())
        );
        assert!(!reopened.exists(b"m:processing").unwrap());

        // Appends continue on the compacted log.
        reopened.put(b"b:1", b"one").unwrap();
        drop(reopened);
        let again = FileBackedKVStore::open(&path).unwrap();
        assert_eq!(again.get(b"b:1").unwrap(), Some(b"one".to_vec()));
        assert_eq!(
            again.get(b"m:last").unwrap(),
            Some(199u64.to_le_bytes().to_vec())
        );
    }

    #[test]
    fn test_torn_tail_is_cut_off() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.db");
        let mut store = FileBackedKVStore::open(&path).unwrap();
        store.put(b"b:1", b"one").unwrap();
        store.put(b"b:2", b"two").unwrap();
        drop(store);
        let valid = file_len(&path);

        // Header promising 100 bytes, followed by only three of them.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&100u32.to_le_bytes()).unwrap();
        file.write_all(&0u32.to_le_bytes()).unwrap();
        file.write_all(b"abc").unwrap();
        drop(file);

        let mut store = FileBackedKVStore::open(&path).unwrap();
        assert!(file_len(&path) <= valid);
        assert_eq!(store.get(b"b:2").unwrap(), Some(b"two".to_vec()));

        store.put(b"b:3", b"three").unwrap();
        drop(store);
        let reopened = FileBackedKVStore::open(&path).unwrap();
        assert_eq!(reopened.get(b"b:1").unwrap(), Some(b"one".to_vec()));
        assert_eq!(reopened.get(b"b:3").unwrap(), Some(b"three".to_vec()));
    }

    #[test]
    fn test_empty_batch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.db");
        let mut store = FileBackedKVStore::open(&path).unwrap();
        let before = file_len(&path);

        store.atomic_batch_write(Vec::new()).unwrap();
        store.delete(b"never-written").unwrap();

        assert_eq!(file_len(&path), before);
    }

    #[test]
    fn test_damaged_file_is_reported_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.db");

        let mut store = FileBackedKVStore::open(&path).unwrap();
        store.put(b"m:last", &[7u8; 64]).unwrap();
        drop(store);

        let mut bytes = std::fs::read(&path).unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let err = FileBackedKVStore::open(&path).unwrap_err();
        assert!(matches!(err, KVStoreError::Corrupted { .. }));
    }

    #[test]
    fn test_truncated_file_is_reported_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.db");
        std::fs::write(&path, b"HX").unwrap();

        assert!(matches!(
            FileBackedKVStore::open(&path),
            Err(KVStoreError::Corrupted { .. })
        ));
    }
}
