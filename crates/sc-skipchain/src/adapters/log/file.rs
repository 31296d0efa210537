use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::{SkipBlock, StoreError};
use crate::ports::outbound::BlockLog;

/// Record header: `len:u32 LE` then `crc32:u32 LE`.
const RECORD_HEADER: usize = 8;

/// File name used inside a node's data directory.
pub const LOG_FILE_NAME: &str = "blocks.log";

/// Append-only block file.
///
/// Each record is `[len:u32 LE][crc32:u32 LE][bincode(SkipBlock)]`. Every
/// append is followed by `sync_data`, so an `Ok` append survives a crash.
/// On load, a truncated final record (torn write) is cut off; a complete
/// record whose checksum fails is reported as corruption.
pub struct FileLog {
    file: File,
    path: PathBuf,
}

impl FileLog {
    /// Open or create the log at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(&path, e))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;
        Ok(Self { file, path })
    }

    /// Open `blocks.log` inside `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        Self::open(dir.as_ref().join(LOG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockLog for FileLog {
    fn load(&mut self) -> Result<Vec<SkipBlock>, StoreError> {
        let mut bytes = Vec::new();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_end(&mut bytes))
            .map_err(|e| io_error(&self.path, e))?;

        let mut blocks = Vec::new();
        let mut cursor = 0usize;
        while cursor < bytes.len() {
            if cursor + RECORD_HEADER > bytes.len() {
                break;
            }
            let len = u32::from_le_bytes(read_u32(&bytes, cursor)) as usize;
            let crc = u32::from_le_bytes(read_u32(&bytes, cursor + 4));
            let start = cursor + RECORD_HEADER;
            if start + len > bytes.len() {
                break;
            }
            let body = &bytes[start..start + len];
            if crc32fast::hash(body) != crc {
                return Err(StoreError::Log(format!(
                    "corrupt record at offset {} in {}",
                    cursor,
                    self.path.display()
                )));
            }
            let block: SkipBlock = bincode::deserialize(body).map_err(|e| {
                StoreError::Log(format!("undecodable record at offset {}: {}", cursor, e))
            })?;
            blocks.push(block);
            cursor = start + len;
        }

        if cursor < bytes.len() {
            warn!(
                "[sc-store] Truncating torn record at offset {} in {} ({} trailing bytes)",
                cursor,
                self.path.display(),
                bytes.len() - cursor
            );
            self.file
                .set_len(cursor as u64)
                .and_then(|_| self.file.sync_all())
                .map_err(|e| io_error(&self.path, e))?;
        }

        if !blocks.is_empty() {
            info!(
                "[sc-store] 💾 Loaded {} record(s) from {}",
                blocks.len(),
                self.path.display()
            );
        }
        Ok(blocks)
    }

    fn append(&mut self, block: &SkipBlock) -> Result<(), StoreError> {
        let body = bincode::serialize(block).map_err(|e| StoreError::Log(e.to_string()))?;
        let len = u32::try_from(body.len())
            .map_err(|_| StoreError::Log(format!("record too large: {} bytes", body.len())))?;

        let mut record = Vec::with_capacity(RECORD_HEADER + body.len());
        record.extend_from_slice(&len.to_le_bytes());
        record.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        record.extend_from_slice(&body);

        self.write_record(&record, |file, bytes| file.write_all(bytes))
    }
}

impl FileLog {
    /// Write one framed record and sync it. A failed write is cut back off
    /// so the next record starts on a clean boundary.
    fn write_record<F>(&mut self, record: &[u8], write: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut File, &[u8]) -> io::Result<()>,
    {
        let before = self
            .file
            .metadata()
            .map_err(|e| io_error(&self.path, e))?
            .len();
        let written = write(&mut self.file, record).and_then(|_| self.file.sync_data());
        if let Err(e) = written {
            match self.file.set_len(before) {
                Ok(()) => warn!(
                    "[sc-store] Append to {} failed; rolled back to {} bytes",
                    self.path.display(),
                    before
                ),
                Err(rollback) => warn!(
                    "[sc-store] Append to {} failed and rollback failed too: {}",
                    self.path.display(),
                    rollback
                ),
            }
            return Err(io_error(&self.path, e));
        }
        Ok(())
    }
}

fn read_u32(bytes: &[u8], at: usize) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(&bytes[at..at + 4]);
    out
}

fn io_error(path: &Path, e: io::Error) -> StoreError {
    StoreError::Log(format!("{}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestChain;

    #[test]
    fn test_append_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let chain = TestChain::build(4, 2);

        let mut log = FileLog::in_dir(dir.path()).unwrap();
        for block in &chain.blocks {
            log.append(block).unwrap();
        }
        drop(log);

        let mut reopened = FileLog::in_dir(dir.path()).unwrap();
        assert_eq!(reopened.load().unwrap(), chain.blocks);
    }

    #[test]
    fn test_empty_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = FileLog::open(dir.path().join("nested/blocks.log")).unwrap();
        assert!(log.load().unwrap().is_empty());
    }

    #[test]
    fn test_torn_tail_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let chain = TestChain::build(2, 1);
        let path = dir.path().join(LOG_FILE_NAME);

        let mut log = FileLog::open(&path).unwrap();
        log.append(&chain.blocks[0]).unwrap();
        log.append(&chain.blocks[1]).unwrap();
        drop(log);

        let full = std::fs::metadata(&path).unwrap().len();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(full - 5).unwrap();
        drop(file);

        let mut log = FileLog::open(&path).unwrap();
        assert_eq!(log.load().unwrap(), vec![chain.blocks[0].clone()]);

        // The torn bytes are gone; new appends land after the good record.
        log.append(&chain.blocks[1]).unwrap();
        assert_eq!(log.load().unwrap(), chain.blocks);
    }

    #[test]
    fn test_failed_append_leaves_no_partial_record() {
        let dir = tempfile::tempdir().unwrap();
        let chain = TestChain::build(3, 1);
        let path = dir.path().join(LOG_FILE_NAME);

        let mut log = FileLog::open(&path).unwrap();
        log.append(&chain.blocks[0]).unwrap();
        let good = std::fs::metadata(&path).unwrap().len();

        // Half the record reaches the disk before the write fails.
        let body = bincode::serialize(&chain.blocks[1]).unwrap();
        let result = log.write_record(&body, |file, bytes| {
            file.write_all(&bytes[..bytes.len() / 2])?;
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        });
        assert!(matches!(result, Err(StoreError::Log(msg)) if msg.contains("disk full")));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), good);

        log.append(&chain.blocks[1]).unwrap();
        log.append(&chain.blocks[2]).unwrap();
        drop(log);

        let mut reopened = FileLog::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap(), chain.blocks);
    }

    #[test]
    fn test_corrupt_record_detected() {
        let dir = tempfile::tempdir().unwrap();
        let chain = TestChain::build(1, 1);
        let path = dir.path().join(LOG_FILE_NAME);

        let mut log = FileLog::open(&path).unwrap();
        log.append(&chain.blocks[0]).unwrap();
        drop(log);

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        let mut log = FileLog::open(&path).unwrap();
        assert!(matches!(log.load(), Err(StoreError::Log(msg)) if msg.contains("corrupt")));
    }
}
