//! Write-ahead log hook.
//!
//! The buffer pool calls [`LogManager::log_write`] and then
//! [`LogManager::force`] before writing a dirty page to its table file.
//! What the log does with those records (group commit, replay, truncation)
//! is the log's own business.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::common::{Error, PageId, Result, TableId, TransactionId};

/// Receiver of before/after page images.
pub trait LogManager: Send + Sync {
    /// Record that `tid` changed `pid` from `before` to `after`.
    fn log_write(&self, tid: TransactionId, pid: PageId, before: &[u8], after: &[u8])
        -> Result<()>;

    /// Make every record written so far durable.
    fn force(&self) -> Result<()>;
}

/// A log that drops every record. For tests and throwaway databases.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl LogManager for NullLog {
    fn log_write(&self, _: TransactionId, _: PageId, _: &[u8], _: &[u8]) -> Result<()> {
        Ok(())
    }

    fn force(&self) -> Result<()> {
        Ok(())
    }
}

/// One page update read back from a [`LogFile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub tid: TransactionId,
    pub pid: PageId,
    pub before: Vec<u8>,
    pub after: Vec<u8>,
}

/// Append-only log of page images.
///
/// # Record Layout (little-endian)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     payload length
/// 4       4     CRC32 of the payload
/// 8       8     transaction id        ┐
/// 16      4     table id              │
/// 20      4     page number           │ payload
/// 24      4     before-image length   │
/// 28      ..    before image          │
/// ..      ..    after image           ┘
/// ```
pub struct LogFile {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl LogFile {
    const FRAME_HEADER: usize = 8;
    const PAYLOAD_HEADER: usize = 20;

    /// Open a log for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(tid: TransactionId, pid: PageId, before: &[u8], after: &[u8]) -> Vec<u8> {
        let payload_len = Self::PAYLOAD_HEADER + before.len() + after.len();
        let mut payload = Vec::with_capacity(payload_len);
        payload.extend_from_slice(&tid.as_u64().to_le_bytes());
        payload.extend_from_slice(&pid.table_id().0.to_le_bytes());
        payload.extend_from_slice(&pid.page_number().to_le_bytes());
        payload.extend_from_slice(&(before.len() as u32).to_le_bytes());
        payload.extend_from_slice(before);
        payload.extend_from_slice(after);

        let mut frame = Vec::with_capacity(Self::FRAME_HEADER + payload_len);
        frame.extend_from_slice(&(payload_len as u32).to_le_bytes());
        frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        frame.extend_from_slice(&payload);
        frame
    }

    /// Read back every record, oldest first.
    ///
    /// # Errors
    /// - `Error::CorruptLog` for a truncated record or a checksum mismatch
    pub fn read_records(&self) -> Result<Vec<LogRecord>> {
        self.writer.lock().flush()?;

        let mut buf = Vec::new();
        File::open(&self.path)?.read_to_end(&mut buf)?;

        let mut records = Vec::new();
        let mut offset = 0usize;
        while offset < buf.len() {
            let corrupt = Error::CorruptLog {
                offset: offset as u64,
            };
            let Some(header) = buf.get(offset..offset + Self::FRAME_HEADER) else {
                return Err(corrupt);
            };
            let len = u32_at(header, 0) as usize;
            let crc = u32_at(header, 4);
            let start = offset + Self::FRAME_HEADER;
            let Some(payload) = buf.get(start..start + len) else {
                return Err(corrupt);
            };
            if len < Self::PAYLOAD_HEADER || crc32fast::hash(payload) != crc {
                return Err(corrupt);
            }

            let tid = TransactionId::from_raw(u64::from_le_bytes(
                payload[0..8].try_into().map_err(|_| Error::CorruptLog {
                    offset: offset as u64,
                })?,
            ));
            let pid = PageId::new(TableId(u32_at(payload, 8)), u32_at(payload, 12));
            let before_len = u32_at(payload, 16) as usize;
            let images = &payload[Self::PAYLOAD_HEADER..];
            if before_len > images.len() {
                return Err(corrupt);
            }
            records.push(LogRecord {
                tid,
                pid,
                before: images[..before_len].to_vec(),
                after: images[before_len..].to_vec(),
            });
            offset = start + len;
        }
        Ok(records)
    }
}

fn u32_at(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

impl LogManager for LogFile {
    fn log_write(
        &self,
        tid: TransactionId,
        pid: PageId,
        before: &[u8],
        after: &[u8],
    ) -> Result<()> {
        let frame = Self::encode(tid, pid, before, after);
        self.writer.lock().write_all(&frame)?;
        Ok(())
    }

    fn force(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.flush()?;
        writer.get_ref().sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn pid(n: u32) -> PageId {
        PageId::new(TableId(4), n)
    }

    #[test]
    fn test_records_read_back_in_order() {
        let dir = tempdir().unwrap();
        let log = LogFile::open(dir.path().join("wal.log")).unwrap();
        let t1 = TransactionId::next();
        let t2 = TransactionId::next();

        log.log_write(t1, pid(0), &[0; 8], &[1; 8]).unwrap();
        log.log_write(t2, pid(3), &[2; 4], &[3; 4]).unwrap();
        log.force().unwrap();

        let records = log.read_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tid, t1);
        assert_eq!(records[0].pid, pid(0));
        assert_eq!(records[0].before, vec![0; 8]);
        assert_eq!(records[0].after, vec![1; 8]);
        assert_eq!(records[1].tid, t2);
        assert_eq!(records[1].pid, pid(3));
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let tid = TransactionId::next();

        {
            let log = LogFile::open(&path).unwrap();
            log.log_write(tid, pid(0), b"a", b"b").unwrap();
            log.force().unwrap();
        }

        let log = LogFile::open(&path).unwrap();
        log.log_write(tid, pid(1), b"c", b"d").unwrap();
        let records = log.read_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].after, b"d".to_vec());
    }

    #[test]
    fn test_checksum_mismatch_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let log = LogFile::open(&path).unwrap();
        log.log_write(TransactionId::next(), pid(0), &[7; 16], &[8; 16])
            .unwrap();
        log.force().unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            log.read_records(),
            Err(Error::CorruptLog { offset: 0 })
        ));
    }

    #[test]
    fn test_truncated_tail_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let log = LogFile::open(&path).unwrap();
        log.log_write(TransactionId::next(), pid(0), &[1; 4], &[2; 4])
            .unwrap();
        log.force().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        assert!(log.read_records().is_err());
    }

    #[test]
    fn test_null_log_accepts_everything() {
        let log = NullLog;
        log.log_write(TransactionId::next(), pid(0), &[], &[]).unwrap();
        log.force().unwrap();
    }
}
