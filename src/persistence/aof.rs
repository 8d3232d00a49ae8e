//! AOF segment manager (spec.md C1, §4.1).
//!
//! Rolling, numbered, size-bounded segment files plus a durable index file
//! listing the live segments. Grounded on
//! `examples/original_source/server/aof.go`: `NewAof`/`loadIndex` (fail-fast
//! on a missing referenced segment, `latestIndex` one past the highest
//! suffix present so a restart always opens a fresh segment), `Log`
//! (shared `createTime` per batch, 1 KiB buffered writer, size-triggered
//! rollover), `flushIndex` (write-`.bak`-then-rename), and the reader's
//! end-of-segment-advance / file-not-found-resets-anchor behavior.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::{info, warn};

const INDEX_FILE: &str = "ledis-aof.index";

#[derive(Debug, Clone, Copy)]
pub struct AofConfig {
    pub max_file_num: usize,
    pub max_file_size: u64,
}

impl Default for AofConfig {
    fn default() -> Self {
        Self {
            max_file_num: 128,
            max_file_size: 1024 * 1024 * 1024,
        }
    }
}

/// A byte position within the rolling log. `file_index = -1` signals "file
/// missing"; a follower resets to `(-1, 0)` to request a full resync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub file_index: i64,
    pub file_offset: i64,
}

impl Anchor {
    pub const MISSING: Anchor = Anchor {
        file_index: -1,
        file_offset: 0,
    };

    pub fn start_of(file_index: i64) -> Self {
        Self {
            file_index,
            file_offset: 0,
        }
    }
}

/// A decoded AOF record: `dbIndex:u8 | fullCommandBytes`.
#[derive(Debug, Clone)]
pub struct Record {
    pub create_time: u32,
    pub db_index: u8,
    pub command: Vec<u8>,
}

/// A record whose payload was too short to decode — spec.md §4.1: "a
/// payload shorter than 1 byte yields a skip-record signal, which the
/// caller may choose to log and continue."
#[derive(Debug, Clone)]
pub enum Frame {
    Record(Record),
    Skip,
}

pub enum ReadOutcome<T> {
    /// Zero or more records, the anchor advanced past them, and the number
    /// of raw bytes consumed.
    Records {
        records: Vec<T>,
        next: Anchor,
        bytes_consumed: u64,
    },
    /// The segment named by the anchor no longer exists; the caller should
    /// reset to [`Anchor::MISSING`] and request a full resync.
    Missing,
}

struct State {
    fnames: Vec<String>,
    latest_index: u64,
    file: Option<BufWriter<File>>,
    fsize: u64,
}

pub struct Aof {
    dir: PathBuf,
    cfg: AofConfig,
    state: Mutex<State>,
}

impl Aof {
    pub async fn open(data_dir: impl AsRef<Path>, cfg: AofConfig) -> anyhow::Result<Self> {
        let dir = data_dir.as_ref().join("aof");
        fs::create_dir_all(&dir).await?;

        let mut fnames = Self::load_index_lines(&dir).await?;
        for name in &fnames {
            let path = dir.join(name);
            if fs::metadata(&path).await.is_err() {
                anyhow::bail!("aof index references missing segment {}", name);
            }
        }

        let aof = Self {
            dir,
            cfg,
            state: Mutex::new(State {
                fnames: Vec::new(),
                latest_index: 1,
                file: None,
                fsize: 0,
            }),
        };

        if aof.arrange_files(&mut fnames).await? {
            aof.flush_index(&fnames).await?;
        }

        let latest_index = if fnames.is_empty() {
            1
        } else {
            let last = fnames.last().unwrap();
            let suffix = last
                .rsplit('.')
                .next()
                .ok_or_else(|| anyhow::anyhow!("invalid aof segment name {}", last))?;
            suffix.parse::<u64>()? + 1
        };

        {
            let mut state = aof.state.lock().await;
            state.fnames = fnames;
            state.latest_index = latest_index;
        }

        Ok(aof)
    }

    fn segment_name(index: u64) -> String {
        format!("ledis-aof.{:07}", index)
    }

    fn segment_path(&self, index: u64) -> PathBuf {
        self.dir.join(Self::segment_name(index))
    }

    async fn load_index_lines(dir: &Path) -> anyhow::Result<Vec<String>> {
        let index_path = dir.join(INDEX_FILE);
        match fs::read_to_string(&index_path).await {
            Ok(data) => Ok(data
                .lines()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .map(|l| l.to_string())
                .collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn flush_index(&self, fnames: &[String]) -> anyhow::Result<()> {
        let index_path = self.dir.join(INDEX_FILE);
        let bak_path = self.dir.join(format!("{}.bak", INDEX_FILE));
        fs::write(&bak_path, fnames.join("\n")).await?;
        fs::rename(&bak_path, &index_path).await?;
        Ok(())
    }

    /// Purge the oldest excess segments if `fnames` exceeds `max_file_num`.
    /// Returns whether anything was pruned (so the caller knows to persist
    /// the index).
    async fn arrange_files(&self, fnames: &mut Vec<String>) -> anyhow::Result<bool> {
        if self.cfg.max_file_num == 0 || fnames.len() <= self.cfg.max_file_num {
            return Ok(false);
        }
        let excess = fnames.len() - self.cfg.max_file_num;
        for name in fnames.drain(0..excess) {
            let path = self.dir.join(&name);
            if let Err(e) = fs::remove_file(&path).await {
                warn!("failed to purge stale aof segment {}: {}", name, e);
            }
        }
        Ok(true)
    }

    async fn open_new_file(&self, state: &mut State) -> anyhow::Result<()> {
        let fname = Self::segment_name(state.latest_index);
        let path = self.dir.join(&fname);
        let file = OpenOptions::new().create(true).append(true).open(&path).await?;

        state.fnames.push(fname);
        self.arrange_files(&mut state.fnames).await?;
        self.flush_index(&state.fnames).await?;

        state.fsize = file.metadata().await?.len();
        state.file = Some(BufWriter::with_capacity(1024, file));
        Ok(())
    }

    /// Atomically append a batch of records sharing one `createTime`
    /// (spec.md §4.1: "records in one call share one timestamp").
    pub async fn append(&self, db_index: u8, commands: &[Vec<u8>]) -> anyhow::Result<()> {
        if commands.is_empty() {
            return Ok(());
        }
        let mut state = self.state.lock().await;
        if state.file.is_none() {
            self.open_new_file(&mut state).await?;
        }

        let create_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32;

        let mut appended = 0u64;
        {
            let writer = state.file.as_mut().unwrap();
            for cmd in commands {
                let mut payload = Vec::with_capacity(1 + cmd.len());
                payload.push(db_index);
                payload.extend_from_slice(cmd);

                writer.write_all(&create_time.to_be_bytes()).await?;
                writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
                writer.write_all(&payload).await?;
                appended += 8 + payload.len() as u64;
            }
            writer.flush().await?;
        }

        state.fsize += appended;
        if state.fsize >= self.cfg.max_file_size {
            state.latest_index += 1;
            state.file = None;
            state.fsize = 0;
        }
        Ok(())
    }

    /// Scan forward from `anchor` for up to `limit` records, returning the
    /// raw `(createTime, payload)` pairs, the advanced anchor, and bytes
    /// consumed. `None` signals the segment at `anchor.file_index` no
    /// longer exists.
    async fn scan_raw(
        &self,
        anchor: Anchor,
        limit: usize,
    ) -> anyhow::Result<Option<(Vec<(u32, Vec<u8>)>, Anchor, u64)>> {
        if anchor.file_index < 0 {
            return Ok(None);
        }

        let mut file_index = anchor.file_index as u64;
        let mut offset = anchor.file_offset as u64;
        let mut out = Vec::new();
        let mut consumed = 0u64;

        loop {
            if out.len() >= limit {
                break;
            }

            let mut file = match File::open(self.segment_path(file_index)).await {
                Ok(f) => f,
                Err(_) => return Ok(None),
            };
            file.seek(std::io::SeekFrom::Start(offset)).await?;

            loop {
                if out.len() >= limit {
                    break;
                }
                let mut header = [0u8; 8];
                match file.read_exact(&mut header).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                    Err(e) => return Err(e.into()),
                }
                let create_time = u32::from_be_bytes(header[0..4].try_into().unwrap());
                let len = u32::from_be_bytes(header[4..8].try_into().unwrap()) as usize;
                let mut payload = vec![0u8; len];
                file.read_exact(&mut payload).await?;

                offset += 8 + len as u64;
                consumed += 8 + len as u64;
                out.push((create_time, payload));
            }

            let latest_index = self.state.lock().await.latest_index;
            if file_index < latest_index {
                file_index += 1;
                offset = 0;
                continue;
            }
            break;
        }

        Ok(Some((
            out,
            Anchor {
                file_index: file_index as i64,
                file_offset: offset as i64,
            },
            consumed,
        )))
    }

    pub async fn read_n(&self, anchor: Anchor, limit: usize) -> anyhow::Result<ReadOutcome<Frame>> {
        match self.scan_raw(anchor, limit).await? {
            None => Ok(ReadOutcome::Missing),
            Some((raw, next, bytes_consumed)) => {
                let records = raw
                    .into_iter()
                    .map(|(create_time, payload)| {
                        if payload.is_empty() {
                            Frame::Skip
                        } else {
                            Frame::Record(Record {
                                create_time,
                                db_index: payload[0],
                                command: payload[1..].to_vec(),
                            })
                        }
                    })
                    .collect();
                Ok(ReadOutcome::Records { records, next, bytes_consumed })
            }
        }
    }

    /// Like `read_n` but copies the raw framed bytes through unchanged,
    /// for a replication reader relaying to a follower.
    pub async fn copy_n(&self, anchor: Anchor, limit: usize) -> anyhow::Result<ReadOutcome<Vec<u8>>> {
        match self.scan_raw(anchor, limit).await? {
            None => Ok(ReadOutcome::Missing),
            Some((raw, next, bytes_consumed)) => {
                let records = raw
                    .into_iter()
                    .map(|(create_time, payload)| {
                        let mut buf = Vec::with_capacity(8 + payload.len());
                        buf.extend_from_slice(&create_time.to_be_bytes());
                        buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
                        buf.extend_from_slice(&payload);
                        buf
                    })
                    .collect();
                Ok(ReadOutcome::Records { records, next, bytes_consumed })
            }
        }
    }

    pub async fn current_segment_index(&self) -> u64 {
        self.state.lock().await.latest_index
    }

    pub async fn current_segment_name(&self) -> String {
        Self::segment_name(self.state.lock().await.latest_index)
    }

    pub async fn current_segment_position(&self) -> u64 {
        self.state.lock().await.fsize
    }

    pub async fn current_anchor(&self) -> Anchor {
        let state = self.state.lock().await;
        Anchor {
            file_index: state.latest_index as i64,
            file_offset: state.fsize as i64,
        }
    }

    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if let Some(mut writer) = state.file.take() {
            let _ = writer.flush().await;
        }
        state.fsize = 0;
        info!("aof closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let aof = Aof::open(dir.path(), AofConfig::default()).await.unwrap();

        aof.append(0, &[b"SET a 1".to_vec(), b"SET b 2".to_vec()]).await.unwrap();

        let outcome = aof.read_n(Anchor::start_of(1), 10).await.unwrap();
        match outcome {
            ReadOutcome::Records { records, .. } => {
                assert_eq!(records.len(), 2);
                match &records[0] {
                    Frame::Record(r) => {
                        assert_eq!(r.db_index, 0);
                        assert_eq!(r.command, b"SET a 1");
                    }
                    Frame::Skip => panic!("unexpected skip"),
                }
            }
            ReadOutcome::Missing => panic!("expected records"),
        }
    }

    #[tokio::test]
    async fn test_reader_advances_across_segment_rollover() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AofConfig {
            max_file_num: 128,
            max_file_size: 16,
        };
        let aof = Aof::open(dir.path(), cfg).await.unwrap();

        aof.append(0, &[b"AAAAAAAA".to_vec()]).await.unwrap();
        aof.append(0, &[b"BBBBBBBB".to_vec()]).await.unwrap();

        let outcome = aof.read_n(Anchor::start_of(1), 10).await.unwrap();
        match outcome {
            ReadOutcome::Records { records, next, .. } => {
                assert_eq!(records.len(), 2);
                assert_eq!(next.file_index, 2);
            }
            ReadOutcome::Missing => panic!("expected records"),
        }
    }

    #[tokio::test]
    async fn test_missing_segment_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let aof = Aof::open(dir.path(), AofConfig::default()).await.unwrap();
        let outcome = aof.read_n(Anchor::start_of(99), 10).await.unwrap();
        assert!(matches!(outcome, ReadOutcome::Missing));
    }

    #[tokio::test]
    async fn test_index_load_fails_fast_on_missing_referenced_segment() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("aof")).await.unwrap();
        fs::write(dir.path().join("aof").join(INDEX_FILE), "ledis-aof.0000001")
            .await
            .unwrap();
        let result = Aof::open(dir.path(), AofConfig::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_restart_always_opens_a_fresh_segment() {
        let dir = tempfile::tempdir().unwrap();
        {
            let aof = Aof::open(dir.path(), AofConfig::default()).await.unwrap();
            aof.append(0, &[b"X".to_vec()]).await.unwrap();
            assert_eq!(aof.current_segment_index().await, 1);
        }
        let aof = Aof::open(dir.path(), AofConfig::default()).await.unwrap();
        assert_eq!(aof.current_segment_index().await, 2);
    }
}
