//! Recording Session State Machine
//!
//! Idle ⇄ Recording(file). Appends come from the acquisition loop under a
//! tight lock bound so a slow flush can never stall sampling; flushes and
//! exports take progressively longer bounds. A failed flush forces the
//! session back to idle rather than wedging the loop.

use crate::batch::{encode_line, WriteBatch};
use crate::volume::{FileEntry, Volume};
use crate::RecorderError;
use chrono::Local;
use parking_lot::Mutex;
use sample_ring::Sample;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::error;

/// Longest accepted session file name
pub const MAX_FILENAME_LEN: usize = 32;

/// Acquisition-side bound: drop the sample instead of stalling the loop
const APPEND_TIMEOUT: Duration = Duration::from_millis(2);
/// Flush bound: skip and retry on the next trigger
const FLUSH_TIMEOUT: Duration = Duration::from_millis(100);
/// Export bound: report the volume busy to the client
const EXPORT_TIMEOUT: Duration = Duration::from_millis(500);

struct Inner {
    /// Current session file name; empty while idle
    file_name: String,
    batch: WriteBatch,
}

/// Recording facade over the volume: session lifecycle, batched appends
/// and the file operations the command surface exposes.
pub struct Recorder {
    volume: Volume,
    inner: Mutex<Inner>,
    recording: AtomicBool,
}

impl Recorder {
    pub fn new(volume: Volume) -> Self {
        Self {
            volume,
            inner: Mutex::new(Inner {
                file_name: String::new(),
                batch: WriteBatch::new(),
            }),
            recording: AtomicBool::new(false),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.volume.is_mounted()
    }

    pub fn mount(&self) -> Result<(), RecorderError> {
        self.volume.mount()
    }

    pub fn unmount(&self) {
        self.volume.unmount()
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }

    /// Session file name while recording.
    pub fn status(&self) -> Option<String> {
        if !self.is_recording() {
            return None;
        }
        Some(self.inner.lock().file_name.clone())
    }

    /// Begin a session, resolving `raw_name` to a safe file name
    /// (timestamp default when empty). Returns the resolved name.
    pub fn start(&self, raw_name: &str) -> Result<String, RecorderError> {
        if !self.volume.is_mounted() {
            return Err(RecorderError::NotMounted);
        }
        let mut inner = self.inner.lock();
        if self.recording.load(Ordering::Acquire) {
            return Err(RecorderError::AlreadyRecording(inner.file_name.clone()));
        }
        let name = resolve_session_name(raw_name);
        inner.file_name = name.clone();
        self.recording.store(true, Ordering::Release);
        Ok(name)
    }

    /// End the session unconditionally: flush what is staged and clear the
    /// file name. Returns the name the session had (empty when idle).
    pub fn stop(&self) -> String {
        let mut inner = self.inner.lock();
        self.recording.store(false, Ordering::Release);
        self.flush_locked(&mut inner);
        std::mem::take(&mut inner.file_name)
    }

    /// Stage one sample for the active session.
    ///
    /// Returns true when the batch is now full and wants a flush. Skips
    /// silently when idle, unmounted, or the lock is contended past the
    /// append bound (the ring cache still serves live reads).
    pub fn append(&self, sample: Sample) -> bool {
        if !self.is_recording() || !self.volume.is_mounted() {
            return false;
        }
        match self.inner.try_lock_for(APPEND_TIMEOUT) {
            Some(mut inner) => inner.batch.push(sample),
            None => false,
        }
    }

    /// Write the staged batch to the session file.
    pub fn flush(&self) {
        if !self.volume.is_mounted() {
            return;
        }
        if let Some(mut inner) = self.inner.try_lock_for(FLUSH_TIMEOUT) {
            self.flush_locked(&mut inner);
        }
    }

    fn flush_locked(&self, inner: &mut Inner) {
        if inner.file_name.is_empty() || inner.batch.is_empty() || !self.volume.is_mounted() {
            return;
        }
        let file = match self.volume.open_append(&inner.file_name) {
            Ok(file) => file,
            Err(err) => {
                self.recording.store(false, Ordering::Release);
                error!("Failed to open {} for writing: {err}", inner.file_name);
                inner.batch.clear();
                return;
            }
        };
        let mut writer = std::io::BufWriter::new(file);
        let written = inner
            .batch
            .iter()
            .try_for_each(|sample| writer.write_all(encode_line(sample).as_bytes()))
            .and_then(|_| writer.flush());
        if let Err(err) = written {
            self.recording.store(false, Ordering::Release);
            error!("Write to {} failed, recording stopped: {err}", inner.file_name);
        }
        inner.batch.clear();
    }

    /// List data files on the volume.
    pub fn list(&self) -> Result<Vec<FileEntry>, RecorderError> {
        self.volume.list()
    }

    /// Delete a file, refusing the active recording target.
    pub fn delete(&self, name: &str) -> Result<(), RecorderError> {
        if !self.volume.is_mounted() {
            return Err(RecorderError::NotMounted);
        }
        if name.is_empty() {
            return Err(RecorderError::EmptyName);
        }
        {
            let inner = self.inner.lock();
            if self.recording.load(Ordering::Acquire) && inner.file_name == name {
                return Err(RecorderError::ActiveFile);
            }
        }
        self.volume.remove(name)
    }

    /// Open a file for export, flushing first when it is the active
    /// session target.
    ///
    /// The returned size is authoritative: the storage guard is held
    /// across flush, open and stat, so callers can stream exactly `size`
    /// bytes after this returns.
    pub fn export(&self, name: &str) -> Result<(std::fs::File, u64), RecorderError> {
        if !self.volume.is_mounted() {
            return Err(RecorderError::NotMounted);
        }
        let Some(mut inner) = self.inner.try_lock_for(EXPORT_TIMEOUT) else {
            return Err(RecorderError::Busy);
        };
        if self.recording.load(Ordering::Acquire) && inner.file_name == name {
            self.flush_locked(&mut inner);
        }
        if !self.volume.exists(name) {
            return Err(RecorderError::NotFound(name.to_string()));
        }
        let file = self.volume.open_read(name)?;
        let size = file
            .metadata()
            .map_err(|_| RecorderError::OpenFailed(name.to_string()))?
            .len();
        Ok((file, size))
    }
}

fn default_session_name() -> String {
    Local::now().format("data_%Y%m%d_%H%M%S.txt").to_string()
}

/// Reduce a requested name to a safe session file name: basename only,
/// charset `[A-Za-z0-9_.-]`, at most [`MAX_FILENAME_LEN`] chars, with the
/// timestamp default filling in for empty or fully-rejected input.
fn resolve_session_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut name = if trimmed.is_empty() || trimmed == "/" {
        default_session_name()
    } else {
        trimmed.to_string()
    };
    if let Some(idx) = name.rfind('/') {
        name = name[idx + 1..].to_string();
    }
    let mut sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();
    if sanitized.is_empty() {
        sanitized = default_session_name();
    }
    sanitized.truncate(MAX_FILENAME_LEN);
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Read;

    fn sample(ts: u32) -> Sample {
        Sample {
            timestamp_ms: ts,
            ch0_mv: 1.0,
            ch1_mv: 2.0,
            ch2_mv: 3.0,
        }
    }

    fn mounted_recorder() -> (tempfile::TempDir, Recorder) {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new(Volume::new(dir.path()));
        recorder.mount().unwrap();
        (dir, recorder)
    }

    fn read_session_file(dir: &tempfile::TempDir, name: &str) -> String {
        std::fs::read_to_string(dir.path().join(name)).unwrap()
    }

    #[test]
    fn test_start_requires_mount() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new(Volume::new(dir.path()));
        assert!(matches!(
            recorder.start("run.txt"),
            Err(RecorderError::NotMounted)
        ));
    }

    #[test]
    fn test_start_stop_cycle_writes_batch() {
        let (dir, recorder) = mounted_recorder();
        let name = recorder.start("run1.txt").unwrap();
        assert_eq!(name, "run1.txt");
        assert_eq!(recorder.status().as_deref(), Some("run1.txt"));

        for ts in 0..5 {
            assert!(!recorder.append(sample(ts)));
        }
        assert_eq!(recorder.stop(), "run1.txt");
        assert_eq!(recorder.status(), None);

        let contents = read_session_file(&dir, "run1.txt");
        assert_eq!(contents.lines().count(), 5);
        assert!(contents.starts_with("0; 1.0; 2.0; 3.0\n"));
    }

    #[test]
    fn test_second_start_is_rejected() {
        let (_dir, recorder) = mounted_recorder();
        recorder.start("a.txt").unwrap();
        match recorder.start("b.txt") {
            Err(RecorderError::AlreadyRecording(name)) => assert_eq!(name, "a.txt"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_stop_while_idle_returns_empty_name() {
        let (_dir, recorder) = mounted_recorder();
        assert_eq!(recorder.stop(), "");
    }

    #[test]
    fn test_empty_name_gets_timestamp_default() {
        let (_dir, recorder) = mounted_recorder();
        let name = recorder.start("").unwrap();
        assert!(name.starts_with("data_"));
        assert!(name.ends_with(".txt"));
        assert_eq!(name.len(), "data_20250101_120000.txt".len());
        recorder.stop();
        let slash = recorder.start("/").unwrap();
        assert!(slash.starts_with("data_"));
    }

    #[test]
    fn test_name_sanitation() {
        let (_dir, recorder) = mounted_recorder();
        assert_eq!(recorder.start("../../etc/passwd").unwrap(), "passwd");
        recorder.stop();
        assert_eq!(recorder.start("my file!!.txt").unwrap(), "myfile.txt");
        recorder.stop();
        let long = "x".repeat(40) + ".txt";
        assert_eq!(recorder.start(&long).unwrap().len(), MAX_FILENAME_LEN);
        recorder.stop();
        // nothing valid left: falls back to the timestamp default
        assert!(recorder.start("???").unwrap().starts_with("data_"));
    }

    #[test]
    fn test_full_batch_requests_flush() {
        let (dir, recorder) = mounted_recorder();
        recorder.start("big.txt").unwrap();
        let mut wants_flush = false;
        for ts in 0..crate::BATCH_CAPACITY as u32 {
            wants_flush = recorder.append(sample(ts));
        }
        assert!(wants_flush);
        recorder.flush();
        let contents = read_session_file(&dir, "big.txt");
        assert_eq!(contents.lines().count(), crate::BATCH_CAPACITY);
        // batch emptied: the next append starts a fresh batch
        assert!(!recorder.append(sample(1_000_000)));
        recorder.stop();
    }

    #[test]
    fn test_flush_failure_forces_idle() {
        let (dir, recorder) = mounted_recorder();
        recorder.start("doomed.txt").unwrap();
        recorder.append(sample(1));

        // make the backing directory disappear under the volume
        std::fs::remove_dir_all(dir.path()).unwrap();
        recorder.flush();
        assert!(!recorder.is_recording());
        assert_eq!(recorder.status(), None);

        // remount and confirm a fresh session works
        recorder.mount().unwrap();
        recorder.start("next.txt").unwrap();
        recorder.append(sample(2));
        assert_eq!(recorder.stop(), "next.txt");
        let contents = read_session_file(&dir, "next.txt");
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.starts_with("2; "));
    }

    #[test]
    fn test_delete_guards() {
        let (_dir, recorder) = mounted_recorder();
        assert!(matches!(
            recorder.delete(""),
            Err(RecorderError::EmptyName)
        ));
        let name = recorder.start("active.txt").unwrap();
        assert!(matches!(
            recorder.delete(&name),
            Err(RecorderError::ActiveFile)
        ));
        assert!(matches!(
            recorder.delete("missing.txt"),
            Err(RecorderError::NotFound(_))
        ));
        recorder.append(sample(1));
        recorder.stop();
        recorder.delete("active.txt").unwrap();
        assert!(matches!(
            recorder.delete("active.txt"),
            Err(RecorderError::NotFound(_))
        ));
    }

    #[test]
    fn test_export_flushes_active_session() {
        let (_dir, recorder) = mounted_recorder();
        recorder.start("live.txt").unwrap();
        for ts in 0..3 {
            recorder.append(sample(ts));
        }
        let (mut file, size) = recorder.export("live.txt").unwrap();
        let mut body = String::new();
        file.read_to_string(&mut body).unwrap();
        assert_eq!(size as usize, body.len());
        assert_eq!(body.lines().count(), 3);
        // still recording after an export
        assert!(recorder.is_recording());
        recorder.stop();
    }

    #[test]
    fn test_export_errors() {
        let (_dir, recorder) = mounted_recorder();
        assert!(matches!(
            recorder.export("nope.txt"),
            Err(RecorderError::NotFound(_))
        ));
        recorder.unmount();
        assert!(matches!(
            recorder.export("nope.txt"),
            Err(RecorderError::NotMounted)
        ));
    }

    #[test]
    fn test_unmounted_append_is_dropped() {
        let (_dir, recorder) = mounted_recorder();
        recorder.start("gone.txt").unwrap();
        recorder.unmount();
        assert!(!recorder.append(sample(1)));
    }

    proptest! {
        #[test]
        fn test_resolved_names_are_safe(raw in ".{0,64}") {
            let name = resolve_session_name(&raw);
            prop_assert!(!name.is_empty());
            prop_assert!(name.len() <= MAX_FILENAME_LEN);
            prop_assert!(name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')));
        }
    }
}
