//! Recording Layer
//!
//! Owns the removable storage volume, the fixed-size write batch and the
//! recording session state machine. Samples flow in from the acquisition
//! loop; files flow out through listing, deletion and export.

mod batch;
mod session;
mod volume;

pub use batch::{encode_line, WriteBatch, BATCH_CAPACITY};
pub use session::{Recorder, MAX_FILENAME_LEN};
pub use volume::{FileEntry, Volume};

use thiserror::Error;

/// Recording and volume errors
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("volume not mounted")]
    NotMounted,
    #[error("recording already active in {0}")]
    AlreadyRecording(String),
    #[error("empty file name")]
    EmptyName,
    #[error("file is the active recording target")]
    ActiveFile,
    #[error("file {0} not found")]
    NotFound(String),
    #[error("failed to open {0}")]
    OpenFailed(String),
    #[error("storage busy")]
    Busy,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
