use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::Output::layout::DecodeMode;

/// The queue identity could not be resolved or the queue could not be created.
///
/// Fatal for the calling process; it is kept `Clone` so the cached outcome of
/// the process-wide queue can be reported on every call.
#[derive(Debug, Clone, Error)]
#[error("message queue unavailable (key path {key_path:?}, project id {project_id}): {}", os_error(.errno))]
pub struct QueueUnavailable {
    pub key_path: PathBuf,
    pub project_id: i32,
    pub errno: i32,
}

impl QueueUnavailable {
    pub fn kind(&self) -> io::ErrorKind {
        os_error(&self.errno).kind()
    }
}

fn os_error(errno: &i32) -> io::Error {
    io::Error::from_raw_os_error(*errno)
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error(transparent)]
    QueueUnavailable(#[from] QueueUnavailable),

    #[error("batch size {batch_size} exceeds the {mode} message limit of {max}")]
    BatchTooLarge {
        mode: DecodeMode,
        batch_size: usize,
        max: usize,
    },

    #[error("token buffer holds {got} values, batch size {batch_size} needs {need}")]
    TokensTooShort {
        batch_size: usize,
        need: usize,
        got: usize,
    },

    #[error("accept-count buffer holds {got} values, batch size {batch_size} needs {batch_size}")]
    AcceptNumTooShort { batch_size: usize, got: usize },

    #[error("output buffer holds {got} slots, a {mode} message needs {need}")]
    OutputTooSmall {
        mode: DecodeMode,
        need: usize,
        got: usize,
    },

    #[error("message queue {op} failed: {source}")]
    Queue {
        op: &'static str,
        #[source]
        source: io::Error,
    },
}

impl OutputError {
    pub(crate) fn queue(op: &'static str, source: io::Error) -> Self {
        OutputError::Queue { op, source }
    }
}
