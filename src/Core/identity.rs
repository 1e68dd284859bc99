// Queue identity: both processes derive the same System V key from a path
// and a project id, independently of anything carried in messages.

use crate::error::QueueUnavailable;
use crate::Core::MessageQueue::QueueHandle;
use lazy_static::lazy_static;
use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Path token the well-known queue is keyed on, resolved against the working
/// directory. Writer and reader must be started from the same directory.
pub const WELL_KNOWN_KEY_PATH: &str = "./";

/// Project salt mixed into the key.
pub const WELL_KNOWN_PROJECT_ID: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueIdentity {
    key_path: PathBuf,
    project_id: i32,
}

impl QueueIdentity {
    pub fn new(key_path: impl Into<PathBuf>, project_id: i32) -> Self {
        Self {
            key_path: key_path.into(),
            project_id,
        }
    }

    pub fn well_known() -> Self {
        Self::new(WELL_KNOWN_KEY_PATH, WELL_KNOWN_PROJECT_ID)
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    pub fn project_id(&self) -> i32 {
        self.project_id
    }

    /// Derive the System V key with `ftok`. The path must exist.
    pub fn key(&self) -> Result<libc::key_t, QueueUnavailable> {
        let c_path = CString::new(self.key_path.as_os_str().as_bytes())
            .map_err(|_| self.unavailable(libc::EINVAL))?;
        let key = unsafe { libc::ftok(c_path.as_ptr(), self.project_id) };
        if key == -1 {
            return Err(self.unavailable_from(io::Error::last_os_error()));
        }
        Ok(key)
    }

    /// Resolve the key and create-or-attach the queue behind it.
    pub fn open(&self) -> Result<QueueHandle, QueueUnavailable> {
        let key = self.key()?;
        let queue = QueueHandle::open(key).map_err(|e| self.unavailable_from(e))?;
        debug!(
            key_path = %self.key_path.display(),
            project_id = self.project_id,
            key,
            msqid = queue.id(),
            "resolved message queue"
        );
        Ok(queue)
    }

    fn unavailable(&self, errno: i32) -> QueueUnavailable {
        QueueUnavailable {
            key_path: self.key_path.clone(),
            project_id: self.project_id,
            errno,
        }
    }

    fn unavailable_from(&self, err: io::Error) -> QueueUnavailable {
        self.unavailable(err.raw_os_error().unwrap_or(libc::EIO))
    }
}

impl Default for QueueIdentity {
    fn default() -> Self {
        Self::well_known()
    }
}

lazy_static! {
    // Resolved on first use and never retried: a failure here is fatal for
    // the process, so every caller sees the same outcome.
    static ref GLOBAL_QUEUE: Result<QueueHandle, QueueUnavailable> = {
        let identity = QueueIdentity::well_known();
        let resolved = identity.open();
        if let Err(e) = &resolved {
            error!(error = %e, "failed to resolve the well-known message queue");
        }
        resolved
    };
}

/// The process-wide queue keyed on [`WELL_KNOWN_KEY_PATH`] and
/// [`WELL_KNOWN_PROJECT_ID`].
pub fn global_queue() -> Result<QueueHandle, QueueUnavailable> {
    GLOBAL_QUEUE.clone()
}
