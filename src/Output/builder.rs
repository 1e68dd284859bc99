use super::{Reader, Writer};
use crate::error::{OutputError, QueueUnavailable};
use crate::Core::identity::{global_queue, QueueIdentity};
use crate::Core::MessageQueue::QueueHandle;
use std::path::PathBuf;

pub struct QueueBuilder {
    identity: QueueIdentity,
    private: bool,
    capacity_bytes: Option<u64>,
}

impl Default for QueueBuilder {
    fn default() -> Self {
        Self {
            identity: QueueIdentity::well_known(),
            private: false,
            capacity_bytes: None, // Keep whatever the queue already has
        }
    }
}

impl QueueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_path(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.identity = QueueIdentity::new(key_path, self.identity.project_id());
        self
    }

    pub fn with_project_id(mut self, project_id: i32) -> Self {
        self.identity = QueueIdentity::new(self.identity.key_path(), project_id);
        self
    }

    /// Use a fresh `IPC_PRIVATE` queue instead of a keyed one.
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    pub fn with_capacity_bytes(mut self, bytes: u64) -> Self {
        self.capacity_bytes = Some(bytes);
        self
    }

    pub fn build_queue(self) -> Result<QueueHandle, OutputError> {
        let queue = if self.private {
            QueueHandle::private().map_err(|e| QueueUnavailable {
                key_path: PathBuf::new(),
                project_id: self.identity.project_id(),
                errno: e.raw_os_error().unwrap_or(libc::EIO),
            })?
        } else if self.identity == QueueIdentity::well_known() {
            global_queue()?
        } else {
            self.identity.open()?
        };

        if let Some(bytes) = self.capacity_bytes {
            queue
                .set_capacity(bytes)
                .map_err(|e| OutputError::queue("set capacity", e))?;
        }
        Ok(queue)
    }

    pub fn build_writer(self) -> Result<Writer, OutputError> {
        Ok(Writer::new(self.build_queue()?))
    }

    pub fn build_reader(self) -> Result<Reader, OutputError> {
        Ok(Reader::new(self.build_queue()?))
    }
}
