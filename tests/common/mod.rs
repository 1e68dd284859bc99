#![allow(dead_code)]

use token_relay::Core::QueueHandle;
use token_relay::QueueBuilder;

/// A private queue that is removed when the test ends, pass or fail.
pub struct TempQueue(pub QueueHandle);

impl TempQueue {
    pub fn new() -> Self {
        Self(QueueBuilder::new().private().build_queue().unwrap())
    }

    pub fn with_capacity(bytes: u64) -> Self {
        Self(
            QueueBuilder::new()
                .private()
                .with_capacity_bytes(bytes)
                .build_queue()
                .unwrap(),
        )
    }

    pub fn handle(&self) -> QueueHandle {
        self.0
    }
}

impl Drop for TempQueue {
    fn drop(&mut self) {
        let _ = self.0.remove();
    }
}
