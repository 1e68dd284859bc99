pub mod MessageQueue;
pub mod identity;

pub use identity::{global_queue, QueueIdentity, WELL_KNOWN_KEY_PATH, WELL_KNOWN_PROJECT_ID};
pub use MessageQueue::{QueueHandle, QueueStats};
