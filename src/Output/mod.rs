mod builder;
mod debug;
mod reader;
mod writer;

pub use builder::QueueBuilder;
pub use reader::{OutputView, Reader, RecvStatus};
pub use writer::{SendStatus, StepOutput, Writer};

pub mod layout;

pub mod Structs {
    pub mod Message_Structs;
    pub use Message_Structs::{NormalMessage, SpeculativeMessage, WireMessage}; // re-export for stable path
}
