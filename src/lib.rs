// Module naming follows project convention (Core = OS primitives, Output = step transfer)
#[macro_use]
mod macros;

pub mod error;
pub mod ffi;

#[allow(non_snake_case)]
pub mod Core;
#[allow(non_snake_case)]
pub mod Output;
#[allow(non_snake_case)]
pub mod Debug {
    pub mod StructDebug;
}

pub use error::{OutputError, QueueUnavailable};
pub use Output::layout::DecodeMode;
pub use Output::{OutputView, QueueBuilder, Reader, RecvStatus, SendStatus, StepOutput, Writer};
