// Logging macros for token-relay
//
// These forward to the tracing crate so call sites stay short.

#![allow(unused_macros)]

// trace! - hot paths such as non-leader short-circuits
macro_rules! trace {
    ($($arg:tt)*) => { ::tracing::trace!($($arg)*) }
}

// debug! - queue resolution, dropped steps
macro_rules! debug {
    ($($arg:tt)*) => { ::tracing::debug!($($arg)*) }
}

// warn! - queue failures that the protocol absorbs
macro_rules! warn {
    ($($arg:tt)*) => { ::tracing::warn!($($arg)*) }
}

// error! - the process cannot reach its queue
macro_rules! error {
    ($($arg:tt)*) => { ::tracing::error!($($arg)*) }
}
