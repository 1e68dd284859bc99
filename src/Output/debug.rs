use super::Structs::{NormalMessage, SpeculativeMessage};
use super::{Reader, Writer};
use std::fmt;

// Debug proxy implementations that call the standalone debug functions
impl fmt::Debug for NormalMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_normal_message(self, f)
    }
}

impl fmt::Debug for SpeculativeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_speculative_message(self, f)
    }
}

impl fmt::Debug for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_writer(self, f)
    }
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_reader(self, f)
    }
}
