use std::fmt;
use crate::Output::Structs::{NormalMessage, SpeculativeMessage};
use crate::Output::{Reader, Writer};

// Messages hold up to 1794 slots; only the header and the live prefix are shown.

/// Debug function for NormalMessage
///
/// Shows the header and the tokens below `batch_size`. Stale slots past it
/// are deliberately left out.
pub fn debug_normal_message(msg: &NormalMessage, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let live = live_len(msg.batch_size, msg.tokens.len());
    f.debug_struct("NormalMessage")
        .field("mtype", &msg.mtype)
        .field("stop_flag", &msg.stop_flag)
        .field("batch_size", &msg.batch_size)
        .field("tokens", &&msg.tokens[..live])
        .finish()
}

/// Debug function for SpeculativeMessage
///
/// Shows accept counts and one draft row per live sequence.
pub fn debug_speculative_message(msg: &SpeculativeMessage, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let live = live_len(msg.batch_size, msg.accept_num.len());
    let rows: Vec<&[i32]> = (0..live).map(|seq| msg.draft_row(seq)).collect();
    f.debug_struct("SpeculativeMessage")
        .field("mtype", &msg.mtype)
        .field("stop_flag", &msg.stop_flag)
        .field("batch_size", &msg.batch_size)
        .field("accept_num", &&msg.accept_num[..live])
        .field("draft_tokens", &rows)
        .finish()
}

pub fn debug_writer(writer: &Writer, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Writer")
        .field("queue", &writer.queue())
        .finish_non_exhaustive()
}

pub fn debug_reader(reader: &Reader, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Reader")
        .field("queue", &reader.queue())
        .finish_non_exhaustive()
}

fn live_len(batch_size: i32, cap: usize) -> usize {
    (batch_size.max(0) as usize).min(cap)
}
