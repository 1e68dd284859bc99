// Wire constants shared by the writer and reader processes.
//
// Every value here is part of the binary contract with any other producer or
// consumer attached to the same queue. Changing one breaks interop.

use std::fmt;

/// Maximum batch size carried by a normal-mode message.
pub const MAX_BSZ: usize = 512;

/// Maximum batch size carried by a speculative-mode message.
pub const SPECULATE_MAX_BSZ: usize = 256;

/// Width of one sequence's draft-token row in a speculative message.
pub const MAX_DRAFT_TOKENS: usize = 6;

/// The single transport discriminant (`mtype`) used for every message.
pub const MSG_TYPE: libc::c_long = 1;

/// i32 slots in a normal message: stop flag, batch size, tokens.
pub const NORMAL_MSG_LEN: usize = MAX_BSZ + 2;

/// i32 slots in a speculative message: stop flag, batch size, accept counts,
/// draft-token grid.
pub const SPECULATE_MSG_LEN: usize = SPECULATE_MAX_BSZ * MAX_DRAFT_TOKENS + SPECULATE_MAX_BSZ + 2;

/// Offset of the first accept-count slot in a speculative payload.
pub const ACCEPT_NUM_OFFSET: usize = 2;

/// Offset of the first draft-token slot in a speculative payload.
pub const DRAFT_TOKENS_OFFSET: usize = ACCEPT_NUM_OFFSET + SPECULATE_MAX_BSZ;

/// Capacity of a consumer output buffer able to hold either message shape.
pub const OUTPUT_BUFFER_LEN: usize = if NORMAL_MSG_LEN > SPECULATE_MSG_LEN {
    NORMAL_MSG_LEN
} else {
    SPECULATE_MSG_LEN
};

/// Stop flag: decoding continues.
pub const STOP_CONTINUE: i32 = 1;

/// Stop flag: every sequence has finished.
pub const STOP_FINISHED: i32 = -1;

/// Slot 0 of the output buffer when a non-blocking poll found nothing.
pub const NO_MESSAGE: i64 = -2;

/// Which of the two payload shapes a writer/reader pair agreed on.
///
/// The wire format carries no variant tag, so both processes must be
/// configured with the same mode out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeMode {
    Normal,
    Speculative,
}

impl DecodeMode {
    /// Largest batch size a message of this shape can carry.
    pub const fn max_batch(self) -> usize {
        match self {
            DecodeMode::Normal => MAX_BSZ,
            DecodeMode::Speculative => SPECULATE_MAX_BSZ,
        }
    }

    /// Number of i32 slots in a message of this shape.
    pub const fn msg_len(self) -> usize {
        match self {
            DecodeMode::Normal => NORMAL_MSG_LEN,
            DecodeMode::Speculative => SPECULATE_MSG_LEN,
        }
    }

    pub fn from_speculative(speculative: bool) -> Self {
        if speculative {
            DecodeMode::Speculative
        } else {
            DecodeMode::Normal
        }
    }
}

impl fmt::Display for DecodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeMode::Normal => f.write_str("normal"),
            DecodeMode::Speculative => f.write_str("speculative"),
        }
    }
}

/// Encodes the runtime's "not need stop" flag as a wire stop flag.
pub const fn stop_flag(not_need_stop: bool) -> i32 {
    if not_need_stop {
        STOP_CONTINUE
    } else {
        STOP_FINISHED
    }
}

/// Ranks above zero belong to non-leader participants and never touch the queue.
pub const fn is_leader(rank_id: i64) -> bool {
    rank_id <= 0
}
