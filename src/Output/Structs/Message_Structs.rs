// Queue message layouts. Both follow the System V `msgbuf` convention: a
// `c_long` type word followed by the payload, here a run of native-endian i32.

use crate::Output::layout::{MAX_BSZ, MAX_DRAFT_TOKENS, MSG_TYPE, SPECULATE_MAX_BSZ};
use std::mem::size_of;

/// A message that can be handed to `msgsnd`/`msgrcv` as-is.
///
/// # Safety
/// Implementors must be `#[repr(C)]`, start with a `c_long` type word, and
/// consist only of plain integers so any byte pattern the kernel writes is a
/// valid value.
pub unsafe trait WireMessage {
    /// Bytes following the type word (the `msgsz` argument).
    const PAYLOAD_BYTES: usize;
}

/// Normal decoding: one token per sequence.
///
/// Token slots at or beyond `batch_size` hold whatever the previous send
/// left there; readers must not look past `batch_size`.
#[repr(C)]
#[derive(Clone)]
pub struct NormalMessage {
    pub mtype: libc::c_long,
    pub stop_flag: i32,
    pub batch_size: i32,
    pub tokens: [i32; MAX_BSZ],
}

/// Speculative decoding: accepted-token counts plus a row-major
/// `[sequence][draft slot]` grid, both zero-padded past `batch_size`.
#[repr(C)]
#[derive(Clone)]
pub struct SpeculativeMessage {
    pub mtype: libc::c_long,
    pub stop_flag: i32,
    pub batch_size: i32,
    pub accept_num: [i32; SPECULATE_MAX_BSZ],
    pub draft_tokens: [i32; SPECULATE_MAX_BSZ * MAX_DRAFT_TOKENS],
}

unsafe impl WireMessage for NormalMessage {
    const PAYLOAD_BYTES: usize = size_of::<NormalMessage>() - size_of::<libc::c_long>();
}

unsafe impl WireMessage for SpeculativeMessage {
    const PAYLOAD_BYTES: usize = size_of::<SpeculativeMessage>() - size_of::<libc::c_long>();
}

impl NormalMessage {
    pub fn zeroed() -> Box<Self> {
        Box::new(Self {
            mtype: MSG_TYPE,
            stop_flag: 0,
            batch_size: 0,
            tokens: [0; MAX_BSZ],
        })
    }
}

impl SpeculativeMessage {
    pub fn zeroed() -> Box<Self> {
        Box::new(Self {
            mtype: MSG_TYPE,
            stop_flag: 0,
            batch_size: 0,
            accept_num: [0; SPECULATE_MAX_BSZ],
            draft_tokens: [0; SPECULATE_MAX_BSZ * MAX_DRAFT_TOKENS],
        })
    }

    /// Draft-token row for one sequence.
    pub fn draft_row(&self, seq: usize) -> &[i32] {
        let start = seq * MAX_DRAFT_TOKENS;
        &self.draft_tokens[start..start + MAX_DRAFT_TOKENS]
    }
}
