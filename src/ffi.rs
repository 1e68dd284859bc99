use crate::error::OutputError;
use crate::Core::identity::global_queue;
use crate::Output::layout::{is_leader, DecodeMode, NO_MESSAGE};
use crate::Output::{Reader, RecvStatus, SendStatus, StepOutput, Writer};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::slice;

// Return codes
pub const TOKEN_RELAY_SUCCESS: i32 = 0;
pub const TOKEN_RELAY_EMPTY: i32 = 1;
pub const TOKEN_RELAY_ERROR_NULL_POINTER: i32 = -1;
pub const TOKEN_RELAY_ERROR_INVALID_ARG: i32 = -2;
pub const TOKEN_RELAY_ERROR_QUEUE_UNAVAILABLE: i32 = -3;
pub const TOKEN_RELAY_ERROR_QUEUE: i32 = -4;

lazy_static! {
    // One writer and one reader per process, both on the well-known queue,
    // created on the first leader call.
    static ref WRITER: Mutex<Option<Writer>> = Mutex::new(None);
    static ref READER: Mutex<Option<Reader>> = Mutex::new(None);
}

// -----------------------------------------------------------------------------
// Writer API
// -----------------------------------------------------------------------------

/// Enqueue one decoding step on the well-known queue.
///
/// # Arguments
/// * `tokens` - Normal mode: `batch_size` tokens. Speculative mode: a row-major
///   `[batch_size][MAX_DRAFT_TOKENS]` grid.
/// * `tokens_len` - Number of values behind `tokens`.
/// * `batch_size` - Active sequences in this step.
/// * `not_need_stop` - False once every sequence has finished.
/// * `accept_num` - NULL for normal mode, otherwise `batch_size` accept counts.
/// * `accept_len` - Number of values behind `accept_num`.
/// * `rank_id` - Caller's rank; ranks above zero return immediately.
///
/// # Returns
/// * 0 when sent, dropped on a full queue, or skipped on a non-leader rank.
/// * Negative error code for bad arguments or an unavailable queue.
///
/// # Safety
/// When non-null, `tokens` must point to `tokens_len` readable `i64` values
/// and `accept_num` to `accept_len` readable `i32` values, both valid for the
/// duration of the call. Non-leader ranks never dereference either pointer.
#[no_mangle]
pub unsafe extern "C" fn token_relay_save_output(
    tokens: *const i64,
    tokens_len: usize,
    batch_size: usize,
    not_need_stop: bool,
    accept_num: *const i32,
    accept_len: usize,
    rank_id: i64,
) -> i32 {
    if !is_leader(rank_id) {
        return TOKEN_RELAY_SUCCESS;
    }
    if tokens.is_null() && tokens_len > 0 {
        return TOKEN_RELAY_ERROR_NULL_POINTER;
    }

    let tokens = unsafe { slice_or_empty(tokens, tokens_len) };
    let accept_num = if accept_num.is_null() {
        None
    } else {
        Some(unsafe { slice::from_raw_parts(accept_num, accept_len) })
    };
    let step = StepOutput {
        tokens,
        batch_size,
        not_need_stop,
        accept_num,
    };

    let mut guard = WRITER.lock();
    if guard.is_none() {
        match global_queue() {
            Ok(queue) => *guard = Some(Writer::new(queue)),
            Err(_) => return TOKEN_RELAY_ERROR_QUEUE_UNAVAILABLE,
        }
    }
    let Some(writer) = guard.as_mut() else {
        return TOKEN_RELAY_ERROR_QUEUE_UNAVAILABLE;
    };

    match writer.send(&step, rank_id) {
        Ok(SendStatus::Sent | SendStatus::Dropped | SendStatus::Skipped) => TOKEN_RELAY_SUCCESS,
        Err(e @ OutputError::Queue { .. }) => {
            // Lost like a full-queue drop; the next step supersedes it.
            warn!(error = %e, "send failed, dropping step");
            TOKEN_RELAY_SUCCESS
        }
        Err(e) => {
            warn!(error = %e, "rejected step");
            TOKEN_RELAY_ERROR_INVALID_ARG
        }
    }
}

// -----------------------------------------------------------------------------
// Reader API
// -----------------------------------------------------------------------------

/// Receive the oldest step from the well-known queue into `out`.
///
/// # Arguments
/// * `out` - Caller-owned buffer, at least `OUTPUT_BUFFER_LEN` slots for
///   speculative mode or `NORMAL_MSG_LEN` for normal mode.
/// * `out_len` - Number of slots behind `out`.
/// * `rank_id` - Caller's rank; ranks above zero leave `out` untouched.
/// * `wait_flag` - Block until a message arrives instead of polling.
/// * `speculative` - Expect speculative-mode messages.
///
/// # Returns
/// * 0 when a message was copied into `out` or the rank is not the leader.
/// * 1 when nothing was queued; `out` starts with `(-2, 0)`.
/// * Negative error code otherwise. Queue failures also write `(-2, 0)`.
///
/// # Safety
/// When non-null, `out` must point to `out_len` writable `i64` values that
/// nothing else accesses for the duration of the call. Non-leader ranks never
/// dereference it.
#[no_mangle]
pub unsafe extern "C" fn token_relay_get_output(
    out: *mut i64,
    out_len: usize,
    rank_id: i64,
    wait_flag: bool,
    speculative: bool,
) -> i32 {
    if !is_leader(rank_id) {
        return TOKEN_RELAY_SUCCESS;
    }
    if out.is_null() {
        return TOKEN_RELAY_ERROR_NULL_POINTER;
    }
    let out = unsafe { slice::from_raw_parts_mut(out, out_len) };
    let mode = DecodeMode::from_speculative(speculative);

    let mut guard = READER.lock();
    if guard.is_none() {
        match global_queue() {
            Ok(queue) => *guard = Some(Reader::new(queue)),
            Err(_) => return TOKEN_RELAY_ERROR_QUEUE_UNAVAILABLE,
        }
    }
    let Some(reader) = guard.as_mut() else {
        return TOKEN_RELAY_ERROR_QUEUE_UNAVAILABLE;
    };

    match reader.receive(out, rank_id, wait_flag, mode) {
        Ok(RecvStatus::Received { .. } | RecvStatus::Skipped) => TOKEN_RELAY_SUCCESS,
        Ok(RecvStatus::Empty) => TOKEN_RELAY_EMPTY,
        Err(e @ OutputError::OutputTooSmall { .. }) => {
            warn!(error = %e, "rejected output buffer");
            TOKEN_RELAY_ERROR_INVALID_ARG
        }
        Err(e) => {
            warn!(error = %e, "receive failed, reporting no message");
            if out.len() >= 2 {
                out[0] = NO_MESSAGE;
                out[1] = 0;
            }
            TOKEN_RELAY_ERROR_QUEUE
        }
    }
}

unsafe fn slice_or_empty<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        slice::from_raw_parts(ptr, len)
    }
}
