// src/Output/reader.rs

use crate::error::OutputError;
use crate::Core::MessageQueue::QueueHandle;
use crate::Output::layout::{
    is_leader, DecodeMode, ACCEPT_NUM_OFFSET, DRAFT_TOKENS_OFFSET, MAX_DRAFT_TOKENS, NO_MESSAGE,
    SPECULATE_MAX_BSZ, SPECULATE_MSG_LEN, STOP_CONTINUE,
};
use crate::Output::Structs::{NormalMessage, SpeculativeMessage};

/// What a call to [`Reader::receive`] did to the output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvStatus {
    /// A message was consumed and widened into the buffer.
    Received { batch_size: usize },
    /// Non-blocking poll found nothing; the buffer starts with `(-2, 0)`.
    Empty,
    /// Called on a non-leader rank; the buffer was not touched.
    Skipped,
}

/// Dequeues step messages and widens them into the caller's i64 buffer.
///
/// The reader's mode must match the writer's; a normal reader facing a
/// speculative message gets an `E2BIG` queue error and the message stays
/// queued, while the opposite mismatch cannot be detected.
pub struct Reader {
    queue: QueueHandle,
    normal: Box<NormalMessage>,
    speculative: Box<SpeculativeMessage>,
}

impl Reader {
    pub fn new(queue: QueueHandle) -> Self {
        Self {
            queue,
            normal: NormalMessage::zeroed(),
            speculative: SpeculativeMessage::zeroed(),
        }
    }

    pub fn queue(&self) -> QueueHandle {
        self.queue
    }

    /// Receive the oldest queued step into `out`.
    ///
    /// Normal mode writes `out[..batch_size + 2]` and leaves the rest alone.
    /// Speculative mode always writes the full `SPECULATE_MSG_LEN` prefix.
    /// With `wait_flag` the call blocks without timeout until a message arrives.
    pub fn receive(
        &mut self,
        out: &mut [i64],
        rank_id: i64,
        wait_flag: bool,
        mode: DecodeMode,
    ) -> Result<RecvStatus, OutputError> {
        if !is_leader(rank_id) {
            trace!(rank_id, "non-leader rank, skipping receive");
            return Ok(RecvStatus::Skipped);
        }
        // Worst case for the mode, so a message never lands half-copied.
        let need = mode.msg_len();
        if out.len() < need {
            return Err(OutputError::OutputTooSmall {
                mode,
                need,
                got: out.len(),
            });
        }

        match mode {
            DecodeMode::Normal => {
                if self.recv_into_normal(wait_flag)? {
                    Ok(self.copy_normal(out))
                } else {
                    write_sentinel(out);
                    Ok(RecvStatus::Empty)
                }
            }
            DecodeMode::Speculative => {
                if self.recv_into_speculative(wait_flag)? {
                    Ok(self.copy_speculative(out))
                } else {
                    write_sentinel(out);
                    Ok(RecvStatus::Empty)
                }
            }
        }
    }

    fn recv_into_normal(&mut self, wait: bool) -> Result<bool, OutputError> {
        self.queue
            .recv(&mut *self.normal, wait)
            .map(|got| got.is_some())
            .map_err(|e| OutputError::queue("receive", e))
    }

    fn recv_into_speculative(&mut self, wait: bool) -> Result<bool, OutputError> {
        self.queue
            .recv(&mut *self.speculative, wait)
            .map(|got| got.is_some())
            .map_err(|e| OutputError::queue("receive", e))
    }

    fn copy_normal(&self, out: &mut [i64]) -> RecvStatus {
        let msg = &*self.normal;
        // A foreign writer may have sent nonsense; never read past the array.
        let bsz = (msg.batch_size.max(0) as usize).min(msg.tokens.len());
        out[0] = msg.stop_flag as i64;
        out[1] = msg.batch_size as i64;
        for (slot, &token) in out[2..bsz + 2].iter_mut().zip(&msg.tokens[..bsz]) {
            *slot = token as i64;
        }
        RecvStatus::Received { batch_size: bsz }
    }

    fn copy_speculative(&self, out: &mut [i64]) -> RecvStatus {
        let msg = &*self.speculative;
        out[0] = msg.stop_flag as i64;
        out[1] = msg.batch_size as i64;
        for (slot, &n) in out[ACCEPT_NUM_OFFSET..DRAFT_TOKENS_OFFSET]
            .iter_mut()
            .zip(&msg.accept_num)
        {
            *slot = n as i64;
        }
        for (slot, &token) in out[DRAFT_TOKENS_OFFSET..SPECULATE_MSG_LEN]
            .iter_mut()
            .zip(&msg.draft_tokens)
        {
            *slot = token as i64;
        }
        RecvStatus::Received {
            batch_size: (msg.batch_size.max(0) as usize).min(SPECULATE_MAX_BSZ),
        }
    }
}

fn write_sentinel(out: &mut [i64]) {
    out[0] = NO_MESSAGE;
    out[1] = 0;
}

/// Typed view over an output buffer filled by [`Reader::receive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputView<'a> {
    /// The `(-2, 0)` sentinel.
    Empty,
    Normal {
        stop_flag: i64,
        tokens: &'a [i64],
    },
    Speculative {
        stop_flag: i64,
        accept_num: &'a [i64],
        /// Row-major `[batch_size][MAX_DRAFT_TOKENS]`.
        draft_tokens: &'a [i64],
    },
}

impl<'a> OutputView<'a> {
    /// Interpret `out` for `mode`. Returns `None` when the buffer is too short
    /// for the batch size it claims.
    pub fn parse(out: &'a [i64], mode: DecodeMode) -> Option<Self> {
        let (&stop_flag, &batch_size) = (out.first()?, out.get(1)?);
        if stop_flag == NO_MESSAGE {
            return Some(OutputView::Empty);
        }
        if batch_size < 0 || batch_size as usize > mode.max_batch() {
            return None;
        }
        let bsz = batch_size as usize;
        match mode {
            DecodeMode::Normal => Some(OutputView::Normal {
                stop_flag,
                tokens: out.get(2..bsz + 2)?,
            }),
            DecodeMode::Speculative => Some(OutputView::Speculative {
                stop_flag,
                accept_num: out.get(ACCEPT_NUM_OFFSET..ACCEPT_NUM_OFFSET + bsz)?,
                draft_tokens: out
                    .get(DRAFT_TOKENS_OFFSET..DRAFT_TOKENS_OFFSET + bsz * MAX_DRAFT_TOKENS)?,
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, OutputView::Empty)
    }

    /// False once the writer reported every sequence finished.
    pub fn should_continue(&self) -> bool {
        match self {
            OutputView::Empty => true,
            OutputView::Normal { stop_flag, .. } | OutputView::Speculative { stop_flag, .. } => {
                *stop_flag == STOP_CONTINUE as i64
            }
        }
    }

    pub fn batch_size(&self) -> usize {
        match self {
            OutputView::Empty => 0,
            OutputView::Normal { tokens, .. } => tokens.len(),
            OutputView::Speculative { accept_num, .. } => accept_num.len(),
        }
    }

    /// Accepted draft tokens for sequence `seq` in speculative mode.
    pub fn accepted_tokens(&self, seq: usize) -> Option<&'a [i64]> {
        match *self {
            OutputView::Speculative {
                accept_num,
                draft_tokens,
                ..
            } => {
                let n = usize::try_from(*accept_num.get(seq)?).ok()?.min(MAX_DRAFT_TOKENS);
                let start = seq * MAX_DRAFT_TOKENS;
                draft_tokens.get(start..start + n)
            }
            _ => None,
        }
    }
}
