// In src/Output/writer.rs
use crate::error::OutputError;
use crate::Core::MessageQueue::QueueHandle;
use crate::Output::layout::{
    is_leader, stop_flag, DecodeMode, MAX_BSZ, MAX_DRAFT_TOKENS, SPECULATE_MAX_BSZ,
};
use crate::Output::Structs::{NormalMessage, SpeculativeMessage};
use std::io;

/// One decoding step's results as handed over by the inference runtime.
#[derive(Debug, Clone, Copy)]
pub struct StepOutput<'a> {
    /// Normal mode: one token per sequence. Speculative mode: a row-major
    /// `[batch_size][MAX_DRAFT_TOKENS]` grid.
    pub tokens: &'a [i64],
    pub batch_size: usize,
    /// False once every sequence has finished.
    pub not_need_stop: bool,
    /// Present only in speculative mode.
    pub accept_num: Option<&'a [i32]>,
}

impl StepOutput<'_> {
    pub fn mode(&self) -> DecodeMode {
        if self.accept_num.is_some() {
            DecodeMode::Speculative
        } else {
            DecodeMode::Normal
        }
    }
}

/// What happened to a step handed to [`Writer::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The message is in the queue.
    Sent,
    /// The queue was full; the step is lost and assumed superseded by the next one.
    Dropped,
    /// Called on a non-leader rank; nothing was touched.
    Skipped,
}

/// Serializes decoding steps into fixed-size messages and enqueues them.
///
/// The two message buffers live as long as the writer and are reused for
/// every send. Normal-mode token slots past the current batch size keep the
/// values of earlier sends.
pub struct Writer {
    queue: QueueHandle,
    normal: Box<NormalMessage>,
    speculative: Box<SpeculativeMessage>,
}

impl Writer {
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

    /// Send one step. Never blocks: a full queue yields [`SendStatus::Dropped`].
    ///
    /// Input that cannot be represented on the wire (batch too large, short
    /// buffers) is rejected before anything is written.
    pub fn send(&mut self, step: &StepOutput<'_>, rank_id: i64) -> Result<SendStatus, OutputError> {
        if !is_leader(rank_id) {
            trace!(rank_id, "non-leader rank, skipping send");
            return Ok(SendStatus::Skipped);
        }

        let mode = step.mode();
        let sent = match step.accept_num {
            None => {
                self.fill_normal(step)?;
                self.queue.send(&*self.normal, true)
            }
            Some(accept_num) => {
                self.fill_speculative(step, accept_num)?;
                self.queue.send(&*self.speculative, true)
            }
        };

        match sent {
            Ok(()) => Ok(SendStatus::Sent),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                debug!(%mode, batch_size = step.batch_size, "message queue full, dropping step");
                Ok(SendStatus::Dropped)
            }
            Err(e) => Err(OutputError::queue("send", e)),
        }
    }

    fn fill_normal(&mut self, step: &StepOutput<'_>) -> Result<(), OutputError> {
        let bsz = step.batch_size;
        check_batch(DecodeMode::Normal, bsz, MAX_BSZ)?;
        check_tokens(bsz, bsz, step.tokens.len())?;

        let msg = &mut *self.normal;
        msg.stop_flag = stop_flag(step.not_need_stop);
        msg.batch_size = bsz as i32;
        for (slot, &token) in msg.tokens.iter_mut().zip(&step.tokens[..bsz]) {
            *slot = token as i32;
        }
        Ok(())
    }

    fn fill_speculative(
        &mut self,
        step: &StepOutput<'_>,
        accept_num: &[i32],
    ) -> Result<(), OutputError> {
        let bsz = step.batch_size;
        check_batch(DecodeMode::Speculative, bsz, SPECULATE_MAX_BSZ)?;
        check_tokens(bsz, bsz * MAX_DRAFT_TOKENS, step.tokens.len())?;
        if accept_num.len() < bsz {
            return Err(OutputError::AcceptNumTooShort {
                batch_size: bsz,
                got: accept_num.len(),
            });
        }

        let msg = &mut *self.speculative;
        msg.stop_flag = stop_flag(step.not_need_stop);
        msg.batch_size = bsz as i32;

        msg.accept_num[..bsz].copy_from_slice(&accept_num[..bsz]);
        msg.accept_num[bsz..].fill(0);

        let live = bsz * MAX_DRAFT_TOKENS;
        for (slot, &token) in msg.draft_tokens[..live].iter_mut().zip(&step.tokens[..live]) {
            *slot = token as i32;
        }
        msg.draft_tokens[live..].fill(0);
        Ok(())
    }
}

fn check_batch(mode: DecodeMode, batch_size: usize, max: usize) -> Result<(), OutputError> {
    if batch_size > max {
        return Err(OutputError::BatchTooLarge {
            mode,
            batch_size,
            max,
        });
    }
    Ok(())
}

fn check_tokens(batch_size: usize, need: usize, got: usize) -> Result<(), OutputError> {
    if got < need {
        return Err(OutputError::TokensTooShort {
            batch_size,
            need,
            got,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Private queue removed when the test ends, pass or fail.
    struct ScratchQueue(QueueHandle);

    impl Drop for ScratchQueue {
        fn drop(&mut self) {
            let _ = self.0.remove();
        }
    }

    fn writer() -> (Writer, ScratchQueue) {
        let queue = QueueHandle::private().unwrap();
        (Writer::new(queue), ScratchQueue(queue))
    }

    #[test]
    fn normal_fill_keeps_stale_slots() {
        let (mut w, _queue) = writer();
        let first = [7i64, 8, 9, 10];
        w.fill_normal(&StepOutput {
            tokens: &first,
            batch_size: 4,
            not_need_stop: true,
            accept_num: None,
        })
        .unwrap();
        w.fill_normal(&StepOutput {
            tokens: &[1],
            batch_size: 1,
            not_need_stop: false,
            accept_num: None,
        })
        .unwrap();

        assert_eq!(w.normal.stop_flag, -1);
        assert_eq!(w.normal.batch_size, 1);
        assert_eq!(&w.normal.tokens[..4], &[1, 8, 9, 10]);
    }

    #[test]
    fn speculative_fill_zero_pads_past_batch() {
        let (mut w, _queue) = writer();
        let full: Vec<i64> = (1..=(3 * MAX_DRAFT_TOKENS as i64)).collect();
        w.fill_speculative(
            &StepOutput {
                tokens: &full,
                batch_size: 3,
                not_need_stop: true,
                accept_num: Some(&[1, 2, 3]),
            },
            &[1, 2, 3],
        )
        .unwrap();
        w.fill_speculative(
            &StepOutput {
                tokens: &full[..MAX_DRAFT_TOKENS],
                batch_size: 1,
                not_need_stop: true,
                accept_num: Some(&[4]),
            },
            &[4],
        )
        .unwrap();

        let msg = &*w.speculative;
        assert_eq!(msg.accept_num[0], 4);
        assert!(msg.accept_num[1..].iter().all(|&v| v == 0));
        assert_eq!(msg.draft_row(0), &[1, 2, 3, 4, 5, 6]);
        assert!(msg.draft_tokens[MAX_DRAFT_TOKENS..].iter().all(|&v| v == 0));
    }

    #[test]
    fn rejects_oversized_batch() {
        let (mut w, _queue) = writer();
        let tokens = vec![0i64; MAX_BSZ + 1];
        let err = w
            .send(
                &StepOutput {
                    tokens: &tokens,
                    batch_size: MAX_BSZ + 1,
                    not_need_stop: true,
                    accept_num: None,
                },
                0,
            )
            .unwrap_err();
        assert!(matches!(err, OutputError::BatchTooLarge { max: MAX_BSZ, .. }));
        assert_eq!(w.queue.stats().unwrap().messages, 0);
    }

    #[test]
    fn rejects_short_draft_grid() {
        let (mut w, _queue) = writer();
        let err = w
            .send(
                &StepOutput {
                    tokens: &[1, 2, 3],
                    batch_size: 1,
                    not_need_stop: true,
                    accept_num: Some(&[1]),
                },
                0,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            OutputError::TokensTooShort { need: MAX_DRAFT_TOKENS, got: 3, .. }
        ));
    }
}
