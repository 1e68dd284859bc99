// Send/receive round trips over private queues, one queue per test.
// Run with: cargo test --test roundtrip -- --nocapture

mod common;

use common::TempQueue;
use std::thread;
use std::time::Duration;
use token_relay::Output::layout::*;
use token_relay::{DecodeMode, OutputView, Reader, RecvStatus, SendStatus, StepOutput, Writer};

fn pair(queue: &TempQueue) -> (Writer, Reader) {
    (Writer::new(queue.handle()), Reader::new(queue.handle()))
}

fn normal_step(tokens: &[i64], not_need_stop: bool) -> StepOutput<'_> {
    StepOutput {
        tokens,
        batch_size: tokens.len(),
        not_need_stop,
        accept_num: None,
    }
}

#[test]
fn test_normal_round_trip() {
    let queue = TempQueue::new();
    let (mut writer, mut reader) = pair(&queue);

    let status = writer.send(&normal_step(&[10, 20, 30], true), 0).unwrap();
    assert_eq!(status, SendStatus::Sent);

    let mut out = vec![42i64; OUTPUT_BUFFER_LEN];
    let status = reader.receive(&mut out, 0, true, DecodeMode::Normal).unwrap();

    assert_eq!(status, RecvStatus::Received { batch_size: 3 });
    assert_eq!(&out[..5], &[1, 3, 10, 20, 30]);
    // Slots past batch_size + 2 are left alone.
    assert!(out[5..].iter().all(|&v| v == 42));
}

#[test]
fn test_speculative_round_trip() {
    let queue = TempQueue::new();
    let (mut writer, mut reader) = pair(&queue);

    let grid = [5i64, 6, 0, 0, 0, 0, 7, 8, 0, 0, 0, 0];
    let step = StepOutput {
        tokens: &grid,
        batch_size: 2,
        not_need_stop: false,
        accept_num: Some(&[2, 1]),
    };
    assert_eq!(writer.send(&step, 0).unwrap(), SendStatus::Sent);

    let mut out = vec![42i64; OUTPUT_BUFFER_LEN];
    let status = reader
        .receive(&mut out, 0, true, DecodeMode::Speculative)
        .unwrap();
    assert_eq!(status, RecvStatus::Received { batch_size: 2 });

    assert_eq!(out[0], -1);
    assert_eq!(out[1], 2);
    assert_eq!(&out[2..4], &[2, 1]);
    assert!(out[4..DRAFT_TOKENS_OFFSET].iter().all(|&v| v == 0));

    let row = |seq: usize| {
        let start = DRAFT_TOKENS_OFFSET + seq * MAX_DRAFT_TOKENS;
        &out[start..start + MAX_DRAFT_TOKENS]
    };
    assert_eq!(row(0), &[5, 6, 0, 0, 0, 0]);
    assert_eq!(row(1), &[7, 8, 0, 0, 0, 0]);
    assert!(out[DRAFT_TOKENS_OFFSET + 2 * MAX_DRAFT_TOKENS..SPECULATE_MSG_LEN]
        .iter()
        .all(|&v| v == 0));

    let view = OutputView::parse(&out, DecodeMode::Speculative).unwrap();
    assert!(!view.should_continue());
    assert_eq!(view.accepted_tokens(0), Some(&[5i64, 6][..]));
    assert_eq!(view.accepted_tokens(1), Some(&[7i64][..]));
}

#[test]
fn test_speculative_padding_after_larger_batch() {
    let queue = TempQueue::new();
    let (mut writer, mut reader) = pair(&queue);

    let big: Vec<i64> = (1..=(8 * MAX_DRAFT_TOKENS) as i64).collect();
    let accept = [3i32; 8];
    writer
        .send(
            &StepOutput {
                tokens: &big,
                batch_size: 8,
                not_need_stop: true,
                accept_num: Some(&accept),
            },
            0,
        )
        .unwrap();
    writer
        .send(
            &StepOutput {
                tokens: &big[..MAX_DRAFT_TOKENS],
                batch_size: 1,
                not_need_stop: true,
                accept_num: Some(&accept[..1]),
            },
            0,
        )
        .unwrap();

    let mut out = vec![0i64; OUTPUT_BUFFER_LEN];
    reader.receive(&mut out, 0, true, DecodeMode::Speculative).unwrap();
    reader.receive(&mut out, 0, true, DecodeMode::Speculative).unwrap();

    assert_eq!(out[1], 1);
    assert!(out[ACCEPT_NUM_OFFSET + 1..DRAFT_TOKENS_OFFSET].iter().all(|&v| v == 0));
    assert!(out[DRAFT_TOKENS_OFFSET + MAX_DRAFT_TOKENS..SPECULATE_MSG_LEN]
        .iter()
        .all(|&v| v == 0));
}

#[test]
fn test_random_batches_round_trip() {
    let queue = TempQueue::new();
    let (mut writer, mut reader) = pair(&queue);
    let mut out = vec![0i64; OUTPUT_BUFFER_LEN];

    for _ in 0..32 {
        let bsz = fastrand::usize(0..=MAX_BSZ);
        let tokens: Vec<i64> = (0..bsz).map(|_| fastrand::i32(..) as i64).collect();
        let not_need_stop = fastrand::bool();
        writer.send(&normal_step(&tokens, not_need_stop), 0).unwrap();

        let status = reader.receive(&mut out, 0, true, DecodeMode::Normal).unwrap();
        assert_eq!(status, RecvStatus::Received { batch_size: bsz });
        assert_eq!(out[0], stop_flag(not_need_stop) as i64);
        assert_eq!(out[1], bsz as i64);
        assert_eq!(&out[2..bsz + 2], &tokens[..]);
    }

    for _ in 0..32 {
        let bsz = fastrand::usize(0..=SPECULATE_MAX_BSZ);
        let grid: Vec<i64> = (0..bsz * MAX_DRAFT_TOKENS)
            .map(|_| fastrand::i32(..) as i64)
            .collect();
        let accept: Vec<i32> = (0..bsz)
            .map(|_| fastrand::i32(0..=MAX_DRAFT_TOKENS as i32))
            .collect();
        writer
            .send(
                &StepOutput {
                    tokens: &grid,
                    batch_size: bsz,
                    not_need_stop: true,
                    accept_num: Some(&accept),
                },
                0,
            )
            .unwrap();

        reader.receive(&mut out, 0, true, DecodeMode::Speculative).unwrap();
        let view = OutputView::parse(&out, DecodeMode::Speculative).unwrap();
        match view {
            OutputView::Speculative {
                stop_flag,
                accept_num,
                draft_tokens,
            } => {
                assert_eq!(stop_flag, STOP_CONTINUE as i64);
                assert!(accept_num.iter().map(|&v| v as i32).eq(accept.iter().copied()));
                assert_eq!(draft_tokens, &grid[..]);
            }
            other => panic!("unexpected view {other:?}"),
        }
    }
}

#[test]
fn test_tokens_are_truncated_to_i32() {
    let queue = TempQueue::new();
    let (mut writer, mut reader) = pair(&queue);

    writer.send(&normal_step(&[(1i64 << 32) + 7, -5], true), 0).unwrap();
    let mut out = vec![0i64; OUTPUT_BUFFER_LEN];
    reader.receive(&mut out, 0, true, DecodeMode::Normal).unwrap();
    assert_eq!(&out[..4], &[1, 2, 7, -5]);
}

#[test]
fn test_empty_poll_writes_sentinel() {
    let queue = TempQueue::new();
    let mut reader = Reader::new(queue.handle());

    for mode in [DecodeMode::Normal, DecodeMode::Speculative] {
        let mut out = vec![9i64; OUTPUT_BUFFER_LEN];
        let status = reader.receive(&mut out, 0, false, mode).unwrap();
        assert_eq!(status, RecvStatus::Empty);
        assert_eq!(out[0], NO_MESSAGE);
        assert_eq!(out[1], 0);
        assert!(out[2..].iter().all(|&v| v == 9));
    }
}

#[test]
fn test_non_leader_is_noop() {
    let queue = TempQueue::new();
    let (mut writer, mut reader) = pair(&queue);

    let status = writer.send(&normal_step(&[1, 2], true), 1).unwrap();
    assert_eq!(status, SendStatus::Skipped);
    assert_eq!(queue.handle().stats().unwrap().messages, 0);

    writer.send(&normal_step(&[1, 2], true), 0).unwrap();
    let mut out = vec![9i64; OUTPUT_BUFFER_LEN];
    for wait in [false, true] {
        let status = reader.receive(&mut out, 3, wait, DecodeMode::Normal).unwrap();
        assert_eq!(status, RecvStatus::Skipped);
    }
    assert!(out.iter().all(|&v| v == 9));
    assert_eq!(queue.handle().stats().unwrap().messages, 1);
}

#[test]
fn test_fifo_order() {
    let queue = TempQueue::new();
    let (mut writer, mut reader) = pair(&queue);

    writer.send(&normal_step(&[111], true), 0).unwrap();
    writer.send(&normal_step(&[222, 333], false), 0).unwrap();

    let mut out = vec![0i64; OUTPUT_BUFFER_LEN];
    reader.receive(&mut out, 0, false, DecodeMode::Normal).unwrap();
    assert_eq!(&out[..3], &[1, 1, 111]);
    reader.receive(&mut out, 0, false, DecodeMode::Normal).unwrap();
    assert_eq!(&out[..4], &[-1, 2, 222, 333]);
    assert_eq!(
        reader.receive(&mut out, 0, false, DecodeMode::Normal).unwrap(),
        RecvStatus::Empty
    );
}

#[test]
fn test_blocking_receive_waits_for_writer() {
    let queue = TempQueue::new();
    let handle = queue.handle();

    let producer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        let mut writer = Writer::new(handle);
        writer.send(&normal_step(&[77], true), 0).unwrap()
    });

    let mut reader = Reader::new(handle);
    let mut out = vec![0i64; OUTPUT_BUFFER_LEN];
    let status = reader.receive(&mut out, 0, true, DecodeMode::Normal).unwrap();

    assert_eq!(producer.join().unwrap(), SendStatus::Sent);
    assert_eq!(status, RecvStatus::Received { batch_size: 1 });
    assert_eq!(&out[..3], &[1, 1, 77]);
}
