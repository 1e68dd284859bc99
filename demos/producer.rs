// In demos/producer.rs
//
// Plays the inference worker: emits synthetic decoding steps on the
// well-known queue, one per tick, and finishes with a stop step.
//
//   cargo run --example producer -- <steps> [--speculative]
use sha2::{Digest, Sha256};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use token_relay::Output::layout::MAX_DRAFT_TOKENS;
use token_relay::{OutputError, QueueBuilder, SendStatus, StepOutput};
use tracing_subscriber::EnvFilter;

const BATCH_SIZE: usize = 4;

fn main() -> Result<(), OutputError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <steps> [--speculative]", args[0]);
        std::process::exit(1);
    }
    let steps: usize = args[1].parse().expect("Invalid number of steps");
    let speculative = args.get(2).map(|s| s == "--speculative").unwrap_or(false);

    let running = Arc::new(AtomicBool::new(true));
    let running_for_handler = Arc::clone(&running);
    ctrlc::set_handler(move || {
        running_for_handler.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    let mut writer = QueueBuilder::new().build_writer()?;
    println!("Producer: writing to queue {:?}", writer.queue());

    let mut hasher = Sha256::new();
    let (mut sent, mut dropped) = (0usize, 0usize);

    for step in 0..steps {
        let last = step + 1 == steps || !running.load(Ordering::SeqCst);
        let width = if speculative { MAX_DRAFT_TOKENS } else { 1 };
        let tokens: Vec<i64> = (0..BATCH_SIZE * width)
            .map(|i| (step * 1000 + i) as i64)
            .collect();
        let accept: Vec<i32> = (0..BATCH_SIZE)
            .map(|seq| ((step + seq) % MAX_DRAFT_TOKENS + 1) as i32)
            .collect();

        let status = writer.send(
            &StepOutput {
                tokens: &tokens,
                batch_size: BATCH_SIZE,
                not_need_stop: !last,
                accept_num: speculative.then_some(&accept[..]),
            },
            0,
        )?;

        match status {
            SendStatus::Sent => {
                sent += 1;
                for token in &tokens {
                    hasher.update(token.to_le_bytes());
                }
            }
            SendStatus::Dropped => dropped += 1,
            SendStatus::Skipped => {}
        }

        if last {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    println!("Producer: sent {sent} steps, dropped {dropped}");
    println!("Producer: digest {:x}", hasher.finalize());
    Ok(())
}
