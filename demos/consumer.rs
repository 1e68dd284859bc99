// In demos/consumer.rs
//
// Plays the output server: polls the well-known queue until the producer
// reports every sequence finished or Ctrl+C is pressed.
//
//   cargo run --example consumer -- [--speculative]
use sha2::{Digest, Sha256};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use token_relay::Output::layout::OUTPUT_BUFFER_LEN;
use token_relay::{DecodeMode, OutputError, OutputView, QueueBuilder};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), OutputError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let speculative = env::args().nth(1).map(|s| s == "--speculative").unwrap_or(false);
    let mode = DecodeMode::from_speculative(speculative);

    let running = Arc::new(AtomicBool::new(true));
    let running_for_handler = Arc::clone(&running);
    ctrlc::set_handler(move || {
        running_for_handler.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    let mut reader = QueueBuilder::new().build_reader()?;
    println!("Consumer: reading {mode} steps from queue {:?}", reader.queue());

    let mut out = vec![0i64; OUTPUT_BUFFER_LEN];
    let mut hasher = Sha256::new();
    let mut received = 0usize;

    // Non-blocking polls: a blocking receive cannot be interrupted by Ctrl+C.
    while running.load(Ordering::SeqCst) {
        reader.receive(&mut out, 0, false, mode)?;
        let Some(view) = OutputView::parse(&out, mode) else {
            eprintln!("Consumer: malformed step {:?}", &out[..2]);
            break;
        };

        let tokens = match view {
            OutputView::Empty => {
                std::thread::sleep(Duration::from_millis(1));
                continue;
            }
            OutputView::Normal { tokens, .. } => tokens,
            OutputView::Speculative { draft_tokens, .. } => draft_tokens,
        };

        received += 1;
        for token in tokens {
            hasher.update(token.to_le_bytes());
        }
        println!("{:<6} bsz={:<4} {:?}", received, view.batch_size(), &tokens[..tokens.len().min(8)]);

        if !view.should_continue() {
            break;
        }
    }

    println!("Consumer: received {received} steps");
    println!("Consumer: digest {:x}", hasher.finalize());
    Ok(())
}
