//! Basic breaker usage example
//!
//! Run with `RUST_LOG=debug` to see transition logs.

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use windowed_breaker::{Breaker, ManualClock};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Circuit Breaker Basic Example ===\n");

    // Simulated time so the cooldown passes instantly
    let clock = Arc::new(ManualClock::new());

    let breaker = Breaker::builder("payment_api")
        .failure_threshold(0.5)
        .window_size(4)
        .timeout_secs(5.0)
        .success_threshold(2)
        .clock(clock.clone())
        .on_open(|name| println!("🔴 Circuit '{}' opened!", name))
        .on_close(|name| println!("🟢 Circuit '{}' closed!", name))
        .on_half_open(|name| println!("🟡 Circuit '{}' half-open, testing...", name))
        .build();

    println!("Initial state: {}\n", breaker.state());

    let call = |attempt: u32, healthy: bool| {
        if let Err(e) = breaker.check() {
            println!("✗ Payment {} rejected: {}", attempt, e);
            return;
        }

        if healthy {
            println!("✓ Payment {} accepted", attempt);
            breaker.record_success();
        } else {
            println!("✗ Payment {} failed", attempt);
            breaker.record_failure();
        }
    };

    println!("--- Successful calls ---");
    call(1, true);
    call(2, true);
    println!("State: {}\n", breaker.state());

    println!("--- Triggering failures ---");
    call(3, false);
    call(4, false);
    println!("State: {} (window full at 50% failures)\n", breaker.state());

    println!("--- Attempting call while open ---");
    call(5, true);
    println!();

    println!("--- Waiting out the cooldown ---");
    clock.advance_secs(5.0);
    call(6, true);
    call(7, true);
    println!("State: {}\n", breaker.state());

    let stats = breaker.stats();
    println!(
        "Stats: total={} failures={} rate={:.2} opens={} streak={}",
        stats.total, stats.failures, stats.failure_rate, stats.total_opens, stats.current_streak
    );

    println!("\n--- Resetting breaker ---");
    breaker.reset();
    println!("State after reset: {}", breaker.state());
}
