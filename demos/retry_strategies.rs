//! Example demonstrating retry policies.
//!
//! This example shows how to:
//! - Retry with a linear (constant 500ms) backoff
//! - Retry with an exponential backoff (500ms, 1s, 2s...)
//! - Observe retries with a hook
//!
//! Run with: `cargo run --example retry_strategies`

use interlink::{BackoffKind, Error, Executor, RequestSpec, RetryPolicy};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("interlink=debug,retry_strategies=info")
        .init();

    let executor = Executor::builder().build()?;
    let spec = RequestSpec::parse_get("https://httpbin.org/status/500")?;

    println!("=== No retries ===");
    match executor
        .execute::<serde_json::Value>(&spec, &RetryPolicy::none())
        .await
    {
        Ok(_) => println!("Unexpected success"),
        Err(e) => println!("Failed after one attempt: {}", e),
    }
    println!();

    println!("=== Linear backoff ===");
    println!("Delays: 500ms, 500ms, 500ms");
    let linear = RetryPolicy::new(3, BackoffKind::Linear)
        .on_each_retry(|retry| println!("  retry #{} starting soon", retry));
    match executor.execute::<serde_json::Value>(&spec, &linear).await {
        Ok(_) => println!("Unexpected success"),
        Err(e) => println!("Failed after {} attempts: {}", linear.total_attempts(), e),
    }
    println!();

    println!("=== Exponential backoff ===");
    let exponential = RetryPolicy::new(3, BackoffKind::Exponential)
        .on_each_retry(|retry| println!("  retry #{} starting soon", retry));
    let delays: Vec<_> = (1..=exponential.max_retries())
        .map(|retry| exponential.delay_for_retry(retry))
        .collect();
    println!("Delays: {:?}", delays);
    match executor.execute::<serde_json::Value>(&spec, &exponential).await {
        Ok(_) => println!("Unexpected success"),
        Err(e) => println!("Failed: [{:?}] {}", e.problem_reason(), e),
    }

    Ok(())
}
