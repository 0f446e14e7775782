//! Example demonstrating error handling.
//!
//! This example shows how to:
//! - Branch on the problem reason of a failed call
//! - Pick a log severity from the `unexpected` flag
//! - Access the raw server response on errors
//! - Deal with deserialization failures
//!
//! Run with: `cargo run --example error_handling`

use interlink::{Error, Executor, ProblemReason, RequestSpec, RetryPolicy};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    id: u32,
    title: String,
}

fn report(error: &Error) {
    match error {
        Error::Api(err) => {
            let severity = if err.is_unexpected() { "ALERT" } else { "note" };
            println!("[{}] {}", severity, err.reason());
            println!("  URL: {}", err.url());
            println!("  Status: {:?}", err.status());
            println!("  Server said: {:?}", err.server_body());
            println!("  Message: {}", err);

            if err.reason() == ProblemReason::ServerUnable {
                println!("  The service doesn't support this yet, no need to page anyone.");
            }
        }
        Error::DeserializationFailed {
            url,
            raw_response,
            serde_error,
        } => {
            println!("Deserialization failed for {}", url);
            println!("  Serde error: {}", serde_error);
            println!(
                "  Raw response (first 200 chars): {}",
                raw_response.chars().take(200).collect::<String>()
            );
        }
        other => println!("Other error: {}", other),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("interlink=info")
        .init();

    let executor = Executor::builder().build()?;
    let policy = RetryPolicy::none();

    println!("=== Example 1: HTTP error statuses ===");
    for status in [400, 500, 501, 503] {
        let spec = RequestSpec::parse_get(format!("https://httpbin.org/status/{}", status))?;
        if let Err(e) = executor.execute::<Post>(&spec, &policy).await {
            report(&e);
        }
        println!();
    }

    println!("=== Example 2: Unreachable host ===");
    let spec = RequestSpec::parse_get("http://does-not-exist.invalid/posts/1")?;
    if let Err(e) = executor.execute::<Post>(&spec, &policy).await {
        report(&e);
    }
    println!();

    println!("=== Example 3: Deserialization errors ===");
    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct WrongSchema {
        nonexistent_field: String,
    }

    let spec = RequestSpec::parse_get("https://jsonplaceholder.typicode.com/posts/1")?;
    if let Err(e) = executor.execute::<WrongSchema>(&spec, &policy).await {
        report(&e);
    }

    Ok(())
}
