//! Example demonstrating commands run under a host.
//!
//! This example shows how to:
//! - Wrap a call into a named, grouped command
//! - Bound the whole call, retries included, with a timeout
//! - Provide a fallback value from the host
//! - Derive a request-scoped cache key
//!
//! Run with: `cargo run --example query_command`

use interlink::model::SyncServiceResponse;
use interlink::{
    BackoffKind, CommandHost, Error, Executor, JsonQueryCommand, RequestSpec, RetryPolicy,
};
use std::time::Duration;

/// A host with an active caching context that answers failed syncs with a negative ack.
struct DemoHost;

impl CommandHost<SyncServiceResponse> for DemoHost {
    fn fallback(&self, error: &Error) -> Option<SyncServiceResponse> {
        Some(SyncServiceResponse::new(false, error.to_string()))
    }

    fn caching_context_active(&self) -> bool {
        true
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("interlink=debug,query_command=info")
        .init();

    let executor = Executor::builder().build()?;

    let command = JsonQueryCommand::<SyncServiceResponse>::microservice(
        "syncWays",
        RequestSpec::parse_get("https://httpbin.org/delay/3")?,
    )
    .retry_policy(RetryPolicy::new(2, BackoffKind::Linear))
    .timeout(Duration::from_secs(2))
    .caching(true);

    println!("Command: {} ({})", command.name(), command.group());
    println!("Cache key: {:?}", command.cache_key(&DemoHost));

    let ack = command.execute(&executor, &DemoHost).await?;
    println!("Success: {}", ack.success);
    println!("Message: {:?}", ack.message);

    Ok(())
}
