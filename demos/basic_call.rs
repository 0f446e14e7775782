//! Basic example demonstrating simple GET and POST calls.
//!
//! This example shows how to:
//! - Build an executor
//! - Describe calls with `RequestSpec`
//! - Decode JSON responses, ignoring fields the target type doesn't know
//! - Access response metadata
//!
//! Run with: `cargo run --example basic_call`

use interlink::{Error, Executor, RequestSpec, RetryPolicy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("interlink=debug,basic_call=info")
        .init();

    let executor = Executor::builder().user_agent("interlink-demo/0.1")?.build()?;
    let policy = RetryPolicy::none();

    println!("=== GET Request Example ===");
    // The payload also has a `body` field; `Post` doesn't declare it and that's fine
    let spec = RequestSpec::parse_get("https://jsonplaceholder.typicode.com/posts/1")?;
    let response = executor.execute::<Post>(&spec, &policy).await?;

    println!("Post ID: {}", response.data.id);
    println!("Title: {}", response.data.title);
    println!("Request latency: {:?}", response.latency);
    println!("Status code: {}", response.status);
    println!();

    println!("=== POST Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };
    let url = url::Url::parse("https://jsonplaceholder.typicode.com/posts")?;
    let spec = RequestSpec::post_json(url, &new_post)?;

    let response = executor.execute::<Post>(&spec, &policy).await?;

    println!("Created post ID: {}", response.data.id);
    println!("Raw response length: {} bytes", response.raw_body.len());
    println!("Content-Type: {:?}", response.header("content-type"));
    println!("Was retried: {}", response.was_retried());

    Ok(())
}
