//! Request correlation example
//!
//! Demonstrates explicit request contexts, the ambient per-thread id and
//! task-scoped ids under tokio.
//!
//! Run with: cargo run --example request_context

use rust_field_logger::core::correlation;
use rust_field_logger::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Rust Field Logger - Request Context Example ===\n");

    let logger = Logger::builder()
        .formatter("json")
        .enable_caller(false)
        .sink(ConsoleSink::stdout())
        .build()?;

    println!("1. Explicit context:");
    let ctx = RequestContext::generate();
    let scoped = logger.for_context(&ctx).named("handler");
    scoped.info("request received");
    scoped.with_field("rows", 12).info("query finished");

    println!("\n2. Ambient id bound to this thread:");
    {
        let _guard = correlation::bind("req-thread-1");
        logger.info("inside the guard");
    }
    logger.info("guard dropped, no rid");

    println!("\n3. Task-scoped ids:");
    let mut handles = Vec::new();
    for n in 0..3 {
        let logger = logger.clone();
        handles.push(tokio::spawn(correlation::scope(
            format!("req-task-{}", n),
            async move {
                logger.info("task started");
                tokio::task::yield_now().await;
                logger.with_field("task", n).info("task finished");
            },
        )));
    }
    for handle in handles {
        if let Err(err) = handle.await {
            logger.with_error(&err).error("task failed");
        }
    }

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
