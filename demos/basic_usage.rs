//! Basic logger usage example
//!
//! Demonstrates the plain and JSON formats, typed fields and level changes.
//!
//! Run with: cargo run --example basic_usage

use rust_field_logger::prelude::*;
use rust_field_logger::{info, warn};
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Rust Field Logger - Basic Usage Example ===\n");

    // Plain text on stdout, debug and up
    let logger = Logger::builder()
        .level(LogLevel::Debug)
        .sink(ConsoleSink::stdout())
        .build()?;

    println!("1. Logging at different levels:");
    logger.debug("This is a debug message");
    logger.info("This is an info message");
    logger.warn("This is a warning message");
    logger.error("This is an error message");

    println!("\n2. Typed fields:");
    let request = logger.named("http").with_field("method", "GET");
    request.log_fields(
        LogLevel::Info,
        "request done",
        vec![
            Field::string("path", "/api/users"),
            Field::int("status", 200),
            Field::duration("elapsed", Duration::from_millis(42)),
        ],
    );

    println!("\n3. Format macros and templates:");
    let port = 8080;
    info!(logger, "listening on port {}", port);
    warn!(logger, "{} of {} workers busy", 7, 8);
    logger.log(LogLevel::Info, "cache hit ratio {}", &[&0.93]);

    println!("\n4. Raising the minimum level at runtime:");
    logger.set_level("warn")?;
    logger.info("Info message (hidden)");
    logger.warn("Warning message (visible)");

    println!("\n5. The same entry as JSON:");
    let json = Logger::builder()
        .formatter("json")
        .sink(ConsoleSink::stdout())
        .build()?;
    json.with_field("user", 42)
        .with_fields([Field::namespace("session"), Field::new("ttl", 300)])
        .info("user loaded");

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
