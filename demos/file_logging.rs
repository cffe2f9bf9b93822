//! File logging example
//!
//! Demonstrates console plus rotating file output, built from a config.
//!
//! Run with: cargo run --example file_logging

use rust_field_logger::prelude::*;

fn main() -> Result<()> {
    println!("=== Rust Field Logger - File Logging Example ===\n");

    // Hand-built: console and a size-rotated file with compressed backups
    let policy = RotationPolicy::new()
        .with_max_size(64 * 1024)
        .with_max_backups(5)
        .with_compression(true);
    let logger = Logger::builder()
        .sink(ConsoleSink::stdout())
        .sink(RotatingFileSink::with_policy("logs/application.log", policy)?)
        .build()?;

    println!("1. Logging to both console and file:");
    logger.info("Application started");
    logger.info("Configuration loaded successfully");
    logger.warn("Using default settings for some options");
    logger.error("Failed to load optional plugin");

    println!("\n2. Performing some operations:");
    for i in 1..=5 {
        logger.infof(format_args!("Processing item {}/5", i));
        if i == 3 {
            logger.with_field("item", i).warn("Item took longer than expected");
        }
    }
    logger.flush()?;

    println!("\n3. Loggers from a JSON config:");
    let configs: LogConfigs = serde_json::from_str(
        r#"{
            "default": {"stdout": true, "level": "info", "path": "logs/app-%Y%m%d.log"},
            "audit": {"formatter": "json", "enable_file_line": true, "path": "logs/audit.log", "max_backup": 3}
        }"#,
    )?;
    let instances = LoggerInstances::init(&configs)?;
    instances.get("default")?.info("hourly rotated file");
    instances.get("audit")?.with_field("actor", "admin").warn("permissions changed");
    instances.close();

    println!("\n=== Example completed successfully! ===");
    println!("Check the 'logs' directory for the full log output");

    Ok(())
}
