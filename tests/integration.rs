//! Integration tests for the FlashPost export pipeline.
//!
//! These tests drive the exporter end to end through the mock rasterizer,
//! the recording notifier and the in-memory sink, plus the built-in
//! rasterizer and file downloader against temp directories.
//!
//! # Modules
//!
//! - `single_export`: one slide, chrome handling, retry prompt, concurrency
//! - `batch_export`: every slide, progress, partial failure, restore
//! - `readiness`: readiness checks and the diagnosis smoke test
//! - `end_to_end`: deck file to files on disk with the built-in engines
//! - `dev_server`: the static server on a real socket

mod common;

#[path = "integration/single_export.rs"]
mod single_export;

#[path = "integration/batch_export.rs"]
mod batch_export;

#[path = "integration/readiness.rs"]
mod readiness;

#[path = "integration/end_to_end.rs"]
mod end_to_end;

#[path = "integration/dev_server.rs"]
mod dev_server;
