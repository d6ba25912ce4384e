//! FlashPost library - carousel slide export to PNG, JPEG and PDF.
//!
//! This library exposes the core functionality of the `flashpost` CLI for use
//! in tests and embedding applications.
//!
//! # Modules
//!
//! - `export`: single-slide and batch export, readiness checks, diagnosis
//! - `slides`: slide model, deck store and renderer
//! - `document`: element tree the slides render into
//! - `chrome`: scoped hide/restore of navigation chrome during capture
//! - `raster`, `pdf`, `image_ops`: rasterization, PDF assembly, encoding
//! - `notify`, `download`: user feedback and file delivery
//! - `server`: static development server
//! - `config`: settings and deck files
//! - `error`: error types with user-facing diagnostics
#![forbid(unsafe_code)]

pub mod chrome;
pub mod cli;
pub mod config;
pub mod document;
pub mod download;
pub mod error;
pub mod export;
pub mod image_ops;
pub mod logging;
pub mod notify;
pub mod pdf;
pub mod raster;
pub mod server;
pub mod slides;
pub mod theme;
