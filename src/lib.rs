//! Trend Radar Library
//!
//! Exposes the pipeline, cache, exporters and UI so the binary and the
//! integration tests share one implementation.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod export;
pub mod pipeline;
pub mod refresh;
pub mod summary;
pub mod ui;
