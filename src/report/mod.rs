//! Run report generation.
//!
//! This module renders the outcome of a rollup run as Markdown or JSON.

pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report, top_level_summaries};
