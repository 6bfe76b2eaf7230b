#![allow(
    clippy::missing_errors_doc,
    reason = "crate-wide fallible API uses one explicit error type; per-item boilerplate would duplicate contract"
)]

pub mod client;
pub mod error;
pub mod export;
pub mod models;
pub mod project;
pub mod registry;
pub mod resolve;
pub mod shape;
pub mod template;

pub use client::{ApiConfig, HttpSourceApi, SourceApi};
pub use error::{ExportError, Result};
pub use export::{ExportOptions, Exporter};
pub use registry::{EntityCategory, LogicalIdRegistry};
pub use template::TemplateDocument;
