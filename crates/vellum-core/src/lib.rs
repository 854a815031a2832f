//! Vellum Core Library
//!
//! This crate provides the domain models, error types, configuration and event hooks
//! shared by every Vellum component: media items (files and folders), their dependent
//! tag/category/access-rule records, and publishable content with its lifecycle status.

pub mod config;
pub mod error;
pub mod hooks;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use hooks::{MediaEvent, MediaEventPublisher, NoOpEventPublisher};
