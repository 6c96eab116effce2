//! Core types and shared functionality for waystation.
//!
//! This crate provides:
//! - Typed requests, descriptors and captured responses
//! - The route classifier and static manifest
//! - The versioned cache store (SQLite and in-memory)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;
pub mod request;
pub mod response;
pub mod route;

pub use cache::{CacheDb, CacheStore, CacheVersion, MemoryStore};
pub use config::{AppConfig, ConfigError, RouteConfig};
pub use error::Error;
pub use manifest::StaticManifest;
pub use request::{Request, RequestDescriptor, RequestMode};
pub use response::CapturedResponse;
pub use route::{RouteClass, RouteClassifier};
