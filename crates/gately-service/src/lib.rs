//! The mapping service: create, redirect, delete and metrics over a durable
//! store fronted by a tiered cache.
//!
//! Core types are re-exported from `gately_core`.

pub mod error;
pub mod hits;
pub mod mapper;
pub mod service;

pub use error::{MappingError, Result};
pub use hits::{HitRecorder, HitRecorderConfig};
pub use mapper::{Created, UrlMapper};
pub use service::{MappingConfig, MappingService};

pub use gately_core::{MappingRecord, ShortKey, SortOrder};
