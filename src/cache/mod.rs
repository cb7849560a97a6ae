//! Persistence of work trees between runs
//!
//! This module handles:
//! - Loading and saving the per-work cache file (`cache.json`)
//! - Serializing concurrent saves of the same work
//! - Reconciling a freshly fetched work with its cached copy

mod reconcile;
mod shared;
mod store;

pub use reconcile::{reconcile, MergePolicy};
pub use shared::SharedWork;
pub use store::{CacheStore, CACHE_FILE_NAME};
