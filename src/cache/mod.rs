//! Partitioned cache storage for offline asset serving.
//!
//! This module provides the cache registry backing the controller:
//! - Named, versioned partitions mapping request URLs to stored responses
//! - A static partition populated once at install, a dynamic partition
//!   that grows as matching fetches are observed
//! - Wholesale partition deletion for generation turnover at activation
//! - Queued offline submissions stored alongside cached responses

mod storage;
mod traits;

pub use storage::{MemoryStore, SqliteStore};
pub use traits::{CacheStore, Entry};
