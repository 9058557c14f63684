//! Notification lifecycle: validation, cache-aside storage and scheduling.

pub mod cache;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod service;
pub mod storage;
pub mod store;
pub mod validation;
