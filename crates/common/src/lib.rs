//! Shared building blocks for the courier services: the notification model,
//! its binary codec, errors, configuration and connection helpers.

pub mod codec;
pub mod config;
pub mod db;
pub mod delay_queue;
pub mod error;
pub mod redis_pool;
pub mod response;
pub mod types;
