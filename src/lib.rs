//! Portico - Gateway Protocol Core
//!
//! The adapter contract between a byte-level transport and an application
//! callable: per-request environment construction, response validation,
//! response transmission, and error recovery when the application fails
//! mid-response.

pub mod config;
pub mod gateway;
pub mod util;
