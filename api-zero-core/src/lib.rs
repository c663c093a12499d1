//! Transport-free building blocks for api-zero.
//!
//! This crate provides the types shared by the request pipeline and its
//! transports, independent of any HTTP client implementation.
//!
//! ## Modules
//!
//! - [`error`]: The uniform request error and its classification
//! - [`data`]: Decoded response payloads and decoding modes
//! - [`body`]: Request payloads and their wire encoding
//! - [`params`]: Query parameter serialization
//! - [`interceptor`]: Ordered interceptor registry with stable ids
//! - [`retry`]: Retry policy and backoff executor
//! - [`config`]: The effective per-request configuration

mod body;
mod config;
mod data;
mod error;
mod interceptor;
mod params;
pub mod retry;

pub use body::*;
pub use config::*;
pub use data::*;
pub use error::*;
pub use interceptor::*;
pub use params::*;
pub use retry::{Backoff, BackoffFn, RetryCondition, RetryPolicy, with_retry};

pub use tokio_util::sync::CancellationToken;
