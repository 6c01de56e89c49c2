//! # sc-infra
//!
//! Adapters behind the `sc-core` ports: the HTTP gateway, the presigned
//! upload transport, configuration loading and the system clock.

pub mod config;
pub mod http;
pub mod time;
pub mod upload;

pub use http::HttpGateway;
pub use time::SystemClock;
pub use upload::PresignedUploader;
