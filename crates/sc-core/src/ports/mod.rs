//! Port interfaces for the application layer
//!
//! Ports define the contract between the orchestration logic (use cases)
//! and infrastructure implementations. The backend, the upload transport and
//! the wall clock are all reached through these traits so the orchestrator
//! can be exercised in isolation.

mod clock;
pub mod gateway;
pub mod upload;

pub use clock::ClockPort;
pub use gateway::{GatewayError, GatewayPort, GatewayRequest, HttpMethod};
pub use upload::{PresignedUpload, UploadPort};
