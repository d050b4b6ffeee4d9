//! A thin gateway in front of third-party generation APIs.
//!
//! Each operation validates its input, checks that the relevant credential
//! is configured, performs one upstream call (or a submission followed by a
//! bounded poll loop) and returns either a single-key success payload or an
//! `{"error": ...}` envelope.

pub mod config;
pub mod error;
pub mod gateway;
pub mod logger;
pub mod models;
#[cfg(feature = "server")]
pub mod server;
pub mod upstream;

pub use config::{
    GatewayConfig, ImageBackend, PexelsConfig, PollPolicy, StabilityConfig, TextGenConfig,
};
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, ImageClient, JobPoller, Sleeper, TextClient, TokioSleeper, VideoClient};
pub use models::*;
pub use upstream::{HttpTransport, UpstreamRequest, UpstreamResponse, UpstreamTransport};
