//! test-server library
//!
//! A minimal metrics-exporting HTTP server. A background [`sampler`] keeps
//! host CPU, memory and network gauges fresh, a request [`middleware`] counts
//! and times every HTTP request, and [`router`] exposes everything through
//! `/metrics` next to `/` and `/health`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use test_server::{router, sampler, AppState, Config, ProcSource, Sampler, SamplerSettings};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let state = Arc::new(AppState::new(Config::default())?);
//!
//! let handle = sampler::spawn(Sampler::new(
//!     Arc::new(ProcSource),
//!     state.metrics.clone(),
//!     SamplerSettings::default(),
//! ));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, router(state)).await?;
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod collectors;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod sampler;
pub mod state;
pub mod system;

// Re-export main types for convenience
pub use config::Config;
pub use metrics::ServerMetrics;
pub use router::router;
pub use sampler::{Sampler, SamplerHandle, SamplerSettings, SampleReport};
pub use state::{AppState, SharedState};
pub use system::{ProcSource, SampleError, SystemSource};
