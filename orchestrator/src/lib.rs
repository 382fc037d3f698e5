//! Orchestrator: ties the parameter space, cache, queue,
//! progress bus, project DB, and strategy set together behind two RPCs,
//! `Optimize` and `GetRecommendations`, plus a task/cache management
//! surface for inspecting and canceling in-flight work.

pub mod config;
pub mod error;
pub mod request;
pub mod runtime;

pub use config::RuntimeConfig;
pub use error::{OrchestratorError, OrchestratorResult};
pub use request::{
    CacheInvalidateAck, GetRecommendationsRequest, GetRecommendationsResult, OptimizeOutcome,
    OptimizeRequest, OptimizeResult,
};
pub use runtime::{Runtime, RuntimeCollaborators};

/// Installs a `tracing` subscriber honoring `RUST_LOG`, falling back to
/// `info` when the variable is unset. Intended for binaries
/// embedding this crate; library consumers that already configure `tracing`
/// should not call this.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
