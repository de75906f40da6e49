//! Provider/model capability types and limit resolvers shared across the orchestrator.
//!
//! `ModelSpec` and `ModelLimitResolver` let the Inference Driver (C4) compute an output
//! token budget without depending on any concrete provider adapter; `ProviderCapabilities`
//! lets the orchestrator select a provider by declared capability rather than by type name,
//! per the port-and-adapter redesign called for in the core design.

mod cached;
mod composite;
mod config_override;
mod local_file;
mod resolver;
mod spec;

pub use cached::CachedResolver;
pub use composite::CompositeResolver;
pub use config_override::ConfigOverride;
pub use local_file::LocalFileResolver;
pub use resolver::ModelLimitResolver;
pub use spec::{ModelSpec, ProviderCapabilities};
