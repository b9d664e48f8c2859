// Port Layer - Interfaces for external dependencies

pub mod admission_gateway;
pub mod generation_pipeline;
pub mod id_provider; // For deterministic testing
pub mod rate_window_repository;
pub mod time_provider;

// Re-exports
pub use admission_gateway::AdmissionGateway;
pub use generation_pipeline::{
    GenerationArtifact, GenerationPipeline, GenerationRequest, PipelineError,
};
pub use id_provider::IdProvider;
pub use rate_window_repository::RateWindowRepository;
pub use time_provider::TimeProvider;
