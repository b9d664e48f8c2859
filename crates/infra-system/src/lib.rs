// Vivid Infrastructure - System Adapters
// Implements: GenerationPipeline (external generator process)

pub mod subprocess_pipeline;

pub use subprocess_pipeline::{SubprocessPipeline, SubprocessPipelineConfig};
