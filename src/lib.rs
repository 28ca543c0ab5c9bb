pub mod cli;
pub mod config;
pub mod generator;
pub mod llm;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use generator::pipeline::{
    PipelineOutput, ResearchRequest, initialize_research_pipeline, launch,
};
