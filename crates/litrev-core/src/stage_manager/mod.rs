pub mod context;
pub mod error;
pub mod manager;
pub mod pipeline;
pub mod registry;
pub mod review_stages;

use std::fmt;

use async_trait::async_trait;

use crate::kernel::error::Result;

/// Core trait that all stages must implement
#[async_trait]
pub trait Stage: Send + Sync {
    /// The unique identifier of the stage
    fn id(&self) -> &str;

    /// The human-readable name of the stage
    fn name(&self) -> &str;

    /// The description of what this stage does
    fn description(&self) -> &str;

    /// Execute the stage with the given context
    async fn execute(&self, context: &mut context::StageContext) -> Result<()>;

    /// Describe what this stage would do in dry run mode
    fn dry_run_description(&self, _context: &context::StageContext) -> String {
        format!("Would execute stage: {}", self.name())
    }
}

/// Result of a stage execution
#[derive(Clone, Debug)]
pub enum StageResult {
    /// Stage executed successfully
    Success,
    /// Stage failed with error
    Failure(String),
    /// Stage was skipped
    Skipped(String),
}

impl fmt::Display for StageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageResult::Success => write!(f, "Success"),
            StageResult::Failure(msg) => write!(f, "Failure: {}", msg),
            StageResult::Skipped(reason) => write!(f, "Skipped: {}", reason),
        }
    }
}

pub use context::{ExecutionMode, StageContext};
pub use error::StageSystemError;
pub use manager::{DefaultStageManager, StageManager};
pub use pipeline::{PipelineBuilder, PipelineDefinition, StagePipeline};
pub use registry::{SharedStageRegistry, StageRegistry};
pub use review_stages::FULL_REVIEW_PIPELINE;
