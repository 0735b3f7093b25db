use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageSystemError {
    #[error("Stage '{stage_id}' not found")]
    StageNotFound { stage_id: String },

    #[error("Stage '{stage_id}' already exists in the registry")]
    StageAlreadyExists { stage_id: String },

    #[error("Pipeline validation failed: {reason}")]
    PipelineValidationFailed { reason: String },

    #[error("Pipeline '{pipeline_name}': stage '{stage_id}' not found in registry")]
    StageNotFoundInPipelineDefinition {
        pipeline_name: String,
        stage_id: String,
    },

    #[error("Dependency cycle detected in pipeline '{pipeline_name}' at stage '{stage_id}'")]
    DependencyCycleDetected {
        pipeline_name: String,
        stage_id: String,
    },

    #[error("Stage execution failed for stage '{stage_id}': {source}")]
    StageExecutionFailed {
        stage_id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Error accessing data from stage context: key '{key}' - {reason}")]
    ContextError { key: String, reason: String },

    #[error("Internal stage manager error: {0}")]
    InternalError(String),
}
