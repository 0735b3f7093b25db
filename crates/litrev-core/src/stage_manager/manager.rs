use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::event::types::ReviewEvent;
use crate::event::EventManager;
use crate::kernel::component::KernelComponent;
use crate::kernel::error::{Error as KernelError, Result};
use crate::stage_manager::error::StageSystemError;
use crate::stage_manager::pipeline::{PipelineBuilder, StagePipeline};
use crate::stage_manager::registry::SharedStageRegistry;
use crate::stage_manager::review_stages::{self, FULL_REVIEW_PIPELINE};
use crate::stage_manager::{Stage, StageContext, StageResult};

/// Interface for the stage management component
#[async_trait]
pub trait StageManager: KernelComponent {
    /// Register a new stage
    async fn register_stage(&self, stage: Box<dyn Stage>) -> Result<()>;

    /// Check if a stage exists
    async fn has_stage(&self, id: &str) -> Result<bool>;

    /// Get all registered stage IDs
    async fn get_stage_ids(&self) -> Result<Vec<String>>;

    /// Create a new pipeline from a set of stage IDs
    async fn create_pipeline(
        &self,
        name: &str,
        description: &str,
        stage_ids: Vec<String>,
    ) -> Result<StagePipeline>;

    /// Retrieve a predefined pipeline by its name
    async fn get_pipeline_by_name(&self, name: &str) -> Result<Option<StagePipeline>>;

    /// Execute a pipeline with the given context
    async fn execute_pipeline(
        &self,
        pipeline: &mut StagePipeline,
        context: &mut StageContext,
    ) -> Result<HashMap<String, StageResult>>;

    /// Execute a single stage
    async fn execute_stage(&self, stage_id: &str, context: &mut StageContext)
        -> Result<StageResult>;

    /// Check a pipeline against the manager's registry
    async fn validate_pipeline(&self, pipeline: &StagePipeline) -> Result<()>;
}

/// Default implementation of [`StageManager`] over a shared registry.
#[derive(Clone, Debug)]
pub struct DefaultStageManager {
    name: &'static str,
    shared_registry: SharedStageRegistry,
    event_manager: Arc<dyn EventManager>,
}

impl DefaultStageManager {
    pub fn new(event_manager: Arc<dyn EventManager>) -> Self {
        Self {
            name: "DefaultStageManager",
            shared_registry: SharedStageRegistry::new(),
            event_manager,
        }
    }

    /// Access the underlying stage registry
    pub fn registry(&self) -> SharedStageRegistry {
        self.shared_registry.clone()
    }
}

#[async_trait]
impl KernelComponent for DefaultStageManager {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn initialize(&self) -> Result<()> {
        debug!("Registering review stages");
        for stage in review_stages::all_stages() {
            self.register_stage(stage).await?;
        }
        let mut registry = self.shared_registry.registry.lock().await;
        registry.register_pipeline_definition(FULL_REVIEW_PIPELINE.clone());
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl StageManager for DefaultStageManager {
    async fn register_stage(&self, stage: Box<dyn Stage>) -> Result<()> {
        self.shared_registry.register_stage(stage).await
    }

    async fn has_stage(&self, id: &str) -> Result<bool> {
        Ok(self.shared_registry.has_stage(id).await)
    }

    async fn get_stage_ids(&self) -> Result<Vec<String>> {
        Ok(self.shared_registry.get_all_ids().await)
    }

    async fn create_pipeline(
        &self,
        name: &str,
        description: &str,
        stage_ids: Vec<String>,
    ) -> Result<StagePipeline> {
        let mut builder = PipelineBuilder::new(name, description);
        for id in &stage_ids {
            if !self.shared_registry.has_stage(id).await {
                return Err(KernelError::from(StageSystemError::StageNotFound {
                    stage_id: id.to_string(),
                }));
            }
            builder = builder.add_stage(id);
        }
        Ok(builder.build())
    }

    async fn get_pipeline_by_name(&self, name: &str) -> Result<Option<StagePipeline>> {
        let registry_guard = self.shared_registry.registry.lock().await;
        let Some(pipeline_def) = registry_guard.get_pipeline_definition(name) else {
            return Ok(None);
        };
        let mut builder =
            PipelineBuilder::new(pipeline_def.name, pipeline_def.description.unwrap_or(""));
        for stage_id in pipeline_def.stages {
            if !registry_guard.has_stage(stage_id) {
                return Err(KernelError::from(
                    StageSystemError::StageNotFoundInPipelineDefinition {
                        pipeline_name: name.to_string(),
                        stage_id: stage_id.to_string(),
                    },
                ));
            }
            builder = builder.add_stage(stage_id);
        }
        Ok(Some(builder.build()))
    }

    async fn execute_pipeline(
        &self,
        pipeline: &mut StagePipeline,
        context: &mut StageContext,
    ) -> Result<HashMap<String, StageResult>> {
        let pipeline_name = pipeline.name().to_string();
        let execution_result = pipeline.execute(context, &self.shared_registry).await;

        self.event_manager
            .queue_event(Box::new(ReviewEvent::OperationCompleted {
                operation: pipeline_name,
                success: execution_result.is_ok(),
            }))
            .await;
        self.event_manager.process_queue().await;

        execution_result
    }

    async fn execute_stage(
        &self,
        stage_id: &str,
        context: &mut StageContext,
    ) -> Result<StageResult> {
        self.event_manager
            .dispatch(&ReviewEvent::OperationBegin { operation: stage_id.to_string() })
            .await;
        let result = self.shared_registry.execute_stage(stage_id, context).await;
        self.event_manager
            .dispatch(&ReviewEvent::OperationCompleted {
                operation: stage_id.to_string(),
                success: matches!(result, Ok(StageResult::Success)),
            })
            .await;
        result
    }

    async fn validate_pipeline(&self, pipeline: &StagePipeline) -> Result<()> {
        pipeline.validate(&self.shared_registry).await
    }
}
