use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::Mutex;

use crate::kernel::error::{Error as KernelError, Result as KernelResult};
use crate::stage_manager::error::StageSystemError;
use crate::stage_manager::pipeline::PipelineDefinition;
use crate::stage_manager::{Stage, StageContext, StageResult};

/// Registry for managing stages and named pipeline definitions
pub struct StageRegistry {
    /// Registered stages by ID
    stages: HashMap<String, Box<dyn Stage>>,
    /// Named pipeline definitions
    pipelines: HashMap<&'static str, PipelineDefinition>,
}

impl fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage_ids: Vec<&String> = self.stages.keys().collect();
        f.debug_struct("StageRegistry")
            .field("stages", &stage_ids)
            .field("pipelines", &self.pipelines.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StageRegistry {
    pub fn new() -> Self {
        Self {
            stages: HashMap::new(),
            pipelines: HashMap::new(),
        }
    }

    /// Register a stage
    pub fn register_stage(&mut self, stage: Box<dyn Stage>) -> Result<(), StageSystemError> {
        let id = stage.id().to_string();
        if self.stages.contains_key(&id) {
            return Err(StageSystemError::StageAlreadyExists { stage_id: id });
        }
        self.stages.insert(id, stage);
        Ok(())
    }

    /// Register a named pipeline definition
    pub fn register_pipeline_definition(&mut self, definition: PipelineDefinition) {
        self.pipelines.insert(definition.name, definition);
    }

    pub fn get_pipeline_definition(&self, name: &str) -> Option<&PipelineDefinition> {
        self.pipelines.get(name)
    }

    pub fn has_stage(&self, id: &str) -> bool {
        self.stages.contains_key(id)
    }

    pub fn remove_stage(&mut self, id: &str) -> Option<Box<dyn Stage>> {
        self.stages.remove(id)
    }

    pub fn get_all_ids(&self) -> Vec<String> {
        self.stages.keys().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.stages.len()
    }

    pub fn clear(&mut self) {
        self.stages.clear();
    }

    /// Execute a specific stage. Dry run mode short-circuits with the
    /// stage's own description of what it would do.
    pub async fn execute_stage_internal(
        &self,
        id: &str,
        context: &mut StageContext,
    ) -> Result<StageResult, StageSystemError> {
        let stage = self
            .stages
            .get(id)
            .ok_or_else(|| StageSystemError::StageNotFound { stage_id: id.to_string() })?;

        info!("Executing stage: {} ({})", stage.name(), id);

        if context.is_dry_run() {
            info!("DRY RUN: {}", stage.dry_run_description(context));
            return Ok(StageResult::Success);
        }

        match stage.execute(context).await {
            Ok(()) => {
                debug!("Stage completed successfully: {}", id);
                Ok(StageResult::Success)
            }
            Err(source_err) => Err(StageSystemError::StageExecutionFailed {
                stage_id: id.to_string(),
                source: Box::new(source_err),
            }),
        }
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe stage registry using Tokio's mutex
#[derive(Clone, Debug)]
pub struct SharedStageRegistry {
    pub registry: Arc<Mutex<StageRegistry>>,
}

impl SharedStageRegistry {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(StageRegistry::new())),
        }
    }

    /// Get a cloned reference to the registry
    pub fn registry(&self) -> Arc<Mutex<StageRegistry>> {
        self.registry.clone()
    }

    pub async fn register_stage(&self, stage: Box<dyn Stage>) -> KernelResult<()> {
        let mut registry = self.registry.lock().await;
        registry.register_stage(stage).map_err(KernelError::from)
    }

    pub async fn has_stage(&self, id: &str) -> bool {
        let registry = self.registry.lock().await;
        registry.has_stage(id)
    }

    pub async fn execute_stage(
        &self,
        id: &str,
        context: &mut StageContext,
    ) -> KernelResult<StageResult> {
        let registry = self.registry.lock().await;
        registry
            .execute_stage_internal(id, context)
            .await
            .map_err(KernelError::from)
    }

    pub async fn get_all_ids(&self) -> Vec<String> {
        let registry = self.registry.lock().await;
        registry.get_all_ids()
    }
}

impl Default for SharedStageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
