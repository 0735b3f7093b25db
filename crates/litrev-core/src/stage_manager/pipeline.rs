use std::collections::{HashMap, HashSet};

use log::{info, warn};

use crate::kernel::error::{Error, Result};
use crate::stage_manager::error::StageSystemError;
use crate::stage_manager::registry::SharedStageRegistry;
use crate::stage_manager::{StageContext, StageResult};

/// Static definition of a pipeline, referenced by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDefinition {
    pub name: &'static str,
    /// Ordered stage IDs included in this pipeline
    pub stages: &'static [&'static str],
    pub description: Option<&'static str>,
}

/// Stage execution pipeline
pub struct StagePipeline {
    name: String,
    description: String,
    /// Ordered list of stage IDs to execute
    stages: Vec<String>,
    /// Optional dependencies between stages
    dependencies: HashMap<String, Vec<String>>,
}

impl StagePipeline {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            stages: Vec::new(),
            dependencies: HashMap::new(),
        }
    }

    /// Add a stage ID; validation against a registry happens later.
    pub fn add_stage(&mut self, stage_id: &str) {
        if !self.stages.contains(&stage_id.to_string()) {
            self.stages.push(stage_id.to_string());
        }
    }

    pub fn add_stages(&mut self, stage_ids: &[&str]) {
        for stage_id in stage_ids {
            self.add_stage(stage_id);
        }
    }

    /// Add a dependency between two stages already in the pipeline.
    pub fn add_dependency(&mut self, stage_id: &str, depends_on: &str) -> Result<()> {
        for id in [stage_id, depends_on] {
            if !self.stages.contains(&id.to_string()) {
                return Err(Error::from(StageSystemError::PipelineValidationFailed {
                    reason: format!(
                        "stage '{}' must be added to pipeline '{}' before adding a dependency",
                        id, self.name
                    ),
                }));
            }
        }
        self.dependencies
            .entry(stage_id.to_string())
            .or_default()
            .push(depends_on.to_string());
        Ok(())
    }

    /// Validate stage existence against a registry and reject dependency
    /// cycles.
    pub async fn validate(&self, registry: &SharedStageRegistry) -> Result<()> {
        let mut visited = HashSet::new();
        let mut stack = HashSet::new();

        for stage_id in &self.stages {
            if !registry.has_stage(stage_id).await {
                return Err(Error::from(
                    StageSystemError::StageNotFoundInPipelineDefinition {
                        pipeline_name: self.name.clone(),
                        stage_id: stage_id.clone(),
                    },
                ));
            }
            if !visited.contains(stage_id) && self.has_cycle(stage_id, &mut visited, &mut stack) {
                return Err(Error::from(StageSystemError::DependencyCycleDetected {
                    pipeline_name: self.name.clone(),
                    stage_id: stage_id.clone(),
                }));
            }
        }
        Ok(())
    }

    /// DFS cycle check over the dependency graph.
    fn has_cycle(
        &self,
        stage_id: &str,
        visited: &mut HashSet<String>,
        stack: &mut HashSet<String>,
    ) -> bool {
        visited.insert(stage_id.to_string());
        stack.insert(stage_id.to_string());

        if let Some(deps) = self.dependencies.get(stage_id) {
            for dep in deps {
                if !visited.contains(dep) {
                    if self.has_cycle(dep, visited, stack) {
                        return true;
                    }
                } else if stack.contains(dep) {
                    return true;
                }
            }
        }

        stack.remove(stage_id);
        false
    }

    /// Topologically sorted execution order. Validation must have run
    /// beforehand.
    fn get_execution_order(&self) -> Result<Vec<String>> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut temp_mark = HashSet::new();

        for stage_id in &self.stages {
            if !visited.contains(stage_id) {
                self.visit_for_topsort(stage_id, &mut visited, &mut temp_mark, &mut result)?;
            }
        }
        Ok(result)
    }

    fn visit_for_topsort(
        &self,
        stage_id: &str,
        visited: &mut HashSet<String>,
        temp_mark: &mut HashSet<String>,
        result: &mut Vec<String>,
    ) -> Result<()> {
        if temp_mark.contains(stage_id) {
            return Err(Error::from(StageSystemError::DependencyCycleDetected {
                pipeline_name: self.name.clone(),
                stage_id: stage_id.to_string(),
            }));
        }
        if visited.contains(stage_id) {
            return Ok(());
        }

        temp_mark.insert(stage_id.to_string());
        if let Some(deps) = self.dependencies.get(stage_id) {
            for dep in deps {
                self.visit_for_topsort(dep, visited, temp_mark, result)?;
            }
        }
        temp_mark.remove(stage_id);
        visited.insert(stage_id.to_string());
        result.push(stage_id.to_string());
        Ok(())
    }

    /// Execute the pipeline using the provided shared registry. Aborts on
    /// the first stage failure.
    pub async fn execute(
        &mut self,
        context: &mut StageContext,
        registry: &SharedStageRegistry,
    ) -> Result<HashMap<String, StageResult>> {
        info!("Executing pipeline: {} - {}", self.name, self.description);

        self.validate(registry).await?;

        if context.is_dry_run() {
            info!("Pipeline '{}' validated in dry run mode", self.name);
            let execution_order = self.get_execution_order()?;
            let results = execution_order
                .into_iter()
                .map(|id| (id, StageResult::Success))
                .collect();
            return Ok(results);
        }

        // Stages can reach back into the registry through the context.
        context.set_data("stage_registry_arc", registry.clone());

        let execution_order = self.get_execution_order()?;
        let mut results = HashMap::new();

        for stage_id in execution_order {
            let result = registry.execute_stage(&stage_id, context).await?;
            results.insert(stage_id.clone(), result.clone());

            if let StageResult::Failure(_) = result {
                warn!("Pipeline '{}' aborted at stage: {}", self.name, stage_id);
                break;
            }
        }

        Ok(results)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn stages(&self) -> &[String] {
        &self.stages
    }
}

/// Pipeline builder for simplified pipeline creation
pub struct PipelineBuilder {
    pipeline: StagePipeline,
}

impl PipelineBuilder {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            pipeline: StagePipeline::new(name, description),
        }
    }

    pub fn add_stage(mut self, stage_id: &str) -> Self {
        self.pipeline.add_stage(stage_id);
        self
    }

    pub fn add_stages(mut self, stage_ids: &[&str]) -> Self {
        self.pipeline.add_stages(stage_ids);
        self
    }

    pub fn add_dependency(mut self, stage_id: &str, depends_on: &str) -> Self {
        let _ = self.pipeline.add_dependency(stage_id, depends_on);
        self
    }

    /// Build the pipeline. Validation against a registry is separate.
    pub fn build(self) -> StagePipeline {
        self.pipeline
    }
}
