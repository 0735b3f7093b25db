use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};

use crate::event::manager::{DefaultEventManager, EventManager};
use crate::event::types::ReviewEvent;
use crate::kernel::error::{Error, Result};
use crate::package_system::endpoint::{
    EndpointSelection, EndpointType, OperationContext, RecordStatusMatrix,
};
use crate::package_system::manager::{DefaultPackageManager, PackageManager};
use crate::record::dataset::Dataset;
use crate::record::RecordState;
use crate::stage_manager::context::StageContext;
use crate::stage_manager::error::StageSystemError;
use crate::stage_manager::pipeline::PipelineDefinition;
use crate::stage_manager::Stage;
use crate::storage::manager::{DefaultStorageManager, StorageManager};

/// Context key under which the storage manager is shared with stages.
pub const STORAGE_MANAGER_KEY: &str = "storage_manager_arc";
/// Context key under which the package manager is shared with stages.
pub const PACKAGE_MANAGER_KEY: &str = "package_manager_arc";
/// Context key under which the event manager is shared with stages.
pub const EVENT_MANAGER_KEY: &str = "event_manager_arc";

/// Standalone operation fetching new results from the configured sources;
/// not part of the review pipeline.
pub const SEARCH_STAGE_ID: &str = "review.search";

pub const LOAD_STAGE_ID: &str = "review.load";
pub const PREP_STAGE_ID: &str = "review.prep";
pub const DEDUPE_STAGE_ID: &str = "review.dedupe";
pub const PRESCREEN_STAGE_ID: &str = "review.prescreen";
pub const PDF_GET_STAGE_ID: &str = "review.pdf_get";
pub const PDF_PREP_STAGE_ID: &str = "review.pdf_prep";
pub const SCREEN_STAGE_ID: &str = "review.screen";
pub const DATA_STAGE_ID: &str = "review.data";

/// The full review pipeline, in workflow order.
pub const FULL_REVIEW_PIPELINE: PipelineDefinition = PipelineDefinition {
    name: "full_review",
    stages: &[
        LOAD_STAGE_ID,
        PREP_STAGE_ID,
        DEDUPE_STAGE_ID,
        PRESCREEN_STAGE_ID,
        PDF_GET_STAGE_ID,
        PDF_PREP_STAGE_ID,
        SCREEN_STAGE_ID,
        DATA_STAGE_ID,
    ],
    description: Some("Run every review operation from load to data"),
};

/// All review stages, used by the stage manager during initialization.
pub fn all_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(SearchStage),
        Box::new(LoadStage),
        Box::new(PrepStage),
        Box::new(DedupeStage),
        Box::new(PrescreenStage),
        Box::new(PdfGetStage),
        Box::new(PdfPrepStage),
        Box::new(ScreenStage),
        Box::new(DataStage),
    ]
}

fn storage_from(context: &StageContext) -> Result<Arc<DefaultStorageManager>> {
    context
        .get_data::<Arc<DefaultStorageManager>>(STORAGE_MANAGER_KEY)
        .cloned()
        .ok_or_else(|| {
            Error::from(StageSystemError::ContextError {
                key: STORAGE_MANAGER_KEY.to_string(),
                reason: "storage manager not present in stage context".to_string(),
            })
        })
}

fn packages_from(context: &StageContext) -> Result<Arc<DefaultPackageManager>> {
    context
        .get_data::<Arc<DefaultPackageManager>>(PACKAGE_MANAGER_KEY)
        .cloned()
        .ok_or_else(|| {
            Error::from(StageSystemError::ContextError {
                key: PACKAGE_MANAGER_KEY.to_string(),
                reason: "package manager not present in stage context".to_string(),
            })
        })
}

struct OperationEnv {
    storage: Arc<DefaultStorageManager>,
    packages: Arc<DefaultPackageManager>,
    events: Option<Arc<DefaultEventManager>>,
    ctx: OperationContext,
    dataset: Dataset,
    initial_states: BTreeMap<String, RecordState>,
}

impl OperationEnv {
    /// Save the record store and dispatch a status-change event for every
    /// record the operation moved. Records the operation did not touch are
    /// skipped; records it created start from retrieved.
    async fn finish(self, operation: &str) -> Result<()> {
        if let Some(events) = &self.events {
            for record in self.dataset.iter() {
                let from = self
                    .initial_states
                    .get(&record.id)
                    .copied()
                    .unwrap_or(RecordState::MdRetrieved);
                if from == record.status {
                    continue;
                }
                events
                    .dispatch(&ReviewEvent::RecordStatusChanged {
                        record_id: record.id.clone(),
                        from,
                        to: record.status,
                    })
                    .await;
            }
        }
        self.dataset.save(&self.storage, operation)?;
        Ok(())
    }
}

/// Shared setup for every review stage: managers from the context, the
/// project settings shaped by the review type, and the loaded record store.
async fn operation_env(operation: &str, context: &StageContext) -> Result<OperationEnv> {
    let storage = storage_from(context)?;
    let packages = packages_from(context)?;
    let events = context
        .get_data::<Arc<DefaultEventManager>>(EVENT_MANAGER_KEY)
        .cloned();

    let mut settings = storage.load_settings()?;
    // The review type may fill in defaults, e.g. unset stage endpoints.
    // An unavailable review type is tolerated so the settings pass as-is.
    let review_selection = EndpointSelection::new(&settings.project.review_type);
    let boot_ctx = OperationContext::new(
        operation,
        storage.project_root(),
        Arc::new(settings.clone()),
    );
    let review_types = packages
        .load_packages(
            EndpointType::ReviewType,
            std::slice::from_ref(&review_selection),
            &boot_ctx,
            true,
        )
        .await?;
    for loaded in &review_types {
        loaded.instance.expect_review_type()?.customize(&mut settings)?;
    }

    let ctx = OperationContext::new(operation, storage.project_root(), Arc::new(settings));
    let dataset = Dataset::load(&storage)?;
    let initial_states = dataset
        .iter()
        .map(|record| (record.id.clone(), record.status))
        .collect();
    Ok(OperationEnv {
        storage,
        packages,
        events,
        ctx,
        dataset,
        initial_states,
    })
}

/// Fetch new result files from the configured search sources.
pub struct SearchStage;

#[async_trait]
impl Stage for SearchStage {
    fn id(&self) -> &str {
        SEARCH_STAGE_ID
    }

    fn name(&self) -> &str {
        "Search"
    }

    fn description(&self) -> &str {
        "Retrieve records from the configured search sources"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<()> {
        let env = operation_env("search", context).await?;
        let sources = env.ctx.settings.sources.clone();
        for source in &sources {
            let selection = EndpointSelection::new(&source.endpoint);
            let loaded = env
                .packages
                .load_packages(
                    EndpointType::SearchSource,
                    std::slice::from_ref(&selection),
                    &env.ctx,
                    true,
                )
                .await?;
            let Some(loaded) = loaded.first() else {
                continue;
            };
            let records = loaded
                .instance
                .expect_search_source()?
                .run_search(&env.ctx)
                .await?;
            if records.is_empty() {
                info!("{}: no new results", source.endpoint);
                continue;
            }
            let entries: Vec<serde_json::Value> = records
                .iter()
                .map(|record| {
                    let mut entry = serde_json::Map::new();
                    entry.insert("id".to_string(), serde_json::json!(record.id));
                    entry.insert("entrytype".to_string(), serde_json::json!(record.entrytype));
                    for (field, value) in &record.fields {
                        entry.insert(field.clone(), serde_json::json!(value));
                    }
                    serde_json::Value::Object(entry)
                })
                .collect();
            let raw = serde_json::to_string_pretty(&entries)
                .map_err(|e| Error::Other(e.to_string()))?;
            let path = env.ctx.search_dir.join(&source.filename);
            env.storage.provider().write_string(&path, &raw)?;
            info!(
                "{}: wrote {} result(s) to {}",
                source.endpoint,
                records.len(),
                path.display()
            );
        }
        env.finish("search").await
    }
}

/// Import search result files as records.
pub struct LoadStage;

#[async_trait]
impl Stage for LoadStage {
    fn id(&self) -> &str {
        LOAD_STAGE_ID
    }

    fn name(&self) -> &str {
        "Load"
    }

    fn description(&self) -> &str {
        "Convert search result files into records"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<()> {
        let mut env = operation_env("load", context).await?;
        let selections = &env.ctx.settings.load.load_package_endpoints;
        let endpoints = env
            .packages
            .load_packages(EndpointType::LoadConversion, selections, &env.ctx, false)
            .await?;

        let provider = env.storage.provider();
        let search_dir = env.storage.search_dir();
        let files = if provider.is_dir(&search_dir) {
            provider.read_dir(&search_dir)?
        } else {
            Vec::new()
        };

        let mut imported = 0usize;
        for file in files.iter().filter(|p| provider.is_file(p)) {
            let Some(extension) = file.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            let Some(loaded) = endpoints.iter().find(|loaded| {
                loaded
                    .instance
                    .expect_load_conversion()
                    .map(|e| e.supported_extensions().contains(&extension))
                    .unwrap_or(false)
            }) else {
                warn!("No load endpoint supports '{}', skipping", file.display());
                continue;
            };
            let converter = loaded.instance.expect_load_conversion()?;
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();

            for mut record in converter.load(&env.ctx, file).await? {
                let origin = format!("{}/{}", filename, record.id);
                if env.dataset.iter().any(|r| r.origins.contains(&origin)) {
                    continue;
                }
                record.origins.push(origin);
                record.id = env.dataset.unique_id(&record.id);
                record.status = RecordState::MdRetrieved;
                record.set_status(RecordState::MdImported)?;
                env.dataset.insert(record)?;
                imported += 1;
            }
        }

        info!("Loaded {} records", imported);
        env.finish("load").await
    }

    fn dry_run_description(&self, _context: &StageContext) -> String {
        "Would convert search result files into records".to_string()
    }
}

/// Improve record metadata via the configured prep endpoints.
pub struct PrepStage;

#[async_trait]
impl Stage for PrepStage {
    fn id(&self) -> &str {
        PREP_STAGE_ID
    }

    fn name(&self) -> &str {
        "Prep"
    }

    fn description(&self) -> &str {
        "Improve the metadata of imported records"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<()> {
        let mut env = operation_env("prep", context).await?;
        let selections = &env.ctx.settings.prep.prep_package_endpoints;
        let endpoints = env
            .packages
            .load_packages(EndpointType::Prep, selections, &env.ctx, false)
            .await?;

        let ids = env.dataset.ids_in_state(RecordState::MdImported);
        let mut needs_manual = 0usize;
        for id in &ids {
            let Some(record) = env.dataset.get_mut(id) else {
                continue;
            };
            let mut complete = true;
            for loaded in &endpoints {
                if !loaded.instance.expect_prep()?.prepare(&env.ctx, record).await? {
                    complete = false;
                }
            }
            if complete {
                record.set_status(RecordState::MdPrepared)?;
            } else {
                record.set_status(RecordState::MdNeedsManualPreparation)?;
                needs_manual += 1;
            }
        }

        // Manual pass over the records automated prep could not finish
        let man_selections = &env.ctx.settings.prep.prep_man_package_endpoints;
        let man_endpoints = env
            .packages
            .load_packages(EndpointType::PrepMan, man_selections, &env.ctx, false)
            .await?;
        for loaded in &man_endpoints {
            loaded
                .instance
                .expect_prep_man()?
                .prepare_manual(&env.ctx, &mut env.dataset)
                .await?;
        }

        info!(
            "Prepared {} records, {} need manual preparation",
            ids.len() - needs_manual,
            needs_manual
        );
        env.finish("prep").await
    }
}

/// Merge duplicate records.
pub struct DedupeStage;

#[async_trait]
impl Stage for DedupeStage {
    fn id(&self) -> &str {
        DEDUPE_STAGE_ID
    }

    fn name(&self) -> &str {
        "Dedupe"
    }

    fn description(&self) -> &str {
        "Merge duplicate records"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<()> {
        let mut env = operation_env("dedupe", context).await?;
        let selections = &env.ctx.settings.dedupe.dedupe_package_endpoints;
        let endpoints = env
            .packages
            .load_packages(EndpointType::Dedupe, selections, &env.ctx, false)
            .await?;

        let mut merged = 0usize;
        for loaded in &endpoints {
            merged += loaded
                .instance
                .expect_dedupe()?
                .run_dedupe(&env.ctx, &mut env.dataset)
                .await?;
        }

        for id in env.dataset.ids_in_state(RecordState::MdPrepared) {
            if let Some(record) = env.dataset.get_mut(&id) {
                record.set_status(RecordState::MdProcessed)?;
            }
        }

        info!("Merged {} duplicates", merged);
        env.finish("dedupe").await
    }
}

/// Include or exclude records on metadata alone.
pub struct PrescreenStage;

#[async_trait]
impl Stage for PrescreenStage {
    fn id(&self) -> &str {
        PRESCREEN_STAGE_ID
    }

    fn name(&self) -> &str {
        "Prescreen"
    }

    fn description(&self) -> &str {
        "Screen records based on metadata"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<()> {
        let mut env = operation_env("prescreen", context).await?;
        let selections = &env.ctx.settings.prescreen.prescreen_package_endpoints;
        let endpoints = env
            .packages
            .load_packages(EndpointType::Prescreen, selections, &env.ctx, false)
            .await?;

        for loaded in &endpoints {
            loaded
                .instance
                .expect_prescreen()?
                .run_prescreen(&env.ctx, &mut env.dataset)
                .await?;
        }

        env.finish("prescreen").await
    }
}

/// Retrieve full-text documents for prescreen-included records.
pub struct PdfGetStage;

#[async_trait]
impl Stage for PdfGetStage {
    fn id(&self) -> &str {
        PDF_GET_STAGE_ID
    }

    fn name(&self) -> &str {
        "PDF get"
    }

    fn description(&self) -> &str {
        "Retrieve full-text documents"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<()> {
        let mut env = operation_env("pdf_get", context).await?;
        let selections = &env.ctx.settings.pdf_get.pdf_get_package_endpoints;
        let endpoints = env
            .packages
            .load_packages(EndpointType::PdfGet, selections, &env.ctx, false)
            .await?;

        for id in env.dataset.ids_in_state(RecordState::RevPrescreenIncluded) {
            let Some(record) = env.dataset.get_mut(&id) else {
                continue;
            };
            let mut retrieved = false;
            for loaded in &endpoints {
                if loaded.instance.expect_pdf_get()?.get_pdf(&env.ctx, record).await? {
                    retrieved = true;
                    break;
                }
            }
            if retrieved {
                record.set_status(RecordState::PdfImported)?;
            } else {
                record.set_status(RecordState::PdfNeedsManualRetrieval)?;
            }
        }

        // Manual pass over the documents automated retrieval missed
        let man_selections = &env.ctx.settings.pdf_get.pdf_get_man_package_endpoints;
        let man_endpoints = env
            .packages
            .load_packages(EndpointType::PdfGetMan, man_selections, &env.ctx, false)
            .await?;
        for loaded in &man_endpoints {
            loaded
                .instance
                .expect_pdf_get_man()?
                .get_pdf_manual(&env.ctx, &mut env.dataset)
                .await?;
        }

        env.finish("pdf_get").await
    }
}

/// Validate retrieved documents.
pub struct PdfPrepStage;

#[async_trait]
impl Stage for PdfPrepStage {
    fn id(&self) -> &str {
        PDF_PREP_STAGE_ID
    }

    fn name(&self) -> &str {
        "PDF prep"
    }

    fn description(&self) -> &str {
        "Validate and clean retrieved documents"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<()> {
        let mut env = operation_env("pdf_prep", context).await?;
        let selections = &env.ctx.settings.pdf_prep.pdf_prep_package_endpoints;
        let endpoints = env
            .packages
            .load_packages(EndpointType::PdfPrep, selections, &env.ctx, false)
            .await?;

        for id in env.dataset.ids_in_state(RecordState::PdfImported) {
            let Some(record) = env.dataset.get_mut(&id) else {
                continue;
            };
            let mut passed = true;
            for loaded in &endpoints {
                if !loaded.instance.expect_pdf_prep()?.prep_pdf(&env.ctx, record).await? {
                    passed = false;
                    break;
                }
            }
            if passed {
                record.set_status(RecordState::PdfPrepared)?;
            } else {
                record.set_status(RecordState::PdfNeedsManualPreparation)?;
            }
        }

        // Manual pass over the documents that failed preparation
        let man_selections = &env.ctx.settings.pdf_prep.pdf_prep_man_package_endpoints;
        let man_endpoints = env
            .packages
            .load_packages(EndpointType::PdfPrepMan, man_selections, &env.ctx, false)
            .await?;
        for loaded in &man_endpoints {
            loaded
                .instance
                .expect_pdf_prep_man()?
                .prep_pdf_manual(&env.ctx, &mut env.dataset)
                .await?;
        }

        env.finish("pdf_prep").await
    }
}

/// Include or exclude records on the full text.
pub struct ScreenStage;

#[async_trait]
impl Stage for ScreenStage {
    fn id(&self) -> &str {
        SCREEN_STAGE_ID
    }

    fn name(&self) -> &str {
        "Screen"
    }

    fn description(&self) -> &str {
        "Screen records based on the full text"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<()> {
        let mut env = operation_env("screen", context).await?;
        let selections = &env.ctx.settings.screen.screen_package_endpoints;
        let endpoints = env
            .packages
            .load_packages(EndpointType::Screen, selections, &env.ctx, false)
            .await?;

        for loaded in &endpoints {
            loaded
                .instance
                .expect_screen()?
                .run_screen(&env.ctx, &mut env.dataset)
                .await?;
        }

        env.finish("screen").await
    }
}

/// Synthesize included records into the data extraction artifacts.
pub struct DataStage;

#[async_trait]
impl Stage for DataStage {
    fn id(&self) -> &str {
        DATA_STAGE_ID
    }

    fn name(&self) -> &str {
        "Data"
    }

    fn description(&self) -> &str {
        "Extract and synthesize data from included records"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<()> {
        let mut env = operation_env("data", context).await?;
        let selections = &env.ctx.settings.data.data_package_endpoints;
        // Data endpoints come from the curated index more often than the
        // others; broken ones are dropped with a warning.
        let endpoints = env
            .packages
            .load_packages(EndpointType::Data, selections, &env.ctx, true)
            .await?;

        // Each included record carries a per-endpoint synthesis flag; only
        // records every endpoint has flagged advance to synthesized.
        let mut matrix: RecordStatusMatrix = env
            .dataset
            .ids_in_state(RecordState::RevIncluded)
            .into_iter()
            .map(|id| {
                let flags = endpoints
                    .iter()
                    .map(|loaded| (loaded.selection.endpoint.clone(), false))
                    .collect();
                (id, flags)
            })
            .collect();

        for loaded in &endpoints {
            let endpoint = loaded.instance.expect_data()?;
            endpoint.update_data(&env.ctx, &mut env.dataset).await?;
            endpoint.update_record_status_matrix(
                &env.dataset,
                &mut matrix,
                &loaded.selection.endpoint,
            )?;
        }

        let mut synthesized = 0usize;
        for (id, flags) in &matrix {
            if !flags.values().all(|done| *done) {
                continue;
            }
            if let Some(record) = env.dataset.get_mut(id) {
                record.set_status(RecordState::RevSynthesized)?;
                synthesized += 1;
            }
        }

        info!("Synthesized {} records", synthesized);
        env.finish("data").await
    }
}
