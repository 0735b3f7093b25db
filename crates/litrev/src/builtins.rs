//! Built-in packages compiled into the host binary.
//!
//! These are registered statically before the kernel starts, so the
//! curated index entries pointing at the `litrev` module resolve without
//! any dynamic library. The loadable package crates are linked in as well
//! and registered the same way.
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use litrev_core::package_system::endpoint::{
    PrepEndpoint, PrepManEndpoint, ReviewTypeEndpoint, SearchSourceEndpoint,
};
use litrev_core::package_system::error::PackageSystemError;
use litrev_core::package_system::{
    DefaultPackageManager, EndpointInstance, EndpointSelection, EndpointType, OperationContext,
    ReviewPackage,
};
use litrev_core::storage::ProjectSettings;
use litrev_core::{Record, RecordState};

/// File the manual-preparation exporter round-trips through.
const MAN_PREP_FILE: &str = "records_prep_man.json";

struct LiteratureReviewType;

impl ReviewTypeEndpoint for LiteratureReviewType {
    fn customize(&self, settings: &mut ProjectSettings) -> Result<(), PackageSystemError> {
        settings.project.review_type = "literature_review".to_string();
        // Empty stage wirings fall back to the stock endpoints
        let defaults = ProjectSettings::with_defaults(&settings.project.title);
        if settings.load.load_package_endpoints.is_empty() {
            settings.load.load_package_endpoints = defaults.load.load_package_endpoints;
        }
        if settings.dedupe.dedupe_package_endpoints.is_empty() {
            settings.dedupe.dedupe_package_endpoints = defaults.dedupe.dedupe_package_endpoints;
        }
        if settings.prescreen.prescreen_package_endpoints.is_empty() {
            settings.prescreen.prescreen_package_endpoints =
                defaults.prescreen.prescreen_package_endpoints;
        }
        if settings.pdf_get.pdf_get_package_endpoints.is_empty() {
            settings.pdf_get.pdf_get_package_endpoints =
                defaults.pdf_get.pdf_get_package_endpoints;
        }
        if settings.pdf_prep.pdf_prep_package_endpoints.is_empty() {
            settings.pdf_prep.pdf_prep_package_endpoints =
                defaults.pdf_prep.pdf_prep_package_endpoints;
        }
        if settings.screen.screen_package_endpoints.is_empty() {
            settings.screen.screen_package_endpoints = defaults.screen.screen_package_endpoints;
        }
        Ok(())
    }
}

/// The `literature_review` review type.
pub struct LiteratureReviewPackage;

impl ReviewPackage for LiteratureReviewPackage {
    fn id(&self) -> &str {
        "literature_review"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Generic literature review with the default stage setup"
    }

    fn provided_endpoints(&self) -> Vec<EndpointType> {
        vec![EndpointType::ReviewType]
    }

    fn create_endpoint(
        &self,
        endpoint_type: EndpointType,
        _selection: &EndpointSelection,
        _ctx: &OperationContext,
    ) -> Result<EndpointInstance, PackageSystemError> {
        match endpoint_type {
            EndpointType::ReviewType => {
                Ok(EndpointInstance::ReviewType(Box::new(LiteratureReviewType)))
            }
            other => undeclared(self.id(), other),
        }
    }
}

struct UnknownSource;

#[async_trait]
impl SearchSourceEndpoint for UnknownSource {
    fn source_identifier(&self) -> String {
        "unknown_source".to_string()
    }

    async fn run_search(&self, _ctx: &OperationContext) -> Result<Vec<Record>, PackageSystemError> {
        // Result files land in the search directory by hand; nothing to fetch
        Ok(Vec::new())
    }

    fn heuristic(&self, _filename: &Path, _data: &str) -> bool {
        // Catch-all: matches whatever no specific source claimed
        true
    }

    async fn prepare(
        &self,
        _ctx: &OperationContext,
        _record: &mut Record,
    ) -> Result<(), PackageSystemError> {
        Ok(())
    }
}

/// The `unknown_source` search source.
pub struct UnknownSourcePackage;

impl ReviewPackage for UnknownSourcePackage {
    fn id(&self) -> &str {
        "unknown_source"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Catch-all source for result files without a matching heuristic"
    }

    fn provided_endpoints(&self) -> Vec<EndpointType> {
        vec![EndpointType::SearchSource]
    }

    fn create_endpoint(
        &self,
        endpoint_type: EndpointType,
        _selection: &EndpointSelection,
        _ctx: &OperationContext,
    ) -> Result<EndpointInstance, PackageSystemError> {
        match endpoint_type {
            EndpointType::SearchSource => {
                Ok(EndpointInstance::SearchSource(Box::new(UnknownSource)))
            }
            other => undeclared(self.id(), other),
        }
    }
}

struct SourceSpecificPrep;

/// Collapse runs of whitespace into single spaces.
fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl PrepEndpoint for SourceSpecificPrep {
    async fn prepare(
        &self,
        _ctx: &OperationContext,
        record: &mut Record,
    ) -> Result<bool, PackageSystemError> {
        let cleaned: Vec<(String, String)> = record
            .fields
            .iter()
            .filter_map(|(field, value)| {
                let normalized = collapse_whitespace(value);
                (normalized != *value).then(|| (field.clone(), normalized))
            })
            .collect();
        for (field, value) in cleaned {
            record.set_field(&field, &value);
        }
        // Whitespace cleanup never leaves a record incomplete
        Ok(true)
    }
}

/// The `source_specific_prep` preparation endpoint.
pub struct SourceSpecificPrepPackage;

impl ReviewPackage for SourceSpecificPrepPackage {
    fn id(&self) -> &str {
        "source_specific_prep"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Apply source-specific metadata fixes from the originating search source"
    }

    fn provided_endpoints(&self) -> Vec<EndpointType> {
        vec![EndpointType::Prep]
    }

    fn create_endpoint(
        &self,
        endpoint_type: EndpointType,
        _selection: &EndpointSelection,
        _ctx: &OperationContext,
    ) -> Result<EndpointInstance, PackageSystemError> {
        match endpoint_type {
            EndpointType::Prep => Ok(EndpointInstance::Prep(Box::new(SourceSpecificPrep))),
            other => undeclared(self.id(), other),
        }
    }
}

/// Edited entry read back from the manual-preparation file.
#[derive(Debug, Deserialize)]
struct EditedEntry {
    id: String,
    #[serde(default)]
    entrytype: Option<String>,
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
}

struct ExportManPrep;

#[async_trait]
impl PrepManEndpoint for ExportManPrep {
    async fn prepare_manual(
        &self,
        ctx: &OperationContext,
        dataset: &mut litrev_core::record::Dataset,
    ) -> Result<(), PackageSystemError> {
        let path = ctx.project_dir.join(MAN_PREP_FILE);
        if path.is_file() {
            self.reimport(ctx, dataset, &path)
        } else {
            self.export(ctx, dataset, &path)
        }
    }
}

impl ExportManPrep {
    fn export(
        &self,
        ctx: &OperationContext,
        dataset: &litrev_core::record::Dataset,
        path: &Path,
    ) -> Result<(), PackageSystemError> {
        let pending: Vec<serde_json::Value> = dataset
            .iter()
            .filter(|r| r.status == RecordState::MdNeedsManualPreparation)
            .map(|r| {
                let mut entry = serde_json::Map::new();
                entry.insert("id".to_string(), serde_json::json!(r.id));
                entry.insert("entrytype".to_string(), serde_json::json!(r.entrytype));
                for (field, value) in &r.fields {
                    entry.insert(field.clone(), serde_json::json!(value));
                }
                serde_json::Value::Object(entry)
            })
            .collect();
        if pending.is_empty() {
            log::info!("export_man_prep: no records need manual preparation");
            return Ok(());
        }
        if ctx.dry_run {
            log::info!(
                "export_man_prep: would export {} record(s) to {}",
                pending.len(),
                path.display()
            );
            return Ok(());
        }
        let raw = serde_json::to_string_pretty(&pending).map_err(|e| {
            PackageSystemError::OperationError {
                package_id: "export_man_prep".to_string(),
                message: e.to_string(),
            }
        })?;
        std::fs::write(path, raw).map_err(|e| PackageSystemError::OperationError {
            package_id: "export_man_prep".to_string(),
            message: format!("cannot write {}: {}", path.display(), e),
        })?;
        log::info!(
            "export_man_prep: exported {} record(s) to {}; edit and run prep again",
            pending.len(),
            path.display()
        );
        Ok(())
    }

    fn reimport(
        &self,
        ctx: &OperationContext,
        dataset: &mut litrev_core::record::Dataset,
        path: &Path,
    ) -> Result<(), PackageSystemError> {
        let raw = std::fs::read_to_string(path).map_err(|e| PackageSystemError::OperationError {
            package_id: "export_man_prep".to_string(),
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        let edited: Vec<EditedEntry> =
            serde_json::from_str(&raw).map_err(|e| PackageSystemError::OperationError {
                package_id: "export_man_prep".to_string(),
                message: format!("malformed {}: {}", path.display(), e),
            })?;

        let mut imported = 0;
        for entry in edited {
            let Some(record) = dataset.get_mut(&entry.id) else {
                log::warn!("export_man_prep: unknown record '{}' in edit file", entry.id);
                continue;
            };
            if record.status != RecordState::MdNeedsManualPreparation {
                continue;
            }
            if let Some(entrytype) = &entry.entrytype {
                record.entrytype = entrytype.clone();
            }
            for (field, value) in &entry.fields {
                record.set_field(field, value);
            }
            record
                .set_status(RecordState::MdPrepared)
                .map_err(|e| PackageSystemError::OperationError {
                    package_id: "export_man_prep".to_string(),
                    message: e.to_string(),
                })?;
            imported += 1;
        }
        if !ctx.dry_run {
            if let Err(e) = std::fs::remove_file(path) {
                log::warn!("export_man_prep: cannot remove {}: {}", path.display(), e);
            }
        }
        log::info!("export_man_prep: re-imported {} edited record(s)", imported);
        Ok(())
    }
}

/// The `export_man_prep` manual-preparation endpoint.
pub struct ExportManPrepPackage;

impl ReviewPackage for ExportManPrepPackage {
    fn id(&self) -> &str {
        "export_man_prep"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Export records needing manual preparation and re-import the edited file"
    }

    fn provided_endpoints(&self) -> Vec<EndpointType> {
        vec![EndpointType::PrepMan]
    }

    fn create_endpoint(
        &self,
        endpoint_type: EndpointType,
        _selection: &EndpointSelection,
        _ctx: &OperationContext,
    ) -> Result<EndpointInstance, PackageSystemError> {
        match endpoint_type {
            EndpointType::PrepMan => Ok(EndpointInstance::PrepMan(Box::new(ExportManPrep))),
            other => undeclared(self.id(), other),
        }
    }
}

fn undeclared(package_id: &str, endpoint_type: EndpointType) -> Result<EndpointInstance, PackageSystemError> {
    Err(PackageSystemError::UndeclaredEndpoint {
        package_id: package_id.to_string(),
        endpoint_type,
    })
}


/// Register every statically linked package with the package manager.
pub async fn register_all(packages: &DefaultPackageManager) -> Result<(), PackageSystemError> {
    let builtin: Vec<Arc<dyn ReviewPackage>> = vec![
        Arc::new(LiteratureReviewPackage),
        Arc::new(UnknownSourcePackage),
        Arc::new(SourceSpecificPrepPackage),
        Arc::new(ExportManPrepPackage),
        Arc::new(litrev_load_json::JsonImportPackage),
        Arc::new(litrev_dedupe_exact::ExactMatchPackage),
        Arc::new(litrev_screen_conditional::ConditionalPackage),
        Arc::new(litrev_pdf_local::LocalFilesPackage),
        Arc::new(litrev_pdf_local::ListMissingPackage),
        Arc::new(litrev_pdf_local::ListDefectsPackage),
    ];
    for package in builtin {
        packages.register_builtin(package).await?;
    }
    Ok(())
}
