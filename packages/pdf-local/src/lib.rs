//! Local full-text handling: three packages in one library.
//!
//! `local_files` retrieves documents already present in the project's PDF
//! directory and validates the linked files. `list_missing` and
//! `list_defects` are the manual counterparts: they report the records
//! whose documents still need human attention.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use litrev_core::package_system::endpoint::{
    PdfGetEndpoint, PdfGetManEndpoint, PdfPrepEndpoint, PdfPrepManEndpoint,
};
use litrev_core::package_system::error::PackageSystemError;
use litrev_core::package_system::{
    EndpointInstance, EndpointSelection, EndpointType, OperationContext, PackageDeclaration,
    PackageRegistrar, ReviewPackage, CORE_VERSION,
};
use litrev_core::record::Dataset;
use litrev_core::{Record, RecordState};

const LOCAL_FILES_ID: &str = "local_files";
const LIST_MISSING_ID: &str = "list_missing";
const LIST_DEFECTS_ID: &str = "list_defects";

/// Path of the file linked to a record, resolved against the project.
fn linked_file(ctx: &OperationContext, record: &Record) -> Option<PathBuf> {
    record
        .field("file")
        .map(|file| ctx.project_dir.join(Path::new(file)))
}

struct LocalFileGetter;

#[async_trait]
impl PdfGetEndpoint for LocalFileGetter {
    async fn get_pdf(
        &self,
        ctx: &OperationContext,
        record: &mut Record,
    ) -> Result<bool, PackageSystemError> {
        if linked_file(ctx, record).is_some_and(|p| p.is_file()) {
            return Ok(true);
        }
        let candidate = ctx.pdf_dir.join(format!("{}.pdf", record.id));
        if !candidate.is_file() {
            return Ok(false);
        }
        // Store the link relative to the project so it survives moves
        let relative = candidate
            .strip_prefix(&ctx.project_dir)
            .unwrap_or(&candidate)
            .to_string_lossy()
            .to_string();
        record.set_field("file", &relative);
        log::info!("{}: linked '{}' to {}", LOCAL_FILES_ID, record.id, relative);
        Ok(true)
    }
}

struct LocalFileValidator;

#[async_trait]
impl PdfPrepEndpoint for LocalFileValidator {
    async fn prep_pdf(
        &self,
        ctx: &OperationContext,
        record: &mut Record,
    ) -> Result<bool, PackageSystemError> {
        let Some(path) = linked_file(ctx, record) else {
            log::warn!("{}: '{}' has no linked file", LOCAL_FILES_ID, record.id);
            return Ok(false);
        };
        let mut header = [0u8; 4];
        let ok = std::fs::File::open(&path)
            .and_then(|mut f| std::io::Read::read_exact(&mut f, &mut header))
            .is_ok()
            && &header == b"%PDF";
        if !ok {
            log::warn!(
                "{}: '{}' links to an unreadable or non-PDF file {}",
                LOCAL_FILES_ID,
                record.id,
                path.display()
            );
        }
        Ok(ok)
    }
}

struct MissingLister;

#[async_trait]
impl PdfGetManEndpoint for MissingLister {
    async fn get_pdf_manual(
        &self,
        _ctx: &OperationContext,
        dataset: &mut Dataset,
    ) -> Result<(), PackageSystemError> {
        let missing = dataset.ids_in_state(RecordState::PdfNeedsManualRetrieval);
        if missing.is_empty() {
            log::info!("{}: no documents to retrieve manually", LIST_MISSING_ID);
            return Ok(());
        }
        log::info!(
            "{}: {} document(s) to retrieve manually",
            LIST_MISSING_ID,
            missing.len()
        );
        for id in missing {
            let title = dataset
                .get(&id)
                .and_then(|r| r.field("title"))
                .unwrap_or("<untitled>");
            log::info!("  {} - {}", id, title);
        }
        Ok(())
    }
}

struct DefectLister;

#[async_trait]
impl PdfPrepManEndpoint for DefectLister {
    async fn prep_pdf_manual(
        &self,
        ctx: &OperationContext,
        dataset: &mut Dataset,
    ) -> Result<(), PackageSystemError> {
        let defective = dataset.ids_in_state(RecordState::PdfNeedsManualPreparation);
        if defective.is_empty() {
            log::info!("{}: no documents to fix manually", LIST_DEFECTS_ID);
            return Ok(());
        }
        log::info!(
            "{}: {} document(s) to fix manually",
            LIST_DEFECTS_ID,
            defective.len()
        );
        for id in defective {
            let file = dataset
                .get(&id)
                .and_then(|r| linked_file(ctx, r))
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<no file>".to_string());
            log::info!("  {} - {}", id, file);
        }
        Ok(())
    }
}

/// The `local_files` package: automated retrieval and validation.
pub struct LocalFilesPackage;

impl ReviewPackage for LocalFilesPackage {
    fn id(&self) -> &str {
        LOCAL_FILES_ID
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Link and validate documents in the project PDF directory"
    }

    fn provided_endpoints(&self) -> Vec<EndpointType> {
        vec![EndpointType::PdfGet, EndpointType::PdfPrep]
    }

    fn create_endpoint(
        &self,
        endpoint_type: EndpointType,
        _selection: &EndpointSelection,
        _ctx: &OperationContext,
    ) -> Result<EndpointInstance, PackageSystemError> {
        match endpoint_type {
            EndpointType::PdfGet => Ok(EndpointInstance::PdfGet(Box::new(LocalFileGetter))),
            EndpointType::PdfPrep => Ok(EndpointInstance::PdfPrep(Box::new(LocalFileValidator))),
            other => Err(PackageSystemError::UndeclaredEndpoint {
                package_id: LOCAL_FILES_ID.to_string(),
                endpoint_type: other,
            }),
        }
    }
}

/// The `list_missing` package: reports records awaiting manual retrieval.
pub struct ListMissingPackage;

impl ReviewPackage for ListMissingPackage {
    fn id(&self) -> &str {
        LIST_MISSING_ID
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "List records whose documents must be retrieved manually"
    }

    fn provided_endpoints(&self) -> Vec<EndpointType> {
        vec![EndpointType::PdfGetMan]
    }

    fn create_endpoint(
        &self,
        endpoint_type: EndpointType,
        _selection: &EndpointSelection,
        _ctx: &OperationContext,
    ) -> Result<EndpointInstance, PackageSystemError> {
        match endpoint_type {
            EndpointType::PdfGetMan => Ok(EndpointInstance::PdfGetMan(Box::new(MissingLister))),
            other => Err(PackageSystemError::UndeclaredEndpoint {
                package_id: LIST_MISSING_ID.to_string(),
                endpoint_type: other,
            }),
        }
    }
}

/// The `list_defects` package: reports records awaiting manual fixes.
pub struct ListDefectsPackage;

impl ReviewPackage for ListDefectsPackage {
    fn id(&self) -> &str {
        LIST_DEFECTS_ID
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "List records whose documents failed validation"
    }

    fn provided_endpoints(&self) -> Vec<EndpointType> {
        vec![EndpointType::PdfPrepMan]
    }

    fn create_endpoint(
        &self,
        endpoint_type: EndpointType,
        _selection: &EndpointSelection,
        _ctx: &OperationContext,
    ) -> Result<EndpointInstance, PackageSystemError> {
        match endpoint_type {
            EndpointType::PdfPrepMan => Ok(EndpointInstance::PdfPrepMan(Box::new(DefectLister))),
            other => Err(PackageSystemError::UndeclaredEndpoint {
                package_id: LIST_DEFECTS_ID.to_string(),
                endpoint_type: other,
            }),
        }
    }
}

fn register(registrar: &mut PackageRegistrar) {
    registrar.register(Arc::new(LocalFilesPackage));
    registrar.register(Arc::new(ListMissingPackage));
    registrar.register(Arc::new(ListDefectsPackage));
}

#[cfg(feature = "dynamic-export")]
#[no_mangle]
pub static litrev_package_declaration: PackageDeclaration = PackageDeclaration {
    core_version: CORE_VERSION,
    register,
};

#[cfg(test)]
mod tests {
    use super::*;
    use litrev_core::storage::ProjectSettings;

    fn ctx(project_dir: &Path) -> OperationContext {
        OperationContext::new(
            "pdf_get",
            project_dir,
            Arc::new(ProjectSettings::with_defaults("t")),
        )
    }

    #[tokio::test]
    async fn test_get_pdf_links_matching_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path());
        std::fs::create_dir_all(&ctx.pdf_dir).unwrap();
        std::fs::write(ctx.pdf_dir.join("Smith2020.pdf"), b"%PDF-1.4").unwrap();

        let mut found = Record::new("Smith2020", "article");
        assert!(LocalFileGetter.get_pdf(&ctx, &mut found).await.unwrap());
        assert_eq!(found.field("file"), Some("pdfs/Smith2020.pdf"));

        let mut absent = Record::new("Jones2021", "article");
        assert!(!LocalFileGetter.get_pdf(&ctx, &mut absent).await.unwrap());
        assert_eq!(absent.field("file"), None);
    }

    #[tokio::test]
    async fn test_get_pdf_keeps_existing_link() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path());
        std::fs::create_dir_all(dir.path().join("elsewhere")).unwrap();
        std::fs::write(dir.path().join("elsewhere/doc.pdf"), b"%PDF-1.4").unwrap();

        let mut record =
            Record::new("Linked2020", "article").with_field("file", "elsewhere/doc.pdf");
        assert!(LocalFileGetter.get_pdf(&ctx, &mut record).await.unwrap());
        assert_eq!(record.field("file"), Some("elsewhere/doc.pdf"));
    }

    #[tokio::test]
    async fn test_prep_pdf_checks_header() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path());
        std::fs::create_dir_all(&ctx.pdf_dir).unwrap();
        std::fs::write(ctx.pdf_dir.join("good.pdf"), b"%PDF-1.7 payload").unwrap();
        std::fs::write(ctx.pdf_dir.join("bad.pdf"), b"<html>not a pdf").unwrap();

        let mut good = Record::new("Good2020", "article").with_field("file", "pdfs/good.pdf");
        assert!(LocalFileValidator.prep_pdf(&ctx, &mut good).await.unwrap());

        let mut bad = Record::new("Bad2020", "article").with_field("file", "pdfs/bad.pdf");
        assert!(!LocalFileValidator.prep_pdf(&ctx, &mut bad).await.unwrap());

        let mut unlinked = Record::new("None2020", "article");
        assert!(!LocalFileValidator.prep_pdf(&ctx, &mut unlinked).await.unwrap());
    }

    #[tokio::test]
    async fn test_manual_listers_tolerate_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path());
        let mut dataset = Dataset::new();
        MissingLister.get_pdf_manual(&ctx, &mut dataset).await.unwrap();
        DefectLister.prep_pdf_manual(&ctx, &mut dataset).await.unwrap();
    }

    #[test]
    fn test_one_library_registers_three_packages() {
        let mut registrar = PackageRegistrar::new();
        register(&mut registrar);
        let packages = registrar.into_packages();
        let ids: Vec<&str> = packages.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec![LOCAL_FILES_ID, LIST_MISSING_ID, LIST_DEFECTS_ID]);
    }
}
