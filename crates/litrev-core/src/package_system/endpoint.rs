use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::package_system::error::PackageSystemError;
use crate::record::dataset::Dataset;
use crate::record::Record;
use crate::storage::settings::ProjectSettings;

/// Core version a dynamically loaded package must have been built against.
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exported symbol name looked up in package libraries.
pub const PACKAGE_DECLARATION_SYMBOL: &[u8] = b"litrev_package_declaration";

/// The kinds of endpoints a package can provide, one per review operation
/// surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointType {
    ReviewType,
    SearchSource,
    LoadConversion,
    Prep,
    PrepMan,
    Dedupe,
    Prescreen,
    PdfGet,
    PdfGetMan,
    PdfPrep,
    PdfPrepMan,
    Screen,
    Data,
}

impl EndpointType {
    pub fn all() -> &'static [EndpointType] {
        &[
            EndpointType::ReviewType,
            EndpointType::SearchSource,
            EndpointType::LoadConversion,
            EndpointType::Prep,
            EndpointType::PrepMan,
            EndpointType::Dedupe,
            EndpointType::Prescreen,
            EndpointType::PdfGet,
            EndpointType::PdfGetMan,
            EndpointType::PdfPrep,
            EndpointType::PdfPrepMan,
            EndpointType::Screen,
            EndpointType::Data,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointType::ReviewType => "review_type",
            EndpointType::SearchSource => "search_source",
            EndpointType::LoadConversion => "load_conversion",
            EndpointType::Prep => "prep",
            EndpointType::PrepMan => "prep_man",
            EndpointType::Dedupe => "dedupe",
            EndpointType::Prescreen => "prescreen",
            EndpointType::PdfGet => "pdf_get",
            EndpointType::PdfGetMan => "pdf_get_man",
            EndpointType::PdfPrep => "pdf_prep",
            EndpointType::PdfPrepMan => "pdf_prep_man",
            EndpointType::Screen => "screen",
            EndpointType::Data => "data",
        }
    }
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndpointType {
    type Err = PackageSystemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EndpointType::all()
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| PackageSystemError::UnknownEndpointType(s.to_string()))
    }
}

/// One selected endpoint from project settings: the identifier plus any
/// endpoint-specific parameters, kept flattened as in the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSelection {
    pub endpoint: String,
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl EndpointSelection {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: serde_json::Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn param(&self, key: &str) -> Option<&serde_json::Value> {
        self.params.get(key)
    }

    pub fn bool_param(&self, key: &str, default: bool) -> bool {
        self.param(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(|v| v.as_str())
    }
}

/// Context injected into endpoint instantiation and operation runs.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Name of the running operation ("load", "prescreen", ...)
    pub operation: String,
    pub project_dir: PathBuf,
    pub search_dir: PathBuf,
    pub pdf_dir: PathBuf,
    pub settings: Arc<ProjectSettings>,
    /// When set, endpoints must not write outside the dataset in memory
    pub dry_run: bool,
}

impl OperationContext {
    pub fn new(operation: &str, project_dir: &Path, settings: Arc<ProjectSettings>) -> Self {
        Self {
            operation: operation.to_string(),
            search_dir: project_dir.join(crate::kernel::constants::SEARCH_DIR),
            pdf_dir: project_dir.join(crate::kernel::constants::PDF_DIR),
            project_dir: project_dir.to_path_buf(),
            settings,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

// Capability traits, one per endpoint type. A package advertises the types
// it provides and must hand back the matching instance variant.

/// Shapes a newly initialized project for a particular kind of review.
pub trait ReviewTypeEndpoint: Send + Sync {
    fn customize(&self, settings: &mut ProjectSettings) -> Result<(), PackageSystemError>;
}

/// Retrieves records from a metadata source into the search directory.
#[async_trait]
pub trait SearchSourceEndpoint: Send + Sync {
    /// Stable identifier recorded in each origin, e.g. a URL prefix
    fn source_identifier(&self) -> String;

    async fn run_search(&self, ctx: &OperationContext) -> Result<Vec<Record>, PackageSystemError>;

    /// Whether a search result file looks like it came from this source
    fn heuristic(&self, filename: &Path, data: &str) -> bool;

    /// Source-specific metadata fixes applied during prep
    async fn prepare(
        &self,
        ctx: &OperationContext,
        record: &mut Record,
    ) -> Result<(), PackageSystemError>;
}

/// Converts a search result file into records.
#[async_trait]
pub trait LoadConversionEndpoint: Send + Sync {
    fn supported_extensions(&self) -> &[&str];

    async fn load(
        &self,
        ctx: &OperationContext,
        path: &Path,
    ) -> Result<Vec<Record>, PackageSystemError>;
}

/// Improves the metadata of a single record; returns whether the metadata
/// is complete. A `false` sends the record into manual preparation.
#[async_trait]
pub trait PrepEndpoint: Send + Sync {
    async fn prepare(
        &self,
        ctx: &OperationContext,
        record: &mut Record,
    ) -> Result<bool, PackageSystemError>;
}

/// Drives manual preparation of records that automated prep could not fix.
#[async_trait]
pub trait PrepManEndpoint: Send + Sync {
    async fn prepare_manual(
        &self,
        ctx: &OperationContext,
        dataset: &mut Dataset,
    ) -> Result<(), PackageSystemError>;
}

/// Merges duplicate records; returns the number of merges performed.
#[async_trait]
pub trait DedupeEndpoint: Send + Sync {
    async fn run_dedupe(
        &self,
        ctx: &OperationContext,
        dataset: &mut Dataset,
    ) -> Result<usize, PackageSystemError>;
}

/// Decides inclusion on metadata alone.
#[async_trait]
pub trait PrescreenEndpoint: Send + Sync {
    async fn run_prescreen(
        &self,
        ctx: &OperationContext,
        dataset: &mut Dataset,
    ) -> Result<(), PackageSystemError>;
}

/// Retrieves the full-text document for a record; returns whether one was
/// found.
#[async_trait]
pub trait PdfGetEndpoint: Send + Sync {
    async fn get_pdf(
        &self,
        ctx: &OperationContext,
        record: &mut Record,
    ) -> Result<bool, PackageSystemError>;
}

/// Drives manual retrieval of documents automated retrieval missed.
#[async_trait]
pub trait PdfGetManEndpoint: Send + Sync {
    async fn get_pdf_manual(
        &self,
        ctx: &OperationContext,
        dataset: &mut Dataset,
    ) -> Result<(), PackageSystemError>;
}

/// Validates and cleans a retrieved document; returns whether it passed.
#[async_trait]
pub trait PdfPrepEndpoint: Send + Sync {
    async fn prep_pdf(
        &self,
        ctx: &OperationContext,
        record: &mut Record,
    ) -> Result<bool, PackageSystemError>;
}

/// Drives manual preparation of documents automated preparation rejected.
#[async_trait]
pub trait PdfPrepManEndpoint: Send + Sync {
    async fn prep_pdf_manual(
        &self,
        ctx: &OperationContext,
        dataset: &mut Dataset,
    ) -> Result<(), PackageSystemError>;
}

/// Decides inclusion on the full text against the screening criteria.
#[async_trait]
pub trait ScreenEndpoint: Send + Sync {
    async fn run_screen(
        &self,
        ctx: &OperationContext,
        dataset: &mut Dataset,
    ) -> Result<(), PackageSystemError>;
}

/// Per-record synthesis flags: record id to endpoint identifier to done.
/// A record is synthesized once every data endpoint has flagged it.
pub type RecordStatusMatrix = BTreeMap<String, BTreeMap<String, bool>>;

/// Synthesizes included records into the data extraction artifact.
#[async_trait]
pub trait DataEndpoint: Send + Sync {
    /// Initial configuration written into settings when the endpoint is added
    fn default_setup(&self) -> serde_json::Value;

    async fn update_data(
        &self,
        ctx: &OperationContext,
        dataset: &mut Dataset,
    ) -> Result<(), PackageSystemError>;

    /// Flag the records this endpoint has synthesized under `identifier`.
    fn update_record_status_matrix(
        &self,
        dataset: &Dataset,
        matrix: &mut RecordStatusMatrix,
        identifier: &str,
    ) -> Result<(), PackageSystemError>;
}

/// A concrete endpoint, one variant per capability trait. The variant a
/// package hands back is checked against the requested [`EndpointType`];
/// a mismatch is a contract violation.
pub enum EndpointInstance {
    ReviewType(Box<dyn ReviewTypeEndpoint>),
    SearchSource(Box<dyn SearchSourceEndpoint>),
    LoadConversion(Box<dyn LoadConversionEndpoint>),
    Prep(Box<dyn PrepEndpoint>),
    PrepMan(Box<dyn PrepManEndpoint>),
    Dedupe(Box<dyn DedupeEndpoint>),
    Prescreen(Box<dyn PrescreenEndpoint>),
    PdfGet(Box<dyn PdfGetEndpoint>),
    PdfGetMan(Box<dyn PdfGetManEndpoint>),
    PdfPrep(Box<dyn PdfPrepEndpoint>),
    PdfPrepMan(Box<dyn PdfPrepManEndpoint>),
    Screen(Box<dyn ScreenEndpoint>),
    Data(Box<dyn DataEndpoint>),
}

impl fmt::Debug for EndpointInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EndpointInstance")
            .field(&self.endpoint_type())
            .finish()
    }
}

macro_rules! expect_variant {
    ($name:ident, $variant:ident, $trait_obj:ty) => {
        pub fn $name(&self) -> Result<&$trait_obj, PackageSystemError> {
            match self {
                EndpointInstance::$variant(inner) => Ok(inner.as_ref()),
                other => Err(PackageSystemError::ContractViolation {
                    package_id: "<instance>".to_string(),
                    requested: EndpointType::$variant,
                    provided: other.endpoint_type(),
                }),
            }
        }
    };
}

impl EndpointInstance {
    pub fn endpoint_type(&self) -> EndpointType {
        match self {
            EndpointInstance::ReviewType(_) => EndpointType::ReviewType,
            EndpointInstance::SearchSource(_) => EndpointType::SearchSource,
            EndpointInstance::LoadConversion(_) => EndpointType::LoadConversion,
            EndpointInstance::Prep(_) => EndpointType::Prep,
            EndpointInstance::PrepMan(_) => EndpointType::PrepMan,
            EndpointInstance::Dedupe(_) => EndpointType::Dedupe,
            EndpointInstance::Prescreen(_) => EndpointType::Prescreen,
            EndpointInstance::PdfGet(_) => EndpointType::PdfGet,
            EndpointInstance::PdfGetMan(_) => EndpointType::PdfGetMan,
            EndpointInstance::PdfPrep(_) => EndpointType::PdfPrep,
            EndpointInstance::PdfPrepMan(_) => EndpointType::PdfPrepMan,
            EndpointInstance::Screen(_) => EndpointType::Screen,
            EndpointInstance::Data(_) => EndpointType::Data,
        }
    }

    expect_variant!(expect_review_type, ReviewType, dyn ReviewTypeEndpoint);
    expect_variant!(expect_search_source, SearchSource, dyn SearchSourceEndpoint);
    expect_variant!(expect_load_conversion, LoadConversion, dyn LoadConversionEndpoint);
    expect_variant!(expect_prep, Prep, dyn PrepEndpoint);
    expect_variant!(expect_prep_man, PrepMan, dyn PrepManEndpoint);
    expect_variant!(expect_dedupe, Dedupe, dyn DedupeEndpoint);
    expect_variant!(expect_prescreen, Prescreen, dyn PrescreenEndpoint);
    expect_variant!(expect_pdf_get, PdfGet, dyn PdfGetEndpoint);
    expect_variant!(expect_pdf_get_man, PdfGetMan, dyn PdfGetManEndpoint);
    expect_variant!(expect_pdf_prep, PdfPrep, dyn PdfPrepEndpoint);
    expect_variant!(expect_pdf_prep_man, PdfPrepMan, dyn PdfPrepManEndpoint);
    expect_variant!(expect_screen, Screen, dyn ScreenEndpoint);
    expect_variant!(expect_data, Data, dyn DataEndpoint);
}

/// The package provider contract. One package can provide endpoints of
/// several types under a single identifier.
pub trait ReviewPackage: Send + Sync {
    /// Lowercase identifier without whitespace, unique per endpoint type
    fn id(&self) -> &str;

    fn version(&self) -> &str;

    fn description(&self) -> &str;

    fn provided_endpoints(&self) -> Vec<EndpointType>;

    /// JSON schema of the endpoint-specific settings parameters
    fn settings_schema(&self, _endpoint_type: EndpointType) -> serde_json::Value {
        serde_json::Value::Object(serde_json::Map::new())
    }

    /// Instantiate an endpoint of the requested type with the given
    /// selection parameters.
    fn create_endpoint(
        &self,
        endpoint_type: EndpointType,
        selection: &EndpointSelection,
        ctx: &OperationContext,
    ) -> Result<EndpointInstance, PackageSystemError>;
}

/// Collects the packages a dynamic library registers.
#[derive(Default)]
pub struct PackageRegistrar {
    packages: Vec<Arc<dyn ReviewPackage>>,
}

impl PackageRegistrar {
    pub fn new() -> Self {
        Self { packages: Vec::new() }
    }

    pub fn register(&mut self, package: Arc<dyn ReviewPackage>) {
        self.packages.push(package);
    }

    pub fn into_packages(self) -> Vec<Arc<dyn ReviewPackage>> {
        self.packages
    }
}

/// Static exported by every loadable package library under
/// [`PACKAGE_DECLARATION_SYMBOL`].
#[derive(Clone, Copy)]
pub struct PackageDeclaration {
    /// Value of [`CORE_VERSION`] the package was compiled against
    pub core_version: &'static str,
    pub register: fn(&mut PackageRegistrar),
}
