//! Project settings: the serde model of `settings.json`.
//!
//! Each review stage owns a section holding the endpoints selected for it.
//! Defaults produce a runnable project wired to the built-in packages.
use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::package_system::endpoint::EndpointSelection;

/// Top-level project settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectSettings {
    pub project: ProjectConfig,
    #[serde(default)]
    pub sources: Vec<SearchSourceSettings>,
    #[serde(default)]
    pub load: LoadSettings,
    #[serde(default)]
    pub prep: PrepSettings,
    #[serde(default)]
    pub dedupe: DedupeSettings,
    #[serde(default)]
    pub prescreen: PrescreenSettings,
    #[serde(default)]
    pub pdf_get: PdfGetSettings,
    #[serde(default)]
    pub pdf_prep: PdfPrepSettings,
    #[serde(default)]
    pub screen: ScreenSettings,
    #[serde(default)]
    pub data: DataSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub title: String,
    /// Identifier of the review-type endpoint governing this project
    pub review_type: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            title: "untitled review".to_string(),
            review_type: "literature_review".to_string(),
        }
    }
}

/// One registered search source feeding the load stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSourceSettings {
    /// Search-source endpoint identifier
    pub endpoint: String,
    /// Result file under the search directory
    pub filename: PathBuf,
    /// Identifier recorded in record origins for provenance
    pub source_identifier: String,
    #[serde(default)]
    pub search_parameters: serde_json::Value,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoadSettings {
    #[serde(default)]
    pub load_package_endpoints: Vec<EndpointSelection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PrepSettings {
    #[serde(default)]
    pub prep_package_endpoints: Vec<EndpointSelection>,
    #[serde(default)]
    pub prep_man_package_endpoints: Vec<EndpointSelection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DedupeSettings {
    #[serde(default)]
    pub dedupe_package_endpoints: Vec<EndpointSelection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PrescreenSettings {
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub prescreen_package_endpoints: Vec<EndpointSelection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PdfGetSettings {
    #[serde(default)]
    pub pdf_get_package_endpoints: Vec<EndpointSelection>,
    #[serde(default)]
    pub pdf_get_man_package_endpoints: Vec<EndpointSelection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PdfPrepSettings {
    #[serde(default)]
    pub pdf_prep_package_endpoints: Vec<EndpointSelection>,
    #[serde(default)]
    pub pdf_prep_man_package_endpoints: Vec<EndpointSelection>,
}

/// One screening criterion applied during the screen stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningCriterion {
    pub explanation: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScreenSettings {
    #[serde(default)]
    pub criteria: BTreeMap<String, ScreeningCriterion>,
    #[serde(default)]
    pub screen_package_endpoints: Vec<EndpointSelection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DataSettings {
    #[serde(default)]
    pub data_package_endpoints: Vec<EndpointSelection>,
}

impl ProjectSettings {
    /// Settings for a fresh project, wired to the built-in packages.
    pub fn with_defaults(title: &str) -> Self {
        let selection = |id: &str| EndpointSelection::new(id);
        Self {
            project: ProjectConfig {
                title: title.to_string(),
                review_type: "literature_review".to_string(),
            },
            sources: Vec::new(),
            load: LoadSettings {
                load_package_endpoints: vec![selection("json_import")],
            },
            prep: PrepSettings::default(),
            dedupe: DedupeSettings {
                dedupe_package_endpoints: vec![selection("exact_match")],
            },
            prescreen: PrescreenSettings {
                explanation: None,
                prescreen_package_endpoints: vec![selection("conditional")],
            },
            pdf_get: PdfGetSettings {
                pdf_get_package_endpoints: vec![selection("local_files")],
                pdf_get_man_package_endpoints: Vec::new(),
            },
            pdf_prep: PdfPrepSettings {
                pdf_prep_package_endpoints: vec![selection("local_files")],
                pdf_prep_man_package_endpoints: Vec::new(),
            },
            screen: ScreenSettings {
                criteria: BTreeMap::new(),
                screen_package_endpoints: vec![selection("conditional")],
            },
            data: DataSettings::default(),
        }
    }
}
