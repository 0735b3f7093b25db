//! Rule-based screening: the `conditional` prescreen and screen endpoints.
//!
//! Decisions follow the selection parameters instead of asking a human:
//! `include_all` (default true) sets the direction, and an optional
//! `require_field` excludes records that lack the named field. The screen
//! endpoint also stamps the decision per screening criterion.
use std::sync::Arc;

use async_trait::async_trait;

use litrev_core::package_system::endpoint::{PrescreenEndpoint, ScreenEndpoint};
use litrev_core::package_system::error::PackageSystemError;
use litrev_core::package_system::{
    EndpointInstance, EndpointSelection, EndpointType, OperationContext, PackageDeclaration,
    PackageRegistrar, ReviewPackage, CORE_VERSION,
};
use litrev_core::record::Dataset;
use litrev_core::{Record, RecordState};

const PACKAGE_ID: &str = "conditional";

/// Shared decision rule for both screens.
#[derive(Debug, Clone)]
struct Rule {
    include_all: bool,
    require_field: Option<String>,
}

impl Rule {
    fn from_selection(selection: &EndpointSelection) -> Self {
        Self {
            include_all: selection.bool_param("include_all", true),
            require_field: selection.str_param("require_field").map(str::to_string),
        }
    }

    fn includes(&self, record: &Record) -> bool {
        if !self.include_all {
            return false;
        }
        match &self.require_field {
            Some(field) => record.field(field).is_some_and(|v| !v.is_empty()),
            None => true,
        }
    }
}

struct ConditionalPrescreen {
    rule: Rule,
}

#[async_trait]
impl PrescreenEndpoint for ConditionalPrescreen {
    async fn run_prescreen(
        &self,
        _ctx: &OperationContext,
        dataset: &mut Dataset,
    ) -> Result<(), PackageSystemError> {
        let pending = dataset.ids_in_state(RecordState::MdProcessed);
        for id in pending {
            let Some(record) = dataset.get_mut(&id) else { continue };
            let next = if self.rule.includes(record) {
                RecordState::RevPrescreenIncluded
            } else {
                RecordState::RevPrescreenExcluded
            };
            record
                .set_status(next)
                .map_err(|e| PackageSystemError::OperationError {
                    package_id: PACKAGE_ID.to_string(),
                    message: e.to_string(),
                })?;
            log::debug!("{}: prescreen '{}' -> {}", PACKAGE_ID, id, next);
        }
        Ok(())
    }
}

struct ConditionalScreen {
    rule: Rule,
}

#[async_trait]
impl ScreenEndpoint for ConditionalScreen {
    async fn run_screen(
        &self,
        ctx: &OperationContext,
        dataset: &mut Dataset,
    ) -> Result<(), PackageSystemError> {
        let criteria: Vec<String> = ctx.settings.screen.criteria.keys().cloned().collect();
        let pending = dataset.ids_in_state(RecordState::PdfPrepared);
        for id in pending {
            let Some(record) = dataset.get_mut(&id) else { continue };
            let included = self.rule.includes(record);
            if !criteria.is_empty() {
                let decision = if included { "in" } else { "out" };
                let stamped = criteria
                    .iter()
                    .map(|c| format!("{}={}", c, decision))
                    .collect::<Vec<_>>()
                    .join(";");
                record.set_field("screening_criteria", &stamped);
            }
            let next = if included {
                RecordState::RevIncluded
            } else {
                RecordState::RevExcluded
            };
            record
                .set_status(next)
                .map_err(|e| PackageSystemError::OperationError {
                    package_id: PACKAGE_ID.to_string(),
                    message: e.to_string(),
                })?;
            log::debug!("{}: screen '{}' -> {}", PACKAGE_ID, id, next);
        }
        Ok(())
    }
}

/// The `conditional` package.
pub struct ConditionalPackage;

impl ReviewPackage for ConditionalPackage {
    fn id(&self) -> &str {
        PACKAGE_ID
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Screen records by rule instead of manual review"
    }

    fn provided_endpoints(&self) -> Vec<EndpointType> {
        vec![EndpointType::Prescreen, EndpointType::Screen]
    }

    fn settings_schema(&self, _endpoint_type: EndpointType) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "include_all": { "type": "boolean", "default": true },
                "require_field": { "type": "string" }
            }
        })
    }

    fn create_endpoint(
        &self,
        endpoint_type: EndpointType,
        selection: &EndpointSelection,
        _ctx: &OperationContext,
    ) -> Result<EndpointInstance, PackageSystemError> {
        let rule = Rule::from_selection(selection);
        match endpoint_type {
            EndpointType::Prescreen => {
                Ok(EndpointInstance::Prescreen(Box::new(ConditionalPrescreen { rule })))
            }
            EndpointType::Screen => {
                Ok(EndpointInstance::Screen(Box::new(ConditionalScreen { rule })))
            }
            other => Err(PackageSystemError::UndeclaredEndpoint {
                package_id: PACKAGE_ID.to_string(),
                endpoint_type: other,
            }),
        }
    }
}

fn register(registrar: &mut PackageRegistrar) {
    registrar.register(Arc::new(ConditionalPackage));
}

#[cfg(feature = "dynamic-export")]
#[no_mangle]
pub static litrev_package_declaration: PackageDeclaration = PackageDeclaration {
    core_version: CORE_VERSION,
    register,
};
