//! Exact-match deduplication: the `exact_match` dedupe endpoint.
//!
//! Records whose normalized title, author and year coincide are considered
//! duplicates. The first record in citation-key order is kept; duplicates
//! are merged into it and removed from the store.
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use litrev_core::package_system::endpoint::DedupeEndpoint;
use litrev_core::package_system::error::PackageSystemError;
use litrev_core::package_system::{
    EndpointInstance, EndpointSelection, EndpointType, OperationContext, PackageDeclaration,
    PackageRegistrar, ReviewPackage, CORE_VERSION,
};
use litrev_core::record::Dataset;
use litrev_core::Record;

const PACKAGE_ID: &str = "exact_match";

/// Lowercased alphanumeric form, whitespace collapsed away.
fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Duplicate key of a record, None when the title is missing or empty.
fn dedupe_key(record: &Record) -> Option<String> {
    let title = normalize(record.field("title").unwrap_or_default());
    if title.is_empty() {
        return None;
    }
    let author = normalize(record.field("author").unwrap_or_default());
    let year = normalize(record.field("year").unwrap_or_default());
    Some(format!("{}|{}|{}", title, author, year))
}

struct ExactMatcher;

#[async_trait]
impl DedupeEndpoint for ExactMatcher {
    async fn run_dedupe(
        &self,
        _ctx: &OperationContext,
        dataset: &mut Dataset,
    ) -> Result<usize, PackageSystemError> {
        // Citation-key order makes the kept record deterministic
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for record in dataset.iter() {
            if let Some(key) = dedupe_key(record) {
                groups.entry(key).or_default().push(record.id.clone());
            }
        }

        let mut merges = 0;
        for ids in groups.into_values().filter(|ids| ids.len() > 1) {
            let kept_id = ids[0].clone();
            for duplicate_id in &ids[1..] {
                let Some(duplicate) = dataset.remove(duplicate_id) else {
                    continue;
                };
                if let Some(kept) = dataset.get_mut(&kept_id) {
                    kept.merge(&duplicate);
                }
                log::info!("{}: merged '{}' into '{}'", PACKAGE_ID, duplicate_id, kept_id);
                merges += 1;
            }
        }
        Ok(merges)
    }
}

/// The `exact_match` package.
pub struct ExactMatchPackage;

impl ReviewPackage for ExactMatchPackage {
    fn id(&self) -> &str {
        PACKAGE_ID
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Merge records with identical title, author and year"
    }

    fn provided_endpoints(&self) -> Vec<EndpointType> {
        vec![EndpointType::Dedupe]
    }

    fn create_endpoint(
        &self,
        endpoint_type: EndpointType,
        _selection: &EndpointSelection,
        _ctx: &OperationContext,
    ) -> Result<EndpointInstance, PackageSystemError> {
        match endpoint_type {
            EndpointType::Dedupe => Ok(EndpointInstance::Dedupe(Box::new(ExactMatcher))),
            other => Err(PackageSystemError::UndeclaredEndpoint {
                package_id: PACKAGE_ID.to_string(),
                endpoint_type: other,
            }),
        }
    }
}

fn register(registrar: &mut PackageRegistrar) {
    registrar.register(Arc::new(ExactMatchPackage));
}

#[cfg(feature = "dynamic-export")]
#[no_mangle]
pub static litrev_package_declaration: PackageDeclaration = PackageDeclaration {
    core_version: CORE_VERSION,
    register,
};
