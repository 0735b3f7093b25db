use crate::package_system::endpoint::EndpointSelection;
use crate::storage::settings::ProjectSettings;

#[test]
fn test_defaults_wire_builtin_endpoints() {
    let settings = ProjectSettings::with_defaults("Example review");
    assert_eq!(settings.project.title, "Example review");
    assert_eq!(settings.project.review_type, "literature_review");
    assert_eq!(settings.load.load_package_endpoints[0].endpoint, "json_import");
    assert_eq!(
        settings.dedupe.dedupe_package_endpoints[0].endpoint,
        "exact_match"
    );
    assert_eq!(
        settings.prescreen.prescreen_package_endpoints[0].endpoint,
        "conditional"
    );
    assert_eq!(
        settings.pdf_get.pdf_get_package_endpoints[0].endpoint,
        "local_files"
    );
    // Prep and data have no generally applicable default endpoints
    assert!(settings.prep.prep_package_endpoints.is_empty());
    assert!(settings.data.data_package_endpoints.is_empty());
}

#[test]
fn test_settings_round_trip_with_endpoint_params() {
    let mut settings = ProjectSettings::with_defaults("Round trip");
    settings.screen.screen_package_endpoints =
        vec![EndpointSelection::new("conditional").with_param("include_all", serde_json::json!(true))];

    let raw = serde_json::to_string_pretty(&settings).unwrap();
    let restored: ProjectSettings = serde_json::from_str(&raw).unwrap();

    let selection = &restored.screen.screen_package_endpoints[0];
    assert_eq!(selection.endpoint, "conditional");
    assert!(selection.bool_param("include_all", false));
}

#[test]
fn test_endpoint_params_flatten_beside_endpoint_key() {
    let raw = r#"{ "endpoint": "conditional", "include_all": false }"#;
    let selection: EndpointSelection = serde_json::from_str(raw).unwrap();
    assert_eq!(selection.endpoint, "conditional");
    assert!(!selection.bool_param("include_all", true));
    // Missing params fall back to the caller's default
    assert!(selection.bool_param("missing", true));
}

#[test]
fn test_missing_sections_default_empty() {
    let raw = r#"{ "project": { "title": "Minimal", "review_type": "literature_review" } }"#;
    let settings: ProjectSettings = serde_json::from_str(raw).unwrap();
    assert!(settings.sources.is_empty());
    assert!(settings.load.load_package_endpoints.is_empty());
    assert!(settings.screen.criteria.is_empty());
}
