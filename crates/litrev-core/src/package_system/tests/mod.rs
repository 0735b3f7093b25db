// Package system test module
#[cfg(test)]
mod manifest_tests;
#[cfg(test)]
mod manager_tests;
#[cfg(test)]
mod registry_tests;

#[cfg(test)]
mod tests {
    use crate::package_system::endpoint::EndpointType;
    use crate::package_system::loader::core_versions_compatible;

    #[test]
    fn test_endpoint_type_round_trip() {
        for endpoint_type in EndpointType::all() {
            let parsed: EndpointType = endpoint_type.as_str().parse().unwrap();
            assert_eq!(parsed, *endpoint_type);
        }
    }

    #[test]
    fn test_endpoint_type_unknown() {
        assert!("prescren".parse::<EndpointType>().is_err());
    }

    #[test]
    fn test_core_version_compatibility() {
        assert!(core_versions_compatible("0.1.0", "0.1.3"));
        assert!(!core_versions_compatible("0.2.0", "0.1.0"));
        assert!(core_versions_compatible("1.2.0", "1.9.1"));
        assert!(!core_versions_compatible("2.0.0", "1.9.1"));
        assert!(!core_versions_compatible("not-a-version", "0.1.0"));
    }
}
