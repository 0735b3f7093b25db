/// Application name
pub const APP_NAME: &str = "litrev";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Project settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Canonical record store file name
pub const RECORDS_FILE: &str = "records.json";

/// Directory holding record snapshots and the operation log
pub const HISTORY_DIR: &str = "history";

/// Operation log file name (inside the history directory)
pub const HISTORY_LOG_FILE: &str = "log";

/// Directory where search result files are placed for loading
pub const SEARCH_DIR: &str = "search";

/// Directory where retrieved PDFs are stored
pub const PDF_DIR: &str = "pdfs";

/// Directory scanned for installed module packages
pub const MODULE_PACKAGES_DIR: &str = "packages";

/// Project-local directory scanned for custom packages
pub const CUSTOM_PACKAGES_DIR: &str = "custom_packages";

/// Project-local directory holding per-package configuration files
pub const PACKAGE_CONFIG_DIR: &str = "package_config";

/// Manifest file name inside a module or custom package directory
pub const PACKAGE_MANIFEST_FILE: &str = "package.json";
