//! Common test utilities for cfgtree integration tests
//!
//! Provides the settings fixture, a temporary config directory and helpers.

#![allow(dead_code)]

use cfgtree::{ConfigLoader, ConfigTree, SchemaValidator, cms};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Install the test logger once; repeated calls are ignored
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Directory of the checked-in fixtures
pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// Path of the CMS settings fixture
pub fn settings_php() -> PathBuf {
    fixtures_dir().join("settings.php")
}

/// Raw text of the CMS settings fixture
pub fn settings_php_source() -> String {
    std::fs::read_to_string(settings_php()).expect("Failed to read settings.php fixture")
}

/// The parsed CMS settings fixture
pub fn settings_tree() -> ConfigTree {
    ConfigLoader::default()
        .load_file(settings_php())
        .expect("Failed to load settings.php fixture")
}

/// Validator for the CMS preset
pub fn cms_validator() -> SchemaValidator {
    SchemaValidator::new(cms::rules()).expect("CMS rules are valid")
}

// =============================================================================
// Test Fixtures
// =============================================================================

/// Test fixture that provides a temporary directory and a loader rooted there
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub loader: ConfigLoader,
}

impl TestFixture {
    pub fn new() -> Self {
        init_logging();
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let loader = ConfigLoader::builder().base_dir(temp_dir.path()).build();
        Self { temp_dir, loader }
    }

    /// Fixture whose directory already holds a copy of `settings.php`
    pub fn with_settings() -> Self {
        let fixture = Self::new();
        fixture.write_raw("settings.php", &settings_php_source());
        fixture
    }

    pub fn config_dir(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Write text verbatim, bypassing the formats
    pub fn write_raw(&self, name: &str, content: &str) {
        std::fs::write(self.path(name), content).expect("Failed to write fixture file");
    }

    pub fn read_raw(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).expect("Failed to read fixture file")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
