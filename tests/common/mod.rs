//! Test utilities shared across the integration test suite.

use tempfile::TempDir;

/// Creates a temporary directory for test output.
#[allow(dead_code)]
pub fn create_test_dir() -> TempDir {
    TempDir::new().expect("failed to create temp dir")
}
