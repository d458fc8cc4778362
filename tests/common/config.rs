//! Test configuration helpers for loading .env credentials and building clients

use numcheck::{Config, JobClient};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

/// Build a client pointed at a mock service
///
/// Returns the client and the temp directory holding its output path
/// (keep temp_dir alive for test duration).
pub fn mock_client(server: &MockServer) -> (JobClient, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let mut config = Config::new(TEST_API_KEY);
    config.base_url = format!("{}{}", server.uri(), TASKS_PATH);
    config.poll_interval = Duration::from_millis(50);
    config.request_timeout = Duration::from_secs(5);
    config.output_path = temp_dir.path().join("whatsapp_results.xlsx");

    let client = JobClient::new(config).expect("Failed to create client");
    (client, temp_dir)
}

/// API key the mock service expects
pub const TEST_API_KEY: &str = "test-api-key";

/// Path of the task endpoint on the mock service
pub const TASKS_PATH: &str = "/wa/api/simple/tasks";

/// Check if live test credentials are available
pub fn has_live_credentials() -> bool {
    dotenvy::dotenv().ok();
    std::env::var(numcheck::config::API_KEY_ENV).is_ok()
}

/// Skip test if credentials are not available
#[macro_export]
macro_rules! skip_if_no_credentials {
    () => {
        if !$crate::common::has_live_credentials() {
            eprintln!("Skipping test: WHATSAPP_API_KEY not found in .env");
            return;
        }
    };
}
