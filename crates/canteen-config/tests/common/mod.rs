// crates/canteen-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for canteen-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use canteen_config::CanteenConfig;
use canteen_config::ConfigError;

/// Secrets every valid config must carry.
pub const MINIMAL_TOML: &str = r#"
[auth]
jwt_secret = "0123456789abcdef0123456789abcdef"

[payments]
key_id = "rzp_test_key"
key_secret = "rzp_test_secret"
"#;

/// Parses a TOML string into a `CanteenConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<CanteenConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with required secrets and all other defaults.
pub fn minimal_config() -> Result<CanteenConfig, toml::de::Error> {
    config_from_toml(MINIMAL_TOML)
}

/// Checks that `result` is an error whose message contains `needle`.
pub fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}
