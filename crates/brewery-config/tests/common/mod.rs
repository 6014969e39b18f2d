// brewery-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for brewery-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use brewery_config::BreweryConfig;
use brewery_config::ConfigError;
use brewery_config::PrincipalConfig;
use brewery_config::Role;
use brewery_config::ServerAuthConfig;
use brewery_config::ServerAuthMode;

/// Result type shared by config test suites.
pub type TestResult = Result<(), String>;

/// Parses a TOML string into a `BreweryConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<BreweryConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<BreweryConfig, toml::de::Error> {
    config_from_toml("")
}

/// Returns a minimal config with the provided auth config.
pub fn config_with_auth(auth: ServerAuthConfig) -> Result<BreweryConfig, toml::de::Error> {
    let mut config = minimal_config()?;
    config.server.auth = Some(auth);
    Ok(config)
}

/// Builds a principal with the given roles.
pub fn principal(subject: &str, token: &str, roles: &[Role]) -> PrincipalConfig {
    PrincipalConfig {
        subject: subject.to_string(),
        token: token.to_string(),
        roles: roles.to_vec(),
    }
}

/// Builds a bearer-token auth config from principals.
pub fn bearer_auth(principals: Vec<PrincipalConfig>) -> ServerAuthConfig {
    ServerAuthConfig {
        mode: ServerAuthMode::BearerToken,
        principals,
    }
}

/// Assert that a validation result is an error containing a specific substring.
pub fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}
