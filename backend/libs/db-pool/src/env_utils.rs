//! Environment variable parsing utilities
//!
//! Small helpers for reading typed settings with fallbacks, so config
//! loaders never need to unwrap.

use std::str::FromStr;

/// Parse an environment variable with a default fallback
///
/// Missing and unparsable values both yield `default`.
pub fn parse_env_with_default<T: FromStr>(key: &str, default: T) -> T {
    parse_env_optional(key).unwrap_or(default)
}

/// Parse an environment variable, returning None if missing or invalid
pub fn parse_env_optional<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse a required environment variable
pub fn parse_env_required<T: FromStr>(key: &str) -> Result<T, String> {
    std::env::var(key)
        .map_err(|_| format!("Environment variable {} not found", key))?
        .trim()
        .parse()
        .map_err(|_| format!("Failed to parse environment variable {}", key))
}

/// Parse a boolean flag
///
/// Accepts `1/0`, `true/false`, `yes/no` and `on/off` in any case.
pub fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn test_parse_env_with_default() {
        let result: u32 = parse_env_with_default("DB_POOL_TEST_MISSING", 42);
        assert_eq!(result, 42);

        std::env::set_var("DB_POOL_TEST_PORT", "8080");
        let result: u16 = parse_env_with_default("DB_POOL_TEST_PORT", 3000);
        assert_eq!(result, 8080);

        std::env::set_var("DB_POOL_TEST_PORT", "eighty");
        let result: u16 = parse_env_with_default("DB_POOL_TEST_PORT", 3000);
        assert_eq!(result, 3000);
        std::env::remove_var("DB_POOL_TEST_PORT");
    }

    #[test]
    #[serial_test::serial]
    fn test_parse_env_required() {
        assert!(parse_env_required::<u32>("DB_POOL_TEST_MISSING").is_err());

        std::env::set_var("DB_POOL_TEST_REQ", " 456 ");
        assert_eq!(parse_env_required::<u32>("DB_POOL_TEST_REQ"), Ok(456));
        std::env::remove_var("DB_POOL_TEST_REQ");
    }

    #[test]
    #[serial_test::serial]
    fn test_parse_env_bool() {
        assert!(parse_env_bool("DB_POOL_TEST_MISSING", true));

        for (raw, expected) in [("TRUE", true), ("on", true), ("0", false), ("No", false)] {
            std::env::set_var("DB_POOL_TEST_FLAG", raw);
            assert_eq!(parse_env_bool("DB_POOL_TEST_FLAG", !expected), expected);
        }

        std::env::set_var("DB_POOL_TEST_FLAG", "maybe");
        assert!(!parse_env_bool("DB_POOL_TEST_FLAG", false));
        std::env::remove_var("DB_POOL_TEST_FLAG");
    }
}
