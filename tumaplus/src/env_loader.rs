//! Environment variable loading utilities
//!
//! Common patterns for loading prefixed environment variables with type
//! conversion and fallback defaults.

use std::env;
use std::str::FromStr;

/// Builder for loading multiple environment variables with a consistent prefix
#[derive(Debug)]
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    /// Create a new environment loader with the given prefix
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }

    /// Load a string value with default
    pub fn load_string(&self, suffix: &str, default: &str) -> String {
        env::var(self.key(suffix)).unwrap_or_else(|_| default.to_string())
    }

    /// Load an optional value; empty strings count as unset
    pub fn load_optional<T>(&self, suffix: &str) -> Option<T>
    where
        T: FromStr,
    {
        env::var(self.key(suffix))
            .ok()
            .filter(|v| !v.trim().is_empty())
            .and_then(|v| v.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_loader() {
        let loader = EnvLoader::new("TUMAPLUS_TEST");

        let key = "TUMAPLUS_TEST_STRING";
        env::remove_var(key);
        assert_eq!(loader.load_string("STRING", "default"), "default");

        env::set_var(key, "value");
        assert_eq!(loader.load_string("STRING", "default"), "value");

        let num_key = "TUMAPLUS_TEST_NUMBER";
        env::set_var(num_key, "invalid");
        assert_eq!(loader.load_optional::<u32>("NUMBER"), None);

        env::set_var(num_key, "123");
        assert_eq!(loader.load_optional::<u32>("NUMBER"), Some(123));

        env::remove_var(key);
        env::remove_var(num_key);
    }

    #[test]
    #[serial]
    fn test_blank_optional_is_unset() {
        let loader = EnvLoader::new("TUMAPLUS_TEST");
        let key = "TUMAPLUS_TEST_SHEET";

        env::set_var(key, "   ");
        assert_eq!(loader.load_optional::<String>("SHEET"), None);

        env::set_var(key, "Feuil1");
        assert_eq!(
            loader.load_optional::<String>("SHEET"),
            Some("Feuil1".to_string())
        );

        env::remove_var(key);
    }
}
