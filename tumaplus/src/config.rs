//! Configuration management for TUMA PLUS
//!
//! Values are layered, lowest precedence first: built-in defaults,
//! `TUMAPLUS_*` environment variables, then a `tumaplus.yaml` file. The CLI
//! applies its flags on top of the result.

use crate::env_loader::EnvLoader;
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// KoBo export of the consortium reporting form
pub const DEFAULT_DATA_SOURCE: &str = "https://kc.humanitarianresponse.info/api/v1/data/1560805.xlsx";

const CONFIG_FILENAME: &str = "tumaplus.yaml";
const ENV_PREFIX: &str = "TUMAPLUS";

/// Where a dataset snapshot comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// Remote export fetched over HTTP(S)
    Url(url::Url),
    /// Local spreadsheet or CSV file
    Path(PathBuf),
}

impl SourceLocation {
    /// Classify a configured source string. Anything with an `http` or
    /// `https` scheme is remote, everything else is a filesystem path.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "data_source".to_string(),
                value: raw.to_string(),
                hint: "data_source must be a URL or a path to a .xlsx/.csv file".to_string(),
            });
        }

        match url::Url::parse(trimmed) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self::Url(url)),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(Self::Path)
                .map_err(|_| ConfigError::InvalidValue {
                    field: "data_source".to_string(),
                    value: raw.to_string(),
                    hint: "file:// URLs must point to an absolute local path".to_string(),
                }),
            // Single-letter schemes are Windows drive letters
            Ok(url) if url.scheme().len() > 1 => Err(ConfigError::InvalidValue {
                field: "data_source".to_string(),
                value: raw.to_string(),
                hint: format!("unsupported scheme '{}', use http(s) or a file path", url.scheme()),
            }),
            _ => Ok(Self::Path(PathBuf::from(trimmed))),
        }
    }
}

/// Configuration settings for the dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// URL or local path of the indicator spreadsheet
    pub data_source: String,
    /// Worksheet to read from a workbook (default: the first one)
    pub sheet_name: Option<String>,
    /// Custom section catalog replacing the builtin one
    pub catalog_path: Option<PathBuf>,
    /// User agent sent with HTTP requests
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_source: DEFAULT_DATA_SOURCE.to_string(),
            sheet_name: None,
            catalog_path: None,
            user_agent: format!("tumaplus/{}", crate::VERSION),
        }
    }
}

impl Config {
    /// Create a configuration instance with values loaded from:
    /// 1. YAML file (highest precedence)
    /// 2. Environment variables
    /// 3. Defaults (lowest precedence)
    pub fn new() -> Self {
        let mut config = Self::default();
        config.apply_env_vars();

        match YamlConfig::load_or_default() {
            Ok(yaml_config) => yaml_config.apply_to_config(&mut config),
            Err(e) => {
                tracing::warn!(
                    "Failed to load YAML configuration, falling back to env vars and defaults: {}",
                    e
                );
            }
        }

        config
    }

    fn apply_env_vars(&mut self) {
        let loader = EnvLoader::new(ENV_PREFIX);

        self.data_source = loader.load_string("DATA_SOURCE", &self.data_source);
        if let Some(sheet) = loader.load_optional::<String>("SHEET_NAME") {
            self.sheet_name = Some(sheet);
        }
        if let Some(path) = loader.load_optional::<PathBuf>("CATALOG_PATH") {
            self.catalog_path = Some(path);
        }
        self.user_agent = loader.load_string("USER_AGENT", &self.user_agent);
    }

    /// The parsed data source location
    pub fn source_location(&self) -> Result<SourceLocation, ConfigError> {
        SourceLocation::parse(&self.data_source)
    }

    /// Find the tumaplus.yaml configuration file. Search order:
    /// 1. Current working directory
    /// 2. `~/.config/tumaplus/tumaplus.yaml`
    /// 3. `~/tumaplus.yaml`
    pub fn find_yaml_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(CONFIG_FILENAME)];

        if let Some(home_dir) = dirs::home_dir() {
            search_paths.push(home_dir.join(".config").join("tumaplus").join(CONFIG_FILENAME));
            search_paths.push(home_dir.join(CONFIG_FILENAME));
        }

        let found = search_paths.into_iter().find(|path| path.is_file());
        match &found {
            Some(path) => tracing::debug!("Found configuration file: {:?}", path),
            None => tracing::debug!("No {} configuration file found", CONFIG_FILENAME),
        }
        found
    }

    /// Validate the current configuration settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.source_location()?;

        if let Some(sheet) = &self.sheet_name {
            if sheet.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "sheet_name".to_string(),
                    value: sheet.clone(),
                    hint: "omit sheet_name to read the first worksheet".to_string(),
                });
            }
        }

        if let Some(path) = &self.catalog_path {
            if !path.is_file() {
                return Err(ConfigError::InvalidValue {
                    field: "catalog_path".to_string(),
                    value: path.display().to_string(),
                    hint: "catalog_path must point to a readable YAML section catalog".to_string(),
                });
            }
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "user_agent cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Generate an example YAML configuration file content
    pub fn example_yaml_config() -> &'static str {
        r#"# tumaplus.yaml
# Where to read the indicator spreadsheet from (URL or local path)
data_source: "https://kc.humanitarianresponse.info/api/v1/data/1560805.xlsx"

# Worksheet name inside the workbook (default: first sheet)
# sheet_name: "Sheet1"

# Replace the builtin report sections
# catalog_path: "./sections.yaml"
"#
    }
}

/// Configuration loaded from a tumaplus.yaml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlConfig {
    /// URL or local path of the indicator spreadsheet
    pub data_source: Option<String>,
    /// Worksheet to read
    pub sheet_name: Option<String>,
    /// Custom section catalog
    pub catalog_path: Option<PathBuf>,
    /// HTTP user agent
    pub user_agent: Option<String>,
}

impl YamlConfig {
    /// Apply YAML values to an existing Config; YAML values take precedence
    pub fn apply_to_config(&self, config: &mut Config) {
        if let Some(ref source) = self.data_source {
            config.data_source = source.clone();
        }
        if let Some(ref sheet) = self.sheet_name {
            config.sheet_name = Some(sheet.clone());
        }
        if let Some(ref path) = self.catalog_path {
            config.catalog_path = Some(path.clone());
        }
        if let Some(ref agent) = self.user_agent {
            config.user_agent = agent.clone();
        }
    }

    /// Load YAML configuration from a file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::info!("Loading YAML configuration from: {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Try to load YAML configuration, returning default if no file is found
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Config::find_yaml_config_file() {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "TUMAPLUS_DATA_SOURCE",
            "TUMAPLUS_SHEET_NAME",
            "TUMAPLUS_CATALOG_PATH",
            "TUMAPLUS_USER_AGENT",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data_source, DEFAULT_DATA_SOURCE);
        assert_eq!(config.sheet_name, None);
        assert!(config.user_agent.starts_with("tumaplus/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_config_with_env_vars() {
        clear_env();
        let temp_dir = tempfile::TempDir::new().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(temp_dir.path()).unwrap();

        std::env::set_var("TUMAPLUS_DATA_SOURCE", "/data/export.csv");
        std::env::set_var("TUMAPLUS_SHEET_NAME", "Rapports");

        let config = Config::new();
        assert_eq!(config.data_source, "/data/export.csv");
        assert_eq!(config.sheet_name.as_deref(), Some("Rapports"));

        clear_env();
        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_yaml_overrides_env() {
        clear_env();
        let temp_dir = tempfile::TempDir::new().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(temp_dir.path()).unwrap();

        std::fs::write(CONFIG_FILENAME, "data_source: ./local.xlsx\n").unwrap();
        std::env::set_var("TUMAPLUS_DATA_SOURCE", "/from/env.csv");

        let config = Config::new();
        assert_eq!(config.data_source, "./local.xlsx");

        clear_env();
        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    fn test_yaml_config_rejects_unknown_fields() {
        let result: Result<YamlConfig, _> = serde_yaml::from_str("base_branch: main\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_source_location_parse() {
        assert!(matches!(
            SourceLocation::parse(DEFAULT_DATA_SOURCE),
            Ok(SourceLocation::Url(_))
        ));
        assert_eq!(
            SourceLocation::parse("exports/tuma.csv").unwrap(),
            SourceLocation::Path(PathBuf::from("exports/tuma.csv"))
        );
        assert_eq!(
            SourceLocation::parse("C:\\data\\tuma.xlsx").unwrap(),
            SourceLocation::Path(PathBuf::from("C:\\data\\tuma.xlsx"))
        );
        assert!(SourceLocation::parse("   ").is_err());
        assert!(SourceLocation::parse("ftp://example.org/data.csv").is_err());
    }

    #[test]
    fn test_validate_rejects_missing_catalog() {
        let config = Config {
            catalog_path: Some(PathBuf::from("/definitely/not/here.yaml")),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("catalog_path"));
    }
}
