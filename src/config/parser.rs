use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable consulted when the config file carries no API key
pub const API_KEY_ENV: &str = "TMDB_API_KEY";

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use tmdb_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Results wanted: {}", config.harvest.results_wanted);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    apply_env_overrides(&mut config, std::env::var(API_KEY_ENV).ok());
    validate(&config)?;
    Ok(config)
}

/// Parses configuration text without touching the environment
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Fills the API key from the environment when the file left it unset
fn apply_env_overrides(config: &mut Config, env_key: Option<String>) {
    if config.network.active_api_key().is_some() {
        return;
    }
    if let Some(key) = env_key.filter(|key| !key.trim().is_empty()) {
        config.network.api_key = Some(key);
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Recorded on each run row so a resumed run can be traced back to the
/// configuration it started with.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentSelection;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[harvest]
content-type = "both"
search-queries = ["batman", "dune"]
results-wanted = 10
max-concurrency = 4

[discover]
genre-ids = "28, 12"
year-from = 2020

[extras]
collect-reviews = true
max-reviews-per-content = 5

[network]
api-key = "secret"
min-delay-ms = 0
max-delay-ms = 0

[output]
database-path = "./test.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.harvest.content_type, ContentSelection::Both);
        assert_eq!(config.harvest.search_queries, vec!["batman", "dune"]);
        assert_eq!(config.harvest.results_wanted, 10);
        assert_eq!(config.harvest.max_pages, 5);
        assert_eq!(config.discover.genre_ids, vec![28, 12]);
        assert_eq!(config.discover.sort_by, "popularity.desc");
        assert!(config.extras.collect_reviews);
        assert_eq!(config.extras.max_reviews_per_content, 5);
        assert_eq!(config.network.active_api_key(), Some("secret"));
        assert_eq!(config.output.database_path, "./test.db");
    }

    #[test]
    fn test_comma_separated_queries() {
        let config = parse_config(
            r#"
[harvest]
search-queries = "alien, , predator "
"#,
        )
        .unwrap();
        assert_eq!(config.harvest.search_queries, vec!["alien", "predator"]);
    }

    #[test]
    fn test_tv_alias_selects_series() {
        let config = parse_config("[harvest]\ncontent-type = \"tv\"\n").unwrap();
        assert_eq!(config.harvest.content_type, ContentSelection::Series);
    }

    #[test]
    fn test_unknown_content_type_is_rejected() {
        let result = parse_config("[harvest]\ncontent-type = \"music\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_key_fills_missing_key() {
        let mut config = parse_config("").unwrap();
        apply_env_overrides(&mut config, Some("from-env".to_string()));
        assert_eq!(config.network.active_api_key(), Some("from-env"));
    }

    #[test]
    fn test_env_key_does_not_override_file_key() {
        let mut config = parse_config("[network]\napi-key = \"from-file\"\n").unwrap();
        apply_env_overrides(&mut config, Some("from-env".to_string()));
        assert_eq!(config.network.active_api_key(), Some("from-file"));
    }

    #[test]
    fn test_blank_key_is_inactive() {
        let config = parse_config("[network]\napi-key = \"   \"\n").unwrap();
        assert_eq!(config.network.active_api_key(), None);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/harvest.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[harvest]\nmax-concurrency = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }
}
