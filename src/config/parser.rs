use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment keys recognized as overrides
pub const ENV_BASE_URL: &str = "URL";
pub const ENV_USER_AGENT: &str = "USER_AGENT";
pub const ENV_ALLOWED_DOMAINS: &str = "ALLOWED_DOMAINS";
pub const ENV_COOKIE: &str = "COOKIE";
pub const ENV_CACHE_URL: &str = "CACHE_URL";
pub const ENV_CACHE_HORIZON_DAYS: &str = "CACHE_HORIZON_DAYS";
pub const ENV_STORE_PATH: &str = "STORE_PATH";
pub const ENV_PUBLISH_URL: &str = "PUBLISH_URL";
pub const ENV_PARALLELISM: &str = "PARALLELISM";

/// Loads and parses a configuration file from the given path
///
/// Environment variables are not consulted; see [`load_from_env`].
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config = read_file(path)?;
    validate(&config)?;
    Ok(config)
}

/// Loads configuration from an optional file overlaid with the process environment
///
/// A `.env` file in the working directory is loaded first if present. Values
/// from the environment win over values from the file; anything set in
/// neither falls back to the defaults.
pub fn load_from_env(path: Option<&Path>) -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();

    let mut config = match path {
        Some(path) => read_file(path)?,
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate(&config)?;

    Ok(config)
}

/// Applies environment-style overrides using the given lookup
///
/// The lookup is injected so callers (and tests) can supply values without
/// touching the process environment. Empty values are treated as unset.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get(ENV_BASE_URL) {
        config.site.base_url = url;
    }
    if let Some(agent) = get(ENV_USER_AGENT) {
        config.site.user_agent = agent;
    }
    if let Some(domains) = get(ENV_ALLOWED_DOMAINS) {
        config.site.allowed_domains = domains
            .split(',')
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
    }
    if let Some(cookie) = get(ENV_COOKIE) {
        config.site.cookie = Some(cookie);
    }
    if let Some(cache_url) = get(ENV_CACHE_URL) {
        config.cache.url = cache_url;
    }
    if let Some(days) = get(ENV_CACHE_HORIZON_DAYS) {
        config.cache.horizon_days = parse_number(ENV_CACHE_HORIZON_DAYS, &days)?;
    }
    if let Some(path) = get(ENV_STORE_PATH) {
        config.output.store_path = path;
    }
    if let Some(url) = get(ENV_PUBLISH_URL) {
        config.output.publish_url = Some(url);
    }
    if let Some(parallelism) = get(ENV_PARALLELISM) {
        config.crawler.parallelism = parse_number(ENV_PARALLELISM, &parallelism)?;
    }

    Ok(())
}

/// Computes a SHA-256 hash of the resolved configuration
///
/// This is recorded with every pass so runs made under different settings
/// can be told apart.
pub fn compute_config_hash(config: &Config) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{:?}", config).as_bytes());
    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: Option<&Path>) -> Result<(Config, String), ConfigError> {
    let config = load_from_env(path)?;
    let hash = compute_config_hash(&config);
    Ok((config, hash))
}

fn read_file(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlPolicy;
    use crate::config::AddressStrategy;
    use crate::storage::Partitioning;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[site]
base-url = "https://www.example.com/apartments"
allowed-domains = ["example.com", "www.example.com"]
user-agent = "Mozilla/5.0 TestAgent"
cookie = "session=abc"

[crawler]
parallelism = 2
random-delay-ms = 250

[extraction]
address-strategy = "breadcrumb"

[cache]
url = "memory://"
horizon-days = 3
ttl-policy = "sliding"

[output]
partitioning = "flat"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.site.base_url, "https://www.example.com/apartments");
        assert_eq!(config.site.allowed_domains.len(), 2);
        assert_eq!(config.site.cookie.as_deref(), Some("session=abc"));
        assert_eq!(config.crawler.parallelism, 2);
        assert_eq!(config.crawler.random_delay_ms, 250);
        assert_eq!(config.crawler.queue_capacity, 64);
        assert_eq!(config.extraction.address_strategy, AddressStrategy::Breadcrumb);
        assert_eq!(config.cache.horizon_days, 3);
        assert_eq!(config.cache.ttl_policy, TtlPolicy::Sliding);
        assert_eq!(config.output.partitioning, Partitioning::Flat);
    }

    #[test]
    fn test_defaults_match_reference_deployment() {
        let config = Config::default();
        assert_eq!(config.crawler.parallelism, 4);
        assert_eq!(config.cache.horizon_days, 5);
        assert_eq!(config.cache.ttl_policy, TtlPolicy::SetOnce);
        assert_eq!(
            config.selectors.index_anchor,
            "h2.listing-search-item__title > a[href]"
        );
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_missing_base_url_fails_validation() {
        let file = create_temp_config("[site]\nuser-agent = \"Agent\"\n");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::default();
        config.site.base_url = "https://file.example.com/list".to_string();

        apply_env_overrides(
            &mut config,
            lookup(&[
                (ENV_BASE_URL, "https://env.example.com/list"),
                (ENV_USER_AGENT, "EnvAgent/1.0"),
                (ENV_ALLOWED_DOMAINS, "env.example.com, WWW.Env.Example.com ,"),
                (ENV_COOKIE, "a=1; b=2"),
                (ENV_CACHE_URL, "memory://"),
                (ENV_CACHE_HORIZON_DAYS, "7"),
                (ENV_PARALLELISM, "8"),
            ]),
        )
        .unwrap();

        assert_eq!(config.site.base_url, "https://env.example.com/list");
        assert_eq!(config.site.user_agent, "EnvAgent/1.0");
        assert_eq!(
            config.site.allowed_domains,
            vec!["env.example.com".to_string(), "www.env.example.com".to_string()]
        );
        assert_eq!(config.site.cookie.as_deref(), Some("a=1; b=2"));
        assert_eq!(config.cache.url, "memory://");
        assert_eq!(config.cache.horizon_days, 7);
        assert_eq!(config.crawler.parallelism, 8);
    }

    #[test]
    fn test_env_empty_values_are_ignored() {
        let mut config = Config::default();
        config.site.user_agent = "FileAgent".to_string();

        apply_env_overrides(&mut config, lookup(&[(ENV_USER_AGENT, "  ")])).unwrap();

        assert_eq!(config.site.user_agent, "FileAgent");
    }

    #[test]
    fn test_env_invalid_number() {
        let mut config = Config::default();
        let result = apply_env_overrides(&mut config, lookup(&[(ENV_CACHE_HORIZON_DAYS, "five")]));
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }

    #[test]
    fn test_config_hash_is_stable_and_sensitive() {
        let a = Config::default();
        let mut b = Config::default();

        assert_eq!(compute_config_hash(&a), compute_config_hash(&a));
        assert_eq!(compute_config_hash(&a).len(), 64);

        b.crawler.parallelism = 2;
        assert_ne!(compute_config_hash(&a), compute_config_hash(&b));
    }
}
