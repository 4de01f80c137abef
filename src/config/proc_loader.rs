use std::path::Path;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tracing::debug;

use crate::config::proc_validator;
use crate::config::settings::LoggingConfig;
use crate::config::types::ServiceConfig;

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read config file {}", path.display()))?;

    let expanded = expand_env_vars(&content)?;
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<ServiceConfig> {
    let mut service_config: ServiceConfig =
        serde_yaml::from_str(&content).context("cannot parse config")?;

    // Apply defaults
    if service_config.settings.logging.is_none() {
        service_config.settings.logging = Some(LoggingConfig::default());
    }

    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config)
        .await
        .map_err(|errors| {
            anyhow!(
                "config is not valid, total errors: {}\n{}",
                errors.len(),
                errors.join("\n")
            )
        })?;

    Ok(service_config)
}

/// Replaces `${VAR}` and `${VAR:default}` with environment values.
fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}")?;
    let expanded = re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    });
    Ok(expanded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::LogFormat;
    use crate::config::types::StoreConfig;
    use serial_test::serial;
    use std::io::Write;
    use std::path::PathBuf;

    const MINIMAL: &str = r#"
feed:
  username: agent
  password: secret
  data_feed_id: FeedA
  version: v10
"#;

    #[tokio::test]
    async fn minimal_config_gets_defaults() {
        let cfg = parse_config(MINIMAL.to_owned()).await.unwrap();

        assert_eq!(cfg.feed.base_url, "http://webservices.vebra.com");
        assert_eq!(cfg.settings.token_ttl_seconds, 3600);
        assert_eq!(cfg.settings.http.connect_timeout_ms, 5000);
        assert_eq!(
            cfg.store,
            StoreConfig::File { path: PathBuf::from("tokens.jsonl") }
        );
        let logging = cfg.settings.logging.unwrap();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, LogFormat::Compact);
    }

    #[tokio::test]
    async fn full_config_is_parsed() {
        let yaml = r#"
feed:
  base_url: https://feed.example.com/
  username: agent
  password: secret
  data_feed_id: FeedA
  version: v10
  handshake_dump_path: headers.txt
settings:
  token_ttl_seconds: 1800
  http:
    connect_timeout_ms: 100
    request_timeout_ms: 2000
  retry:
    attempts: 2
    base_delay_ms: 10
    max_delay_ms: 20
  logging:
    level: debug
    format: json
store:
  kind: memory
"#;
        let cfg = parse_config(yaml.to_owned()).await.unwrap();
        assert_eq!(cfg.settings.token_ttl_seconds, 1800);
        assert_eq!(cfg.settings.http.request_timeout_ms, 2000);
        assert_eq!(cfg.settings.retry.unwrap().attempts(), 2);
        assert_eq!(cfg.store, StoreConfig::Memory);
        assert_eq!(cfg.feed.handshake_dump_path, Some(PathBuf::from("headers.txt")));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let yaml = MINIMAL.replace("username: agent", "username: \"\"");
        let err = parse_config(yaml).await.unwrap_err();
        assert!(err.to_string().contains("feed.username"));
    }

    #[tokio::test]
    async fn every_validation_issue_is_in_the_returned_error() {
        let yaml = MINIMAL.replace("username: agent", "username: \"\"")
            + "settings:\n  token_ttl_seconds: 18446744073709551615\n";
        let message = parse_config(yaml).await.unwrap_err().to_string();

        assert!(message.contains("total errors: 2"), "{message}");
        assert!(message.contains("feed.username"), "{message}");
        assert!(message.contains("settings.token_ttl_seconds"), "{message}");
    }

    #[tokio::test]
    #[serial]
    async fn env_vars_are_expanded_from_file() {
        std::env::set_var("ESTATE_FEED_TEST_PASSWORD", "from-env");
        std::env::remove_var("ESTATE_FEED_TEST_VERSION");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            MINIMAL
                .replace("password: secret", "password: ${ESTATE_FEED_TEST_PASSWORD}")
                .replace("version: v10", "version: ${ESTATE_FEED_TEST_VERSION:v11}")
        )
        .unwrap();

        let cfg = file_to_config(file.path()).await.unwrap();
        assert_eq!(cfg.feed.password, "from-env");
        assert_eq!(cfg.feed.version, "v11");

        std::env::remove_var("ESTATE_FEED_TEST_PASSWORD");
    }
}
