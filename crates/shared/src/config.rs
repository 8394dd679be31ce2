use crate::errors::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub dynamodb_table: String,
    pub environment: String,
    pub aws_region: String,
    /// DynamoDB Local などのエンドポイント上書き
    pub dynamodb_endpoint: Option<String>,
    /// AWS SDK の送信リトライ回数
    pub retry_max_attempts: u32,
    pub retry_initial_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dynamodb_table: "todo-starter-dev".to_string(),
            environment: "dev".to_string(),
            aws_region: "ap-northeast-1".to_string(),
            dynamodb_endpoint: None,
            retry_max_attempts: 3,
            retry_initial_delay_ms: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意のキー参照関数から設定を組み立てる（テストで環境変数を汚さないため）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        Ok(Config {
            dynamodb_table: lookup("DYNAMODB_TABLE").unwrap_or(defaults.dynamodb_table),
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
            aws_region: lookup("AWS_REGION").unwrap_or(defaults.aws_region),
            dynamodb_endpoint: lookup("DYNAMODB_ENDPOINT").filter(|s| !s.is_empty()),
            retry_max_attempts: parse_or(
                lookup("RETRY_MAX_ATTEMPTS"),
                "RETRY_MAX_ATTEMPTS",
                defaults.retry_max_attempts,
            )?,
            retry_initial_delay_ms: parse_or(
                lookup("RETRY_INITIAL_DELAY_MS"),
                "RETRY_INITIAL_DELAY_MS",
                defaults.retry_initial_delay_ms,
            )?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "prod"
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::Configuration(format!("{key} must be a number: {raw}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.dynamodb_table, "todo-starter-dev");
        assert_eq!(config.environment, "dev");
        assert_eq!(config.dynamodb_endpoint, None);
        assert_eq!(config.retry_max_attempts, 3);
    }

    #[test]
    fn test_values_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("DYNAMODB_TABLE", "todos-prod"),
            ("ENVIRONMENT", "prod"),
            ("DYNAMODB_ENDPOINT", "http://localhost:8000"),
            ("RETRY_MAX_ATTEMPTS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.dynamodb_table, "todos-prod");
        assert!(config.is_production());
        assert_eq!(
            config.dynamodb_endpoint.as_deref(),
            Some("http://localhost:8000")
        );
        assert_eq!(config.retry_max_attempts, 5);
    }

    #[test]
    fn test_invalid_number_is_configuration_error() {
        let result = Config::from_lookup(lookup_from(&[("RETRY_MAX_ATTEMPTS", "many")]));
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
