use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::{Credentials, Region};
use aws_sdk_dynamodb::error::{DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::Client;
use domain::TodoError;
use shared::Config;
use std::time::Duration;
use tracing::debug;

/// テーブル名と SDK クライアントの組
#[derive(Clone)]
pub struct DynamoDbClient {
    client: Client,
    table_name: String,
}

impl DynamoDbClient {
    /// 設定からクライアントを作成する
    ///
    /// `dynamodb_endpoint` が設定されている場合は DynamoDB Local 向けに固定の認証情報を使う。
    /// 送信リトライは SDK の標準リトライに任せる。
    pub async fn new(config: &Config) -> Self {
        let retry = RetryConfig::standard()
            .with_max_attempts(config.retry_max_attempts.max(1))
            .with_initial_backoff(Duration::from_millis(config.retry_initial_delay_ms));

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .retry_config(retry);

        if let Some(endpoint) = &config.dynamodb_endpoint {
            debug!("DynamoDBエンドポイントを上書き: {}", endpoint);
            loader = loader
                .endpoint_url(endpoint.clone())
                .credentials_provider(Credentials::new("local", "local", None, None, "local"));
        }

        let aws_config = loader.load().await;

        Self {
            client: Client::new(&aws_config),
            table_name: config.dynamodb_table.clone(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// SDK エラーをドメインのエラーに変換する
    pub fn convert_error<E, R>(&self, error: SdkError<E, R>) -> TodoError
    where
        E: std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        TodoError::DynamoDb(DisplayErrorContext(&error).to_string())
    }
}
