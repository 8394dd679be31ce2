use domain::TodoError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ハンドラー層で使用するエラー型
#[derive(Debug, Clone, Error)]
pub enum AppError {
    // ドメインエラー
    #[error("Domain error: {0}")]
    Domain(#[from] domain::DomainError),

    // インフラストラクチャエラー
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // 認証・認可エラー
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("User profile missing")]
    ProfileMissing,

    // ビジネスロジックエラー
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    // システムエラー
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// エラーの分類
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// クライアントエラー（4xx相当）
    Client,
    /// サーバーエラー（5xx相当）
    Server,
}

/// エラーの重要度
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// エラーメタデータ
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
}

impl ErrorMetadata {
    fn client(code: &'static str, severity: ErrorSeverity) -> Self {
        Self {
            code,
            category: ErrorCategory::Client,
            severity,
        }
    }

    fn server(code: &'static str, severity: ErrorSeverity) -> Self {
        Self {
            code,
            category: ErrorCategory::Server,
            severity,
        }
    }
}

impl From<TodoError> for AppError {
    fn from(error: TodoError) -> Self {
        match error {
            TodoError::Validation(msg) => AppError::Validation(msg),
            TodoError::NotFound(msg) => AppError::NotFound(msg),
            TodoError::UserNotFound(msg) => AppError::UserNotFound(msg),
            TodoError::Authentication(msg) => AppError::Authentication(msg),
            TodoError::ProfileMissing => AppError::ProfileMissing,
            TodoError::Conflict(msg) => AppError::AlreadyExists(msg),
            TodoError::DynamoDb(msg) => AppError::DynamoDb(msg),
            TodoError::Internal(msg) => AppError::Internal(msg),
            TodoError::Domain(e) => AppError::Domain(e),
        }
    }
}

impl AppError {
    /// エラーメタデータを取得
    pub fn metadata(&self) -> ErrorMetadata {
        match self {
            // 不正な ID やフィルタ値などはリクエスト側の問題
            AppError::Domain(_) => ErrorMetadata::client("DOMAIN_ERROR", ErrorSeverity::Info),
            AppError::Deserialization(_) => {
                ErrorMetadata::client("INVALID_REQUEST", ErrorSeverity::Info)
            }
            AppError::Validation(_) => {
                ErrorMetadata::client("VALIDATION_ERROR", ErrorSeverity::Info)
            }
            AppError::NotFound(_) => ErrorMetadata::client("NOT_FOUND", ErrorSeverity::Info),
            AppError::UserNotFound(_) => {
                ErrorMetadata::client("USER_NOT_FOUND", ErrorSeverity::Warning)
            }
            AppError::AlreadyExists(_) => {
                ErrorMetadata::client("ALREADY_EXISTS", ErrorSeverity::Info)
            }
            AppError::Authentication(_) => {
                ErrorMetadata::client("AUTHENTICATION_ERROR", ErrorSeverity::Warning)
            }
            AppError::ProfileMissing => {
                ErrorMetadata::client("PROFILE_MISSING", ErrorSeverity::Warning)
            }

            AppError::DynamoDb(_) => ErrorMetadata::server("DYNAMODB_ERROR", ErrorSeverity::Error),
            AppError::Serialization(_) => {
                ErrorMetadata::server("SERIALIZATION_ERROR", ErrorSeverity::Error)
            }
            AppError::Configuration(_) => {
                ErrorMetadata::server("CONFIGURATION_ERROR", ErrorSeverity::Critical)
            }
            AppError::Internal(_) => {
                ErrorMetadata::server("INTERNAL_ERROR", ErrorSeverity::Critical)
            }
        }
    }

    /// HTTPステータスコードを取得
    pub fn http_status_code(&self) -> u16 {
        match self.metadata().category {
            ErrorCategory::Client => match self {
                AppError::NotFound(_) | AppError::UserNotFound(_) => 404,
                AppError::Authentication(_) => 401,
                AppError::ProfileMissing => 403,
                AppError::AlreadyExists(_) => 409,
                _ => 400,
            },
            ErrorCategory::Server => 500,
        }
    }

    /// ユーザー向けメッセージを取得
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotFound(_) => "Todo not found".to_string(),
            AppError::UserNotFound(_) => "User not found".to_string(),
            AppError::Authentication(_) => "Not authenticated".to_string(),
            AppError::ProfileMissing => {
                "User profile missing. Run syncUser first.".to_string()
            }
            AppError::Validation(msg) => msg.clone(),
            AppError::Domain(e) => e.to_string(),
            AppError::Deserialization(_) => "Invalid request body".to_string(),
            AppError::AlreadyExists(_) => "Resource already exists".to_string(),
            _ => "Something went wrong. Please try again later.".to_string(),
        }
    }

    /// 重要度に応じたレベルでログに記録
    pub fn log(&self) {
        let metadata = self.metadata();
        match metadata.severity {
            ErrorSeverity::Critical | ErrorSeverity::Error => {
                tracing::error!(error = %self, code = metadata.code, "request failed");
            }
            ErrorSeverity::Warning => {
                tracing::warn!(error = %self, code = metadata.code, "request rejected");
            }
            ErrorSeverity::Info => {
                tracing::info!(error = %self, code = metadata.code, "request rejected");
            }
        }
    }
}

/// 標準化されたエラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// エラーコード
    pub code: String,
    /// ユーザー向けメッセージ
    pub message: String,
    /// 詳細情報（開発環境のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub request_id: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn from_app_error(error: &AppError, request_id: String, include_details: bool) -> Self {
        Self {
            code: error.metadata().code.to_string(),
            message: error.user_message(),
            details: include_details.then(|| error.to_string()),
            request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
