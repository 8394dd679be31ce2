use crate::todo::TodoId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Invalid TodoId: {0}")]
    InvalidTodoId(String),

    #[error("Invalid UserId: {0}")]
    InvalidUserId(String),

    #[error("Invalid priority: {0}")]
    InvalidPriority(String),

    #[error("Invalid status filter: {0}")]
    InvalidStatus(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Todo not found: {0}")]
    NotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    /// 外部 ID は存在するがローカルのユーザーレコードが未作成
    #[error("User profile missing. Run syncUser first.")]
    ProfileMissing,

    /// 条件付き書き込みの競合（既に存在するキーへの insert など）
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("DynamoDB error: {0}")]
    DynamoDb(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl TodoError {
    /// 存在しない / 他人の ToDo を区別せずに返すための共通エラー
    pub fn todo_not_found(id: &TodoId) -> Self {
        TodoError::NotFound(id.to_string())
    }
}
