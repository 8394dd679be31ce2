use crate::errors::{DomainError, TodoError};
use crate::user::UserId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ToDo ID（ULID）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// 文字列から TodoId を作成（ULID 形式のみ受け付ける）
    pub fn from_string(id: String) -> Result<Self, DomainError> {
        ulid::Ulid::from_string(&id)
            .map_err(|e| DomainError::InvalidTodoId(format!("{id}: {e}")))?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TodoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 優先度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(DomainError::InvalidPriority(other.to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ToDo 作成の入力
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
}

/// ToDo 編集の入力
///
/// `description` に空文字（トリム後）を渡すと説明を削除する。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub owner: UserId,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    /// 入力を検証して新しい ToDo を生成する
    pub fn create(owner: UserId, input: NewTodo, now: DateTime<Utc>) -> Result<Self, TodoError> {
        let title = normalize_title(&input.title)?;

        Ok(Self {
            id: TodoId::new(),
            owner,
            title,
            description: normalize_description(input.description.as_deref()),
            priority: input.priority.unwrap_or_default(),
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner == user_id
    }

    /// 完了フラグを反転する
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.completed = !self.completed;
        self.touch(now);
    }

    /// 編集内容を適用する。検証に失敗した場合は何も変更しない。
    pub fn apply_patch(&mut self, patch: TodoPatch, now: DateTime<Utc>) -> Result<(), TodoError> {
        let title = patch.title.as_deref().map(normalize_title).transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = patch.description.as_deref() {
            self.description = normalize_description(Some(description));
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        self.touch(now);
        Ok(())
    }

    /// `updated_at` を更新する。時計が進んでいなくても必ず前回値より大きくなる。
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::milliseconds(1)
        };
    }
}

fn normalize_title(title: &str) -> Result<String, TodoError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TodoError::Validation("Title is required".to_string()));
    }
    Ok(title.to_string())
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}
