use crate::errors::DomainError;
use crate::todo::Todo;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 一覧取得時の完了状態フィルタ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn matches(&self, todo: &Todo) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !todo.completed,
            StatusFilter::Completed => todo.completed,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "completed" => Ok(StatusFilter::Completed),
            other => Err(DomainError::InvalidStatus(other.to_string())),
        }
    }
}

/// 一覧取得の条件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoFilter {
    #[serde(default)]
    pub status: StatusFilter,
    pub search: Option<String>,
}

impl TodoFilter {
    pub fn new(status: StatusFilter, search: Option<String>) -> Self {
        Self { status, search }
    }

    /// 正規化済みの検索語。空なら None。
    fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
    }

    pub fn matches(&self, todo: &Todo) -> bool {
        self.status.matches(todo) && matches_search(todo, self.needle().as_deref())
    }

    /// フィルタを適用し、`updated_at` の降順に並べる
    pub fn apply(&self, todos: Vec<Todo>) -> Vec<Todo> {
        let needle = self.needle();
        let mut todos: Vec<Todo> = todos
            .into_iter()
            .filter(|todo| self.status.matches(todo) && matches_search(todo, needle.as_deref()))
            .collect();
        todos.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        todos
    }
}

fn matches_search(todo: &Todo, needle: Option<&str>) -> bool {
    let Some(needle) = needle else {
        return true;
    };
    let haystack = format!(
        "{} {}",
        todo.title,
        todo.description.as_deref().unwrap_or_default()
    )
    .to_lowercase();
    haystack.contains(needle)
}
