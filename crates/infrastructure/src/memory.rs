use crate::repositories::{TodoRepository, UserRepository};
use async_trait::async_trait;
use domain::{Todo, TodoError, TodoId, User, UserId};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// プロセス内メモリの ToDo リポジトリ（ローカル実行・テスト用）
#[derive(Debug, Default)]
pub struct InMemoryTodoRepository {
    todos: RwLock<HashMap<TodoId, Todo>>,
}

impl InMemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    async fn get(&self, id: &TodoId) -> Result<Option<Todo>, TodoError> {
        Ok(self.todos.read().await.get(id).cloned())
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Todo>, TodoError> {
        let mut todos: Vec<Todo> = self
            .todos
            .read()
            .await
            .values()
            .filter(|todo| todo.is_owned_by(owner))
            .cloned()
            .collect();
        todos.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(todos)
    }

    async fn insert(&self, todo: &Todo) -> Result<(), TodoError> {
        let mut todos = self.todos.write().await;
        if todos.contains_key(&todo.id) {
            return Err(TodoError::Conflict(todo.id.to_string()));
        }
        todos.insert(todo.id.clone(), todo.clone());
        Ok(())
    }

    async fn update(&self, todo: &Todo) -> Result<(), TodoError> {
        let mut todos = self.todos.write().await;
        match todos.get_mut(&todo.id) {
            Some(existing) if existing.owner == todo.owner => {
                *existing = todo.clone();
                Ok(())
            }
            _ => Err(TodoError::todo_not_found(&todo.id)),
        }
    }

    async fn delete(&self, id: &TodoId) -> Result<(), TodoError> {
        self.todos
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| TodoError::todo_not_found(id))
    }
}

/// プロセス内メモリのユーザーリポジトリ。subject をキーに持つ。
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<User>, TodoError> {
        Ok(self.users.read().await.get(subject).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), TodoError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.subject) {
            return Err(TodoError::Conflict(format!("USER#{}", user.subject)));
        }
        users.insert(user.subject.clone(), user.clone());
        Ok(())
    }

    async fn update_profile(&self, user: &User) -> Result<(), TodoError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.subject) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(TodoError::UserNotFound(user.subject.clone())),
        }
    }
}
