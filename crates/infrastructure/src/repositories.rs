use crate::models::{DynamoDbItem, DynamoDbKeys, TodoItem, UserItem, OWNER_INDEX};
use crate::DynamoDbClient;
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use domain::{Todo, TodoError, TodoId, User, UserId};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// ToDo の永続化
#[async_trait]
pub trait TodoRepository: Send + Sync {
    async fn get(&self, id: &TodoId) -> Result<Option<Todo>, TodoError>;

    /// 所有者の ToDo を `updated_at` の降順で返す
    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Todo>, TodoError>;

    /// 新規保存。同じ ID が既にあれば `Conflict`。
    async fn insert(&self, todo: &Todo) -> Result<(), TodoError>;

    /// 既存 ToDo の上書き。存在しない、または所有者が異なれば `NotFound`。
    async fn update(&self, todo: &Todo) -> Result<(), TodoError>;

    /// 削除。存在しなければ `NotFound`。
    async fn delete(&self, id: &TodoId) -> Result<(), TodoError>;
}

/// ユーザーの永続化。subject ごとに高々1件。
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<User>, TodoError>;

    /// 新規保存。同じ subject が既にあれば `Conflict`。
    async fn insert(&self, user: &User) -> Result<(), TodoError>;

    /// プロフィール項目の上書き。存在しなければ `UserNotFound`。
    async fn update_profile(&self, user: &User) -> Result<(), TodoError>;
}

/// DynamoDB 上の ToDo リポジトリ
#[derive(Clone)]
pub struct DynamoTodoRepository {
    db: DynamoDbClient,
}

impl DynamoTodoRepository {
    pub fn new(db: DynamoDbClient) -> Self {
        Self { db }
    }

    /// 条件付きで保存する。`owner` を渡すと `#owner` / `:owner` を束縛する。
    async fn put(
        &self,
        todo: &Todo,
        condition: &str,
        owner: Option<&UserId>,
    ) -> Result<(), TodoError> {
        let item = TodoItem::new(todo.clone())
            .to_dynamodb_item()?
            .to_attribute_map();

        let mut request = self
            .db
            .client()
            .put_item()
            .table_name(self.db.table_name())
            .set_item(Some(item))
            .condition_expression(condition);

        if let Some(owner) = owner {
            request = request
                .expression_attribute_names("#owner", "Owner")
                .expression_attribute_values(
                    ":owner",
                    AttributeValue::S(owner.as_str().to_string()),
                );
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let conditional = e
                    .as_service_error()
                    .map(|se| se.is_conditional_check_failed_exception())
                    .unwrap_or(false);
                if conditional {
                    Err(TodoError::Conflict(todo.id.to_string()))
                } else {
                    Err(self.db.convert_error(e))
                }
            }
        }
    }
}

#[async_trait]
impl TodoRepository for DynamoTodoRepository {
    async fn get(&self, id: &TodoId) -> Result<Option<Todo>, TodoError> {
        debug!("ToDoを取得中: todo_id={}", id);

        let result = self
            .db
            .client()
            .get_item()
            .table_name(self.db.table_name())
            .set_key(Some(DynamoDbKeys::for_todo_id(id).primary_key()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| self.db.convert_error(e))?;

        match result.item {
            Some(item) => {
                let item = DynamoDbItem::from_attribute_map(&item)?;
                Ok(Some(TodoItem::from_dynamodb_item(&item)?.todo))
            }
            None => Ok(None),
        }
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Todo>, TodoError> {
        info!("ToDo一覧を取得中: owner={}", owner);

        let mut todos = Vec::new();
        let mut exclusive_start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let result = self
                .db
                .client()
                .query()
                .table_name(self.db.table_name())
                .index_name(OWNER_INDEX)
                .key_condition_expression("GSI1PK = :pk")
                .expression_attribute_values(
                    ":pk",
                    AttributeValue::S(DynamoDbKeys::owner_partition(owner)),
                )
                .scan_index_forward(false)
                .set_exclusive_start_key(exclusive_start_key.take())
                .send()
                .await
                .map_err(|e| self.db.convert_error(e))?;

            for item in result.items.unwrap_or_default() {
                let item = DynamoDbItem::from_attribute_map(&item)?;
                todos.push(TodoItem::from_dynamodb_item(&item)?.todo);
            }

            match result.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        // GSI1SK と同じ順序を保証する
        todos.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        debug!("ToDo一覧取得完了: {} 件", todos.len());
        Ok(todos)
    }

    async fn insert(&self, todo: &Todo) -> Result<(), TodoError> {
        info!("ToDoを保存中: todo_id={}, owner={}", todo.id, todo.owner);
        self.put(todo, "attribute_not_exists(PK)", None).await?;
        debug!("ToDo保存完了: {}", todo.id);
        Ok(())
    }

    async fn update(&self, todo: &Todo) -> Result<(), TodoError> {
        info!("ToDoを更新中: todo_id={}", todo.id);
        match self
            .put(
                todo,
                "attribute_exists(PK) AND #owner = :owner",
                Some(&todo.owner),
            )
            .await
        {
            Err(TodoError::Conflict(_)) => {
                warn!("更新対象のToDoが存在しません: todo_id={}", todo.id);
                Err(TodoError::todo_not_found(&todo.id))
            }
            other => other,
        }
    }

    async fn delete(&self, id: &TodoId) -> Result<(), TodoError> {
        info!("ToDoを削除中: todo_id={}", id);

        let result = self
            .db
            .client()
            .delete_item()
            .table_name(self.db.table_name())
            .set_key(Some(DynamoDbKeys::for_todo_id(id).primary_key()))
            .condition_expression("attribute_exists(PK)")
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!("ToDo削除完了: todo_id={}", id);
                Ok(())
            }
            Err(e) => {
                let conditional = e
                    .as_service_error()
                    .map(|se| se.is_conditional_check_failed_exception())
                    .unwrap_or(false);
                if conditional {
                    Err(TodoError::todo_not_found(id))
                } else {
                    Err(self.db.convert_error(e))
                }
            }
        }
    }
}

/// DynamoDB 上のユーザーリポジトリ
#[derive(Clone)]
pub struct DynamoUserRepository {
    db: DynamoDbClient,
}

impl DynamoUserRepository {
    pub fn new(db: DynamoDbClient) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for DynamoUserRepository {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<User>, TodoError> {
        debug!("ユーザーを取得中: subject={}", subject);

        let result = self
            .db
            .client()
            .get_item()
            .table_name(self.db.table_name())
            .set_key(Some(DynamoDbKeys::for_user(subject).primary_key()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| self.db.convert_error(e))?;

        match result.item {
            Some(item) => {
                let item = DynamoDbItem::from_attribute_map(&item)?;
                Ok(Some(UserItem::from_dynamodb_item(&item)?.user))
            }
            None => Ok(None),
        }
    }

    async fn insert(&self, user: &User) -> Result<(), TodoError> {
        info!("ユーザーを作成中: user_id={}, subject={}", user.id, user.subject);

        let item = UserItem::new(user.clone())
            .to_dynamodb_item()?
            .to_attribute_map();

        let result = self
            .db
            .client()
            .put_item()
            .table_name(self.db.table_name())
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(PK)")
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!("ユーザー作成完了: {}", user.id);
                Ok(())
            }
            Err(e) => {
                let conditional = e
                    .as_service_error()
                    .map(|se| se.is_conditional_check_failed_exception())
                    .unwrap_or(false);
                if conditional {
                    Err(TodoError::Conflict(format!("USER#{}", user.subject)))
                } else {
                    Err(self.db.convert_error(e))
                }
            }
        }
    }

    async fn update_profile(&self, user: &User) -> Result<(), TodoError> {
        info!("ユーザープロフィールを更新中: user_id={}", user.id);

        let item = UserItem::new(user.clone())
            .to_dynamodb_item()?
            .to_attribute_map();

        let result = self
            .db
            .client()
            .put_item()
            .table_name(self.db.table_name())
            .set_item(Some(item))
            .condition_expression("attribute_exists(PK)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let conditional = e
                    .as_service_error()
                    .map(|se| se.is_conditional_check_failed_exception())
                    .unwrap_or(false);
                if conditional {
                    Err(TodoError::UserNotFound(user.subject.clone()))
                } else {
                    Err(self.db.convert_error(e))
                }
            }
        }
    }
}
