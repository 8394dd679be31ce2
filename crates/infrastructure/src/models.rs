use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, SecondsFormat, Utc};
use domain::{Todo, TodoError, TodoId, User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// DynamoDB アイテムのエンティティタイプ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    User,
    Todo,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::User => "User",
            EntityType::Todo => "Todo",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "User" => Some(EntityType::User),
            "Todo" => Some(EntityType::Todo),
            _ => None,
        }
    }
}

/// 一覧用 GSI の名前
pub const OWNER_INDEX: &str = "GSI1";

/// DynamoDB Single Table Design のキー構造
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamoDbKeys {
    pub pk: String,               // パーティションキー
    pub sk: String,               // ソートキー
    pub gsi1_pk: Option<String>, // GSI1 パーティションキー（所有者）
    pub gsi1_sk: Option<String>, // GSI1 ソートキー（更新日時）
}

impl DynamoDbKeys {
    /// ユーザープロフィール用のキーを生成
    pub fn for_user(subject: &str) -> Self {
        Self {
            pk: format!("USER#{subject}"),
            sk: "PROFILE".to_string(),
            gsi1_pk: None,
            gsi1_sk: None,
        }
    }

    /// ToDo 本体のキーを生成（GSI1 なし）
    pub fn for_todo_id(todo_id: &TodoId) -> Self {
        Self {
            pk: format!("TODO#{}", todo_id.as_str()),
            sk: "TODO".to_string(),
            gsi1_pk: None,
            gsi1_sk: None,
        }
    }

    /// ToDo 保存用のキーを生成。所有者ごとの一覧を更新日時順に引けるよう GSI1 を付ける。
    pub fn for_todo(todo: &Todo) -> Self {
        Self {
            gsi1_pk: Some(Self::owner_partition(&todo.owner)),
            gsi1_sk: Some(format_timestamp(&todo.updated_at)),
            ..Self::for_todo_id(&todo.id)
        }
    }

    pub fn owner_partition(owner: &UserId) -> String {
        format!("OWNER#{}", owner.as_str())
    }

    /// GetItem / DeleteItem 用の主キー
    pub fn primary_key(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("PK".to_string(), AttributeValue::S(self.pk.clone())),
            ("SK".to_string(), AttributeValue::S(self.sk.clone())),
        ])
    }
}

/// ソートキーとして辞書順と時刻順が一致する形式（ナノ秒・UTC `Z`）
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// DynamoDB アイテムの基本構造
#[derive(Debug, Clone)]
pub struct DynamoDbItem {
    pub keys: DynamoDbKeys,
    pub entity_type: EntityType,
    /// 条件式で参照する所有者（ToDo のみ）
    pub owner: Option<String>,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DynamoDbItem {
    /// DynamoDB AttributeValue マップに変換
    pub fn to_attribute_map(&self) -> HashMap<String, AttributeValue> {
        let mut map = self.keys.primary_key();

        map.insert(
            "EntityType".to_string(),
            AttributeValue::S(self.entity_type.as_str().to_string()),
        );

        if let Some(gsi1_pk) = &self.keys.gsi1_pk {
            map.insert("GSI1PK".to_string(), AttributeValue::S(gsi1_pk.clone()));
        }

        if let Some(gsi1_sk) = &self.keys.gsi1_sk {
            map.insert("GSI1SK".to_string(), AttributeValue::S(gsi1_sk.clone()));
        }

        if let Some(owner) = &self.owner {
            map.insert("Owner".to_string(), AttributeValue::S(owner.clone()));
        }

        map.insert("Data".to_string(), AttributeValue::S(self.data.to_string()));
        map.insert(
            "CreatedAt".to_string(),
            AttributeValue::S(format_timestamp(&self.created_at)),
        );
        map.insert(
            "UpdatedAt".to_string(),
            AttributeValue::S(format_timestamp(&self.updated_at)),
        );

        map
    }

    /// DynamoDB AttributeValue マップから復元
    pub fn from_attribute_map(map: &HashMap<String, AttributeValue>) -> Result<Self, TodoError> {
        let get_s = |key: &str| map.get(key).and_then(|v| v.as_s().ok());
        let missing = |what: &str| TodoError::Internal(format!("Missing or invalid {what}"));

        let pk = get_s("PK").ok_or_else(|| missing("PK"))?.clone();
        let sk = get_s("SK").ok_or_else(|| missing("SK"))?.clone();

        let entity_type = get_s("EntityType")
            .and_then(|s| EntityType::parse(s))
            .ok_or_else(|| missing("EntityType"))?;

        let data_str = get_s("Data").ok_or_else(|| missing("Data"))?;
        let data: serde_json::Value = serde_json::from_str(data_str)
            .map_err(|e| TodoError::Internal(format!("Failed to parse Data JSON: {e}")))?;

        let created_at = get_s("CreatedAt")
            .and_then(|s| parse_timestamp(s))
            .ok_or_else(|| missing("CreatedAt"))?;
        let updated_at = get_s("UpdatedAt")
            .and_then(|s| parse_timestamp(s))
            .ok_or_else(|| missing("UpdatedAt"))?;

        Ok(Self {
            keys: DynamoDbKeys {
                pk,
                sk,
                gsi1_pk: get_s("GSI1PK").cloned(),
                gsi1_sk: get_s("GSI1SK").cloned(),
            },
            entity_type,
            owner: get_s("Owner").cloned(),
            data,
            created_at,
            updated_at,
        })
    }

    fn expect_entity(&self, expected: EntityType) -> Result<(), TodoError> {
        if self.entity_type != expected {
            return Err(TodoError::Internal(format!(
                "Item {} is not a {}",
                self.keys.pk,
                expected.as_str()
            )));
        }
        Ok(())
    }
}

/// ToDo 用のDynamoDBアイテム
#[derive(Debug, Clone)]
pub struct TodoItem {
    pub todo: Todo,
}

impl TodoItem {
    pub fn new(todo: Todo) -> Self {
        Self { todo }
    }

    /// DynamoDbItem に変換
    pub fn to_dynamodb_item(&self) -> Result<DynamoDbItem, TodoError> {
        let data = serde_json::to_value(&self.todo)
            .map_err(|e| TodoError::Internal(format!("Failed to serialize todo: {e}")))?;

        Ok(DynamoDbItem {
            keys: DynamoDbKeys::for_todo(&self.todo),
            entity_type: EntityType::Todo,
            owner: Some(self.todo.owner.as_str().to_string()),
            data,
            created_at: self.todo.created_at,
            updated_at: self.todo.updated_at,
        })
    }

    /// DynamoDbItem から復元
    pub fn from_dynamodb_item(item: &DynamoDbItem) -> Result<Self, TodoError> {
        item.expect_entity(EntityType::Todo)?;

        let todo: Todo = serde_json::from_value(item.data.clone())
            .map_err(|e| TodoError::Internal(format!("Failed to deserialize todo: {e}")))?;

        Ok(Self::new(todo))
    }
}

/// ユーザー用のDynamoDBアイテム
#[derive(Debug, Clone)]
pub struct UserItem {
    pub user: User,
}

impl UserItem {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    /// DynamoDbItem に変換
    pub fn to_dynamodb_item(&self) -> Result<DynamoDbItem, TodoError> {
        let data = serde_json::to_value(&self.user)
            .map_err(|e| TodoError::Internal(format!("Failed to serialize user: {e}")))?;

        Ok(DynamoDbItem {
            keys: DynamoDbKeys::for_user(&self.user.subject),
            entity_type: EntityType::User,
            owner: None,
            data,
            created_at: self.user.created_at,
            updated_at: self.user.updated_at,
        })
    }

    /// DynamoDbItem から復元
    pub fn from_dynamodb_item(item: &DynamoDbItem) -> Result<Self, TodoError> {
        item.expect_entity(EntityType::User)?;

        let user: User = serde_json::from_value(item.data.clone())
            .map_err(|e| TodoError::Internal(format!("Failed to deserialize user: {e}")))?;

        Ok(Self::new(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use domain::{Identity, NewTodo};

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn sample_todo() -> Todo {
        Todo::create(
            UserId::from_string("owner_1".to_string()).unwrap(),
            NewTodo {
                title: "Buy milk".to_string(),
                description: Some("2 liters".to_string()),
                priority: None,
            },
            at(1_700_000_000_000),
        )
        .unwrap()
    }

    #[test]
    fn test_todo_keys() {
        let todo = sample_todo();
        let keys = DynamoDbKeys::for_todo(&todo);

        assert_eq!(keys.pk, format!("TODO#{}", todo.id));
        assert_eq!(keys.sk, "TODO");
        assert_eq!(keys.gsi1_pk.as_deref(), Some("OWNER#owner_1"));
        assert_eq!(
            keys.gsi1_sk.as_deref(),
            Some("2023-11-14T22:13:20.000000000Z")
        );
    }

    #[test]
    fn test_user_keys() {
        let keys = DynamoDbKeys::for_user("user_123");
        assert_eq!(keys.pk, "USER#user_123");
        assert_eq!(keys.sk, "PROFILE");
        assert!(keys.gsi1_pk.is_none());
    }

    #[test]
    fn test_timestamp_format_sorts_lexicographically() {
        let earlier = format_timestamp(&at(1_700_000_000_999));
        let later = format_timestamp(&at(1_700_000_001_000));
        assert!(earlier < later);
    }

    #[test]
    fn test_todo_item_attribute_map() {
        let todo = sample_todo();
        let map = TodoItem::new(todo.clone())
            .to_dynamodb_item()
            .unwrap()
            .to_attribute_map();

        assert_eq!(map.get("EntityType").unwrap().as_s().unwrap(), "Todo");
        assert_eq!(map.get("Owner").unwrap().as_s().unwrap(), "owner_1");
        assert!(map.contains_key("GSI1PK"));

        let restored = DynamoDbItem::from_attribute_map(&map).unwrap();
        let restored = TodoItem::from_dynamodb_item(&restored).unwrap();
        assert_eq!(restored.todo, todo);
    }

    #[test]
    fn test_entity_type_mismatch_is_rejected() {
        let identity = Identity {
            subject: Some("user_123".to_string()),
            ..Default::default()
        };
        let user = User::from_identity("user_123".to_string(), &identity, at(0));
        let item = UserItem::new(user).to_dynamodb_item().unwrap();

        assert!(matches!(
            TodoItem::from_dynamodb_item(&item),
            Err(TodoError::Internal(_))
        ));
    }

    #[test]
    fn test_missing_data_is_an_error() {
        let map = DynamoDbKeys::for_user("user_123").primary_key();
        assert!(DynamoDbItem::from_attribute_map(&map).is_err());
    }
}
