use crate::caller::Identity;
use crate::errors::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ユーザーID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// 新しいユーザーIDを生成
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// 文字列からユーザーIDを作成
    pub fn from_string(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidUserId(
                "User ID cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 外部 ID プロバイダーの subject に対応するローカルユーザー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// 外部 ID の subject（一意）
    pub subject: String,
    pub name: String,
    pub email: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// 初回同期時のユーザーを生成
    pub fn from_identity(subject: String, identity: &Identity, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            subject,
            name: identity.display_name(),
            email: identity.email.clone(),
            image: identity.picture_url.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 2回目以降の同期でプロフィール項目を上書きする
    pub fn refresh_profile(&mut self, identity: &Identity, now: DateTime<Utc>) {
        self.name = identity.display_name();
        self.email = identity.email.clone();
        self.image = identity.picture_url.clone();
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn identity() -> Identity {
        Identity {
            subject: Some("user_2abc".to_string()),
            token_identifier: "https://issuer.example|user_2abc".to_string(),
            name: Some("Ada Lovelace".to_string()),
            email: Some("ada@example.com".to_string()),
            picture_url: Some("https://img.example/ada.png".to_string()),
        }
    }

    #[test]
    fn test_user_id_from_string() {
        assert_eq!(
            UserId::from_string("u-1".to_string()).unwrap().as_str(),
            "u-1"
        );
        assert!(UserId::from_string(String::new()).is_err());
    }

    #[test]
    fn test_from_identity_copies_profile() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let user = User::from_identity("user_2abc".to_string(), &identity(), now);

        assert_eq!(user.subject, "user_2abc");
        assert_eq!(user.name, "Ada Lovelace");
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert_eq!(user.image.as_deref(), Some("https://img.example/ada.png"));
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_refresh_profile_keeps_identity_fields() {
        let created = Utc.timestamp_millis_opt(1_000).unwrap();
        let later = Utc.timestamp_millis_opt(2_000).unwrap();
        let mut user = User::from_identity("user_2abc".to_string(), &identity(), created);
        let id = user.id.clone();

        let mut changed = identity();
        changed.name = None;
        changed.picture_url = None;
        user.refresh_profile(&changed, later);

        assert_eq!(user.id, id);
        assert_eq!(user.name, "ada");
        assert_eq!(user.image, None);
        assert_eq!(user.created_at, created);
        assert_eq!(user.updated_at, later);
    }
}
