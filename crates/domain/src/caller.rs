use serde::{Deserialize, Serialize};

/// 外部 ID プロバイダーから渡されるクレーム
///
/// トークンの検証はゲートウェイ側の責務で、ここに届く時点で検証済みとして扱う。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject: Option<String>,
    /// `{issuer}|{subject}` 形式の識別子
    pub token_identifier: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture_url: Option<String>,
}

impl Identity {
    /// ユーザー検索に使うキー。subject が空なら token_identifier にフォールバックする。
    pub fn subject_key(&self) -> Option<&str> {
        self.subject
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(Some(self.token_identifier.as_str()))
            .filter(|s| !s.is_empty())
    }

    /// 表示名: name → メールのローカル部 → "User"
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }

        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or("User")
            .to_string()
    }
}

/// サービス呼び出し元
///
/// 実行環境のアンビエントな認証コンテキストではなく、各呼び出しに明示的に渡す。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Caller {
    Authenticated(Identity),
    #[default]
    Anonymous,
}

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Caller::Authenticated(identity) => Some(identity),
            Caller::Anonymous => None,
        }
    }

    pub fn subject_key(&self) -> Option<&str> {
        self.identity().and_then(Identity::subject_key)
    }
}
