use domain::{Caller, Identity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// API Gateway の JWT オーソライザーが渡すクレーム
///
/// トークン自体は外部 ID プロバイダーとゲートウェイが検証済み。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub iss: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
}

impl Claims {
    /// クレームマップから抽出する。値は文字列のみ受け付け、空文字は未設定として扱う。
    pub fn from_map(claims: &HashMap<String, Value>) -> Self {
        let get = |key: &str| {
            claims
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            sub: get("sub"),
            iss: get("iss"),
            name: get("name"),
            email: get("email"),
            picture: get("picture"),
        }
    }

    pub fn into_identity(self) -> Identity {
        let token_identifier = match (&self.iss, &self.sub) {
            (Some(iss), Some(sub)) => format!("{iss}|{sub}"),
            (None, Some(sub)) => sub.clone(),
            _ => String::new(),
        };

        Identity {
            subject: self.sub,
            token_identifier,
            name: self.name,
            email: self.email,
            picture_url: self.picture,
        }
    }
}

/// オーソライザーのクレームから呼び出し元を組み立てる。クレームが無ければ匿名。
pub fn caller_from_claims(claims: Option<&HashMap<String, Value>>) -> Caller {
    match claims {
        Some(map) if !map.is_empty() => {
            Caller::Authenticated(Claims::from_map(map).into_identity())
        }
        _ => Caller::Anonymous,
    }
}
