use crate::repositories::UserRepository;
use domain::{Caller, Clock, Identity, TodoError, User, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 呼び出し元とローカルユーザーの対応付け
#[derive(Clone)]
pub struct ViewerService {
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl ViewerService {
    pub fn new(users: Arc<dyn UserRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { users, clock }
    }

    /// 呼び出し元に対応するユーザーを返す。匿名・subject なし・未同期なら `None`。
    pub async fn resolve_viewer(&self, caller: &Caller) -> Result<Option<User>, TodoError> {
        let Some(subject) = caller.subject_key() else {
            return Ok(None);
        };

        let user = self.users.find_by_subject(subject).await?;
        if user.is_none() {
            debug!("ユーザーが未同期です: subject={}", subject);
        }
        Ok(user)
    }

    /// 変更系操作の呼び出し元ユーザーを返す
    ///
    /// 匿名・subject なしは `Authentication`、未同期は `ProfileMissing`。
    pub async fn require_viewer(&self, caller: &Caller) -> Result<User, TodoError> {
        let Some(subject) = caller.subject_key() else {
            return Err(TodoError::Authentication("Not authenticated".to_string()));
        };

        self.users
            .find_by_subject(subject)
            .await?
            .ok_or(TodoError::ProfileMissing)
    }

    /// 外部 ID のプロフィールをローカルユーザーに反映する（初回は作成）
    pub async fn sync_viewer(&self, caller: &Caller) -> Result<UserId, TodoError> {
        let identity = caller
            .identity()
            .ok_or_else(|| TodoError::Authentication("Not authenticated".to_string()))?;
        let subject = identity
            .subject_key()
            .ok_or_else(|| TodoError::Authentication("Missing identity subject".to_string()))?;

        if let Some(existing) = self.users.find_by_subject(subject).await? {
            return self.refresh(existing, identity).await;
        }

        let user = User::from_identity(subject.to_string(), identity, self.clock.now());
        match self.users.insert(&user).await {
            Ok(()) => {
                info!("ユーザーを作成しました: user_id={}, subject={}", user.id, subject);
                Ok(user.id)
            }
            Err(TodoError::Conflict(_)) => {
                // 同時に初回同期が走った場合は既存レコードの更新に切り替える
                warn!("ユーザー作成が競合しました: subject={}", subject);
                let existing = self
                    .users
                    .find_by_subject(subject)
                    .await?
                    .ok_or_else(|| {
                        TodoError::Internal(format!("user {subject} vanished after conflict"))
                    })?;
                self.refresh(existing, identity).await
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh(&self, mut user: User, identity: &Identity) -> Result<UserId, TodoError> {
        user.refresh_profile(identity, self.clock.now());
        self.users.update_profile(&user).await?;
        debug!("ユーザープロフィールを更新しました: user_id={}", user.id);
        Ok(user.id)
    }
}
