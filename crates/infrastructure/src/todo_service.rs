use crate::dynamodb::DynamoDbClient;
use crate::repositories::{DynamoTodoRepository, DynamoUserRepository, TodoRepository};
use crate::viewer_service::ViewerService;
use domain::{
    Caller, Clock, NewTodo, SystemClock, Todo, TodoError, TodoFilter, TodoId, TodoPatch, User,
};
use shared::Config;
use std::sync::Arc;
use tracing::{debug, info};

/// 呼び出し元のユーザーに限定した ToDo 操作
#[derive(Clone)]
pub struct TodoService {
    todos: Arc<dyn TodoRepository>,
    viewers: ViewerService,
    clock: Arc<dyn Clock>,
}

impl TodoService {
    pub fn new(
        todos: Arc<dyn TodoRepository>,
        viewers: ViewerService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            todos,
            viewers,
            clock,
        }
    }

    /// DynamoDB とシステム時計で組み立てる
    pub async fn connect(config: &Config) -> Self {
        let db = DynamoDbClient::new(config).await;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let viewers = ViewerService::new(
            Arc::new(DynamoUserRepository::new(db.clone())),
            clock.clone(),
        );
        Self::new(Arc::new(DynamoTodoRepository::new(db)), viewers, clock)
    }

    pub fn viewers(&self) -> &ViewerService {
        &self.viewers
    }

    /// 自分の ToDo 一覧。ユーザーが解決できなければ空。
    pub async fn list(&self, caller: &Caller, filter: &TodoFilter) -> Result<Vec<Todo>, TodoError> {
        let Some(viewer) = self.viewers.resolve_viewer(caller).await? else {
            debug!("ユーザー未解決のため空の一覧を返します");
            return Ok(Vec::new());
        };

        let todos = self.todos.list_by_owner(&viewer.id).await?;
        let todos = filter.apply(todos);

        debug!(
            "ToDo一覧: user_id={}, status={:?}, count={}",
            viewer.id,
            filter.status,
            todos.len()
        );
        Ok(todos)
    }

    /// 自分の ToDo を1件取得する
    pub async fn get(&self, caller: &Caller, id: &TodoId) -> Result<Todo, TodoError> {
        let viewer = self
            .viewers
            .resolve_viewer(caller)
            .await?
            .ok_or_else(|| TodoError::todo_not_found(id))?;

        self.load_owned(&viewer, id).await
    }

    pub async fn create(&self, caller: &Caller, input: NewTodo) -> Result<TodoId, TodoError> {
        let viewer = self.viewers.require_viewer(caller).await?;
        let todo = Todo::create(viewer.id.clone(), input, self.clock.now())?;

        self.todos.insert(&todo).await?;

        info!("ToDo作成: todo_id={}, user_id={}", todo.id, viewer.id);
        Ok(todo.id)
    }

    /// 完了状態を反転する
    pub async fn toggle(&self, caller: &Caller, id: &TodoId) -> Result<Todo, TodoError> {
        let viewer = self.viewers.require_viewer(caller).await?;
        let mut todo = self.load_owned(&viewer, id).await?;

        todo.toggle(self.clock.now());
        self.todos.update(&todo).await?;

        info!("ToDo完了状態変更: todo_id={}, completed={}", todo.id, todo.completed);
        Ok(todo)
    }

    /// タイトル・説明・優先度を編集する
    pub async fn update(
        &self,
        caller: &Caller,
        id: &TodoId,
        patch: TodoPatch,
    ) -> Result<Todo, TodoError> {
        let viewer = self.viewers.require_viewer(caller).await?;
        let mut todo = self.load_owned(&viewer, id).await?;

        todo.apply_patch(patch, self.clock.now())?;
        self.todos.update(&todo).await?;

        info!("ToDo更新: todo_id={}", todo.id);
        Ok(todo)
    }

    pub async fn remove(&self, caller: &Caller, id: &TodoId) -> Result<(), TodoError> {
        let viewer = self.viewers.require_viewer(caller).await?;
        let todo = self.load_owned(&viewer, id).await?;

        self.todos.delete(&todo.id).await?;

        info!("ToDo削除: todo_id={}", todo.id);
        Ok(())
    }

    /// 存在しない ToDo と他人の ToDo は区別せず `NotFound`
    async fn load_owned(&self, viewer: &User, id: &TodoId) -> Result<Todo, TodoError> {
        match self.todos.get(id).await? {
            Some(todo) if todo.is_owned_by(&viewer.id) => Ok(todo),
            Some(_) => {
                debug!("他ユーザーのToDoへのアクセス: todo_id={}, user_id={}", id, viewer.id);
                Err(TodoError::todo_not_found(id))
            }
            None => Err(TodoError::todo_not_found(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryTodoRepository, InMemoryUserRepository};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use domain::{Identity, Priority, StatusFilter};
    use std::sync::Mutex;

    /// 呼び出しごとに 1 秒進む時計
    struct SteppingClock(Mutex<DateTime<Utc>>);

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut now = self.0.lock().unwrap();
            *now += Duration::seconds(1);
            *now
        }
    }

    fn setup() -> TodoService {
        let clock: Arc<dyn Clock> = Arc::new(SteppingClock(Mutex::new(
            Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
        )));
        let viewers = ViewerService::new(Arc::new(InMemoryUserRepository::new()), clock.clone());
        TodoService::new(Arc::new(InMemoryTodoRepository::new()), viewers, clock)
    }

    fn caller(subject: &str) -> Caller {
        Caller::Authenticated(Identity {
            subject: Some(subject.to_string()),
            token_identifier: format!("https://issuer.example|{subject}"),
            name: Some(subject.to_string()),
            ..Default::default()
        })
    }

    fn new_todo(title: &str) -> NewTodo {
        NewTodo {
            title: title.to_string(),
            ..Default::default()
        }
    }

    async fn synced(service: &TodoService, subject: &str) -> Caller {
        let caller = caller(subject);
        service.viewers().sync_viewer(&caller).await.unwrap();
        caller
    }

    #[tokio::test]
    async fn test_buy_milk_walkthrough() {
        let service = setup();
        let alice = synced(&service, "alice").await;

        let id = service
            .create(
                &alice,
                NewTodo {
                    title: "  Buy milk  ".to_string(),
                    description: Some("   ".to_string()),
                    priority: None,
                },
            )
            .await
            .unwrap();

        let todos = service.list(&alice, &TodoFilter::default()).await.unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].title, "Buy milk");
        assert_eq!(todos[0].description, None);
        assert_eq!(todos[0].priority, Priority::Medium);
        assert!(!todos[0].completed);

        let toggled = service.toggle(&alice, &id).await.unwrap();
        assert!(toggled.completed);
        assert!(toggled.updated_at > toggled.created_at);

        let active = TodoFilter::new(StatusFilter::Active, None);
        assert!(service.list(&alice, &active).await.unwrap().is_empty());

        let completed = TodoFilter::new(StatusFilter::Completed, Some("MILK".to_string()));
        assert_eq!(service.list(&alice, &completed).await.unwrap().len(), 1);

        service.remove(&alice, &id).await.unwrap();
        assert!(service
            .list(&alice, &TodoFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let service = setup();
        let alice = synced(&service, "alice").await;

        let first = service.create(&alice, new_todo("first")).await.unwrap();
        service.create(&alice, new_todo("second")).await.unwrap();
        service.toggle(&alice, &first).await.unwrap();

        let titles: Vec<String> = service
            .list(&alice, &TodoFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_anonymous_and_unsynced_callers() {
        let service = setup();
        let id = TodoId::new();

        assert!(service
            .list(&Caller::Anonymous, &TodoFilter::default())
            .await
            .unwrap()
            .is_empty());
        let not_authenticated = Some(TodoError::Authentication("Not authenticated".to_string()));
        assert_eq!(
            service.create(&Caller::Anonymous, new_todo("x")).await.err(),
            not_authenticated
        );
        assert_eq!(
            service.toggle(&Caller::Anonymous, &id).await.err(),
            not_authenticated
        );
        assert_eq!(
            service.remove(&Caller::Anonymous, &id).await.err(),
            not_authenticated
        );

        let unsynced = caller("bob");
        assert!(service
            .list(&unsynced, &TodoFilter::default())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            service.create(&unsynced, new_todo("x")).await,
            Err(TodoError::ProfileMissing)
        );
        assert_eq!(
            service.toggle(&unsynced, &id).await,
            Err(TodoError::ProfileMissing)
        );
        assert_eq!(
            service.remove(&unsynced, &id).await,
            Err(TodoError::ProfileMissing)
        );
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let service = setup();
        let alice = synced(&service, "alice").await;

        assert_eq!(
            service.create(&alice, new_todo("   ")).await,
            Err(TodoError::Validation("Title is required".to_string()))
        );
        assert!(service
            .list(&alice, &TodoFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_foreign_todo_is_not_found() {
        let service = setup();
        let alice = synced(&service, "alice").await;
        let bob = synced(&service, "bob").await;

        let id = service.create(&alice, new_todo("secret")).await.unwrap();
        let not_found = Some(TodoError::todo_not_found(&id));

        assert_eq!(service.get(&bob, &id).await.err(), not_found);
        assert_eq!(service.toggle(&bob, &id).await.err(), not_found);
        assert_eq!(service.remove(&bob, &id).await.err(), not_found);
        assert_eq!(
            service.update(&bob, &id, TodoPatch::default()).await.err(),
            not_found
        );
        assert!(service
            .list(&bob, &TodoFilter::default())
            .await
            .unwrap()
            .is_empty());

        // 所有者側からは変化していない
        let todo = service.get(&alice, &id).await.unwrap();
        assert!(!todo.completed);
    }

    #[tokio::test]
    async fn test_missing_todo_is_not_found() {
        let service = setup();
        let alice = synced(&service, "alice").await;
        let id = TodoId::new();

        assert_eq!(
            service.toggle(&alice, &id).await,
            Err(TodoError::todo_not_found(&id))
        );
        assert_eq!(
            service.remove(&alice, &id).await,
            Err(TodoError::todo_not_found(&id))
        );
    }

    #[tokio::test]
    async fn test_update_edits_fields() {
        let service = setup();
        let alice = synced(&service, "alice").await;
        let id = service
            .create(
                &alice,
                NewTodo {
                    title: "Draft".to_string(),
                    description: Some("old".to_string()),
                    priority: Some(Priority::Low),
                },
            )
            .await
            .unwrap();

        let updated = service
            .update(
                &alice,
                &id,
                TodoPatch {
                    title: Some(" Final ".to_string()),
                    description: Some("".to_string()),
                    priority: Some(Priority::High),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Final");
        assert_eq!(updated.description, None);
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(service.get(&alice, &id).await.unwrap(), updated);

        assert_eq!(
            service
                .update(
                    &alice,
                    &id,
                    TodoPatch {
                        title: Some(" ".to_string()),
                        ..Default::default()
                    },
                )
                .await,
            Err(TodoError::Validation("Title is required".to_string()))
        );
        assert_eq!(service.get(&alice, &id).await.unwrap().title, "Final");
    }

    #[tokio::test]
    async fn test_double_toggle_restores_completed() {
        let service = setup();
        let alice = synced(&service, "alice").await;
        let id = service.create(&alice, new_todo("flip")).await.unwrap();

        let once = service.toggle(&alice, &id).await.unwrap();
        let twice = service.toggle(&alice, &id).await.unwrap();

        assert!(once.completed);
        assert!(!twice.completed);
        assert!(twice.updated_at > once.updated_at);
    }
}
