use anyhow::Context;
use domain::{Caller, NewTodo, Priority, TodoId, TodoPatch};
use infrastructure::TodoService;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use shared::{
    empty_response, error_response, init_tracing, json_response, ApiGatewayProxyRequest,
    ApiGatewayProxyResponse, AppError, Config,
};
use tracing::info;

/// ToDo作成リクエスト
///
/// タイトル未指定はデシリアライズエラーではなく検証エラーとして扱う。
#[derive(Debug, Default, PartialEq, Deserialize)]
struct CreateTodoRequest {
    #[serde(default)]
    title: String,
    description: Option<String>,
    priority: Option<Priority>,
}

impl From<CreateTodoRequest> for NewTodo {
    fn from(request: CreateTodoRequest) -> Self {
        NewTodo {
            title: request.title,
            description: request.description,
            priority: request.priority,
        }
    }
}

/// ToDo更新リクエスト
#[derive(Debug, Default, PartialEq, Deserialize)]
struct UpdateTodoRequest {
    title: Option<String>,
    description: Option<String>,
    priority: Option<Priority>,
}

impl From<UpdateTodoRequest> for TodoPatch {
    fn from(request: UpdateTodoRequest) -> Self {
        TodoPatch {
            title: request.title,
            description: request.description,
            priority: request.priority,
        }
    }
}

/// 作成・同期の結果として返すID
#[derive(Debug, Serialize)]
struct IdResponse {
    id: String,
}

/// コマンドの種類を表す列挙型
#[derive(Debug, PartialEq)]
enum Command {
    CreateTodo(CreateTodoRequest),
    ToggleTodo {
        todo_id: TodoId,
    },
    UpdateTodo {
        todo_id: TodoId,
        request: UpdateTodoRequest,
    },
    DeleteTodo {
        todo_id: TodoId,
    },
    SyncUser,
}

/// コマンドハンドラーのメイン関数
async fn function_handler(
    event: LambdaEvent<ApiGatewayProxyRequest>,
    service: &TodoService,
    include_details: bool,
) -> Result<ApiGatewayProxyResponse, Error> {
    let request = event.payload;
    let request_id = request.request_id();

    info!(
        request_id = %request_id,
        "CommandHandler開始: method={}, path={}",
        request.http_method, request.path
    );

    match handle_request(&request, service).await {
        Ok(response) => {
            info!("CommandHandler完了: status={}", response.status_code);
            Ok(response)
        }
        Err(e) => {
            e.log();
            Ok(error_response(&e, request_id, include_details))
        }
    }
}

async fn handle_request(
    request: &ApiGatewayProxyRequest,
    service: &TodoService,
) -> Result<ApiGatewayProxyResponse, AppError> {
    if request.http_method == "OPTIONS" {
        return Ok(empty_response(204));
    }

    // パスとメソッドに基づいてコマンドをパース
    let command = parse_command(request)?;
    let caller = request.caller();

    execute_command(command, &caller, service).await
}

/// リクエストからコマンドをパース
fn parse_command(request: &ApiGatewayProxyRequest) -> Result<Command, AppError> {
    let method = request.http_method.as_str();

    match (method, request.path_segments().as_slice()) {
        ("POST", ["commands", "todos"]) => Ok(Command::CreateTodo(request.json_body()?)),
        ("POST", ["commands", "todos", id, "toggle"]) => Ok(Command::ToggleTodo {
            todo_id: parse_todo_id(id)?,
        }),
        ("PUT", ["commands", "todos", id]) => Ok(Command::UpdateTodo {
            todo_id: parse_todo_id(id)?,
            request: request.json_body()?,
        }),
        ("DELETE", ["commands", "todos", id]) => Ok(Command::DeleteTodo {
            todo_id: parse_todo_id(id)?,
        }),
        ("POST", ["commands", "users", "sync"]) => Ok(Command::SyncUser),
        _ => Err(AppError::Validation(format!(
            "サポートされていないメソッドまたはパス: {} {}",
            method, request.path
        ))),
    }
}

fn parse_todo_id(segment: &str) -> Result<TodoId, AppError> {
    Ok(TodoId::from_string(segment.to_string())?)
}

/// コマンドを実行
async fn execute_command(
    command: Command,
    caller: &Caller,
    service: &TodoService,
) -> Result<ApiGatewayProxyResponse, AppError> {
    match command {
        Command::CreateTodo(request) => {
            info!("ToDo作成コマンド実行: title={}", request.title);

            let todo_id = service.create(caller, request.into()).await?;
            json_response(
                201,
                &IdResponse {
                    id: todo_id.to_string(),
                },
            )
        }
        Command::ToggleTodo { todo_id } => {
            info!("ToDo完了状態変更コマンド実行: todo_id={}", todo_id);

            service.toggle(caller, &todo_id).await?;
            Ok(empty_response(204))
        }
        Command::UpdateTodo { todo_id, request } => {
            info!("ToDo更新コマンド実行: todo_id={}", todo_id);

            let todo = service.update(caller, &todo_id, request.into()).await?;
            json_response(200, &todo)
        }
        Command::DeleteTodo { todo_id } => {
            info!("ToDo削除コマンド実行: todo_id={}", todo_id);

            service.remove(caller, &todo_id).await?;
            Ok(empty_response(204))
        }
        Command::SyncUser => {
            info!("ユーザー同期コマンド実行");

            let user_id = service.viewers().sync_viewer(caller).await?;
            json_response(
                200,
                &IdResponse {
                    id: user_id.to_string(),
                },
            )
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing()?;

    let config = Config::from_env().context("設定読み込みに失敗しました")?;
    let include_details = !config.is_production();
    let service = TodoService::connect(&config).await;

    info!(
        "CommandHandler初期化完了: table={}, environment={}",
        config.dynamodb_table, config.environment
    );

    let service = &service;
    run(service_fn(move |event| async move {
        function_handler(event, service, include_details).await
    }))
    .await
}
