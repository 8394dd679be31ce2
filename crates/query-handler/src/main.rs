use anyhow::Context;
use domain::{Caller, StatusFilter, Todo, TodoFilter, TodoId};
use infrastructure::TodoService;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::Serialize;
use shared::{
    empty_response, error_response, init_tracing, json_response, ApiGatewayProxyRequest,
    ApiGatewayProxyResponse, AppError, Config,
};
use tracing::info;

/// ToDo一覧レスポンス
#[derive(Debug, Serialize)]
struct TodoListResponse {
    todos: Vec<Todo>,
    total_count: usize,
}

/// クエリの種類を表す列挙型
#[derive(Debug, PartialEq)]
enum Query {
    ListTodos { filter: TodoFilter },
    GetTodo { todo_id: TodoId },
    GetViewer,
}

/// クエリハンドラーのメイン関数
async fn function_handler(
    event: LambdaEvent<ApiGatewayProxyRequest>,
    service: &TodoService,
    include_details: bool,
) -> Result<ApiGatewayProxyResponse, Error> {
    let request = event.payload;
    let request_id = request.request_id();

    info!(
        request_id = %request_id,
        "QueryHandler開始: method={}, path={}",
        request.http_method, request.path
    );

    match handle_request(&request, service).await {
        Ok(response) => {
            info!("QueryHandler完了: status={}", response.status_code);
            Ok(response)
        }
        Err(e) => {
            e.log();
            Ok(error_response(&e, request_id, include_details))
        }
    }
}

/// リクエストを処理する
async fn handle_request(
    request: &ApiGatewayProxyRequest,
    service: &TodoService,
) -> Result<ApiGatewayProxyResponse, AppError> {
    if request.http_method == "OPTIONS" {
        return Ok(empty_response(204));
    }

    // パスとメソッドに基づいてクエリをパース
    let query = parse_query(request)?;
    let caller = request.caller();

    execute_query(query, &caller, service).await
}

/// リクエストからクエリをパース
fn parse_query(request: &ApiGatewayProxyRequest) -> Result<Query, AppError> {
    let method = request.http_method.as_str();

    match (method, request.path_segments().as_slice()) {
        ("GET", ["queries", "todos"]) => {
            let status = request
                .query_param("status")
                .filter(|s| !s.is_empty())
                .map(str::parse::<StatusFilter>)
                .transpose()?
                .unwrap_or_default();
            let search = request.query_param("search").map(str::to_string);

            Ok(Query::ListTodos {
                filter: TodoFilter::new(status, search),
            })
        }
        ("GET", ["queries", "todos", id]) => Ok(Query::GetTodo {
            todo_id: TodoId::from_string(id.to_string())?,
        }),
        ("GET", ["queries", "viewer"]) => Ok(Query::GetViewer),
        _ => Err(AppError::Validation(format!(
            "サポートされていないメソッドまたはパス: {} {}",
            method, request.path
        ))),
    }
}

/// クエリを実行
async fn execute_query(
    query: Query,
    caller: &Caller,
    service: &TodoService,
) -> Result<ApiGatewayProxyResponse, AppError> {
    match query {
        Query::ListTodos { filter } => {
            info!(
                "ToDo一覧取得クエリ実行: status={:?}, search={:?}",
                filter.status, filter.search
            );

            let todos = service.list(caller, &filter).await?;
            let response = TodoListResponse {
                total_count: todos.len(),
                todos,
            };

            info!("ToDo一覧取得完了: {} 件", response.total_count);
            json_response(200, &response)
        }
        Query::GetTodo { todo_id } => {
            info!("ToDo詳細取得クエリ実行: todo_id={}", todo_id);

            let todo = service.get(caller, &todo_id).await?;
            json_response(200, &todo)
        }
        Query::GetViewer => {
            let viewer = service.viewers().resolve_viewer(caller).await?;
            json_response(200, &viewer)
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
        "QueryHandler初期化完了: table={}, environment={}",
        config.dynamodb_table, config.environment
    );

    let service = &service;
    run(service_fn(move |event| async move {
        function_handler(event, service, include_details).await
    }))
    .await
}
