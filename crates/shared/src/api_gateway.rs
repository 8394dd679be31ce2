use crate::auth::caller_from_claims;
use crate::errors::{AppError, ErrorResponse};
use domain::Caller;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// API Gateway プロキシリクエスト構造体
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayProxyRequest {
    pub http_method: String,
    pub path: String,
    pub path_parameters: Option<HashMap<String, String>>,
    pub query_string_parameters: Option<HashMap<String, String>>,
    pub headers: Option<HashMap<String, String>>,
    pub body: Option<String>,
    #[serde(default)]
    pub request_context: RequestContext,
}

/// リクエストコンテキスト構造体
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub request_id: Option<String>,
    pub authorizer: Option<Authorizer>,
}

/// 認証情報構造体
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Authorizer {
    pub claims: Option<HashMap<String, Value>>,
}

impl ApiGatewayProxyRequest {
    /// オーソライザーのクレームから呼び出し元を得る
    pub fn caller(&self) -> Caller {
        caller_from_claims(
            self.request_context
                .authorizer
                .as_ref()
                .and_then(|a| a.claims.as_ref()),
        )
    }

    pub fn request_id(&self) -> String {
        self.request_context
            .request_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_string_parameters
            .as_ref()
            .and_then(|params| params.get(name))
            .map(String::as_str)
    }

    /// パスを `/` で分割した空でないセグメント
    pub fn path_segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// JSON ボディをデシリアライズする。空ボディは `{}` とみなす。
    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        let body = self
            .body
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or("{}");
        serde_json::from_str(body)
            .map_err(|e| AppError::Deserialization(format!("invalid request body: {e}")))
    }
}

/// API Gateway プロキシレスポンス構造体
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayProxyResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

fn default_headers() -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert("Access-Control-Allow-Origin".to_string(), "*".to_string());
    headers.insert(
        "Access-Control-Allow-Headers".to_string(),
        "Content-Type,Authorization".to_string(),
    );
    headers.insert(
        "Access-Control-Allow-Methods".to_string(),
        "GET,POST,PUT,DELETE,OPTIONS".to_string(),
    );
    headers
}

/// 成功レスポンスを作成
pub fn json_response<T: Serialize>(
    status_code: u16,
    body: &T,
) -> Result<ApiGatewayProxyResponse, AppError> {
    let body = serde_json::to_string(body).map_err(|e| AppError::Serialization(e.to_string()))?;
    Ok(ApiGatewayProxyResponse {
        status_code,
        headers: default_headers(),
        body,
    })
}

/// ボディなしのレスポンスを作成（204 など）
pub fn empty_response(status_code: u16) -> ApiGatewayProxyResponse {
    ApiGatewayProxyResponse {
        status_code,
        headers: default_headers(),
        body: String::new(),
    }
}

/// エラーレスポンスを作成
pub fn error_response(
    error: &AppError,
    request_id: String,
    include_details: bool,
) -> ApiGatewayProxyResponse {
    let response = ErrorResponse::from_app_error(error, request_id.clone(), include_details);
    let body = serde_json::to_string(&response).unwrap_or_else(|_| {
        r#"{"code":"SERIALIZATION_ERROR","message":"failed to build error response"}"#.to_string()
    });

    let mut headers = default_headers();
    headers.insert("X-Request-ID".to_string(), request_id);

    ApiGatewayProxyResponse {
        status_code: error.http_status_code(),
        headers,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_deserializes_from_proxy_event() {
        let event = json!({
            "httpMethod": "GET",
            "path": "/queries/todos",
            "queryStringParameters": { "status": "active" },
            "requestContext": {
                "requestId": "req-1",
                "authorizer": { "claims": { "sub": "user_1" } }
            }
        });

        let request: ApiGatewayProxyRequest = serde_json::from_value(event).unwrap();
        assert_eq!(request.query_param("status"), Some("active"));
        assert_eq!(request.request_id(), "req-1");
        assert_eq!(request.caller().subject_key(), Some("user_1"));
        assert_eq!(request.path_segments(), vec!["queries", "todos"]);
    }

    #[test]
    fn test_request_without_authorizer_is_anonymous() {
        let event = json!({ "httpMethod": "GET", "path": "/queries/viewer" });
        let request: ApiGatewayProxyRequest = serde_json::from_value(event).unwrap();
        assert_eq!(request.caller(), Caller::Anonymous);
    }

    #[test]
    fn test_json_body_treats_empty_as_object() {
        #[derive(Deserialize)]
        struct Body {
            title: Option<String>,
        }

        let request = ApiGatewayProxyRequest {
            body: Some("  ".to_string()),
            ..Default::default()
        };
        let body: Body = request.json_body().unwrap();
        assert!(body.title.is_none());

        let request = ApiGatewayProxyRequest {
            body: Some("{not json".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            request.json_body::<Body>(),
            Err(AppError::Deserialization(_))
        ));
    }

    #[test]
    fn test_error_response_uses_status_and_request_id() {
        let response = error_response(
            &AppError::NotFound("01H".to_string()),
            "req-9".to_string(),
            false,
        );
        assert_eq!(response.status_code, 404);
        assert_eq!(
            response.headers.get("X-Request-ID").map(String::as_str),
            Some("req-9")
        );
        assert!(response.body.contains("NOT_FOUND"));
    }

    #[test]
    fn test_json_response_serializes_body() {
        let response = json_response(201, &json!({ "id": "abc" })).unwrap();
        assert_eq!(response.status_code, 201);
        assert_eq!(
            response.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(response.body, r#"{"id":"abc"}"#);
    }
}
