use async_trait::async_trait;
use log::{ debug, error, warn };
use reqwest::{ Client as HttpClient, Response };
use serde_json::{ Map, Value as JsonValue };
use std::time::Duration;

use super::{ ApiError, ChatBackend };
use crate::models::api::{ ChatRequest, ChatResponse, ErrorBody, HealthStatus, ResetStatus };

const CHAT_ROUTE: &str = "/api/chat";
const RESET_ROUTE: &str = "/api/reset";
const HEALTH_ROUTE: &str = "/api/health";

const CHAT_FALLBACK_ERROR: &str = "Error processing chat message";
const RESET_FALLBACK_ERROR: &str = "Error resetting conversation";
const UNREACHABLE_MESSAGE: &str = "API is unreachable";

#[derive(Debug, Clone)]
pub struct HttpChatApi {
    http: HttpClient,
    base_url: String,
}

impl HttpChatApi {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = HttpClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }
}

async fn backend_error(response: Response, fallback: &str) -> ApiError {
    let status = response.status();
    let body = response.json::<ErrorBody>().await.unwrap_or_default();
    ApiError::Backend {
        status: status.as_u16(),
        message: body.error.unwrap_or_else(|| fallback.to_string()),
    }
}

#[async_trait]
impl ChatBackend for HttpChatApi {
    async fn submit_message(&self, message: &str) -> Result<ChatResponse, ApiError> {
        let url = self.url(CHAT_ROUTE);
        debug!("POST {}", url);

        let response = self.http
            .post(&url)
            .json(&ChatRequest { message })
            .send().await
            .map_err(|e| {
                error!("Error sending chat message: {}", e);
                ApiError::Transport(e.to_string())
            })?;

        if !response.status().is_success() {
            let err = backend_error(response, CHAT_FALLBACK_ERROR).await;
            error!("Error sending chat message: {:?}", err);
            return Err(err);
        }

        response.json::<ChatResponse>().await.map_err(|e| {
            error!("Error decoding chat response: {}", e);
            ApiError::InvalidResponse(e.to_string())
        })
    }

    async fn reset_conversation(&self) -> Result<ResetStatus, ApiError> {
        let url = self.url(RESET_ROUTE);
        debug!("POST {}", url);

        let response = self.http
            .post(&url)
            .send().await
            .map_err(|e| {
                error!("Error resetting conversation: {}", e);
                ApiError::Transport(e.to_string())
            })?;

        if !response.status().is_success() {
            let err = backend_error(response, RESET_FALLBACK_ERROR).await;
            error!("Error resetting conversation: {:?}", err);
            return Err(err);
        }

        let body = response.text().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(ResetStatus::default());
        }
        serde_json::from_str(&body).map_err(|e| {
            error!("Error decoding reset response: {}", e);
            ApiError::InvalidResponse(e.to_string())
        })
    }

    async fn check_health(&self) -> HealthStatus {
        let url = self.url(HEALTH_ROUTE);

        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("API health check failed: {}", e);
                return HealthStatus::offline(UNREACHABLE_MESSAGE);
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("API health check returned status {}", status);
            return HealthStatus::offline(format!("API returned status {}", status.as_u16()));
        }

        match response.json::<Map<String, JsonValue>>().await {
            Ok(fields) => HealthStatus::online(fields),
            Err(e) => {
                warn!("API health check returned an unreadable body: {}", e);
                HealthStatus::offline(format!("Invalid health response: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{ http::StatusCode, routing::{ get, post }, Json, Router };
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// An address nothing listens on.
    async fn closed_port() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    fn client(base_url: &str) -> HttpChatApi {
        HttpChatApi::new(base_url, Some(Duration::from_secs(5))).unwrap()
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let api = client("http://localhost:8080/");
        assert_eq!(api.base_url(), "http://localhost:8080");
        assert_eq!(api.url(CHAT_ROUTE), "http://localhost:8080/api/chat");
    }

    #[tokio::test]
    async fn test_submit_message_success() {
        let app = Router::new().route(
            "/api/chat",
            post(|Json(body): Json<JsonValue>| async move {
                Json(json!({
                    "answer": format!("echo: {}", body["message"].as_str().unwrap_or_default()),
                    "sources": [{"id": 1}],
                    "processing_time": 0.25
                }))
            })
        );
        let api = client(&serve(app).await);

        let response = api.submit_message("hello").await.unwrap();
        assert_eq!(response.answer, "echo: hello");
        assert_eq!(response.sources, Some(vec![json!({"id": 1})]));
        assert_eq!(response.processing_time, Some(0.25));
    }

    #[tokio::test]
    async fn test_submit_message_backend_error() {
        let app = Router::new().route(
            "/api/chat",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "boom"}))) })
        );
        let api = client(&serve(app).await);

        let err = api.submit_message("hello").await.unwrap_err();
        assert_eq!(err, ApiError::Backend { status: 500, message: "boom".to_string() });
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_submit_message_unparseable_error_body() {
        let app = Router::new().route(
            "/api/chat",
            post(|| async { (StatusCode::BAD_GATEWAY, "<html>bad gateway</html>") })
        );
        let api = client(&serve(app).await);

        let err = api.submit_message("hello").await.unwrap_err();
        assert_eq!(err, ApiError::Backend {
            status: 502,
            message: CHAT_FALLBACK_ERROR.to_string(),
        });
    }

    #[tokio::test]
    async fn test_submit_message_unreachable() {
        let api = client(&closed_port().await);
        let err = api.submit_message("hello").await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[tokio::test]
    async fn test_submit_message_bad_success_body() {
        let app = Router::new().route("/api/chat", post(|| async { Json(json!({"reply": "x"})) }));
        let api = client(&serve(app).await);

        let err = api.submit_message("hello").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_reset_conversation() {
        let app = Router::new()
            .route("/api/reset", post(|| async { Json(json!({"status": "reset"})) }));
        let api = client(&serve(app).await);

        let status = api.reset_conversation().await.unwrap();
        assert_eq!(status.0.get("status"), Some(&json!("reset")));
    }

    #[tokio::test]
    async fn test_reset_conversation_empty_body() {
        let app = Router::new().route("/api/reset", post(|| async { StatusCode::OK }));
        let api = client(&serve(app).await);

        assert_eq!(api.reset_conversation().await.unwrap(), ResetStatus::default());
    }

    #[tokio::test]
    async fn test_reset_conversation_error_fallback() {
        let app = Router::new()
            .route("/api/reset", post(|| async { (StatusCode::SERVICE_UNAVAILABLE, Json(json!({}))) }));
        let api = client(&serve(app).await);

        let err = api.reset_conversation().await.unwrap_err();
        assert_eq!(err.to_string(), RESET_FALLBACK_ERROR);
    }

    #[tokio::test]
    async fn test_health_online_passes_fields_through() {
        let app = Router::new().route(
            "/api/health",
            get(|| async { Json(json!({"status": "ok", "documents": 42, "online": false})) })
        );
        let api = client(&serve(app).await);

        let health = api.check_health().await;
        assert!(health.online);
        assert_eq!(health.fields.get("status"), Some(&json!("ok")));
        assert_eq!(health.fields.get("documents"), Some(&json!(42)));
    }

    #[tokio::test]
    async fn test_health_non_success_status() {
        let app = Router::new()
            .route("/api/health", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let api = client(&serve(app).await);

        let health = api.check_health().await;
        assert!(!health.online);
        assert_eq!(health.message.as_deref(), Some("API returned status 503"));
    }

    #[tokio::test]
    async fn test_health_unreachable() {
        let api = client(&closed_port().await);

        let health = api.check_health().await;
        assert!(!health.online);
        assert_eq!(health.message.as_deref(), Some(UNREACHABLE_MESSAGE));
        assert_eq!(health.fields.get("status"), Some(&json!("error")));
    }
}
