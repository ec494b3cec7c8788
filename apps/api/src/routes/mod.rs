pub mod chat;
pub mod download;
pub mod health;
pub mod sessions;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/upload",
            post(upload::handle_upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/chat", post(chat::handle_chat))
        .route("/download-latex-pdf", post(download::handle_download))
        .route("/sessions/compact", post(sessions::handle_compact))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::service::tests::{docx_bytes, service_with};
    use crate::workflow::store::MemorySessionStore;

    fn app() -> Router {
        build_router(AppState {
            service: Arc::new(service_with(Arc::new(MemorySessionStore::new()))),
        })
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_flags() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["latex_available"], false);
        assert_eq!(body["store_available"], true);
    }

    #[tokio::test]
    async fn test_chat_returns_response_and_intent() {
        let response = app()
            .oneshot(post_json(
                "/chat",
                json!({
                    "user_id": "u1",
                    "session_id": "s1",
                    "message": "Please enhance my resume overall",
                    "resume_content": "Jane Doe"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["intent"], "enhancement");
        assert_eq!(body["session_id"], "s1");
        assert!(body["response"].as_str().unwrap().contains("Enhanced Content"));
    }

    #[tokio::test]
    async fn test_chat_validation_error_shape() {
        let response = app()
            .oneshot(post_json("/chat", json!({"user_id": "u1", "message": ""})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_upload_docx_multipart() {
        let boundary = "resume-agent-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cv.docx\"\r\n\
            Content-Type: application/vnd.openxmlformats-officedocument.wordprocessingml.document\r\n\r\n"
        )
        .into_bytes();
        body.extend(docx_bytes(&["Jane Doe", "Education", "BSc CS"]));
        body.extend(format!("\r\n--{boundary}--\r\n").into_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["sections"]["education"], "BSc CS\n");
        assert!(!body["session_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_without_compiler_is_render_error() {
        let response = app()
            .oneshot(post_json(
                "/download-latex-pdf",
                json!({"enhanced_content": "Jane Doe"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "RENDER_ERROR");
    }

    #[tokio::test]
    async fn test_compact_unknown_session_is_404() {
        let response = app()
            .oneshot(post_json("/sessions/compact", json!({"user_id": "ghost"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
