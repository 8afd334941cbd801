use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::errors::AnalyzeError;
use crate::handlers::FoodAnalyzer;
use crate::models::UploadedImage;

const IMAGE_FIELD: &str = "image";

pub struct AppState {
    pub analyzer: FoodAnalyzer,
}

pub fn create_router(analyzer: FoodAnalyzer, max_upload_bytes: usize) -> Router {
    let state = Arc::new(AppState { analyzer });

    Router::new()
        .route("/", get(root_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/health", get(health_check))
        .nest_service("/static", ServeDir::new("static"))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let upload = match multipart {
        Ok(mut multipart) => match read_image_field(&mut multipart).await {
            Ok(upload) => upload,
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                log::warn!("⚠️ Upload rejected: {}", e);
                return e.into_response();
            }
            Err(e) => {
                // A body that cannot be read as multipart carries no usable file
                log::warn!("⚠️ Malformed multipart upload: {}", e);
                None
            }
        },
        Err(rejection) => {
            // Not a multipart request, so no file can be in it
            log::warn!("⚠️ Analyze request without multipart body: {}", rejection);
            None
        }
    };

    match state.analyzer.analyze(upload).await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e @ AnalyzeError::BadRequest(_)) => {
            log::warn!("⚠️ Rejected analyze request: {}", e);
            e.into_response()
        }
        Err(e) => {
            log::error!("❌ Analyze request failed: {}", e);
            e.into_response()
        }
    }
}

/// Returns the first `image` part that was sent as a file.
async fn read_image_field(multipart: &mut Multipart) -> Result<Option<UploadedImage>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        // Plain form values named "image" are not file uploads
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        return Ok(Some(UploadedImage {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

async fn root_handler() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai_service::testing::StubVision;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "food-vision-boundary";

    struct Part<'a> {
        name: &'a str,
        filename: Option<&'a str>,
        content_type: Option<&'a str>,
        data: &'a [u8],
    }

    fn multipart_body(parts: &[Part]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
            if let Some(filename) = part.filename {
                disposition.push_str(&format!("; filename=\"{}\"", filename));
            }
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(b"\r\n");
            if let Some(content_type) = part.content_type {
                body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(part.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn app(vision: Arc<StubVision>) -> Router {
        create_router(FoodAnalyzer::new(vision, 1024, 90), 16 * 1024 * 1024)
    }

    async fn post_parts(app: Router, parts: &[Part<'_>]) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        send(app, request).await
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn image_part<'a>(filename: &'a str, data: &'a [u8]) -> Part<'a> {
        Part {
            name: "image",
            filename: Some(filename),
            content_type: Some("image/jpeg"),
            data,
        }
    }

    #[tokio::test]
    async fn test_missing_image_part() {
        let vision = StubVision::replying("{}");
        let parts = [Part {
            name: "other",
            filename: Some("x.jpg"),
            content_type: Some("image/jpeg"),
            data: b"abc",
        }];

        let (status, body) = post_parts(app(vision.clone()), &parts).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "No image file provided."}));
        assert_eq!(vision.calls(), 0);
    }

    #[tokio::test]
    async fn test_image_form_value_without_filename_is_not_a_file() {
        let parts = [Part {
            name: "image",
            filename: None,
            content_type: None,
            data: b"just text",
        }];

        let (status, body) = post_parts(app(StubVision::replying("{}")), &parts).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "No image file provided."}));
    }

    #[tokio::test]
    async fn test_non_multipart_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let (status, body) = send(app(StubVision::replying("{}")), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "No image file provided."}));
    }

    #[tokio::test]
    async fn test_empty_filename() {
        let (status, body) =
            post_parts(app(StubVision::replying("{}")), &[image_part("", b"abc")]).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "No image file selected."}));
    }

    #[tokio::test]
    async fn test_fenced_model_response_is_rescaled() {
        let vision = StubVision::replying(
            "```json\n{\"foods\":[{\"name\":\"Rice\",\"protein\":\"2g\",\"carbs\":\"28g\",\"fat\":\"0.3g\",\"fiber\":\"0.4g\"}]}\n```\n",
        );

        let (status, body) = post_parts(app(vision.clone()), &[image_part("rice.jpg", b"abc")]).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"foods": [{"name": "Rice", "protein": "0.02g", "carbs": "0.28g", "fat": "0.00g", "fiber": "0.00g"}]})
        );
        assert_eq!(vision.calls(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_model_response() {
        let raw = "I think this is a salad, roughly 5g of protein.";

        let (status, body) =
            post_parts(app(StubVision::replying(raw)), &[image_part("salad.jpg", b"abc")]).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"error": "Failed to parse the response from the AI model.", "raw_response": raw})
        );
    }

    #[tokio::test]
    async fn test_provider_error_is_unexpected_error() {
        let vision = StubVision::failing("error sending request: connection refused");

        let (status, body) = post_parts(app(vision), &[image_part("x.jpg", b"abc")]).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"error": "An unexpected error occurred: error sending request: connection refused"})
        );
    }

    #[tokio::test]
    async fn test_truncated_multipart_body() {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"a.jpg\"\r\nContent-Type: image/jpeg\r\n\r\nabc-truncated",
            b = BOUNDARY
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        let vision = StubVision::replying("{}");

        let response = app(vision.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"error": "No image file provided."}));
        assert_eq!(vision.calls(), 0);
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_rejected() {
        let router = create_router(
            FoodAnalyzer::new(StubVision::replying("{}"), 1024, 90),
            1024,
        );
        let big = vec![0u8; 8 * 1024];

        let (status, _) = post_parts(router, &[image_part("big.jpg", &big)]).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_health_and_landing_page() {
        let router = app(StubVision::replying("{}"));

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("/api/analyze"));
    }
}
