use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, Json, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use bytes::Bytes;
use serde::Deserialize;

use crate::{CodeMode, CodeSheet, CodeSheetError};

const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub number_sequence: String,
    /// `codeType` is the field name the original web client sends.
    #[serde(alias = "codeType")]
    pub code_mode: String,
}

/// The generate route registers POST only, so other methods get a 405 from
/// the method router itself.
pub fn router() -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
}

async fn generate(payload: Result<Json<GenerateRequest>, JsonRejection>) -> Response {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            return (StatusCode::BAD_REQUEST, rejection.body_text()).into_response();
        }
    };
    let Some(mode) = CodeMode::from_wire(&request.code_mode) else {
        return (
            StatusCode::BAD_REQUEST,
            "code_mode must be \"qrcode\" or \"barcode\"".to_string(),
        )
            .into_response();
    };

    // Rasterization and assembly are CPU-bound; keep them off the runtime
    // worker threads.
    let outcome = tokio::task::spawn_blocking(move || {
        let sheet = CodeSheet::builder().mode(mode).build()?;
        sheet.generate(&request.number_sequence)
    })
    .await;

    let bytes = match outcome {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(CodeSheetError::Validation(message))) => {
            return (StatusCode::BAD_REQUEST, message).into_response();
        }
        Ok(Err(err)) => {
            tracing::error!(error = %err, "pdf generation failed");
            return internal_error();
        }
        Err(err) => {
            tracing::error!(error = %err, "generation task failed");
            return internal_error();
        }
    };

    build_download_response(mode, Bytes::from(bytes))
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to generate PDF".to_string(),
    )
        .into_response()
}

fn build_download_response(mode: CodeMode, bytes: Bytes) -> Response {
    let mut response = Response::new(Body::from(bytes.clone()));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    if let Ok(value) = HeaderValue::from_str(&bytes.len().to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        mode.download_filename()
    )) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect_pdf_bytes;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn post_json(body: serde_json::Value) -> Response {
        router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/generate")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response")
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes()
            .to_vec()
    }

    #[tokio::test]
    async fn non_post_method_is_rejected() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/generate")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn missing_field_is_a_bad_request() {
        let response = post_json(serde_json::json!({ "code_mode": "qrcode" })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unsupported_mode_is_a_bad_request() {
        let response = post_json(serde_json::json!({
            "number_sequence": "100",
            "code_mode": "datamatrix",
        }))
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn blank_sequence_is_a_bad_request() {
        let response = post_json(serde_json::json!({
            "number_sequence": " \n ",
            "code_mode": "qrcode",
        }))
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn happy_path_returns_a_pdf_attachment() {
        let response = post_json(serde_json::json!({
            "number_sequence": "100\n200\n\n300",
            "code_mode": "qrcode",
        }))
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).expect("header"),
            "application/pdf"
        );
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_DISPOSITION)
                .expect("header"),
            "attachment; filename=\"qrcode_codes.pdf\""
        );
        let bytes = body_bytes(response).await;
        assert!(bytes.starts_with(b"%PDF"));
        let report = inspect_pdf_bytes(&bytes).expect("inspect");
        assert_eq!(report.page_count, 1);
    }

    #[tokio::test]
    async fn legacy_field_name_is_accepted() {
        let response = post_json(serde_json::json!({
            "number_sequence": "A1\nB2",
            "codeType": "barcode",
        }))
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_DISPOSITION)
                .expect("header"),
            "attachment; filename=\"barcode_codes.pdf\""
        );
    }
}
