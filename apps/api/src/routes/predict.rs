use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::classify::{LabelSet, PredictionResult, RoleClassifier};
use crate::errors::AppError;
use crate::extract;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PredictParams {
    /// When present, respond with the k best roles instead of the single best.
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub result: PredictionResult,
}

/// POST /api/v1/predict
///
/// Accepts a multipart form with a `file` field holding a PDF resume, saves
/// it under the upload directory, runs the extraction/classification
/// pipeline, and answers with the predicted role(s). The saved file is
/// deleted after processing unless `KEEP_UPLOADS` is set.
pub async fn handle_predict(
    State(state): State<AppState>,
    Query(params): Query<PredictParams>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            if filename.is_empty() {
                return Err(AppError::EmptySelectedFile);
            }
            let data = field.bytes().await?;
            upload = Some((filename, data));
            break;
        }
    }
    let (filename, data) = upload.ok_or(AppError::MissingFilePart)?;

    let saved_path = state
        .config
        .upload_dir
        .join(format!("{}_{}", Uuid::new_v4(), secure_filename(&filename)));
    tokio::fs::write(&saved_path, &data).await.map_err(|e| {
        AppError::Internal(anyhow::anyhow!(
            "failed to save upload to {}: {e}",
            saved_path.display()
        ))
    })?;

    let outcome = extract::extract_text(&saved_path)
        .map_err(AppError::from)
        .and_then(|text| {
            classify_text(
                state.classifier.as_ref(),
                &state.labels,
                &text,
                params.top_k,
            )
        });

    if !state.config.keep_uploads {
        if let Err(e) = tokio::fs::remove_file(&saved_path).await {
            debug!("Failed to remove processed upload {}: {e}", saved_path.display());
        }
    }

    let result = outcome?;
    info!(upload = %filename, "Resume classified");
    Ok(Json(PredictResponse { result }))
}

/// Tokenize/infer/decode for one extracted resume text.
fn classify_text(
    classifier: &dyn RoleClassifier,
    labels: &LabelSet,
    text: &str,
    top_k: Option<usize>,
) -> Result<PredictionResult, AppError> {
    let probabilities = classifier.predict(text)?;
    Ok(match top_k {
        Some(k) => PredictionResult::Ranked(labels.decode_top_k(&probabilities, k)),
        None => PredictionResult::Single(labels.decode_top1(&probabilities)),
    })
}

/// Werkzeug-style filename cleanup: ASCII alphanumerics, dot, dash, and
/// underscore survive; everything else becomes an underscore. Leading and
/// trailing dots and underscores are stripped so the result can never climb
/// out of the upload directory.
fn secure_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "resume.pdf".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::classify::ClassifierError;
    use crate::config::Config;
    use crate::routes::build_router;

    use super::*;

    struct MockClassifier(Vec<f32>);

    impl RoleClassifier for MockClassifier {
        fn predict(&self, _text: &str) -> Result<Vec<f32>, ClassifierError> {
            Ok(self.0.clone())
        }
    }

    struct FailingClassifier;

    impl RoleClassifier for FailingClassifier {
        fn predict(&self, _text: &str) -> Result<Vec<f32>, ClassifierError> {
            Err(ClassifierError::NoKnownTokens)
        }
    }

    fn three_labels() -> LabelSet {
        LabelSet::new(vec![
            "Software Engineer".to_string(),
            "Data Scientist".to_string(),
            "Product Manager".to_string(),
        ])
    }

    fn test_config(upload_dir: PathBuf) -> Config {
        Config {
            model_path: "model.onnx".into(),
            tokenizer_path: "tokenizer.json".into(),
            model_sha256: None,
            tokenizer_sha256: None,
            labels_csv: None,
            labels_column: "Category".to_string(),
            max_sequence_length: 500,
            input_name: None,
            output_name: None,
            pad_token: "[PAD]".to_string(),
            pad_id: 0,
            unk_token: "[UNK]".to_string(),
            upload_dir,
            keep_uploads: false,
            port: 0,
            rust_log: "info".to_string(),
        }
    }

    fn test_state(classifier: Arc<dyn RoleClassifier>, upload_dir: PathBuf) -> AppState {
        AppState {
            classifier,
            labels: Arc::new(three_labels()),
            config: test_config(upload_dir),
        }
    }

    fn multipart_request(boundary: &str, body: String) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/predict")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn json_body(body: Body) -> Value {
        let bytes = to_bytes(body, usize::MAX).await.expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[test]
    fn classify_text_top1_uses_argmax() {
        let classifier = MockClassifier(vec![0.1, 0.8, 0.1]);
        let result =
            classify_text(&classifier, &three_labels(), "some resume", None).expect("classify");
        assert_eq!(
            result,
            PredictionResult::Single(crate::classify::RolePrediction {
                job_role: "Data Scientist".to_string(),
                confidence: 80.0,
            })
        );
    }

    #[test]
    fn classify_text_top_k_returns_ranked_roles() {
        let classifier = MockClassifier(vec![0.1, 0.8, 0.3]);
        let result =
            classify_text(&classifier, &three_labels(), "some resume", Some(2)).expect("classify");
        let PredictionResult::Ranked(top) = result else {
            panic!("expected ranked result");
        };
        assert_eq!(top.job_roles, vec!["Data Scientist", "Product Manager"]);
    }

    #[test]
    fn classify_text_propagates_tokenization_failure() {
        let err = classify_text(&FailingClassifier, &three_labels(), "x", None)
            .expect_err("should propagate");
        assert!(matches!(
            err,
            AppError::Classifier(ClassifierError::NoKnownTokens)
        ));
    }

    #[test]
    fn secure_filename_keeps_safe_characters() {
        assert_eq!(secure_filename("My Resume (2024).pdf"), "My_Resume__2024_.pdf");
        assert_eq!(secure_filename("cv-final_v2.pdf"), "cv-final_v2.pdf");
    }

    #[test]
    fn secure_filename_strips_path_traversal() {
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("..."), "resume.pdf");
    }

    #[tokio::test]
    async fn form_without_file_field_is_no_file_part() {
        let dir = tempfile::tempdir().expect("temp dir");
        let app = build_router(test_state(
            Arc::new(MockClassifier(vec![0.5, 0.3, 0.2])),
            dir.path().to_path_buf(),
        ));

        let boundary = "predict-test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"notes\"\r\n\r\nhello\r\n--{boundary}--\r\n"
        );
        let response = app
            .oneshot(multipart_request(boundary, body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["error"], "No file part");
    }

    #[tokio::test]
    async fn empty_filename_is_no_selected_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let app = build_router(test_state(
            Arc::new(MockClassifier(vec![0.5, 0.3, 0.2])),
            dir.path().to_path_buf(),
        ));

        let boundary = "predict-test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"\"\r\n\r\n\r\n--{boundary}--\r\n"
        );
        let response = app
            .oneshot(multipart_request(boundary, body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["error"], "No selected file");
    }

    #[tokio::test]
    async fn unparseable_upload_is_could_not_extract_text() {
        let dir = tempfile::tempdir().expect("temp dir");
        let app = build_router(test_state(
            Arc::new(MockClassifier(vec![0.5, 0.3, 0.2])),
            dir.path().to_path_buf(),
        ));

        let boundary = "predict-test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"resume.pdf\"\r\nContent-Type: application/pdf\r\n\r\nnot a pdf at all\r\n--{boundary}--\r\n"
        );
        let response = app
            .oneshot(multipart_request(boundary, body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["error"], "Could not extract text from the resume");

        // Processed uploads are removed even when the pipeline fails.
        let leftover = std::fs::read_dir(dir.path()).expect("read dir").count();
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn non_post_method_is_405() {
        let dir = tempfile::tempdir().expect("temp dir");
        let app = build_router(test_state(
            Arc::new(MockClassifier(vec![0.5, 0.3, 0.2])),
            dir.path().to_path_buf(),
        ));

        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/v1/predict")
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
