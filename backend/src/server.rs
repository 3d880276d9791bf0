use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::models::{
    grade_quiz as score_answers, CallableRequest, CallableResponse, GradePayload, PlanResponse,
    QuizResponse, QuizScore, SyllabusPayload,
};
use crate::service::StudyService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StudyService>,
}

pub fn router(service: Arc<StudyService>) -> Router {
    Router::new()
        .route("/analyze_syllabus", post(analyze_syllabus))
        .route("/generate_quiz", post(generate_quiz))
        .route("/grade_quiz", post(grade_quiz))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { service })
}

/// Callable-protocol error envelope
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let body = json!({
            "error": {
                "status": kind.callable_status(),
                "message": self.detail(),
                "details": { "kind": kind }
            }
        });
        (kind.http_status(), Json(body)).into_response()
    }
}

type CallableResult<T> = Result<Json<CallableResponse<T>>, ServiceError>;

fn unwrap_payload<T: Default>(
    payload: Result<Json<CallableRequest<T>>, JsonRejection>,
) -> Result<T, ServiceError> {
    let Json(request) = payload.map_err(|e| ServiceError::InvalidRequest(e.body_text()))?;
    Ok(request.data.unwrap_or_default())
}

async fn analyze_syllabus(
    State(state): State<AppState>,
    payload: Result<Json<CallableRequest<SyllabusPayload>>, JsonRejection>,
) -> CallableResult<PlanResponse> {
    let span = info_span!("analyze_syllabus", request_id = %Uuid::new_v4());
    async move {
        let started = Instant::now();
        let outcome = match unwrap_payload(payload) {
            Ok(data) => state.service.analyze_syllabus(data).await,
            Err(e) => Err(e),
        };
        finish(outcome, started)
    }
    .instrument(span)
    .await
}

async fn generate_quiz(
    State(state): State<AppState>,
    payload: Result<Json<CallableRequest<SyllabusPayload>>, JsonRejection>,
) -> CallableResult<QuizResponse> {
    let span = info_span!("generate_quiz", request_id = %Uuid::new_v4());
    async move {
        let started = Instant::now();
        let outcome = match unwrap_payload(payload) {
            Ok(data) => state.service.generate_quiz(data).await,
            Err(e) => Err(e),
        };
        finish(outcome, started)
    }
    .instrument(span)
    .await
}

async fn grade_quiz(
    payload: Result<Json<CallableRequest<GradePayload>>, JsonRejection>,
) -> CallableResult<QuizScore> {
    let Json(request) = payload.map_err(|e| ServiceError::InvalidRequest(e.body_text()))?;
    let data = request
        .data
        .ok_or_else(|| ServiceError::InvalidRequest("questions are required".to_string()))?;
    if data.questions.is_empty() {
        return Err(ServiceError::InvalidRequest("questions are required".to_string()));
    }

    let score = score_answers(&data.questions, &data.answers);
    info!(score = score.score, max = score.max_score, "🏁 Quiz graded");
    Ok(Json(CallableResponse { result: score }))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

fn finish<T>(outcome: Result<T, ServiceError>, started: Instant) -> CallableResult<T> {
    let elapsed = started.elapsed();
    match outcome {
        Ok(result) => {
            info!("⏱️ Request processed in {:.2?}", elapsed);
            Ok(Json(CallableResponse { result }))
        }
        Err(e) => {
            match e {
                ServiceError::InvalidRequest(_) => warn!(kind = ?e.kind(), "❌ {}", e),
                _ => error!(kind = ?e.kind(), "❌ {}", e),
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::ProviderError;
    use crate::generation::resolver::tests::FakeProvider;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    const PREFERRED: &str = "gemini-1.5-flash-001";

    fn app(provider: FakeProvider, api_key: Option<&str>) -> Router {
        let config = AppConfig {
            api_key: api_key.map(str::to_string),
            attach_documents: false,
            ..AppConfig::default()
        };
        router(Arc::new(StudyService::new(Arc::new(config), Arc::new(provider))))
    }

    async fn call(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn plan_text(count: usize) -> String {
        let items: Vec<String> = (0..count)
            .map(|i| {
                format!(
                    r#"{{"name":"Topic {}","priority":"Medium","difficulty":"Hard","hours":{}}}"#,
                    i, i
                )
            })
            .collect();
        format!("[{}]", items.join(","))
    }

    #[tokio::test]
    async fn analyze_syllabus_returns_plan_in_result_envelope() {
        let provider = FakeProvider::new().respond(PREFERRED, Ok(plan_text(3)));
        let (status, body) = call(
            app(provider, Some("key")),
            "/analyze_syllabus",
            r#"{"data": {"filePath": "syllabus.pdf", "days": 5}}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let plan = body["result"]["plan"].as_array().unwrap();
        assert_eq!(plan.len(), 3);
        for item in plan {
            assert!(item["hours"].as_u64().is_some());
            assert!(["High", "Medium", "Low"].contains(&item["priority"].as_str().unwrap()));
            assert!(["Easy", "Medium", "Hard"].contains(&item["difficulty"].as_str().unwrap()));
        }
    }

    #[tokio::test]
    async fn missing_file_path_maps_to_invalid_argument() {
        let (status, body) =
            call(app(FakeProvider::new(), Some("key")), "/analyze_syllabus", r#"{"data": {}}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["status"], "INVALID_ARGUMENT");
        assert_eq!(body["error"]["details"]["kind"], "InvalidRequest");
    }

    #[tokio::test]
    async fn malformed_body_maps_to_invalid_argument() {
        let (status, body) =
            call(app(FakeProvider::new(), Some("key")), "/analyze_syllabus", "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["status"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn missing_key_maps_to_failed_precondition() {
        let (status, body) = call(
            app(FakeProvider::new(), None),
            "/generate_quiz",
            r#"{"data": {}}"#,
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["status"], "FAILED_PRECONDITION");
        assert_eq!(body["error"]["message"], "API key is missing or invalid");
    }

    #[tokio::test]
    async fn garbage_output_maps_to_internal() {
        let provider = FakeProvider::new().respond(PREFERRED, Ok("no json here".to_string()));
        let (status, body) = call(
            app(provider, Some("key")),
            "/analyze_syllabus",
            r#"{"data": {"filePath": "syllabus.pdf"}}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["details"]["kind"], "MalformedModelOutput");
        assert!(body["error"]["message"].as_str().unwrap().contains("no json here"));
    }

    #[tokio::test]
    async fn empty_output_is_distinct_from_malformed() {
        let provider = FakeProvider::new().respond(PREFERRED, Ok("[]".to_string()));
        let (status, body) = call(
            app(provider, Some("key")),
            "/analyze_syllabus",
            r#"{"data": {"filePath": "syllabus.pdf"}}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["status"], "NOT_FOUND");
        assert_eq!(body["error"]["details"]["kind"], "EmptyGenerationResult");
    }

    #[tokio::test]
    async fn unavailable_model_maps_to_unavailable() {
        let provider = FakeProvider::new()
            .respond(PREFERRED, Err(ProviderError::RateLimited("quota".to_string())))
            .with_listing(&["other-model"]);
        let (status, body) =
            call(app(provider, Some("key")), "/generate_quiz", r#"{"data": {}}"#).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["status"], "UNAVAILABLE");
    }

    #[tokio::test]
    async fn grade_quiz_scores_ten_points_per_answer() {
        let body = r#"{"data": {
            "questions": [
                {"id":1,"category":"c","question":"q1","options":["a","b","c","d"],"correct":0},
                {"id":2,"category":"c","question":"q2","options":["a","b","c","d"],"correct":3}
            ],
            "answers": [0, null]
        }}"#;
        let (status, response) = call(app(FakeProvider::new(), None), "/grade_quiz", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["result"]["score"], 10);
        assert_eq!(response["result"]["maxScore"], 20);
    }

    #[tokio::test]
    async fn grade_quiz_without_questions_is_invalid() {
        let (status, _) =
            call(app(FakeProvider::new(), None), "/grade_quiz", r#"{"data": {"questions": []}}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_check_responds_ok() {
        let response = app(FakeProvider::new(), None)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
